//! Read-only projections over result handles.
//!
//! Every accessor degrades the same way: an invalid handle, a handle of the
//! wrong shape, a missing field or an index past the end yields
//! `Handle::NULL`, `0`, `""` or `false`. Text is cached on the handle that was
//! asked, and nested values come back as new handles the caller must release.

use std::convert::TryFrom;

use crate::bridge::arena::{Handle, Shape};
use crate::bridge::context::Context;
use crate::runner::ds::value::JsValue;

fn count(v: Option<&JsValue>, field: &str) -> usize {
    v.and_then(|v| v.get(field))
        .and_then(|a| a.array_len())
        .unwrap_or(0)
}

fn item(v: Option<&JsValue>, field: &str, index: usize) -> Option<JsValue> {
    v?.get(field)?.array_get(index)
}

fn string_item(v: Option<&JsValue>, field: &str, index: usize) -> Option<String> {
    item(v, field, index)?.as_str().map(|s| s.to_string())
}

fn error_message(v: Option<&JsValue>, index: usize) -> Option<String> {
    item(v, "errors", index)?.get_string("message")
}

fn entry(v: Option<&JsValue>, field: &str, index: usize) -> Option<(String, JsValue)> {
    v?.get(field)?.own_entry_at(index)
}

fn entry_count(v: Option<&JsValue>, field: &str) -> usize {
    v.and_then(|v| v.get(field))
        .and_then(|o| o.own_key_count())
        .unwrap_or(0)
}

fn location(v: Option<&JsValue>, edge: &str, field: &str) -> u32 {
    v.and_then(|b| b.get("loc"))
        .and_then(|l| l.get(edge))
        .and_then(|p| p.get(field))
        .and_then(|n| n.as_u64())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn flag(v: Option<&JsValue>, field: &str) -> bool {
    v.and_then(|v| v.get(field)).map_or(false, |f| f.truthy())
}

impl Context {
    fn shaped(&self, handle: Handle, shape: Shape) -> Option<&JsValue> {
        self.arena.resolve_shape(handle, shape)
    }

    fn block(&self, handle: Handle) -> Option<&JsValue> {
        self.arena.resolve_block(handle)
    }

    // ==== parse result ====

    pub fn parse_result_descriptor(&mut self, h: Handle) -> Handle {
        let d = self.shaped(h, Shape::ParseResult).and_then(|v| v.get("descriptor"));
        self.child(d, Shape::Descriptor)
    }

    pub fn parse_result_error_count(&self, h: Handle) -> usize {
        count(self.shaped(h, Shape::ParseResult), "errors")
    }

    pub fn parse_result_error_message(&mut self, h: Handle, i: usize) -> &str {
        let m = error_message(self.shaped(h, Shape::ParseResult), i);
        self.text(h, m)
    }

    // ==== descriptor ====

    fn descriptor(&self, h: Handle) -> Option<&JsValue> {
        self.shaped(h, Shape::Descriptor)
    }

    pub fn has_template(&self, h: Handle) -> bool {
        self.descriptor(h).and_then(|d| d.get_present("template")).is_some()
    }

    pub fn has_script(&self, h: Handle) -> bool {
        self.descriptor(h).and_then(|d| d.get_present("script")).is_some()
    }

    pub fn has_script_setup(&self, h: Handle) -> bool {
        self.descriptor(h).and_then(|d| d.get_present("scriptSetup")).is_some()
    }

    pub fn template(&mut self, h: Handle) -> Handle {
        let b = self.descriptor(h).and_then(|d| d.get("template"));
        self.child(b, Shape::Block)
    }

    pub fn script(&mut self, h: Handle) -> Handle {
        let b = self.descriptor(h).and_then(|d| d.get("script"));
        self.child(b, Shape::Block)
    }

    pub fn script_setup(&mut self, h: Handle) -> Handle {
        let b = self.descriptor(h).and_then(|d| d.get("scriptSetup"));
        self.child(b, Shape::Block)
    }

    pub fn style_count(&self, h: Handle) -> usize {
        count(self.descriptor(h), "styles")
    }

    pub fn style_at(&mut self, h: Handle, i: usize) -> Handle {
        let b = item(self.descriptor(h), "styles", i);
        self.child(b, Shape::Block)
    }

    pub fn custom_blocks_count(&self, h: Handle) -> usize {
        count(self.descriptor(h), "customBlocks")
    }

    pub fn custom_block_at(&mut self, h: Handle, i: usize) -> Handle {
        let b = item(self.descriptor(h), "customBlocks", i);
        self.child(b, Shape::Block)
    }

    pub fn css_vars_count(&self, h: Handle) -> usize {
        count(self.descriptor(h), "cssVars")
    }

    pub fn css_var_at(&mut self, h: Handle, i: usize) -> &str {
        let v = string_item(self.descriptor(h), "cssVars", i);
        self.text(h, v)
    }

    pub fn slotted(&self, h: Handle) -> bool {
        flag(self.descriptor(h), "slotted")
    }

    pub fn source(&mut self, h: Handle) -> &str {
        let s = self.descriptor(h).and_then(|d| d.get_string("source"));
        self.text(h, s)
    }

    pub fn filename(&mut self, h: Handle) -> &str {
        let s = self.descriptor(h).and_then(|d| d.get_string("filename"));
        self.text(h, s)
    }

    // ==== any block ====

    pub fn block_content(&mut self, h: Handle) -> &str {
        let s = self.block(h).and_then(|b| b.get_string("content"));
        self.text(h, s)
    }

    pub fn block_lang(&mut self, h: Handle) -> &str {
        let s = self.block(h).and_then(|b| b.get_string("lang"));
        self.text(h, s)
    }

    pub fn block_src(&mut self, h: Handle) -> &str {
        let s = self.block(h).and_then(|b| b.get_string("src"));
        self.text(h, s)
    }

    pub fn block_loc_start_offset(&self, h: Handle) -> u32 {
        location(self.block(h), "start", "offset")
    }

    pub fn block_loc_start_line(&self, h: Handle) -> u32 {
        location(self.block(h), "start", "line")
    }

    pub fn block_loc_start_column(&self, h: Handle) -> u32 {
        location(self.block(h), "start", "column")
    }

    pub fn block_loc_end_offset(&self, h: Handle) -> u32 {
        location(self.block(h), "end", "offset")
    }

    pub fn block_loc_end_line(&self, h: Handle) -> u32 {
        location(self.block(h), "end", "line")
    }

    pub fn block_loc_end_column(&self, h: Handle) -> u32 {
        location(self.block(h), "end", "column")
    }

    pub fn block_attrs_count(&self, h: Handle) -> usize {
        entry_count(self.block(h), "attrs")
    }

    pub fn block_attrs_key_at(&mut self, h: Handle, i: usize) -> &str {
        let k = entry(self.block(h), "attrs", i).map(|(k, _)| k);
        self.text(h, k)
    }

    /// `""` for key-only attributes.
    pub fn block_attrs_value_at(&mut self, h: Handle, i: usize) -> &str {
        let v = entry(self.block(h), "attrs", i).and_then(|(_, v)| v.as_str().map(|s| s.to_string()));
        self.text(h, v)
    }

    pub fn block_attrs_is_bool_at(&self, h: Handle, i: usize) -> bool {
        matches!(entry(self.block(h), "attrs", i), Some((_, JsValue::Boolean(_))))
    }

    pub fn custom_block_type(&mut self, h: Handle) -> &str {
        let t = self.block(h).and_then(|b| b.get_string("type"));
        self.text(h, t)
    }

    // ==== style block ====

    pub fn style_is_scoped(&self, h: Handle) -> bool {
        flag(self.block(h), "scoped")
    }

    pub fn style_has_module(&self, h: Handle) -> bool {
        self.block(h).and_then(|b| b.get_present("module")).is_some()
    }

    /// `""` unless the `module` attribute has a value.
    pub fn style_module_value(&mut self, h: Handle) -> &str {
        let m = self.block(h).and_then(|b| b.get_string("module"));
        self.text(h, m)
    }

    // ==== script block or script result ====

    pub fn script_has_setup(&self, h: Handle) -> bool {
        self.block(h).and_then(|b| b.get_present("setup")).is_some()
    }

    pub fn script_setup_value(&mut self, h: Handle) -> &str {
        let s = self.block(h).and_then(|b| b.get_string("setup"));
        self.text(h, s)
    }

    pub fn script_bindings_count(&self, h: Handle) -> usize {
        entry_count(self.block(h), "bindings")
    }

    pub fn script_bindings_key_at(&mut self, h: Handle, i: usize) -> &str {
        let k = entry(self.block(h), "bindings", i).map(|(k, _)| k);
        self.text(h, k)
    }

    pub fn script_bindings_value_at(&mut self, h: Handle, i: usize) -> &str {
        let v = entry(self.block(h), "bindings", i).and_then(|(_, v)| v.as_str().map(|s| s.to_string()));
        self.text(h, v)
    }

    pub fn script_imports_count(&self, h: Handle) -> usize {
        entry_count(self.block(h), "imports")
    }

    pub fn script_imports_key_at(&mut self, h: Handle, i: usize) -> &str {
        let k = entry(self.block(h), "imports", i).map(|(k, _)| k);
        self.text(h, k)
    }

    pub fn script_imports_value_at(&mut self, h: Handle, i: usize) -> Handle {
        let v = entry(self.block(h), "imports", i).map(|(_, v)| v);
        self.child(v, Shape::ImportBinding)
    }

    pub fn script_warnings_count(&self, h: Handle) -> usize {
        count(self.block(h), "warnings")
    }

    pub fn script_warning_at(&mut self, h: Handle, i: usize) -> &str {
        let w = string_item(self.block(h), "warnings", i);
        self.text(h, w)
    }

    pub fn script_deps_count(&self, h: Handle) -> usize {
        count(self.block(h), "deps")
    }

    pub fn script_dep_at(&mut self, h: Handle, i: usize) -> &str {
        let d = string_item(self.block(h), "deps", i);
        self.text(h, d)
    }

    // ==== import binding ====

    pub fn import_binding_is_type(&self, h: Handle) -> bool {
        flag(self.shaped(h, Shape::ImportBinding), "isType")
    }

    pub fn import_binding_imported(&mut self, h: Handle) -> &str {
        let s = self.shaped(h, Shape::ImportBinding).and_then(|b| b.get_string("imported"));
        self.text(h, s)
    }

    pub fn import_binding_source(&mut self, h: Handle) -> &str {
        let s = self.shaped(h, Shape::ImportBinding).and_then(|b| b.get_string("source"));
        self.text(h, s)
    }

    pub fn import_binding_is_from_setup(&self, h: Handle) -> bool {
        flag(self.shaped(h, Shape::ImportBinding), "isFromSetup")
    }

    // ==== script result ====

    pub fn script_result_content(&mut self, h: Handle) -> &str {
        let s = self.shaped(h, Shape::ScriptResult).and_then(|b| b.get_string("content"));
        self.text(h, s)
    }

    /// New handle sharing the result's bindings object.
    pub fn script_result_bindings(&mut self, h: Handle) -> Handle {
        let b = self.shaped(h, Shape::ScriptResult).and_then(|r| r.get("bindings"));
        self.child(b, Shape::Bindings)
    }

    // ==== template result ====

    pub fn template_result_code(&mut self, h: Handle) -> &str {
        let s = self.shaped(h, Shape::TemplateResult).and_then(|r| r.get_string("code"));
        self.text(h, s)
    }

    pub fn template_result_error_count(&self, h: Handle) -> usize {
        count(self.shaped(h, Shape::TemplateResult), "errors")
    }

    pub fn template_result_error_message(&mut self, h: Handle, i: usize) -> &str {
        let m = error_message(self.shaped(h, Shape::TemplateResult), i);
        self.text(h, m)
    }

    pub fn template_result_tips_count(&self, h: Handle) -> usize {
        count(self.shaped(h, Shape::TemplateResult), "tips")
    }

    pub fn template_result_tip_at(&mut self, h: Handle, i: usize) -> &str {
        let t = string_item(self.shaped(h, Shape::TemplateResult), "tips", i);
        self.text(h, t)
    }

    // ==== style result ====

    pub fn style_result_code(&mut self, h: Handle) -> &str {
        let s = self.shaped(h, Shape::StyleResult).and_then(|r| r.get_string("code"));
        self.text(h, s)
    }

    pub fn style_result_error_count(&self, h: Handle) -> usize {
        count(self.shaped(h, Shape::StyleResult), "errors")
    }

    pub fn style_result_error_message(&mut self, h: Handle, i: usize) -> &str {
        let m = error_message(self.shaped(h, Shape::StyleResult), i);
        self.text(h, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SFC: &str = r#"<template lang="html" functional><p>{{ msg }}</p></template>
<script setup>
import { ref } from 'vue'
const msg = ref('hi')
</script>
<style scoped module="classes">.a { color: v-bind(color) }</style>
<docs>hello</docs>
"#;

    fn descriptor(ctx: &mut Context) -> Handle {
        let parsed = ctx.parse(SFC.as_bytes(), b"Hello.vue");
        ctx.parse_result_descriptor(parsed)
    }

    #[test]
    fn test_descriptor_fields() {
        let mut ctx = Context::new().unwrap();
        let d = descriptor(&mut ctx);
        assert!(ctx.has_template(d));
        assert!(!ctx.has_script(d));
        assert!(ctx.has_script_setup(d));
        assert_eq!(ctx.script(d), Handle::NULL);
        assert_eq!(ctx.style_count(d), 1);
        assert_eq!(ctx.style_at(d, 1), Handle::NULL);
        assert_eq!(ctx.custom_blocks_count(d), 1);
        assert_eq!(ctx.css_vars_count(d), 1);
        assert_eq!(ctx.css_var_at(d, 0), "color");
        assert_eq!(ctx.filename(d), "Hello.vue");
        assert!(!ctx.slotted(d));
    }

    #[test]
    fn test_block_attrs_in_order() {
        let mut ctx = Context::new().unwrap();
        let d = descriptor(&mut ctx);
        let t = ctx.template(d);
        assert_eq!(ctx.block_attrs_count(t), 2);
        assert_eq!(ctx.block_attrs_key_at(t, 0), "lang");
        assert_eq!(ctx.block_attrs_value_at(t, 0), "html");
        assert_eq!(ctx.block_attrs_key_at(t, 1), "functional");
        assert_eq!(ctx.block_attrs_value_at(t, 1), "");
        assert!(ctx.block_attrs_is_bool_at(t, 1));
        assert!(!ctx.block_attrs_is_bool_at(t, 0));
        assert_eq!(ctx.block_attrs_key_at(t, 2), "");
        assert_eq!(ctx.block_content(t), "<p>{{ msg }}</p>");
        assert_eq!(ctx.block_loc_start_line(t), 1);
    }

    #[test]
    fn test_style_module() {
        let mut ctx = Context::new().unwrap();
        let d = descriptor(&mut ctx);
        let s = ctx.style_at(d, 0);
        assert!(ctx.style_is_scoped(s));
        assert!(ctx.style_has_module(s));
        assert_eq!(ctx.style_module_value(s), "classes");
        let docs = ctx.custom_block_at(d, 0);
        assert_eq!(ctx.custom_block_type(docs), "docs");
    }

    #[test]
    fn test_shape_mismatch() {
        let mut ctx = Context::new().unwrap();
        let d = descriptor(&mut ctx);
        assert_eq!(ctx.block_content(d), "");
        assert_eq!(ctx.template_result_code(d), "");
        assert_eq!(ctx.parse_result_descriptor(d), Handle::NULL);
        assert_eq!(ctx.style_count(Handle(999)), 0);
    }

    #[test]
    fn test_script_result_bindings_feed_template() {
        let mut ctx = Context::new().unwrap();
        let d = descriptor(&mut ctx);
        let script = ctx.compile_script(d, b"data-v-1", false);
        assert!(!script.is_null());
        assert_eq!(ctx.script_bindings_count(script), 2);
        assert_eq!(ctx.script_bindings_key_at(script, 1), "msg");
        assert_eq!(ctx.script_bindings_value_at(script, 1), "setup-ref");
        assert_eq!(ctx.script_imports_key_at(script, 0), "ref");
        let import = ctx.script_imports_value_at(script, 0);
        assert_eq!(ctx.import_binding_source(import), "vue");
        assert!(ctx.import_binding_is_from_setup(import));
        assert!(ctx.script_result_content(script).contains("__name: 'Hello'"));

        let bindings = ctx.script_result_bindings(script);
        let t = ctx.compile_template(b"<p>{{ msg }}</p>", b"Hello.vue", b"data-v-1", false, bindings);
        assert!(ctx.template_result_code(t).contains("$setup.msg"));
    }
}
