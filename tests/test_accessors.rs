//! Accessor tests: descriptors, blocks and script results read by handle.

extern crate sfc_bridge;

use sfc_bridge::{Context, Handle};

const COUNTER: &str = "<script setup lang=\"ts\">
import { ref } from 'vue'
import type { Item } from './types'
import Child from './Child.vue'
const count = ref(0)
</script>

<template>
  <Child :count=\"count\" />
</template>

<style scoped>
.a { color: v-bind(color) }
</style>
<style module>.b {}</style>
";

fn parse(ctx: &mut Context, source: &str) -> (Handle, Handle) {
    let parsed = ctx.parse(source.as_bytes(), b"Counter.vue");
    let descriptor = ctx.parse_result_descriptor(parsed);
    (parsed, descriptor)
}

fn import_named(ctx: &mut Context, script: Handle, name: &str) -> Handle {
    let index = (0..ctx.script_imports_count(script))
        .find(|&i| ctx.script_imports_key_at(script, i) == name)
        .unwrap();
    ctx.script_imports_value_at(script, index)
}

// ============================================================================
// Descriptor
// ============================================================================

#[test]
fn test_descriptor_summary() {
    let mut ctx = Context::new().unwrap();
    let (parsed, d) = parse(&mut ctx, COUNTER);
    assert_eq!(ctx.parse_result_error_count(parsed), 0);
    assert_eq!(ctx.parse_result_error_message(parsed, 0), "");
    assert!(ctx.has_template(d));
    assert!(ctx.has_script_setup(d));
    assert!(!ctx.has_script(d));
    assert_eq!(ctx.source(d), COUNTER);
    assert_eq!(ctx.style_count(d), 2);
    assert_eq!(ctx.custom_blocks_count(d), 0);
    assert_eq!(ctx.custom_block_at(d, 0), Handle::NULL);
}

#[test]
fn test_style_at_past_the_end_is_null() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    let n = ctx.style_count(d);
    assert_eq!(ctx.style_at(d, n), Handle::NULL);
    assert_eq!(ctx.style_at(d, usize::MAX), Handle::NULL);
    assert_eq!(ctx.css_var_at(d, 5), "");
}

#[test]
fn test_css_vars() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    assert_eq!(ctx.css_vars_count(d), 1);
    assert_eq!(ctx.css_var_at(d, 0), "color");
}

#[test]
fn test_malformed_source_keeps_partial_descriptor() {
    let mut ctx = Context::new().unwrap();
    let (parsed, d) = parse(&mut ctx, "<script>export default {}</script><template><div>");
    assert!(ctx.parse_result_error_count(parsed) >= 1);
    assert_eq!(ctx.parse_result_error_message(parsed, 0), "Element is missing end tag.");
    assert!(ctx.has_script(d));
    let t = ctx.template(d);
    assert_eq!(ctx.block_content(t), "<div>");
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn test_script_block_fields() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    let s = ctx.script_setup(d);
    assert_eq!(ctx.block_lang(s), "ts");
    assert_eq!(ctx.block_src(s), "");
    assert!(ctx.script_has_setup(s));
    assert_eq!(ctx.script_setup_value(s), "");
    assert_eq!(ctx.block_loc_start_line(s), 1);
    assert_eq!(ctx.block_loc_start_offset(s), 24);
    assert_eq!(ctx.block_loc_end_line(s), 6);
    assert!(ctx.block_content(s).contains("const count = ref(0)"));
}

#[test]
fn test_attrs_keep_source_order() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, "<style scoped lang=\"scss\" module=\"m\" src=\"./a.scss\"></style>");
    let s = ctx.style_at(d, 0);
    let keys: Vec<String> = (0..ctx.block_attrs_count(s))
        .map(|i| ctx.block_attrs_key_at(s, i).to_string())
        .collect();
    assert_eq!(keys, vec!["scoped", "lang", "module", "src"]);
    assert!(ctx.block_attrs_is_bool_at(s, 0));
    assert_eq!(ctx.block_attrs_value_at(s, 3), "./a.scss");
    assert_eq!(ctx.block_src(s), "./a.scss");
    assert_eq!(ctx.block_lang(s), "scss");
}

#[test]
fn test_style_flags() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    let scoped = ctx.style_at(d, 0);
    let module = ctx.style_at(d, 1);
    assert!(ctx.style_is_scoped(scoped));
    assert!(!ctx.style_has_module(scoped));
    assert!(!ctx.style_is_scoped(module));
    assert!(ctx.style_has_module(module));
    assert_eq!(ctx.style_module_value(module), "");
}

#[test]
fn test_custom_block() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, "<i18n lang=\"json\">{ \"a\": 1 }</i18n>");
    let block = ctx.custom_block_at(d, 0);
    assert_eq!(ctx.custom_block_type(block), "i18n");
    assert_eq!(ctx.block_content(block), "{ \"a\": 1 }");
    assert_eq!(ctx.block_lang(block), "json");
}

#[test]
fn test_block_accessors_reject_descriptors() {
    let mut ctx = Context::new().unwrap();
    let (parsed, d) = parse(&mut ctx, COUNTER);
    assert_eq!(ctx.block_content(parsed), "");
    assert_eq!(ctx.block_attrs_count(d), 0);
    assert_eq!(ctx.block_loc_end_offset(d), 0);
    assert!(!ctx.style_is_scoped(d));
}

// ============================================================================
// Script results
// ============================================================================

#[test]
fn test_imports() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    let script = ctx.compile_script(d, b"data-v-7", false);
    assert!(!script.is_null());

    let item = import_named(&mut ctx, script, "Item");
    assert!(ctx.import_binding_is_type(item));
    assert_eq!(ctx.import_binding_source(item), "./types");

    let child = import_named(&mut ctx, script, "Child");
    assert!(!ctx.import_binding_is_type(child));
    assert_eq!(ctx.import_binding_imported(child), "default");
    assert!(ctx.import_binding_is_from_setup(child));

    assert!(!ctx.import_binding_is_type(d));
    assert_eq!(ctx.import_binding_source(Handle::NULL), "");
}

#[test]
fn test_bindings_handle() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    let script = ctx.compile_script(d, b"data-v-7", false);
    let keys: Vec<String> = (0..ctx.script_bindings_count(script))
        .map(|i| ctx.script_bindings_key_at(script, i).to_string())
        .collect();
    assert!(keys.contains(&"count".to_string()));
    assert!(keys.contains(&"Child".to_string()));
    assert!(!ctx.script_result_bindings(script).is_null());
    assert_eq!(ctx.script_result_bindings(d), Handle::NULL);
}

#[test]
fn test_script_result_is_a_block() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, COUNTER);
    let script = ctx.compile_script(d, b"data-v-7", false);
    assert_eq!(ctx.block_lang(script), "ts");
    assert!(ctx.script_has_setup(script));
    let content = ctx.script_result_content(script).to_string();
    assert_eq!(ctx.block_content(script), content);
    assert_eq!(ctx.script_warnings_count(script), 0);
    assert_eq!(ctx.script_warning_at(script, 0), "");
    let deps = ctx.script_deps_count(script);
    assert_eq!(ctx.script_dep_at(script, deps), "");
}

#[test]
fn test_macro_import_warning() {
    let mut ctx = Context::new().unwrap();
    let (_, d) = parse(&mut ctx, "<script setup>\nimport { defineProps, ref } from 'vue'\ndefineProps(['a'])\n</script>");
    let script = ctx.compile_script(d, b"x", false);
    assert_eq!(ctx.script_warnings_count(script), 1);
    assert_eq!(
        ctx.script_warning_at(script, 0),
        "`defineProps` is a compiler macro and no longer needs to be imported."
    );
}
