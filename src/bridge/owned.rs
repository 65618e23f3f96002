//! Typed, self-releasing views over a [`Context`].
//!
//! A [`Compiler`] owns one context. Every value it hands out borrows the
//! compiler and owns exactly one arena slot, which is released when the value
//! is dropped. Text accessors return `&str` borrowed from the value: the bytes
//! live in the slot's string cache, and the slot cannot be released while the
//! value is borrowed.
//!
//! ```
//! use sfc_bridge::bridge::owned::Compiler;
//!
//! let compiler = Compiler::new().unwrap();
//! let parsed = compiler.parse("<template><p>{{ msg }}</p></template>", "App.vue").unwrap();
//! let descriptor = parsed.descriptor().unwrap();
//! let template = descriptor.template().unwrap();
//! let compiled = compiler
//!     .compile_template(template.content(), "App.vue", "app", false, None)
//!     .unwrap();
//! assert!(compiled.code().contains("_ctx.msg"));
//!
//! drop((compiled, template, descriptor, parsed));
//! assert_eq!(compiler.live_count(), 0);
//! ```

use std::cell::RefCell;
use std::num::NonZeroU64;
use std::ops::Deref;
use std::{slice, str};

use thiserror::Error;
use tracing::trace;

use crate::bridge::arena::Handle;
use crate::bridge::context::Context;
use crate::runner::plugin::config::RuntimeConfig;
use crate::runner::runtime::RuntimeError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("`{0}` threw")]
    Threw(&'static str),
    #[error("`{0}` needs a descriptor with a script block")]
    NoScript(&'static str),
}

/// Owns a [`Context`] and hands out typed results borrowing it.
///
/// Like the context it wraps, a compiler is tied to one thread.
pub struct Compiler {
    ctx: RefCell<Context>,
}

impl Compiler {
    pub fn new() -> Result<Compiler, RuntimeError> {
        Ok(Compiler::from(Context::new()?))
    }

    pub fn with_config(config: RuntimeConfig) -> Result<Compiler, RuntimeError> {
        Ok(Compiler::from(Context::with_config(config)?))
    }

    /// Slots currently held by values of this compiler.
    pub fn live_count(&self) -> usize {
        self.ctx.borrow().arena().live_count()
    }

    /// Slots ever created, live or free.
    pub fn capacity(&self) -> usize {
        self.ctx.borrow().arena().capacity()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Context) -> T) -> T {
        let mut ctx = self.ctx.borrow_mut();
        f(&mut ctx)
    }

    fn own(&self, handle: Handle) -> Option<Owned<'_>> {
        NonZeroU64::new(handle.0).map(|raw| Owned { raw, compiler: self })
    }

    fn invoked(&self, name: &'static str, handle: Handle) -> Result<Owned<'_>, CompileError> {
        self.own(handle).ok_or(CompileError::Threw(name))
    }

    pub fn parse(&self, source: &str, filename: &str) -> Result<ParseOutput<'_>, CompileError> {
        let h = self.with(|ctx| ctx.parse(source.as_bytes(), filename.as_bytes()));
        self.invoked("parse", h).map(ParseOutput)
    }

    /// Compiles a template, optionally against the bindings of a compiled
    /// script.
    pub fn compile_template<'c>(
        &'c self,
        source: &str,
        filename: &str,
        id: &str,
        scoped: bool,
        bindings: Option<&ScriptOutput<'c>>,
    ) -> Result<TemplateOutput<'c>, CompileError> {
        let script = bindings.map_or(Handle::NULL, |s| s.owned().handle());
        let h = self.with(|ctx| {
            let bindings = ctx.script_result_bindings(script);
            let h = ctx.compile_template(
                source.as_bytes(),
                filename.as_bytes(),
                id.as_bytes(),
                scoped,
                bindings,
            );
            ctx.release(bindings);
            h
        });
        self.invoked("compileTemplate", h).map(TemplateOutput)
    }

    pub fn compile_style(
        &self,
        source: &str,
        filename: &str,
        id: &str,
        scoped: bool,
    ) -> Result<StyleOutput<'_>, CompileError> {
        let h = self.with(|ctx| {
            ctx.compile_style(source.as_bytes(), filename.as_bytes(), id.as_bytes(), scoped)
        });
        self.invoked("compileStyle", h).map(StyleOutput)
    }
}

impl From<Context> for Compiler {
    fn from(ctx: Context) -> Self {
        Compiler {
            ctx: RefCell::new(ctx),
        }
    }
}

/// One live arena slot, released on drop.
struct Owned<'c> {
    raw: NonZeroU64,
    compiler: &'c Compiler,
}

impl<'c> Owned<'c> {
    fn handle(&self) -> Handle {
        Handle(self.raw.get())
    }

    fn get<T>(&self, f: impl FnOnce(&mut Context, Handle) -> T) -> T {
        let h = self.handle();
        self.compiler.with(|ctx| f(ctx, h))
    }

    fn child(&self, f: impl FnOnce(&mut Context, Handle) -> Handle) -> Option<Owned<'c>> {
        let h = self.get(f);
        self.compiler.own(h)
    }

    fn text(&self, f: impl FnOnce(&mut Context, Handle) -> &str) -> &str {
        let (ptr, len) = self.get(|ctx, h| {
            let s = f(ctx, h);
            (s.as_ptr(), s.len())
        });
        // SAFETY: the bytes are either static or a boxed entry in this slot's
        // append-only cache. Only `Drop for Owned` releases the slot, so they
        // outlive `&self`.
        unsafe { str::from_utf8_unchecked(slice::from_raw_parts(ptr, len)) }
    }

    fn texts(&self, count: usize, f: impl Fn(&mut Context, Handle, usize) -> &str) -> Vec<&str> {
        (0..count).map(|i| self.text(|ctx, h| f(ctx, h, i))).collect()
    }
}

impl Drop for Owned<'_> {
    fn drop(&mut self) {
        let h = self.handle();
        if let Ok(mut ctx) = self.compiler.ctx.try_borrow_mut() {
            ctx.release(h);
        } else {
            trace!("leaking {}: context busy during drop", h);
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

/// A block attribute: `lang="ts"` or a bare `scoped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    String(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub is_type: bool,
    pub imported: String,
    pub source: String,
    pub is_from_setup: bool,
}

pub struct ParseOutput<'c>(Owned<'c>);

impl<'c> ParseOutput<'c> {
    pub fn descriptor(&self) -> Option<Descriptor<'c>> {
        self.0.child(Context::parse_result_descriptor).map(Descriptor)
    }

    pub fn error_count(&self) -> usize {
        self.0.get(|ctx, h| ctx.parse_result_error_count(h))
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn errors(&self) -> Vec<&str> {
        self.0.texts(self.error_count(), Context::parse_result_error_message)
    }
}

pub struct Descriptor<'c>(Owned<'c>);

impl<'c> Descriptor<'c> {
    pub fn filename(&self) -> &str {
        self.0.text(Context::filename)
    }

    pub fn source(&self) -> &str {
        self.0.text(Context::source)
    }

    pub fn has_template(&self) -> bool {
        self.0.get(|ctx, h| ctx.has_template(h))
    }

    pub fn has_script(&self) -> bool {
        self.0.get(|ctx, h| ctx.has_script(h))
    }

    pub fn has_script_setup(&self) -> bool {
        self.0.get(|ctx, h| ctx.has_script_setup(h))
    }

    pub fn template(&self) -> Option<Block<'c>> {
        self.0.child(Context::template).map(Block)
    }

    pub fn script(&self) -> Option<ScriptBlock<'c>> {
        self.0.child(Context::script).map(|b| ScriptBlock(Block(b)))
    }

    pub fn script_setup(&self) -> Option<ScriptBlock<'c>> {
        self.0.child(Context::script_setup).map(|b| ScriptBlock(Block(b)))
    }

    pub fn style_count(&self) -> usize {
        self.0.get(|ctx, h| ctx.style_count(h))
    }

    pub fn styles(&self) -> impl Iterator<Item = StyleBlock<'c>> + '_ {
        (0..self.style_count()).filter_map(move |i| {
            self.0.child(|ctx, h| ctx.style_at(h, i)).map(|b| StyleBlock(Block(b)))
        })
    }

    pub fn has_scoped_style(&self) -> bool {
        self.styles().any(|s| s.is_scoped())
    }

    pub fn custom_blocks(&self) -> impl Iterator<Item = CustomBlock<'c>> + '_ {
        let count = self.0.get(|ctx, h| ctx.custom_blocks_count(h));
        (0..count).filter_map(move |i| {
            self.0.child(|ctx, h| ctx.custom_block_at(h, i)).map(|b| CustomBlock(Block(b)))
        })
    }

    pub fn css_vars(&self) -> Vec<&str> {
        let count = self.0.get(|ctx, h| ctx.css_vars_count(h));
        self.0.texts(count, Context::css_var_at)
    }

    pub fn slotted(&self) -> bool {
        self.0.get(|ctx, h| ctx.slotted(h))
    }

    /// Runs `compileScript` on this descriptor.
    pub fn compile_script(&self, id: &str, is_prod: bool) -> Result<ScriptOutput<'c>, CompileError> {
        if !self.has_script() && !self.has_script_setup() {
            return Err(CompileError::NoScript("compileScript"));
        }
        self.0
            .child(|ctx, h| ctx.compile_script(h, id.as_bytes(), is_prod))
            .map(|b| ScriptOutput(ScriptBlock(Block(b))))
            .ok_or(CompileError::Threw("compileScript"))
    }
}

/// Fields every SFC block has.
pub struct Block<'c>(Owned<'c>);

impl Block<'_> {
    pub fn content(&self) -> &str {
        self.0.text(Context::block_content)
    }

    pub fn lang(&self) -> Option<&str> {
        non_empty(self.0.text(Context::block_lang))
    }

    pub fn src(&self) -> Option<&str> {
        non_empty(self.0.text(Context::block_src))
    }

    pub fn loc(&self) -> SourceLocation {
        self.0.get(|ctx, h| SourceLocation {
            start: Position {
                offset: ctx.block_loc_start_offset(h),
                line: ctx.block_loc_start_line(h),
                column: ctx.block_loc_start_column(h),
            },
            end: Position {
                offset: ctx.block_loc_end_offset(h),
                line: ctx.block_loc_end_line(h),
                column: ctx.block_loc_end_column(h),
            },
        })
    }

    /// Attributes in source order.
    pub fn attrs(&self) -> Vec<(String, AttrValue)> {
        self.0.get(|ctx, h| {
            (0..ctx.block_attrs_count(h))
                .map(|i| {
                    let key = ctx.block_attrs_key_at(h, i).to_string();
                    let value = if ctx.block_attrs_is_bool_at(h, i) {
                        AttrValue::Bool(true)
                    } else {
                        AttrValue::String(ctx.block_attrs_value_at(h, i).to_string())
                    };
                    (key, value)
                })
                .collect()
        })
    }
}

pub struct StyleBlock<'c>(Block<'c>);

impl StyleBlock<'_> {
    pub fn is_scoped(&self) -> bool {
        self.0 .0.get(|ctx, h| ctx.style_is_scoped(h))
    }

    /// `Some("")` for a bare `module` attribute.
    pub fn module(&self) -> Option<&str> {
        if self.0 .0.get(|ctx, h| ctx.style_has_module(h)) {
            Some(self.0 .0.text(Context::style_module_value))
        } else {
            None
        }
    }
}

impl<'c> Deref for StyleBlock<'c> {
    type Target = Block<'c>;

    fn deref(&self) -> &Block<'c> {
        &self.0
    }
}

pub struct CustomBlock<'c>(Block<'c>);

impl CustomBlock<'_> {
    pub fn block_type(&self) -> &str {
        self.0 .0.text(Context::custom_block_type)
    }
}

impl<'c> Deref for CustomBlock<'c> {
    type Target = Block<'c>;

    fn deref(&self) -> &Block<'c> {
        &self.0
    }
}

/// A `<script>` or `<script setup>` block, or a compiled script.
pub struct ScriptBlock<'c>(Block<'c>);

impl ScriptBlock<'_> {
    fn owned(&self) -> &Owned<'_> {
        &self.0 .0
    }

    pub fn is_setup(&self) -> bool {
        self.owned().get(|ctx, h| ctx.script_has_setup(h))
    }

    pub fn setup_value(&self) -> Option<&str> {
        if self.is_setup() {
            non_empty(self.owned().text(Context::script_setup_value))
        } else {
            None
        }
    }

    /// Binding name to binding type, in declaration order.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        let count = self.owned().get(|ctx, h| ctx.script_bindings_count(h));
        let keys = self.owned().texts(count, Context::script_bindings_key_at);
        let values = self.owned().texts(count, Context::script_bindings_value_at);
        keys.into_iter().zip(values).collect()
    }

    /// Local name to import metadata.
    pub fn imports(&self) -> Vec<(String, ImportBinding)> {
        self.owned().get(|ctx, h| {
            (0..ctx.script_imports_count(h))
                .filter_map(|i| {
                    let key = ctx.script_imports_key_at(h, i).to_string();
                    let b = ctx.script_imports_value_at(h, i);
                    if b.is_null() {
                        return None;
                    }
                    let binding = ImportBinding {
                        is_type: ctx.import_binding_is_type(b),
                        imported: ctx.import_binding_imported(b).to_string(),
                        source: ctx.import_binding_source(b).to_string(),
                        is_from_setup: ctx.import_binding_is_from_setup(b),
                    };
                    ctx.release(b);
                    Some((key, binding))
                })
                .collect()
        })
    }

    pub fn warnings(&self) -> Vec<&str> {
        let count = self.owned().get(|ctx, h| ctx.script_warnings_count(h));
        self.owned().texts(count, Context::script_warning_at)
    }

    pub fn deps(&self) -> Vec<&str> {
        let count = self.owned().get(|ctx, h| ctx.script_deps_count(h));
        self.owned().texts(count, Context::script_dep_at)
    }
}

impl<'c> Deref for ScriptBlock<'c> {
    type Target = Block<'c>;

    fn deref(&self) -> &Block<'c> {
        &self.0
    }
}

/// Result of `compileScript`: the merged script block plus its bindings.
pub struct ScriptOutput<'c>(ScriptBlock<'c>);

impl<'c> Deref for ScriptOutput<'c> {
    type Target = ScriptBlock<'c>;

    fn deref(&self) -> &ScriptBlock<'c> {
        &self.0
    }
}

pub struct TemplateOutput<'c>(Owned<'c>);

impl TemplateOutput<'_> {
    pub fn code(&self) -> &str {
        self.0.text(Context::template_result_code)
    }

    pub fn errors(&self) -> Vec<&str> {
        let count = self.0.get(|ctx, h| ctx.template_result_error_count(h));
        self.0.texts(count, Context::template_result_error_message)
    }

    pub fn tips(&self) -> Vec<&str> {
        let count = self.0.get(|ctx, h| ctx.template_result_tips_count(h));
        self.0.texts(count, Context::template_result_tip_at)
    }
}

pub struct StyleOutput<'c>(Owned<'c>);

impl StyleOutput<'_> {
    pub fn code(&self) -> &str {
        self.0.text(Context::style_result_code)
    }

    pub fn errors(&self) -> Vec<&str> {
        let count = self.0.get(|ctx, h| ctx.style_result_error_count(h));
        self.0.texts(count, Context::style_result_error_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_invocation_allocates_nothing() {
        let compiler = Compiler::new().unwrap();
        let parsed = compiler.parse("<template><p/></template>", "a.vue").unwrap();
        let descriptor = parsed.descriptor().unwrap();
        assert_eq!(
            descriptor.compile_script("x", false).err(),
            Some(CompileError::NoScript("compileScript"))
        );
        assert_eq!(compiler.live_count(), 2);
    }

    #[test]
    fn test_text_outlives_sibling_reads() {
        let compiler = Compiler::new().unwrap();
        let style = compiler.compile_style(".a{color:red}", "a.vue", "x", false).unwrap();
        let first = style.code();
        for _ in 0..50 {
            style.code();
        }
        assert_eq!(first, style.code());
        assert_eq!(compiler.live_count(), 1);
    }
}
