//! C ABI over [`Context`].
//!
//! Every function takes the context pointer first. A null pointer, a pointer
//! that was never returned by `sfc_runtime_create*` or one that was already
//! destroyed gets the null result, as does any call that panics.
//!
//! Text comes back as [`SfcStr`]. Its `ptr` is NUL-terminated and stays valid
//! until the handle it was read from is freed or the context is destroyed.
//!
//! # Safety
//!
//! Byte arguments must point to at least `len` readable bytes, or be null.
//! `_cstr` arguments must be null or NUL-terminated.

#![allow(clippy::missing_safety_doc)]

use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;
use std::sync::Mutex;

use tracing::warn;

use crate::bridge::arena::{empty_str, Handle};
use crate::bridge::context::Context;
use crate::runner::plugin::config::RuntimeConfig;
use crate::runner::runtime::RuntimeError;

pub type SfcRuntime = Context;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SfcStr {
    pub ptr: *const c_char,
    pub len: usize,
}

impl SfcStr {
    fn new(s: &str) -> Self {
        SfcStr {
            ptr: s.as_ptr() as *const c_char,
            len: s.len(),
        }
    }

    fn empty() -> Self {
        SfcStr::new(empty_str())
    }

    /// # Safety
    /// `self` must come from a live handle.
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        slice::from_raw_parts(self.ptr as *const u8, self.len)
    }
}

lazy_static! {
    static ref LIVE: Mutex<HashSet<usize>> = Mutex::new(HashSet::new());
}

fn live() -> std::sync::MutexGuard<'static, HashSet<usize>> {
    LIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn is_live(rt: *mut SfcRuntime) -> bool {
    !rt.is_null() && live().contains(&(rt as usize))
}

fn guarded<T>(name: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(_) => {
            warn!("`{}` panicked; returning the null result", name);
            fallback
        }
    }
}

fn with_context<T>(rt: *mut SfcRuntime, name: &str, fallback: T, f: impl FnOnce(&mut Context) -> T) -> T {
    if !is_live(rt) {
        return fallback;
    }
    guarded(name, fallback, || f(unsafe { &mut *rt }))
}

unsafe fn bytes<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len)
    }
}

unsafe fn cstr<'a>(ptr: *const c_char) -> &'a [u8] {
    if ptr.is_null() {
        &[]
    } else {
        CStr::from_ptr(ptr).to_bytes()
    }
}

fn register(result: Result<Context, RuntimeError>) -> *mut SfcRuntime {
    match result {
        Ok(ctx) => {
            let rt = Box::into_raw(Box::new(ctx));
            live().insert(rt as usize);
            rt
        }
        Err(e) => {
            warn!("runtime creation failed: {}", e);
            ptr::null_mut()
        }
    }
}

// ==== lifecycle ====

#[no_mangle]
pub extern "C" fn sfc_runtime_create() -> *mut SfcRuntime {
    guarded("sfc_runtime_create", ptr::null_mut(), || register(Context::new()))
}

/// Creates a runtime from TOML configuration text.
#[no_mangle]
pub unsafe extern "C" fn sfc_runtime_create_with_config(config: *const u8, config_len: usize) -> *mut SfcRuntime {
    guarded("sfc_runtime_create_with_config", ptr::null_mut(), || {
        let text = String::from_utf8_lossy(bytes(config, config_len));
        match RuntimeConfig::parse(&text) {
            Ok(config) => register(Context::with_config(config)),
            Err(e) => {
                warn!("runtime creation failed: {}", e);
                ptr::null_mut()
            }
        }
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_runtime_destroy(rt: *mut SfcRuntime) {
    if rt.is_null() || !live().remove(&(rt as usize)) {
        return;
    }
    guarded("sfc_runtime_destroy", (), || drop(Box::from_raw(rt)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_handle_free(rt: *mut SfcRuntime, h: u64) {
    with_context(rt, "sfc_handle_free", (), |ctx| ctx.release(Handle(h)))
}

// ==== invocations ====

#[no_mangle]
pub unsafe extern "C" fn sfc_parse(
    rt: *mut SfcRuntime,
    src: *const u8,
    src_len: usize,
    filename: *const u8,
    filename_len: usize,
) -> u64 {
    with_context(rt, "sfc_parse", 0, |ctx| {
        ctx.parse(bytes(src, src_len), bytes(filename, filename_len)).0
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_parse_cstr(rt: *mut SfcRuntime, src: *const c_char, filename: *const c_char) -> u64 {
    with_context(rt, "sfc_parse_cstr", 0, |ctx| ctx.parse(cstr(src), cstr(filename)).0)
}

#[no_mangle]
pub unsafe extern "C" fn sfc_compile_script(
    rt: *mut SfcRuntime,
    desc: u64,
    id: *const u8,
    id_len: usize,
    is_prod: bool,
) -> u64 {
    with_context(rt, "sfc_compile_script", 0, |ctx| {
        ctx.compile_script(Handle(desc), bytes(id, id_len), is_prod).0
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_compile_script_cstr(
    rt: *mut SfcRuntime,
    desc: u64,
    id: *const c_char,
    is_prod: bool,
) -> u64 {
    with_context(rt, "sfc_compile_script_cstr", 0, |ctx| {
        ctx.compile_script(Handle(desc), cstr(id), is_prod).0
    })
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn sfc_compile_template(
    rt: *mut SfcRuntime,
    src: *const u8,
    src_len: usize,
    filename: *const u8,
    filename_len: usize,
    id: *const u8,
    id_len: usize,
    scoped: bool,
    bindings: u64,
) -> u64 {
    with_context(rt, "sfc_compile_template", 0, |ctx| {
        ctx.compile_template(
            bytes(src, src_len),
            bytes(filename, filename_len),
            bytes(id, id_len),
            scoped,
            Handle(bindings),
        )
        .0
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_compile_template_cstr(
    rt: *mut SfcRuntime,
    src: *const c_char,
    filename: *const c_char,
    id: *const c_char,
    scoped: bool,
    bindings: u64,
) -> u64 {
    with_context(rt, "sfc_compile_template_cstr", 0, |ctx| {
        ctx.compile_template(cstr(src), cstr(filename), cstr(id), scoped, Handle(bindings))
            .0
    })
}

#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn sfc_compile_style(
    rt: *mut SfcRuntime,
    src: *const u8,
    src_len: usize,
    filename: *const u8,
    filename_len: usize,
    id: *const u8,
    id_len: usize,
    scoped: bool,
) -> u64 {
    with_context(rt, "sfc_compile_style", 0, |ctx| {
        ctx.compile_style(
            bytes(src, src_len),
            bytes(filename, filename_len),
            bytes(id, id_len),
            scoped,
        )
        .0
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_compile_style_cstr(
    rt: *mut SfcRuntime,
    src: *const c_char,
    filename: *const c_char,
    id: *const c_char,
    scoped: bool,
) -> u64 {
    with_context(rt, "sfc_compile_style_cstr", 0, |ctx| {
        ctx.compile_style(cstr(src), cstr(filename), cstr(id), scoped).0
    })
}

// ==== accessor plumbing ====

fn text_of(rt: *mut SfcRuntime, name: &str, f: impl FnOnce(&mut Context) -> SfcStr) -> SfcStr {
    with_context(rt, name, SfcStr::empty(), f)
}

fn handle_of(rt: *mut SfcRuntime, name: &str, f: impl FnOnce(&mut Context) -> Handle) -> u64 {
    with_context(rt, name, 0, |ctx| f(ctx).0)
}

// ==== parse result ====

#[no_mangle]
pub unsafe extern "C" fn sfc_parse_result_descriptor(rt: *mut SfcRuntime, h: u64) -> u64 {
    handle_of(rt, "sfc_parse_result_descriptor", |c| c.parse_result_descriptor(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_parse_result_error_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_parse_result_error_count", 0, |c| c.parse_result_error_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_parse_result_error_message(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_parse_result_error_message", |c| {
        SfcStr::new(c.parse_result_error_message(Handle(h), i))
    })
}

// ==== descriptor ====

#[no_mangle]
pub unsafe extern "C" fn sfc_has_template(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_has_template", false, |c| c.has_template(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_has_script(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_has_script", false, |c| c.has_script(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_has_script_setup(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_has_script_setup", false, |c| c.has_script_setup(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_template(rt: *mut SfcRuntime, h: u64) -> u64 {
    handle_of(rt, "sfc_template", |c| c.template(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script(rt: *mut SfcRuntime, h: u64) -> u64 {
    handle_of(rt, "sfc_script", |c| c.script(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_setup(rt: *mut SfcRuntime, h: u64) -> u64 {
    handle_of(rt, "sfc_script_setup", |c| c.script_setup(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_style_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_style_count", 0, |c| c.style_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_style_at(rt: *mut SfcRuntime, h: u64, i: usize) -> u64 {
    handle_of(rt, "sfc_style_at", |c| c.style_at(Handle(h), i))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_custom_blocks_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_custom_blocks_count", 0, |c| c.custom_blocks_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_custom_block_at(rt: *mut SfcRuntime, h: u64, i: usize) -> u64 {
    handle_of(rt, "sfc_custom_block_at", |c| c.custom_block_at(Handle(h), i))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_css_vars_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_css_vars_count", 0, |c| c.css_vars_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_css_var_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_css_var_at", |c| SfcStr::new(c.css_var_at(Handle(h), i)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_slotted(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_slotted", false, |c| c.slotted(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_source(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_source", |c| SfcStr::new(c.source(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_filename(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_filename", |c| SfcStr::new(c.filename(Handle(h))))
}

// ==== any block ====

#[no_mangle]
pub unsafe extern "C" fn sfc_block_content(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_block_content", |c| SfcStr::new(c.block_content(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_lang(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_block_lang", |c| SfcStr::new(c.block_lang(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_src(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_block_src", |c| SfcStr::new(c.block_src(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_loc_start_offset(rt: *mut SfcRuntime, h: u64) -> u32 {
    with_context(rt, "sfc_block_loc_start_offset", 0, |c| c.block_loc_start_offset(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_loc_start_line(rt: *mut SfcRuntime, h: u64) -> u32 {
    with_context(rt, "sfc_block_loc_start_line", 0, |c| c.block_loc_start_line(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_loc_start_column(rt: *mut SfcRuntime, h: u64) -> u32 {
    with_context(rt, "sfc_block_loc_start_column", 0, |c| c.block_loc_start_column(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_loc_end_offset(rt: *mut SfcRuntime, h: u64) -> u32 {
    with_context(rt, "sfc_block_loc_end_offset", 0, |c| c.block_loc_end_offset(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_loc_end_line(rt: *mut SfcRuntime, h: u64) -> u32 {
    with_context(rt, "sfc_block_loc_end_line", 0, |c| c.block_loc_end_line(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_loc_end_column(rt: *mut SfcRuntime, h: u64) -> u32 {
    with_context(rt, "sfc_block_loc_end_column", 0, |c| c.block_loc_end_column(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_attrs_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_block_attrs_count", 0, |c| c.block_attrs_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_attrs_key_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_block_attrs_key_at", |c| SfcStr::new(c.block_attrs_key_at(Handle(h), i)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_attrs_value_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_block_attrs_value_at", |c| SfcStr::new(c.block_attrs_value_at(Handle(h), i)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_block_attrs_is_bool_at(rt: *mut SfcRuntime, h: u64, i: usize) -> bool {
    with_context(rt, "sfc_block_attrs_is_bool_at", false, |c| c.block_attrs_is_bool_at(Handle(h), i))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_custom_block_type(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_custom_block_type", |c| SfcStr::new(c.custom_block_type(Handle(h))))
}

// ==== style block ====

#[no_mangle]
pub unsafe extern "C" fn sfc_style_is_scoped(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_style_is_scoped", false, |c| c.style_is_scoped(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_style_has_module(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_style_has_module", false, |c| c.style_has_module(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_style_module_value(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_style_module_value", |c| SfcStr::new(c.style_module_value(Handle(h))))
}

// ==== script block or script result ====

#[no_mangle]
pub unsafe extern "C" fn sfc_script_has_setup(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_script_has_setup", false, |c| c.script_has_setup(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_setup_value(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_script_setup_value", |c| SfcStr::new(c.script_setup_value(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_bindings_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_script_bindings_count", 0, |c| c.script_bindings_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_bindings_key_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_script_bindings_key_at", |c| SfcStr::new(c.script_bindings_key_at(Handle(h), i)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_bindings_value_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_script_bindings_value_at", |c| {
        SfcStr::new(c.script_bindings_value_at(Handle(h), i))
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_imports_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_script_imports_count", 0, |c| c.script_imports_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_imports_key_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_script_imports_key_at", |c| SfcStr::new(c.script_imports_key_at(Handle(h), i)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_imports_value_at(rt: *mut SfcRuntime, h: u64, i: usize) -> u64 {
    handle_of(rt, "sfc_script_imports_value_at", |c| c.script_imports_value_at(Handle(h), i))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_warnings_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_script_warnings_count", 0, |c| c.script_warnings_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_warning_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_script_warning_at", |c| SfcStr::new(c.script_warning_at(Handle(h), i)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_deps_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_script_deps_count", 0, |c| c.script_deps_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_dep_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_script_dep_at", |c| SfcStr::new(c.script_dep_at(Handle(h), i)))
}

// ==== import binding ====

#[no_mangle]
pub unsafe extern "C" fn sfc_import_binding_is_type(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_import_binding_is_type", false, |c| c.import_binding_is_type(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_import_binding_imported(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_import_binding_imported", |c| SfcStr::new(c.import_binding_imported(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_import_binding_source(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_import_binding_source", |c| SfcStr::new(c.import_binding_source(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_import_binding_is_from_setup(rt: *mut SfcRuntime, h: u64) -> bool {
    with_context(rt, "sfc_import_binding_is_from_setup", false, |c| {
        c.import_binding_is_from_setup(Handle(h))
    })
}

// ==== script result ====

#[no_mangle]
pub unsafe extern "C" fn sfc_script_result_content(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_script_result_content", |c| SfcStr::new(c.script_result_content(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_script_result_bindings(rt: *mut SfcRuntime, h: u64) -> u64 {
    handle_of(rt, "sfc_script_result_bindings", |c| c.script_result_bindings(Handle(h)))
}

// ==== template result ====

#[no_mangle]
pub unsafe extern "C" fn sfc_template_result_code(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_template_result_code", |c| SfcStr::new(c.template_result_code(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_template_result_error_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_template_result_error_count", 0, |c| c.template_result_error_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_template_result_error_message(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_template_result_error_message", |c| {
        SfcStr::new(c.template_result_error_message(Handle(h), i))
    })
}

#[no_mangle]
pub unsafe extern "C" fn sfc_template_result_tips_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_template_result_tips_count", 0, |c| c.template_result_tips_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_template_result_tip_at(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_template_result_tip_at", |c| SfcStr::new(c.template_result_tip_at(Handle(h), i)))
}

// ==== style result ====

#[no_mangle]
pub unsafe extern "C" fn sfc_style_result_code(rt: *mut SfcRuntime, h: u64) -> SfcStr {
    text_of(rt, "sfc_style_result_code", |c| SfcStr::new(c.style_result_code(Handle(h))))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_style_result_error_count(rt: *mut SfcRuntime, h: u64) -> usize {
    with_context(rt, "sfc_style_result_error_count", 0, |c| c.style_result_error_count(Handle(h)))
}

#[no_mangle]
pub unsafe extern "C" fn sfc_style_result_error_message(rt: *mut SfcRuntime, h: u64, i: usize) -> SfcStr {
    text_of(rt, "sfc_style_result_error_message", |c| {
        SfcStr::new(c.style_result_error_message(Handle(h), i))
    })
}
