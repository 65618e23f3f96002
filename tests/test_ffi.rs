//! Tests for the C ABI, called from Rust the way a C host would.

extern crate sfc_bridge;

use std::ffi::CString;
use std::ptr;

use sfc_bridge::bridge::ffi::*;

const APP: &str = "<template><p>{{ msg }}</p></template>\n<style scoped>.a { color: red }</style>";

fn text(s: SfcStr) -> String {
    String::from_utf8(unsafe { s.as_bytes() }.to_vec()).unwrap()
}

fn parse(rt: *mut SfcRuntime, source: &str) -> u64 {
    unsafe { sfc_parse(rt, source.as_ptr(), source.len(), b"App.vue".as_ptr(), 7) }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_create_and_destroy() {
    let rt = sfc_runtime_create();
    assert!(!rt.is_null());
    unsafe {
        assert_eq!(parse(rt, APP), 1);
        sfc_runtime_destroy(rt);
        sfc_runtime_destroy(ptr::null_mut());
    }
}

#[test]
fn test_unknown_context_returns_null_results() {
    let rt = 8 as *mut SfcRuntime;
    assert_eq!(parse(rt, APP), 0);
    unsafe {
        assert_eq!(sfc_style_count(rt, 1), 0);
        assert_eq!(text(sfc_filename(rt, 1)), "");
        sfc_handle_free(rt, 1);
        sfc_runtime_destroy(rt);
    }
}

#[test]
fn test_null_context() {
    let rt: *mut SfcRuntime = ptr::null_mut();
    assert_eq!(parse(rt, APP), 0);
    unsafe {
        assert!(!sfc_has_template(rt, 1));
        assert_eq!(sfc_block_loc_start_line(rt, 1), 0);
    }
}

#[test]
fn test_create_with_config() {
    let good = b"[program]\nunit = \"sfc\"\n";
    let bad = b"[program]\nunit = \"nope\"\n";
    unsafe {
        let rt = sfc_runtime_create_with_config(good.as_ptr(), good.len());
        assert!(!rt.is_null());
        sfc_runtime_destroy(rt);
        assert!(sfc_runtime_create_with_config(bad.as_ptr(), bad.len()).is_null());
        assert!(sfc_runtime_create_with_config(b"[[".as_ptr(), 2).is_null());
    }
}

// ============================================================================
// Handles and text
// ============================================================================

#[test]
fn test_parse_and_read() {
    let rt = sfc_runtime_create();
    unsafe {
        let parsed = parse(rt, APP);
        assert_eq!(parsed, 1);
        assert_eq!(sfc_parse_result_error_count(rt, parsed), 0);
        let d = sfc_parse_result_descriptor(rt, parsed);
        assert!(sfc_has_template(rt, d));
        assert_eq!(sfc_style_count(rt, d), 1);

        let name = sfc_filename(rt, d);
        assert_eq!(text(name), "App.vue");
        assert_eq!(*name.ptr.add(name.len), 0);

        let t = sfc_template(rt, d);
        assert_eq!(text(sfc_block_content(rt, t)), "<p>{{ msg }}</p>");
        let lang = sfc_block_lang(rt, t);
        assert_eq!(lang.len, 0);
        assert_eq!(*lang.ptr, 0);

        sfc_handle_free(rt, t);
        sfc_handle_free(rt, t);
        assert_eq!(text(sfc_block_content(rt, t)), "");
        sfc_runtime_destroy(rt);
    }
}

#[test]
fn test_cstr_variants() {
    let rt = sfc_runtime_create();
    let source = CString::new(APP).unwrap();
    let filename = CString::new("App.vue").unwrap();
    let id = CString::new("data-v-1").unwrap();
    unsafe {
        let parsed = sfc_parse_cstr(rt, source.as_ptr(), filename.as_ptr());
        let d = sfc_parse_result_descriptor(rt, parsed);
        assert_eq!(text(sfc_filename(rt, d)), "App.vue");

        let tpl = CString::new("<p>{{ msg }}</p>").unwrap();
        let t = sfc_compile_template_cstr(rt, tpl.as_ptr(), filename.as_ptr(), id.as_ptr(), true, 0);
        assert!(text(sfc_template_result_code(rt, t)).contains("\"data-v-1\": \"\""));

        let css = CString::new(".a { color: red }").unwrap();
        let s = sfc_compile_style_cstr(rt, css.as_ptr(), filename.as_ptr(), id.as_ptr(), true);
        assert_eq!(text(sfc_style_result_code(rt, s)), ".a[data-v-1] { color: red }");

        assert_eq!(sfc_compile_script_cstr(rt, d, id.as_ptr(), false), 0);
        sfc_runtime_destroy(rt);
    }
}

#[test]
fn test_null_text_arguments_are_empty() {
    let rt = sfc_runtime_create();
    unsafe {
        let parsed = sfc_parse(rt, ptr::null(), 0, ptr::null(), 0);
        assert_ne!(parsed, 0);
        let d = sfc_parse_result_descriptor(rt, parsed);
        assert_eq!(text(sfc_filename(rt, d)), "anonymous.vue");
        assert_eq!(text(sfc_source(rt, d)), "");
        assert!(!sfc_has_template(rt, d));
        sfc_runtime_destroy(rt);
    }
}

#[test]
fn test_script_pipeline() {
    let rt = sfc_runtime_create();
    let source = "<script setup>\nimport { ref } from 'vue'\nconst n = ref(0)\n</script>";
    unsafe {
        let parsed = parse(rt, source);
        let d = sfc_parse_result_descriptor(rt, parsed);
        let script = sfc_compile_script(rt, d, b"x".as_ptr(), 1, false);
        assert_ne!(script, 0);
        assert!(sfc_script_has_setup(rt, script));
        assert!(sfc_script_bindings_count(rt, script) >= 2);
        assert_eq!(text(sfc_script_imports_key_at(rt, script, 0)), "ref");
        let import = sfc_script_imports_value_at(rt, script, 0);
        assert_eq!(text(sfc_import_binding_source(rt, import)), "vue");
        assert!(!sfc_import_binding_is_type(rt, import));

        let bindings = sfc_script_result_bindings(rt, script);
        let tpl = "<i>{{ n }}</i>";
        let t = sfc_compile_template(rt, tpl.as_ptr(), tpl.len(), ptr::null(), 0, ptr::null(), 0, false, bindings);
        assert!(text(sfc_template_result_code(rt, t)).contains("$setup.n"));
        assert_eq!(sfc_template_result_error_count(rt, t), 0);
        sfc_runtime_destroy(rt);
    }
}

#[test]
fn test_contexts_do_not_share_handles() {
    let a = sfc_runtime_create();
    let b = sfc_runtime_create();
    let h = parse(a, APP);
    unsafe {
        assert_eq!(sfc_parse_result_error_count(b, h), 0);
        assert_eq!(sfc_parse_result_descriptor(b, h), 0);
        assert_ne!(sfc_parse_result_descriptor(a, h), 0);
        sfc_runtime_destroy(a);
        sfc_runtime_destroy(b);
    }
}
