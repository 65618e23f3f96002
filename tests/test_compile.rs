//! End-to-end tests: parse a component, then compile its blocks by handle.

extern crate sfc_bridge;

use sfc_bridge::{Context, Handle};

fn context() -> Context {
    Context::new().unwrap()
}

fn descriptor(ctx: &mut Context, source: &str) -> Handle {
    let parsed = ctx.parse(source.as_bytes(), b"App.vue");
    ctx.parse_result_descriptor(parsed)
}

fn template_code(ctx: &mut Context, source: &str, scoped: bool, bindings: Handle) -> String {
    let h = ctx.compile_template(source.as_bytes(), b"App.vue", b"data-v-abc", scoped, bindings);
    assert!(!h.is_null());
    let code = ctx.template_result_code(h).to_string();
    ctx.release(h);
    code
}

// ============================================================================
// compileTemplate
// ============================================================================

#[test]
fn test_minimal_template() {
    let mut ctx = context();
    let code = template_code(&mut ctx, "<div>hello</div>", false, Handle::NULL);
    assert_eq!(
        code,
        "import { openBlock as _openBlock, createElementBlock as _createElementBlock } from \"vue\"\n\n\
         export function render(_ctx, _cache) {\n  \
         return (_openBlock(), _createElementBlock(\"div\", null, \"hello\"))\n}"
    );
}

#[test]
fn test_bindings_change_output() {
    let mut ctx = context();
    let d = descriptor(&mut ctx, "<script setup>\nimport { ref } from 'vue'\nconst count = ref(0)\n</script>");
    let script = ctx.compile_script(d, b"data-v-abc", false);
    let bindings = ctx.script_result_bindings(script);

    let with = template_code(&mut ctx, "<b>{{ count }}</b>", false, bindings);
    let without = template_code(&mut ctx, "<b>{{ count }}</b>", false, Handle::NULL);
    assert!(with.contains("_toDisplayString($setup.count)"));
    assert!(with.contains("export function render(_ctx, _cache, $props, $setup, $data, $options)"));
    assert!(without.contains("_toDisplayString(_ctx.count)"));
}

#[test]
fn test_non_bindings_handle_is_ignored() {
    let mut ctx = context();
    let d = descriptor(&mut ctx, "<template><b/></template>");
    let with_descriptor = template_code(&mut ctx, "<b>{{ x }}</b>", false, d);
    let without = template_code(&mut ctx, "<b>{{ x }}</b>", false, Handle::NULL);
    assert_eq!(with_descriptor, without);
}

#[test]
fn test_scoped_template_adds_attribute() {
    let mut ctx = context();
    let code = template_code(&mut ctx, "<div><span/></div>", true, Handle::NULL);
    assert!(code.contains("\"data-v-abc\": \"\""));
}

#[test]
fn test_template_errors() {
    let mut ctx = context();
    let h = ctx.compile_template(b"<div v-else>x</div>", b"App.vue", b"x", false, Handle::NULL);
    assert_eq!(ctx.template_result_code(h), "");
    assert_eq!(ctx.template_result_error_count(h), 1);
    assert!(!ctx.template_result_error_message(h, 0).is_empty());
    assert_eq!(ctx.template_result_error_message(h, 1), "");
    assert_eq!(ctx.template_result_tip_at(h, 0), "");
}

// ============================================================================
// compileStyle
// ============================================================================

#[test]
fn test_scoped_style() {
    let mut ctx = context();
    let d = descriptor(&mut ctx, "<style scoped>\n.a .b:hover { color: red }\n</style>");
    let style = ctx.style_at(d, 0);
    let scoped = ctx.style_is_scoped(style);
    let content = ctx.block_content(style).to_string();
    let h = ctx.compile_style(content.as_bytes(), b"App.vue", b"data-v-abc", scoped);
    assert_eq!(ctx.style_result_error_count(h), 0);
    assert!(ctx.style_result_code(h).contains(".a .b[data-v-abc]:hover { color: red }"));
}

#[test]
fn test_style_v_bind() {
    let mut ctx = context();
    let h = ctx.compile_style(b".a { color: v-bind(color) }", b"App.vue", b"data-v-abc", false);
    assert_eq!(ctx.style_result_code(h), ".a { color: var(--abc-color) }");
}

#[test]
fn test_style_syntax_error() {
    let mut ctx = context();
    let h = ctx.compile_style(b".a { color: red", b"App.vue", b"x", true);
    assert_eq!(ctx.style_result_code(h), "");
    assert_eq!(ctx.style_result_error_count(h), 1);
    assert!(ctx.style_result_error_message(h, 0).ends_with("Unclosed block"));
}

// ============================================================================
// compileScript
// ============================================================================

#[test]
fn test_compile_script_without_script_is_null() {
    let mut ctx = context();
    let d = descriptor(&mut ctx, "<template><div/></template>");
    let live = ctx.arena().live_count();
    assert_eq!(ctx.compile_script(d, b"x", false), Handle::NULL);
    assert_eq!(ctx.arena().live_count(), live);
}

#[test]
fn test_compile_script_options_api() {
    let mut ctx = context();
    let d = descriptor(&mut ctx, "<script>\nexport default { data() { return { a: 1 } } }\n</script>");
    let script = ctx.compile_script(d, b"x", false);
    assert!(!script.is_null());
    assert!(!ctx.script_has_setup(script));
    assert!(ctx.script_result_content(script).contains("export default"));
}

#[test]
fn test_full_component() {
    let source = "<script setup>\nimport { ref } from 'vue'\nconst color = ref('red')\nconst n = ref(1)\n</script>\n\
                  <template><button @click=\"n++\">{{ n }}</button></template>\n\
                  <style scoped>button { color: v-bind(color) }</style>";
    let mut ctx = context();
    let d = descriptor(&mut ctx, source);
    assert_eq!(ctx.css_vars_count(d), 1);

    let script = ctx.compile_script(d, b"data-v-abc", false);
    let bindings = ctx.script_result_bindings(script);

    let t = ctx.template(d);
    let content = ctx.block_content(t).to_string();
    let code = template_code(&mut ctx, &content, true, bindings);
    assert!(code.contains("$setup.n"));

    let s = ctx.style_at(d, 0);
    let css = ctx.block_content(s).to_string();
    let h = ctx.compile_style(css.as_bytes(), b"App.vue", b"data-v-abc", true);
    assert!(ctx.style_result_code(h).contains("button[data-v-abc] { color: var(--abc-color) }"));

    for h in [h, s, t, bindings, script, d] {
        ctx.release(h);
    }
    assert_eq!(ctx.arena().live_count(), 1);
}
