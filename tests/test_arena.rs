//! Handle lifecycle tests through the public `Context` API.

extern crate sfc_bridge;

use sfc_bridge::{Context, Handle};

const APP: &[u8] = b"<template><p>{{ msg }}</p></template>\n<style scoped>.a { color: red }</style>";

fn context() -> Context {
    Context::new().unwrap()
}

// ============================================================================
// Allocation and release
// ============================================================================

#[test]
fn test_handles_start_at_one() {
    let mut ctx = context();
    assert_eq!(ctx.parse(APP, b"App.vue"), Handle(1));
    assert_eq!(ctx.parse(APP, b"App.vue"), Handle(2));
}

#[test]
fn test_every_accessor_handle_is_new() {
    let mut ctx = context();
    let parsed = ctx.parse(APP, b"App.vue");
    let d1 = ctx.parse_result_descriptor(parsed);
    let d2 = ctx.parse_result_descriptor(parsed);
    assert_ne!(d1, d2);
    assert_eq!(ctx.arena().live_count(), 3);
    ctx.release(d1);
    assert!(ctx.has_template(d2));
    assert!(!ctx.has_template(d1));
}

#[test]
fn test_release_reuses_slots_last_in_first_out() {
    let mut ctx = context();
    let a = ctx.parse(APP, b"a.vue");
    let b = ctx.parse(APP, b"b.vue");
    ctx.release(a);
    ctx.release(b);
    assert_eq!(ctx.parse(APP, b"c.vue"), b);
    assert_eq!(ctx.parse(APP, b"d.vue"), a);
    assert_eq!(ctx.arena().capacity(), 2);
}

#[test]
fn test_double_release_is_a_no_op() {
    let mut ctx = context();
    let a = ctx.parse(APP, b"a.vue");
    ctx.release(a);
    ctx.release(a);
    ctx.release(Handle::NULL);
    ctx.release(Handle(1000));
    assert_eq!(ctx.arena().free_count(), 1);
    assert_eq!(ctx.parse(APP, b"b.vue"), a);
    assert_eq!(ctx.parse(APP, b"c.vue"), Handle(2));
}

#[test]
fn test_stale_handle_reads_as_empty() {
    let mut ctx = context();
    let parsed = ctx.parse(APP, b"App.vue");
    let descriptor = ctx.parse_result_descriptor(parsed);
    ctx.release(descriptor);
    assert_eq!(ctx.filename(descriptor), "");
    assert_eq!(ctx.style_count(descriptor), 0);
    assert_eq!(ctx.template(descriptor), Handle::NULL);
}

// ============================================================================
// String cache
// ============================================================================

#[test]
fn test_strings_are_nul_terminated() {
    let mut ctx = context();
    let parsed = ctx.parse(APP, b"App.vue");
    let descriptor = ctx.parse_result_descriptor(parsed);
    let name = ctx.filename(descriptor);
    assert_eq!(name, "App.vue");
    let terminator = unsafe { *name.as_ptr().add(name.len()) };
    assert_eq!(terminator, 0);
}

#[test]
fn test_repeated_reads_grow_the_cache() {
    let mut ctx = context();
    let parsed = ctx.parse(APP, b"App.vue");
    let descriptor = ctx.parse_result_descriptor(parsed);
    let first = ctx.source(descriptor).as_ptr();
    let again = ctx.source(descriptor).to_string();
    assert_eq!(again.as_bytes(), APP);
    ctx.filename(descriptor);
    let slot = ctx.arena().resolve(descriptor).unwrap();
    assert_eq!(slot.cached_strings(), 3);
    assert_ne!(ctx.source(descriptor).as_ptr(), first);
}

#[test]
fn test_missing_fields_use_the_shared_empty_string() {
    let mut ctx = context();
    let parsed = ctx.parse(APP, b"App.vue");
    let descriptor = ctx.parse_result_descriptor(parsed);
    let template = ctx.template(descriptor);
    let lang = ctx.block_lang(template);
    assert_eq!(lang, "");
    assert_eq!(unsafe { *lang.as_ptr() }, 0);
    assert_eq!(ctx.arena().resolve(template).unwrap().cached_strings(), 0);
}

// ============================================================================
// Contexts
// ============================================================================

#[test]
fn test_contexts_are_isolated() {
    let mut one = context();
    let mut two = context();
    assert_ne!(one.id(), two.id());
    let h1 = one.parse(APP, b"one.vue");
    let h2 = two.parse(b"<template><i/></template>", b"two.vue");
    assert_eq!(h1, h2);
    let d1 = one.parse_result_descriptor(h1);
    let d2 = two.parse_result_descriptor(h2);
    assert_eq!(one.filename(d1), "one.vue");
    assert_eq!(two.filename(d2), "two.vue");
    assert_eq!(one.style_count(d1), 1);
    assert_eq!(two.style_count(d2), 0);
    drop(one);
    assert_eq!(two.filename(d2), "two.vue");
}
