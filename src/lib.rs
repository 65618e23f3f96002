//! # sfc-bridge - handle-based access to an embedded SFC compiler
//!
//! An embedded runtime hosts a single-file-component compiler as a program
//! unit. Callers never touch its values directly: every result lives in a
//! per-context arena and is addressed by an integer [`Handle`].
//!
//! - `runner` - managed values, program units and the runtime facade
//! - `sfc` - the compiler unit (`parse`, `compileScript`, `compileTemplate`,
//!   `compileStyle`)
//! - `bridge` - handle arena, accessors, the C ABI and the self-releasing
//!   typed layer (`bridge::owned`)
//!
//! ## Quick Start
//!
//! ```
//! use sfc_bridge::Context;
//!
//! let mut ctx = Context::new().unwrap();
//! let parsed = ctx.parse(b"<template><p>{{ msg }}</p></template>", b"App.vue");
//! assert_eq!(ctx.parse_result_error_count(parsed), 0);
//!
//! let descriptor = ctx.parse_result_descriptor(parsed);
//! let template = ctx.template(descriptor);
//! let source = ctx.block_content(template).to_string();
//!
//! let compiled = ctx.compile_template(source.as_bytes(), b"App.vue", b"app", false, Default::default());
//! assert!(ctx.template_result_code(compiled).contains("_ctx.msg"));
//!
//! ctx.release(compiled);
//! ctx.release(template);
//! ctx.release(descriptor);
//! ctx.release(parsed);
//! assert_eq!(ctx.arena().live_count(), 0);
//! ```

#[macro_use]
extern crate lazy_static;

pub mod bridge;
pub mod parser;
pub mod runner;
pub mod sfc;

pub use bridge::{Compiler, Context, Handle};
