//! Handle-based bridge over the runtime.
//!
//! A [`Context`] owns one runtime and one [`HandleArena`]. Invocations store
//! their results in the arena and return a [`Handle`]; accessors read fields
//! of those values by handle and return plain Rust scalars or `&str` views
//! into the per-handle string cache. [`ffi`] exposes the same surface as a C
//! ABI, and [`owned`] wraps it in typed values that release their handles on
//! drop.

pub mod accessor;
pub mod arena;
pub mod context;
pub mod ffi;
pub mod owned;

pub use arena::{Handle, HandleArena, Shape};
pub use context::Context;
pub use owned::Compiler;
