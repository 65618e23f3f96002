//! The embedded runtime: managed values, program units, and the facade that
//! loads a unit and invokes its entry points.

pub mod ds;
pub mod plugin;
pub mod runtime;

pub use runtime::{EntryPoint, Runtime, RuntimeError};
