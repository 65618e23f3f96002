//! Grammars and scanners used by the compiler unit.

pub mod script;
pub mod style;
pub mod template;
pub mod util;
