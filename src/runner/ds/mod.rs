//! Managed value model: values, objects, the allocation budget and the
//! exception type raised by entry points.

pub mod builder;
pub mod error;
pub mod heap;
pub mod object;
pub mod value;
