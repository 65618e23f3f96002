//! Program units and the registry of their exported entry points.
//!
//! The runtime never hard-codes what it hosts. A [`ProgramUnit`] registers one
//! or more [`ExportObject`](types::ExportObject)s into a
//! [`ExportRegistry`]; the facade then resolves a fixed set of entry point
//! names on the unit's exported object, once, and invokes them by handle.
//!
//! ```text
//! RuntimeConfig ── unit name ──▶ resolve_unit ──▶ ProgramUnit::initialize
//!                                                   │
//!                                                   ▼
//!                           ExportRegistry { "sfc": { parse, compileScript, ... } }
//!                                                   │
//!                                Runtime::acquire ──┘ (entry points cached as Rc<EntryFn>)
//! ```
//!
//! ## Example: a custom unit
//!
//! ```
//! use sfc_bridge::runner::ds::error::JErrorType;
//! use sfc_bridge::runner::ds::value::JsValue;
//! use sfc_bridge::runner::plugin::registry::{ExportRegistry, UnitError};
//! use sfc_bridge::runner::plugin::resolver::ProgramUnit;
//! use sfc_bridge::runner::plugin::types::{ExportObject, InvokeContext, UnitInfo};
//!
//! struct Upper;
//!
//! fn upper(_ctx: &mut InvokeContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
//!     match args.first().and_then(|a| a.as_str()) {
//!         Some(s) => Ok(JsValue::from(s.to_uppercase())),
//!         None => Err(JErrorType::TypeError("expected a string".to_string())),
//!     }
//! }
//!
//! impl ProgramUnit for Upper {
//!     fn info(&self) -> UnitInfo { UnitInfo::new("upper", "0.1.0") }
//!     fn export_name(&self) -> &str { "upper" }
//!     fn initialize(&self, registry: &mut ExportRegistry) -> Result<(), UnitError> {
//!         registry.register_object(ExportObject::new("upper").add_method("run", upper));
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ExportRegistry::new();
//! Upper.initialize(&mut registry).unwrap();
//! let run = registry.resolve_method("upper", "run").unwrap();
//! let out = run.call(&mut InvokeContext::new(), JsValue::Undefined, vec![JsValue::from("vue")]);
//! assert_eq!(out, Ok(JsValue::from("VUE")));
//! ```

pub mod config;
pub mod registry;
pub mod resolver;
pub mod types;

pub use registry::{ExportRegistry, UnitError};
pub use resolver::ProgramUnit;
