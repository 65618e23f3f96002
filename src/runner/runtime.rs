//! The runtime facade: one engine instance, one loaded program unit, and a
//! fixed table of entry points resolved once.
//!
//! A `Runtime` is driven from one thread at a time. It holds `Rc` values and
//! is therefore neither `Send` nor `Sync`; isolation between threads comes
//! from giving each thread its own instance.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::RuntimeConfig;
use crate::runner::plugin::registry::{ExportRegistry, UnitError};
use crate::runner::plugin::resolver::resolve_unit;
use crate::runner::plugin::types::{EntryFn, InvokeContext};

/// Entry points every program unit must export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Parse,
    CompileScript,
    CompileTemplate,
    CompileStyle,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 4] = [
        EntryPoint::Parse,
        EntryPoint::CompileScript,
        EntryPoint::CompileTemplate,
        EntryPoint::CompileStyle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntryPoint::Parse => "parse",
            EntryPoint::CompileScript => "compileScript",
            EntryPoint::CompileTemplate => "compileTemplate",
            EntryPoint::CompileStyle => "compileStyle",
        }
    }

    fn index(&self) -> usize {
        match self {
            EntryPoint::Parse => 0,
            EntryPoint::CompileScript => 1,
            EntryPoint::CompileTemplate => 2,
            EntryPoint::CompileStyle => 3,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Failure to bring a runtime up. There is no fallback engine, so callers
/// treat this as the capability being unavailable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("failed to load program unit: {0}")]
    UnitLoad(#[source] UnitError),
    #[error("entry point `{0}` could not be resolved: {1}")]
    MissingEntryPoint(EntryPoint, #[source] UnitError),
}

struct Loaded {
    registry: ExportRegistry,
    entries: [Rc<EntryFn>; 4],
}

pub struct Runtime {
    tag: String,
    config: RuntimeConfig,
    ctx: InvokeContext,
    loaded: Option<Loaded>,
}

impl Runtime {
    /// Creates an instance without starting it; see [`Runtime::acquire`].
    pub fn new(tag: impl Into<String>, config: RuntimeConfig) -> Self {
        let ctx = InvokeContext::with_heap(config.heap.clone());
        Runtime {
            tag: tag.into(),
            config,
            ctx,
            loaded: None,
        }
    }

    /// Loads the configured unit and resolves every entry point.
    ///
    /// The first successful call does the work; later calls return `Ok(())`
    /// immediately. A failed call leaves the instance unloaded.
    pub fn acquire(&mut self) -> Result<(), RuntimeError> {
        if self.loaded.is_some() {
            return Ok(());
        }
        let unit = resolve_unit(&self.config.program.unit).map_err(RuntimeError::UnitLoad)?;
        let mut registry = ExportRegistry::new();
        unit.initialize(&mut registry)
            .map_err(RuntimeError::UnitLoad)?;
        registry.register_unit(unit.info());

        let export = unit.export_name();
        let resolve = |entry: EntryPoint| {
            registry
                .resolve_method(export, entry.name())
                .map_err(|e| RuntimeError::MissingEntryPoint(entry, e))
        };
        let entries = [
            resolve(EntryPoint::Parse)?,
            resolve(EntryPoint::CompileScript)?,
            resolve(EntryPoint::CompileTemplate)?,
            resolve(EntryPoint::CompileStyle)?,
        ];
        debug!(
            "[{}] loaded program unit `{}` (export `{}`)",
            self.tag, self.config.program.unit, export
        );
        self.loaded = Some(Loaded { registry, entries });
        Ok(())
    }

    pub fn is_acquired(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn registry(&self) -> Option<&ExportRegistry> {
        self.loaded.as_ref().map(|l| &l.registry)
    }

    pub fn heap_high_water_mark(&self) -> usize {
        self.ctx.heap.high_water_mark()
    }

    /// Calls a resolved entry point.
    ///
    /// Returns `None` when the instance is not acquired, when the entry point
    /// throws, or when the result does not fit in the heap budget.
    pub fn invoke(&mut self, entry: EntryPoint, args: Vec<JsValue>) -> Option<JsValue> {
        let loaded = self.loaded.as_ref()?;
        let func = loaded.entries[entry.index()].clone();
        self.ctx.heap.reset();
        let result = func
            .call(&mut self.ctx, JsValue::Undefined, args)
            .and_then(|value| self.ctx.track(value));
        match result {
            Ok(JsValue::Undefined) => None,
            Ok(value) => Some(value),
            Err(e) => {
                warn!("[{}] `{}` threw: {}", self.tag, entry, e);
                None
            }
        }
    }
}
