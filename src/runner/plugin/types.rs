//! What a program unit exports: callable entry functions grouped into named
//! objects, plus the context every call runs in.

use std::collections::HashMap;
use std::rc::Rc;

use crate::runner::ds::builder::estimate_size;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{Heap, HeapConfig};
use crate::runner::ds::value::JsValue;

/// State shared by every call into a loaded unit.
pub struct InvokeContext {
    pub heap: Heap,
}

impl InvokeContext {
    pub fn new() -> Self {
        Self::with_heap(HeapConfig::default())
    }

    pub fn with_heap(config: HeapConfig) -> Self {
        InvokeContext {
            heap: Heap::new(config),
        }
    }

    /// Charges the retained size of a result to the budget, then returns it.
    pub fn track(&mut self, value: JsValue) -> Result<JsValue, JErrorType> {
        self.heap.charge(estimate_size(&value))?;
        Ok(value)
    }
}

impl Default for InvokeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `(ctx, this, args)`, the calling convention of every entry.
pub type NativeEntry =
    fn(ctx: &mut InvokeContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType>;

type ClosureEntry = dyn Fn(&mut InvokeContext, JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType>;

pub enum EntryFn {
    Native(NativeEntry),
    /// Entry that captures unit state.
    Closure(Box<ClosureEntry>),
}

impl EntryFn {
    pub fn call(&self, ctx: &mut InvokeContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        match self {
            EntryFn::Native(f) => f(ctx, this, args),
            EntryFn::Closure(f) => f(ctx, this, args),
        }
    }
}

/// A named export, e.g. `sfc`, and its methods.
pub struct ExportObject {
    pub name: String,
    pub methods: HashMap<String, Rc<EntryFn>>,
}

impl ExportObject {
    pub fn new(name: impl Into<String>) -> Self {
        ExportObject {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn add_method(mut self, name: impl Into<String>, func: NativeEntry) -> Self {
        self.methods.insert(name.into(), Rc::new(EntryFn::Native(func)));
        self
    }

    pub fn add_closure(
        mut self,
        name: impl Into<String>,
        func: impl Fn(&mut InvokeContext, JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(EntryFn::Closure(Box::new(func))));
        self
    }
}

/// Name, version and qualified entry names of a loaded unit.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub name: String,
    pub version: String,
    /// `object.method` for every entry the unit exports.
    pub provides: Vec<String>,
}

impl UnitInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        UnitInfo {
            name: name.into(),
            version: version.into(),
            provides: Vec::new(),
        }
    }

    pub fn with_provides(mut self, provides: Vec<String>) -> Self {
        self.provides = provides;
        self
    }
}

/// Positional argument, `undefined` when the caller passed fewer.
pub fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}
