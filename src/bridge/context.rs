//! An explicit, owned bridge instance: one runtime plus one handle arena.

use tracing::{debug, trace};
use uuid::Uuid;

use crate::bridge::arena::{empty_str, Handle, HandleArena, Shape};
use crate::runner::ds::builder::build_object;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::RuntimeConfig;
use crate::runner::runtime::{EntryPoint, Runtime, RuntimeError};

/// Bridge instance.
///
/// Holds `Rc`-shared values, so it is neither `Send` nor `Sync`. Independent
/// instances share nothing and may live on different threads.
///
/// Methods that return `&str` borrow the context mutably: the text lives in
/// the string cache of the handle it was read from, and `release` cannot be
/// called while such a borrow is alive.
pub struct Context {
    id: Uuid,
    pub(crate) runtime: Runtime,
    pub(crate) arena: HandleArena,
}

/// Lossy UTF-8; embedded NULs are kept.
fn text(bytes: &[u8]) -> JsValue {
    JsValue::from(String::from_utf8_lossy(bytes).into_owned())
}

impl Context {
    /// Starts a context running the default program unit.
    pub fn new() -> Result<Context, RuntimeError> {
        Context::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Result<Context, RuntimeError> {
        let id = Uuid::new_v4();
        let mut runtime = Runtime::new(id.to_string(), config);
        runtime.acquire()?;
        debug!("[{}] context ready", id);
        Ok(Context {
            id,
            runtime,
            arena: HandleArena::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn arena(&self) -> &HandleArena {
        &self.arena
    }

    /// Frees a handle. Null, stale and unknown handles are ignored.
    pub fn release(&mut self, handle: Handle) {
        if self.arena.release(handle) {
            trace!("[{}] released {}", self.id, handle);
        }
    }

    pub(crate) fn allocate(&mut self, value: JsValue, shape: Shape) -> Handle {
        let handle = self.arena.allocate(value, shape);
        trace!("[{}] allocated {} ({:?})", self.id, handle, shape);
        handle
    }

    /// Allocates a handle for a nested value, or returns null when it is
    /// absent.
    pub(crate) fn child(&mut self, value: Option<JsValue>, shape: Shape) -> Handle {
        match value.filter(|v| !v.is_nullish()) {
            Some(v) => self.allocate(v, shape),
            None => Handle::NULL,
        }
    }

    /// Caches `value` on `handle`, or yields the empty string.
    pub(crate) fn text(&mut self, handle: Handle, value: Option<String>) -> &str {
        match value {
            Some(s) => self.arena.cache(handle, &s),
            None => empty_str(),
        }
    }

    fn invoke(&mut self, entry: EntryPoint, args: Vec<JsValue>, shape: Shape) -> Handle {
        match self.runtime.invoke(entry, args) {
            Some(result) => self.allocate(result, shape),
            None => Handle::NULL,
        }
    }

    /// `parse(source, { filename })`
    pub fn parse(&mut self, source: &[u8], filename: &[u8]) -> Handle {
        let options = build_object().add_field("filename", text(filename)).build();
        self.invoke(EntryPoint::Parse, vec![text(source), options], Shape::ParseResult)
    }

    /// `compileScript(descriptor, { id, isProd })`. The descriptor handle is
    /// required.
    pub fn compile_script(&mut self, descriptor: Handle, id: &[u8], is_prod: bool) -> Handle {
        let descriptor = match self.arena.resolve_shape(descriptor, Shape::Descriptor) {
            Some(d) => d.clone(),
            None => return Handle::NULL,
        };
        let options = build_object()
            .add_field("id", text(id))
            .add_field("isProd", is_prod)
            .build();
        self.invoke(EntryPoint::CompileScript, vec![descriptor, options], Shape::ScriptResult)
    }

    /// `compileTemplate(...)`. A null, stale or non-bindings `bindings` handle
    /// is passed as `null`.
    pub fn compile_template(
        &mut self,
        source: &[u8],
        filename: &[u8],
        id: &[u8],
        scoped: bool,
        bindings: Handle,
    ) -> Handle {
        let bindings = self
            .arena
            .resolve_shape(bindings, Shape::Bindings)
            .cloned()
            .unwrap_or(JsValue::Null);
        let options = build_object()
            .add_field("source", text(source))
            .add_field("filename", text(filename))
            .add_field("id", text(id))
            .add_field("scoped", scoped)
            .add_field(
                "compilerOptions",
                build_object().add_field("bindingMetadata", bindings).build(),
            )
            .build();
        self.invoke(EntryPoint::CompileTemplate, vec![options], Shape::TemplateResult)
    }

    /// `compileStyle({ source, filename, id, scoped })`
    pub fn compile_style(&mut self, source: &[u8], filename: &[u8], id: &[u8], scoped: bool) -> Handle {
        let options = build_object()
            .add_field("source", text(source))
            .add_field("filename", text(filename))
            .add_field("id", text(id))
            .add_field("scoped", scoped)
            .build();
        self.invoke(EntryPoint::CompileStyle, vec![options], Shape::StyleResult)
    }
}
