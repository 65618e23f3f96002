//! Exports registered by the loaded program unit, looked up by name.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use super::types::{EntryFn, ExportObject, UnitInfo};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    /// No unit is known under this name.
    #[error("Program unit not found: {0}")]
    NotFound(String),
    #[error("Program unit config error: {0}")]
    ConfigError(String),
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
    #[error("Method not found: {0}.{1}")]
    MethodNotFound(String, String),
}

#[derive(Default)]
pub struct ExportRegistry {
    objects: HashMap<String, ExportObject>,
    units: Vec<UnitInfo>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        ExportRegistry::default()
    }

    /// Adds an export. Registering the same name twice keeps the later one.
    pub fn register_object(&mut self, obj: ExportObject) {
        self.objects.insert(obj.name.clone(), obj);
    }

    pub fn register_unit(&mut self, info: UnitInfo) {
        self.units.push(info);
    }

    /// Looks up `object.method`, naming whichever part is missing.
    pub fn resolve_method(&self, object: &str, method: &str) -> Result<Rc<EntryFn>, UnitError> {
        let obj = self
            .objects
            .get(object)
            .ok_or_else(|| UnitError::ObjectNotFound(object.to_string()))?;
        obj.methods
            .get(method)
            .cloned()
            .ok_or_else(|| UnitError::MethodNotFound(object.to_string(), method.to_string()))
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn has_method(&self, object: &str, method: &str) -> bool {
        self.resolve_method(object, method).is_ok()
    }

    pub fn loaded_units(&self) -> &[UnitInfo] {
        &self.units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::error::JErrorType;
    use crate::runner::ds::value::JsValue;
    use crate::runner::plugin::types::InvokeContext;

    fn noop(_ctx: &mut InvokeContext, _this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        Ok(JsValue::Undefined)
    }

    #[test]
    fn test_resolve_method_errors() {
        let mut registry = ExportRegistry::new();
        registry.register_object(ExportObject::new("sfc").add_method("parse", noop));
        assert!(registry.has_method("sfc", "parse"));
        assert!(!registry.has_method("sfc", "compile"));
        assert_eq!(
            registry.resolve_method("sfc", "compile").err(),
            Some(UnitError::MethodNotFound("sfc".to_string(), "compile".to_string()))
        );
        assert_eq!(
            registry.resolve_method("css", "parse").err(),
            Some(UnitError::ObjectNotFound("css".to_string()))
        );
        assert_eq!(
            UnitError::MethodNotFound("a".to_string(), "b".to_string()).to_string(),
            "Method not found: a.b"
        );
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = ExportRegistry::new();
        registry.register_object(ExportObject::new("sfc").add_method("parse", noop));
        registry.register_object(ExportObject::new("sfc").add_method("compileStyle", noop));
        assert!(registry.has_object("sfc"));
        assert!(!registry.has_method("sfc", "parse"));
        assert!(registry.has_method("sfc", "compileStyle"));
    }
}
