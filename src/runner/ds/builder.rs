//! Chained construction of managed objects and arrays.

use crate::runner::ds::object::ObjectBase;
use crate::runner::ds::value::JsValue;

pub struct ObjectBuilder {
    base: ObjectBase,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        ObjectBuilder {
            base: ObjectBase::new(),
        }
    }

    pub fn add_field(mut self, name: &str, value: impl Into<JsValue>) -> Self {
        self.base.set(name, value.into());
        self
    }

    /// Adds the field only when a value is present, so absent data stays
    /// absent instead of becoming `undefined`.
    pub fn add_optional_field<V: Into<JsValue>>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.base.set(name, v.into());
        }
        self
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<JsValue>) {
        self.base.set(name, value.into());
    }

    pub fn build(self) -> JsValue {
        JsValue::new_object(self.base)
    }
}

impl Default for ObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_object() -> ObjectBuilder {
    ObjectBuilder::new()
}

pub fn build_array<V, I>(items: I) -> JsValue
where
    V: Into<JsValue>,
    I: IntoIterator<Item = V>,
{
    JsValue::new_array(items.into_iter().map(|v| v.into()).collect())
}

/// Rough retained size of a value graph, used to charge the heap.
pub fn estimate_size(value: &JsValue) -> usize {
    let own = std::mem::size_of::<JsValue>();
    match value {
        JsValue::String(s) => own + s.len(),
        JsValue::Object(o) => {
            let o = o.borrow();
            if let Some(a) = o.as_array() {
                own + a.elements.iter().map(estimate_size).sum::<usize>()
            } else if let Some(base) = o.as_ordinary() {
                own + base
                    .own_keys()
                    .iter()
                    .map(|k| {
                        k.to_string().len()
                            + base.get_by_key(k).map(estimate_size).unwrap_or_default()
                    })
                    .sum::<usize>()
            } else {
                own
            }
        }
        _ => own,
    }
}
