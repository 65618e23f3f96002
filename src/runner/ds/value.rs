use std::cell::RefCell;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::object::{ArrayObject, JsObjectType, ObjectBase, ObjectType, PropertyKey};

/// A managed value.
///
/// Objects are shared through `Rc`, so cloning a value never copies an object
/// graph; every holder keeps the same allocation alive.
#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(JsNumberType),
    Object(JsObjectType),
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => f.write_str("undefined"),
            JsValue::Null => f.write_str("null"),
            JsValue::Boolean(b) => b.fmt(f),
            JsValue::String(s) => write!(f, "{:?}", s),
            JsValue::Number(n) => n.fmt(f),
            JsValue::Object(o) => o.borrow().fmt(f),
        }
    }
}

/// Like `Display`, but objects are elided.
impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Object(o) if o.borrow().is_array() => f.write_str("[..]"),
            JsValue::Object(_) => f.write_str("{..}"),
            other => Display::fmt(other, f),
        }
    }
}

/// Objects compare by identity.
impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        use JsValue::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) => true,
            (Boolean(x), Boolean(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Number(x), Number(y)) => x == y,
            (Object(x), Object(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}
impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}
impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}
impl From<usize> for JsValue {
    fn from(n: usize) -> Self {
        JsValue::Number(JsNumberType::Integer(n as i64))
    }
}
impl<T: Into<JsValue>> From<Option<T>> for JsValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => JsValue::Undefined,
        }
    }
}

impl JsValue {
    pub fn new_object(base: ObjectBase) -> Self {
        JsValue::Object(Rc::new(RefCell::new(ObjectType::Ordinary(base))))
    }

    pub fn new_array(elements: Vec<JsValue>) -> Self {
        JsValue::Object(Rc::new(RefCell::new(ObjectType::Array(ArrayObject::new(
            elements,
        )))))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_object(&self) -> bool {
        match self {
            JsValue::Object(o) => !o.borrow().is_array(),
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        match self {
            JsValue::Object(o) => o.borrow().is_array(),
            _ => false,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::String(s) => !s.is_empty(),
            JsValue::Number(n) => n.truthy(),
            JsValue::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Non-negative integral numbers only; anything else is absent.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            JsValue::Number(JsNumberType::Integer(i)) if *i >= 0 => Some(*i as u64),
            JsValue::Number(JsNumberType::Float(f))
                if *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64 =>
            {
                Some(*f as u64)
            }
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectType> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Named property of an ordinary object.
    pub fn get(&self, name: &str) -> Option<JsValue> {
        let o = self.as_object()?;
        let o = o.borrow();
        o.as_ordinary()?.get(name).cloned()
    }

    /// Sets a named property on an ordinary object. Returns `false` for
    /// anything else.
    pub fn set(&self, name: &str, value: JsValue) -> bool {
        let o = match self.as_object() {
            Some(o) => o,
            None => return false,
        };
        let mut o = o.borrow_mut();
        match o.as_ordinary_mut() {
            Some(base) => {
                base.set(name, value);
                true
            }
            None => false,
        }
    }

    /// Named property that is neither `undefined` nor `null`.
    pub fn get_present(&self, name: &str) -> Option<JsValue> {
        self.get(name).filter(|v| !v.is_nullish())
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn array_len(&self) -> Option<usize> {
        let o = self.as_object()?;
        let o = o.borrow();
        Some(o.as_array()?.len())
    }

    pub fn array_get(&self, index: usize) -> Option<JsValue> {
        let o = self.as_object()?;
        let o = o.borrow();
        o.as_array()?.get(index).cloned()
    }

    pub fn array_values(&self) -> Option<Vec<JsValue>> {
        let o = self.as_object()?;
        let o = o.borrow();
        Some(o.as_array()?.elements.clone())
    }

    pub fn own_keys(&self) -> Option<Vec<PropertyKey>> {
        let o = self.as_object()?;
        let o = o.borrow();
        Some(o.as_ordinary()?.own_keys())
    }

    /// Number of own keys of an ordinary object.
    pub fn own_key_count(&self) -> Option<usize> {
        let o = self.as_object()?;
        let o = o.borrow();
        Some(o.as_ordinary()?.len())
    }

    /// Own entry at enumeration position `index`.
    pub fn own_entry_at(&self, index: usize) -> Option<(String, JsValue)> {
        let o = self.as_object()?;
        let o = o.borrow();
        let base = o.as_ordinary()?;
        let key = base.key_at(index)?;
        let value = base.get_by_key(&key)?.clone();
        Some((key.to_string(), value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsNumberType {
    Integer(i64),
    Float(f64),
}

impl JsNumberType {
    pub fn truthy(&self) -> bool {
        match *self {
            JsNumberType::Integer(i) => i != 0,
            JsNumberType::Float(x) => x != 0.0 && !x.is_nan(),
        }
    }
}

impl Display for JsNumberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            JsNumberType::Integer(i) => i.fmt(f),
            JsNumberType::Float(x) if x.is_nan() => f.write_str("NaN"),
            JsNumberType::Float(x) if x.is_infinite() => {
                f.write_str(if x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            JsNumberType::Float(x) => x.fmt(f),
        }
    }
}
