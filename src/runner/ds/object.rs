use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::value::JsValue;

pub type JsObjectType = Rc<RefCell<ObjectType>>;

pub enum ObjectType {
    Ordinary(ObjectBase),
    Array(ArrayObject),
}
impl ObjectType {
    pub fn is_array(&self) -> bool {
        matches!(self, ObjectType::Array(_))
    }

    pub fn as_ordinary(&self) -> Option<&ObjectBase> {
        match self {
            ObjectType::Ordinary(o) => Some(o),
            ObjectType::Array(_) => None,
        }
    }

    pub fn as_ordinary_mut(&mut self) -> Option<&mut ObjectBase> {
        match self {
            ObjectType::Ordinary(o) => Some(o),
            ObjectType::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayObject> {
        match self {
            ObjectType::Array(a) => Some(a),
            ObjectType::Ordinary(_) => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayObject> {
        match self {
            ObjectType::Array(a) => Some(a),
            ObjectType::Ordinary(_) => None,
        }
    }
}
impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Ordinary(o) => {
                write!(f, "{{")?;
                for (idx, key) in o.own_keys().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    if let Some(v) = o.get_by_key(key) {
                        write!(f, " {}: {}", key, v)?;
                    }
                }
                write!(f, " }}")
            }
            ObjectType::Array(a) => {
                write!(f, "[")?;
                for (idx, v) in a.elements.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Str(String),
    Int(u32),
}
impl PropertyKey {
    /// Canonical array-index strings ("0", "17", not "017") become `Int` keys,
    /// every other name stays a string key.
    pub fn from_name(name: &str) -> Self {
        let canonical = !name.is_empty()
            && name.bytes().all(|b| b.is_ascii_digit())
            && (name == "0" || !name.starts_with('0'));
        if canonical {
            if let Ok(i) = name.parse::<u32>() {
                if i != u32::MAX {
                    return PropertyKey::Int(i);
                }
            }
        }
        PropertyKey::Str(name.to_string())
    }
}
impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Str(s) => write!(f, "{}", s),
            PropertyKey::Int(i) => write!(f, "{}", i),
        }
    }
}

/// Plain keyed object.
///
/// Own keys enumerate the way ordinary objects do in the hosted language:
/// integer-like keys in ascending numeric order, then string keys in the
/// order they were first inserted. Overwriting a key keeps its position.
pub struct ObjectBase {
    properties: HashMap<PropertyKey, JsValue>,
    insertion_order: Vec<PropertyKey>,
}
impl ObjectBase {
    pub fn new() -> Self {
        ObjectBase {
            properties: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: JsValue) {
        self.set_by_key(PropertyKey::from_name(name), value)
    }

    pub fn set_by_key(&mut self, key: PropertyKey, value: JsValue) {
        if !self.properties.contains_key(&key) {
            self.insertion_order.push(key.clone());
        }
        self.properties.insert(key, value);
    }

    pub fn get(&self, name: &str) -> Option<&JsValue> {
        self.properties.get(&PropertyKey::from_name(name))
    }

    pub fn get_by_key(&self, key: &PropertyKey) -> Option<&JsValue> {
        self.properties.get(key)
    }

    pub fn has(&self, name: &str) -> bool {
        self.properties.contains_key(&PropertyKey::from_name(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<JsValue> {
        let key = PropertyKey::from_name(name);
        let removed = self.properties.remove(&key);
        if removed.is_some() {
            self.insertion_order.retain(|k| k != &key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut ints: Vec<u32> = self
            .insertion_order
            .iter()
            .filter_map(|k| match k {
                PropertyKey::Int(i) => Some(*i),
                PropertyKey::Str(_) => None,
            })
            .collect();
        ints.sort_unstable();
        let mut keys: Vec<PropertyKey> = ints.into_iter().map(PropertyKey::Int).collect();
        keys.extend(
            self.insertion_order
                .iter()
                .filter(|k| matches!(k, PropertyKey::Str(_)))
                .cloned(),
        );
        keys
    }

    /// Key at position `index` of [`ObjectBase::own_keys`].
    pub fn key_at(&self, index: usize) -> Option<PropertyKey> {
        self.own_keys().into_iter().nth(index)
    }
}
impl Default for ObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ArrayObject {
    pub elements: Vec<JsValue>,
}
impl ArrayObject {
    pub fn new(elements: Vec<JsValue>) -> Self {
        ArrayObject { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&JsValue> {
        self.elements.get(index)
    }

    pub fn push(&mut self, value: JsValue) {
        self.elements.push(value)
    }
}
