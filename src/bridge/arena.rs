//! Dense slot table mapping opaque integer handles to managed values.
//!
//! Handle `0` is reserved as invalid. A non-zero handle is the 1-indexed
//! position of its slot. Released slots go on a free list and are reused
//! last-in first-out.
//!
//! Each slot also owns an append-only cache of NUL-terminated strings. Every
//! `&str` handed out for a handle points into a boxed allocation owned by that
//! slot, so it stays put until the handle is released.

use std::fmt;

use crate::runner::ds::value::JsValue;

/// Backing storage for the empty string: the byte after the view is a NUL.
const EMPTY: &str = "\0";

/// The shared empty string. Its pointer is followed by a NUL byte.
pub fn empty_str() -> &'static str {
    &EMPTY[..0]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Handle(pub u64);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()?.checked_sub(1)
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Handle(raw)
    }
}

impl From<Handle> for u64 {
    fn from(h: Handle) -> Self {
        h.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of value a slot holds, recorded when it is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    ParseResult,
    Descriptor,
    Block,
    ScriptResult,
    Bindings,
    ImportBinding,
    TemplateResult,
    StyleResult,
}

impl Shape {
    /// A compiled script is a block with extra fields.
    pub fn is_block(self) -> bool {
        matches!(self, Shape::Block | Shape::ScriptResult)
    }
}

#[derive(Debug, Default)]
pub struct Slot {
    value: Option<JsValue>,
    shape: Option<Shape>,
    strings: Vec<Box<str>>,
}

impl Slot {
    pub fn value(&self) -> Option<&JsValue> {
        self.value.as_ref()
    }

    pub fn shape(&self) -> Option<Shape> {
        self.shape
    }

    pub fn cached_strings(&self) -> usize {
        self.strings.len()
    }

    fn is_live(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Default)]
pub struct HandleArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl HandleArena {
    pub fn new() -> Self {
        HandleArena::default()
    }

    /// Stores `value` and returns its handle. Never returns [`Handle::NULL`].
    pub fn allocate(&mut self, value: JsValue, shape: Shape) -> Handle {
        let slot = Slot {
            value: Some(value),
            shape: Some(shape),
            strings: Vec::new(),
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        Handle(index as u64 + 1)
    }

    /// The live slot behind `handle`.
    pub fn resolve(&self, handle: Handle) -> Option<&Slot> {
        let slot = self.slots.get(handle.index()?)?;
        if slot.is_live() {
            Some(slot)
        } else {
            None
        }
    }

    /// The value behind `handle` if it was allocated with `shape`.
    pub fn resolve_shape(&self, handle: Handle, shape: Shape) -> Option<&JsValue> {
        self.resolve(handle)
            .filter(|slot| slot.shape == Some(shape))
            .and_then(Slot::value)
    }

    /// The value behind `handle` if it holds any kind of block.
    pub fn resolve_block(&self, handle: Handle) -> Option<&JsValue> {
        self.resolve(handle)
            .filter(|slot| slot.shape.map_or(false, Shape::is_block))
            .and_then(Slot::value)
    }

    /// Frees the slot behind `handle` along with its string cache.
    ///
    /// Returns `false`, and changes nothing, when the handle is null, out of
    /// range or already free.
    pub fn release(&mut self, handle: Handle) -> bool {
        let index = match handle.index() {
            Some(i) if self.slots.get(i).map_or(false, Slot::is_live) => i,
            _ => return false,
        };
        self.slots[index] = Slot::default();
        self.free.push(index);
        true
    }

    /// Copies `text` into the string cache of `handle` and returns the copy.
    ///
    /// The returned view is followed in memory by a NUL byte. An invalid handle
    /// gets the shared empty string.
    pub fn cache(&mut self, handle: Handle, text: &str) -> &str {
        let slot = match handle.index().and_then(|i| self.slots.get_mut(i)) {
            Some(slot) if slot.is_live() => slot,
            _ => return empty_str(),
        };
        let mut owned = String::with_capacity(text.len() + 1);
        owned.push_str(text);
        owned.push('\0');
        slot.strings.push(owned.into_boxed_str());
        match slot.strings.last() {
            Some(stored) => &stored[..text.len()],
            None => empty_str(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of slots ever created, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> JsValue {
        JsValue::from(s)
    }

    #[test]
    fn test_first_handle_is_one() {
        let mut arena = HandleArena::new();
        assert_eq!(arena.allocate(value("a"), Shape::Block), Handle(1));
        assert_eq!(arena.allocate(value("b"), Shape::Block), Handle(2));
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    fn test_resolve_rejects_null_and_out_of_range() {
        let mut arena = HandleArena::new();
        arena.allocate(value("a"), Shape::Block);
        assert!(arena.resolve(Handle::NULL).is_none());
        assert!(arena.resolve(Handle(2)).is_none());
        assert!(arena.resolve(Handle(u64::MAX)).is_none());
        assert_eq!(arena.resolve(Handle(1)).and_then(Slot::value), Some(&value("a")));
    }

    #[test]
    fn test_wide_handles_never_alias_a_live_slot() {
        let mut arena = HandleArena::new();
        let h = arena.allocate(value("a"), Shape::Block);
        for wide in [Handle(u64::MAX), Handle((1 << 32) + 1), Handle(1 << 32)] {
            assert!(arena.resolve(wide).is_none());
            assert!(arena.resolve_block(wide).is_none());
            assert_eq!(arena.cache(wide, "x"), "");
            assert!(!arena.release(wide));
        }
        assert_eq!(arena.live_count(), 1);
        assert_eq!(arena.resolve(h).and_then(Slot::value), Some(&value("a")));
        assert_eq!(arena.resolve(h).map(Slot::cached_strings), Some(0));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut arena = HandleArena::new();
        let h = arena.allocate(value("a"), Shape::Block);
        assert!(arena.release(h));
        assert!(!arena.release(h));
        assert!(!arena.release(Handle::NULL));
        assert!(!arena.release(Handle(40)));
        assert_eq!(arena.free_count(), 1);
        assert!(arena.resolve(h).is_none());
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut arena = HandleArena::new();
        let a = arena.allocate(value("a"), Shape::Block);
        let b = arena.allocate(value("b"), Shape::Block);
        let _c = arena.allocate(value("c"), Shape::Block);
        arena.release(a);
        arena.release(b);
        assert_eq!(arena.allocate(value("d"), Shape::Block), b);
        assert_eq!(arena.allocate(value("e"), Shape::Block), a);
        assert_eq!(arena.capacity(), 3);
        assert_eq!(arena.free_count(), 0);
    }

    #[test]
    fn test_shape_checks() {
        let mut arena = HandleArena::new();
        let block = arena.allocate(value("a"), Shape::Block);
        let script = arena.allocate(value("b"), Shape::ScriptResult);
        assert!(arena.resolve_shape(block, Shape::Descriptor).is_none());
        assert!(arena.resolve_shape(block, Shape::Block).is_some());
        assert!(arena.resolve_block(script).is_some());
        assert!(arena.resolve_shape(script, Shape::Block).is_none());
    }

    #[test]
    fn test_cache_is_nul_terminated_and_stable() {
        let mut arena = HandleArena::new();
        let h = arena.allocate(value("a"), Shape::Block);
        let first = arena.cache(h, "hello").as_ptr();
        for i in 0..100 {
            arena.cache(h, &i.to_string());
        }
        let slot = arena.resolve(h).unwrap();
        assert_eq!(slot.cached_strings(), 101);
        let stored = &slot.strings[0];
        assert_eq!(stored.as_ptr(), first);
        assert_eq!(stored.as_bytes(), b"hello\0");
    }

    #[test]
    fn test_cache_on_invalid_handle() {
        let mut arena = HandleArena::new();
        let s = arena.cache(Handle(3), "lost");
        assert_eq!(s, "");
        assert_eq!(unsafe { *s.as_ptr() }, 0);
    }

    #[test]
    fn test_release_clears_cache() {
        let mut arena = HandleArena::new();
        let h = arena.allocate(value("a"), Shape::Block);
        arena.cache(h, "x");
        arena.release(h);
        let h2 = arena.allocate(value("b"), Shape::Descriptor);
        assert_eq!(h2, h);
        let slot = arena.resolve(h2).unwrap();
        assert_eq!(slot.cached_strings(), 0);
        assert_eq!(slot.shape(), Some(Shape::Descriptor));
    }
}
