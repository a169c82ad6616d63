//! Owning references to engine value cells.

use core::fmt;
use core::mem;

use crate::engine::{Engine, RawValue};

/// An owned, reference-counted handle to an engine value cell.
///
/// `Handle` is the only way raw cells should travel through the bridge:
/// cloning goes through [`Engine::clone_value`] (count +1) and dropping
/// through [`Engine::release`] (count -1), so each handle accounts for
/// exactly one engine reference and releases it exactly once, on every exit
/// path including unwinding.
pub struct Handle<'e, E: Engine + ?Sized> {
    raw: RawValue,
    engine: &'e E,
}

impl<'e, E: Engine + ?Sized> Handle<'e, E> {
    /// Take ownership of `raw`, a newly owned cell produced by an engine
    /// operation.
    ///
    /// Wrapping a cell that is *not* newly owned (for example one merely
    /// borrowed from another handle) double-releases it when both owners
    /// drop.
    pub fn from_raw(engine: &'e E, raw: RawValue) -> Self {
        Handle { raw, engine }
    }

    /// A handle to a fresh null cell.
    pub fn null(engine: &'e E) -> Self {
        Handle::from_raw(engine, engine.new_null())
    }

    /// The underlying cell token. Borrows; ownership stays with `self`.
    pub fn raw(&self) -> RawValue {
        self.raw
    }

    /// The engine this handle belongs to.
    pub fn engine(&self) -> &'e E {
        self.engine
    }

    /// Give up ownership of the cell without releasing it.
    ///
    /// Used where an engine operation consumes its argument, such as the
    /// value side of a property write.
    pub fn into_raw(self) -> RawValue {
        let raw = self.raw;
        mem::forget(self);
        raw
    }

    /// Whether the cell holds an engine error value.
    pub fn is_error(&self) -> bool {
        self.engine.is_error(self.raw)
    }

    /// Engine reference identity with `other`. Two handles cloned from one
    /// cell are identical; value-equal but distinct cells are not.
    pub fn is_identical(&self, other: &Handle<'_, E>) -> bool {
        self.engine.is_identical(self.raw, other.raw)
    }
}

impl<'e, E: Engine + ?Sized> Clone for Handle<'e, E> {
    fn clone(&self) -> Self {
        Handle {
            raw: self.engine.clone_value(self.raw),
            engine: self.engine,
        }
    }
}

impl<'e, E: Engine + ?Sized> Drop for Handle<'e, E> {
    fn drop(&mut self) {
        self.engine.release(self.raw);
    }
}

impl<'e, E: Engine + ?Sized> fmt::Debug for Handle<'e, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.raw).finish()
    }
}
