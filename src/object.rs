//! The host-visible object façade.
//!
//! [`ObjectRef`] wraps exactly one owned engine cell for its whole lifetime
//! and exposes the accessor operations on it: indexed get/set, keyed
//! iteration, existence test, error test, identity equality. Blocking
//! operations route through the [`gate`](crate::gate); predicates and
//! existence tests call the engine directly.

use core::fmt;

use indexmap::IndexMap;

use crate::engine::{Engine, RawIter};
use crate::error::BridgeError;
use crate::gate;
use crate::handle::Handle;
use crate::host::Host;
use crate::value::{Key, Value};

/// An owning wrapper around one engine object cell.
///
/// Construction clones its input handle, so the wrapper's ownership is
/// independent of the caller's; the single retained reference is released
/// when the wrapper drops.
pub struct ObjectRef<'e, E: Engine + ?Sized> {
    handle: Handle<'e, E>,
}

impl<'e, E: Engine + ?Sized> ObjectRef<'e, E> {
    /// Wrap `cell`, retaining an independent owned reference to it.
    pub fn new(cell: &Handle<'e, E>) -> Self {
        ObjectRef {
            handle: cell.clone(),
        }
    }

    /// Adopt a newly owned handle directly, without an extra clone.
    pub fn from_handle(handle: Handle<'e, E>) -> Self {
        ObjectRef { handle }
    }

    /// The wrapped handle. Borrows; ownership stays with the wrapper.
    pub fn handle(&self) -> &Handle<'e, E> {
        &self.handle
    }

    pub fn engine(&self) -> &'e E {
        self.handle.engine()
    }

    /// Read the property or array element named by `key`.
    ///
    /// An unsupported key fails before any engine call. The engine's result
    /// cell is released once conversion finishes, whether or not conversion
    /// succeeds; a missing member comes back as whatever the engine returns
    /// for it (typically null).
    pub fn get<'k, K, H>(&self, host: &H, key: K) -> Result<Value<'e, E>, BridgeError>
    where
        K: TryInto<Key<'k>>,
        BridgeError: From<K::Error>,
        H: Host<E> + ?Sized,
    {
        let key: Key<'_> = key.try_into()?;
        let result = match key {
            Key::Index(i) => gate::get_array_item(host, self.engine(), &self.handle, i),
            Key::Name(n) => gate::get_property(host, self.engine(), &self.handle, n),
        };
        host.cell_to_value(self.engine(), &result)
    }

    /// Write `value` to the property or array element named by `key`.
    ///
    /// The key is classified first, so an unsupported key fails before the
    /// value is converted or any engine call is made. Ownership of the
    /// converted cell transfers to the engine's set operation.
    pub fn set<'k, K, H>(&self, host: &H, key: K, value: &Value<'e, E>) -> Result<(), BridgeError>
    where
        K: TryInto<Key<'k>>,
        BridgeError: From<K::Error>,
        H: Host<E> + ?Sized,
    {
        let key: Key<'_> = key.try_into()?;
        let cell = host.value_to_cell(self.engine(), value)?;
        match key {
            Key::Index(i) => gate::set_array_item(host, self.engine(), &self.handle, i, cell),
            Key::Name(n) => gate::set_property(host, self.engine(), &self.handle, n, cell),
        }
        Ok(())
    }

    /// Whether the object has the property or index named by `key`.
    ///
    /// Existence queries are cheap on the engine side and do not cross the
    /// gate.
    pub fn has_key<'k, K>(&self, key: K) -> Result<bool, BridgeError>
    where
        K: TryInto<Key<'k>>,
        BridgeError: From<K::Error>,
    {
        let key: Key<'_> = key.try_into()?;
        Ok(match key {
            Key::Index(i) => self.engine().has_index(self.handle.raw(), i),
            Key::Name(n) => self.engine().has_property(self.handle.raw(), n),
        })
    }

    /// Whether the wrapped cell is an engine error value.
    ///
    /// Read-only predicate on the retained handle; no ownership transfer
    /// happens, so no clone is taken.
    pub fn is_error(&self) -> bool {
        self.handle.is_error()
    }

    /// Engine reference identity with `other`.
    ///
    /// Two wrappers over the same cell compare identical; wrappers over
    /// value-equal but distinct cells do not.
    pub fn identical(&self, other: &ObjectRef<'_, E>) -> bool {
        self.handle.is_identical(&other.handle)
    }

    /// A lazy cursor over the object's enumerable key/value pairs.
    ///
    /// Each call opens a fresh engine iterator over a fresh handle clone;
    /// the cursor is single-pass and not restartable. Pairs materialize one
    /// at a time as the consumer drives the cursor, and the engine iterator
    /// is released exactly once when the cursor drops, early termination
    /// included. An engine-side mutation of the object mid-iteration is
    /// undefined engine behavior; the cursor does not try to recover from it.
    pub fn pairs<'h, H>(&self, host: &'h H) -> Pairs<'e, 'h, E, H>
    where
        H: Host<E> + ?Sized,
    {
        let obj = self.handle.clone();
        let it = self.engine().iter_new(obj.raw());
        Pairs {
            host,
            obj,
            it,
            done: false,
        }
    }

    /// Drive [`pairs`](ObjectRef::pairs) eagerly, handing each pair to `f`.
    pub fn each_pair<H, F>(&self, host: &H, mut f: F) -> Result<(), BridgeError>
    where
        H: Host<E> + ?Sized,
        F: FnMut(String, Value<'e, E>),
    {
        for pair in self.pairs(host) {
            let (key, value) = pair?;
            f(key, value);
        }
        Ok(())
    }

    /// Enumerate the object's keys in engine order.
    pub fn keys<H>(&self, host: &H) -> Result<Vec<String>, BridgeError>
    where
        H: Host<E> + ?Sized,
    {
        self.pairs(host).map(|pair| pair.map(|(k, _)| k)).collect()
    }

    /// Materialize all pairs into a map preserving engine enumeration order.
    pub fn to_pairs<H>(&self, host: &H) -> Result<IndexMap<String, Value<'e, E>>, BridgeError>
    where
        H: Host<E> + ?Sized,
    {
        self.pairs(host).collect()
    }
}

impl<'e, E: Engine + ?Sized> Clone for ObjectRef<'e, E> {
    fn clone(&self) -> Self {
        ObjectRef {
            handle: self.handle.clone(),
        }
    }
}

/// Identity equality, not structural equality.
impl<'e, E: Engine + ?Sized> PartialEq for ObjectRef<'e, E> {
    fn eq(&self, other: &Self) -> bool {
        self.identical(other)
    }
}

impl<'e, E: Engine + ?Sized> fmt::Debug for ObjectRef<'e, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.handle.raw()).finish()
    }
}

/// Lazy cursor over an object's key/value pairs.
///
/// Holds its own clone of the object's handle so the cell outlives early
/// wrapper drops, and releases the engine iterator exactly once on drop.
pub struct Pairs<'e, 'h, E: Engine + ?Sized, H: Host<E> + ?Sized> {
    host: &'h H,
    obj: Handle<'e, E>,
    it: RawIter,
    done: bool,
}

impl<'e, 'h, E: Engine + ?Sized, H: Host<E> + ?Sized> Iterator for Pairs<'e, 'h, E, H> {
    type Item = Result<(String, Value<'e, E>), BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let engine = self.obj.engine();
        if !engine.iter_has_next(self.it) {
            self.done = true;
            return None;
        }

        // Advance-and-fetch is the blocking half of the protocol; the value
        // cell is released as soon as conversion is done.
        let cell = gate::iter_next_value(self.host, engine, self.it);
        let value = match self.host.cell_to_value(engine, &cell) {
            Ok(value) => value,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        // The key is an engine-owned temporary: copy it out, release it.
        let raw_key = engine.iter_key(self.it);
        let bytes = engine.string_bytes(raw_key);
        engine.string_release(raw_key);
        let key = String::from_utf8_lossy(&bytes).into_owned();

        Some(Ok((key, value)))
    }
}

impl<'e, 'h, E: Engine + ?Sized, H: Host<E> + ?Sized> Drop for Pairs<'e, 'h, E, H> {
    fn drop(&mut self) {
        self.obj.engine().iter_release(self.it);
    }
}
