//! The foreign-engine operation set.
//!
//! The scene-graph engine is an external library; the bridge reaches it
//! through this fixed set of operations and nothing else. The trait mirrors
//! the engine's C surface closely: values, iterators and strings are opaque
//! tokens that only the issuing engine can interpret.
//!
//! # Ownership
//!
//! Engine value cells are reference counted by the engine. Every operation
//! documents its effect on that count:
//!
//! - An operation documented as returning a *newly owned* cell has already
//!   incremented the count; the receiver must release it exactly once, on
//!   every exit path. [`Handle`](crate::Handle) is the owning wrapper that
//!   makes this automatic; raw tokens should not travel far without one.
//! - An operation documented as *borrowing* a cell leaves the count alone.
//! - An operation documented as *consuming* a cell takes over the caller's
//!   reference; the caller must not release it afterwards.

/// Opaque token naming a value cell inside the engine.
///
/// Carries no ownership by itself; ownership lives in [`Handle`](crate::Handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawValue(pub u64);

/// Opaque token naming an engine-side pair iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawIter(pub u64);

/// Opaque token naming an engine-owned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawString(pub u64);

/// Operations the bridge consumes from the scene-graph engine.
///
/// Property, array-item and iterator-value access may run engine-side code of
/// unbounded duration (a scene-side getter, for example) and must only be
/// reached through the [`gate`](crate::gate). Lifecycle operations and the
/// existence/error/identity predicates are cheap and synchronous.
pub trait Engine {
    // ------------------------------------------------------------------
    // Value lifecycle
    // ------------------------------------------------------------------

    /// Increment the reference count of `cell` and return a newly owned
    /// reference to the same underlying value.
    fn clone_value(&self, cell: RawValue) -> RawValue;

    /// Release one owned reference to `cell`. Consumes the caller's
    /// ownership; the engine frees the underlying storage at count zero.
    fn release(&self, cell: RawValue);

    /// Create a newly owned null cell.
    fn new_null(&self) -> RawValue;

    // ------------------------------------------------------------------
    // Predicates (borrow their operands, non-blocking)
    // ------------------------------------------------------------------

    /// Whether `cell` holds an engine error value.
    fn is_error(&self, cell: RawValue) -> bool;

    /// Engine reference identity: whether `a` and `b` name the same
    /// underlying value. Not structural equality.
    fn is_identical(&self, a: RawValue, b: RawValue) -> bool;

    // ------------------------------------------------------------------
    // Property and array access (may block)
    // ------------------------------------------------------------------

    /// Read property `name` of `obj`. Borrows `obj`; returns a newly owned
    /// cell.
    fn get_property(&self, obj: RawValue, name: &str) -> RawValue;

    /// Read element `index` of `obj`. Borrows `obj`; returns a newly owned
    /// cell.
    fn get_array_item(&self, obj: RawValue, index: u32) -> RawValue;

    /// Write property `name` of `obj`. Borrows `obj`; consumes `value`.
    fn set_property(&self, obj: RawValue, name: &str, value: RawValue);

    /// Write element `index` of `obj`. Borrows `obj`; consumes `value`.
    fn set_array_item(&self, obj: RawValue, index: u32, value: RawValue);

    // ------------------------------------------------------------------
    // Existence tests (borrow, non-blocking)
    // ------------------------------------------------------------------

    fn has_property(&self, obj: RawValue, name: &str) -> bool;

    fn has_index(&self, obj: RawValue, index: u32) -> bool;

    // ------------------------------------------------------------------
    // Pair iteration
    // ------------------------------------------------------------------

    /// Create an iterator over the enumerable key/value pairs of `obj`.
    /// Borrows `obj`. The iterator must be released with [`iter_release`]
    /// exactly once, including on early termination.
    ///
    /// [`iter_release`]: Engine::iter_release
    fn iter_new(&self, obj: RawValue) -> RawIter;

    /// Whether advancing `it` would land on another pair.
    fn iter_has_next(&self, it: RawIter) -> bool;

    /// Advance `it` to its next pair. Must be called before each value or
    /// key fetch.
    fn iter_advance(&self, it: RawIter);

    /// Fetch the value of the current pair. Returns a newly owned cell.
    /// May block like property access.
    fn iter_value(&self, it: RawIter) -> RawValue;

    /// Fetch the key of the current pair as an engine-owned string. The
    /// receiver must copy it out and release it with [`string_release`].
    ///
    /// [`string_release`]: Engine::string_release
    fn iter_key(&self, it: RawIter) -> RawString;

    /// Release `it`. Consumes the iterator.
    fn iter_release(&self, it: RawIter);

    // ------------------------------------------------------------------
    // Engine-owned strings
    // ------------------------------------------------------------------

    /// Copy out the UTF-8 bytes of `s`. Borrows `s`.
    fn string_bytes(&self, s: RawString) -> Vec<u8>;

    /// Byte length of `s`. Borrows `s`.
    fn string_len(&self, s: RawString) -> usize;

    /// Release `s`. Consumes the string.
    fn string_release(&self, s: RawString);
}
