//! Instrumented in-memory engine and host.
//!
//! A reference implementation of the [`Engine`] and [`Host`] seams backed by
//! plain maps, with reference counting and per-operation call counters. The
//! bridge's own suite verifies handle conservation and gate discipline
//! against it, and embedders can do the same for their converters.
//!
//! Not a scene-graph engine: property reads never run scene code, they just
//! look up a table. The blocking classification of operations is preserved
//! anyway so gate tests mean something.

use std::cell::Cell as StdCell;
use std::cell::RefCell;

use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::{Engine, RawIter, RawString, RawValue};
use crate::error::BridgeError;
use crate::handle::Handle;
use crate::host::{Host, Scheduler};
use crate::object::ObjectRef;
use crate::value::Value;

/// Engine-side datum held by a stub cell.
///
/// Object and array slots hold *owned* cell ids: a cell id placed in a slot
/// (via [`StubEngine::alloc`] or a set operation) is consumed, and released
/// when the slot is overwritten or the owning cell dies.
#[derive(Debug, Clone, Default)]
pub enum Datum {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(IndexMap<String, RawValue>),
    Array(Vec<RawValue>),
    /// An engine error value carrying its message.
    Error(String),
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallCounts {
    pub clones: u64,
    pub releases: u64,
    pub property_gets: u64,
    pub array_gets: u64,
    pub property_sets: u64,
    pub array_sets: u64,
    pub existence_checks: u64,
    pub error_checks: u64,
    pub identity_checks: u64,
    pub iterators_opened: u64,
    pub iterators_released: u64,
    /// Releases of cells the engine did not consider live. Always a bug in
    /// the caller's ownership discipline.
    pub invalid_releases: u64,
}

impl CallCounts {
    /// Calls that reach member storage: reads, writes and existence checks.
    pub fn accesses(&self) -> u64 {
        self.property_gets
            + self.array_gets
            + self.property_sets
            + self.array_sets
            + self.existence_checks
    }
}

struct CellEntry {
    datum: Datum,
    refs: u64,
}

struct IterEntry {
    /// Owned reference to the iterated cell, held until release.
    obj: RawValue,
    /// Key snapshot taken at open time. A mutation of the object after the
    /// snapshot is the "engine-side mutation mid-iteration" case the bridge
    /// documents as undefined; here it just iterates stale keys.
    keys: Vec<String>,
    pos: Option<usize>,
}

#[derive(Default)]
struct StubState {
    cells: IndexMap<u64, CellEntry>,
    iters: IndexMap<u64, IterEntry>,
    strings: IndexMap<u64, String>,
    next_id: u64,
    counts: CallCounts,
}

impl StubState {
    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn alloc(&mut self, datum: Datum) -> RawValue {
        let id = self.fresh_id();
        self.cells.insert(id, CellEntry { datum, refs: 1 });
        RawValue(id)
    }

    /// Bump the count of an existing cell and hand back an owned id for it.
    fn retain(&mut self, cell: RawValue) -> RawValue {
        match self.cells.get_mut(&cell.0) {
            Some(entry) => entry.refs += 1,
            None => debug_assert!(false, "retain of dead cell {cell:?}"),
        }
        cell
    }

    /// Release one owned reference, freeing the cell and everything its
    /// slots own once the count hits zero.
    fn release(&mut self, cell: RawValue) {
        let mut work = vec![cell];
        while let Some(current) = work.pop() {
            let remaining = match self.cells.get_mut(&current.0) {
                Some(entry) => {
                    entry.refs -= 1;
                    entry.refs
                }
                None => {
                    self.counts.invalid_releases += 1;
                    debug_assert!(false, "release of dead cell {current:?}");
                    continue;
                }
            };
            if remaining == 0 {
                if let Some(dead) = self.cells.swap_remove(&current.0) {
                    match dead.datum {
                        Datum::Object(props) => work.extend(props.into_values()),
                        Datum::Array(items) => work.extend(items),
                        _ => {}
                    }
                }
            }
        }
    }

    fn member_keys(&self, obj: RawValue) -> Vec<String> {
        match self.cells.get(&obj.0).map(|entry| &entry.datum) {
            Some(Datum::Object(props)) => props.keys().cloned().collect(),
            Some(Datum::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Owned id of the member named by `key`, or a fresh null cell.
    fn member(&mut self, obj: RawValue, key: &str) -> RawValue {
        let found = match self.cells.get(&obj.0).map(|entry| &entry.datum) {
            Some(Datum::Object(props)) => props.get(key).copied(),
            Some(Datum::Array(items)) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).copied()),
            _ => None,
        };
        match found {
            Some(cell) => self.retain(cell),
            None => self.alloc(Datum::Null),
        }
    }
}

/// The instrumented engine.
#[derive(Default)]
pub struct StubEngine {
    state: RefCell<StubState>,
}

impl StubEngine {
    pub fn new() -> Self {
        StubEngine::default()
    }

    /// Allocate a newly owned cell holding `datum`.
    ///
    /// Cell ids referenced by object or array slots inside `datum` are
    /// consumed: the new cell takes over their ownership.
    pub fn alloc(&self, datum: Datum) -> RawValue {
        self.state.borrow_mut().alloc(datum)
    }

    /// Allocate a newly owned engine error value.
    pub fn alloc_error(&self, message: &str) -> RawValue {
        self.alloc(Datum::Error(message.into()))
    }

    /// Snapshot of the datum behind `cell`. Null for a dead cell.
    pub fn datum(&self, cell: RawValue) -> Datum {
        self.state
            .borrow()
            .cells
            .get(&cell.0)
            .map(|entry| entry.datum.clone())
            .unwrap_or_default()
    }

    /// Number of live cells.
    pub fn live_cells(&self) -> usize {
        self.state.borrow().cells.len()
    }

    /// Sum of reference counts across live cells.
    pub fn total_refs(&self) -> u64 {
        self.state
            .borrow()
            .cells
            .values()
            .map(|entry| entry.refs)
            .sum()
    }

    /// Number of open iterators.
    pub fn live_iters(&self) -> usize {
        self.state.borrow().iters.len()
    }

    /// Number of unreleased engine-owned strings.
    pub fn live_strings(&self) -> usize {
        self.state.borrow().strings.len()
    }

    /// Snapshot of the call counters.
    pub fn counts(&self) -> CallCounts {
        self.state.borrow().counts
    }
}

impl Engine for StubEngine {
    fn clone_value(&self, cell: RawValue) -> RawValue {
        let mut st = self.state.borrow_mut();
        st.counts.clones += 1;
        st.retain(cell)
    }

    fn release(&self, cell: RawValue) {
        let mut st = self.state.borrow_mut();
        st.counts.releases += 1;
        st.release(cell);
    }

    fn new_null(&self) -> RawValue {
        self.state.borrow_mut().alloc(Datum::Null)
    }

    fn is_error(&self, cell: RawValue) -> bool {
        let mut st = self.state.borrow_mut();
        st.counts.error_checks += 1;
        matches!(
            st.cells.get(&cell.0).map(|entry| &entry.datum),
            Some(Datum::Error(_))
        )
    }

    fn is_identical(&self, a: RawValue, b: RawValue) -> bool {
        let mut st = self.state.borrow_mut();
        st.counts.identity_checks += 1;
        a == b
    }

    fn get_property(&self, obj: RawValue, name: &str) -> RawValue {
        let mut st = self.state.borrow_mut();
        st.counts.property_gets += 1;
        st.member(obj, name)
    }

    fn get_array_item(&self, obj: RawValue, index: u32) -> RawValue {
        let mut st = self.state.borrow_mut();
        st.counts.array_gets += 1;
        st.member(obj, &index.to_string())
    }

    fn set_property(&self, obj: RawValue, name: &str, value: RawValue) {
        let mut st = self.state.borrow_mut();
        st.counts.property_sets += 1;
        let previous = match st.cells.get_mut(&obj.0).map(|entry| &mut entry.datum) {
            Some(Datum::Object(props)) => props.insert(name.into(), value),
            // Not an object: the consumed value still has to die somewhere.
            _ => Some(value),
        };
        if let Some(old) = previous {
            st.release(old);
        }
    }

    fn set_array_item(&self, obj: RawValue, index: u32, value: RawValue) {
        let mut st = self.state.borrow_mut();
        st.counts.array_sets += 1;
        let index = index as usize;

        // Pad with nulls up to the index, matching engine array semantics.
        let pad = match st.cells.get(&obj.0).map(|entry| &entry.datum) {
            Some(Datum::Array(items)) if items.len() < index => index - items.len(),
            _ => 0,
        };
        let padding: Vec<RawValue> = (0..pad).map(|_| st.alloc(Datum::Null)).collect();

        let previous = match st.cells.get_mut(&obj.0).map(|entry| &mut entry.datum) {
            Some(Datum::Array(items)) => {
                items.extend(padding);
                if index < items.len() {
                    items
                        .get_mut(index)
                        .map(|slot| std::mem::replace(slot, value))
                } else {
                    items.push(value);
                    None
                }
            }
            _ => Some(value),
        };
        if let Some(old) = previous {
            st.release(old);
        }
    }

    fn has_property(&self, obj: RawValue, name: &str) -> bool {
        let mut st = self.state.borrow_mut();
        st.counts.existence_checks += 1;
        match st.cells.get(&obj.0).map(|entry| &entry.datum) {
            Some(Datum::Object(props)) => props.contains_key(name),
            _ => false,
        }
    }

    fn has_index(&self, obj: RawValue, index: u32) -> bool {
        let mut st = self.state.borrow_mut();
        st.counts.existence_checks += 1;
        match st.cells.get(&obj.0).map(|entry| &entry.datum) {
            Some(Datum::Array(items)) => (index as usize) < items.len(),
            _ => false,
        }
    }

    fn iter_new(&self, obj: RawValue) -> RawIter {
        let mut st = self.state.borrow_mut();
        st.counts.iterators_opened += 1;
        let keys = st.member_keys(obj);
        let obj = st.retain(obj);
        let id = st.fresh_id();
        st.iters.insert(
            id,
            IterEntry {
                obj,
                keys,
                pos: None,
            },
        );
        RawIter(id)
    }

    fn iter_has_next(&self, it: RawIter) -> bool {
        let st = self.state.borrow();
        st.iters
            .get(&it.0)
            .map(|entry| entry.pos.map_or(0, |p| p + 1) < entry.keys.len())
            .unwrap_or(false)
    }

    fn iter_advance(&self, it: RawIter) {
        let mut st = self.state.borrow_mut();
        if let Some(entry) = st.iters.get_mut(&it.0) {
            entry.pos = Some(entry.pos.map_or(0, |p| p + 1));
        }
    }

    fn iter_value(&self, it: RawIter) -> RawValue {
        let mut st = self.state.borrow_mut();
        let current = st.iters.get(&it.0).and_then(|entry| {
            let key = entry.pos.and_then(|p| entry.keys.get(p))?;
            Some((entry.obj, key.clone()))
        });
        match current {
            Some((obj, key)) => st.member(obj, &key),
            None => st.alloc(Datum::Null),
        }
    }

    fn iter_key(&self, it: RawIter) -> RawString {
        let mut st = self.state.borrow_mut();
        let key = st
            .iters
            .get(&it.0)
            .and_then(|entry| entry.pos.and_then(|p| entry.keys.get(p)).cloned())
            .unwrap_or_default();
        let id = st.fresh_id();
        st.strings.insert(id, key);
        RawString(id)
    }

    fn iter_release(&self, it: RawIter) {
        let mut st = self.state.borrow_mut();
        st.counts.iterators_released += 1;
        match st.iters.swap_remove(&it.0) {
            Some(entry) => st.release(entry.obj),
            None => debug_assert!(false, "release of dead iterator {it:?}"),
        }
    }

    fn string_bytes(&self, s: RawString) -> Vec<u8> {
        self.state
            .borrow()
            .strings
            .get(&s.0)
            .map(|text| text.clone().into_bytes())
            .unwrap_or_default()
    }

    fn string_len(&self, s: RawString) -> usize {
        self.state
            .borrow()
            .strings
            .get(&s.0)
            .map(|text| text.len())
            .unwrap_or(0)
    }

    fn string_release(&self, s: RawString) {
        let removed = self.state.borrow_mut().strings.swap_remove(&s.0);
        debug_assert!(removed.is_some(), "release of dead string {s:?}");
    }
}

/// Host stub: tracks the cooperative bracket and converts scalars 1:1.
///
/// Object, array and error cells convert to [`Value::Object`] wrappers, the
/// way a real host wraps anything it cannot carry by value.
#[derive(Default)]
pub struct StubHost {
    outside: StdCell<u32>,
    crossings: StdCell<u64>,
}

impl StubHost {
    pub fn new() -> Self {
        StubHost::default()
    }

    /// How many times the cooperative region has been left.
    pub fn crossings(&self) -> u64 {
        self.crossings.get()
    }

    /// Whether the calling thread currently holds the cooperative lock.
    pub fn in_cooperative(&self) -> bool {
        self.outside.get() == 0
    }
}

impl Scheduler for StubHost {
    fn leave_cooperative(&self) {
        self.outside.set(self.outside.get() + 1);
        self.crossings.set(self.crossings.get() + 1);
    }

    fn enter_cooperative(&self) {
        debug_assert!(self.outside.get() > 0, "unbalanced cooperative bracket");
        self.outside.set(self.outside.get().saturating_sub(1));
    }
}

impl Host<StubEngine> for StubHost {
    fn cell_to_value<'e>(
        &self,
        engine: &'e StubEngine,
        cell: &Handle<'e, StubEngine>,
    ) -> Result<Value<'e, StubEngine>, BridgeError> {
        Ok(match engine.datum(cell.raw()) {
            Datum::Null => Value::Null,
            Datum::Bool(b) => Value::Bool(b),
            Datum::Int(i) => Value::Int(i),
            Datum::Float(x) => Value::Float(x),
            Datum::Str(s) => Value::Str(s),
            Datum::Object(_) | Datum::Array(_) | Datum::Error(_) => {
                Value::Object(ObjectRef::new(cell))
            }
        })
    }

    fn value_to_cell<'e>(
        &self,
        engine: &'e StubEngine,
        value: &Value<'e, StubEngine>,
    ) -> Result<Handle<'e, StubEngine>, BridgeError> {
        Ok(match value {
            Value::Null => Handle::from_raw(engine, engine.alloc(Datum::Null)),
            Value::Bool(b) => Handle::from_raw(engine, engine.alloc(Datum::Bool(*b))),
            Value::Int(i) => Handle::from_raw(engine, engine.alloc(Datum::Int(*i))),
            Value::Float(x) => Handle::from_raw(engine, engine.alloc(Datum::Float(*x))),
            Value::Str(s) => Handle::from_raw(engine, engine.alloc(Datum::Str(s.clone()))),
            Value::Object(o) => o.handle().clone(),
        })
    }
}
