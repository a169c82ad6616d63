//! Handle conservation and gate discipline against the instrumented engine.

use std::panic::{AssertUnwindSafe, catch_unwind};

use indexmap::IndexMap;
use scenebridge::stub::{Datum, StubEngine, StubHost};
use scenebridge::{BridgeError, Engine, Handle, Host, ObjectRef, Scheduler, Value, gate};

fn sample_object(engine: &StubEngine) -> ObjectRef<'_, StubEngine> {
    let items = vec![
        engine.alloc(Datum::Int(10)),
        engine.alloc(Datum::Int(20)),
        engine.alloc(Datum::Int(30)),
    ];
    let mut props = IndexMap::new();
    props.insert("a".to_string(), engine.alloc(Datum::Int(1)));
    props.insert("b".to_string(), engine.alloc(Datum::Array(items)));
    let root = Handle::from_raw(engine, engine.alloc(Datum::Object(props)));
    ObjectRef::new(&root)
}

/// A host whose engine-to-host conversion always fails, for exercising the
/// release-on-error paths.
struct RefusingHost(StubHost);

impl Scheduler for RefusingHost {
    fn leave_cooperative(&self) {
        self.0.leave_cooperative();
    }

    fn enter_cooperative(&self) {
        self.0.enter_cooperative();
    }
}

impl Host<StubEngine> for RefusingHost {
    fn cell_to_value<'e>(
        &self,
        _engine: &'e StubEngine,
        _cell: &Handle<'e, StubEngine>,
    ) -> Result<Value<'e, StubEngine>, BridgeError> {
        Err(BridgeError::unconvertible("anything at all"))
    }

    fn value_to_cell<'e>(
        &self,
        engine: &'e StubEngine,
        value: &Value<'e, StubEngine>,
    ) -> Result<Handle<'e, StubEngine>, BridgeError> {
        self.0.value_to_cell(engine, value)
    }
}

// ============================================================================
// Handle lifecycle
// ============================================================================

#[test]
fn test_clone_and_release_balance() {
    let engine = StubEngine::new();
    let h = Handle::from_raw(&engine, engine.alloc(Datum::Int(5)));
    assert_eq!(engine.total_refs(), 1);

    let h2 = h.clone();
    assert_eq!(engine.total_refs(), 2);

    drop(h2);
    assert_eq!(engine.total_refs(), 1);

    drop(h);
    assert_eq!(engine.live_cells(), 0);
    assert_eq!(engine.counts().invalid_releases, 0);
}

#[test]
fn test_null_handle_releases_its_cell() {
    let engine = StubEngine::new();
    {
        let _h = Handle::null(&engine);
        assert_eq!(engine.live_cells(), 1);
    }
    assert_eq!(engine.live_cells(), 0);
}

#[test]
fn test_into_raw_transfers_ownership() {
    let engine = StubEngine::new();
    let h = Handle::from_raw(&engine, engine.alloc(Datum::Int(5)));

    let raw = h.into_raw();
    // No release happened; the cell is still live with its one reference.
    assert_eq!(engine.counts().releases, 0);
    assert_eq!(engine.total_refs(), 1);

    engine.release(raw);
    assert_eq!(engine.live_cells(), 0);
}

#[test]
fn test_wrapper_ownership_is_independent_of_the_caller() {
    let engine = StubEngine::new();
    let cell = Handle::from_raw(&engine, engine.alloc(Datum::Object(IndexMap::new())));
    assert_eq!(engine.total_refs(), 1);

    let wrapper = ObjectRef::new(&cell);
    assert_eq!(engine.total_refs(), 2);

    // The caller's handle can die first; the wrapper's reference survives.
    drop(cell);
    assert_eq!(engine.total_refs(), 1);

    drop(wrapper);
    assert_eq!(engine.live_cells(), 0);
}

// ============================================================================
// Conservation across façade operations
// ============================================================================

#[test]
fn test_reads_conserve_handles() {
    let engine = StubEngine::new();
    let host = StubHost::new();
    let obj = sample_object(&engine);

    let base_cells = engine.live_cells();
    let base_refs = engine.total_refs();

    for _ in 0..10 {
        let a = obj.get(&host, "a").unwrap();
        assert_eq!(a, Value::Int(1));
        let b = obj.get(&host, "b").unwrap();
        drop(b);
        let missing = obj.get(&host, "nope").unwrap();
        assert!(missing.is_null());
    }

    assert_eq!(engine.live_cells(), base_cells);
    assert_eq!(engine.total_refs(), base_refs);
    assert_eq!(engine.counts().invalid_releases, 0);
}

#[test]
fn test_writes_conserve_handles() {
    let engine = StubEngine::new();
    let host = StubHost::new();
    let obj = sample_object(&engine);

    obj.set(&host, "p", &Value::Int(1)).unwrap();
    let base_cells = engine.live_cells();
    let base_refs = engine.total_refs();

    for i in 0..10 {
        obj.set(&host, "p", &Value::Int(i)).unwrap();
    }

    assert_eq!(engine.live_cells(), base_cells);
    assert_eq!(engine.total_refs(), base_refs);
    assert_eq!(engine.counts().invalid_releases, 0);
}

#[test]
fn test_iteration_conserves_handles() {
    let engine = StubEngine::new();
    let host = StubHost::new();
    let obj = sample_object(&engine);

    let base_cells = engine.live_cells();
    let base_refs = engine.total_refs();

    for pair in obj.pairs(&host) {
        let _ = pair.unwrap();
    }

    assert_eq!(engine.live_cells(), base_cells);
    assert_eq!(engine.total_refs(), base_refs);
    assert_eq!(engine.live_iters(), 0);
    assert_eq!(engine.live_strings(), 0);
}

#[test]
fn test_everything_dies_with_the_last_wrapper() {
    let engine = StubEngine::new();
    let host = StubHost::new();
    {
        let obj = sample_object(&engine);
        let b = obj.get(&host, "b").unwrap();
        drop(obj);
        // The nested array is still reachable through `b`.
        assert_eq!(
            b.as_object().unwrap().get(&host, 0u32).unwrap(),
            Value::Int(10)
        );
    }
    assert_eq!(engine.live_cells(), 0);
    assert_eq!(engine.counts().invalid_releases, 0);
}

// ============================================================================
// Release on error paths
// ============================================================================

#[test]
fn test_failed_conversion_still_releases_the_result() {
    let engine = StubEngine::new();
    let host = RefusingHost(StubHost::new());
    let obj = sample_object(&engine);

    let base_cells = engine.live_cells();
    let base_refs = engine.total_refs();

    assert!(obj.get(&host, "a").is_err());

    assert_eq!(engine.live_cells(), base_cells);
    assert_eq!(engine.total_refs(), base_refs);
    assert!(host.0.in_cooperative());
}

#[test]
fn test_failed_conversion_mid_iteration_releases_everything() {
    let engine = StubEngine::new();
    let host = RefusingHost(StubHost::new());
    let obj = sample_object(&engine);

    let base_cells = engine.live_cells();
    let base_refs = engine.total_refs();

    let outcomes: Vec<_> = obj.pairs(&host).collect();
    // The cursor stops at the first conversion failure.
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_err());

    assert_eq!(engine.live_cells(), base_cells);
    assert_eq!(engine.total_refs(), base_refs);
    assert_eq!(engine.live_iters(), 0);
    assert_eq!(engine.live_strings(), 0);
}

// ============================================================================
// Gate discipline
// ============================================================================

#[test]
fn test_gate_brackets_exactly_the_engine_call() {
    let host = StubHost::new();
    assert!(host.in_cooperative());

    let result = gate::blocking(&host, || {
        assert!(!host.in_cooperative());
        17
    });

    assert_eq!(result, 17);
    assert!(host.in_cooperative());
    assert_eq!(host.crossings(), 1);
}

#[test]
fn test_gate_reenters_on_unwind() {
    let host = StubHost::new();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        gate::blocking(&host, || panic!("engine call blew up"));
    }));

    assert!(outcome.is_err());
    assert!(host.in_cooperative());
    assert_eq!(host.crossings(), 1);
}

#[test]
fn test_facade_operations_cross_once_each() {
    let engine = StubEngine::new();
    let host = StubHost::new();
    let obj = sample_object(&engine);

    obj.get(&host, "a").unwrap();
    assert_eq!(host.crossings(), 1);

    obj.set(&host, "p", &Value::Int(3)).unwrap();
    assert_eq!(host.crossings(), 2);

    obj.has_key("a").unwrap();
    obj.is_error();
    assert_eq!(host.crossings(), 2);

    // One crossing per materialized pair: a, b, p.
    assert_eq!(obj.pairs(&host).count(), 3);
    assert_eq!(host.crossings(), 5);
    assert!(host.in_cooperative());
}
