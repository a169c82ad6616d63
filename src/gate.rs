//! The blocking-call gate.
//!
//! Property, array-item and iterator-value access can trigger engine-side
//! code of unbounded duration (a scene-side getter, a deferred layout pass).
//! Holding the host's cooperative-scheduling lock for that long would stall
//! every other host fiber, so these operations are only reached through the
//! functions here: each one brackets exactly the engine call between
//! [`Scheduler::leave_cooperative`] and [`Scheduler::enter_cooperative`].
//!
//! The gate is a pure pass-through. It does not inspect results for engine
//! error values; that is the caller's job, via
//! [`Handle::is_error`](crate::Handle::is_error).

use crate::engine::{Engine, RawIter};
use crate::handle::Handle;
use crate::host::Scheduler;

/// Scoped bracket around a blocking section.
///
/// Leaves the cooperative region on construction and re-enters it on drop,
/// so the region is re-entered on every exit path, unwinding included.
struct CoopUnlock<'s, S: Scheduler + ?Sized> {
    sched: &'s S,
}

impl<'s, S: Scheduler + ?Sized> CoopUnlock<'s, S> {
    fn new(sched: &'s S) -> Self {
        sched.leave_cooperative();
        CoopUnlock { sched }
    }
}

impl<'s, S: Scheduler + ?Sized> Drop for CoopUnlock<'s, S> {
    fn drop(&mut self) {
        self.sched.enter_cooperative();
    }
}

/// Run `f` outside the cooperative region.
///
/// `f` executes synchronously on the current thread; only the scheduler is
/// told the thread is parked. Exposed for embedders whose engines have
/// further blocking entry points (function invocation, say) that must follow
/// the same discipline.
pub fn blocking<R>(sched: &(impl Scheduler + ?Sized), f: impl FnOnce() -> R) -> R {
    let _outside = CoopUnlock::new(sched);
    f()
}

/// Gated property read. Borrows `obj`; returns a newly owned cell.
pub fn get_property<'e, E: Engine + ?Sized>(
    sched: &(impl Scheduler + ?Sized),
    engine: &'e E,
    obj: &Handle<'e, E>,
    name: &str,
) -> Handle<'e, E> {
    let raw = blocking(sched, || engine.get_property(obj.raw(), name));
    Handle::from_raw(engine, raw)
}

/// Gated array-element read. Borrows `obj`; returns a newly owned cell.
pub fn get_array_item<'e, E: Engine + ?Sized>(
    sched: &(impl Scheduler + ?Sized),
    engine: &'e E,
    obj: &Handle<'e, E>,
    index: u32,
) -> Handle<'e, E> {
    let raw = blocking(sched, || engine.get_array_item(obj.raw(), index));
    Handle::from_raw(engine, raw)
}

/// Gated property write. Borrows `obj`; consumes `value`: its ownership
/// transfers to the engine call.
pub fn set_property<'e, E: Engine + ?Sized>(
    sched: &(impl Scheduler + ?Sized),
    engine: &'e E,
    obj: &Handle<'e, E>,
    name: &str,
    value: Handle<'e, E>,
) {
    let cell = value.into_raw();
    blocking(sched, || engine.set_property(obj.raw(), name, cell));
}

/// Gated array-element write. Borrows `obj`; consumes `value`.
pub fn set_array_item<'e, E: Engine + ?Sized>(
    sched: &(impl Scheduler + ?Sized),
    engine: &'e E,
    obj: &Handle<'e, E>,
    index: u32,
    value: Handle<'e, E>,
) {
    let cell = value.into_raw();
    blocking(sched, || engine.set_array_item(obj.raw(), index, cell));
}

/// Gated iterator step: advance `it` and fetch the value it lands on, under
/// a single crossing. Returns a newly owned cell.
pub fn iter_next_value<'e, E: Engine + ?Sized>(
    sched: &(impl Scheduler + ?Sized),
    engine: &'e E,
    it: RawIter,
) -> Handle<'e, E> {
    let raw = blocking(sched, || {
        engine.iter_advance(it);
        engine.iter_value(it)
    });
    Handle::from_raw(engine, raw)
}
