//! Host-runtime services consumed by the bridge.
//!
//! The host scripting runtime supplies two things the bridge cannot provide
//! itself: the cooperative-scheduling bracket around blocking engine calls,
//! and the converters between its own dynamic values and engine cells. Both
//! are trait seams the embedder implements, in the style of a platform
//! provider.

use crate::engine::Engine;
use crate::error::BridgeError;
use crate::handle::Handle;
use crate::value::Value;

/// The host scheduler's cooperative-region bracket.
///
/// A single native thread runs the host's cooperative logic under a global
/// execution lock. [`leave_cooperative`] releases that lock so other host
/// work (other fibers, background collection, signal handling) can proceed
/// while this thread is parked inside the engine; [`enter_cooperative`]
/// reacquires it. `leave_cooperative` also registers the host's generic
/// unblock signal, so the wait to re-enter stays interruptible. The engine
/// call itself, once started, always runs to completion.
///
/// [`leave_cooperative`]: Scheduler::leave_cooperative
/// [`enter_cooperative`]: Scheduler::enter_cooperative
pub trait Scheduler {
    /// Release the cooperative-scheduling lock for the calling thread.
    fn leave_cooperative(&self);

    /// Reacquire the cooperative-scheduling lock. May wait.
    fn enter_cooperative(&self);
}

/// Host services bundle: the scheduler bracket plus the generic value
/// converters.
///
/// The conversion rules themselves are the host's business; the bridge fixes
/// only the ownership discipline each converter must respect.
pub trait Host<E: Engine + ?Sized>: Scheduler {
    /// Convert an engine cell into a host value.
    ///
    /// Borrows `cell` and must not retain it; a converter that needs the
    /// cell beyond the call (to wrap an object, say) takes its own clone.
    fn cell_to_value<'e>(
        &self,
        engine: &'e E,
        cell: &Handle<'e, E>,
    ) -> Result<Value<'e, E>, BridgeError>;

    /// Produce a newly owned engine cell holding `value`.
    ///
    /// The caller owns the result and releases it (or hands it to a
    /// consuming engine operation) exactly once.
    fn value_to_cell<'e>(
        &self,
        engine: &'e E,
        value: &Value<'e, E>,
    ) -> Result<Handle<'e, E>, BridgeError>;
}
