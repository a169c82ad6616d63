//! Value bridge between a host scripting runtime and a UI scene-graph engine.
//!
//! The engine owns its values and hands out reference-counted cells; the
//! host runs cooperative fibers under a global scheduling lock. This crate
//! is the layer in between:
//!
//! - [`Handle`]: an owning wrapper over an engine cell that releases its
//!   reference exactly once, on every exit path.
//! - [`gate`]: the blocking-call gate. Property, array and iterator-value
//!   access can run engine-side code of unbounded duration; the gate leaves
//!   the host's cooperative region for exactly the span of the engine call.
//! - [`ObjectRef`]: the host-visible facade with indexed get/set, keyed
//!   iteration, existence test, error test, identity equality.
//!
//! The engine itself and the host's value converters are trait seams
//! ([`Engine`], [`Host`]) the embedder implements; [`stub`] ships an
//! instrumented in-memory pair of them for tests.
//!
//! # Example
//!
//! ```
//! use scenebridge::stub::{Datum, StubEngine, StubHost};
//! use scenebridge::{Handle, ObjectRef, Value};
//!
//! # fn main() -> Result<(), scenebridge::BridgeError> {
//! let engine = StubEngine::new();
//! let host = StubHost::new();
//!
//! let cell = Handle::from_raw(&engine, engine.alloc(Datum::Object(Default::default())));
//! let obj = ObjectRef::new(&cell);
//!
//! obj.set(&host, "answer", &Value::Int(42))?;
//! assert_eq!(obj.get(&host, "answer")?, Value::Int(42));
//! assert!(obj.has_key("answer")?);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod gate;
pub mod handle;
pub mod host;
pub mod object;
pub mod stub;
pub mod value;

pub use engine::{Engine, RawIter, RawString, RawValue};
pub use error::BridgeError;
pub use handle::Handle;
pub use host::{Host, Scheduler};
pub use object::{ObjectRef, Pairs};
pub use value::{Key, Value};
