use crate::engines::observation::GridObserver;
use crate::error::Result;
use crate::types::{Candidate, ManagerId};
use std::sync::Arc;
use std::time::Duration;

/// Invoked once when a manager terminates, whatever the reason
pub type CompletionCallback = Box<dyn FnOnce(ManagerId) + Send>;

/// What the engine reports to while it runs
pub struct EngineHooks<I> {
    pub observer: Arc<dyn GridObserver<I>>,
    pub on_finished: CompletionCallback,
}

/// A background breeding process driven by a lifecycle controller.
///
/// `start` must return without waiting for breeding to finish. The engine
/// calls `observer.start_observing()` before producing individuals,
/// `observer.stop_observing()` once it is done, and `on_finished` exactly
/// once after that: on exhaustion, explicit stop or fatal error alike.
///
/// Methods take `&self` so the engine can be stopped from its own worker
/// threads while its owner waits for it.
pub trait BreedingEngine: Send + Sync {
    type Individual: Candidate + 'static;

    fn manager_id(&self) -> ManagerId;

    fn start(&self, hooks: EngineHooks<Self::Individual>) -> Result<()>;

    /// Request shutdown, giving in-flight evaluations up to `grace` to
    /// complete, and return once the engine is down.
    ///
    /// May be called any number of times, before `start` and from any
    /// thread. When called from one of the engine's own threads it only
    /// raises the request and returns without waiting.
    fn stop(&self, grace: Duration);

    fn is_running(&self) -> bool;
}
