use super::termination::{TerminationSignal, DEFAULT_POLL_INTERVAL};
use super::watcher::TargetWatcher;
use crate::config::LifecycleConfig;
use crate::engines::generation::{BreedingEngine, CompletionCallback, EngineHooks};
use crate::engines::observation::BestIndividualTracker;
use crate::error::{Result, SymregError};
use crate::types::{ManagerId, TARGET_FITNESS};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopped,
}

/// Runs one breeding engine through start, await and stop, and keeps the
/// best individuals it produced.
///
/// `stop` is meant to be issued by a single owner. Stops raised from inside
/// the run (an error listener on a worker) only request the shutdown; the
/// owner's `stop` still waits for the engine before calling back.
pub struct ManagerLifecycleController<E: BreedingEngine> {
    manager_id: ManagerId,
    engine: E,
    phase: Mutex<Phase>,
    tracker: Arc<BestIndividualTracker<E::Individual>>,
    signal: Arc<TerminationSignal>,
    target: f64,
    poll_interval: Duration,
}

impl<E: BreedingEngine> ManagerLifecycleController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            manager_id: engine.manager_id(),
            engine,
            phase: Mutex::new(Phase::Idle),
            tracker: Arc::new(BestIndividualTracker::new()),
            signal: Arc::new(TerminationSignal::new()),
            target: TARGET_FITNESS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(engine: E, config: &LifecycleConfig, target: f64) -> Self {
        Self::new(engine)
            .with_poll_interval(config.poll_interval())
            .with_target(target)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = target;
        self
    }

    fn phase_lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the engine in the background and return immediately
    pub fn start(&self) -> Result<()> {
        let mut phase = self.phase_lock();
        if *phase != Phase::Idle {
            return Err(SymregError::Lifecycle(format!(
                "manager {} cannot start while {:?}",
                self.manager_id, *phase
            )));
        }

        log::info!("Starting the manager {}", self.manager_id);
        let observer = Arc::new(TargetWatcher::new(
            Arc::clone(&self.tracker),
            Arc::clone(&self.signal),
            self.target,
        ));
        let signal = Arc::clone(&self.signal);
        let hooks = EngineHooks {
            observer,
            on_finished: Box::new(move |manager_id| {
                log::info!("The manager {} has stopped!", manager_id);
                signal.signal();
            }),
        };

        // engine.start must not wait on the workers: their stop requests
        // take this lock
        match self.engine.start(hooks) {
            Ok(()) => {
                *phase = Phase::Running;
                Ok(())
            }
            Err(e) => {
                // Nothing will ever complete, release any waiter
                *phase = Phase::Stopped;
                self.signal.signal();
                Err(e)
            }
        }
    }

    /// Block until a target individual shows up or the engine finishes
    pub fn await_termination(&self) {
        self.signal.wait(self.poll_interval);
    }

    /// Shut the engine down and invoke `on_stopped` once shutdown is over.
    ///
    /// Safe before `start` and after the engine stopped on its own; the
    /// callback runs exactly once per call in every case. The phase lock is
    /// released before waiting on the engine.
    pub fn stop(&self, grace: Duration, on_stopped: Option<CompletionCallback>) {
        let previous = std::mem::replace(&mut *self.phase_lock(), Phase::Stopped);
        match previous {
            Phase::Running => {
                log::info!("Stopping the manager {}", self.manager_id);
                self.engine.stop(grace);
            }
            Phase::Idle => {
                log::debug!("Manager {} stopped before it was started", self.manager_id);
                self.signal.signal();
            }
            Phase::Stopped => {
                // A stop raised inside the run did not wait, this one does
                log::debug!("Manager {} is already stopped", self.manager_id);
                self.engine.stop(grace);
            }
        }

        if let Some(callback) = on_stopped {
            callback(self.manager_id);
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase_lock()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running && self.engine.is_running()
    }

    pub fn manager_id(&self) -> ManagerId {
        self.manager_id
    }

    pub fn is_terminated(&self) -> bool {
        self.signal.is_signaled()
    }

    /// Snapshot of the best individuals seen so far
    pub fn get_best_fit_ind(&self) -> Vec<E::Individual> {
        self.tracker.get_best()
    }

    pub fn tracker(&self) -> &Arc<BestIndividualTracker<E::Individual>> {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::observation::GridObserver;
    use crate::types::{Fitness, Individual};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    type SharedHooks = Arc<Mutex<Option<EngineHooks<Individual>>>>;

    /// Engine whose events are driven by the test itself
    struct ManualEngine {
        hooks: SharedHooks,
        running: AtomicBool,
        stops: Arc<AtomicUsize>,
    }

    impl ManualEngine {
        fn new() -> (Self, SharedHooks, Arc<AtomicUsize>) {
            let hooks: SharedHooks = Arc::new(Mutex::new(None));
            let stops = Arc::new(AtomicUsize::new(0));
            let engine = Self {
                hooks: Arc::clone(&hooks),
                running: AtomicBool::new(false),
                stops: Arc::clone(&stops),
            };
            (engine, hooks, stops)
        }
    }

    impl BreedingEngine for ManualEngine {
        type Individual = Individual;

        fn manager_id(&self) -> ManagerId {
            7
        }

        fn start(&self, hooks: EngineHooks<Individual>) -> Result<()> {
            hooks.observer.start_observing();
            *self.hooks.lock().unwrap() = Some(hooks);
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self, _grace: Duration) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if let Some(hooks) = self.hooks.lock().unwrap().take() {
                hooks.observer.stop_observing();
                (hooks.on_finished)(7);
            }
            self.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    fn emit(hooks: &SharedHooks, ind: Individual) {
        if let Some(hooks) = hooks.lock().unwrap().as_ref() {
            hooks.observer.set(&ind);
        }
    }

    fn finish(hooks: &SharedHooks) {
        if let Some(hooks) = hooks.lock().unwrap().take() {
            hooks.observer.stop_observing();
            (hooks.on_finished)(7);
        }
    }

    fn counting_callback(count: &Arc<AtomicUsize>) -> Option<CompletionCallback> {
        let count = Arc::clone(count);
        Some(Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_await_returns_after_target_individual() {
        let poll_interval = Duration::from_millis(50);
        let (engine, hooks, _) = ManualEngine::new();
        let controller =
            Arc::new(ManagerLifecycleController::new(engine).with_poll_interval(poll_interval));
        controller.start().unwrap();

        let producer = {
            let hooks = Arc::clone(&hooks);
            thread::spawn(move || {
                emit(&hooks, Individual::new(1, Fitness::new(0.5), vec![]));
                thread::sleep(Duration::from_millis(200));
                let emitted_at = Instant::now();
                emit(&hooks, Individual::new(2, Fitness::new(1.0), vec![]));
                emitted_at
            })
        };

        controller.await_termination();
        let returned_at = Instant::now();
        let emitted_at = producer.join().unwrap();

        assert!(returned_at >= emitted_at, "returned before the target arrived");
        assert!(
            returned_at - emitted_at <= poll_interval + Duration::from_millis(50),
            "returned {:?} after the target",
            returned_at - emitted_at
        );

        controller.stop(Duration::from_millis(10), None);
        let best = controller.get_best_fit_ind();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].id, 2);
        assert_eq!(controller.phase(), Phase::Stopped);
    }

    #[test]
    fn test_await_returns_on_engine_completion_without_individuals() {
        let (engine, hooks, _) = ManualEngine::new();
        let controller = ManagerLifecycleController::new(engine)
            .with_poll_interval(Duration::from_millis(20));
        controller.start().unwrap();

        let finisher = {
            let hooks = Arc::clone(&hooks);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                finish(&hooks);
            })
        };

        controller.await_termination();
        finisher.join().unwrap();
        assert!(controller.is_terminated());
        assert!(controller.get_best_fit_ind().is_empty());
    }

    #[test]
    fn test_stop_before_start_invokes_callback_once() {
        let (engine, _, stops) = ManualEngine::new();
        let controller = ManagerLifecycleController::new(engine);
        let count = Arc::new(AtomicUsize::new(0));

        controller.stop(Duration::from_millis(10), counting_callback(&count));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert!(controller.is_terminated());
        assert!(controller.start().is_err());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (engine, _, stops) = ManualEngine::new();
        let controller = ManagerLifecycleController::new(engine);
        controller.start().unwrap();
        assert!(controller.is_running());

        let count = Arc::new(AtomicUsize::new(0));
        controller.stop(Duration::from_millis(10), counting_callback(&count));
        controller.stop(Duration::from_millis(10), counting_callback(&count));

        // The second stop asks the engine again, which is a no-op by then
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_after_engine_finished_still_calls_back() {
        let (engine, hooks, _) = ManualEngine::new();
        let controller = ManagerLifecycleController::new(engine);
        controller.start().unwrap();
        finish(&hooks);
        controller.await_termination();

        let count = Arc::new(AtomicUsize::new(0));
        controller.stop(Duration::from_millis(10), counting_callback(&count));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_twice_fails() {
        let (engine, _, _) = ManualEngine::new();
        let controller = ManagerLifecycleController::new(engine);
        controller.start().unwrap();
        assert!(matches!(controller.start(), Err(SymregError::Lifecycle(_))));
    }
}
