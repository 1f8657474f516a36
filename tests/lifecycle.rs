use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};
use symreg::config::ProcessConfig;
use symreg::engines::lifecycle::Phase;
use symreg::grammar::{DofGrammar, GrammarRegistry};
use symreg::{
    Candidate, CompletionCallback, DofFunction, DofVectorFitness, ErrorListener, Fitness,
    FitnessComputer, ManagerContext, ManagerId, ManagerLifecycleController, RandomProbeEngine,
    SymregError,
};

type Controller = ManagerLifecycleController<RandomProbeEngine>;

/// Collects reported errors for later inspection
#[derive(Default)]
struct RecordingListener {
    messages: Mutex<Vec<String>>,
}

impl ErrorListener for RecordingListener {
    fn error(&self, message: &str, cause: &SymregError) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{}: {}", message, cause));
    }
}

fn test_process_config(max_num_reps: usize) -> ProcessConfig {
    ProcessConfig {
        manager_id: 0,
        num_workers: 4,
        max_num_reps,
        population_limit: 50,
        dof_arities: vec![2, 1],
        seed: Some(17),
        ..ProcessConfig::default()
    }
}

fn registry_for(arities: &[usize]) -> Arc<GrammarRegistry> {
    let mut registry = GrammarRegistry::new();
    for (dof, &num_vars) in arities.iter().enumerate() {
        registry.register(0, dof, DofGrammar::new(num_vars, "R:=[x1](R)"));
    }
    Arc::new(registry)
}

fn build_controller(
    config: ProcessConfig,
    registry: Arc<GrammarRegistry>,
    listener: Arc<dyn ErrorListener>,
) -> Controller {
    let fitness = Arc::new(DofVectorFitness::new(Arc::clone(&registry), Arc::clone(&listener)));
    build_controller_with(config, registry, fitness, listener)
}

fn build_controller_with(
    config: ProcessConfig,
    registry: Arc<GrammarRegistry>,
    fitness: Arc<dyn FitnessComputer>,
    listener: Arc<dyn ErrorListener>,
) -> Controller {
    let context = Arc::new(
        ManagerContext::new(config.manager_id, registry, fitness).with_error_listener(listener),
    );
    ManagerLifecycleController::new(RandomProbeEngine::new(context, config))
        .with_poll_interval(Duration::from_millis(10))
}

/// Listener that stops the controller registered in `slot`, as the batch
/// driver does
fn stopping_listener(slot: &Arc<OnceLock<Weak<Controller>>>) -> Arc<dyn ErrorListener> {
    let slot = Arc::clone(slot);
    Arc::new(move |_: &str, _: &SymregError| {
        if let Some(controller) = slot.get().and_then(Weak::upgrade) {
            controller.stop(Duration::from_millis(100), None);
        }
    })
}

/// Fitness computer that takes `delay` per candidate and reports an error
/// through `listener` once `trigger` is raised
fn slow_fitness(
    delay: Duration,
    trigger: Arc<AtomicBool>,
    listener: Arc<dyn ErrorListener>,
) -> Arc<dyn FitnessComputer> {
    Arc::new(move |_: ManagerId, _: &[DofFunction]| {
        thread::sleep(delay);
        if trigger.load(Ordering::SeqCst) {
            listener.error(
                "Candidate failed",
                &SymregError::Engine("evaluation failed during shutdown".to_string()),
            );
        }
        Fitness::new(0.0)
    })
}

/// Callback recording `(observing, terminated)` at the time it runs
fn state_recorder(
    controller: &Arc<Controller>,
    seen: &Arc<Mutex<Option<(bool, bool)>>>,
) -> Option<CompletionCallback> {
    let (controller, seen) = (Arc::clone(controller), Arc::clone(seen));
    Some(Box::new(move |_| {
        *seen.lock().unwrap() = Some((
            controller.tracker().is_observing(),
            controller.is_terminated(),
        ));
    }))
}

fn counting_callback(count: &Arc<AtomicUsize>) -> Option<CompletionCallback> {
    let count = Arc::clone(count);
    Some(Box::new(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    }))
}

#[test]
fn test_full_run_yields_consistent_best_set() {
    let listener = Arc::new(RecordingListener::default());
    let controller = build_controller(
        test_process_config(2_000),
        registry_for(&[2, 1]),
        listener.clone(),
    );

    controller.start().unwrap();
    controller.await_termination();

    let stopped = Arc::new(AtomicUsize::new(0));
    controller.stop(Duration::from_secs(5), counting_callback(&stopped));
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
    assert_eq!(controller.phase(), Phase::Stopped);
    assert!(!controller.tracker().is_observing());

    let best = controller.get_best_fit_ind();
    assert!(!best.is_empty());
    assert!(best.iter().all(|ind| ind.is_equal(&best[0])));
    assert!(best.iter().all(|ind| ind.num_dofs() == 2));
    assert!(listener.messages.lock().unwrap().is_empty());
}

#[test]
fn test_engine_exhaustion_releases_waiter() {
    let listener = Arc::new(RecordingListener::default());
    let controller = build_controller(test_process_config(1), registry_for(&[2, 1]), listener);

    controller.start().unwrap();
    controller.await_termination();
    assert!(controller.is_terminated());

    let stopped = Arc::new(AtomicUsize::new(0));
    controller.stop(Duration::from_secs(5), counting_callback(&stopped));
    controller.stop(Duration::from_secs(5), counting_callback(&stopped));
    assert_eq!(stopped.load(Ordering::SeqCst), 2);
    assert_eq!(controller.get_best_fit_ind().len(), 1);
}

#[test]
fn test_missing_grammar_stops_the_manager() {
    let recorder = Arc::new(RecordingListener::default());
    let slot: Arc<OnceLock<Weak<Controller>>> = Arc::new(OnceLock::new());
    let listener: Arc<dyn ErrorListener> = {
        let recorder = Arc::clone(&recorder);
        let slot = Arc::clone(&slot);
        Arc::new(move |message: &str, cause: &SymregError| {
            recorder.error(message, cause);
            if let Some(controller) = slot.get().and_then(Weak::upgrade) {
                controller.stop(Duration::from_millis(100), None);
            }
        })
    };

    // Only dof 0 is registered, the engine breeds two dofs
    let controller = Arc::new(build_controller(
        test_process_config(10_000),
        registry_for(&[2]),
        listener,
    ));
    let _ = slot.set(Arc::downgrade(&controller));

    controller.start().unwrap();
    controller.await_termination();
    controller.stop(Duration::from_secs(5), None);

    let messages = recorder.messages.lock().unwrap();
    assert!(!messages.is_empty());
    assert!(messages[0].contains("No grammar registered for manager 0, dof 1"));
    assert!(controller.get_best_fit_ind().is_empty());
}

#[test]
fn test_stop_before_start_with_real_engine() {
    let controller = build_controller(
        test_process_config(100),
        registry_for(&[2, 1]),
        Arc::new(RecordingListener::default()),
    );

    let stopped = Arc::new(AtomicUsize::new(0));
    controller.stop(Duration::from_millis(10), counting_callback(&stopped));
    assert_eq!(stopped.load(Ordering::SeqCst), 1);

    // Terminated without ever running, waiting does not block
    controller.await_termination();
    assert!(controller.start().is_err());
}

#[test]
fn test_owner_stop_waits_after_stop_from_worker() {
    let slot: Arc<OnceLock<Weak<Controller>>> = Arc::new(OnceLock::new());
    let listener = stopping_listener(&slot);

    // The first evaluation asks for a stop, then every evaluation lingers
    let asked = Arc::new(AtomicBool::new(false));
    let fitness: Arc<dyn FitnessComputer> = {
        let (asked, listener) = (Arc::clone(&asked), Arc::clone(&listener));
        Arc::new(move |_: ManagerId, _: &[DofFunction]| {
            if !asked.swap(true, Ordering::SeqCst) {
                listener.error(
                    "Candidate failed",
                    &SymregError::Engine("broken candidate".to_string()),
                );
            }
            thread::sleep(Duration::from_millis(300));
            Fitness::new(0.0)
        })
    };

    let controller = Arc::new(build_controller_with(
        test_process_config(10_000),
        registry_for(&[2, 1]),
        fitness,
        listener,
    ));
    let _ = slot.set(Arc::downgrade(&controller));
    controller.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.phase() != Phase::Stopped {
        assert!(Instant::now() < deadline, "worker never stopped the manager");
        thread::sleep(Duration::from_millis(5));
    }

    let seen = Arc::new(Mutex::new(None));
    controller.stop(Duration::from_secs(5), state_recorder(&controller, &seen));

    assert_eq!(*seen.lock().unwrap(), Some((false, true)));
    assert!(!controller.is_running());
}

#[test]
fn test_stop_from_worker_during_owner_stop_does_not_stall() {
    let slot: Arc<OnceLock<Weak<Controller>>> = Arc::new(OnceLock::new());
    let listener = stopping_listener(&slot);
    let stopping = Arc::new(AtomicBool::new(false));

    let controller = Arc::new(build_controller_with(
        test_process_config(10_000),
        registry_for(&[2, 1]),
        slow_fitness(Duration::from_millis(50), Arc::clone(&stopping), Arc::clone(&listener)),
        listener,
    ));
    let _ = slot.set(Arc::downgrade(&controller));
    controller.start().unwrap();
    thread::sleep(Duration::from_millis(120));

    let seen = Arc::new(Mutex::new(None));
    stopping.store(true, Ordering::SeqCst);
    let begin = Instant::now();
    controller.stop(Duration::from_secs(3), state_recorder(&controller, &seen));
    let elapsed = begin.elapsed();

    assert!(elapsed < Duration::from_secs(1), "stop took {:?}", elapsed);
    assert_eq!(*seen.lock().unwrap(), Some((false, true)));
}

#[test]
fn test_stop_from_unrelated_rayon_thread_waits() {
    let controller = Arc::new(build_controller_with(
        test_process_config(10_000),
        registry_for(&[2, 1]),
        slow_fitness(
            Duration::from_millis(20),
            Arc::new(AtomicBool::new(false)),
            Arc::new(RecordingListener::default()),
        ),
        Arc::new(RecordingListener::default()),
    ));
    controller.start().unwrap();

    let seen = Arc::new(Mutex::new(None));
    rayon::scope(|scope| {
        scope.spawn(|_| {
            controller.stop(Duration::from_secs(5), state_recorder(&controller, &seen));
        });
    });

    assert_eq!(*seen.lock().unwrap(), Some((false, true)));
}
