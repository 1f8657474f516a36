use super::engine::{BreedingEngine, EngineHooks};
use crate::config::ProcessConfig;
use crate::context::ManagerContext;
use crate::engines::observation::GridObserver;
use crate::error::{Result, SymregError};
use crate::types::{DofFunction, Individual, ManagerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::ThreadPool;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Stand-in breeding engine.
///
/// Workers draw random affine candidates, score them through the context's
/// fitness computer and push them through a bounded population, reporting
/// every insertion and eviction to the observer. The run ends after
/// `max_num_reps` reproductions or when stopped.
pub struct RandomProbeEngine {
    context: Arc<ManagerContext>,
    config: ProcessConfig,
    stop_flag: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    pool: OnceLock<Arc<ThreadPool>>,
    control_thread: Arc<OnceLock<ThreadId>>,
    shutdown: Mutex<Shutdown>,
}

/// Handles of a started run, consumed by the first caller able to wait
#[derive(Default)]
struct Shutdown {
    control: Option<JoinHandle<()>>,
    done_rx: Option<Receiver<()>>,
}

/// State shared by the workers of one run
struct RunState {
    population: Mutex<VecDeque<Individual>>,
    reps: AtomicUsize,
    next_id: AtomicU64,
}

impl RandomProbeEngine {
    pub fn new(context: Arc<ManagerContext>, config: ProcessConfig) -> Self {
        Self {
            context,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            pool: OnceLock::new(),
            control_thread: Arc::new(OnceLock::new()),
            shutdown: Mutex::new(Shutdown::default()),
        }
    }

    fn shutdown(&self) -> MutexGuard<'_, Shutdown> {
        self.shutdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True on the threads of this engine's own run: its pool workers and
    /// its control thread
    fn on_run_thread(&self) -> bool {
        let on_worker = self
            .pool
            .get()
            .and_then(|pool| pool.current_thread_index())
            .is_some();
        on_worker || self.control_thread.get() == Some(&thread::current().id())
    }

    fn join_control(control: JoinHandle<()>, manager_id: ManagerId) {
        if control.join().is_err() {
            log::error!("Control thread of manager {} panicked", manager_id);
        }
    }
}

impl BreedingEngine for RandomProbeEngine {
    type Individual = Individual;

    fn manager_id(&self) -> ManagerId {
        self.context.manager_id()
    }

    fn start(&self, hooks: EngineHooks<Individual>) -> Result<()> {
        let manager_id = self.manager_id();
        if self.pool.get().is_some() {
            return Err(SymregError::Engine(format!(
                "manager {} engine was already started",
                manager_id
            )));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_workers)
            .thread_name(move |idx| format!("mgr-{}-worker-{}", manager_id, idx))
            .build()
            .map(Arc::new)
            .map_err(|e| SymregError::Engine(format!("Failed to build worker pool: {}", e)))?;
        // Registered before any worker exists, so stop() can recognise them
        if self.pool.set(Arc::clone(&pool)).is_err() {
            return Err(SymregError::Engine(format!(
                "manager {} engine was already started",
                manager_id
            )));
        }

        let (done_tx, done_rx) = mpsc::channel();
        let context = Arc::clone(&self.context);
        let config = self.config.clone();
        let stop_flag = Arc::clone(&self.stop_flag);
        let running = Arc::clone(&self.running);
        let control_thread = Arc::clone(&self.control_thread);

        hooks.observer.start_observing();
        self.running.store(true, Ordering::SeqCst);
        let control = thread::Builder::new()
            .name(format!("mgr-{}-control", manager_id))
            .spawn(move || {
                let _ = control_thread.set(thread::current().id());
                let EngineHooks {
                    observer,
                    on_finished,
                } = hooks;
                let state = RunState {
                    population: Mutex::new(VecDeque::with_capacity(config.population_limit)),
                    reps: AtomicUsize::new(0),
                    next_id: AtomicU64::new(0),
                };

                let run = panic::catch_unwind(AssertUnwindSafe(|| {
                    pool.scope(|scope| {
                        for worker in 0..config.num_workers {
                            let (context, config, state) = (&context, &config, &state);
                            let (observer, stop_flag) = (&observer, &stop_flag);
                            scope.spawn(move |_| {
                                breed(worker, context, config, state, observer.as_ref(), stop_flag)
                            });
                        }
                    })
                }));
                if run.is_err() {
                    context.report(
                        "Breeding worker failed",
                        &SymregError::Engine(format!("a worker of manager {} panicked", manager_id)),
                    );
                }

                log::info!(
                    "Manager {} finished after {} reproductions",
                    manager_id,
                    state.reps.load(Ordering::SeqCst).min(config.max_num_reps)
                );
                observer.stop_observing();
                running.store(false, Ordering::SeqCst);
                on_finished(manager_id);
                let _ = done_tx.send(());
            });
        let control = match control {
            Ok(control) => control,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        let mut shutdown = self.shutdown();
        shutdown.control = Some(control);
        shutdown.done_rx = Some(done_rx);
        Ok(())
    }

    fn stop(&self, grace: Duration) {
        self.stop_flag.store(true, Ordering::SeqCst);

        let manager_id = self.manager_id();
        if self.on_run_thread() {
            // Called from inside the run (e.g. an error listener): waiting
            // here would wait for ourselves
            log::debug!("Stop requested from inside manager {}", manager_id);
            return;
        }

        // Only callers able to wait get here. The lock is kept while waiting
        // so a concurrent stop also returns after the run is over; run
        // threads never take it.
        let mut shutdown = self.shutdown();
        let Some(control) = shutdown.control.take() else {
            return;
        };
        match shutdown.done_rx.take().map(|rx| rx.recv_timeout(grace)) {
            Some(Err(RecvTimeoutError::Timeout)) => {
                log::warn!(
                    "Manager {} workers did not finish within {:?}, abandoning them",
                    manager_id,
                    grace
                );
            }
            _ => Self::join_control(control, manager_id),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Worker loop: one candidate per reproduction until the budget or a stop
fn breed(
    worker: usize,
    context: &ManagerContext,
    config: &ProcessConfig,
    state: &RunState,
    observer: &dyn GridObserver<Individual>,
    stop_flag: &AtomicBool,
) {
    let manager_id = context.manager_id();
    let arities = match resolve_arities(context, config.num_dofs()) {
        Ok(arities) => arities,
        Err(e) => {
            context.report("Failed to prepare the candidate layout", &e);
            stop_flag.store(true, Ordering::SeqCst);
            return;
        }
    };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
        None => StdRng::from_entropy(),
    };

    while !stop_flag.load(Ordering::SeqCst) {
        if state.reps.fetch_add(1, Ordering::SeqCst) >= config.max_num_reps {
            break;
        }

        let (dofs, expressions) = random_candidate(&arities, &mut rng);
        let fitness = context.fitness().compute_fitness(manager_id, &dofs);
        let id = state.next_id.fetch_add(1, Ordering::SeqCst);
        let individual = Individual::new(id, fitness, expressions);

        observer.set(&individual);
        let evicted = {
            let mut population = state
                .population
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            population.push_back(individual);
            if population.len() > config.population_limit {
                population.pop_front()
            } else {
                None
            }
        };
        if let Some(old) = evicted {
            observer.remove(&old);
        }
    }
}

fn resolve_arities(context: &ManagerContext, num_dofs: usize) -> Result<Vec<usize>> {
    (0..num_dofs)
        .map(|dof| context.registry().num_vars(context.manager_id(), dof))
        .collect()
}

/// Random affine function per dof, `b + c1*x1 + ... + ck*xk`
fn random_candidate<R: Rng>(arities: &[usize], rng: &mut R) -> (Vec<DofFunction>, Vec<String>) {
    arities
        .iter()
        .map(|&arity| {
            let coeffs: Vec<f64> = (0..arity).map(|_| rng.gen_range(-1.0..=1.0)).collect();
            let bias: f64 = rng.gen_range(-1.0..=1.0);

            let text = coeffs
                .iter()
                .enumerate()
                .map(|(idx, c)| format!("{:.4}*x{}", c, idx + 1))
                .chain(std::iter::once(format!("{:.4}", bias)))
                .collect::<Vec<_>>()
                .join(" + ");

            let func = DofFunction::new(arity, move |x| {
                bias + coeffs.iter().zip(x).map(|(c, v)| c * v).sum::<f64>()
            });
            (func, text)
        })
        .unzip()
}
