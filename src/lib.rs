//! Lifecycle core for grammar-guided symbolic regression: tracks the best
//! individuals a multi-threaded breeding engine produces and lets a caller
//! start the engine, block until a fit individual appears, and stop it.

pub mod config;
pub mod context;
pub mod engines;
pub mod error;
pub mod grammar;
pub mod report;
pub mod types;

pub use context::{ErrorListener, LoggingErrorListener, ManagerContext};
pub use engines::fitness::{DofVectorFitness, FitnessComputer};
pub use engines::generation::{BreedingEngine, CompletionCallback, EngineHooks, RandomProbeEngine};
pub use engines::lifecycle::{ManagerLifecycleController, TerminationSignal};
pub use engines::observation::{BestIndividualTracker, GridObserver};
pub use error::{Result, SymregError};
pub use types::{Candidate, DofFunction, Fitness, Individual, ManagerId, TARGET_FITNESS};
