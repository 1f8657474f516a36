pub mod engine;
pub mod random_probe;

pub use engine::{BreedingEngine, CompletionCallback, EngineHooks};
pub use random_probe::RandomProbeEngine;
