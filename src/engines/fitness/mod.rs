pub mod aggregator;

pub use aggregator::{DofVectorFitness, FitnessComputer};
