use crate::config::FitnessConfig;
use crate::context::ErrorListener;
use crate::error::Result;
use crate::grammar::GrammarRegistry;
use crate::types::{DofFunction, Fitness, ManagerId};
use std::sync::Arc;

/// Turns the per-dof callables of a vector-valued candidate into one fitness.
///
/// Shared by every worker of every manager, so implementations must be
/// callable concurrently. Failures are reported, never returned.
pub trait FitnessComputer: Send + Sync {
    fn compute_fitness(&self, manager_id: ManagerId, dofs: &[DofFunction]) -> Fitness;
}

impl<F> FitnessComputer for F
where
    F: Fn(ManagerId, &[DofFunction]) -> Fitness + Send + Sync,
{
    fn compute_fitness(&self, manager_id: ManagerId, dofs: &[DofFunction]) -> Fitness {
        self(manager_id, dofs)
    }
}

/// Scores each dof by probing it at the all-ones point and aggregates the
/// scores as the length of the score vector.
///
/// A dof scores `1.0` when its value lies in `[-tolerance, +tolerance]`,
/// `0.0` otherwise or when it cannot be evaluated. The aggregate is not
/// normalized: with `D` dofs it ranges over `[0, sqrt(D)]`.
pub struct DofVectorFitness {
    registry: Arc<GrammarRegistry>,
    errors: Arc<dyn ErrorListener>,
    probe: f64,
    tolerance: f64,
}

impl DofVectorFitness {
    pub fn new(registry: Arc<GrammarRegistry>, errors: Arc<dyn ErrorListener>) -> Self {
        Self::from_config(registry, errors, &FitnessConfig::default())
    }

    pub fn from_config(
        registry: Arc<GrammarRegistry>,
        errors: Arc<dyn ErrorListener>,
        config: &FitnessConfig,
    ) -> Self {
        Self {
            registry,
            errors,
            probe: config.probe_value,
            tolerance: config.tolerance,
        }
    }

    fn dof_score(&self, manager_id: ManagerId, dof: usize, func: &DofFunction) -> Result<f64> {
        let num_vars = self.registry.num_vars(manager_id, dof)?;
        let args = vec![self.probe; num_vars];
        let value = func.invoke(dof, &args)?;

        Ok(if (-self.tolerance..=self.tolerance).contains(&value) {
            1.0
        } else {
            0.0
        })
    }
}

impl FitnessComputer for DofVectorFitness {
    fn compute_fitness(&self, manager_id: ManagerId, dofs: &[DofFunction]) -> Fitness {
        let sum_sq: f64 = dofs
            .iter()
            .enumerate()
            .map(|(dof, func)| {
                let score = self.dof_score(manager_id, dof, func).unwrap_or_else(|e| {
                    self.errors.error("Failed to compute the dof fitness", &e);
                    0.0
                });
                score * score
            })
            .sum();

        Fitness::new(sum_sq.sqrt())
    }
}
