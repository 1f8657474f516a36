use crate::error::{Result, SymregError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Identifies one process manager (one independent breeding run)
pub type ManagerId = usize;

/// Fitness value reserved for "target met"
pub const TARGET_FITNESS: f64 = 1.0;

/// Scalar fitness of a candidate
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fitness(f64);

impl Fitness {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Exact match against the target, never "greater or equal"
    pub fn is_target(&self, target: f64) -> bool {
        self.0 == target
    }
}

impl fmt::Display for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// A candidate produced by a breeding engine.
///
/// The core only ever compares candidates through `is_equal` and `is_less`,
/// which must form a total preorder. The defaults compare by fitness.
pub trait Candidate: Clone + Send + Sync + fmt::Display {
    fn fitness(&self) -> Fitness;

    fn is_equal(&self, other: &Self) -> bool {
        self.fitness() == other.fitness()
    }

    fn is_less(&self, other: &Self) -> bool {
        self.fitness() < other.fitness()
    }
}

/// Vector-valued individual: one expression per dof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub id: u64,
    pub fitness: Fitness,
    pub expressions: Vec<String>,
}

impl Individual {
    pub fn new(id: u64, fitness: Fitness, expressions: Vec<String>) -> Self {
        Self {
            id,
            fitness,
            expressions,
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.expressions.len()
    }
}

impl Candidate for Individual {
    fn fitness(&self) -> Fitness {
        self.fitness
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Individual#{} (fitness {})", self.id, self.fitness)
    }
}

type DofFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Executable form of one dof of a candidate
#[derive(Clone)]
pub struct DofFunction {
    arity: usize,
    func: Arc<DofFn>,
}

impl DofFunction {
    pub fn new<F>(arity: usize, func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            arity,
            func: Arc::new(func),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke the callable; arity mismatches and panics become evaluation errors.
    pub fn invoke(&self, dof: usize, args: &[f64]) -> Result<f64> {
        if args.len() != self.arity {
            return Err(SymregError::Evaluation {
                dof,
                reason: format!(
                    "expected {} arguments, got {}",
                    self.arity,
                    args.len()
                ),
            });
        }

        panic::catch_unwind(AssertUnwindSafe(|| (self.func)(args))).map_err(|payload| {
            SymregError::Evaluation {
                dof,
                reason: panic_message(payload.as_ref()),
            }
        })
    }
}

impl fmt::Debug for DofFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DofFunction")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "callable panicked".to_string()
    }
}
