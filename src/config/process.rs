use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SymregError;
use crate::types::ManagerId;
use serde::{Deserialize, Serialize};

/// Grammar handed to every dof unless configured otherwise
pub const DEFAULT_GRAMMAR: &str = "R:=[x1](P);[$signum(x1)](P)@0.25;[-x1](R)@0.1;[x1+x2](R,R)@4;[x1*x2](R,R)@4\n\
P:=[x1](D);[1/x1](D);[x1](V)@2;[-x1](P)@0.1;[x1+x2](P,P)@4;[x1*x2](P,P)@4";

/// Settings of one process manager and the engine it drives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub manager_id: ManagerId,
    pub num_workers: usize,
    /// Reproductions before the engine finishes on its own
    pub max_num_reps: usize,
    /// Live individuals kept before the oldest are removed
    pub population_limit: usize,
    /// Number of variables of each dof
    pub dof_arities: Vec<usize>,
    pub grammar: String,
    pub seed: Option<u64>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            manager_id: 0,
            num_workers: 20,
            max_num_reps: 10_000,
            population_limit: 30 * 30,
            dof_arities: vec![2, 1],
            grammar: DEFAULT_GRAMMAR.to_string(),
            seed: None,
        }
    }
}

impl ProcessConfig {
    pub fn num_dofs(&self) -> usize {
        self.dof_arities.len()
    }
}

impl ConfigSection for ProcessConfig {
    fn section_name() -> &'static str {
        "process"
    }

    fn validate(&self) -> Result<(), SymregError> {
        if self.num_workers == 0 {
            return Err(SymregError::Configuration(
                "Number of workers must be at least 1".to_string(),
            ));
        }
        if self.max_num_reps == 0 {
            return Err(SymregError::Configuration(
                "Maximum number of reproductions must be at least 1".to_string(),
            ));
        }
        if self.population_limit == 0 {
            return Err(SymregError::Configuration(
                "Population limit must be at least 1".to_string(),
            ));
        }
        if self.dof_arities.is_empty() {
            return Err(SymregError::Configuration(
                "At least one dof is required".to_string(),
            ));
        }
        if let Some(dof) = self.dof_arities.iter().position(|&a| a == 0) {
            return Err(SymregError::Configuration(format!(
                "Dof {} must have at least one variable",
                dof
            )));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Process".to_string(),
            fields: vec![
                FieldManifest::new(
                    "manager_id",
                    "integer",
                    serde_json::json!(0),
                    "Identifier of the process manager",
                ),
                FieldManifest::new(
                    "num_workers",
                    "integer",
                    serde_json::json!(20),
                    "Breeding worker threads",
                )
                .with_range(Some(1.0), None),
                FieldManifest::new(
                    "max_num_reps",
                    "integer",
                    serde_json::json!(10_000),
                    "Reproductions before the run ends",
                )
                .with_range(Some(1.0), None),
                FieldManifest::new(
                    "population_limit",
                    "integer",
                    serde_json::json!(900),
                    "Live individuals kept in the population",
                )
                .with_range(Some(1.0), None),
                FieldManifest::new(
                    "dof_arities",
                    "integer[]",
                    serde_json::json!([2, 1]),
                    "Number of variables of each dof",
                ),
                FieldManifest::new(
                    "seed",
                    "integer?",
                    serde_json::Value::Null,
                    "Random seed, entropy when unset",
                ),
            ],
        }
    }
}
