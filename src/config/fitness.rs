use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SymregError;
use crate::types::TARGET_FITNESS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Every variable of a dof is set to this value when probing it
    pub probe_value: f64,
    /// Half-width of the accepted interval around zero
    pub tolerance: f64,
    /// Fitness that ends the run when reached exactly
    pub target_fitness: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            probe_value: 1.0,
            tolerance: 0.25,
            target_fitness: TARGET_FITNESS,
        }
    }
}

impl ConfigSection for FitnessConfig {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<(), SymregError> {
        if !self.probe_value.is_finite() {
            return Err(SymregError::Configuration(
                "Probe value must be finite".to_string(),
            ));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(SymregError::Configuration(
                "Tolerance must be a finite non-negative number".to_string(),
            ));
        }
        if !self.target_fitness.is_finite() {
            return Err(SymregError::Configuration(
                "Target fitness must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Fitness".to_string(),
            fields: vec![
                FieldManifest::new(
                    "probe_value",
                    "float",
                    serde_json::json!(1.0),
                    "Value of every variable at the probe point",
                ),
                FieldManifest::new(
                    "tolerance",
                    "float",
                    serde_json::json!(0.25),
                    "A dof scores when its value is within +/- tolerance",
                )
                .with_range(Some(0.0), None),
                FieldManifest::new(
                    "target_fitness",
                    "float",
                    serde_json::json!(TARGET_FITNESS),
                    "Exact fitness that ends the run",
                ),
            ],
        }
    }
}
