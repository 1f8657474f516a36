use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SymregError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub poll_interval_ms: u64,
    /// Time in-flight evaluations get to finish on stop
    pub stop_grace_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            stop_grace_ms: 10_000,
        }
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl ConfigSection for LifecycleConfig {
    fn section_name() -> &'static str {
        "lifecycle"
    }

    fn validate(&self) -> Result<(), SymregError> {
        if self.poll_interval_ms == 0 {
            return Err(SymregError::Configuration(
                "Poll interval must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Lifecycle".to_string(),
            fields: vec![
                FieldManifest::new(
                    "poll_interval_ms",
                    "integer",
                    serde_json::json!(100),
                    "Re-check interval while waiting for termination",
                )
                .with_range(Some(1.0), None),
                FieldManifest::new(
                    "stop_grace_ms",
                    "integer",
                    serde_json::json!(10_000),
                    "Grace period for in-flight evaluations on stop",
                )
                .with_range(Some(0.0), None),
            ],
        }
    }
}
