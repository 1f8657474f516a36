use super::{
    fitness::FitnessConfig, lifecycle::LifecycleConfig, process::ProcessConfig,
    traits::{ConfigManifest, ConfigSection},
};
use crate::error::SymregError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Prefix of environment variables overriding file settings,
/// e.g. `SYMREG__LIFECYCLE__POLL_INTERVAL_MS=50`
pub const ENV_PREFIX: &str = "SYMREG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub process: ProcessConfig,
    pub fitness: FitnessConfig,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), SymregError> {
        self.process.validate()?;
        self.fitness.validate()?;
        self.lifecycle.validate()?;
        Ok(())
    }

    pub fn manifests(&self) -> Vec<ConfigManifest> {
        vec![
            self.process.to_manifest(),
            self.fitness.to_manifest(),
            self.lifecycle.to_manifest(),
        ]
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AppConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SymregError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SymregError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| SymregError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.write() = config;
        Ok(())
    }

    /// Defaults, then the optional TOML file, then `SYMREG__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(&self, path: Option<P>) -> Result<(), SymregError> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&AppConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path.as_ref()));
        }

        let config: AppConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        *self.write() = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SymregError> {
        let toml_str = toml::to_string_pretty(&*self.read())
            .map_err(|e| SymregError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| SymregError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.read().clone()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
