pub mod traits;
pub mod process;
pub mod fitness;
pub mod lifecycle;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use process::ProcessConfig;
pub use fitness::FitnessConfig;
pub use lifecycle::LifecycleConfig;
pub use traits::{ConfigManifest, ConfigSection, FieldManifest};
