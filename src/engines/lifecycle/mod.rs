pub mod termination;
pub mod watcher;
pub mod controller;

pub use controller::{ManagerLifecycleController, Phase};
pub use termination::{TerminationSignal, DEFAULT_POLL_INTERVAL};
pub use watcher::TargetWatcher;
