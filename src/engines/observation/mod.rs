pub mod observer;
pub mod best_tracker;

pub use best_tracker::BestIndividualTracker;
pub use observer::GridObserver;
