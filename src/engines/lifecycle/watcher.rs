use super::termination::TerminationSignal;
use crate::engines::observation::{BestIndividualTracker, GridObserver};
use crate::types::Candidate;
use std::sync::Arc;

/// Observer handed to the engine: feeds the tracker and raises the
/// termination signal as soon as an individual hits the target fitness.
pub struct TargetWatcher<I> {
    tracker: Arc<BestIndividualTracker<I>>,
    signal: Arc<TerminationSignal>,
    target: f64,
}

impl<I: Candidate> TargetWatcher<I> {
    pub fn new(
        tracker: Arc<BestIndividualTracker<I>>,
        signal: Arc<TerminationSignal>,
        target: f64,
    ) -> Self {
        Self {
            tracker,
            signal,
            target,
        }
    }
}

impl<I: Candidate> GridObserver<I> for TargetWatcher<I> {
    fn start_observing(&self) {
        self.tracker.start_observing();
    }

    fn set(&self, individual: &I) {
        self.tracker.on_individual_added(individual);
        if individual.fitness().is_target(self.target) {
            log::info!("Target fitness reached by {}", individual);
            self.signal.signal();
        }
    }

    fn remove(&self, individual: &I) {
        self.tracker.on_individual_removed(individual);
    }

    fn stop_observing(&self) {
        self.tracker.stop_observing();
    }

    fn get_best_fit_ind(&self) -> Vec<I> {
        self.tracker.get_best()
    }
}
