use super::observer::GridObserver;
use crate::types::Candidate;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct TrackerState<I> {
    observing: bool,
    // Every member ties with every other member
    best: Vec<I>,
}

/// Accumulates the individuals tied for the best fitness seen while observing.
///
/// Removals never evict: the set keeps the best individuals ever seen, not
/// the best ones still alive in the population.
pub struct BestIndividualTracker<I> {
    state: Mutex<TrackerState<I>>,
}

impl<I: Candidate> BestIndividualTracker<I> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                observing: false,
                best: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackerState<I>> {
        // The state stays consistent across a panic, every update is a single step
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start accepting individuals; keeps whatever was accumulated before
    pub fn start_observing(&self) {
        log::info!("Grid observations are started!");
        self.state().observing = true;
    }

    pub fn on_individual_added(&self, individual: &I) {
        let mut state = self.state();
        if !state.observing {
            return;
        }
        log::debug!("Adding new individual: {}", individual);

        let Some(max) = state.best.first() else {
            state.best.push(individual.clone());
            return;
        };

        if max.is_equal(individual) {
            state.best.push(individual.clone());
        } else if max.is_less(individual) {
            state.best = vec![individual.clone()];
        }
    }

    pub fn on_individual_removed(&self, individual: &I) {
        let state = self.state();
        if state.observing {
            log::debug!("Killing old individual: {}", individual);
        }
    }

    pub fn stop_observing(&self) {
        log::info!("Grid observations are stopped!");
        self.state().observing = false;
    }

    pub fn is_observing(&self) -> bool {
        self.state().observing
    }

    /// Snapshot of the current best set, in no particular order
    pub fn get_best(&self) -> Vec<I> {
        self.state().best.clone()
    }

    pub fn len(&self) -> usize {
        self.state().best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().best.is_empty()
    }
}

impl<I: Candidate> Default for BestIndividualTracker<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Candidate> GridObserver<I> for BestIndividualTracker<I> {
    fn start_observing(&self) {
        BestIndividualTracker::start_observing(self);
    }

    fn set(&self, individual: &I) {
        self.on_individual_added(individual);
    }

    fn remove(&self, individual: &I) {
        self.on_individual_removed(individual);
    }

    fn stop_observing(&self) {
        BestIndividualTracker::stop_observing(self);
    }

    fn get_best_fit_ind(&self) -> Vec<I> {
        self.get_best()
    }
}
