use crate::types::Candidate;

/// Callbacks a breeding engine issues while it maintains its population.
///
/// Called from arbitrary worker threads, possibly concurrently. Implementations
/// must not panic.
pub trait GridObserver<I: Candidate>: Send + Sync {
    fn start_observing(&self);

    /// An individual entered the population
    fn set(&self, individual: &I);

    /// An individual left the population
    fn remove(&self, individual: &I);

    fn stop_observing(&self);

    /// The best individuals seen so far
    fn get_best_fit_ind(&self) -> Vec<I>;
}
