use crate::engines::fitness::FitnessComputer;
use crate::error::SymregError;
use crate::grammar::GrammarRegistry;
use crate::types::ManagerId;
use std::sync::Arc;

/// Receives failures raised inside breeding workers.
///
/// Implementations may request a manager stop from here.
pub trait ErrorListener: Send + Sync {
    fn error(&self, message: &str, cause: &SymregError);
}

impl<F> ErrorListener for F
where
    F: Fn(&str, &SymregError) + Send + Sync,
{
    fn error(&self, message: &str, cause: &SymregError) {
        self(message, cause)
    }
}

/// Default listener: logs and carries on
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorListener;

impl ErrorListener for LoggingErrorListener {
    fn error(&self, message: &str, cause: &SymregError) {
        log::error!("{}: {}", message, cause);
    }
}

/// Everything a manager needs that used to live in process-wide singletons.
#[derive(Clone)]
pub struct ManagerContext {
    manager_id: ManagerId,
    registry: Arc<GrammarRegistry>,
    fitness: Arc<dyn FitnessComputer>,
    errors: Arc<dyn ErrorListener>,
}

impl ManagerContext {
    pub fn new(
        manager_id: ManagerId,
        registry: Arc<GrammarRegistry>,
        fitness: Arc<dyn FitnessComputer>,
    ) -> Self {
        Self {
            manager_id,
            registry,
            fitness,
            errors: Arc::new(LoggingErrorListener),
        }
    }

    pub fn with_error_listener(mut self, errors: Arc<dyn ErrorListener>) -> Self {
        self.errors = errors;
        self
    }

    pub fn manager_id(&self) -> ManagerId {
        self.manager_id
    }

    pub fn registry(&self) -> &Arc<GrammarRegistry> {
        &self.registry
    }

    pub fn fitness(&self) -> &Arc<dyn FitnessComputer> {
        &self.fitness
    }

    pub fn errors(&self) -> &Arc<dyn ErrorListener> {
        &self.errors
    }

    pub fn report(&self, message: &str, cause: &SymregError) {
        self.errors.error(message, cause);
    }
}

impl std::fmt::Debug for ManagerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerContext")
            .field("manager_id", &self.manager_id)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
