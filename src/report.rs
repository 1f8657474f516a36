use crate::error::SymregError;
use crate::grammar::GrammarRegistry;
use crate::types::{Candidate, Individual, ManagerId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Outcome of one manager run, as written after `stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub manager_id: ManagerId,
    pub started_at: String,
    pub finished_at: String,
    pub target_fitness: f64,
    pub target_reached: bool,
    /// Grammar text of each dof, in dof order
    #[serde(default)]
    pub grammars: Vec<String>,
    pub best: Vec<Individual>,
    pub summary: String,
}

impl RunReport {
    pub fn new(
        manager_id: ManagerId,
        started_at: chrono::DateTime<chrono::Utc>,
        target_fitness: f64,
        mut best: Vec<Individual>,
    ) -> Self {
        best.sort_by_key(|ind| ind.id);
        let target_reached = best.iter().any(|ind| ind.fitness().is_target(target_fitness));

        let summary = match best.first() {
            Some(first) => format!(
                "Found {} fit individuals with fitness {}{}",
                best.len(),
                first.fitness,
                if target_reached { " (target reached)" } else { "" }
            ),
            None => "No individuals were observed".to_string(),
        };

        Self {
            manager_id,
            started_at: started_at.to_rfc3339(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            target_fitness,
            target_reached,
            grammars: Vec::new(),
            best,
            summary,
        }
    }

    /// Record the grammars the manager bred with
    pub fn with_grammars(mut self, registry: &GrammarRegistry) -> Self {
        self.grammars = (0..registry.dof_count(self.manager_id))
            .filter_map(|dof| registry.get(self.manager_id, dof).ok())
            .map(|grammar| grammar.text.clone())
            .collect();
        self
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SymregError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
