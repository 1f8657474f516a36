use crate::error::{Result, SymregError};
use crate::types::ManagerId;
use std::collections::HashMap;

/// Grammar descriptor of one dof: variable count plus the rule text handed
/// to the breeding engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DofGrammar {
    pub num_vars: usize,
    pub text: String,
}

impl DofGrammar {
    pub fn new(num_vars: usize, text: impl Into<String>) -> Self {
        Self {
            num_vars,
            text: text.into(),
        }
    }
}

/// Grammars keyed by manager id and dof index.
///
/// The same grammar may be registered for several managers and dofs.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: HashMap<(ManagerId, usize), DofGrammar>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the grammar of a manager's dof
    pub fn register(&mut self, manager_id: ManagerId, dof: usize, grammar: DofGrammar) {
        log::debug!(
            "Registering grammar for manager {} dof {} ({} vars)",
            manager_id,
            dof,
            grammar.num_vars
        );
        self.grammars.insert((manager_id, dof), grammar);
    }

    pub fn get(&self, manager_id: ManagerId, dof: usize) -> Result<&DofGrammar> {
        self.grammars
            .get(&(manager_id, dof))
            .ok_or(SymregError::MissingGrammarEntry { manager_id, dof })
    }

    pub fn num_vars(&self, manager_id: ManagerId, dof: usize) -> Result<usize> {
        self.get(manager_id, dof).map(|g| g.num_vars)
    }

    /// Number of consecutive dofs registered for the manager, starting at 0
    pub fn dof_count(&self, manager_id: ManagerId) -> usize {
        (0..)
            .take_while(|dof| self.grammars.contains_key(&(manager_id, *dof)))
            .count()
    }

    pub fn clear(&mut self) {
        self.grammars.clear();
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}
