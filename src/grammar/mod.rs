pub mod registry;

pub use registry::{DofGrammar, GrammarRegistry};
