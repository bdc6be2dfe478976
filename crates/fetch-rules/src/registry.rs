//! Registry of available ecosystem rules

use crate::bundler::BundlerRules;
use crate::pip::PipRules;
use crate::rules::ManifestRules;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps ecosystem ids to their rules.
#[derive(Clone, Default)]
pub struct RulesRegistry {
    rules: HashMap<String, Arc<dyn ManifestRules>>,
}

impl RulesRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in ecosystem registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BundlerRules::new()));
        registry.register(Arc::new(PipRules::new()));
        registry
    }

    /// Register rules under their own id, replacing any previous entry.
    pub fn register(&mut self, rules: Arc<dyn ManifestRules>) {
        self.rules.insert(rules.id().to_string(), rules);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ManifestRules>> {
        self.rules.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RulesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesRegistry")
            .field("rules", &self.list())
            .finish()
    }
}
