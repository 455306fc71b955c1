//! Registry for managing status checkers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    ConsultantChecker, GovernmentChecker, PravoChecker, SourceError, StatusChecker,
};
use crate::config::Config;
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// How a checker queries its source
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CheckerCapabilities: u32 {
        /// Sends one search request per citation
        const QUERY_SEARCH = 1 << 0;
        /// Scans a fixed listing page for a matching entry
        const LISTING_SCAN = 1 << 1;
        /// Includes the citation date in its query
        const DATE_AWARE = 1 << 2;
    }
}

/// Registry of available status checkers, keyed by id
#[derive(Debug, Clone, Default)]
pub struct CheckerRegistry {
    checkers: BTreeMap<String, Arc<dyn StatusChecker>>,
}

impl CheckerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in checker sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::from_config(&config.http)?);
        let sources = &config.sources;

        let mut registry = Self::new();
        registry.register(Arc::new(PravoChecker::with_base_url(
            Arc::clone(&client),
            &sources.pravo_base_url,
        )?));
        registry.register(Arc::new(GovernmentChecker::with_base_url(
            Arc::clone(&client),
            &sources.government_base_url,
        )?));
        registry.register(Arc::new(ConsultantChecker::with_base_url(
            client,
            &sources.consultant_base_url,
        )?));

        Ok(registry)
    }

    /// Register a checker, replacing any checker with the same id
    pub fn register(&mut self, checker: Arc<dyn StatusChecker>) {
        self.checkers.insert(checker.id().to_string(), checker);
    }

    /// Get a checker by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn StatusChecker>> {
        self.checkers.get(id)
    }

    /// Get a checker by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn StatusChecker>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::InvalidRequest(format!("Checker '{}' not found", id)))
    }

    /// All registered checkers, ordered by id
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn StatusChecker>> {
        self.checkers.values()
    }

    /// All checker IDs, sorted
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.checkers.keys().map(|s| s.as_str())
    }

    /// Checkers that have a specific capability
    pub fn with_capability(&self, capability: CheckerCapabilities) -> Vec<&Arc<dyn StatusChecker>> {
        self.all()
            .filter(|c| c.capabilities().contains(capability))
            .collect()
    }

    /// Check if a checker exists
    pub fn has(&self, id: &str) -> bool {
        self.checkers.contains_key(id)
    }

    /// Number of registered checkers
    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}
