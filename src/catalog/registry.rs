//! Catalog builder and immutable registry

use super::types::ProviderEntry;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Provider YAML documents embedded in the library
pub const BUILTIN_PROVIDERS: &[(&str, &str)] = &[
    // Collaboration
    ("atlassian", include_str!("../../providers/atlassian.yaml")),
    (
        "atlassian-connect",
        include_str!("../../providers/atlassian-connect.yaml"),
    ),
    // Cloud Infrastructure
    ("aws", include_str!("../../providers/aws.yaml")),
    // CRM & Sales
    ("copper", include_str!("../../providers/copper.yaml")),
    ("keap", include_str!("../../providers/keap.yaml")),
    ("salesforce", include_str!("../../providers/salesforce.yaml")),
    ("salesloft", include_str!("../../providers/salesloft.yaml")),
    // Marketing
    (
        "constantcontact",
        include_str!("../../providers/constantcontact.yaml"),
    ),
    // Payment & Billing
    ("recurly", include_str!("../../providers/recurly.yaml")),
];

/// Collects provider entries once at startup
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<ProviderEntry>,
    errors: Vec<Error>,
}

impl CatalogBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every embedded provider
    #[must_use]
    pub fn with_builtin_providers(mut self) -> Self {
        for (_, yaml) in BUILTIN_PROVIDERS {
            self = self.register_yaml(yaml);
        }
        self
    }

    /// Register a parsed entry
    #[must_use]
    pub fn register(mut self, entry: ProviderEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Register an entry from a YAML document; parse errors surface from `build`
    #[must_use]
    pub fn register_yaml(mut self, yaml: &str) -> Self {
        match ProviderEntry::from_yaml(yaml) {
            Ok(entry) => self.entries.push(entry),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Validate every entry and freeze the registry
    pub fn build(self) -> Result<Catalog> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let mut providers = BTreeMap::new();
        for entry in self.entries {
            entry.validate()?;
            if providers.contains_key(&entry.name) {
                return Err(Error::config(format!(
                    "provider '{}' registered twice",
                    entry.name
                )));
            }
            debug!(provider = %entry.name, auth = %entry.auth_kind, "Registered provider");
            providers.insert(entry.name.clone(), Arc::new(entry));
        }

        Ok(Catalog { providers })
    }
}

/// Immutable provider registry, shared read-only after startup
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    providers: BTreeMap<String, Arc<ProviderEntry>>,
}

impl Catalog {
    /// Start building a catalog
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Catalog holding every embedded provider
    pub fn builtin() -> Result<Self> {
        CatalogBuilder::new().with_builtin_providers().build()
    }

    /// Look up a provider by name
    pub fn get(&self, name: &str) -> Result<Arc<ProviderEntry>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider {
                provider: name.to_string(),
            })
    }

    /// Check if a provider is registered
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names in sorted order
    pub fn providers(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
