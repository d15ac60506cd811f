//! Catalog types
//!
//! Declarative provider entries parsed from YAML.

use crate::error::{Error, Result};
use crate::template;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Auth
// ============================================================================

/// Authentication scheme a provider expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// OAuth2 authorization code grant
    Oauth2AuthCode,
    /// OAuth2 authorization code grant with PKCE
    Oauth2Pkce,
    /// OAuth2 client credentials grant
    Oauth2ClientCredentials,
    /// Static API key placed in a header or query parameter
    ApiKey,
    /// HTTP basic auth
    Basic,
    /// Per-request signed JWT (Atlassian Connect)
    Jwt,
    /// Signing done by a caller-supplied transport (e.g. AWS SigV4)
    Custom,
}

impl AuthKind {
    /// Whether this kind is one of the OAuth2 grants
    pub fn is_oauth2(self) -> bool {
        matches!(
            self,
            Self::Oauth2AuthCode | Self::Oauth2Pkce | Self::Oauth2ClientCredentials
        )
    }

    /// Name as written in catalog files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oauth2AuthCode => "oauth2_auth_code",
            Self::Oauth2Pkce => "oauth2_pkce",
            Self::Oauth2ClientCredentials => "oauth2_client_credentials",
            Self::ApiKey => "api_key",
            Self::Basic => "basic",
            Self::Jwt => "jwt",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to find interesting values in an OAuth2 token response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TokenMetadataFields {
    /// Field listing the granted scopes
    #[serde(default)]
    pub scopes_field: Option<String>,
    /// Field carrying the workspace reference (e.g. `instance_url`)
    #[serde(default)]
    pub workspace_ref_field: Option<String>,
    /// Field identifying the consumer (e.g. `owner_id`)
    #[serde(default)]
    pub consumer_ref_field: Option<String>,
}

/// OAuth2 endpoints and flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Oauth2Options {
    /// Authorization endpoint
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Token endpoint
    pub token_url: String,
    /// Caller must request scopes explicitly
    #[serde(default)]
    pub explicit_scopes_required: bool,
    /// Caller must provide a workspace
    #[serde(default)]
    pub explicit_workspace_required: bool,
    /// Token response field names
    #[serde(default)]
    pub token_metadata_fields: TokenMetadataFields,
}

/// API key placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApiKeyOptions {
    /// Header carrying the key
    #[serde(default = "default_api_key_header")]
    pub header_name: String,
    /// Prefix placed before the key value (e.g. `Bearer `)
    #[serde(default)]
    pub value_prefix: String,
    /// Send the key as this query parameter instead of a header
    #[serde(default)]
    pub query_param: Option<String>,
    /// Caller must provide a workspace
    #[serde(default)]
    pub explicit_workspace_required: bool,
}

fn default_api_key_header() -> String {
    "Authorization".to_string()
}

// ============================================================================
// Capabilities
// ============================================================================

/// A single capability a provider may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Read,
    Write,
    Delete,
    Subscribe,
    Proxy,
    BulkWrite,
}

/// Capability matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Support {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub subscribe: bool,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub bulk_write: bool,
}

impl Support {
    /// Check one capability
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.read,
            Capability::Write => self.write,
            Capability::Delete => self.delete,
            Capability::Subscribe => self.subscribe,
            Capability::Proxy => self.proxy,
            Capability::BulkWrite => self.bulk_write,
        }
    }
}

// ============================================================================
// Modules
// ============================================================================

/// A provider sub-product with its own URL family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModuleInfo {
    /// Overrides the provider base URL (may contain placeholders)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Path appended to the base URL (may contain placeholders)
    #[serde(default)]
    pub path: String,
    /// API version label
    #[serde(default)]
    pub version: String,
}

// ============================================================================
// Provider Entry
// ============================================================================

/// Immutable catalog entry for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderEntry {
    /// Lookup key (e.g. `salesloft`)
    pub name: String,
    /// Human-readable name
    #[serde(default)]
    pub display_name: String,
    /// Authentication scheme
    pub auth_kind: AuthKind,
    /// Base URL template
    pub base_url: String,
    /// OAuth2 settings, present for OAuth2 auth kinds
    #[serde(default)]
    pub oauth2_options: Option<Oauth2Options>,
    /// API key settings, present for the api_key auth kind
    #[serde(default)]
    pub api_key_options: Option<ApiKeyOptions>,
    /// Capability matrix
    #[serde(default)]
    pub support: Support,
    /// Modules keyed by id
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleInfo>,
    /// Module used when the caller names none
    #[serde(default)]
    pub default_module: Option<String>,
    /// Free-form provider options
    #[serde(default)]
    pub provider_opts: BTreeMap<String, String>,
}

impl ProviderEntry {
    /// Parse an entry from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Whether the provider supports a capability
    pub fn supports(&self, capability: Capability) -> bool {
        self.support.has(capability)
    }

    /// Whether the caller must supply a workspace
    pub fn explicit_workspace_required(&self) -> bool {
        self.oauth2_options
            .as_ref()
            .is_some_and(|o| o.explicit_workspace_required)
            || self
                .api_key_options
                .as_ref()
                .is_some_and(|o| o.explicit_workspace_required)
    }

    /// Look up a module by id, or the default module when `id` is empty
    pub fn module(&self, id: Option<&str>) -> Option<(&str, &ModuleInfo)> {
        let id = id.filter(|s| !s.is_empty()).or(self.default_module.as_deref())?;
        self.modules.get_key_value(id).map(|(k, v)| (k.as_str(), v))
    }

    /// Check structural invariants of the entry
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("provider entry has no name"));
        }

        let wants_oauth2 = self.auth_kind.is_oauth2();
        let wants_api_key = self.auth_kind == AuthKind::ApiKey;
        if wants_oauth2 != self.oauth2_options.is_some() {
            return Err(Error::config(format!(
                "provider '{}': oauth2_options must be set exactly when auth_kind is OAuth2",
                self.name
            )));
        }
        if wants_api_key != self.api_key_options.is_some() {
            return Err(Error::config(format!(
                "provider '{}': api_key_options must be set exactly when auth_kind is api_key",
                self.name
            )));
        }

        template::validate(&self.base_url)?;
        for module in self.modules.values() {
            if let Some(base) = &module.base_url {
                template::validate(base)?;
            }
            template::validate(&module.path)?;
        }

        if let Some(default) = &self.default_module {
            if !self.modules.contains_key(default) {
                return Err(Error::config(format!(
                    "provider '{}': default module '{default}' is not declared",
                    self.name
                )));
            }
        }

        Ok(())
    }
}
