//! Parameter and module resolver
//!
//! Validates caller inputs against a catalog entry, renders the base and
//! module URL templates from caller metadata, and selects the module.

use crate::auth::{AuthConfig, Location};
use crate::catalog::{AuthKind, Catalog, ProviderEntry};
use crate::error::{Error, Result};
use crate::template::{self, TemplateVars};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Caller Inputs
// ============================================================================

/// Credentials supplied by the caller
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// A transport that already authenticates (OAuth2 token source, SigV4 signer)
    #[serde(skip)]
    Transport(reqwest::Client),
    /// OAuth2 access token sent as a bearer token
    Oauth2Token { access_token: String },
    /// Static API key
    ApiKey { key: String },
    /// HTTP basic credentials
    Basic { username: String, password: String },
    /// OAuth2 client credentials grant
    ClientCredentials {
        client_id: String,
        client_secret: String,
        #[serde(default)]
        scopes: Vec<String>,
    },
    /// Atlassian Connect installation secret
    AtlassianConnect {
        issuer: String,
        shared_secret: String,
        #[serde(default)]
        subject: Option<String>,
    },
}

impl Credentials {
    fn name(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Oauth2Token { .. } => "oauth2_token",
            Self::ApiKey { .. } => "api_key",
            Self::Basic { .. } => "basic",
            Self::ClientCredentials { .. } => "client_credentials",
            Self::AtlassianConnect { .. } => "atlassian_connect",
        }
    }

    /// Whether these credentials satisfy an auth kind
    fn satisfies(&self, kind: AuthKind) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Oauth2Token { .. } => matches!(
                kind,
                AuthKind::Oauth2AuthCode | AuthKind::Oauth2Pkce | AuthKind::Oauth2ClientCredentials
            ),
            Self::ClientCredentials { .. } => kind == AuthKind::Oauth2ClientCredentials,
            Self::ApiKey { .. } => kind == AuthKind::ApiKey,
            Self::Basic { .. } => kind == AuthKind::Basic,
            Self::AtlassianConnect { .. } => kind == AuthKind::Jwt,
        }
    }
}

/// Construction parameters for a connector
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectorParams {
    /// Workspace (tenant subdomain, instance name)
    #[serde(default)]
    pub workspace: Option<String>,
    /// Module id; the provider default when absent
    #[serde(default)]
    pub module: Option<String>,
    /// Provider-specific metadata (cloudId, region, identityStoreId, userEmail)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Credentials
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl ConnectorParams {
    /// Empty parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Select a module
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use an already-authenticated transport
    #[must_use]
    pub fn with_transport(self, client: reqwest::Client) -> Self {
        self.with_credentials(Credentials::Transport(client))
    }
}

// ============================================================================
// Auth Metadata
// ============================================================================

/// Metadata keys with typed accessors
pub mod keys {
    pub const WORKSPACE: &str = "workspace";
    pub const CLOUD_ID: &str = "cloudId";
    pub const REGION: &str = "region";
    pub const IDENTITY_STORE_ID: &str = "identityStoreId";
    pub const USER_EMAIL: &str = "userEmail";
}

/// Caller-owned metadata consulted by URL templates and handlers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMetadata {
    workspace: Option<String>,
    values: HashMap<String, String>,
}

impl AuthMetadata {
    /// Create from a workspace and a metadata map
    pub fn new(workspace: Option<String>, values: HashMap<String, String>) -> Self {
        Self {
            workspace: workspace.filter(|w| !w.is_empty()),
            values,
        }
    }

    /// Look up a non-empty value; `workspace` falls back to the workspace field
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = self.values.get(key).map(String::as_str).filter(|v| !v.is_empty());
        if key == keys::WORKSPACE {
            return value.or(self.workspace.as_deref());
        }
        value
    }

    /// Look up a value or fail with `MissingMetadata`
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::missing_metadata(key))
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Workspace
    pub fn workspace(&self) -> Option<&str> {
        self.get(keys::WORKSPACE)
    }

    /// Atlassian cloud id
    pub fn cloud_id(&self) -> Option<&str> {
        self.get(keys::CLOUD_ID)
    }

    /// AWS region
    pub fn region(&self) -> Option<&str> {
        self.get(keys::REGION)
    }

    /// AWS Identity Store id
    pub fn identity_store_id(&self) -> Option<&str> {
        self.get(keys::IDENTITY_STORE_ID)
    }

    /// Acting user's email (Copper)
    pub fn user_email(&self) -> Option<&str> {
        self.get(keys::USER_EMAIL)
    }
}

impl TemplateVars for AuthMetadata {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A provider entry resolved against caller parameters
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    /// Catalog entry
    pub entry: Arc<ProviderEntry>,
    /// Selected module id (empty when the provider declares none)
    pub module_id: String,
    /// Rendered provider base URL
    pub base_url: String,
    /// Rendered module URL (module base plus module path)
    pub module_url: String,
    /// Caller metadata
    pub metadata: AuthMetadata,
    /// Auth artifact for the HTTP client
    pub auth: AuthConfig,
    /// Caller-supplied transport, if any
    pub transport: Option<reqwest::Client>,
}

/// Resolve a provider by name against caller parameters
pub fn resolve(catalog: &Catalog, provider: &str, params: ConnectorParams) -> Result<ResolvedProvider> {
    let entry = catalog.get(provider)?;
    resolve_entry(entry, params)
}

/// Resolve a catalog entry against caller parameters
pub fn resolve_entry(entry: Arc<ProviderEntry>, params: ConnectorParams) -> Result<ResolvedProvider> {
    let ConnectorParams {
        workspace,
        module,
        metadata,
        credentials,
    } = params;
    let metadata = AuthMetadata::new(workspace, metadata);

    if entry.explicit_workspace_required() && metadata.workspace().is_none() {
        return Err(Error::missing_metadata(keys::WORKSPACE));
    }

    let credentials = credentials.ok_or_else(|| Error::MissingCredentials {
        auth_kind: entry.auth_kind.to_string(),
    })?;
    if !credentials.satisfies(entry.auth_kind) {
        return Err(Error::auth(format!(
            "{} credentials cannot be used with auth kind '{}'",
            credentials.name(),
            entry.auth_kind
        )));
    }

    let (module_id, module) = match module.as_deref().filter(|m| !m.is_empty()) {
        Some(id) => {
            let (id, info) = entry.module(Some(id)).ok_or_else(|| {
                Error::config(format!("provider '{}' has no module '{id}'", entry.name))
            })?;
            (id.to_string(), Some(info))
        }
        None => match entry.module(None) {
            Some((id, info)) => (id.to_string(), Some(info)),
            None => (String::new(), None),
        },
    };

    let module_base = module
        .and_then(|m| m.base_url.as_deref())
        .unwrap_or(&entry.base_url);
    let module_path = module.map_or("", |m| m.path.as_str());

    let [base_url, module_base, module_path] =
        render_all([entry.base_url.as_str(), module_base, module_path], &metadata)?;
    let module_url = format!("{}{}", module_base.trim_end_matches('/'), module_path);

    let (auth, transport) = auth_config(&entry, credentials);

    debug!(
        provider = %entry.name,
        module = %module_id,
        "Resolved provider"
    );

    Ok(ResolvedProvider {
        entry,
        module_id,
        base_url,
        module_url,
        metadata,
        auth,
        transport,
    })
}

/// Render several templates, reporting every missing key at once
fn render_all<const N: usize>(templates: [&str; N], vars: &AuthMetadata) -> Result<[String; N]> {
    let mut missing: Vec<String> = Vec::new();
    let mut rendered: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, template) in rendered.iter_mut().zip(templates) {
        match template::render(template, vars) {
            Ok(s) => *slot = s,
            Err(Error::MissingMetadata { keys }) => {
                for key in keys {
                    if !missing.contains(&key) {
                        missing.push(key);
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }

    if missing.is_empty() {
        Ok(rendered)
    } else {
        Err(Error::MissingMetadata { keys: missing })
    }
}

fn auth_config(entry: &ProviderEntry, credentials: Credentials) -> (AuthConfig, Option<reqwest::Client>) {
    match credentials {
        Credentials::Transport(client) => (AuthConfig::None, Some(client)),
        Credentials::Oauth2Token { access_token } => (AuthConfig::Bearer { token: access_token }, None),
        Credentials::ApiKey { key } => {
            let options = entry.api_key_options.as_ref();
            let query_param = options.and_then(|o| o.query_param.clone());
            let auth = AuthConfig::ApiKey {
                location: if query_param.is_some() {
                    Location::Query
                } else {
                    Location::Header
                },
                header_name: options.map(|o| o.header_name.clone()),
                query_param,
                prefix: options.map(|o| o.value_prefix.clone()).filter(|p| !p.is_empty()),
                value: key,
            };
            (auth, None)
        }
        Credentials::Basic { username, password } => (AuthConfig::Basic { username, password }, None),
        Credentials::ClientCredentials {
            client_id,
            client_secret,
            scopes,
        } => {
            let token_url = entry
                .oauth2_options
                .as_ref()
                .map(|o| o.token_url.clone())
                .unwrap_or_default();
            (
                AuthConfig::Oauth2ClientCredentials {
                    token_url,
                    client_id,
                    client_secret,
                    scopes,
                },
                None,
            )
        }
        Credentials::AtlassianConnect {
            issuer,
            shared_secret,
            subject,
        } => (
            AuthConfig::AtlassianConnect {
                issuer,
                shared_secret,
                subject,
            },
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn token() -> Credentials {
        Credentials::Oauth2Token {
            access_token: "t".to_string(),
        }
    }

    #[test]
    fn test_unknown_provider_is_bad_request() {
        let err = resolve(&catalog(), "nope", ConnectorParams::new()).unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));
    }

    #[test]
    fn test_atlassian_module_url() {
        let params = ConnectorParams::new()
            .with_workspace("test-workspace")
            .with_metadata("cloudId", "ebc887b2")
            .with_credentials(token());
        let resolved = resolve(&catalog(), "atlassian", params).unwrap();
        assert_eq!(resolved.base_url, "https://api.atlassian.com");
        assert_eq!(resolved.module_id, "jira");
        assert_eq!(
            resolved.module_url,
            "https://api.atlassian.com/ex/jira/ebc887b2/rest/api/3"
        );
        assert!(matches!(resolved.auth, AuthConfig::Bearer { .. }));
    }

    #[test]
    fn test_missing_metadata_names_every_key() {
        let params = ConnectorParams::new().with_transport(reqwest::Client::new());
        let err = resolve(&catalog(), "aws", params).unwrap_err();
        match err {
            Error::MissingMetadata { keys } => assert_eq!(keys, vec!["region"]),
            other => panic!("unexpected error: {other:?}"),
        }

        let params = ConnectorParams::new()
            .with_workspace("acme")
            .with_credentials(token());
        let err = resolve(&catalog(), "atlassian", params).unwrap_err();
        assert!(err.is(ErrorKind::MissingMetadata));
        assert!(err.to_string().contains("cloudId"));
    }

    #[test]
    fn test_malformed_template_is_not_swallowed() {
        let entry = ProviderEntry::from_yaml(
            r#"
name: broken
display_name: Broken
auth_kind: api_key
base_url: https://{{workspace.example.com
api_key_options:
  header_name: X-Key
"#,
        )
        .unwrap();
        let params = ConnectorParams::new()
            .with_workspace("acme")
            .with_credentials(Credentials::ApiKey { key: "k".into() });

        let err = resolve_entry(Arc::new(entry), params).unwrap_err();
        assert!(err.is(ErrorKind::Config));
        assert!(err.to_string().contains("malformed placeholder"));
    }

    #[test]
    fn test_explicit_workspace_required() {
        let params = ConnectorParams::new()
            .with_metadata("cloudId", "x")
            .with_credentials(token());
        let err = resolve(&catalog(), "atlassian", params).unwrap_err();
        assert!(err.is(ErrorKind::MissingMetadata));
        assert!(err.to_string().contains("workspace"));
    }

    #[test]
    fn test_workspace_template() {
        let params = ConnectorParams::new()
            .with_workspace("acme")
            .with_credentials(token());
        let resolved = resolve(&catalog(), "salesforce", params).unwrap();
        assert_eq!(resolved.base_url, "https://acme.my.salesforce.com");
        assert_eq!(resolved.module_url, "https://acme.my.salesforce.com");
        assert_eq!(resolved.module_id, "");
    }

    #[test]
    fn test_aws_module_base_url() {
        let params = ConnectorParams::new()
            .with_metadata("region", "us-east-2")
            .with_metadata("identityStoreId", "d-123")
            .with_transport(reqwest::Client::new());
        let resolved = resolve(&catalog(), "aws", params).unwrap();
        assert_eq!(resolved.module_url, "https://identitystore.us-east-2.amazonaws.com");
        assert_eq!(resolved.metadata.identity_store_id(), Some("d-123"));
        assert!(resolved.transport.is_some());
    }

    #[test]
    fn test_module_selection() {
        let params = ConnectorParams::new().with_credentials(token());
        let v2 = resolve(&catalog(), "keap", params.clone()).unwrap();
        assert_eq!(v2.module_url, "https://api.infusionsoft.com/crm/rest/v2");

        let v1 = resolve(&catalog(), "keap", params.clone().with_module("v1")).unwrap();
        assert_eq!(v1.module_url, "https://api.infusionsoft.com/crm/rest/v1");

        let err = resolve(&catalog(), "keap", params.with_module("v7")).unwrap_err();
        assert!(err.is(ErrorKind::Config));
    }

    #[test]
    fn test_credentials_validated_against_auth_kind() {
        let err = resolve(&catalog(), "copper", ConnectorParams::new()).unwrap_err();
        assert!(matches!(err, Error::MissingCredentials { .. }));

        let err = resolve(&catalog(), "copper", ConnectorParams::new().with_credentials(token()))
            .unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));
    }

    #[test]
    fn test_api_key_placement_from_catalog() {
        let params = ConnectorParams::new().with_credentials(Credentials::ApiKey {
            key: "k".to_string(),
        });
        let resolved = resolve(&catalog(), "recurly", params).unwrap();
        match resolved.auth {
            AuthConfig::ApiKey {
                location,
                header_name,
                prefix,
                value,
                ..
            } => {
                assert_eq!(location, Location::Header);
                assert_eq!(header_name.as_deref(), Some("Authorization"));
                assert_eq!(prefix.as_deref(), Some("Basic "));
                assert_eq!(value, "k");
            }
            other => panic!("unexpected auth: {other:?}"),
        }
    }

    #[test]
    fn test_params_from_json() {
        let params: ConnectorParams = serde_json::from_value(serde_json::json!({
            "workspace": "acme",
            "metadata": {"cloudId": "abc"},
            "credentials": {"type": "oauth2_token", "access_token": "tok"}
        }))
        .unwrap();
        assert_eq!(params.workspace.as_deref(), Some("acme"));
        assert!(matches!(params.credentials, Some(Credentials::Oauth2Token { .. })));
    }

    #[test]
    fn test_metadata_workspace_fallback() {
        let meta = AuthMetadata::new(Some("acme".into()), HashMap::new());
        assert_eq!(meta.workspace(), Some("acme"));
        assert_eq!(meta.lookup("workspace"), Some("acme"));
        assert!(meta.require("userEmail").unwrap_err().is(ErrorKind::MissingMetadata));
    }
}
