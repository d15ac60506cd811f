//! Atlassian Connect JWT
//!
//! Every request carries an HS256 token whose `qsh` claim is the SHA-256 of
//! the canonical `METHOD&PATH&QUERY` string. The canonical query has its own
//! RFC 3986 encoding and sort rules, so it does not go through the URL builder.

use crate::error::{Error, Result};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

/// Token lifetime in seconds
pub const CONNECT_TOKEN_LIFETIME_SECS: i64 = 180;

/// Query parameters grouped by name
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Canonical path: `&` escaped, leading `/` ensured, trailing `/` dropped
pub fn canonical_path(path: &str) -> String {
    let mut path = path.replace('&', "%26");
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// Canonical query: `name=v1,v2` entries sorted by name, values sorted,
/// the `jwt` parameter excluded
pub fn canonical_query(query: &QueryParams) -> String {
    let mut entries: Vec<(String, String)> = query
        .iter()
        .filter(|(name, _)| name.as_str() != "jwt")
        .map(|(name, values)| {
            let mut encoded: Vec<String> = values
                .iter()
                .map(|v| urlencoding::encode(v).into_owned())
                .collect();
            encoded.sort();
            (urlencoding::encode(name).into_owned(), encoded.join(","))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    entries
        .into_iter()
        .map(|(name, values)| format!("{name}={values}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical request string
pub fn canonical_request(method: &str, path: &str, query: &QueryParams) -> String {
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        canonical_path(path),
        canonical_query(query)
    )
}

/// Query string hash (`qsh` claim)
pub fn create_query_string_hash(method: &str, path: &str, query: &QueryParams) -> String {
    let digest = Sha256::digest(canonical_request(method, path, query).as_bytes());
    hex::encode(digest)
}

/// Group a URL's decoded query pairs by name
pub fn query_params(url: &Url) -> QueryParams {
    let mut params = QueryParams::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

#[derive(Debug, Serialize)]
struct ConnectClaims<'a> {
    iss: &'a str,
    iat: i64,
    exp: i64,
    qsh: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

/// Sign a Connect token for one request
pub fn create_connect_jwt(
    issuer: &str,
    shared_secret: &str,
    subject: Option<&str>,
    method: &str,
    url: &Url,
) -> Result<String> {
    let iat = Utc::now().timestamp();
    let claims = ConnectClaims {
        iss: issuer,
        iat,
        exp: iat + CONNECT_TOKEN_LIFETIME_SECS,
        qsh: create_query_string_hash(method, url.path(), &query_params(url)),
        sub: subject,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(shared_secret.as_bytes()),
    )
    .map_err(|e| Error::JwtGeneration {
        message: format!("Failed to encode JWT: {e}"),
    })
}
