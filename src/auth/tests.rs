//! Tests for the auth module

use super::jwt::{canonical_path, canonical_query, canonical_request, query_params, QueryParams};
use super::*;
use crate::types::Method;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use test_case::test_case;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn example_url() -> Url {
    Url::parse("https://example.com/api").unwrap()
}

async fn apply(auth: &Authenticator) -> reqwest::Request {
    let url = example_url();
    let req = reqwest::Client::new().get(url.clone());
    auth.apply(req, Method::GET, &url)
        .await
        .unwrap()
        .build()
        .unwrap()
}

fn query(pairs: &[(&str, &[&str])]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, vs)| ((*k).to_string(), vs.iter().map(|v| (*v).to_string()).collect()))
        .collect()
}

#[tokio::test]
async fn test_no_auth() {
    let built = apply(&Authenticator::new(AuthConfig::None)).await;
    assert!(built.headers().get("Authorization").is_none());
}

#[tokio::test]
async fn test_api_key_header() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Header,
        header_name: Some("X-PW-AccessToken".to_string()),
        query_param: None,
        prefix: None,
        value: "test-key-123".to_string(),
    });

    let built = apply(&auth).await;
    assert_eq!(
        built.headers().get("X-PW-AccessToken").unwrap(),
        "test-key-123"
    );
}

#[tokio::test]
async fn test_api_key_header_with_prefix() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Header,
        header_name: Some("Authorization".to_string()),
        query_param: None,
        prefix: Some("Basic ".to_string()),
        value: "a2V5Og==".to_string(),
    });

    let built = apply(&auth).await;
    assert_eq!(built.headers().get("Authorization").unwrap(), "Basic a2V5Og==");
}

#[tokio::test]
async fn test_api_key_query() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Query,
        header_name: None,
        query_param: Some("apikey".to_string()),
        prefix: None,
        value: "secret123".to_string(),
    });

    let built = apply(&auth).await;
    assert!(built.url().query().unwrap().contains("apikey=secret123"));
}

#[tokio::test]
async fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::Basic {
        username: "user".to_string(),
        password: "pass".to_string(),
    });

    let built = apply(&auth).await;
    let auth_header = built
        .headers()
        .get("Authorization")
        .unwrap()
        .to_str()
        .unwrap();
    let encoded = auth_header.strip_prefix("Basic ").unwrap();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), "user:pass");
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "my-bearer-token".to_string(),
    });

    let built = apply(&auth).await;
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer my-bearer-token"
    );
}

#[tokio::test]
async fn test_oauth2_client_credentials_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=my-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "oauth-token-123",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2ClientCredentials {
        token_url: format!("{}/oauth/token", mock_server.uri()),
        client_id: "my-client".to_string(),
        client_secret: "my-secret".to_string(),
        scopes: vec!["read".to_string()],
    });

    for _ in 0..3 {
        let built = apply(&auth).await;
        assert_eq!(
            built.headers().get("Authorization").unwrap(),
            "Bearer oauth-token-123"
        );
    }
}

#[tokio::test]
async fn test_clear_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2ClientCredentials {
        token_url: format!("{}/oauth/token", mock_server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        scopes: vec![],
    });

    apply(&auth).await;
    auth.clear_cache().await;
    apply(&auth).await;
}

#[tokio::test]
async fn test_oauth2_error_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client"
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2ClientCredentials {
        token_url: format!("{}/oauth/token", mock_server.uri()),
        client_id: "bad-client".to_string(),
        client_secret: "bad-secret".to_string(),
        scopes: vec![],
    });

    let url = example_url();
    let req = reqwest::Client::new().get(url.clone());
    let err = auth.apply(req, Method::GET, &url).await.unwrap_err();
    assert!(err.is(crate::error::ErrorKind::Unauthorized));
    assert!(err.to_string().contains("401"));
}

// ============================================================================
// Atlassian Connect
// ============================================================================

#[test]
fn test_query_string_hash_known_value() {
    let q = query(&[("action", &["create"]), ("id", &["123"])]);
    assert_eq!(
        canonical_request("post", "/api/resource", &q),
        "POST&/api/resource&action=create&id=123"
    );
    assert_eq!(
        create_query_string_hash("post", "/api/resource", &q),
        "48afa36ccd6c9e8988d19a31ee9d492d964e31b63115ef722d4c8ef94f6dc843"
    );
}

#[test]
fn test_query_string_hash_ignores_jwt_param() {
    let without = query(&[("action", &["create"]), ("id", &["123"])]);
    let with = query(&[("action", &["create"]), ("id", &["123"]), ("jwt", &["abc"])]);
    assert_eq!(
        create_query_string_hash("POST", "/api/resource", &without),
        create_query_string_hash("POST", "/api/resource", &with)
    );
}

#[test_case("/api/resource/", "/api/resource" ; "trailing slash stripped")]
#[test_case("api/resource", "/api/resource" ; "leading slash added")]
#[test_case("/", "/" ; "root kept")]
#[test_case("/a&b", "/a%26b" ; "ampersand escaped")]
fn test_canonical_path(input: &str, expected: &str) {
    assert_eq!(canonical_path(input), expected);
}

#[test]
fn test_canonical_query_sorting_and_encoding() {
    let q = query(&[
        ("zeta", &["b", "a"]),
        ("alpha", &["hello world"]),
        ("expand", &["names,schema"]),
    ]);
    assert_eq!(
        canonical_query(&q),
        "alpha=hello%20world&expand=names%2Cschema&zeta=a,b"
    );
}

#[test]
fn test_query_params_from_url() {
    let url = Url::parse("https://x.atlassian.net/rest/api/3/search?jql=a%20b&f=1&f=2").unwrap();
    let q = query_params(&url);
    assert_eq!(q["jql"], vec!["a b"]);
    assert_eq!(q["f"], vec!["1", "2"]);
}

#[tokio::test]
async fn test_atlassian_connect_header() {
    let auth = Authenticator::new(AuthConfig::AtlassianConnect {
        issuer: "my-addon".to_string(),
        shared_secret: "shh".to_string(),
        subject: None,
    });

    let url = Url::parse("https://acme.atlassian.net/rest/api/3/issue?expand=names").unwrap();
    let req = reqwest::Client::new().get(url.clone());
    let built = auth
        .apply(req, Method::GET, &url)
        .await
        .unwrap()
        .build()
        .unwrap();

    let header = built.headers().get("Authorization").unwrap().to_str().unwrap();
    let token = header.strip_prefix("JWT ").unwrap();

    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(b"shh"),
        &validation,
    )
    .unwrap()
    .claims;

    assert_eq!(claims["iss"], "my-addon");
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        180
    );
    assert_eq!(
        claims["qsh"],
        create_query_string_hash(
            "GET",
            "/rest/api/3/issue",
            &query(&[("expand", &["names"])])
        )
    );
    assert!(claims.get("sub").is_none());
}
