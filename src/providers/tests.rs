//! Tests for provider handler sets, driven through the connector pipeline

use super::*;
use crate::catalog::Catalog;
use crate::connector::{
    new_connector, Connector, DeleteParams, ReadParams, RestConnector, VerifyParams,
    WebhookRequest, WriteParams,
};
use crate::error::ErrorKind;
use crate::http::{HttpClient, HttpClientConfig};
use crate::resolver::{ConnectorParams, Credentials};
use crate::schema::ValueType;
use crate::subscription::{ObjectEvents, SubscribeParams, SubscriptionStatus};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth() -> Credentials {
    Credentials::Oauth2Token {
        access_token: "token".into(),
    }
}

fn api_key() -> Credentials {
    Credentials::ApiKey { key: "key".into() }
}

fn connect(provider: &str, params: ConnectorParams, server: &MockServer) -> RestConnector {
    let catalog = Catalog::builtin().unwrap();
    new_connector(&catalog, provider, params)
        .unwrap()
        .with_base_url(&server.uri())
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_registry_dispatch() {
    let catalog = Catalog::builtin().unwrap();
    let params = ConnectorParams::new()
        .with_workspace("acme")
        .with_credentials(oauth());
    let connector = new_connector(&catalog, "salesforce", params).unwrap();
    let handlers = connector.handlers();
    assert!(handlers.read.is_none());
    assert!(handlers.subscriptions.is_none());

    let salesloft = connect_static("salesloft", ConnectorParams::new().with_credentials(oauth()));
    assert!(salesloft.handlers().subscriptions.is_some());
    assert!(salesloft.handlers().custom_fields.is_some());
}

fn connect_static(provider: &str, params: ConnectorParams) -> RestConnector {
    new_connector(&Catalog::builtin().unwrap(), provider, params).unwrap()
}

#[test]
fn test_connect_shares_jira_handlers() {
    let connector = connect_static(
        "atlassian-connect",
        ConnectorParams::new()
            .with_workspace("acme")
            .with_credentials(Credentials::AtlassianConnect {
                issuer: "app".into(),
                shared_secret: "s".into(),
                subject: None,
            }),
    );
    assert_eq!(connector.context().module_url, "https://acme.atlassian.net/rest/api/3");
    assert!(connector.handlers().read.as_ref().unwrap().supports("issues"));
}

// ============================================================================
// Atlassian
// ============================================================================

fn jira_params() -> ConnectorParams {
    ConnectorParams::new()
        .with_workspace("acme")
        .with_metadata("cloudId", "c-1")
        .with_credentials(oauth())
}

#[tokio::test]
async fn test_jira_custom_fields_collapsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ex/jira/c-1/rest/api/3/search/jql"))
        .and(body_partial_json(json!({"fields": ["*all"], "maxResults": 200})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{"id": "10", "fields": {"summary": "Broken", "customfield_10010": "Core"}}],
            "nextPageToken": "next-1",
            "isLast": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ex/jira/c-1/rest/api/3/field"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "summary", "name": "Summary", "custom": false},
            {"id": "customfield_10010", "name": "Team", "custom": true, "schema": {"type": "string"}}
        ])))
        .mount(&server)
        .await;

    let connector = connect("atlassian", jira_params(), &server);
    let result = connector
        .read(ReadParams::new("issues", ["id", "custom_field_team"]))
        .await
        .unwrap();

    assert_eq!(result.next_page, "next-1");
    assert_eq!(
        serde_json::Value::Object(result.data[0].fields.clone()),
        json!({"id": "10", "custom_field_team": "Core"})
    );
    assert_eq!(result.data[0].id.as_deref(), Some("10"));
}

#[tokio::test]
async fn test_jira_error_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ex/jira/c-1/rest/api/3/issue"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorMessages": ["Issue type is required"],
            "errors": {"summary": "required"}
        })))
        .mount(&server)
        .await;

    let connector = connect("atlassian", jira_params(), &server);
    let err = connector
        .write(WriteParams::create("issues", json!({"fields": {}})))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::BadRequest));
    assert!(err.to_string().contains("Issue type is required; summary:required"));
}

#[tokio::test]
async fn test_jira_update_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/ex/jira/c-1/rest/api/3/issue/10"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/ex/jira/c-1/rest/api/3/issue/10"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let connector = connect("atlassian", jira_params(), &server);
    let written = connector
        .write(WriteParams::update("issues", "10", json!({"fields": {"summary": "x"}})))
        .await
        .unwrap();
    assert!(written.success);
    assert_eq!(written.record_id, None);

    let deleted = connector.delete(DeleteParams::new("issues", "10")).await.unwrap();
    assert!(deleted.success);
}

#[tokio::test]
async fn test_fetch_cloud_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/token/accessible-resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c-0", "name": "other", "url": "https://other.atlassian.net"},
            {"id": "c-9", "name": "Acme", "url": "https://acme.atlassian.net"}
        ])))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let id = atlassian::fetch_cloud_id(&client, &server.uri(), "acme").await.unwrap();
    assert_eq!(id, "c-9");

    let err = atlassian::fetch_cloud_id(&client, &server.uri(), "missing")
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::MissingMetadata));
}

// ============================================================================
// AWS
// ============================================================================

fn aws_params() -> ConnectorParams {
    ConnectorParams::new()
        .with_metadata("region", "us-east-1")
        .with_metadata("identityStoreId", "store-1")
        .with_transport(reqwest::Client::new())
}

#[tokio::test]
async fn test_aws_update_operations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "AWSIdentityStore.UpdateUser"))
        .and(header("Content-Type", "application/x-amz-json-1.1"))
        .and(body_json(json!({
            "IdentityStoreId": "store-1",
            "UserId": "u-1",
            "Operations": [{"AttributePath": "DisplayName", "AttributeValue": "Ann"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let connector = connect("aws", aws_params(), &server);
    let result = connector
        .write(WriteParams::update("Users", "u-1", json!({"DisplayName": "Ann"})))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.record_id.as_deref(), Some("u-1"));
}

#[tokio::test]
async fn test_aws_error_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "AWSIdentityStore.DeleteGroup"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.identitystore#ResourceNotFoundException",
            "message": "Group not found"
        })))
        .mount(&server)
        .await;

    let connector = connect("aws", aws_params(), &server);
    let err = connector
        .delete(DeleteParams::new("Groups", "g-1"))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("ResourceNotFoundException: Group not found"));
}

#[tokio::test]
async fn test_aws_requires_identity_store() {
    let server = MockServer::start().await;
    let params = ConnectorParams::new()
        .with_metadata("region", "us-east-1")
        .with_transport(reqwest::Client::new());
    let connector = connect("aws", params, &server);

    let err = connector
        .read(ReadParams::new("Groups", ["GroupId"]))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::MissingMetadata));
}

// ============================================================================
// Copper
// ============================================================================

fn copper_params() -> ConnectorParams {
    ConnectorParams::new()
        .with_metadata("userEmail", "me@acme.test")
        .with_credentials(api_key())
}

#[tokio::test]
async fn test_copper_search_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/developer_api/v1/people/search"))
        .and(header("X-PW-UserEmail", "me@acme.test"))
        .and(header("X-PW-Application", "developer_api"))
        .and(body_partial_json(json!({
            "page_size": 2,
            "page_number": 1,
            "minimum_modified_date": 1_704_067_200
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])),
        )
        .mount(&server)
        .await;

    let connector = connect("copper", copper_params(), &server);
    let params = ReadParams::new("people", ["id"])
        .since(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .page_size(2);
    let result = connector.read(params).await.unwrap();

    assert_eq!(result.rows, 2);
    assert_eq!(result.next_page, "2");
    assert!(!result.done);
}

#[tokio::test]
async fn test_copper_until_without_since_sends_no_bounds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/developer_api/v1/companies/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connect("copper", copper_params(), &server);
    let result = connector
        .read(
            ReadParams::new("companies", ["id"])
                .until(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        )
        .await
        .unwrap();
    assert!(result.done);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["page_number"], 1);
    assert!(body.get("maximum_modified_date").is_none());
    assert!(body.get("minimum_modified_date").is_none());
}

#[tokio::test]
async fn test_page_counter_rejects_malformed_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let copper = connect("copper", copper_params(), &server);
    let err = copper
        .read(ReadParams::new("people", ["id"]).next_page("page-two"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::FailedToUnmarshalBody));

    let salesloft = connect(
        "salesloft",
        ConnectorParams::new().with_credentials(oauth()),
        &server,
    );
    let err = salesloft
        .read(ReadParams::new("people", ["id"]).next_page("2x"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::FailedToUnmarshalBody));
    assert!(err.to_string().contains("2x"));
}

#[tokio::test]
async fn test_copper_requires_user_email() {
    let server = MockServer::start().await;
    let connector = connect(
        "copper",
        ConnectorParams::new().with_credentials(api_key()),
        &server,
    );
    let err = connector
        .delete(DeleteParams::new("people", "1"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::MissingMetadata));
}

#[tokio::test]
async fn test_copper_metadata_includes_custom_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/developer_api/v1/companies/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Acme"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/developer_api/v1/custom_field_definitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 2082340,
                "name": "Fruits",
                "data_type": "Dropdown",
                "available_on": ["company"],
                "options": [{"id": 1, "name": "Skiing"}]
            },
            {"id": 5, "name": "Nickname", "data_type": "String", "available_on": ["person"]}
        ])))
        .mount(&server)
        .await;

    let connector = connect("copper", copper_params(), &server);
    let result = connector
        .list_object_metadata(&["companies".to_string()])
        .await
        .unwrap();

    let companies = &result.result["companies"];
    let fruits = &companies.fields["custom_field_fruits"];
    assert!(fruits.is_custom);
    assert_eq!(fruits.value_type, ValueType::SingleSelect);
    assert!(companies.fields.contains_key("name"));
    assert!(!companies.fields.contains_key("custom_field_nickname"));
}

// ============================================================================
// Constant Contact
// ============================================================================

#[tokio::test]
async fn test_constantcontact_error_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/contacts"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([
            {"error_key": "contacts.api.validation.error", "error_message": "Email is invalid"}
        ])))
        .mount(&server)
        .await;

    let connector = connect(
        "constantcontact",
        ConnectorParams::new().with_credentials(oauth()),
        &server,
    );
    let err = connector
        .write(WriteParams::create("contacts", json!({"email_address": "x"})))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::BadRequest));
    assert!(err.to_string().contains("Email is invalid"));
}

#[tokio::test]
async fn test_constantcontact_contacts_custom_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/contacts"))
        .and(query_param("include", "custom_fields"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [{
                "contact_id": "c-1",
                "custom_fields": [{"custom_field_id": "f-1", "value": "gold"}]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/contact_custom_fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "custom_fields": [
                {"custom_field_id": "f-1", "label": "Tier", "name": "tier", "type": "string"}
            ]
        })))
        .mount(&server)
        .await;

    let connector = connect(
        "constantcontact",
        ConnectorParams::new().with_credentials(oauth()),
        &server,
    );
    let result = connector
        .read(ReadParams::new("contacts", ["contact_id", "custom_field_tier"]))
        .await
        .unwrap();

    assert!(result.done);
    assert_eq!(
        serde_json::Value::Object(result.data[0].fields.clone()),
        json!({"contact_id": "c-1", "custom_field_tier": "gold"})
    );
}

// ============================================================================
// Keap
// ============================================================================

fn keap_params(module: &str) -> ConnectorParams {
    ConnectorParams::new()
        .with_module(module)
        .with_credentials(oauth())
}

#[tokio::test]
async fn test_keap_v1_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm/rest/v1/contacts"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .and(query_param("since", "2024-01-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [{"id": 1}, {"id": 2}],
            "count": 5
        })))
        .mount(&server)
        .await;

    let connector = connect("keap", keap_params("v1"), &server);
    let params = ReadParams::new("contacts", ["id"])
        .since(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .page_size(2);
    let result = connector.read(params).await.unwrap();
    assert_eq!(result.next_page, "2");
}

#[tokio::test]
async fn test_keap_v2_descending_cut() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm/rest/v2/contacts"))
        .and(query_param("order_by", "update_time desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [
                {"id": 1, "update_time": "2024-01-03T00:00:00Z"},
                {"id": 2, "update_time": "2023-12-30T00:00:00Z"}
            ],
            "next_page_token": "tok"
        })))
        .mount(&server)
        .await;

    let connector = connect("keap", keap_params("v2"), &server);
    let params = ReadParams::new("contacts", ["id"])
        .since(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let result = connector.read(params).await.unwrap();

    assert_eq!(result.rows, 1);
    assert_eq!(result.data[0].id.as_deref(), Some("1"));
    assert!(result.done);
}

#[tokio::test]
async fn test_keap_update_methods() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/crm/rest/v1/tasks/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/crm/rest/v1/contacts/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4})))
        .mount(&server)
        .await;

    let connector = connect("keap", keap_params("v1"), &server);
    let task = connector
        .write(WriteParams::update("tasks", "3", json!({"title": "x"})))
        .await
        .unwrap();
    assert_eq!(task.record_id.as_deref(), Some("3"));
    let contact = connector
        .write(WriteParams::update("contacts", "4", json!({"given_name": "x"})))
        .await
        .unwrap();
    assert_eq!(contact.record_id.as_deref(), Some("4"));
}

#[tokio::test]
async fn test_keap_fault() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "fault": {"faultstring": "Invalid Access Token", "detail": {"errorcode": "keymanagement.service.invalid_access_token"}}
        })))
        .mount(&server)
        .await;

    let connector = connect("keap", keap_params("v2"), &server);
    let err = connector
        .delete(DeleteParams::new("contacts", "1"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unauthorized));
    assert!(err.to_string().contains("Invalid Access Token"));
}

#[tokio::test]
async fn test_keap_static_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm/rest/v2/contacts/model"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "custom_fields": [{"id": 7, "label": "Shoe Size", "field_type": "WholeNumber"}]
        })))
        .mount(&server)
        .await;

    let connector = connect("keap", keap_params("v2"), &server);
    let result = connector
        .list_object_metadata(&["contacts".to_string(), "widgets".to_string()])
        .await
        .unwrap();

    let contacts = &result.result["contacts"];
    assert_eq!(contacts.fields["source_type"].value_type, ValueType::SingleSelect);
    assert_eq!(contacts.fields["custom_field_shoe_size"].value_type, ValueType::Int);
    assert!(result.errors["widgets"].is(ErrorKind::ObjectNotSupported));
}

// ============================================================================
// Recurly
// ============================================================================

#[tokio::test]
async fn test_recurly_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("Accept", recurly::ACCEPT))
        .and(query_param("sort", "updated_at"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": true,
            "next": "/accounts?cursor=abc&limit=200",
            "data": [{"id": "a1"}]
        })))
        .mount(&server)
        .await;

    let connector = connect(
        "recurly",
        ConnectorParams::new().with_credentials(api_key()),
        &server,
    );
    let result = connector
        .read(ReadParams::new("accounts", ["id"]))
        .await
        .unwrap();
    assert_eq!(
        result.next_page,
        format!("{}/accounts?cursor=abc&limit=200", server.uri())
    );
}

#[tokio::test]
async fn test_recurly_has_more_false_ends_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_more": false,
            "next": "/plans?cursor=zzz",
            "data": [{"id": "p1"}]
        })))
        .mount(&server)
        .await;

    let connector = connect(
        "recurly",
        ConnectorParams::new().with_credentials(api_key()),
        &server,
    );
    let result = connector.read(ReadParams::new("plans", ["id"])).await.unwrap();
    assert!(result.done);
}

#[tokio::test]
async fn test_recurly_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/coupons"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {
                "type": "validation",
                "message": "Coupon is invalid",
                "params": [{"param": "code", "message": "is taken"}]
            }
        })))
        .mount(&server)
        .await;

    let connector = connect(
        "recurly",
        ConnectorParams::new().with_credentials(api_key()),
        &server,
    );
    let err = connector
        .write(WriteParams::create("coupons", json!({"code": "x"})))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("validation: Coupon is invalid; code:is taken"));
}

#[tokio::test]
async fn test_recurly_composite_metadata_samples_unknown_objects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_more": false,
            "data": [{"id": "i1", "name": "Widget"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connect(
        "recurly",
        ConnectorParams::new().with_credentials(api_key()),
        &server,
    );
    let result = connector
        .list_object_metadata(&["accounts".to_string(), "items".to_string()])
        .await
        .unwrap();

    assert!(result.errors.is_empty());
    assert!(result.result["accounts"].fields.contains_key("email"));
    assert!(result.result["items"].fields.contains_key("name"));
}

// ============================================================================
// Salesloft
// ============================================================================

fn salesloft(server: &MockServer) -> RestConnector {
    connect(
        "salesloft",
        ConnectorParams::new().with_credentials(oauth()),
        server,
    )
}

#[tokio::test]
async fn test_salesloft_read_named_custom_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/people"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "custom_fields": {"Region": "EU"}}],
            "metadata": {"paging": {"next_page": 2}}
        })))
        .mount(&server)
        .await;

    let result = salesloft(&server)
        .read(ReadParams::new("people", ["id", "Region"]))
        .await
        .unwrap();

    assert_eq!(result.next_page, "2");
    assert_eq!(
        serde_json::Value::Object(result.data[0].fields.clone()),
        json!({"id": 1, "Region": "EU"})
    );
}

#[tokio::test]
async fn test_salesloft_write_reports_data_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/people"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 55, "email_address": "a@b.test"}
        })))
        .mount(&server)
        .await;

    let result = salesloft(&server)
        .write(WriteParams::create("people", json!({"email_address": "a@b.test"})))
        .await
        .unwrap();
    assert_eq!(result.record_id.as_deref(), Some("55"));
    assert_eq!(result.data.unwrap()["email_address"], "a@b.test");
}

#[tokio::test]
async fn test_record_id_with_slash_stays_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v2/people/a%2F..%2Fadmin"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = salesloft(&server)
        .delete(DeleteParams::new("people", "a/../admin"))
        .await
        .unwrap();
    assert!(result.success);

    let err = salesloft(&server)
        .delete(DeleteParams::new("people", ".."))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Config));
}

#[tokio::test]
async fn test_salesloft_error_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/people"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": 422,
            "error": "Unprocessable Entity",
            "errors": {"email_address": ["has already been taken"]}
        })))
        .mount(&server)
        .await;

    let err = salesloft(&server)
        .write(WriteParams::create("people", json!({"email_address": "a@b.test"})))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Unprocessable Entity; email_address:has already been taken"));
}

#[tokio::test]
async fn test_salesloft_subscribe_and_unsubscribe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/webhook_subscriptions"))
        .and(body_partial_json(json!({
            "callback_url": "https://hooks.test/in",
            "callback_token": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 9, "callback_url": "https://hooks.test/in", "enabled": true, "user_guid": "u"}
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/webhook_subscriptions/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let connector = salesloft(&server);
    let params = SubscribeParams::new("https://hooks.test/in", "secret").object("tasks", ["update"]);
    let result = connector.subscribe(params).await.unwrap();

    assert_eq!(result.status, SubscriptionStatus::Success);
    assert_eq!(
        result.object_events["tasks"],
        ObjectEvents::new(["task_completed", "task_updated"])
    );
    assert_eq!(result.subscriptions[0].extra["user_guid"], "u");

    connector.delete_subscription(&result).await.unwrap();
}

#[tokio::test]
async fn test_salesloft_verify_webhook() {
    let server = MockServer::start().await;
    let request = WebhookRequest::new(
        vec![(
            "X-Salesloft-Signature".to_string(),
            "478979431f4f5bb54a3eedd69b46ef8dbe1dd5fc".to_string(),
        )],
        "test-secret-body",
    );
    let params = VerifyParams {
        secret: "secret".into(),
    };
    assert!(salesloft(&server)
        .verify_webhook_message(&request, &params)
        .await
        .unwrap());
}
