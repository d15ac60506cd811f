//! Tests for custom field enrichment

use super::*;
use crate::connector::ReadResultRow;
use crate::error::ErrorKind;
use crate::handlers::{ObjectSet, ProviderContext};
use crate::http::{HttpClient, HttpClientConfig, Request, Response};
use crate::interpreter::ErrorHandler;
use crate::resolver::AuthMetadata;
use crate::schema::{FieldValue, ObjectMetadata, ValueType};
use crate::types::value_to_string;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("record must be an object"),
    }
}

fn fruits() -> CustomFieldDefinition {
    CustomFieldDefinition {
        id: "2082340".into(),
        name: "Fruits".into(),
        key: custom_field_key("Fruits"),
        value_type: ValueType::SingleSelect,
        provider_type: "Dropdown".into(),
        objects: vec!["companies".into()],
        options: vec![FieldValue::new("1", "Skiing"), FieldValue::new("2", "Apples")],
    }
}

const COPPER_LAYOUT: RecordLayout = RecordLayout::IdValueArray {
    array_key: "custom_fields",
    id_key: "custom_field_definition_id",
    value_key: "value",
};

#[test]
fn test_custom_field_key() {
    assert_eq!(custom_field_key("Fruits"), "custom_field_fruits");
    assert_eq!(custom_field_key("Favorite  Fruit!"), "custom_field_favorite_fruit");
}

#[test]
fn test_definition_metadata() {
    let field = fruits().to_field_metadata();
    assert!(field.is_custom);
    assert_eq!(field.display_name, "Fruits");
    assert_eq!(field.value_type, ValueType::SingleSelect);
    assert_eq!(field.values.map(|v| v.len()), Some(2));
}

#[test]
fn test_applies_to() {
    let mut definition = fruits();
    assert!(definition.applies_to("companies"));
    assert!(!definition.applies_to("people"));
    definition.objects.clear();
    assert!(definition.applies_to("people"));
}

#[test]
fn test_collapse_id_value_array() {
    let registry: CustomFieldRegistry = [fruits()].into_iter().collect();
    let mut raw = record(json!({
        "id": 1,
        "custom_fields": [
            {"custom_field_definition_id": 2082340, "value": "Skiing"},
            {"custom_field_definition_id": 999, "value": "gone"}
        ]
    }));

    COPPER_LAYOUT.collapse(&mut raw, &registry);
    assert_eq!(
        Value::Object(raw),
        json!({"id": 1, "custom_field_fruits": "Skiing"})
    );
}

#[test]
fn test_collapse_resolves_option_ids() {
    let registry: CustomFieldRegistry = [fruits()].into_iter().collect();
    let mut raw = record(json!({
        "custom_fields": [{"custom_field_definition_id": 2082340, "value": 2}]
    }));

    COPPER_LAYOUT.collapse(&mut raw, &registry);
    assert_eq!(raw["custom_field_fruits"], json!("Apples"));
}

#[test]
fn test_collapse_named_object() {
    let layout = RecordLayout::NamedObject {
        object_key: "custom_fields",
    };
    assert!(!layout.needs_registry());

    let mut raw = record(json!({"id": 5, "custom_fields": {"Tier": "Gold", "id": "shadow"}}));
    assert!(layout.has_custom_section(&raw));
    layout.collapse(&mut raw, &CustomFieldRegistry::new());
    assert_eq!(Value::Object(raw), json!({"id": 5, "Tier": "Gold"}));
}

#[test]
fn test_collapse_prefixed_keys() {
    let layout = RecordLayout::PrefixedKeys {
        prefix: "customfield_",
    };
    let registry: CustomFieldRegistry = [CustomFieldDefinition {
        id: "customfield_10010".into(),
        name: "Story Points".into(),
        key: "Story Points".into(),
        value_type: ValueType::Float,
        ..Default::default()
    }]
    .into_iter()
    .collect();

    let mut raw = record(json!({"summary": "s", "customfield_10010": 3, "customfield_1": "x"}));
    layout.collapse(&mut raw, &registry);
    assert_eq!(
        Value::Object(raw),
        json!({"summary": "s", "Story Points": 3, "customfield_1": "x"})
    );
}

#[test]
fn test_enhance_metadata() {
    let registry: CustomFieldRegistry = [fruits()].into_iter().collect();
    let mut metadata = ObjectMetadata::new("Companies");
    enhance_metadata(&mut metadata, &registry);
    assert!(metadata.fields["custom_field_fruits"].is_custom);
}

fn source(build: BuildDefinitionsRequest, parse: ParseDefinitions) -> CustomFieldSource {
    CustomFieldSource::new(ObjectSet::Only(&["companies"]), build, parse, COPPER_LAYOUT)
}

fn build_page(ctx: &ProviderContext, _object: &str, token: &str) -> crate::error::Result<Request> {
    let url = ctx
        .url(&["custom_field_definitions"])?
        .with_optional_query_param("page", Some(token.to_string()).filter(|t| !t.is_empty()));
    Ok(Request::get(url.to_string()))
}

fn parse_page(
    _ctx: &ProviderContext,
    _object: &str,
    response: &Response,
) -> crate::error::Result<DefinitionPage> {
    let body = response.require_body()?;
    let definitions = body["items"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|d| CustomFieldDefinition {
            id: value_to_string(&d["id"]).unwrap_or_default(),
            name: d["name"].as_str().unwrap_or_default().to_string(),
            key: custom_field_key(d["name"].as_str().unwrap_or_default()),
            objects: vec![d["on"].as_str().unwrap_or_default().to_string()],
            ..Default::default()
        })
        .collect();
    Ok(DefinitionPage {
        definitions,
        next_page: value_to_string(&body["next"]).unwrap_or_default(),
    })
}

fn context(server: &MockServer) -> ProviderContext {
    ProviderContext {
        provider: "copper".into(),
        module_id: "crm".into(),
        base_url: server.uri(),
        module_url: server.uri(),
        metadata: AuthMetadata::default(),
    }
}

#[tokio::test]
async fn test_fetch_registry_follows_pages_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/custom_field_definitions"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 3, "name": "Region", "on": "companies"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/custom_field_definitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": 1, "name": "Fruits", "on": "companies"},
                {"id": 2, "name": "Nickname", "on": "people"}
            ],
            "next": "2"
        })))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let registry = fetch_registry(
        &client,
        &context(&server),
        &source(build_page, parse_page),
        "companies",
        &ErrorHandler::default(),
    )
    .await
    .unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("1").unwrap().key, "custom_field_fruits");
    assert_eq!(registry.get("3").unwrap().key, "custom_field_region");
    assert!(registry.get("2").is_none());
}

#[tokio::test]
async fn test_fetch_registry_failure_is_resolving_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let err = fetch_registry(
        &client,
        &context(&server),
        &source(build_page, parse_page),
        "companies",
        &ErrorHandler::default(),
    )
    .await
    .unwrap_err();

    assert!(err.is(ErrorKind::ResolvingCustomFields));
    assert!(err.to_string().contains("companies"));
}

#[test]
fn test_enhance_rows_reprojects() {
    let registry: CustomFieldRegistry = [fruits()].into_iter().collect();
    let source = CustomFieldSource::new(ObjectSet::All, build_page, parse_page, COPPER_LAYOUT);
    let fields = ["id", "custom_field_fruits"].into_iter().map(String::from).collect();

    let mut rows = vec![
        ReadResultRow {
            fields: record(json!({"id": 1})),
            raw: record(json!({
                "id": 1,
                "custom_fields": [{"custom_field_definition_id": "2082340", "value": "Skiing"}]
            })),
            id: Some("1".into()),
        },
        ReadResultRow {
            fields: record(json!({"id": 2})),
            raw: record(json!({"id": 2})),
            id: Some("2".into()),
        },
    ];

    assert!(needs_enrichment(&rows, &source));
    enhance_rows(&mut rows, &source, &registry, &fields);

    assert_eq!(
        Value::Object(rows[0].fields.clone()),
        json!({"id": 1, "custom_field_fruits": "Skiing"})
    );
    assert_eq!(Value::Object(rows[1].raw.clone()), json!({"id": 2}));
}
