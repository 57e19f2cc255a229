use pretty_assertions::assert_eq;
use schema_bridge::{
    Bridge, DtoOptions, GraphqlOptions, IssueCode, PathSegment, SchemaAlgebra, Schema, TypeCollector,
    TypeFlavor,
};
use serde_json::json;
use std::sync::Arc;

fn order_schema() -> Schema {
    Schema::object([
        ("customer", Schema::string().min(1.0)),
        (
            "items",
            Schema::object([("sku", Schema::string()), ("qty", Schema::int().min(1.0))]).array(),
        ),
        ("note", Schema::string().optional()),
        ("priority", Schema::enumeration(["low", "high"]).default_value("low")),
    ])
}

#[test]
fn valid_input_parses_to_the_validated_value() {
    let bridge = Bridge::builder().build();
    let order = bridge.dto(order_schema(), DtoOptions::named("OrderDto"));

    let parsed = order
        .parse(&json!({
            "customer": "ada",
            "items": [{"sku": "A-1", "qty": 2}],
            "unexpected": true
        }))
        .unwrap();
    assert_eq!(
        parsed,
        json!({"customer": "ada", "items": [{"sku": "A-1", "qty": 2}], "priority": "low"})
    );
    assert!(order.safe_parse(&parsed).success());
}

#[test]
fn failures_point_at_the_offending_element() {
    let bridge = Bridge::builder().build();
    let order = bridge.dto(order_schema(), DtoOptions::named("OrderDto"));

    let error = order
        .parse(&json!({
            "customer": "ada",
            "items": [{"sku": "A-1", "qty": 2}, {"sku": "B-2", "qty": 0}]
        }))
        .unwrap_err();
    assert_eq!(error.issues().len(), 1);
    let issue = &error.issues()[0];
    assert_eq!(issue.code, IssueCode::TooSmall);
    assert_eq!(
        issue.path,
        vec![
            PathSegment::Key("items".into()),
            PathSegment::Index(1),
            PathSegment::Key("qty".into())
        ]
    );
    assert_eq!(issue.dotted_path(), "items.1.qty");

    let missing = order.validation_errors(&json!({"items": []}));
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].code, IssueCode::Required);
    assert_eq!(missing[0].dotted_path(), "customer");
}

#[test]
fn partial_accepts_empty_objects_but_keeps_field_rules() {
    let bridge = Bridge::builder().build();
    let order = bridge.dto(order_schema(), DtoOptions::named("OrderDto"));
    let patch = order.partial().unwrap();

    assert!(patch.is_zod_dto());
    assert_eq!(patch.field_names(), order.field_names());
    assert!(patch.validate(&json!({})).is_ok());
    assert!(patch.validate(&json!({"customer": ""})).is_err());
    assert!(patch.is_optional("customer"));
    assert!(!order.is_optional("customer"));
}

#[test]
fn derived_dtos_compose() {
    let bridge = Bridge::builder().build();
    let order = bridge.dto(order_schema(), DtoOptions::named("OrderDto"));

    let summary = order
        .pick(&["customer", "priority"])
        .unwrap()
        .extend(vec![("total".to_string(), Schema::number())])
        .unwrap();
    assert_eq!(summary.field_names(), ["customer", "priority", "total"]);
    assert_eq!(summary.default_value("priority"), Some(json!("low")));

    let without_items = order.omit(&["items"]).unwrap();
    assert_eq!(without_items.field_names(), ["customer", "note", "priority"]);
    assert!(order.validate_field("qty", &json!(1)).is_err());
}

#[test]
fn graphql_options_decorate_with_the_inferred_flavour() {
    let host = Arc::new(TypeCollector::new());
    let bridge = Bridge::builder().host(host.clone()).build();

    let create = bridge.dto(
        Schema::object([("title", Schema::string())]),
        DtoOptions::named("CreatePostDto").graphql(GraphqlOptions {
            name: Some("CreatePostInput".into()),
            ..GraphqlOptions::default()
        }),
    );
    let post = bridge.dto(
        Schema::object([("title", Schema::string()), ("id", Schema::int())]),
        DtoOptions::named("PostDto").graphql(GraphqlOptions {
            name: Some("Post".into()),
            description: Some("A published post".into()),
            ..GraphqlOptions::default()
        }),
    );
    let plain = bridge.dto(Schema::object([("q", Schema::string())]), DtoOptions::named("SearchDto"));

    assert!(create.is_input_type());
    assert_eq!(post.flavor(), Some(TypeFlavor::Object));
    assert_eq!(plain.flavor(), None);
    assert_eq!(host.type_names(TypeFlavor::Input), ["CreatePostInput"]);
    assert_eq!(host.type_names(TypeFlavor::Object), ["Post"]);
    assert!(host.to_sdl().contains("\"\"\"A published post\"\"\"\ntype Post {"));
    assert_eq!(bridge.registry().entries().len(), 2);
}
