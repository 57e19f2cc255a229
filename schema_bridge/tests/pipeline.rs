use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use schema_bridge::{
    create_dto, ArgumentKind, ArgumentMetadata, RequestSource, Schema, ValidationGuard, ValidationPipe,
};
use serde_json::{json, Value};

fn signup() -> schema_bridge::DtoClass {
    create_dto(
        "SignupDto",
        Schema::object([
            ("email", Schema::string().email()),
            ("age", Schema::int().min(13.0).optional()),
        ]),
    )
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn pipe_returns_the_parsed_value() {
    let dto = signup();
    let pipe = ValidationPipe::new();
    let out = pipe
        .transform(json!({"email": "a@b.io", "extra": 1}), &ArgumentMetadata::body(&dto))
        .unwrap();
    assert_eq!(out, json!({"email": "a@b.io"}));
}

#[test]
fn pipe_rejects_with_the_validation_error() {
    let pipe = ValidationPipe::for_dto(&signup());
    let exception = pipe
        .transform(json!({"email": "nope"}), &ArgumentMetadata::untyped(ArgumentKind::Body))
        .unwrap_err();
    assert_eq!(exception.message(), "Validation failed");
    assert_eq!(exception.zod_error().issues().len(), 1);
    assert_eq!(exception.issues()[0].dotted_path(), "email");
}

#[tokio::test]
async fn validation_exceptions_render_as_bad_request() {
    let exception = ValidationPipe::for_dto(&signup())
        .transform(json!({"email": "a@b.io", "age": 9}), &ArgumentMetadata::untyped(ArgumentKind::Body))
        .unwrap_err();
    let response = exception.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["statusCode"], json!(400));
    assert_eq!(body["message"], json!("Validation failed"));
    assert_eq!(body["errors"][0]["path"], json!(["age"]));
    assert_eq!(body["errors"][0]["code"], json!("too_small"));
}

#[tokio::test]
async fn body_guard_hands_back_an_intact_request() {
    let guard = ValidationGuard::new(RequestSource::Body, &signup());
    let request = Request::builder()
        .method("POST")
        .uri("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"a@b.io","age":30}"#))
        .unwrap();

    let request = guard.check_request(request).await.unwrap();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], br#"{"email":"a@b.io","age":30}"#);
}

#[tokio::test]
async fn body_guard_rejects_invalid_payloads() {
    let guard = ValidationGuard::new(RequestSource::Body, &signup());
    let request = Request::builder()
        .method("POST")
        .uri("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"age":30}"#))
        .unwrap();

    let response = guard.check_request(request).await.unwrap_err();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["errors"][0]["code"], json!("required"));
}

#[tokio::test]
async fn query_guard_coerces_query_strings() {
    let page = create_dto(
        "PageQuery",
        Schema::object([("page", Schema::int().min(1.0)), ("q", Schema::string().optional())]),
    );
    let guard = ValidationGuard::new(RequestSource::Query, &page);
    assert_eq!(guard.source(), RequestSource::Query);

    let ok = Request::builder().uri("/posts?page=2&q=rust").body(Body::empty()).unwrap();
    assert!(guard.check_request(ok).await.is_ok());

    let bad = Request::builder().uri("/posts?page=0").body(Body::empty()).unwrap();
    let response = guard.check_request(bad).await.unwrap_err();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_guard_keeps_numeric_looking_strings() {
    let lookup = create_dto("Lookup", Schema::object([("zip", Schema::string().min(5.0))]));
    let guard = ValidationGuard::new(RequestSource::Query, &lookup);

    let request = Request::builder().uri("/x?zip=02134").body(Body::empty()).unwrap();
    assert!(guard.check_request(request).await.is_ok());
}

#[tokio::test]
async fn body_guard_reports_malformed_json() {
    let guard = ValidationGuard::new(RequestSource::Body, &signup());
    let request = Request::builder()
        .method("POST")
        .uri("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email": "#))
        .unwrap();

    let response = guard.check_request(request).await.unwrap_err();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], json!("Malformed JSON body"));
    assert_eq!(body["errors"][0]["code"], json!("invalid_type"));
    assert_eq!(body["errors"][0]["path"], json!([]));
}
