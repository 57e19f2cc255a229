//! Request-pipeline hooks: a transforming validation pipe and a
//! non-transforming guard.

use crate::class::DtoClass;
use crate::dto::SchemaAlgebra;
use crate::error::ValidationException;
use crate::introspect::{self, NodeKind, PrimitiveKind};
use crate::schema::{Issue, IssueCode, SchemaKind, ValidationError};
use axum::body::Body;
use axum::extract::{FromRequestParts, Path};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Body,
    Query,
    Param,
    Custom,
}

/// Describes the argument a pipe runs for.
#[derive(Debug, Clone)]
pub struct ArgumentMetadata {
    pub kind: ArgumentKind,
    /// The declared DTO of the argument, if any.
    pub metatype: Option<DtoClass>,
}

impl ArgumentMetadata {
    pub fn body(metatype: &DtoClass) -> Self {
        Self {
            kind: ArgumentKind::Body,
            metatype: Some(metatype.clone()),
        }
    }

    pub fn untyped(kind: ArgumentKind) -> Self {
        Self {
            kind,
            metatype: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationPipe {
    dto: Option<DtoClass>,
}

impl ValidationPipe {
    /// Validates against whatever DTO the argument metadata names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always validates against `dto`.
    pub fn for_dto(dto: &DtoClass) -> Self {
        Self {
            dto: Some(dto.clone()),
        }
    }

    /// The parsed value, or the input unchanged when no schema DTO applies.
    pub fn transform(&self, value: Value, metadata: &ArgumentMetadata) -> Result<Value, ValidationException> {
        let dto = self.dto.as_ref().or(metadata.metatype.as_ref());
        match dto {
            Some(dto) if dto.is_zod_dto() => dto.parse(&value).map_err(|error| {
                tracing::debug!(dto = dto.name(), issues = error.issues().len(), "pipe rejected value");
                ValidationException::new(error)
            }),
            _ => Ok(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    Body,
    Query,
    Params,
}

#[derive(Debug, Clone)]
pub struct ValidationGuard {
    source: RequestSource,
    dto: DtoClass,
}

impl ValidationGuard {
    pub fn new(source: RequestSource, dto: &DtoClass) -> Self {
        Self {
            source,
            dto: dto.clone(),
        }
    }

    pub fn source(&self) -> RequestSource {
        self.source
    }

    /// Validates without handing back the parsed value.
    pub fn check(&self, value: &Value) -> Result<(), ValidationException> {
        self.dto.validate(value).map_err(ValidationException::new)
    }

    /// Validates one part of the request; the request comes back intact.
    pub async fn check_request(&self, req: Request<Body>) -> Result<Request<Body>, Response> {
        let (mut parts, body) = req.into_parts();
        let (value, body) = match self.source {
            RequestSource::Query => (query_value(&self.dto, parts.uri.query()), body),
            RequestSource::Params => {
                let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
                    Ok(path) => path.0,
                    Err(e) => return Err(e.into_response()),
                };
                let params = params
                    .into_iter()
                    .map(|(k, v)| {
                        let value = coerce(&self.dto, &k, v);
                        (k, value)
                    })
                    .collect::<Map<_, _>>();
                (Value::Object(params), body)
            }
            RequestSource::Body => {
                let bytes = match axum::body::to_bytes(body, usize::MAX).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return Err((
                            StatusCode::INTERNAL_SERVER_ERROR,
                            format!("Failed to read request body: {}", e),
                        )
                            .into_response())
                    }
                };
                let is_json = parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.contains("application/json"));
                let value = if is_json {
                    match serde_json::from_slice(&bytes) {
                        Ok(value) => value,
                        Err(e) => return Err(malformed_body(e).into_response()),
                    }
                } else {
                    Value::Null
                };
                (value, Body::from(bytes))
            }
        };

        match self.check(&value) {
            Ok(()) => Ok(Request::from_parts(parts, body)),
            Err(exception) => Err(exception.into_response()),
        }
    }
}

fn malformed_body(error: serde_json::Error) -> ValidationException {
    tracing::debug!(%error, "guard received malformed JSON");
    let issue = Issue::new(&[], IssueCode::InvalidType, error.to_string());
    ValidationException::with_message("Malformed JSON body", ValidationError::new(vec![issue]))
}

fn query_value(dto: &DtoClass, query: Option<&str>) -> Value {
    let pairs = query
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default();
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| {
                let value = coerce(dto, &k, v);
                (k, value)
            })
            .collect(),
    )
}

/// Query and path values arrive as text. A value becomes a number or boolean
/// only when the DTO declares that field as one.
fn coerce(dto: &DtoClass, key: &str, raw: String) -> Value {
    let Some(field) = dto.field_schema(key) else {
        return Value::String(raw);
    };
    let node = introspect::unwrap(&field);
    let coerced = match introspect::kind_of(node) {
        NodeKind::Primitive(PrimitiveKind::Number | PrimitiveKind::Integer) => parse_number(&raw),
        NodeKind::Primitive(PrimitiveKind::Boolean) => parse_bool(&raw),
        NodeKind::Literal => match node.kind() {
            SchemaKind::Literal(Value::Number(_)) => parse_number(&raw),
            SchemaKind::Literal(Value::Bool(_)) => parse_bool(&raw),
            _ => None,
        },
        _ => None,
    };
    coerced.unwrap_or(Value::String(raw))
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::from(n));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn parse_bool(raw: &str) -> Option<Value> {
    if raw.eq_ignore_ascii_case("true") {
        Some(Value::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Some(Value::Bool(false))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::create_dto;
    use crate::schema::Schema;

    #[test]
    fn query_values_follow_the_declared_field_kinds() {
        let dto = create_dto(
            "Search",
            Schema::object([
                ("page", Schema::int().optional()),
                ("ratio", Schema::number()),
                ("all", Schema::boolean().default_value(false)),
                ("q", Schema::string()),
                ("zip", Schema::string()),
            ]),
        );
        assert_eq!(
            query_value(&dto, Some("page=2&ratio=0.5&all=TRUE&q=a%20b&zip=02134&extra=7")),
            serde_json::json!({"page": 2, "ratio": 0.5, "all": true, "q": "a b", "zip": "02134", "extra": "7"})
        );
        assert_eq!(query_value(&dto, Some("page=two")), serde_json::json!({"page": "two"}));
        assert_eq!(query_value(&dto, None), serde_json::json!({}));
    }

    #[test]
    fn untyped_arguments_pass_through() {
        let pipe = ValidationPipe::new();
        let value = serde_json::json!({"anything": 1});
        let out = pipe
            .transform(value.clone(), &ArgumentMetadata::untyped(ArgumentKind::Custom))
            .unwrap();
        assert_eq!(out, value);
    }
}
