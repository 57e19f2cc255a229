//! The declarative schema model.
//!
//! A [`Schema`] is an immutable node handle. Cloning the handle keeps its
//! identity; every builder method returns a *new* node with a fresh
//! [`SchemaId`]. Identity is what the registry keys on, so code that wants two
//! references to "the same" schema must share one handle (a `Lazy<Schema>`
//! static is the usual way).

mod issue;
mod kind;
mod parse;

pub use issue::{Issue, IssueCode, PathSegment, RefinementContext, ValidationError};
pub use kind::{
    Effect, LazySchema, NativeEnum, NumberRules, ObjectShape, SchemaKind, StringFormat,
    StringRules, UnknownKeys,
};

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u64);

impl SchemaId {
    fn next() -> Self {
        SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Node {
    id: SchemaId,
    kind: SchemaKind,
    description: Option<String>,
    origin: Option<Schema>,
}

#[derive(Clone)]
pub struct Schema(Arc<Node>);

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Schema");
        s.field("id", &self.0.id).field("kind", &self.0.kind);
        if let Some(description) = &self.0.description {
            s.field("description", description);
        }
        s.finish()
    }
}

// --- Constructors ---

impl Schema {
    pub fn from_kind(kind: SchemaKind) -> Self {
        Schema(Arc::new(Node {
            id: SchemaId::next(),
            kind,
            description: None,
            origin: None,
        }))
    }

    pub fn string() -> Self {
        Self::from_kind(SchemaKind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::from_kind(SchemaKind::Number(NumberRules::default()))
    }

    pub fn int() -> Self {
        Self::from_kind(SchemaKind::Number(NumberRules {
            integer: true,
            ..NumberRules::default()
        }))
    }

    pub fn boolean() -> Self {
        Self::from_kind(SchemaKind::Boolean)
    }

    pub fn date() -> Self {
        Self::from_kind(SchemaKind::Date)
    }

    pub fn any() -> Self {
        Self::from_kind(SchemaKind::Any)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::from_kind(SchemaKind::Literal(value.into()))
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Self {
        Self::from_kind(SchemaKind::Object(ObjectShape {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            unknown_keys: UnknownKeys::Strip,
        }))
    }

    pub fn array_of(element: Schema) -> Self {
        Self::from_kind(SchemaKind::Array(element))
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::from_kind(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn native_enum(native: NativeEnum) -> Self {
        Self::from_kind(SchemaKind::NativeEnum(native))
    }

    pub fn union(options: impl IntoIterator<Item = Schema>) -> Self {
        Self::from_kind(SchemaKind::Union(options.into_iter().collect()))
    }

    pub fn record(value: Schema) -> Self {
        Self::from_kind(SchemaKind::Record(value))
    }

    /// Defers construction until first use; the target keeps its own identity.
    pub fn lazy(init: impl Fn() -> Schema + Send + Sync + 'static) -> Self {
        Self::from_kind(SchemaKind::Lazy(LazySchema::new(init)))
    }
}

// --- Accessors ---

impl Schema {
    pub fn id(&self) -> SchemaId {
        self.0.id
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.0.kind
    }

    /// The description attached to this exact node.
    pub fn own_description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// The schema this node is a described view of, if it was made by `describe`.
    pub fn origin(&self) -> Option<&Schema> {
        self.0.origin.as_ref()
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        self.id() == other.id()
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match self.kind() {
            SchemaKind::Object(shape) => Some(shape),
            _ => None,
        }
    }

    fn require_object(&self, operation: &'static str) -> Result<&ObjectShape> {
        self.as_object().ok_or(Error::NotAnObject { operation })
    }

    fn derive(&self, kind: SchemaKind) -> Schema {
        Schema(Arc::new(Node {
            id: SchemaId::next(),
            kind,
            description: self.0.description.clone(),
            origin: None,
        }))
    }

    fn wrap(&self, kind: SchemaKind) -> Schema {
        Schema::from_kind(kind)
    }
}

// --- Wrappers and refinements ---

impl Schema {
    pub fn describe(&self, description: impl Into<String>) -> Schema {
        Schema(Arc::new(Node {
            id: SchemaId::next(),
            kind: self.0.kind.clone(),
            description: Some(description.into()),
            origin: Some(self.clone()),
        }))
    }

    /// Same definition, new identity.
    pub fn fork(&self) -> Schema {
        self.derive(self.0.kind.clone())
    }

    pub fn optional(&self) -> Schema {
        self.wrap(SchemaKind::Optional(self.clone()))
    }

    pub fn nullable(&self) -> Schema {
        self.wrap(SchemaKind::Nullable(self.clone()))
    }

    pub fn default_value(&self, value: impl Into<Value>) -> Schema {
        self.wrap(SchemaKind::Default {
            inner: self.clone(),
            value: value.into(),
        })
    }

    pub fn array(&self) -> Schema {
        Schema::array_of(self.clone())
    }

    pub fn brand(&self, brand: impl Into<String>) -> Schema {
        self.wrap(SchemaKind::Branded {
            inner: self.clone(),
            brand: brand.into(),
        })
    }

    pub fn refine(
        &self,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Schema {
        self.wrap(SchemaKind::Effects {
            inner: self.clone(),
            effect: Effect::Refine {
                check: Arc::new(check),
                message: message.into(),
            },
        })
    }

    pub fn super_refine(
        &self,
        refine: impl Fn(&Value, &mut RefinementContext) + Send + Sync + 'static,
    ) -> Schema {
        self.wrap(SchemaKind::Effects {
            inner: self.clone(),
            effect: Effect::SuperRefine(Arc::new(refine)),
        })
    }

    pub fn transform(&self, map: impl Fn(Value) -> Value + Send + Sync + 'static) -> Schema {
        self.wrap(SchemaKind::Effects {
            inner: self.clone(),
            effect: Effect::Transform(Arc::new(map)),
        })
    }

    /// Runs `map` on the raw input before this schema sees it.
    pub fn preprocess(&self, map: impl Fn(Value) -> Value + Send + Sync + 'static) -> Schema {
        self.wrap(SchemaKind::Effects {
            inner: self.clone(),
            effect: Effect::Preprocess(Arc::new(map)),
        })
    }
}

// --- Primitive rules ---

impl Schema {
    /// Minimum length for strings, minimum value for numbers. Ignored elsewhere.
    pub fn min(&self, bound: f64) -> Schema {
        match self.kind() {
            SchemaKind::String(rules) => self.derive(SchemaKind::String(StringRules {
                min_len: Some(bound as usize),
                ..rules.clone()
            })),
            SchemaKind::Number(rules) => self.derive(SchemaKind::Number(NumberRules {
                min: Some(bound),
                ..rules.clone()
            })),
            _ => self.clone(),
        }
    }

    pub fn max(&self, bound: f64) -> Schema {
        match self.kind() {
            SchemaKind::String(rules) => self.derive(SchemaKind::String(StringRules {
                max_len: Some(bound as usize),
                ..rules.clone()
            })),
            SchemaKind::Number(rules) => self.derive(SchemaKind::Number(NumberRules {
                max: Some(bound),
                ..rules.clone()
            })),
            _ => self.clone(),
        }
    }

    pub fn pattern(&self, pattern: &str) -> Result<Schema> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidPattern(e.to_string()))?;
        Ok(self.with_string_rules(|rules| rules.pattern = Some(regex)))
    }

    pub fn email(&self) -> Schema {
        self.with_string_rules(|rules| rules.format = Some(StringFormat::Email))
    }

    pub fn uuid(&self) -> Schema {
        self.with_string_rules(|rules| rules.format = Some(StringFormat::Uuid))
    }

    pub fn url(&self) -> Schema {
        self.with_string_rules(|rules| rules.format = Some(StringFormat::Url))
    }

    fn with_string_rules(&self, edit: impl FnOnce(&mut StringRules)) -> Schema {
        match self.kind() {
            SchemaKind::String(rules) => {
                let mut rules = rules.clone();
                edit(&mut rules);
                self.derive(SchemaKind::String(rules))
            }
            _ => self.clone(),
        }
    }
}

// --- Object algebra ---

impl Schema {
    /// Every field becomes optional.
    pub fn partial(&self) -> Result<Schema> {
        let shape = self.require_object("partial")?;
        let fields = shape
            .fields
            .iter()
            .map(|(name, field)| {
                let field = match field.kind() {
                    SchemaKind::Optional(_) => field.clone(),
                    _ => field.optional(),
                };
                (name.clone(), field)
            })
            .collect();
        Ok(self.derive(SchemaKind::Object(ObjectShape {
            fields,
            unknown_keys: shape.unknown_keys,
        })))
    }

    pub fn pick(&self, keys: &[&str]) -> Result<Schema> {
        let shape = self.require_object("pick")?;
        Ok(self.with_fields(shape, |name| keys.contains(&name)))
    }

    pub fn omit(&self, keys: &[&str]) -> Result<Schema> {
        let shape = self.require_object("omit")?;
        Ok(self.with_fields(shape, |name| !keys.contains(&name)))
    }

    /// Adds fields, replacing same-named fields in place.
    pub fn extend<K: Into<String>>(&self, extra: impl IntoIterator<Item = (K, Schema)>) -> Result<Schema> {
        let shape = self.require_object("extend")?;
        let mut fields = shape.fields.clone();
        for (name, schema) in extra {
            upsert_field(&mut fields, name.into(), schema);
        }
        Ok(self.derive(SchemaKind::Object(ObjectShape {
            fields,
            unknown_keys: shape.unknown_keys,
        })))
    }

    /// Fields of `other` win; its unknown-key policy is adopted.
    pub fn merge(&self, other: &Schema) -> Result<Schema> {
        let shape = self.require_object("merge")?;
        let other_shape = other.require_object("merge")?;
        let mut fields = shape.fields.clone();
        for (name, schema) in &other_shape.fields {
            upsert_field(&mut fields, name.clone(), schema.clone());
        }
        Ok(self.derive(SchemaKind::Object(ObjectShape {
            fields,
            unknown_keys: other_shape.unknown_keys,
        })))
    }

    pub fn strip(&self) -> Result<Schema> {
        self.with_unknown_keys("strip", UnknownKeys::Strip)
    }

    pub fn passthrough(&self) -> Result<Schema> {
        self.with_unknown_keys("passthrough", UnknownKeys::Passthrough)
    }

    pub fn strict(&self) -> Result<Schema> {
        self.with_unknown_keys("strict", UnknownKeys::Strict)
    }

    fn with_unknown_keys(&self, operation: &'static str, unknown_keys: UnknownKeys) -> Result<Schema> {
        let shape = self.require_object(operation)?;
        Ok(self.derive(SchemaKind::Object(ObjectShape {
            fields: shape.fields.clone(),
            unknown_keys,
        })))
    }

    fn with_fields(&self, shape: &ObjectShape, keep: impl Fn(&str) -> bool) -> Schema {
        let fields = shape
            .fields
            .iter()
            .filter(|(name, _)| keep(name))
            .cloned()
            .collect();
        self.derive(SchemaKind::Object(ObjectShape {
            fields,
            unknown_keys: shape.unknown_keys,
        }))
    }
}

fn upsert_field(fields: &mut Vec<(String, Schema)>, name: String, schema: Schema) {
    match fields.iter_mut().find(|(existing, _)| *existing == name) {
        Some(slot) => slot.1 = schema,
        None => fields.push((name, schema)),
    }
}

// --- Parsing ---

impl Schema {
    pub fn parse(&self, input: &Value) -> std::result::Result<Value, ValidationError> {
        parse::parse_root(self, input)
    }

    pub fn safe_parse(&self, input: &Value) -> SafeParse {
        match self.parse(input) {
            Ok(data) => SafeParse::Success(data),
            Err(error) => SafeParse::Failure(error),
        }
    }
}

/// Outcome of `safe_parse`, mirroring a `{ success, data | error }` record.
#[derive(Debug, Clone)]
pub enum SafeParse {
    Success(Value),
    Failure(ValidationError),
}

impl SafeParse {
    pub fn success(&self) -> bool {
        matches!(self, SafeParse::Success(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            SafeParse::Success(value) => Some(value),
            SafeParse::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            SafeParse::Success(_) => None,
            SafeParse::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> std::result::Result<Value, ValidationError> {
        match self {
            SafeParse::Success(value) => Ok(value),
            SafeParse::Failure(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> Schema {
        Schema::object([("id", Schema::int()), ("name", Schema::string())])
    }

    #[test]
    fn builders_allocate_fresh_identities() {
        let base = Schema::string();
        let copy = base.clone();
        assert!(base.ptr_eq(&copy));
        assert!(!base.ptr_eq(&base.fork()));
        assert!(!base.ptr_eq(&base.optional()));
    }

    #[test]
    fn describe_links_back_to_origin() {
        let base = user();
        let described = base.describe("a user");
        assert_eq!(described.own_description(), Some("a user"));
        assert!(described.origin().is_some_and(|o| o.ptr_eq(&base)));
        assert!(described.as_object().is_some());
    }

    #[test]
    fn object_algebra_reshapes_fields() {
        let base = user();
        let picked = base.pick(&["name"]).unwrap();
        assert_eq!(picked.as_object().unwrap().field_names().collect::<Vec<_>>(), ["name"]);

        let omitted = base.omit(&["name"]).unwrap();
        assert_eq!(omitted.as_object().unwrap().field_names().collect::<Vec<_>>(), ["id"]);

        let extended = base.extend([("name", Schema::int()), ("email", Schema::string())]).unwrap();
        let shape = extended.as_object().unwrap();
        assert_eq!(shape.field_names().collect::<Vec<_>>(), ["id", "name", "email"]);
        assert!(matches!(shape.field("name").unwrap().kind(), SchemaKind::Number(_)));
    }

    #[test]
    fn object_only_operations_reject_primitives() {
        let err = Schema::string().partial().unwrap_err();
        assert!(matches!(err, Error::NotAnObject { operation: "partial" }));
    }

    #[test]
    fn merge_overrides_and_adopts_policy() {
        let other = Schema::object([("name", Schema::boolean())]).strict().unwrap();
        let merged = user().merge(&other).unwrap();
        let shape = merged.as_object().unwrap();
        assert_eq!(shape.unknown_keys, UnknownKeys::Strict);
        assert!(matches!(shape.field("name").unwrap().kind(), SchemaKind::Boolean));
    }

    #[test]
    fn safe_parse_reports_success() {
        let outcome = user().safe_parse(&json!({"id": 1, "name": "a"}));
        assert!(outcome.success());
        assert_eq!(outcome.data(), Some(&json!({"id": 1, "name": "a"})));
    }
}
