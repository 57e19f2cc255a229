use super::issue::RefinementContext;
use super::Schema;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_NATIVE_ENUM_ID: AtomicU64 = AtomicU64::new(1);

pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type RefineFn = Arc<dyn Fn(&Value, &mut RefinementContext) + Send + Sync>;
pub type MapFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The definition of a schema node.
#[derive(Clone, Debug)]
pub enum SchemaKind {
    String(StringRules),
    Number(NumberRules),
    Boolean,
    Date,
    Literal(Value),
    Object(ObjectShape),
    Array(Schema),
    Optional(Schema),
    Nullable(Schema),
    Default { inner: Schema, value: Value },
    Enum(Vec<String>),
    NativeEnum(NativeEnum),
    Union(Vec<Schema>),
    Effects { inner: Schema, effect: Effect },
    Branded { inner: Schema, brand: String },
    Lazy(LazySchema),
    Record(Schema),
    Any,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Uuid,
    Url,
}

#[derive(Clone, Debug, Default)]
pub struct StringRules {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub pattern: Option<Regex>,
    pub format: Option<StringFormat>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer: bool,
}

/// How an object node treats keys it does not declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownKeys {
    #[default]
    Strip,
    Passthrough,
    Strict,
}

#[derive(Clone, Debug, Default)]
pub struct ObjectShape {
    pub fields: Vec<(String, Schema)>,
    pub unknown_keys: UnknownKeys,
}

impl ObjectShape {
    pub fn field(&self, name: &str) -> Option<&Schema> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| schema)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// A declared name→value enumeration. Clones share one identity; two separate
/// `new` calls never do, even with identical tables.
#[derive(Clone, Debug)]
pub struct NativeEnum {
    id: u64,
    name: String,
    values: Arc<Vec<(String, Value)>>,
}

impl NativeEnum {
    pub fn new<K, V>(name: impl Into<String>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            id: NEXT_NATIVE_ENUM_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            values: Arc::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    /// Identity of the declaration, used as the enum cache key.
    pub fn table_id(&self) -> u64 {
        self.id
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.iter().any(|(_, v)| v == value)
    }
}

#[derive(Clone)]
pub enum Effect {
    Refine { check: CheckFn, message: String },
    SuperRefine(RefineFn),
    Transform(MapFn),
    Preprocess(MapFn),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Refine { message, .. } => f.debug_struct("Refine").field("message", message).finish(),
            Effect::SuperRefine(_) => f.write_str("SuperRefine"),
            Effect::Transform(_) => f.write_str("Transform"),
            Effect::Preprocess(_) => f.write_str("Preprocess"),
        }
    }
}

/// A schema produced on first use, which is how recursive shapes are written.
#[derive(Clone)]
pub struct LazySchema {
    cell: Arc<OnceCell<Schema>>,
    init: Arc<dyn Fn() -> Schema + Send + Sync>,
}

impl LazySchema {
    pub(crate) fn new(init: impl Fn() -> Schema + Send + Sync + 'static) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            init: Arc::new(init),
        }
    }

    pub fn get(&self) -> &Schema {
        self.cell.get_or_init(|| (self.init)())
    }
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(schema) => f.debug_tuple("Lazy").field(&schema.id()).finish(),
            None => f.write_str("Lazy(<pending>)"),
        }
    }
}
