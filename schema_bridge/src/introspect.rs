//! Read-only view of schema nodes for metadata generation.
//!
//! This is the only place that matches on [`SchemaKind`] for typing purposes;
//! the mapper, enum synthesizer and registry all go through [`NodeKind`].

use crate::schema::{NativeEnum, Schema, SchemaKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Primitive(PrimitiveKind),
    Object,
    Array,
    Optional,
    Nullable,
    Default,
    Effects,
    Branded,
    Lazy,
    Enum,
    NativeEnum,
    Union,
    Literal,
    /// Anything the type system has no precise counterpart for.
    Opaque,
}

impl NodeKind {
    /// Wrappers that are invisible to type mapping.
    pub fn is_wrapper(self) -> bool {
        matches!(
            self,
            NodeKind::Optional
                | NodeKind::Nullable
                | NodeKind::Default
                | NodeKind::Effects
                | NodeKind::Branded
                | NodeKind::Lazy
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Children<'a> {
    None,
    Fields(&'a [(String, Schema)]),
    Element(&'a Schema),
    Inner(&'a Schema),
    Values(&'a [String]),
    NativeValues(&'a NativeEnum),
    Options(&'a [Schema]),
}

pub fn kind_of(schema: &Schema) -> NodeKind {
    match schema.kind() {
        SchemaKind::String(_) => NodeKind::Primitive(PrimitiveKind::String),
        SchemaKind::Number(rules) if rules.integer => NodeKind::Primitive(PrimitiveKind::Integer),
        SchemaKind::Number(_) => NodeKind::Primitive(PrimitiveKind::Number),
        SchemaKind::Boolean => NodeKind::Primitive(PrimitiveKind::Boolean),
        SchemaKind::Date => NodeKind::Primitive(PrimitiveKind::Date),
        SchemaKind::Object(_) => NodeKind::Object,
        SchemaKind::Array(_) => NodeKind::Array,
        SchemaKind::Optional(_) => NodeKind::Optional,
        SchemaKind::Nullable(_) => NodeKind::Nullable,
        SchemaKind::Default { .. } => NodeKind::Default,
        SchemaKind::Effects { .. } => NodeKind::Effects,
        SchemaKind::Branded { .. } => NodeKind::Branded,
        SchemaKind::Lazy(_) => NodeKind::Lazy,
        SchemaKind::Enum(_) => NodeKind::Enum,
        SchemaKind::NativeEnum(_) => NodeKind::NativeEnum,
        SchemaKind::Union(_) => NodeKind::Union,
        SchemaKind::Literal(_) => NodeKind::Literal,
        SchemaKind::Record(_) | SchemaKind::Any => NodeKind::Opaque,
    }
}

pub fn children_of(schema: &Schema) -> Children<'_> {
    match schema.kind() {
        SchemaKind::Object(shape) => Children::Fields(&shape.fields),
        SchemaKind::Array(element) => Children::Element(element),
        SchemaKind::Optional(inner)
        | SchemaKind::Nullable(inner)
        | SchemaKind::Default { inner, .. }
        | SchemaKind::Effects { inner, .. }
        | SchemaKind::Branded { inner, .. } => Children::Inner(inner),
        SchemaKind::Lazy(lazy) => Children::Inner(lazy.get()),
        SchemaKind::Enum(values) => Children::Values(values),
        SchemaKind::NativeEnum(native) => Children::NativeValues(native),
        SchemaKind::Union(options) => Children::Options(options),
        _ => Children::None,
    }
}

fn inner_of(schema: &Schema) -> Option<&Schema> {
    match children_of(schema) {
        Children::Inner(inner) => Some(inner),
        _ => None,
    }
}

/// Strips every type-transparent wrapper.
pub fn unwrap(schema: &Schema) -> &Schema {
    let mut current = schema;
    while let Some(inner) = inner_of(current) {
        current = inner;
    }
    current
}

/// Nearest description, looking inward through wrappers.
pub fn description_of(schema: &Schema) -> Option<&str> {
    let mut current = schema;
    loop {
        if let Some(description) = current.own_description() {
            return Some(description);
        }
        current = inner_of(current)?;
    }
}

/// Whether the value may be absent or null, independent of its type.
pub fn is_nullable(schema: &Schema) -> bool {
    let mut current = schema;
    loop {
        if matches!(
            kind_of(current),
            NodeKind::Optional | NodeKind::Nullable | NodeKind::Default
        ) {
            return true;
        }
        match inner_of(current) {
            Some(inner) => current = inner,
            None => return false,
        }
    }
}

/// Whether an absent value passes (optional or defaulted).
pub fn accepts_absent(schema: &Schema) -> bool {
    let mut current = schema;
    loop {
        if matches!(kind_of(current), NodeKind::Optional | NodeKind::Default) {
            return true;
        }
        match inner_of(current) {
            Some(inner) => current = inner,
            None => return false,
        }
    }
}

/// Whether `null` passes.
pub fn accepts_null(schema: &Schema) -> bool {
    let mut current = schema;
    loop {
        if kind_of(current) == NodeKind::Nullable {
            return true;
        }
        match inner_of(current) {
            Some(inner) => current = inner,
            None => return false,
        }
    }
}

pub fn default_of(schema: &Schema) -> Option<&serde_json::Value> {
    let mut current = schema;
    loop {
        if let SchemaKind::Default { value, .. } = current.kind() {
            return Some(value);
        }
        current = inner_of(current)?;
    }
}
