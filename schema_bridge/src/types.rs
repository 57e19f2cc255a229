//! Values of the target GraphQL type system.

use crate::class::DtoClass;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    String,
    Float,
    Int,
    Boolean,
    DateTime,
    /// Opaque object payload; stands in for unresolved object references.
    Json,
}

impl Scalar {
    pub fn graphql_name(self) -> &'static str {
        match self {
            Scalar::String => "String",
            Scalar::Float => "Float",
            Scalar::Int => "Int",
            Scalar::Boolean => "Boolean",
            Scalar::DateTime => "DateTime",
            Scalar::Json => "JSON",
        }
    }

    /// Scalars a schema document has to declare itself.
    pub fn is_custom(self) -> bool {
        matches!(self, Scalar::DateTime | Scalar::Json)
    }
}

/// Which GraphQL flavour a class is emitted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFlavor {
    Object,
    Input,
}

impl TypeFlavor {
    pub fn from_input(is_input: bool) -> Self {
        if is_input {
            TypeFlavor::Input
        } else {
            TypeFlavor::Object
        }
    }

    pub fn is_input(self) -> bool {
        self == TypeFlavor::Input
    }
}

struct EnumInner {
    name: String,
    members: Vec<(String, Value)>,
}

/// A synthesized enum: member label → member value.
#[derive(Clone)]
pub struct EnumType(Arc<EnumInner>);

impl EnumType {
    pub fn new(name: impl Into<String>, members: Vec<(String, Value)>) -> Self {
        EnumType(Arc::new(EnumInner {
            name: name.into(),
            members,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn members(&self) -> &[(String, Value)] {
        &self.0.members
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.members.iter().map(|(label, _)| label.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.members.is_empty()
    }

    pub fn ptr_eq(&self, other: &EnumType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumType")
            .field("name", &self.0.name)
            .field("members", &self.0.members)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum TargetType {
    Scalar(Scalar),
    List {
        item: Box<TargetType>,
        nullable_items: bool,
    },
    Class(DtoClass),
    Enum(EnumType),
    /// Best-effort placeholder for an object reference that could not be resolved.
    Opaque,
}

impl TargetType {
    /// The named type at the bottom of any list nesting.
    pub fn named_type(&self) -> String {
        match self {
            TargetType::Scalar(scalar) => scalar.graphql_name().to_string(),
            TargetType::List { item, .. } => item.named_type(),
            TargetType::Class(class) => class.display_name(),
            TargetType::Enum(enum_type) => enum_type.name().to_string(),
            TargetType::Opaque => Scalar::Json.graphql_name().to_string(),
        }
    }

    /// SDL type reference, e.g. `[String!]!`.
    pub fn render(&self, nullable: bool) -> String {
        let base = match self {
            TargetType::List {
                item,
                nullable_items,
            } => format!("[{}]", item.render(*nullable_items)),
            other => other.named_type(),
        };
        if nullable {
            base
        } else {
            format!("{}!", base)
        }
    }

    pub fn as_class(&self) -> Option<&DtoClass> {
        match self {
            TargetType::Class(class) => Some(class),
            TargetType::List { item, .. } => item.as_class(),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        match self {
            TargetType::Opaque => true,
            TargetType::List { item, .. } => item.is_opaque(),
            _ => false,
        }
    }
}

/// Deferred field type; evaluated by the host when it builds its schema.
#[derive(Clone)]
pub struct TypeThunk(Arc<dyn Fn() -> TargetType + Send + Sync>);

impl TypeThunk {
    pub fn new(resolve: impl Fn() -> TargetType + Send + Sync + 'static) -> Self {
        TypeThunk(Arc::new(resolve))
    }

    pub fn fixed(target: TargetType) -> Self {
        TypeThunk::new(move || target.clone())
    }

    pub fn resolve(&self) -> TargetType {
        (self.0)()
    }
}

impl fmt::Debug for TypeThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeThunk")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_lists() {
        let ty = TargetType::List {
            item: Box::new(TargetType::Scalar(Scalar::Int)),
            nullable_items: false,
        };
        assert_eq!(ty.render(false), "[Int!]!");
        assert_eq!(ty.render(true), "[Int!]");
        assert_eq!(TargetType::Opaque.render(true), "JSON");
    }
}
