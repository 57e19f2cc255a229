//! Schema → OpenAPI document nodes.

use crate::bridge::Bridge;
use crate::introspect;
use crate::schema::{NativeEnum, Schema, SchemaId, SchemaKind, StringFormat, StringRules};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use utoipa::openapi::schema::{
    AdditionalProperties, ArrayBuilder, ObjectBuilder, OneOfBuilder, SchemaFormat, SchemaType, Type,
};
use utoipa::openapi::{self, ComponentsBuilder, Ref, RefOr};

/// Converts one schema; nested schemas are always inlined.
pub fn schema_to_openapi(schema: &Schema) -> RefOr<openapi::Schema> {
    Converter::default().convert(schema, true)
}

/// Wrapper-level facts that apply to whatever node sits underneath.
struct Decor {
    nullable: bool,
    description: Option<String>,
    default: Option<Value>,
}

#[derive(Default)]
struct Converter<'a> {
    /// Schemas emitted as components; referenced with `$ref` when nested.
    refs: Option<&'a HashMap<SchemaId, String>>,
    stack: Vec<SchemaId>,
}

impl Converter<'_> {
    fn convert(&mut self, schema: &Schema, root: bool) -> RefOr<openapi::Schema> {
        let decor = Decor {
            nullable: introspect::accepts_null(schema),
            description: introspect::description_of(schema).map(str::to_string),
            default: introspect::default_of(schema).cloned(),
        };
        let node = introspect::unwrap(schema);

        if !root {
            if let Some(name) = self.refs.and_then(|refs| refs.get(&node.id())) {
                return nullable_untyped(RefOr::Ref(Ref::from_schema_name(name.as_str())), decor.nullable);
            }
        }
        if self.stack.contains(&node.id()) {
            return RefOr::T(openapi::Schema::default());
        }
        self.stack.push(node.id());
        let converted = self.convert_node(node, &decor);
        self.stack.pop();
        converted
    }

    fn convert_node(&mut self, node: &Schema, decor: &Decor) -> RefOr<openapi::Schema> {
        let built = match node.kind() {
            SchemaKind::String(rules) => string_rules(typed(Some(Type::String), decor), rules).build(),
            SchemaKind::Number(rules) => {
                let ty = if rules.integer { Type::Integer } else { Type::Number };
                typed(Some(ty), decor).build()
            }
            SchemaKind::Boolean => typed(Some(Type::Boolean), decor).build(),
            SchemaKind::Date => typed(Some(Type::String), decor)
                .format(Some(SchemaFormat::Custom("date-time".to_string())))
                .build(),
            SchemaKind::Literal(value) => typed(json_type(value), decor)
                .enum_values(Some([value.clone()]))
                .build(),
            SchemaKind::Enum(values) => typed(Some(Type::String), decor)
                .enum_values(Some(values.iter().cloned()))
                .build(),
            SchemaKind::NativeEnum(native) => native_enum(native, decor),
            SchemaKind::Object(shape) => {
                let mut builder = typed(Some(Type::Object), decor);
                for (name, field) in &shape.fields {
                    builder = builder.property(name.as_str(), self.convert(field, false));
                    if !introspect::accepts_absent(field) {
                        builder = builder.required(name.as_str());
                    }
                }
                builder.build()
            }
            SchemaKind::Record(value) => typed(Some(Type::Object), decor)
                .additional_properties(Some(AdditionalProperties::RefOr(self.convert(value, false))))
                .build(),
            SchemaKind::Array(element) => {
                let items = self.convert(element, false);
                let mut builder = ArrayBuilder::new()
                    .items(items)
                    .description(decor.description.clone());
                if decor.nullable {
                    builder = builder.schema_type(SchemaType::from_iter([Type::Array, Type::Null]));
                }
                return RefOr::T(openapi::Schema::Array(builder.build()));
            }
            SchemaKind::Union(options) => {
                let mut builder = OneOfBuilder::new().description(decor.description.clone());
                for option in options {
                    builder = builder.item(self.convert(option, false));
                }
                let one_of = RefOr::T(openapi::Schema::OneOf(builder.build()));
                return nullable_untyped(one_of, decor.nullable);
            }
            // `Any`; wrappers never survive `introspect::unwrap`.
            _ => typed(None, decor).build(),
        };
        RefOr::T(openapi::Schema::Object(built))
    }
}

fn typed(ty: Option<Type>, decor: &Decor) -> ObjectBuilder {
    let mut builder = ObjectBuilder::new()
        .description(decor.description.clone())
        .default(decor.default.clone());
    if let Some(ty) = ty {
        builder = builder.schema_type(if decor.nullable {
            SchemaType::from_iter([ty, Type::Null])
        } else {
            SchemaType::Type(ty)
        });
    }
    builder
}

fn string_rules(builder: ObjectBuilder, rules: &StringRules) -> ObjectBuilder {
    let format = rules.format.map(|format| {
        SchemaFormat::Custom(
            match format {
                StringFormat::Email => "email",
                StringFormat::Uuid => "uuid",
                StringFormat::Url => "uri",
            }
            .to_string(),
        )
    });
    builder
        .min_length(rules.min_len)
        .max_length(rules.max_len)
        .pattern(rules.pattern.as_ref().map(|re| re.as_str().to_string()))
        .format(format)
}

fn json_type(value: &Value) -> Option<Type> {
    match value {
        Value::String(_) => Some(Type::String),
        Value::Number(n) if n.is_f64() => Some(Type::Number),
        Value::Number(_) => Some(Type::Integer),
        Value::Bool(_) => Some(Type::Boolean),
        Value::Null => Some(Type::Null),
        Value::Array(_) => Some(Type::Array),
        Value::Object(_) => Some(Type::Object),
    }
}

fn native_enum(native: &NativeEnum, decor: &Decor) -> openapi::schema::Object {
    let mut types = native.values().iter().map(|(_, value)| json_type(value));
    let first = types.next().flatten();
    let ty = if types.all(|t| t == first) { first } else { None };
    typed(ty, decor)
        .enum_values(Some(native.values().iter().map(|(_, value)| value.clone())))
        .build()
}

fn nullable_untyped(schema: RefOr<openapi::Schema>, nullable: bool) -> RefOr<openapi::Schema> {
    if !nullable {
        return schema;
    }
    let null = ObjectBuilder::new().schema_type(Type::Null).build();
    RefOr::T(openapi::Schema::OneOf(
        OneOfBuilder::new()
            .item(schema)
            .item(RefOr::T(openapi::Schema::Object(null)))
            .build(),
    ))
}

/// Builds an OpenAPI document whose components are the DTOs registered with a
/// bridge. References between registered DTOs become `$ref`s.
pub struct OpenApiDocBuilder {
    title: String,
    version: String,
    description: Option<String>,
    dtos: Vec<(String, Schema)>,
}

impl OpenApiDocBuilder {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            dtos: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn dto(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.dtos.push((name.into(), schema));
        self
    }

    /// Adds every class registered with `bridge` under its GraphQL name.
    pub fn registered(mut self, bridge: &Bridge) -> Self {
        for (class, schema) in bridge.registry().entries() {
            self.dtos.push((class.display_name(), schema));
        }
        self
    }

    pub fn build(self) -> openapi::OpenApi {
        let mut openapi = openapi::OpenApiBuilder::new()
            .info(
                openapi::InfoBuilder::new()
                    .title(self.title.as_str())
                    .version(self.version.as_str())
                    .description(self.description.as_deref())
                    .build(),
            )
            .paths(openapi::Paths::new())
            .build();

        let refs: HashMap<SchemaId, String> = self
            .dtos
            .iter()
            .map(|(name, schema)| (introspect::unwrap(schema).id(), name.clone()))
            .collect();
        let schemas: BTreeMap<String, RefOr<openapi::Schema>> = self
            .dtos
            .iter()
            .map(|(name, schema)| {
                let mut converter = Converter {
                    refs: Some(&refs),
                    stack: Vec::new(),
                };
                (name.clone(), converter.convert(schema, true))
            })
            .collect();

        openapi.components = Some(ComponentsBuilder::new().schemas_from_iter(schemas).build());
        openapi
    }
}
