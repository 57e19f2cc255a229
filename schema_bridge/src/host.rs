//! The GraphQL schema-building capability the bridge emits registrations to.
//!
//! [`TypeCollector`] is the in-process host: it records registrations in call
//! order and renders them as SDL once declarations have settled.

use crate::class::{ClassId, DtoClass};
use crate::types::{EnumType, Scalar, TargetType, TypeFlavor, TypeThunk};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum HostError {
    #[error("GraphQL host unavailable: {0}")]
    Unavailable(String),
    #[error("GraphQL host rejected `{name}`: {reason}")]
    Rejected { name: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ObjectTypeOptions {
    pub description: Option<String>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InputTypeOptions {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub nullable: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnumOptions {
    pub name: String,
}

pub trait GraphqlHost: Send + Sync {
    fn register_object_type(
        &self,
        class: &DtoClass,
        name: &str,
        options: ObjectTypeOptions,
    ) -> Result<(), HostError>;

    fn register_input_type(
        &self,
        class: &DtoClass,
        name: &str,
        options: InputTypeOptions,
    ) -> Result<(), HostError>;

    fn register_field(
        &self,
        class: &DtoClass,
        field: &str,
        ty: TypeThunk,
        options: FieldOptions,
    ) -> Result<(), HostError>;

    fn register_enum(&self, enum_type: &EnumType, options: EnumOptions) -> Result<(), HostError>;
}

#[derive(Debug, Clone)]
struct RecordedType {
    class: ClassId,
    name: String,
    flavor: TypeFlavor,
    description: Option<String>,
    is_abstract: bool,
}

#[derive(Debug, Clone)]
struct RecordedField {
    name: String,
    ty: TypeThunk,
    options: FieldOptions,
}

#[derive(Default)]
struct CollectorState {
    types: Vec<RecordedType>,
    fields: HashMap<ClassId, Vec<RecordedField>>,
    enums: Vec<EnumType>,
}

/// A field after its type thunk was evaluated.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub ty: TargetType,
    pub nullable: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub name: String,
    pub flavor: TypeFlavor,
    pub description: Option<String>,
    pub is_abstract: bool,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    pub types: Vec<ResolvedType>,
    pub enums: Vec<EnumType>,
}

impl ResolvedSchema {
    pub fn find(&self, name: &str) -> Option<&ResolvedType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Non-builtin scalars referenced by any field.
    pub fn custom_scalars(&self) -> BTreeSet<&'static str> {
        let mut scalars = BTreeSet::new();
        for ty in &self.types {
            for field in &ty.fields {
                collect_scalars(&field.ty, &mut scalars);
            }
        }
        scalars
    }
}

#[derive(Default)]
pub struct TypeCollector {
    state: Mutex<CollectorState>,
}

impl TypeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered type names of the given flavour, in registration order.
    pub fn type_names(&self, flavor: TypeFlavor) -> Vec<String> {
        self.state
            .lock()
            .types
            .iter()
            .filter(|t| t.flavor == flavor)
            .map(|t| t.name.clone())
            .collect()
    }

    /// Field registrations made for one class, in call order.
    pub fn field_names(&self, class: &DtoClass) -> Vec<String> {
        self.state
            .lock()
            .fields
            .get(&class.id())
            .map(|fields| fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn enum_registrations(&self) -> Vec<EnumType> {
        self.state.lock().enums.clone()
    }

    /// Evaluates every type thunk. Thunks may register more types (generated
    /// classes) while this runs; those are picked up in the same pass.
    pub fn resolve(&self) -> ResolvedSchema {
        let mut resolved = ResolvedSchema::default();
        let mut index = 0;
        loop {
            let next = {
                let state = self.state.lock();
                state.types.get(index).cloned().map(|recorded| {
                    let fields = state.fields.get(&recorded.class).cloned().unwrap_or_default();
                    (recorded, fields)
                })
            };
            let Some((recorded, fields)) = next else {
                break;
            };
            let fields = fields
                .into_iter()
                .map(|field| ResolvedField {
                    name: field.name,
                    ty: field.ty.resolve(),
                    nullable: field.options.nullable,
                    description: field.options.description,
                })
                .collect();
            resolved.types.push(ResolvedType {
                name: recorded.name,
                flavor: recorded.flavor,
                description: recorded.description,
                is_abstract: recorded.is_abstract,
                fields,
            });
            index += 1;
        }
        resolved.enums = self.enum_registrations();
        resolved
    }

    pub fn to_sdl(&self) -> String {
        render_sdl(&self.resolve())
    }
}

impl GraphqlHost for TypeCollector {
    fn register_object_type(
        &self,
        class: &DtoClass,
        name: &str,
        options: ObjectTypeOptions,
    ) -> Result<(), HostError> {
        self.state.lock().types.push(RecordedType {
            class: class.id(),
            name: name.to_string(),
            flavor: TypeFlavor::Object,
            description: options.description,
            is_abstract: options.is_abstract,
        });
        Ok(())
    }

    fn register_input_type(
        &self,
        class: &DtoClass,
        name: &str,
        options: InputTypeOptions,
    ) -> Result<(), HostError> {
        self.state.lock().types.push(RecordedType {
            class: class.id(),
            name: name.to_string(),
            flavor: TypeFlavor::Input,
            description: options.description,
            is_abstract: false,
        });
        Ok(())
    }

    fn register_field(
        &self,
        class: &DtoClass,
        field: &str,
        ty: TypeThunk,
        options: FieldOptions,
    ) -> Result<(), HostError> {
        self.state
            .lock()
            .fields
            .entry(class.id())
            .or_default()
            .push(RecordedField {
                name: field.to_string(),
                ty,
                options,
            });
        Ok(())
    }

    fn register_enum(&self, enum_type: &EnumType, options: EnumOptions) -> Result<(), HostError> {
        if enum_type.is_empty() {
            return Err(HostError::Rejected {
                name: options.name,
                reason: "enum must declare at least one value".to_string(),
            });
        }
        self.state.lock().enums.push(enum_type.clone());
        Ok(())
    }
}

fn collect_scalars(ty: &TargetType, into: &mut BTreeSet<&'static str>) {
    match ty {
        TargetType::Scalar(scalar) if scalar.is_custom() => {
            into.insert(scalar.graphql_name());
        }
        TargetType::Opaque => {
            into.insert(Scalar::Json.graphql_name());
        }
        TargetType::List { item, .. } => collect_scalars(item, into),
        _ => {}
    }
}

fn write_description(out: &mut String, description: Option<&str>, indent: &str) {
    if let Some(text) = description {
        let _ = writeln!(out, "{}\"\"\"{}\"\"\"", indent, text.replace("\"\"\"", "\\\"\"\""));
    }
}

/// GraphQL enum values must be names; anything else is prefixed and cleaned.
pub(crate) fn enum_value_name(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => cleaned,
        _ => format!("_{}", cleaned),
    }
}

pub fn render_sdl(schema: &ResolvedSchema) -> String {
    let mut out = String::new();
    for scalar in schema.custom_scalars() {
        let _ = writeln!(out, "scalar {}\n", scalar);
    }
    for enum_type in &schema.enums {
        let _ = writeln!(out, "enum {} {{", enum_type.name());
        for label in enum_type.labels() {
            let _ = writeln!(out, "  {}", enum_value_name(label));
        }
        out.push_str("}\n\n");
    }
    for ty in &schema.types {
        write_description(&mut out, ty.description.as_deref(), "");
        let keyword = match ty.flavor {
            TypeFlavor::Object if ty.is_abstract => "interface",
            TypeFlavor::Object => "type",
            TypeFlavor::Input => "input",
        };
        let _ = writeln!(out, "{} {} {{", keyword, ty.name);
        for field in &ty.fields {
            write_description(&mut out, field.description.as_deref(), "  ");
            let _ = writeln!(out, "  {}: {}", field.name, field.ty.render(field.nullable));
        }
        out.push_str("}\n\n");
    }
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeThunk;

    #[test]
    fn renders_recorded_types_and_scalars() {
        let collector = TypeCollector::new();
        let class = DtoClass::declare("Event").finish();
        collector
            .register_field(&class, "at", TypeThunk::fixed(TargetType::Scalar(Scalar::DateTime)), FieldOptions::default())
            .unwrap();
        collector
            .register_field(
                &class,
                "payload",
                TypeThunk::fixed(TargetType::Opaque),
                FieldOptions {
                    nullable: true,
                    description: Some("raw".into()),
                },
            )
            .unwrap();
        collector
            .register_object_type(&class, "Event", ObjectTypeOptions::default())
            .unwrap();

        let sdl = collector.to_sdl();
        assert!(sdl.contains("scalar DateTime"));
        assert!(sdl.contains("scalar JSON"));
        assert!(sdl.contains("type Event {\n  at: DateTime!\n  \"\"\"raw\"\"\"\n  payload: JSON\n}"));
    }

    #[test]
    fn empty_enums_are_rejected() {
        let collector = TypeCollector::new();
        let err = collector
            .register_enum(&EnumType::new("EmptyEnum", vec![]), EnumOptions { name: "EmptyEnum".into() })
            .unwrap_err();
        assert!(matches!(err, HostError::Rejected { .. }));
        assert!(collector.enum_registrations().is_empty());
    }

    #[test]
    fn enum_values_are_made_valid_names() {
        assert_eq!(enum_value_name("in-progress"), "in_progress");
        assert_eq!(enum_value_name("1"), "_1");
        assert_eq!(enum_value_name("DONE"), "DONE");
    }
}
