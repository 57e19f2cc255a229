//! `object_type` / `input_type` decoration.

use crate::bridge::Bridge;
use crate::class::{DecorationState, DtoClass, FieldMeta};
use crate::diagnostics::{Diagnostic, Fallback, Reason};
use crate::dto::{SchemaAlgebra, SchemaDto};
use crate::host::{FieldOptions, GraphqlHost, HostError, InputTypeOptions, ObjectTypeOptions};
use crate::introspect;
use crate::schema::Schema;
use crate::types::TypeFlavor;

/// Decorator arguments. Everything is optional; the schema is taken from the
/// class when not given here.
#[derive(Debug, Clone, Default)]
pub struct TypeArgs {
    pub schema: Option<Schema>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_abstract: bool,
}

impl TypeArgs {
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    /// Record in the registry and queue for the drain pass.
    Tracked,
    /// Synthesized on demand; must not claim the schema.
    Generated,
}

/// Own schema, legacy slot, attached algebra, then the parent chain.
fn extract_schema(class: &DtoClass) -> Option<Schema> {
    class
        .own_schema()
        .or(class.legacy_schema())
        .or(class.algebra().map(|dto| dto.schema()))
        .cloned()
        .or_else(|| class.parent().and_then(extract_schema))
}

impl Bridge {
    pub fn object_type(&self, class: &DtoClass, args: TypeArgs) -> DtoClass {
        self.decorate(class, args, TypeFlavor::Object, Registration::Tracked);
        class.clone()
    }

    pub fn input_type(&self, class: &DtoClass, args: TypeArgs) -> DtoClass {
        self.decorate(class, args, TypeFlavor::Input, Registration::Tracked);
        class.clone()
    }

    pub(crate) fn decorate(
        &self,
        class: &DtoClass,
        args: TypeArgs,
        flavor: TypeFlavor,
        registration: Registration,
    ) {
        if class.decoration_state() == DecorationState::Registered {
            tracing::debug!(class = class.name(), "already decorated");
            return;
        }
        self.batch(|| {
            let name = args.name.clone().unwrap_or_else(|| class.name().to_string());
            let schema = args.schema.clone().or_else(|| extract_schema(class));
            match &schema {
                Some(schema) => {
                    if !class.is_zod_dto() {
                        class.attach_algebra(SchemaDto::new(class.name(), schema.clone()));
                    }
                }
                None => self.diagnose(Diagnostic::new(
                    name.as_str(),
                    Reason::MissingSchema,
                    Fallback::NoFields,
                )),
            }
            class.advance(DecorationState::SchemaResolved);
            class.set_graphql_identity(flavor, &name);

            let mut host = self.host();
            if host.is_none() {
                self.diagnose(Diagnostic::new(
                    name.as_str(),
                    Reason::HostUnavailable,
                    Fallback::SkipRegistration,
                ));
            }

            let shape = schema.as_ref().and_then(|s| introspect::unwrap(s).as_object());
            if let Some(shape) = shape {
                for (field, field_schema) in &shape.fields {
                    let path = format!("{}.{}", name, field);
                    let nullable = introspect::is_nullable(field_schema);
                    let description = introspect::description_of(field_schema).map(str::to_string);
                    let ty = self.field_thunk(field_schema, flavor, &path);
                    if let Some(h) = host {
                        let options = FieldOptions {
                            nullable,
                            description: description.clone(),
                        };
                        if let Err(e) = h.register_field(class, field, ty.clone(), options) {
                            self.host_failed(&path, e);
                            host = None;
                        }
                    }
                    class.push_field(FieldMeta {
                        name: field.clone(),
                        nullable,
                        description,
                        ty,
                    });
                    class.ensure_property(field);
                }
                class.advance(DecorationState::FieldsMapped);
            }

            if let Some(h) = host {
                let description = args
                    .description
                    .clone()
                    .or_else(|| class.description().map(str::to_string))
                    .or_else(|| schema.as_ref().and_then(introspect::description_of).map(str::to_string));
                if let Err(e) = register_type(h, class, &name, flavor, description, args.is_abstract) {
                    self.host_failed(&name, e);
                }
            }

            if let (Registration::Tracked, Some(schema)) = (registration, &schema) {
                let outcome = self.registry().register(class, schema);
                tracing::debug!(class = %name, ?outcome, "registered class");
                self.registry().enqueue_pending(class, schema);
            }
            class.advance(DecorationState::Registered);
        });
    }

    fn host_failed(&self, path: &str, error: HostError) {
        let reason = match error {
            HostError::Unavailable(_) => Reason::HostUnavailable,
            rejected => Reason::HostRejected(rejected.to_string()),
        };
        self.diagnose(Diagnostic::new(path, reason, Fallback::SkipRegistration));
    }
}

fn register_type(
    host: &dyn GraphqlHost,
    class: &DtoClass,
    name: &str,
    flavor: TypeFlavor,
    description: Option<String>,
    is_abstract: bool,
) -> Result<(), HostError> {
    match flavor {
        TypeFlavor::Object => host.register_object_type(
            class,
            name,
            ObjectTypeOptions {
                description,
                is_abstract,
            },
        ),
        TypeFlavor::Input => host.register_input_type(class, name, InputTypeOptions { description }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::host::{EnumOptions, TypeCollector};
    use crate::types::{EnumType, TypeThunk};
    use std::sync::Arc;

    struct BrokenHost;

    impl GraphqlHost for BrokenHost {
        fn register_object_type(&self, _: &DtoClass, _: &str, _: ObjectTypeOptions) -> Result<(), HostError> {
            Err(HostError::Unavailable("not loaded".into()))
        }

        fn register_input_type(&self, _: &DtoClass, _: &str, _: InputTypeOptions) -> Result<(), HostError> {
            Err(HostError::Unavailable("not loaded".into()))
        }

        fn register_field(&self, _: &DtoClass, _: &str, _: TypeThunk, _: FieldOptions) -> Result<(), HostError> {
            Err(HostError::Unavailable("not loaded".into()))
        }

        fn register_enum(&self, _: &EnumType, _: EnumOptions) -> Result<(), HostError> {
            Err(HostError::Unavailable("not loaded".into()))
        }
    }

    #[test]
    fn schema_is_taken_from_the_parent_chain() {
        let schema = Schema::object([("id", Schema::int())]);
        let base = DtoClass::declare("Base").schema(schema.clone()).finish();
        let child = DtoClass::declare("Child").extends(&base).finish();
        assert!(extract_schema(&child).is_some_and(|s| s.ptr_eq(&schema)));

        let legacy = DtoClass::declare("Legacy").legacy_schema(schema.clone()).finish();
        assert!(extract_schema(&legacy).is_some_and(|s| s.ptr_eq(&schema)));
    }

    #[test]
    fn decoration_walks_every_state() {
        let host = Arc::new(TypeCollector::new());
        let bridge = Bridge::builder().host(host.clone()).build();
        let schema = Schema::object([("id", Schema::int()), ("tags", Schema::string().array().optional())]);
        let class = DtoClass::declare("Post").schema(schema).finish();
        assert_eq!(class.decoration_state(), DecorationState::Undecorated);

        bridge.object_type(&class, TypeArgs::default().description("A post"));
        assert_eq!(class.decoration_state(), DecorationState::Registered);
        assert!(class.is_zod_dto());
        assert_eq!(class.properties(), ["id", "tags"]);
        assert!(class.field("tags").is_some_and(|f| f.nullable));

        let resolved = host.resolve();
        let post = resolved.find("Post").expect("registered");
        assert_eq!(post.description.as_deref(), Some("A post"));
        assert_eq!(post.fields[1].ty.render(post.fields[1].nullable), "[String!]");
    }

    #[test]
    fn redecorating_is_a_no_op() {
        let host = Arc::new(TypeCollector::new());
        let bridge = Bridge::builder().host(host.clone()).build();
        let class = DtoClass::declare("Once")
            .schema(Schema::object([("a", Schema::string())]))
            .finish();
        bridge.object_type(&class, TypeArgs::default());
        bridge.object_type(&class, TypeArgs::default());
        assert_eq!(host.field_names(&class), ["a"]);
        assert_eq!(host.type_names(TypeFlavor::Object), ["Once"]);
    }

    #[test]
    fn missing_schema_registers_an_empty_type() {
        let sink = Arc::new(CollectingDiagnostics::new());
        let host = Arc::new(TypeCollector::new());
        let bridge = Bridge::builder().host(host.clone()).diagnostics(sink.clone()).build();
        let class = DtoClass::declare("Bare").finish();
        bridge.input_type(&class, TypeArgs::default().name("BareInput"));
        assert_eq!(host.type_names(TypeFlavor::Input), ["BareInput"]);
        assert!(class.fields().is_empty());
        assert!(!class.is_zod_dto());
        assert_eq!(sink.count(|r| *r == Reason::MissingSchema), 1);
    }

    #[test]
    fn failing_host_downgrades_to_bookkeeping() {
        let sink = Arc::new(CollectingDiagnostics::new());
        let bridge = Bridge::builder()
            .host(Arc::new(BrokenHost))
            .diagnostics(sink.clone())
            .build();
        let schema = Schema::object([("a", Schema::string()), ("b", Schema::int())]);
        let class = DtoClass::declare("Kept").schema(schema.clone()).finish();
        bridge.object_type(&class, TypeArgs::default());

        assert_eq!(sink.count(|r| *r == Reason::HostUnavailable), 1);
        assert_eq!(bridge.registry().class_for(&schema), Some(class.clone()));
        assert_eq!(class.fields().len(), 2);
        assert!(class.algebra().is_some_and(|dto| dto.parse(&serde_json::json!({"a": "x", "b": 1})).is_ok()));
    }
}
