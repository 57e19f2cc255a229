//! Schema node → target type.

use crate::bridge::Bridge;
use crate::class::DtoClass;
use crate::decorate::{Registration, TypeArgs};
use crate::diagnostics::{Diagnostic, Fallback, Reason};
use crate::enums::Synthesized;
use crate::introspect::{self, Children, NodeKind, PrimitiveKind};
use crate::registry::fits;
use crate::schema::{Schema, SchemaKind};
use crate::types::{Scalar, TargetType, TypeFlavor, TypeThunk};
use serde_json::Value;
use std::sync::atomic::Ordering;

impl Bridge {
    /// Never fails: unknown shapes degrade to `String`, unresolved objects to
    /// the opaque placeholder or a generated class.
    pub fn resolve_field_type(&self, schema: &Schema, is_input: bool) -> TargetType {
        self.map_node(schema, TypeFlavor::from_input(is_input), "")
    }

    /// Evaluates the type recorded for one decorated field.
    pub fn graphql_field_type(&self, class: &DtoClass, field: &str) -> Option<TargetType> {
        class.field(field).map(|meta| meta.ty.resolve())
    }

    pub(crate) fn map_node(&self, schema: &Schema, flavor: TypeFlavor, path: &str) -> TargetType {
        let node = introspect::unwrap(schema);
        match introspect::kind_of(node) {
            NodeKind::Primitive(primitive) => TargetType::Scalar(match primitive {
                PrimitiveKind::String => Scalar::String,
                PrimitiveKind::Number => Scalar::Float,
                PrimitiveKind::Integer => Scalar::Int,
                PrimitiveKind::Boolean => Scalar::Boolean,
                PrimitiveKind::Date => Scalar::DateTime,
            }),
            NodeKind::Array => match introspect::children_of(node) {
                Children::Element(element) => TargetType::List {
                    item: Box::new(self.map_node(element, flavor, path)),
                    nullable_items: introspect::is_nullable(element),
                },
                _ => TargetType::Opaque,
            },
            NodeKind::Object => self.map_object(node, flavor, path),
            NodeKind::Enum | NodeKind::NativeEnum | NodeKind::Union => {
                match self.enums().synthesize(node, self.host(), self.diagnostics(), path) {
                    // Empty enums are never registered, so nothing may reference them.
                    Synthesized::Enum(enum_type) if enum_type.is_empty() => TargetType::Scalar(Scalar::String),
                    Synthesized::Enum(enum_type) => TargetType::Enum(enum_type),
                    Synthesized::StringFallback => TargetType::Scalar(Scalar::String),
                }
            }
            NodeKind::Literal => match node.kind() {
                SchemaKind::Literal(Value::Bool(_)) => TargetType::Scalar(Scalar::Boolean),
                SchemaKind::Literal(Value::Number(n)) if n.is_f64() => TargetType::Scalar(Scalar::Float),
                SchemaKind::Literal(Value::Number(_)) => TargetType::Scalar(Scalar::Int),
                _ => TargetType::Scalar(Scalar::String),
            },
            other => {
                self.diagnose(Diagnostic::new(path, Reason::UnsupportedKind(other), Fallback::StringScalar));
                TargetType::Scalar(Scalar::String)
            }
        }
    }

    fn map_object(&self, schema: &Schema, flavor: TypeFlavor, path: &str) -> TargetType {
        let found = self.registry().class_for(schema);
        if let Some(class) = &found {
            if fits(class, flavor) {
                return TargetType::Class(class.clone());
            }
        }
        if !self.is_settled() {
            self.registry().schedule_drain();
            tracing::debug!(path, schema = %schema.id(), "object reference deferred");
            return TargetType::Opaque;
        }
        if !self.config().registry.auto_generate {
            if let Some(class) = found {
                return TargetType::Class(class);
            }
            self.diagnose(Diagnostic::new(path, Reason::UnresolvedReference, Fallback::OpaqueObject));
            return TargetType::Opaque;
        }
        let class = self
            .registry()
            .resolve_with_auto_generation(schema, flavor, |schema, flavor, base| {
                self.generate_class(schema, flavor, base, path)
            });
        TargetType::Class(class)
    }

    /// Field type handed to the host. Types that could not be pinned down yet
    /// are re-resolved every time the host evaluates the thunk.
    pub(crate) fn field_thunk(&self, schema: &Schema, flavor: TypeFlavor, path: &str) -> TypeThunk {
        let eager = self.map_node(schema, flavor, path);
        if !eager.is_opaque() {
            return TypeThunk::fixed(eager);
        }
        let bridge = self.downgrade();
        let schema = schema.clone();
        let path = path.to_string();
        TypeThunk::new(move || match bridge.upgrade() {
            Some(bridge) => bridge.map_node(&schema, flavor, &path),
            None => TargetType::Opaque,
        })
    }

    fn generate_class(
        &self,
        schema: &Schema,
        flavor: TypeFlavor,
        base: Option<&DtoClass>,
        path: &str,
    ) -> DtoClass {
        let name = match base {
            Some(base) => format!(
                "{}{}",
                base.display_name(),
                if flavor.is_input() { "Input" } else { "Output" }
            ),
            None => {
                let n = self.inner().generated_count.fetch_add(1, Ordering::SeqCst) + 1;
                if flavor.is_input() {
                    format!("GeneratedInput{}", n)
                } else {
                    format!("GeneratedType{}", n)
                }
            }
        };
        if base.is_none() {
            self.diagnose(Diagnostic::new(
                path,
                Reason::UnresolvedReference,
                Fallback::AutoGenerated(name.clone()),
            ));
        }
        tracing::debug!(name = %name, schema = %schema.id(), "generating class");

        let mut class = DtoClass::declare(name.as_str()).schema(schema.clone()).generated();
        if let Some(description) = introspect::description_of(schema) {
            class = class.description(description);
        }
        let class = class.finish();
        self.decorate(&class, TypeArgs::default(), flavor, Registration::Generated);
        class
    }
}
