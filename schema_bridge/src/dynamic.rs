//! Feeds collected registrations into an `async-graphql` dynamic schema.

use crate::host::{enum_value_name, ResolvedSchema, TypeCollector};
use crate::types::{TargetType, TypeFlavor};
use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, InputObject, InputValue, Interface, InterfaceField, Object,
    Scalar, SchemaBuilder, TypeRef,
};

fn type_ref(ty: &TargetType, nullable: bool) -> TypeRef {
    let base = match ty {
        TargetType::List {
            item,
            nullable_items,
        } => TypeRef::List(Box::new(type_ref(item, *nullable_items))),
        other => TypeRef::Named(other.named_type().into()),
    };
    if nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

impl TypeCollector {
    /// Registers every collected type, enum and custom scalar on `builder`.
    /// Object fields resolve to `null`; callers attach real resolvers on
    /// their own root types.
    pub fn register_dynamic(&self, builder: SchemaBuilder) -> SchemaBuilder {
        register_resolved(&self.resolve(), builder)
    }
}

pub fn register_resolved(resolved: &ResolvedSchema, mut builder: SchemaBuilder) -> SchemaBuilder {
    for scalar in resolved.custom_scalars() {
        builder = builder.register(Scalar::new(scalar));
    }
    for enum_type in &resolved.enums {
        let mut dynamic = Enum::new(enum_type.name());
        for label in enum_type.labels() {
            dynamic = dynamic.item(EnumItem::new(enum_value_name(label)));
        }
        builder = builder.register(dynamic);
    }
    for ty in &resolved.types {
        builder = match ty.flavor {
            TypeFlavor::Input => {
                let mut input = InputObject::new(ty.name.as_str());
                if let Some(description) = &ty.description {
                    input = input.description(description.as_str());
                }
                for field in &ty.fields {
                    let mut value = InputValue::new(field.name.as_str(), type_ref(&field.ty, field.nullable));
                    if let Some(description) = &field.description {
                        value = value.description(description.as_str());
                    }
                    input = input.field(value);
                }
                builder.register(input)
            }
            TypeFlavor::Object if ty.is_abstract => {
                let mut interface = Interface::new(ty.name.as_str());
                if let Some(description) = &ty.description {
                    interface = interface.description(description.as_str());
                }
                for field in &ty.fields {
                    let mut dynamic = InterfaceField::new(field.name.as_str(), type_ref(&field.ty, field.nullable));
                    if let Some(description) = &field.description {
                        dynamic = dynamic.description(description.as_str());
                    }
                    interface = interface.field(dynamic);
                }
                builder.register(interface)
            }
            TypeFlavor::Object => {
                let mut object = Object::new(ty.name.as_str());
                if let Some(description) = &ty.description {
                    object = object.description(description.as_str());
                }
                for field in &ty.fields {
                    let mut dynamic = Field::new(
                        field.name.as_str(),
                        type_ref(&field.ty, field.nullable),
                        |_| FieldFuture::from_value(None),
                    );
                    if let Some(description) = &field.description {
                        dynamic = dynamic.description(description.as_str());
                    }
                    object = object.field(dynamic);
                }
                builder.register(object)
            }
        };
    }
    builder
}
