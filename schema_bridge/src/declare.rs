//! DTOs declared statically with `#[object_type]` / `#[input_type]`.
//!
//! Each attribute submits a [`DtoDeclaration`] to `inventory`. Link order
//! decides iteration order, so declarations routinely reference schemas whose
//! class is declared later; [`Bridge::bootstrap`] decorates everything in one
//! batch and drains once at the end.

use crate::bridge::Bridge;
use crate::class::DtoClass;
use crate::decorate::TypeArgs;
use crate::schema::Schema;
use crate::types::TypeFlavor;

pub struct DtoDeclaration {
    pub name: &'static str,
    pub graphql_name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub flavor: TypeFlavor,
    pub schema: fn() -> Schema,
}

inventory::collect!(DtoDeclaration);

/// Implemented by the attribute macros for the annotated struct.
pub trait DeclaredDto {
    const NAME: &'static str;

    fn schema() -> Schema;

    /// The class bootstrapped for this declaration on the global bridge.
    fn class() -> Option<DtoClass> {
        Bridge::global().declared(Self::NAME)
    }
}

impl Bridge {
    /// Decorates every collected declaration not seen before; returns how many were new.
    pub fn bootstrap(&self) -> usize {
        self.bootstrap_from(inventory::iter::<DtoDeclaration>)
    }

    pub fn bootstrap_from<'a>(&self, declarations: impl IntoIterator<Item = &'a DtoDeclaration>) -> usize {
        let count = self.batch(|| {
            let mut count = 0;
            for declaration in declarations {
                if self.inner().declared.lock().contains_key(declaration.name) {
                    continue;
                }
                let mut builder = DtoClass::declare(declaration.name).schema((declaration.schema)());
                if let Some(description) = declaration.description {
                    builder = builder.description(description);
                }
                let class = builder.finish();

                let mut args = TypeArgs::default();
                if let Some(name) = declaration.graphql_name {
                    args = args.name(name);
                }
                match declaration.flavor {
                    TypeFlavor::Object => self.object_type(&class, args),
                    TypeFlavor::Input => self.input_type(&class, args),
                };
                self.inner().declared.lock().insert(declaration.name, class);
                count += 1;
            }
            count
        });
        tracing::debug!(count, "bootstrapped declared DTOs");
        count
    }

    pub fn declared(&self, name: &str) -> Option<DtoClass> {
        self.inner().declared.lock().get(name).cloned()
    }
}
