//! Schema ↔ class mapping with forward-reference resolution.
//!
//! Primary maps are keyed by schema identity and stay one-to-one. Matches the
//! drain pass finds through equivalence go into a separate alias table, and
//! classes synthesized on demand live in their own map keyed by flavour, so a
//! later user declaration can still claim its schema.

use crate::class::{ClassId, DtoClass};
use crate::config::{EquivalenceMode, RegistryConfig};
use crate::introspect::{self, Children, NodeKind};
use crate::schema::{Schema, SchemaId};
use crate::types::TypeFlavor;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered,
    /// The exact pair was already known.
    AlreadyRegistered,
    /// Another class claimed the schema first and keeps it.
    SchemaTaken(DtoClass),
    /// The class is already mapped to a different schema.
    ClassTaken,
    /// The schema is a described view of one owned by this class.
    Equivalent(DtoClass),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub processed: usize,
    pub resolved: usize,
    /// `Class.field` paths whose object type is still unknown.
    pub unresolved: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
    by_schema: HashMap<SchemaId, DtoClass>,
    by_class: HashMap<ClassId, Schema>,
    /// Registration order, searched by the equivalence fallback.
    entries: Vec<(DtoClass, Schema)>,
    aliases: HashMap<SchemaId, DtoClass>,
    generated: HashMap<(SchemaId, TypeFlavor), DtoClass>,
    pending: Vec<(DtoClass, Schema)>,
    drain_scheduled: bool,
}

impl RegistryState {
    fn lookup(&self, schema: &Schema) -> Option<DtoClass> {
        self.by_schema
            .get(&schema.id())
            .or_else(|| self.aliases.get(&schema.id()))
            .cloned()
    }

    fn find_equivalent(&self, schema: &Schema) -> Option<DtoClass> {
        self.entries
            .iter()
            .find(|(_, candidate)| described_equivalent(candidate, schema))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(_, candidate)| structurally_equivalent(candidate, schema))
            })
            .map(|(class, _)| class.clone())
    }
}

pub struct Registry {
    config: RegistryConfig,
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn structural(&self) -> bool {
        self.config.equivalence == EquivalenceMode::StructuralEquivalence
    }

    pub fn class_for(&self, schema: &Schema) -> Option<DtoClass> {
        self.state.lock().lookup(schema)
    }

    pub fn schema_for(&self, class: &DtoClass) -> Option<Schema> {
        self.state.lock().by_class.get(&class.id()).cloned()
    }

    pub fn register(&self, class: &DtoClass, schema: &Schema) -> RegisterOutcome {
        let mut state = self.state.lock();
        if let Some(existing) = state.by_schema.get(&schema.id()) {
            return if existing == class {
                RegisterOutcome::AlreadyRegistered
            } else {
                tracing::debug!(schema = %schema.id(), kept = existing.name(), ignored = class.name(), "schema already claimed");
                RegisterOutcome::SchemaTaken(existing.clone())
            };
        }
        if state.by_class.contains_key(&class.id()) {
            return RegisterOutcome::ClassTaken;
        }
        if self.structural() {
            let owner = state
                .entries
                .iter()
                .find(|(_, candidate)| described_equivalent(candidate, schema))
                .map(|(owner, _)| owner.clone());
            if let Some(owner) = owner {
                state.aliases.insert(schema.id(), owner.clone());
                state.by_class.insert(class.id(), schema.clone());
                tracing::debug!(schema = %schema.id(), class = owner.name(), "aliased described schema");
                return RegisterOutcome::Equivalent(owner);
            }
        }
        state.by_schema.insert(schema.id(), class.clone());
        state.by_class.insert(class.id(), schema.clone());
        state.entries.push((class.clone(), schema.clone()));
        tracing::debug!(schema = %schema.id(), class = class.name(), "registered schema");
        RegisterOutcome::Registered
    }

    /// Queues a class for the next drain; returns whether a drain was newly scheduled.
    pub fn enqueue_pending(&self, class: &DtoClass, schema: &Schema) -> bool {
        let mut state = self.state.lock();
        state.pending.push((class.clone(), schema.clone()));
        !std::mem::replace(&mut state.drain_scheduled, true)
    }

    pub fn schedule_drain(&self) -> bool {
        !std::mem::replace(&mut self.state.lock().drain_scheduled, true)
    }

    pub fn is_drain_scheduled(&self) -> bool {
        self.state.lock().drain_scheduled
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Resolves nested object fields of every pending class against the
    /// current registrations, recording equivalence matches as aliases.
    pub fn drain_pending(&self) -> DrainReport {
        let mut state = self.state.lock();
        state.drain_scheduled = false;
        let pending = std::mem::take(&mut state.pending);
        let mut report = DrainReport {
            processed: pending.len(),
            ..DrainReport::default()
        };

        for (class, schema) in &pending {
            let Some(shape) = introspect::unwrap(schema).as_object() else {
                continue;
            };
            for (field, field_schema) in &shape.fields {
                let Some(nested) = nested_object(field_schema) else {
                    continue;
                };
                if state.lookup(nested).is_some() {
                    report.resolved += 1;
                    continue;
                }
                let matched = if self.structural() {
                    state.find_equivalent(nested)
                } else {
                    None
                };
                match matched {
                    Some(owner) => {
                        tracing::debug!(field = %format!("{}.{}", class.name(), field), class = owner.name(), "resolved by equivalence");
                        state.aliases.insert(nested.id(), owner);
                        report.resolved += 1;
                    }
                    None => report.unresolved.push(format!("{}.{}", class.display_name(), field)),
                }
            }
        }
        tracing::debug!(
            processed = report.processed,
            resolved = report.resolved,
            unresolved = report.unresolved.len(),
            "drained pending registrations"
        );
        report
    }

    /// Finds a class of the requested flavour for `schema`, synthesizing one
    /// with `generate` when nothing suitable exists. `generate` receives the
    /// wrong-flavour class when one was found, and runs without the lock held.
    pub fn resolve_with_auto_generation(
        &self,
        schema: &Schema,
        flavor: TypeFlavor,
        generate: impl FnOnce(&Schema, TypeFlavor, Option<&DtoClass>) -> DtoClass,
    ) -> DtoClass {
        let found = {
            let mut state = self.state.lock();
            let found = match state.lookup(schema) {
                Some(class) => Some(class),
                None if self.structural() => {
                    let matched = state.find_equivalent(schema);
                    if let Some(owner) = &matched {
                        state.aliases.insert(schema.id(), owner.clone());
                    }
                    matched
                }
                None => None,
            };
            if let Some(class) = &found {
                if fits(class, flavor) {
                    return class.clone();
                }
            }
            if let Some(generated) = state.generated.get(&(schema.id(), flavor)) {
                return generated.clone();
            }
            found
        };

        let class = generate(schema, flavor, found.as_ref());
        self.state
            .lock()
            .generated
            .entry((schema.id(), flavor))
            .or_insert(class)
            .clone()
    }

    pub fn generated_for(&self, schema: &Schema, flavor: TypeFlavor) -> Option<DtoClass> {
        self.state.lock().generated.get(&(schema.id(), flavor)).cloned()
    }

    /// Registered pairs in registration order.
    pub fn entries(&self) -> Vec<(DtoClass, Schema)> {
        self.state.lock().entries.clone()
    }

    pub fn reset(&self) {
        *self.state.lock() = RegistryState::default();
    }
}

/// A class with no flavour yet (never decorated) fits any context.
pub(crate) fn fits(class: &DtoClass, flavor: TypeFlavor) -> bool {
    class.flavor().map_or(true, |own| own == flavor)
}

/// The object schema a field refers to, directly or as a list element.
fn nested_object(field: &Schema) -> Option<&Schema> {
    let node = introspect::unwrap(field);
    match introspect::children_of(node) {
        Children::Fields(_) => Some(node),
        Children::Element(element) => {
            let element = introspect::unwrap(element);
            (introspect::kind_of(element) == NodeKind::Object).then_some(element)
        }
        _ => None,
    }
}

fn described_root(schema: &Schema) -> &Schema {
    let mut current = schema;
    while let Some(origin) = current.origin() {
        current = origin;
    }
    current
}

/// One schema is a description wrapper around the other, or both wrap the same one.
pub fn described_equivalent(a: &Schema, b: &Schema) -> bool {
    described_root(a).ptr_eq(described_root(b))
}

/// Both are objects with the same set of field names.
pub fn structurally_equivalent(a: &Schema, b: &Schema) -> bool {
    let (Some(a), Some(b)) = (
        introspect::unwrap(a).as_object(),
        introspect::unwrap(b).as_object(),
    ) else {
        return false;
    };
    let a: BTreeSet<&str> = a.field_names().collect();
    let b: BTreeSet<&str> = b.field_names().collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> Schema {
        Schema::object([("id", Schema::int()), ("name", Schema::string())])
    }

    fn strict() -> Registry {
        Registry::new(RegistryConfig {
            equivalence: EquivalenceMode::StrictIdentityOnly,
            auto_generate: true,
        })
    }

    #[test]
    fn first_registration_wins() {
        let registry = Registry::new(RegistryConfig::default());
        let schema = user_schema();
        let first = DtoClass::declare("First").finish();
        let second = DtoClass::declare("Second").finish();

        assert_eq!(registry.register(&first, &schema), RegisterOutcome::Registered);
        assert_eq!(registry.register(&first, &schema), RegisterOutcome::AlreadyRegistered);
        assert_eq!(
            registry.register(&second, &schema),
            RegisterOutcome::SchemaTaken(first.clone())
        );
        for _ in 0..3 {
            assert_eq!(registry.class_for(&schema), Some(first.clone()));
        }
        assert!(registry.schema_for(&first).is_some_and(|s| s.ptr_eq(&schema)));
        assert!(registry.schema_for(&second).is_none());
    }

    #[test]
    fn identity_not_structure_keys_lookups() {
        let registry = strict();
        let schema = user_schema();
        let class = DtoClass::declare("User").finish();
        registry.register(&class, &schema);
        assert!(registry.class_for(&user_schema()).is_none());
        assert!(registry.class_for(&schema.fork()).is_none());
        assert_eq!(registry.class_for(&schema.clone()), Some(class));
    }

    #[test]
    fn one_schema_per_class() {
        let registry = Registry::new(RegistryConfig::default());
        let class = DtoClass::declare("User").finish();
        registry.register(&class, &user_schema());
        assert_eq!(registry.register(&class, &user_schema()), RegisterOutcome::ClassTaken);
    }

    #[test]
    fn described_views_alias_under_structural_mode_only() {
        let schema = user_schema();
        let described = schema.describe("A user");

        let registry = Registry::new(RegistryConfig::default());
        let a = DtoClass::declare("A").finish();
        let b = DtoClass::declare("B").finish();
        registry.register(&a, &schema);
        assert_eq!(registry.register(&b, &described), RegisterOutcome::Equivalent(a.clone()));
        assert_eq!(registry.class_for(&described), Some(a.clone()));

        let registry = strict();
        registry.register(&a, &schema);
        assert_eq!(registry.register(&b, &described), RegisterOutcome::Registered);
        assert_eq!(registry.class_for(&described), Some(b));
    }

    #[test]
    fn drain_is_coalesced_and_resolves_equivalents() {
        let registry = Registry::new(RegistryConfig::default());
        let address = Schema::object([("city", Schema::string())]);
        let address_class = DtoClass::declare("Address").finish();
        registry.register(&address_class, &address);

        let lookalike = Schema::object([("city", Schema::string().describe("town"))]);
        let order = Schema::object([
            ("shipTo", lookalike.clone()),
            ("billTo", address.describe("billing").optional()),
            ("missing", Schema::object([("x", Schema::int())]).array()),
        ]);
        let order_class = DtoClass::declare("Order").finish();
        registry.register(&order_class, &order);

        assert!(registry.enqueue_pending(&order_class, &order));
        assert!(!registry.enqueue_pending(&address_class, &address));
        assert!(!registry.schedule_drain());

        let report = registry.drain_pending();
        assert_eq!(report.processed, 2);
        assert_eq!(report.resolved, 2);
        assert_eq!(report.unresolved, ["Order.missing"]);
        assert!(!registry.is_drain_scheduled());
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(registry.class_for(&lookalike), Some(address_class));
    }

    #[test]
    fn strict_drain_leaves_lookalikes_unresolved() {
        let registry = strict();
        let address = Schema::object([("city", Schema::string())]);
        registry.register(&DtoClass::declare("Address").finish(), &address);
        let order = Schema::object([("shipTo", Schema::object([("city", Schema::string())]))]);
        let order_class = DtoClass::declare("Order").finish();
        registry.register(&order_class, &order);
        registry.enqueue_pending(&order_class, &order);
        assert_eq!(registry.drain_pending().unresolved, ["Order.shipTo"]);
    }

    #[test]
    fn auto_generation_runs_once_per_schema_and_flavor() {
        let registry = strict();
        let schema = user_schema();
        let mut calls = 0;
        let first = registry.resolve_with_auto_generation(&schema, TypeFlavor::Object, |_, _, base| {
            calls += 1;
            assert!(base.is_none());
            DtoClass::declare("GeneratedType1").finish()
        });
        let second = registry.resolve_with_auto_generation(&schema, TypeFlavor::Object, |_, _, _| {
            unreachable!("cached")
        });
        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert!(registry.class_for(&schema).is_none());
        assert_eq!(registry.generated_for(&schema, TypeFlavor::Object), Some(first));
    }

    #[test]
    fn wrong_flavor_gets_a_counterpart() {
        let registry = Registry::new(RegistryConfig::default());
        let schema = user_schema();
        let user = DtoClass::declare("User").finish();
        user.set_graphql_identity(TypeFlavor::Object, "User");
        registry.register(&user, &schema);

        assert_eq!(
            registry.resolve_with_auto_generation(&schema, TypeFlavor::Object, |_, _, _| unreachable!()),
            user
        );
        let input = registry.resolve_with_auto_generation(&schema, TypeFlavor::Input, |_, flavor, base| {
            assert_eq!(flavor, TypeFlavor::Input);
            let base = base.expect("base class");
            DtoClass::declare(format!("{}Input", base.display_name())).finish()
        });
        assert_eq!(input.name(), "UserInput");
    }

    #[test]
    fn reset_clears_everything() {
        let registry = Registry::new(RegistryConfig::default());
        let schema = user_schema();
        let class = DtoClass::declare("User").finish();
        registry.register(&class, &schema);
        registry.enqueue_pending(&class, &schema);
        registry.reset();
        assert!(registry.class_for(&schema).is_none());
        assert!(registry.entries().is_empty());
        assert!(!registry.is_drain_scheduled());
    }
}
