//! Enum synthesis for enum-like schema nodes.
//!
//! Explicit enums and literal unions are cached by their value set, native
//! enums by their declaration id. A cache entry is registered
//! with the host at most once, on first sight.

use crate::diagnostics::{Diagnostic, DiagnosticsSink, Fallback, Reason};
use crate::host::{EnumOptions, GraphqlHost};
use crate::introspect::{self, Children, NodeKind};
use crate::schema::{Schema, SchemaKind};
use crate::types::EnumType;
use heck::ToUpperCamelCase;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EnumKey {
    /// Sorted, deduplicated canonical JSON encodings of the values.
    Values(Vec<String>),
    Native(u64),
}

#[derive(Debug, Clone)]
pub enum Synthesized {
    Enum(EnumType),
    /// The node has no enum representation; callers type it as `String`.
    StringFallback,
}

#[derive(Default)]
struct EnumCache {
    entries: HashMap<EnumKey, EnumType>,
    names: HashSet<String>,
}

#[derive(Default)]
pub struct EnumSynthesizer {
    cache: Mutex<EnumCache>,
}

impl EnumSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        let mut cache = self.cache.lock();
        cache.entries.clear();
        cache.names.clear();
    }

    pub fn synthesize(
        &self,
        schema: &Schema,
        host: Option<&dyn GraphqlHost>,
        diagnostics: &dyn DiagnosticsSink,
        path: &str,
    ) -> Synthesized {
        let node = introspect::unwrap(schema);
        match introspect::children_of(node) {
            Children::Values(values) => {
                let members = values
                    .iter()
                    .map(|v| (v.clone(), Value::String(v.clone())))
                    .collect();
                Synthesized::Enum(self.from_members(members, host, diagnostics, path))
            }
            Children::NativeValues(native) => {
                let key = EnumKey::Native(native.table_id());
                let members = native.values().to_vec();
                Synthesized::Enum(self.cached(key, native.name(), members, host, diagnostics, path))
            }
            Children::Options(options) => match literal_members(options) {
                Some(members) => Synthesized::Enum(self.from_members(members, host, diagnostics, path)),
                None => {
                    diagnostics.record(Diagnostic::new(path, Reason::NonLiteralUnion, Fallback::StringScalar));
                    Synthesized::StringFallback
                }
            },
            _ => {
                diagnostics.record(Diagnostic::new(
                    path,
                    Reason::UnsupportedKind(introspect::kind_of(node)),
                    Fallback::StringScalar,
                ));
                Synthesized::StringFallback
            }
        }
    }

    fn from_members(
        &self,
        members: Vec<(String, Value)>,
        host: Option<&dyn GraphqlHost>,
        diagnostics: &dyn DiagnosticsSink,
        path: &str,
    ) -> EnumType {
        let mut keyed: Vec<(String, (String, Value))> = members
            .into_iter()
            .map(|(label, value)| (value.to_string(), (label, value)))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);

        let key = EnumKey::Values(keyed.iter().map(|(k, _)| k.clone()).collect());
        let members: Vec<(String, Value)> = keyed.into_iter().map(|(_, member)| member).collect();
        let name = generated_name(&members);
        self.cached(key, &name, members, host, diagnostics, path)
    }

    fn cached(
        &self,
        key: EnumKey,
        name: &str,
        members: Vec<(String, Value)>,
        host: Option<&dyn GraphqlHost>,
        diagnostics: &dyn DiagnosticsSink,
        path: &str,
    ) -> EnumType {
        let enum_type = {
            let mut cache = self.cache.lock();
            if let Some(existing) = cache.entries.get(&key) {
                return existing.clone();
            }
            let name = unique_name(&mut cache.names, name);
            let enum_type = EnumType::new(name, members);
            cache.entries.insert(key, enum_type.clone());
            enum_type
        };

        if enum_type.is_empty() {
            diagnostics.record(Diagnostic::new(path, Reason::EmptyEnum, Fallback::SkipRegistration));
            return enum_type;
        }
        match host {
            Some(host) => {
                let options = EnumOptions {
                    name: enum_type.name().to_string(),
                };
                match host.register_enum(&enum_type, options) {
                    Ok(()) => tracing::debug!(name = enum_type.name(), "registered enum"),
                    Err(e) => diagnostics.record(Diagnostic::new(
                        path,
                        Reason::HostRejected(e.to_string()),
                        Fallback::SkipRegistration,
                    )),
                }
            }
            None => diagnostics.record(Diagnostic::new(path, Reason::HostUnavailable, Fallback::SkipRegistration)),
        }
        enum_type
    }
}

/// Members of a union whose options are all literals of one JSON kind.
fn literal_members(options: &[Schema]) -> Option<Vec<(String, Value)>> {
    if options.is_empty() {
        return None;
    }
    let mut members = Vec::with_capacity(options.len());
    let mut kind: Option<std::mem::Discriminant<Value>> = None;
    for option in options {
        let node = introspect::unwrap(option);
        if introspect::kind_of(node) != NodeKind::Literal {
            return None;
        }
        let SchemaKind::Literal(value) = node.kind() else {
            return None;
        };
        if matches!(value, Value::Null | Value::Array(_) | Value::Object(_)) {
            return None;
        }
        let discriminant = std::mem::discriminant(value);
        if kind.is_some_and(|k| k != discriminant) {
            return None;
        }
        kind = Some(discriminant);
        let label = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        members.push((label, value.clone()));
    }
    Some(members)
}

fn generated_name(members: &[(String, Value)]) -> String {
    if members.is_empty() {
        return "EmptyEnum".to_string();
    }
    let joined: String = members
        .iter()
        .map(|(label, _)| label.to_upper_camel_case())
        .collect();
    match joined.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => format!("{}Enum", joined),
        _ => format!("Enum{}", joined),
    }
}

fn unique_name(taken: &mut HashSet<String>, base: &str) -> String {
    let mut name = base.to_string();
    let mut suffix = 2;
    while taken.contains(&name) {
        name = format!("{}{}", base, suffix);
        suffix += 1;
    }
    taken.insert(name.clone());
    name
}
