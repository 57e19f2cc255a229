//! Structured records for metadata that was generated on a best-effort basis.

use crate::introspect::NodeKind;
use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// An object schema whose class has not registered (yet).
    UnresolvedReference,
    UnsupportedKind(NodeKind),
    /// A union whose options are not literals of one primitive kind.
    NonLiteralUnion,
    EmptyEnum,
    /// The decorated class carries no schema anywhere on its chain.
    MissingSchema,
    HostUnavailable,
    HostRejected(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::UnresolvedReference => f.write_str("unresolved object reference"),
            Reason::UnsupportedKind(kind) => write!(f, "unsupported schema kind {:?}", kind),
            Reason::NonLiteralUnion => f.write_str("union is not a set of same-kind literals"),
            Reason::EmptyEnum => f.write_str("enum has no values"),
            Reason::MissingSchema => f.write_str("no schema found on class or its parents"),
            Reason::HostUnavailable => f.write_str("GraphQL host unavailable"),
            Reason::HostRejected(message) => write!(f, "GraphQL host rejected registration: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    OpaqueObject,
    StringScalar,
    NoFields,
    SkipRegistration,
    AutoGenerated(String),
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::OpaqueObject => f.write_str("JSON scalar"),
            Fallback::StringScalar => f.write_str("String scalar"),
            Fallback::NoFields => f.write_str("type without fields"),
            Fallback::SkipRegistration => f.write_str("skipped GraphQL registration"),
            Fallback::AutoGenerated(name) => write!(f, "generated type {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// `Type.field` style location, or the type name alone.
    pub path: String,
    pub reason: Reason,
    pub fallback: Fallback,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, reason: Reason, fallback: Fallback) -> Self {
        Self {
            path: path.into(),
            reason,
            fallback,
        }
    }
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Default sink: one `warn` event per diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            path = %diagnostic.path,
            reason = %diagnostic.reason,
            fallback = %diagnostic.fallback,
            "schema metadata degraded"
        );
    }
}

/// Keeps every record; used by tests and by callers that report at startup.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    records: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Reason) -> bool) -> usize {
        self.records.lock().iter().filter(|d| matches(&d.reason)).count()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        tracing::debug!(path = %diagnostic.path, reason = %diagnostic.reason, "diagnostic collected");
        self.records.lock().push(diagnostic);
    }
}
