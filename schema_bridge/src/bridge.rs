//! The bridge context: registry, enum cache, GraphQL host and diagnostics.
//!
//! Declarations made inside [`Bridge::batch`] see an unsettled registry:
//! object references that are not registered yet map to a placeholder and a
//! drain is scheduled. The outermost batch exit drains once. Every decoration
//! runs in its own batch, so a caller only needs an explicit batch to make a
//! whole burst of declarations share one drain.

use crate::class::DtoClass;
use crate::config::BridgeConfig;
use crate::diagnostics::{Diagnostic, DiagnosticsSink, TracingDiagnostics};
use crate::enums::EnumSynthesizer;
use crate::host::GraphqlHost;
use crate::registry::{DrainReport, Registry};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

static GLOBAL: OnceCell<Bridge> = OnceCell::new();

pub(crate) struct BridgeInner {
    pub(crate) config: BridgeConfig,
    pub(crate) registry: Registry,
    pub(crate) enums: EnumSynthesizer,
    host: Option<Arc<dyn GraphqlHost>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    batch_depth: AtomicUsize,
    pub(crate) generated_count: AtomicUsize,
    pub(crate) declared: Mutex<HashMap<&'static str, DtoClass>>,
}

#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

#[derive(Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
    host: Option<Arc<dyn GraphqlHost>>,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl BridgeBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: Arc<dyn GraphqlHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn build(self) -> Bridge {
        let registry = Registry::new(self.config.registry.clone());
        Bridge {
            inner: Arc::new(BridgeInner {
                config: self.config,
                registry,
                enums: EnumSynthesizer::new(),
                host: self.host,
                diagnostics: self.diagnostics.unwrap_or_else(|| Arc::new(TracingDiagnostics)),
                batch_depth: AtomicUsize::new(0),
                generated_count: AtomicUsize::new(0),
                declared: Mutex::new(HashMap::new()),
            }),
        }
    }
}

/// Non-owning handle held by field type thunks.
#[derive(Clone)]
pub(crate) struct WeakBridge(Weak<BridgeInner>);

impl WeakBridge {
    pub(crate) fn upgrade(&self) -> Option<Bridge> {
        self.0.upgrade().map(|inner| Bridge { inner })
    }
}

struct BatchGuard<'a>(&'a AtomicUsize);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    pub fn new(config: BridgeConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// The process-wide bridge. Configured from the environment on first use
    /// unless [`Bridge::install_global`] ran earlier.
    pub fn global() -> &'static Bridge {
        GLOBAL.get_or_init(|| {
            let config = BridgeConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!("Failed to read bridge config from environment: {}", e);
                BridgeConfig::default()
            });
            Bridge::new(config)
        })
    }

    /// Installs `bridge` as the global instance; hands it back if one exists already.
    pub fn install_global(bridge: Bridge) -> Result<(), Bridge> {
        GLOBAL.set(bridge)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn enums(&self) -> &EnumSynthesizer {
        &self.inner.enums
    }

    pub fn host(&self) -> Option<&dyn GraphqlHost> {
        self.inner.host.as_deref()
    }

    pub(crate) fn inner(&self) -> &BridgeInner {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> WeakBridge {
        WeakBridge(Arc::downgrade(&self.inner))
    }

    pub(crate) fn diagnose(&self, diagnostic: Diagnostic) {
        self.inner.diagnostics.record(diagnostic);
    }

    pub(crate) fn diagnostics(&self) -> &dyn DiagnosticsSink {
        self.inner.diagnostics.as_ref()
    }

    /// No batch is open and no drain is outstanding.
    pub fn is_settled(&self) -> bool {
        self.inner.batch_depth.load(Ordering::SeqCst) == 0 && !self.registry().is_drain_scheduled()
    }

    /// Runs `declare` as one burst; the outermost batch drains on exit.
    pub fn batch<R>(&self, declare: impl FnOnce() -> R) -> R {
        let result = {
            self.inner.batch_depth.fetch_add(1, Ordering::SeqCst);
            let _guard = BatchGuard(&self.inner.batch_depth);
            declare()
        };
        if self.inner.batch_depth.load(Ordering::SeqCst) == 0 && self.registry().is_drain_scheduled() {
            self.settle();
        }
        result
    }

    /// Drains pending registrations now. Fields still unresolved here may be
    /// declared later; they are diagnosed when their thunk is evaluated.
    pub fn settle(&self) -> DrainReport {
        self.registry().drain_pending()
    }

    /// Clears registry, enum cache and static declarations.
    pub fn reset(&self) {
        self.registry().reset();
        self.enums().reset();
        self.inner.declared.lock().clear();
        self.inner.generated_count.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn batches_drain_once_at_the_outermost_exit() {
        let bridge = Bridge::new(BridgeConfig::default());
        let schema = Schema::object([("id", Schema::int())]);
        let class = DtoClass::declare("Thing").finish();

        bridge.batch(|| {
            bridge.batch(|| {
                bridge.registry().enqueue_pending(&class, &schema);
            });
            assert!(!bridge.is_settled());
            assert_eq!(bridge.registry().pending_len(), 1);
        });
        assert!(bridge.is_settled());
        assert_eq!(bridge.registry().pending_len(), 0);
    }

    #[test]
    fn explicit_settle_clears_a_scheduled_drain() {
        let bridge = Bridge::new(BridgeConfig::default());
        bridge.registry().schedule_drain();
        assert!(!bridge.is_settled());
        assert_eq!(bridge.settle().processed, 0);
        assert!(bridge.is_settled());
    }

    #[test]
    fn weak_handles_do_not_keep_the_bridge_alive() {
        let bridge = Bridge::new(BridgeConfig::default());
        let weak = bridge.downgrade();
        assert!(weak.upgrade().is_some());
        drop(bridge);
        assert!(weak.upgrade().is_none());
    }
}
