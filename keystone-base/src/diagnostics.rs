use std::sync::Arc;

use keystone::{Diagnostic, DiagnosticKind, Diagnostics, LogDiagnostics, StdError};
use serde::{Deserialize, Serialize};

use crate::{Config, ConfigSection};

/// Switches for the non-fatal container diagnostics.
///
/// Ambiguous constructors are always reported since they accompany an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Forced singletons whose type lacks the long-lived marker.
    #[serde(default = "enabled")]
    pub policy_mismatch: bool,
    #[serde(default = "enabled")]
    pub concurrent_creation: bool,
    #[serde(default = "enabled")]
    pub listener_failures: bool,
    #[serde(default = "enabled")]
    pub construction_failures: bool,
}

impl DiagnosticsConfig {
    pub fn is_enabled(&self, kind: DiagnosticKind) -> bool {
        match kind {
            DiagnosticKind::AmbiguousConstructors => true,
            DiagnosticKind::SingletonMarkerMissing => self.policy_mismatch,
            DiagnosticKind::ConcurrentCreation => self.concurrent_creation,
            DiagnosticKind::ListenerFailed => self.listener_failures,
            DiagnosticKind::ConstructionFailed => self.construction_failures,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            policy_mismatch: true,
            concurrent_creation: true,
            listener_failures: true,
            construction_failures: true,
        }
    }
}

impl ConfigSection for DiagnosticsConfig {
    fn key() -> &'static str {
        "diagnostics"
    }
}

fn enabled() -> bool {
    true
}

/// Diagnostics sink that drops the kinds disabled in [`DiagnosticsConfig`].
pub struct ConfiguredDiagnostics {
    config: DiagnosticsConfig,
    inner: Arc<dyn Diagnostics>,
}

impl ConfiguredDiagnostics {
    pub fn new(config: DiagnosticsConfig, inner: Arc<dyn Diagnostics>) -> Self {
        Self { config, inner }
    }

    /// Reads the `diagnostics` section and forwards to [`LogDiagnostics`].
    ///
    /// A missing section enables every diagnostic.
    pub fn from_config(config: &Config) -> Result<Self, StdError> {
        let section = config
            .get::<Option<DiagnosticsConfig>>(DiagnosticsConfig::key())?
            .unwrap_or_default();
        Ok(Self::new(section, Arc::new(LogDiagnostics)))
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }
}

impl Diagnostics for ConfiguredDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        if self.config.is_enabled(diagnostic.kind()) {
            self.inner.report(diagnostic);
        }
    }
}
