use crate::Signature;

/// Non-fatal event reported by the container.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    /// Several constructors of one arity were satisfiable.
    AmbiguousConstructors {
        type_name: &'static str,
        candidates: Vec<Signature>,
    },
    /// A forced singleton whose type lacks the long-lived marker was cached.
    SingletonMarkerMissing { type_name: &'static str },
    /// An adapter was requested while another call chain was constructing it.
    ConcurrentCreation {
        type_name: &'static str,
        in_progress: Vec<&'static str>,
        requested: Vec<&'static str>,
    },
    /// An injection listener failed; the instance was still returned.
    ListenerFailed {
        type_name: &'static str,
        error: String,
    },
    /// Construction failed; nothing was cached.
    ConstructionFailed {
        type_name: &'static str,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    AmbiguousConstructors,
    SingletonMarkerMissing,
    ConcurrentCreation,
    ListenerFailed,
    ConstructionFailed,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::AmbiguousConstructors { .. } => DiagnosticKind::AmbiguousConstructors,
            Diagnostic::SingletonMarkerMissing { .. } => DiagnosticKind::SingletonMarkerMissing,
            Diagnostic::ConcurrentCreation { .. } => DiagnosticKind::ConcurrentCreation,
            Diagnostic::ListenerFailed { .. } => DiagnosticKind::ListenerFailed,
            Diagnostic::ConstructionFailed { .. } => DiagnosticKind::ConstructionFailed,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Diagnostic::AmbiguousConstructors { type_name, .. }
            | Diagnostic::SingletonMarkerMissing { type_name }
            | Diagnostic::ConcurrentCreation { type_name, .. }
            | Diagnostic::ListenerFailed { type_name, .. }
            | Diagnostic::ConstructionFailed { type_name, .. } => type_name,
        }
    }
}

/// Sink for container diagnostics.
pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Diagnostics sink that writes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::AmbiguousConstructors {
                type_name,
                candidates,
            } => {
                let candidates: Vec<_> = candidates.iter().map(|v| v.to_string()).collect();
                tracing::error!(
                    "Ambiguous constructors of {type_name}: {}",
                    candidates.join(", ")
                );
            }
            Diagnostic::SingletonMarkerMissing { type_name } => {
                tracing::warn!("Singleton {type_name} is not marked as long-lived");
            }
            Diagnostic::ConcurrentCreation {
                type_name,
                in_progress,
                requested,
            } => {
                tracing::warn!(
                    in_progress = ?in_progress,
                    requested = ?requested,
                    "{type_name} is already under construction"
                );
            }
            Diagnostic::ListenerFailed { type_name, error } => {
                tracing::error!("Injection listener of {type_name} failed: {error}");
            }
            Diagnostic::ConstructionFailed { type_name, error } => {
                tracing::error!("Cannot construct {type_name}: {error}");
            }
        }
    }
}
