use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a component adapter, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterId(u64);

impl AdapterId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Adapters under construction on one resolution call chain.
///
/// A context is created by every top-level resolve call and threaded through
/// each recursive descent, so an adapter may be under construction on two
/// independent call chains at once while never appearing twice on one chain.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    frames: Vec<(AdapterId, &'static str)>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: AdapterId) -> bool {
        self.frames.iter().any(|(v, _)| *v == id)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Implementation types under construction, outermost first.
    pub fn chain(&self) -> Vec<&'static str> {
        self.frames.iter().map(|(_, v)| *v).collect()
    }

    pub(crate) fn enter(&mut self, id: AdapterId, type_name: &'static str) {
        self.frames.push((id, type_name));
    }

    pub(crate) fn leave(&mut self, id: AdapterId) {
        if let Some(pos) = self.frames.iter().rposition(|(v, _)| *v == id) {
            self.frames.remove(pos);
        }
    }
}
