use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cancellation token for an in-progress [`archive`](super::archive_with_options).
///
/// Clones share the same state, so a token can be handed to another thread (e.g. the consumer of a download) and cancelled from there.
/// The archive pipeline checks the token before writing each entry and fails with [`ArchiveError::Cancelled`](super::ArchiveError::Cancelled).
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Create a new token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_shared() {
        let cancellation = Cancellation::new();
        let clone = cancellation.clone();
        assert!(!cancellation.is_cancelled());
        std::thread::spawn(move || clone.cancel()).join().unwrap();
        assert!(cancellation.is_cancelled());
    }
}
