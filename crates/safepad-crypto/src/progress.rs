//! Progress/status callbacks and cooperative cancellation for long operations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{VaultError, VaultResult};

/// Progress callback type (percent complete, 0..=100)
pub type ProgressFn = Box<dyn Fn(u8) + Send + Sync>;

/// Status callback type (human-readable step description)
pub type StatusFn = Box<dyn Fn(&str) + Send + Sync>;

/// Cancellation flag shared between a caller and a running operation.
///
/// Checked between discrete steps (each archived file, each KDF trial); a
/// single KDF or AEAD call is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Optional callbacks for a long-running operation, invoked synchronously on
/// the calling thread.
#[derive(Default, Clone, Copy)]
pub struct Observer<'a> {
    pub progress: Option<&'a ProgressFn>,
    pub status: Option<&'a StatusFn>,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> Observer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: &'a ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_status(mut self, status: &'a StatusFn) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn progress(&self, percent: u8) {
        if let Some(f) = self.progress {
            f(percent.min(100));
        }
    }

    pub(crate) fn status(&self, message: &str) {
        if let Some(f) = self.status {
            f(message);
        }
    }

    /// Fail with [`VaultError::Cancelled`] if cancellation was requested.
    pub(crate) fn checkpoint(&self) -> VaultResult<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(VaultError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Map step `done` of `total` onto the `[start, end]` percent band.
pub(crate) fn scaled(done: usize, total: usize, start: u8, end: u8) -> u8 {
    if total == 0 {
        return end;
    }
    let span = u64::from(end.saturating_sub(start));
    let pct = u64::from(start) + span * done as u64 / total as u64;
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_checkpoint() {
        let token = CancelToken::new();
        let observer = Observer::new().with_cancel(&token);
        assert!(observer.checkpoint().is_ok());
        token.cancel();
        assert!(matches!(observer.checkpoint(), Err(VaultError::Cancelled)));
        assert!(Observer::new().checkpoint().is_ok());
    }

    #[test]
    fn test_callbacks_invoked() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Box::new(move |p| sink.lock().unwrap().push(p));
        let observer = Observer::new().with_progress(&progress);

        observer.progress(40);
        observer.progress(250);

        assert_eq!(*seen.lock().unwrap(), vec![40, 100]);
    }

    #[test]
    fn test_scaled() {
        assert_eq!(scaled(0, 4, 0, 50), 0);
        assert_eq!(scaled(2, 4, 0, 50), 25);
        assert_eq!(scaled(4, 4, 50, 100), 100);
        assert_eq!(scaled(0, 0, 50, 100), 100);
    }
}
