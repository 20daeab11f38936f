//! Swappable session handle.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::QueueResult;

/// Holds the live session and serialises its replacement.
///
/// Readers clone the current `Arc` and keep using it even after a swap, so a
/// replaced session stays alive until its last user drops it.
pub(crate) struct SessionSlot<S> {
    current: RwLock<Arc<S>>,
    replace_lock: Mutex<()>,
}

impl<S> SessionSlot<S> {
    pub(crate) fn new(session: S) -> Self {
        Self {
            current: RwLock::new(Arc::new(session)),
            replace_lock: Mutex::new(()),
        }
    }

    pub(crate) async fn current(&self) -> Arc<S> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace `observed` with the session produced by `open`.
    ///
    /// Returns the replaced session, or `None` without calling `open` when
    /// `observed` is no longer current because another caller replaced it
    /// first. A failed `open` leaves the slot untouched.
    pub(crate) async fn replace<F, Fut>(
        &self,
        observed: &Arc<S>,
        open: F,
    ) -> QueueResult<Option<Arc<S>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = QueueResult<S>>,
    {
        let _guard = self.replace_lock.lock().await;

        if !Arc::ptr_eq(observed, &*self.current.read().await) {
            return Ok(None);
        }

        let session = open().await?;
        let previous = std::mem::replace(&mut *self.current.write().await, Arc::new(session));
        Ok(Some(previous))
    }
}
