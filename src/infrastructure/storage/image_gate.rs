use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Shared lock over image lifetime decisions.
///
/// Image files are content addressed, so a capture may reuse a file that
/// already exists on disk. A capture holds the gate from writing its images
/// until its result is committed; anything that deletes an image after
/// deciding it is unreferenced holds it across that check and the delete.
#[derive(Clone, Default)]
pub struct ImageGate {
    inner: Arc<Mutex<()>>,
}

impl ImageGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}
