use async_trait::async_trait;
use breedscan_lib::application::ports::NetworkProbe;
use breedscan_lib::shared::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Connectivity switch driven by the test.
#[derive(Default)]
pub struct MockProbe {
    online: AtomicBool,
}

impl MockProbe {
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkProbe for MockProbe {
    async fn probe(&self) -> Result<bool, AppError> {
        Ok(self.online.load(Ordering::SeqCst))
    }
}
