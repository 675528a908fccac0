pub mod offline_service;
pub mod sync_service;

pub use offline_service::{CaptureRequest, OfflineService};
pub use sync_service::{SyncOutcome, SyncRunState, SyncService, SyncSettings, SyncStatusSnapshot};
