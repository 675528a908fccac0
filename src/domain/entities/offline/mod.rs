pub mod cached_user;
pub mod offline_result;
pub mod pending_upload;
pub mod sync_report;
pub mod upload;

pub use cached_user::CachedUserData;
pub use offline_result::{OfflineResult, OfflineResultDraft};
pub use pending_upload::PendingUpload;
pub use sync_report::{SyncReport, UploadFailure};
pub use upload::{RemoteReceipt, ResultUpload};
