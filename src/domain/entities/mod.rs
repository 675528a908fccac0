pub mod offline;

pub use offline::{
    CachedUserData, OfflineResult, OfflineResultDraft, PendingUpload, RemoteReceipt,
    ResultUpload, SyncReport, UploadFailure,
};
