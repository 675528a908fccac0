pub mod offline;

pub use offline::{
    GeoLocation, ImageRef, LocalResultId, NetworkStatus, QueueEntryId, RemoteResultId, ResultPayload,
    SyncState, UserId, UserRole,
};
