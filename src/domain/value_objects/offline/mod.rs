pub mod geo_location;
pub mod image_ref;
pub mod local_result_id;
pub mod network_status;
pub mod payload;
pub mod queue_entry_id;
pub mod remote_result_id;
pub mod sync_state;
pub mod user_id;
pub mod user_role;

pub use geo_location::GeoLocation;
pub use image_ref::ImageRef;
pub use local_result_id::LocalResultId;
pub use network_status::NetworkStatus;
pub use payload::ResultPayload;
pub use queue_entry_id::QueueEntryId;
pub use remote_result_id::RemoteResultId;
pub use sync_state::SyncState;
pub use user_id::UserId;
pub use user_role::UserRole;
