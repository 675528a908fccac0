pub mod image_store;
pub mod network_probe;
pub mod offline_store;
pub mod remote_api;

pub use image_store::ImageStore;
pub use network_probe::NetworkProbe;
pub use offline_store::OfflineStore;
pub use remote_api::RemoteApi;
