pub mod http_remote_api;

pub use http_remote_api::{HttpRemoteApi, RemoteApiError};
