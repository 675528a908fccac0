pub mod mock_network;
pub mod mock_remote;

pub use mock_network::MockProbe;
pub use mock_remote::MockRemoteApi;
