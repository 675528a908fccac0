pub mod http_probe;
pub mod monitor;

pub use http_probe::HttpNetworkProbe;
pub use monitor::{NetworkListener, NetworkMonitor, NetworkSubscription};
