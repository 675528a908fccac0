use crate::application::ports::NetworkProbe;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// Treats a 2xx from `GET {base_url}/health` as reachable.
pub struct HttpNetworkProbe {
    client: reqwest::Client,
    health_url: String,
}

impl HttpNetworkProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(format!("HTTP client: {err}")))?;
        Ok(Self {
            client,
            health_url: format!("{}/health", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl NetworkProbe for HttpNetworkProbe {
    async fn probe(&self) -> Result<bool, AppError> {
        let response = self.client.get(&self.health_url).send().await?;
        Ok(response.status().is_success())
    }
}
