pub mod generation;
pub mod orcid;

pub use generation::{
    generator_from_config, ChatReply, ChatRequest, GeminiClient, GenerateContentRequest,
    ProxyClient, TextGenerator,
};
pub use orcid::{OrcidClient, RegistrySource};

use crate::Result;
use std::time::Duration;

/// HTTP client configuration shared by the registry and generation clients
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("orcid-analyst/{} (Publication Analytics)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Build a `reqwest` client with these settings
    pub fn build(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .gzip(true)
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}
