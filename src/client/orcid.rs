use super::HttpClientConfig;
use crate::config::RegistryConfig;
use crate::identifiers::OrcidId;
use crate::parser::{PersonResponse, WorksResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

/// Read access to a researcher registry
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Name of the registry for logging
    fn name(&self) -> &str;

    /// Fetch the grouped work summaries of a researcher
    async fn fetch_works(&self, orcid: &OrcidId) -> Result<WorksResponse>;

    /// Fetch the person record (name, employments) of a researcher
    async fn fetch_person(&self, orcid: &OrcidId) -> Result<PersonResponse>;
}

/// Client for the ORCID public API
#[derive(Debug, Clone)]
pub struct OrcidClient {
    client: Client,
    base_url: Url,
}

impl OrcidClient {
    /// Create a new registry client
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::NotConfigured {
                component: "registry".to_string(),
                hint: "set registry.base_url".to_string(),
            });
        }

        // A trailing slash keeps the version segment when joining paths
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            Error::invalid_input("registry.base_url", format!("invalid URL '{base}': {e}"))
        })?;

        let http_config = HttpClientConfig {
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            ..HttpClientConfig::default()
        };

        info!("Initialized ORCID client for {}", base_url);

        Ok(Self {
            client: http_config.build()?,
            base_url,
        })
    }

    /// Build the URL of a per-researcher resource, e.g. `{base}/{orcid}/works`
    fn build_url(&self, orcid: &OrcidId, resource: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{}/{resource}", orcid.as_str()))
            .map_err(|e| Error::retrieval(orcid, format!("invalid request URL: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, orcid: &OrcidId, resource: &str) -> Result<T> {
        let url = self.build_url(orcid, resource)?;
        debug!("GET {} ({})", url, self.name());

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::retrieval(orcid, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::retrieval(
                orcid,
                format!("registry returned {status} for {resource}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::retrieval(orcid, format!("failed to read response: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| Error::retrieval(orcid, format!("invalid {resource} payload: {e}")))
    }
}

#[async_trait]
impl RegistrySource for OrcidClient {
    fn name(&self) -> &str {
        "orcid"
    }

    async fn fetch_works(&self, orcid: &OrcidId) -> Result<WorksResponse> {
        self.get_json(orcid, "works").await
    }

    async fn fetch_person(&self, orcid: &OrcidId) -> Result<PersonResponse> {
        self.get_json(orcid, "person").await
    }
}
