//! Text-generation backends for the research assistant.
//!
//! Two backends implement [`TextGenerator`]: [`GeminiClient`] talks to the
//! generation API directly with a local key, [`ProxyClient`] forwards the
//! conversation to a chat proxy (see [`crate::server`]) that holds the key.

use super::HttpClientConfig;
use crate::chat::ChatContextBuilder;
use crate::config::GenerationConfig;
use crate::models::{ActiveAnalysis, ChatMessage, GroupAnalysis, SubjectAnalysis};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Produces an assistant reply for a question about the active analysis
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Generate a reply. `history` holds the prior turns, without `message`.
    async fn generate(
        &self,
        analysis: &ActiveAnalysis,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String>;
}

/// Role of a content turn in the generation API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn turn(role: ContentRole, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Role-less content, as used for the system instruction
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl From<&GenerationConfig> for GenerationParameters {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// Request body of `models/{model}:generateContent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Chat proxy request: the question, prior turns and the active analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub analysis_result: Option<SubjectAnalysis>,
    #[serde(default)]
    pub group_result: Option<GroupAnalysis>,
}

impl ChatRequest {
    /// Split into the question, history and active analysis
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<ChatMessage>, ActiveAnalysis) {
        let analysis = ActiveAnalysis::from_parts(self.analysis_result, self.group_result);
        (self.message, self.history, analysis)
    }
}

/// Borrowed form of [`ChatRequest`] for sending
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingChatRequest<'a> {
    message: &'a str,
    history: &'a [ChatMessage],
    analysis_result: Option<&'a SubjectAnalysis>,
    group_result: Option<&'a GroupAnalysis>,
}

/// Chat proxy response: exactly one of `text` or `error`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            text: None,
            error: Some(error.into()),
        }
    }
}

/// Direct client for the generation API
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    context: ChatContextBuilder,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint carries the key in its query string
        f.debug_struct("GeminiClient")
            .field("host", &self.endpoint.host_str())
            .field("path", &self.endpoint.path())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client; fails with [`Error::NotConfigured`] without an API key
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| Error::NotConfigured {
            component: "text generation".to_string(),
            hint: format!(
                "set {} or generation.api_key in the configuration file",
                crate::config::API_KEY_ENV
            ),
        })?;

        let base = config.base_url.trim_end_matches('/');
        let mut endpoint = Url::parse(&format!(
            "{base}/models/{}:generateContent",
            config.model.trim()
        ))
        .map_err(|e| Error::invalid_input("generation.base_url", e.to_string()))?;
        endpoint.query_pairs_mut().append_pair("key", api_key);

        let http_config = HttpClientConfig {
            timeout: config.timeout(),
            ..HttpClientConfig::default()
        };

        info!("Initialized generation client for model {}", config.model);

        Ok(Self {
            client: http_config.build()?,
            endpoint,
            context: ChatContextBuilder::new(config),
        })
    }

    /// Send a prepared request and return the concatenated reply text
    pub async fn send(&self, request: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Format(format!("generation request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Format(format!("failed to read generation response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("generation API returned {status}"));
            warn!("Generation API error: {}", message);
            return Err(Error::Format(message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Format(format!("invalid generation response: {e}")))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| Error::Format("generation response contained no candidates".to_string()))?;

        Ok(content.parts.into_iter().map(|part| part.text).collect())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip_all, fields(history = history.len()))]
    async fn generate(
        &self,
        analysis: &ActiveAnalysis,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        let request = self.context.build(analysis, history, message)?;
        debug!("Sending {} content turns", request.contents.len());
        self.send(&request).await
    }
}

/// Client for a chat proxy that holds the API key server-side
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    endpoint: Url,
}

impl ProxyClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let proxy_url = config.proxy_url.as_deref().ok_or_else(|| Error::NotConfigured {
            component: "chat proxy".to_string(),
            hint: "set generation.proxy_url".to_string(),
        })?;
        let endpoint = Url::parse(proxy_url)
            .map_err(|e| Error::invalid_input("generation.proxy_url", e.to_string()))?;

        let http_config = HttpClientConfig {
            timeout: config.timeout(),
            ..HttpClientConfig::default()
        };

        info!("Initialized chat proxy client for {}", endpoint);

        Ok(Self {
            client: http_config.build()?,
            endpoint,
        })
    }
}

#[async_trait]
impl TextGenerator for ProxyClient {
    fn name(&self) -> &str {
        "proxy"
    }

    #[instrument(skip_all, fields(history = history.len()))]
    async fn generate(
        &self,
        analysis: &ActiveAnalysis,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String> {
        let request = OutgoingChatRequest {
            message,
            history,
            analysis_result: analysis.single(),
            group_result: analysis.group(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Format(format!("chat proxy request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Format(format!("failed to read chat proxy response: {e}")))?;

        let reply: ChatReply = serde_json::from_str(&body).unwrap_or_default();
        if let Some(error) = reply.error {
            return Err(Error::Format(error));
        }
        if !status.is_success() {
            return Err(Error::Format(format!("chat proxy returned {status}")));
        }

        reply
            .text
            .ok_or_else(|| Error::Format("chat proxy reply has no text".to_string()))
    }
}

/// Pick a backend: a local API key wins over the proxy
pub fn generator_from_config(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    if !config.is_configured() {
        return Err(Error::NotConfigured {
            component: "text generation".to_string(),
            hint: format!(
                "set {} or generation.proxy_url",
                crate::config::API_KEY_ENV
            ),
        });
    }
    if config.api_key().is_some() {
        Ok(Arc::new(GeminiClient::new(config)?))
    } else {
        Ok(Arc::new(ProxyClient::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = GenerateContentRequest {
            contents: vec![
                Content::turn(ContentRole::User, "hi"),
                Content::turn(ContentRole::Model, "hello"),
            ],
            system_instruction: Content::text("be useful"),
            generation_config: GenerationParameters::from(&GenerationConfig::default()),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_endpoint_carries_key_and_model() {
        let client = GeminiClient::new(&GenerationConfig {
            api_key: Some("k123".to_string()),
            ..GenerationConfig::default()
        })
        .unwrap();

        assert!(client
            .endpoint
            .path()
            .ends_with("/models/gemini-2.5-flash:generateContent"));
        assert_eq!(client.endpoint.query(), Some("key=k123"));
        assert!(!format!("{client:?}").contains("k123"));
    }

    #[test]
    fn test_generator_selection() {
        let unconfigured = generator_from_config(&GenerationConfig::default());
        assert!(matches!(unconfigured, Err(Error::NotConfigured { .. })));

        // The sample key from the config template does not count
        let placeholder = GenerationConfig {
            api_key: Some("your_gemini_api_key_here".to_string()),
            ..GenerationConfig::default()
        };
        assert!(!placeholder.is_configured());
        assert!(matches!(
            generator_from_config(&placeholder),
            Err(Error::NotConfigured { .. })
        ));

        let proxied = generator_from_config(&GenerationConfig {
            proxy_url: Some("http://localhost:7860/api/chat".to_string()),
            ..GenerationConfig::default()
        })
        .unwrap();
        assert_eq!(proxied.name(), "proxy");

        let direct = generator_from_config(&GenerationConfig {
            api_key: Some("k".to_string()),
            proxy_url: Some("http://localhost:7860/api/chat".to_string()),
            ..GenerationConfig::default()
        })
        .unwrap();
        assert_eq!(direct.name(), "gemini");
    }

    #[test]
    fn test_chat_request_prefers_group() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        let (message, history, analysis) = request.into_parts();
        assert_eq!(message, "hi");
        assert!(history.is_empty());
        assert!(analysis.is_none());
    }
}
