use crate::client::{generator_from_config, ChatReply, ChatRequest, TextGenerator};
use crate::error::ErrorKind;
use crate::identifiers::OrcidId;
use crate::models::{GroupAnalysis, SubjectAnalysis};
use crate::retriever::Retriever;
use crate::{Config, Error, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    retriever: Retriever,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AppState {
    pub fn new(retriever: Retriever, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Build from configuration. A missing generation backend is not fatal:
    /// the chat endpoint then answers with an error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let retriever = Retriever::from_config(&config.registry)?;
        let generator = match generator_from_config(&config.generation) {
            Ok(generator) => Some(generator),
            Err(Error::NotConfigured { component, hint }) => {
                warn!("{} not configured ({}); chat endpoint disabled", component, hint);
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(retriever, generator))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub orcids: Vec<String>,
}

/// Error response body `{ "error": ... }`
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Retrieval | ErrorKind::Format => StatusCode::BAD_GATEWAY,
            ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Backend messages are relayed as-is
        let message = match self.0 {
            Error::Format(message) => message,
            other => other.to_string(),
        };
        (status, Json(ChatReply::error(message))).into_response()
    }
}

/// Routes of the HTTP API
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/orcid/:orcid", get(analyze))
        .route("/api/batch", post(batch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

#[instrument(skip_all)]
async fn chat(
    State(state): State<AppState>,
    request: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection.body_text());
            return ApiError(Error::invalid_input("body", rejection.body_text())).into_response();
        }
    };

    let Some(generator) = state.generator.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatReply::error("Text generation is not configured on the server")),
        )
            .into_response();
    };

    let (message, history, analysis) = request.into_parts();
    let message = message.trim();
    if message.is_empty() {
        return ApiError(Error::invalid_input("message", "message cannot be empty")).into_response();
    }

    match generator.generate(&analysis, &history, message).await {
        Ok(text) => Json(ChatReply::text(text)).into_response(),
        Err(e) => {
            warn!("Chat generation failed: {}", e);
            ApiError(e).into_response()
        }
    }
}

async fn analyze(
    State(state): State<AppState>,
    Path(orcid): Path<String>,
) -> std::result::Result<Json<SubjectAnalysis>, ApiError> {
    let orcid = OrcidId::new(&orcid)?;
    Ok(Json(state.retriever.analyze_subject(&orcid).await?))
}

async fn batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> std::result::Result<Json<GroupAnalysis>, ApiError> {
    if request.orcids.is_empty() {
        return Err(Error::invalid_input("orcids", "at least one ORCID iD is required").into());
    }
    let orcids = request
        .orcids
        .iter()
        .map(|raw| OrcidId::new(raw))
        .collect::<Result<Vec<_>>>()?;

    info!("Batch request for {} researchers", orcids.len());
    Ok(Json(state.retriever.analyze_batch(&orcids).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RegistrySource;
    use crate::models::{ActiveAnalysis, ChatMessage};
    use crate::parser::{PersonResponse, WorksResponse};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const KNOWN: &str = "0000-0002-1825-0097";

    struct OneResearcher;

    #[async_trait]
    impl RegistrySource for OneResearcher {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_works(&self, orcid: &OrcidId) -> Result<WorksResponse> {
            if orcid.as_str() != KNOWN {
                return Err(Error::retrieval(orcid, "404 Not Found"));
            }
            Ok(serde_json::from_value(json!({
                "group": [{"work-summary": [{"type": "book", "title": {"title": {"value": "A Book"}}}]}]
            }))?)
        }

        async fn fetch_person(&self, orcid: &OrcidId) -> Result<PersonResponse> {
            Err(Error::retrieval(orcid, "404 Not Found"))
        }
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            analysis: &ActiveAnalysis,
            history: &[ChatMessage],
            message: &str,
        ) -> Result<String> {
            Ok(format!(
                "{message} ({} prior, {} publications)",
                history.len(),
                analysis.publications().len()
            ))
        }
    }

    fn app(generator: Option<Arc<dyn TextGenerator>>) -> Router {
        router(AppState::new(
            Retriever::new(Arc::new(OneResearcher)),
            generator,
        ))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_chat_without_backend() {
        let (status, body) = send(app(None), post_json("/api/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        assert!(body.get("text").is_none());
    }

    #[tokio::test]
    async fn test_chat_reply() {
        let request = post_json(
            "/api/chat",
            json!({
                "message": "count?",
                "history": [{"role": "user", "content": "hello"}, {"role": "assistant", "content": "hi"}]
            }),
        );
        let (status, body) = send(app(Some(Arc::new(Echo))), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "count? (2 prior, 0 publications)");
    }

    #[tokio::test]
    async fn test_chat_accepts_group_without_indexing_stats() {
        let request = post_json(
            "/api/chat",
            json!({
                "message": "summarize",
                "history": [],
                "groupResult": {
                    "totalResearchers": 1,
                    "totalPublications": 1,
                    "avgPublications": 1,
                    "byYear": {"2020": 1},
                    "byType": {"book": 1},
                    "publications": [{
                        "title": "A Book",
                        "year": 2020,
                        "type": "book",
                        "doi": null,
                        "journal": null,
                        "scopusEid": null,
                        "wosUid": null,
                        "hasScopus": false,
                        "hasWos": false
                    }],
                    "yearRange": "2020 - 2020",
                    "failedOrcids": []
                }
            }),
        );
        let (status, body) = send(app(Some(Arc::new(Echo))), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "summarize (0 prior, 1 publications)");
    }

    #[tokio::test]
    async fn test_chat_malformed_body() {
        let request = post_json("/api/chat", json!({"history": "not a list"}));
        let (status, body) = send(app(Some(Arc::new(Echo))), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(body.get("text").is_none());
    }

    #[tokio::test]
    async fn test_analyze_routes() {
        let request = Request::get(format!("/api/orcid/{KNOWN}")).body(Body::empty()).unwrap();
        let (status, body) = send(app(None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orcid_id"], KNOWN);
        assert_eq!(body["totalPublications"], 1);

        let request = Request::get("/api/orcid/not-an-id").body(Body::empty()).unwrap();
        let (status, body) = send(app(None), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let request = Request::get("/api/orcid/0000-0001-5109-3700").body(Body::empty()).unwrap();
        let (status, _) = send(app(None), request).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_batch_route() {
        let request = post_json(
            "/api/batch",
            json!({"orcids": [KNOWN, "0000-0001-5109-3700"]}),
        );
        let (status, body) = send(app(None), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalResearchers"], 1);
        assert_eq!(body["failedOrcids"], json!(["0000-0001-5109-3700"]));

        let (status, _) = send(app(None), post_json("/api/batch", json!({"orcids": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
