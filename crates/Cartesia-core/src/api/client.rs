use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{DiagramPayload, ExportLogEntry, ItemList, RoadmapBackend};
use crate::config::ClientConfig;
use crate::domain::{Comment, MetaPatch, RoadmapId, RoadmapMeta, RoadmapRecord, VersionId, VersionSummary};
use crate::error::GatewayError;

/// HTTP implementation of [`RoadmapBackend`] on top of `reqwest`.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport(format!("base url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "backend request failed");
        Err(map_status(status, &body))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::Transport(format!("unexpected response body: {e}")))
    }

    async fn read_list<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, GatewayError> {
        let list: Option<ItemList<T>> = Self::read_json(response).await?;
        Ok(list.map(ItemList::into_vec).unwrap_or_default())
    }

    /// Accepts an empty body or any JSON body except `{"ok": false}`.
    async fn expect_ack(response: Response) -> Result<(), GatewayError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) if body.get("ok") == Some(&Value::Bool(false)) => Err(GatewayError::Status {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| "request rejected".to_string()),
            }),
            _ => Ok(()),
        }
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Classifies a non-success HTTP status.
pub fn map_status(status: StatusCode, body: &str) -> GatewayError {
    match status.as_u16() {
        401 => GatewayError::Unauthorized,
        403 => GatewayError::Forbidden,
        404 => GatewayError::NotFound,
        409 | 423 => GatewayError::Conflict,
        code => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| body.trim().to_string());
            GatewayError::Status {
                status: code,
                message,
            }
        }
    }
}

#[async_trait]
impl RoadmapBackend for ApiClient {
    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    async fn fetch_diagram(&self, id: &RoadmapId) -> Result<String, GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "diagram"])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let payload: DiagramPayload = Self::read_json(response).await?;
        Ok(payload.diagram_json)
    }

    #[tracing::instrument(skip(self, diagram_json), fields(roadmap_id = %id, bytes = diagram_json.len()))]
    async fn store_diagram(&self, id: &RoadmapId, diagram_json: String) -> Result<(), GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "diagram"])?;
        let body = DiagramPayload { diagram_json };
        let response = self.send(self.request(Method::PUT, url).json(&body)).await?;
        Self::expect_ack(response).await
    }

    #[tracing::instrument(skip(self, meta), fields(title = %meta.title))]
    async fn create_roadmap(&self, meta: &RoadmapMeta) -> Result<RoadmapRecord, GatewayError> {
        let url = self.endpoint(&["roadmaps"])?;
        let response = self.send(self.request(Method::POST, url).json(meta)).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip(self, patch), fields(roadmap_id = %id))]
    async fn update_roadmap(&self, id: &RoadmapId, patch: &MetaPatch) -> Result<(), GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str()])?;
        let response = self.send(self.request(Method::PUT, url).json(patch)).await?;
        Self::expect_ack(response).await
    }

    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    async fn fetch_roadmap(&self, id: &RoadmapId) -> Result<RoadmapRecord, GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str()])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Self::read_json(response).await
    }

    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    async fn lock(&self, id: &RoadmapId) -> Result<(), GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "lock"])?;
        let response = self.send(self.request(Method::POST, url)).await?;
        Self::expect_ack(response).await
    }

    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    async fn unlock(&self, id: &RoadmapId) -> Result<(), GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "unlock"])?;
        let response = self.send(self.request(Method::POST, url)).await?;
        Self::expect_ack(response).await
    }

    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    async fn list_versions(&self, id: &RoadmapId) -> Result<Vec<VersionSummary>, GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "versions"])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Self::read_list(response).await
    }

    #[tracing::instrument(skip(self), fields(roadmap_id = %id, version_id = %version))]
    async fn fetch_version(&self, id: &RoadmapId, version: &VersionId) -> Result<String, GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "versions", version.as_str()])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let payload: DiagramPayload = Self::read_json(response).await?;
        Ok(payload.diagram_json)
    }

    #[tracing::instrument(skip(self, entry), fields(roadmap_id = %id))]
    async fn log_export(&self, id: &RoadmapId, entry: &ExportLogEntry) -> Result<(), GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "export", "log"])?;
        let response = self.send(self.request(Method::POST, url).json(entry)).await?;
        Self::expect_ack(response).await
    }

    #[tracing::instrument(skip(self), fields(roadmap_id = %id))]
    async fn list_comments(&self, id: &RoadmapId) -> Result<Vec<Comment>, GatewayError> {
        let url = self.endpoint(&["roadmaps", id.as_str(), "comments"])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Self::read_list(response).await
    }
}
