//! # API Client
//!
//! Typed access to the workflow backend over `reqwest`.
//!
//! Every endpoint lives under `/api`. Non-2xx responses become
//! [`ClientError::Status`] carrying the response body, and payloads are decoded
//! with `serde_json` so decode failures surface as [`ClientError::Decode`].
//! Settings, credentials, builder and upload endpoints are added by their own
//! modules as further `impl ApiClient` blocks.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use studio_canvas::{NodeCatalog, NodeDefinition, WorkflowDocument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// A row of the workflow list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// HTTP client for the backend API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base url {} cannot carry a path",
                config.base_url
            )));
        }
        // Drop a trailing slash so segments can be appended uniformly.
        let trimmed = base_url.path().trim_end_matches('/').to_string();
        base_url.set_path(&trimmed);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/api/{segments...}`. Segments are percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Config(format!("base url {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "API request");

        let mut request = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    /// Sends a request and turns non-success statuses into errors.
    pub(crate) async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "API request failed");
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = Self::send(self.request(Method::GET, segments)?).await?;
        Self::decode(response).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = Self::send(self.request(method, segments)?.json(body)).await?;
        Self::decode(response).await
    }

    pub(crate) async fn delete(&self, segments: &[&str]) -> Result<()> {
        Self::send(self.request(Method::DELETE, segments)?).await?;
        Ok(())
    }

    // --- Workflows ---

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        self.get_json(&["workflows"]).await
    }

    pub async fn get_workflow(&self, id: &str) -> Result<WorkflowDocument> {
        self.get_json(&["workflows", id]).await
    }

    /// Stores a new workflow. The returned document carries the backend id.
    pub async fn create_workflow(&self, document: &WorkflowDocument) -> Result<WorkflowDocument> {
        let created: WorkflowDocument = self
            .send_json(Method::POST, &["workflows"], document)
            .await?;
        tracing::info!(workflow_id = ?created.id, name = %created.name, "Created workflow");
        Ok(created)
    }

    pub async fn update_workflow(
        &self,
        id: &str,
        document: &WorkflowDocument,
    ) -> Result<WorkflowDocument> {
        self.send_json(Method::PUT, &["workflows", id], document).await
    }

    pub async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.delete(&["workflows", id]).await?;
        tracing::info!(workflow_id = %id, "Deleted workflow");
        Ok(())
    }

    // --- Node catalog ---

    /// Fetches every node definition and groups them by category.
    pub async fn node_catalog(&self) -> Result<NodeCatalog> {
        let definitions: Vec<NodeDefinition> = self.get_json(&["nodes", "definitions"]).await?;
        tracing::debug!(count = definitions.len(), "Fetched node definitions");
        Ok(NodeCatalog::from_definitions(definitions))
    }
}
