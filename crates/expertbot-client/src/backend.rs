use std::time::Duration;

use async_trait::async_trait;
use expertbot_config::BackendConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::types::{QueryRequest, QueryResponse};

/// The expert-system service answering queries.
#[async_trait]
pub trait ExpertBackend: Send + Sync {
    /// Post `request` to the diagnostic echo endpoint.
    async fn probe(&self, request: &QueryRequest) -> Result<Value>;

    /// Resolve a query.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// Whether the service answers at all.
    async fn health_check(&self) -> bool;
}

/// [`ExpertBackend`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Default configuration pointed at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let config = BackendConfig {
            base_url: base_url.into(),
            ..BackendConfig::default()
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, request: &QueryRequest) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} query={:?} selected_file={:?}", url, request.query, request.selected_file);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        debug!("{} responded {}", path, status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = if error_text.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                error_text
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ExpertBackend for HttpBackend {
    async fn probe(&self, request: &QueryRequest) -> Result<Value> {
        let body = self.post("/api/test", request).await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let body = self.post("/api/query", request).await?;
        let response: QueryResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        info!("Query answered ({} bytes)", body.len());
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        match self.client.get(format!("{}/", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}
