//! HTTP registry client.
//!
//! Talks to a small JSON front end over the registry spreadsheet:
//! - `GET  {base}/licenses` returns every row (a bare array or `{"rows": [...]}`)
//! - `GET  {base}/licenses/{key}` returns one row, 404 if unknown
//! - `PUT  {base}/licenses/{key}/binding` writes new hardware columns

use crate::client::{BindingUpdate, RegistryClient};
use crate::error::{RegistryError, RegistryResult};
use crate::row::RemoteLicenseRow;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tollgate_types::LicenseKey;
use tracing::{debug, info, warn};

/// HTTP registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry API (e.g. `https://licenses.example.com/api`).
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_token: None,
            timeout_secs: 15,
        }
    }
}

/// Registry client over HTTP.
pub struct HttpRegistry {
    config: RegistryConfig,
    client: Client,
}

impl HttpRegistry {
    /// Creates a client.
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(RegistryError::Config("base_url is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| RegistryError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn license_url(&self, key: &LicenseKey, suffix: &str) -> String {
        self.url(&format!(
            "/licenses/{}{}",
            urlencoding::encode(key.as_str()),
            suffix
        ))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: Response, key: Option<&LicenseKey>) -> RegistryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(key) = key {
                return Err(RegistryError::NotFound(key.masked()));
            }
        }
        let message = response.text().await.unwrap_or_default();
        Err(RegistryError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowsBody {
    Bare(Vec<Value>),
    Wrapped { rows: Vec<Value> },
}

#[async_trait]
impl RegistryClient for HttpRegistry {
    async fn fetch_all(&self) -> RegistryResult<Vec<RemoteLicenseRow>> {
        let request = self.authorize(self.client.get(self.url("/licenses")));
        let response = Self::check_status(request.send().await?, None).await?;
        let body: RowsBody = response
            .json()
            .await
            .map_err(|e| RegistryError::Malformed(format!("license list: {e}")))?;

        let values = match body {
            RowsBody::Bare(rows) | RowsBody::Wrapped { rows } => rows,
        };

        let total = values.len();
        let rows: Vec<RemoteLicenseRow> = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(index, error = %e, "skipping unreadable registry row");
                    None
                }
            })
            .collect();

        debug!(total, usable = rows.len(), "fetched registry rows");
        Ok(rows)
    }

    async fn validate_one(&self, key: &LicenseKey) -> RegistryResult<RemoteLicenseRow> {
        let request = self.authorize(self.client.get(self.license_url(key, "")));
        let response = Self::check_status(request.send().await?, Some(key)).await?;
        response
            .json()
            .await
            .map_err(|e| RegistryError::Malformed(format!("license row: {e}")))
    }

    async fn update_binding(&self, update: &BindingUpdate) -> RegistryResult<()> {
        let request = self
            .authorize(self.client.put(self.license_url(&update.key, "/binding")))
            .json(&update.to_columns());
        Self::check_status(request.send().await?, Some(&update.key)).await?;
        info!(
            key = %update.key.masked(),
            transfer_count = update.transfer_count,
            "wrote hardware binding to registry"
        );
        Ok(())
    }
}
