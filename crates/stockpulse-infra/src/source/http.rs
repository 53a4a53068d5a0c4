//! reqwest client for the external inventory API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use stockpulse_core::domain::ExternalInventoryRecord;
use stockpulse_core::ports::{InventorySource, SourceError, SourcePage};

/// External source connection configuration.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base URL of the inventory API, without trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpSourceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SOURCE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            api_token: std::env::var("SOURCE_API_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("SOURCE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Records stay raw JSON here so one mistyped record cannot sink the page.
#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    records: Vec<serde_json::Value>,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl PageBody {
    fn into_page(self, account_id: &str) -> SourcePage {
        let mut records = Vec::with_capacity(self.records.len());
        let mut malformed = 0;

        for value in self.records {
            match serde_json::from_value::<ExternalInventoryRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::debug!(account_id = %account_id, error = %e, "Undecodable inventory record");
                    malformed += 1;
                }
            }
        }

        SourcePage {
            records,
            malformed,
            next_cursor: self.next_cursor.filter(|c| !c.is_empty()),
        }
    }
}

/// Paginated inventory client for one external API.
pub struct HttpInventorySource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpInventorySource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Fatal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, SourceError> {
        Self::new(HttpSourceConfig::from_env())
    }

    /// `{base}/accounts/{account}/inventory_levels`, with the account id as one
    /// percent-encoded path segment.
    fn page_url(&self, account_id: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| SourceError::Fatal(format!("invalid SOURCE_BASE_URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| SourceError::Fatal("SOURCE_BASE_URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["accounts", account_id, "inventory_levels"]);

        Ok(url)
    }
}

/// Upstream throttling and server faults are worth retrying; everything else is not.
fn classify_status(status: StatusCode) -> Option<SourceError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        Some(SourceError::Transient(format!("upstream returned {status}")))
    } else {
        Some(SourceError::Fatal(format!("upstream returned {status}")))
    }
}

fn classify_transport(e: reqwest::Error) -> SourceError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        SourceError::Transient(e.to_string())
    } else {
        SourceError::Fatal(e.to_string())
    }
}

#[async_trait]
impl InventorySource for HttpInventorySource {
    async fn fetch_page(
        &self,
        account_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<SourcePage, SourceError> {
        let mut req = self
            .client
            .get(self.page_url(account_id)?)
            .query(&[("limit", limit.to_string())]);

        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        if let Some(token) = &self.config.api_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(classify_transport)?;

        if let Some(err) = classify_status(resp.status()) {
            tracing::warn!(account_id = %account_id, status = %resp.status(), "Inventory page request failed");
            return Err(err);
        }

        let body: PageBody = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Transient(e.to_string())
            } else {
                SourceError::Fatal(format!("malformed page body: {e}"))
            }
        })?;

        let page = body.into_page(account_id);
        tracing::debug!(
            account_id = %account_id,
            records = page.records.len(),
            malformed = page.malformed,
            has_more = page.next_cursor.is_some(),
            "Fetched inventory page"
        );

        Ok(page)
    }
}
