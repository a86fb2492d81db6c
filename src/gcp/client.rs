//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use url::Url;

/// Base URLs of the APIs the checker talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Cloud Resource Manager v1 (projects, organizations)
    pub crm_v1: String,
    /// Cloud Resource Manager v2 (folders)
    pub crm_v2: String,
    /// IAM v1 (role catalog)
    pub iam_v1: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            crm_v1: "https://cloudresourcemanager.googleapis.com/v1".to_string(),
            crm_v2: "https://cloudresourcemanager.googleapis.com/v2".to_string(),
            iam_v1: "https://iam.googleapis.com/v1".to_string(),
        }
    }
}

impl Endpoints {
    /// All three APIs served under one host, e.g. an emulator or mock server
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            crm_v1: format!("{}/crm/v1", base),
            crm_v2: format!("{}/crm/v2", base),
            iam_v1: format!("{}/iam/v1", base),
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(endpoints: Endpoints) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, endpoints)
    }

    /// Create a client around already-resolved credentials
    pub fn with_credentials(credentials: GcpCredentials, endpoints: Endpoints) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoints,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build Resource Manager v1 API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.crm_v1, path)
    }

    /// Build Resource Manager v2 (folders) API URL
    pub fn folders_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.crm_v2, path)
    }

    /// Build IAM API URL
    pub fn iam_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.iam_v1, path)
    }
}

/// Append query parameters to a URL
pub fn with_query(url: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(url).with_context(|| format!("Invalid API URL: {}", url))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url.into())
}

/// Fetch every page of a list call and deserialize the items under `items_key`
///
/// `fetch_page` receives the page token of the page to fetch (`None` for the
/// first page). Paging stops when a response carries no `nextPageToken`.
pub async fn collect_pages<T, F, Fut>(items_key: &str, mut fetch_page: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut page = fetch_page(page_token.take()).await?;

        if let Some(Value::Array(items)) = page.get_mut(items_key).map(Value::take) {
            for item in items {
                let item = serde_json::from_value(item)
                    .with_context(|| format!("Failed to parse an entry of '{}'", items_key))?;
                all_items.push(item);
            }
        }

        match page.get("nextPageToken").and_then(|v| v.as_str()) {
            Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
            _ => break,
        }
    }

    Ok(all_items)
}
