//! GCP Folders
//!
//! Folder listing through the Resource Manager v2 API.

use super::client::{collect_pages, with_query, GcpClient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Folder information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Resource path, e.g. `folders/123`
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub lifecycle_state: String,
}

/// List the immediate child folders of an organization or folder
pub async fn list_folders(client: &GcpClient, parent: &str) -> Result<Vec<Folder>> {
    let base = client.folders_url("folders");

    collect_pages("folders", |page_token| {
        let token = page_token.unwrap_or_default();
        let mut params = vec![("parent", parent)];
        if !token.is_empty() {
            params.push(("pageToken", token.as_str()));
        }
        let url = with_query(&base, &params);
        async move { client.get(&url?).await }
    })
    .await
    .with_context(|| format!("Failed to list folders under {}", parent))
}
