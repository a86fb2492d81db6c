//! IAM role catalog
//!
//! Built-in role listing and per-resource grantable role queries.

use super::client::{collect_pages, with_query, GcpClient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Prefix turning a resource path into a Resource Manager full resource name
const FULL_RESOURCE_NAME_PREFIX: &str = "//cloudresourcemanager.googleapis.com/";

/// Largest page the IAM API accepts for role listings
const ROLE_PAGE_SIZE: &str = "1000";

/// IAM role with its permissions (`view=FULL`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamRole {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub included_permissions: Vec<String>,
}

/// `projects/foo` -> `//cloudresourcemanager.googleapis.com/projects/foo`
pub fn full_resource_name(resource: &str) -> String {
    format!("{}{}", FULL_RESOURCE_NAME_PREFIX, resource)
}

/// List the complete built-in role catalog
pub async fn list_roles(client: &GcpClient) -> Result<Vec<IamRole>> {
    let base = client.iam_url("roles");

    collect_pages("roles", |page_token| {
        let token = page_token.unwrap_or_default();
        let mut params = vec![("view", "FULL"), ("pageSize", ROLE_PAGE_SIZE)];
        if !token.is_empty() {
            params.push(("pageToken", token.as_str()));
        }
        let url = with_query(&base, &params);
        async move { client.get(&url?).await }
    })
    .await
    .context("Failed to list built-in roles")
}

/// List the roles grantable on a resource (`organizations/..`, `projects/..`)
pub async fn query_grantable_roles(client: &GcpClient, resource: &str) -> Result<Vec<IamRole>> {
    let url = client.iam_url("roles:queryGrantableRoles");
    let full_name = full_resource_name(resource);

    collect_pages("roles", |page_token| {
        let mut body = json!({
            "fullResourceName": full_name,
            "view": "FULL",
            "pageSize": 1000,
        });
        if let Some(token) = page_token {
            body["pageToken"] = json!(token);
        }
        let url = &url;
        async move { client.post(url, Some(&body)).await }
    })
    .await
    .with_context(|| format!("Failed to query grantable roles on {}", resource))
}
