//! IAM policy retrieval for organizations, projects and folders.

use super::client::GcpClient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Policy version that includes conditional role bindings
const REQUESTED_POLICY_VERSION: u32 = 3;

/// Resource whose IAM policy can be fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolicyTarget {
    /// `organizations/123`
    Organization(String),
    /// `projects/my-project`
    Project(String),
    /// `folders/456`
    Folder(String),
}

impl PolicyTarget {
    /// Resource path the bindings are reported under
    pub fn resource_name(&self) -> &str {
        match self {
            PolicyTarget::Organization(name)
            | PolicyTarget::Project(name)
            | PolicyTarget::Folder(name) => name,
        }
    }

    fn url(&self, client: &GcpClient) -> String {
        match self {
            PolicyTarget::Organization(name) | PolicyTarget::Project(name) => {
                client.resourcemanager_url(&format!("{}:getIamPolicy", name))
            }
            // Folder policies are only served by the v2 surface
            PolicyTarget::Folder(name) => client.folders_url(&format!("{}:getIamPolicy", name)),
        }
    }
}

/// Optional condition attached to a binding
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub title: String,
    pub expression: String,
}

/// One role granted to a set of members
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Fetch the current IAM policy of a resource
pub async fn get_iam_policy(client: &GcpClient, target: &PolicyTarget) -> Result<Policy> {
    let url = target.url(client);
    let body = json!({
        "options": { "requestedPolicyVersion": REQUESTED_POLICY_VERSION }
    });

    let response = client
        .post(&url, Some(&body))
        .await
        .with_context(|| format!("Failed to get IAM policy of {}", target.resource_name()))?;

    // An empty policy comes back as `{}` (or no body at all)
    if response.is_null() {
        return Ok(Policy::default());
    }

    serde_json::from_value(response)
        .with_context(|| format!("Failed to parse IAM policy of {}", target.resource_name()))
}
