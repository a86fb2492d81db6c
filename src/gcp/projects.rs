//! GCP Projects
//!
//! Functions for listing GCP projects through Resource Manager v1.

use super::client::{collect_pages, with_query, GcpClient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parent of a project as reported by the API (`{"type": "folder", "id": "123"}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceId {
    /// Resource path of the parent, e.g. `folders/123` or `organizations/456`
    pub fn resource_path(&self) -> String {
        format!("{}s/{}", self.kind, self.id)
    }
}

/// Project information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_number: String,
    #[serde(default)]
    pub lifecycle_state: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub parent: Option<ResourceId>,
}

impl Project {
    /// Resource path used for IAM calls, e.g. `projects/my-project`
    pub fn resource_name(&self) -> String {
        format!("projects/{}", self.project_id)
    }

    pub fn parent_path(&self) -> Option<String> {
        self.parent.as_ref().map(ResourceId::resource_path)
    }
}

/// List every project matching a Resource Manager filter expression
pub async fn list_projects(client: &GcpClient, filter: &str) -> Result<Vec<Project>> {
    let base = client.resourcemanager_url("projects");

    collect_pages("projects", |page_token| {
        let token = page_token.unwrap_or_default();
        let mut params = vec![("filter", filter)];
        if !token.is_empty() {
            params.push(("pageToken", token.as_str()));
        }
        let url = with_query(&base, &params);
        async move { client.get(&url?).await }
    })
    .await
    .context("Failed to list projects")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_from_api_json() {
        let project: Project = serde_json::from_value(json!({
            "projectId": "my-project",
            "name": "My Project",
            "projectNumber": "1234",
            "lifecycleState": "ACTIVE",
            "labels": {"env": "prod"},
            "parent": {"type": "folder", "id": "987"}
        }))
        .unwrap();

        assert_eq!(project.resource_name(), "projects/my-project");
        assert_eq!(project.parent_path().as_deref(), Some("folders/987"));
        assert_eq!(project.labels.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_project_without_optional_fields() {
        let project: Project = serde_json::from_value(json!({"projectId": "bare"})).unwrap();
        assert!(project.parent_path().is_none());
        assert!(project.labels.is_empty());
    }
}
