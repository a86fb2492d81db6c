//! Mock GCP endpoints shared by the integration tests

#![allow(dead_code)]

use gcp_role_checker::gcp::auth::GcpCredentials;
use gcp_role_checker::gcp::client::{Endpoints, GcpClient};
use serde_json::{json, Value};
use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";

pub fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(
        GcpCredentials::from_static_token(TOKEN),
        Endpoints::with_base(&server.uri()),
    )
    .expect("client should build")
}

pub fn role(name: &str, permissions: &[&str]) -> Value {
    json!({
        "name": name,
        "title": name,
        "includedPermissions": permissions,
    })
}

pub fn project(id: &str, parent_type: &str, parent_id: &str) -> Value {
    json!({
        "projectId": id,
        "name": id,
        "projectNumber": "1",
        "lifecycleState": "ACTIVE",
        "labels": {},
        "parent": {"type": parent_type, "id": parent_id},
    })
}

/// Child folders of `parent`, single page
pub async fn mount_folders(server: &MockServer, parent: &str, children: &[String]) {
    let folders: Vec<Value> = children
        .iter()
        .map(|name| json!({"name": name, "displayName": name, "parent": parent}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/crm/v2/folders"))
        .and(query_param("parent", parent))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "folders": folders })))
        .mount(server)
        .await;
}

pub async fn mount_projects(server: &MockServer, projects: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/crm/v1/projects"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "projects": projects })))
        .mount(server)
        .await;
}

pub async fn mount_built_in_roles(server: &MockServer, roles: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/iam/v1/roles"))
        .and(query_param("view", "FULL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "roles": roles })))
        .mount(server)
        .await;
}

/// Grantable roles of `resource` (`organizations/..` or `projects/..`)
pub fn grantable_mock(resource: &str, roles: Vec<Value>) -> Mock {
    Mock::given(method("POST"))
        .and(path("/iam/v1/roles:queryGrantableRoles"))
        .and(body_partial_json(json!({
            "fullResourceName": format!("//cloudresourcemanager.googleapis.com/{}", resource)
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "roles": roles })))
}

/// IAM policy at `policy_path` (e.g. `/crm/v1/projects/p1:getIamPolicy`)
pub fn policy_mock(policy_path: &str, bindings: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path(policy_path))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": 1,
            "etag": "BwX=",
            "bindings": bindings,
        })))
}
