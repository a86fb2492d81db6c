//! End-to-end checker runs against a mocked organization

mod common;

use common::{
    client_for, grantable_mock, mount_built_in_roles, mount_folders, mount_projects, policy_mock,
    project, role,
};
use gcp_role_checker::checker::fanout::{FailurePolicy, FanOut};
use gcp_role_checker::checker::model::MemberMap;
use gcp_role_checker::checker::report::{write_report, MEMBERS_FILE};
use gcp_role_checker::checker::walker::walk_folders;
use gcp_role_checker::checker::{run_checker, CheckerOptions};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG: &str = "organizations/111";

fn balanced_children(parent_id: &str, branching: usize) -> Vec<String> {
    (0..branching)
        .map(|i| format!("folders/{}{}", parent_id, i))
        .collect()
}

/// Mount a balanced tree of `depth` levels with `branching` children per node
async fn mount_balanced_tree(server: &MockServer, parent: &str, branching: usize, depth: usize) {
    let mut level = vec![parent.to_string()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for node in &level {
            let id = node.rsplit('/').next().unwrap_or_default();
            let id = if node.starts_with("organizations/") { "" } else { id };
            let children = balanced_children(id, branching);
            mount_folders(server, node, &children).await;
            next.extend(children);
        }
        level = next;
    }
    for leaf in &level {
        mount_folders(server, leaf, &[]).await;
    }
}

mod walker_tests {
    use super::*;

    #[tokio::test]
    async fn test_balanced_tree_returns_every_folder() {
        let server = MockServer::start().await;
        mount_balanced_tree(&server, ORG, 2, 3).await;

        let folders = walk_folders(&client_for(&server), ORG, FailurePolicy::Abort)
            .await
            .unwrap();

        // 2 + 4 + 8
        assert_eq!(folders.len(), 14);
        assert!(!folders.contains(&ORG.to_string()));
    }

    #[tokio::test]
    async fn test_children_precede_their_descendants() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &["folders/a".into(), "folders/b".into()]).await;
        mount_folders(&server, "folders/a", &["folders/a1".into()]).await;
        mount_folders(&server, "folders/a1", &[]).await;
        mount_folders(&server, "folders/b", &["folders/b1".into()]).await;
        mount_folders(&server, "folders/b1", &[]).await;

        let folders = walk_folders(&client_for(&server), ORG, FailurePolicy::Abort)
            .await
            .unwrap();
        assert_eq!(
            folders,
            vec!["folders/a", "folders/b", "folders/a1", "folders/b1"]
        );
    }

    #[tokio::test]
    async fn test_failed_subtree_is_skipped_when_continuing() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &["folders/a".into(), "folders/b".into()]).await;
        // folders/a has no mock: the listing 404s
        mount_folders(&server, "folders/b", &["folders/b1".into()]).await;
        mount_folders(&server, "folders/b1", &[]).await;

        let folders = walk_folders(&client_for(&server), ORG, FailurePolicy::Continue)
            .await
            .unwrap();
        assert_eq!(folders, vec!["folders/a", "folders/b", "folders/b1"]);
    }

    #[tokio::test]
    async fn test_failed_subtree_aborts_when_aborting() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &["folders/a".into()]).await;
        Mock::given(method("GET"))
            .and(path("/crm/v2/folders"))
            .and(query_param("parent", "folders/a"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = walk_folders(&client_for(&server), ORG, FailurePolicy::Abort).await;
        assert!(result.is_err());
    }
}

mod scenario_tests {
    use super::*;

    /// One project under the org, one under a folder outside the org's tree
    async fn mount_organization(server: &MockServer) {
        mount_folders(server, ORG, &[]).await;
        mount_projects(
            server,
            vec![
                project("p1", "organization", "111"),
                project("p2", "folder", "999"),
            ],
        )
        .await;

        mount_built_in_roles(
            server,
            vec![
                role("roles/viewer", &["a.get", "a.list", "b.get"]),
                role("roles/owner", &["*"]),
            ],
        )
        .await;
        grantable_mock(ORG, vec![role("roles/viewer", &["a.get", "a.list", "b.get"])])
            .mount(server)
            .await;
        grantable_mock("projects/p1", vec![]).mount(server).await;
        grantable_mock("projects/p2", vec![])
            .expect(0)
            .mount(server)
            .await;

        policy_mock("/crm/v1/organizations/111:getIamPolicy", json!([]))
            .mount(server)
            .await;
        policy_mock("/crm/v1/projects/p2:getIamPolicy", json!([]))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_project_outside_organization_contributes_nothing() {
        let server = MockServer::start().await;
        mount_organization(&server).await;
        policy_mock(
            "/crm/v1/projects/p1:getIamPolicy",
            json!([{"role": "roles/viewer", "members": ["user:a@x.com"]}]),
        )
        .expect(1)
        .mount(&server)
        .await;

        let report = run_checker(&client_for(&server), &CheckerOptions::new(ORG))
            .await
            .unwrap();

        assert_eq!(report.projects_listed, 2);
        assert_eq!(report.projects_audited, 1);
        assert!(report.warnings.is_empty());

        let tmp = tempfile::tempdir().unwrap();
        write_report(tmp.path(), &report.catalog, &report.members).unwrap();
        let members: Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join(MEMBERS_FILE)).unwrap())
                .unwrap();

        assert_eq!(
            members,
            json!({
                "user:a@x.com": {
                    "resources": [{
                        "name": "projects/p1",
                        "roles": [{"name": "roles/viewer", "permission_count": 3}]
                    }]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_merge_order_is_org_then_projects_then_folders() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &["folders/7".into()]).await;
        mount_folders(&server, "folders/7", &[]).await;
        mount_projects(&server, vec![project("p1", "folder", "7")]).await;
        mount_built_in_roles(&server, vec![role("roles/viewer", &["a.get"])]).await;
        grantable_mock(ORG, vec![]).mount(&server).await;
        grantable_mock("projects/p1", vec![]).mount(&server).await;

        let binding = json!([{"role": "roles/viewer", "members": ["user:a@x.com"]}]);
        policy_mock("/crm/v1/organizations/111:getIamPolicy", binding.clone())
            .mount(&server)
            .await;
        policy_mock("/crm/v1/projects/p1:getIamPolicy", binding.clone())
            .mount(&server)
            .await;
        policy_mock("/crm/v2/folders/7:getIamPolicy", binding)
            .mount(&server)
            .await;

        let report = run_checker(&client_for(&server), &CheckerOptions::new(ORG))
            .await
            .unwrap();

        let resources: Vec<_> = report.members["user:a@x.com"]
            .resources
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(resources, vec![ORG, "projects/p1", "folders/7"]);
        assert_eq!(report.folders, vec!["folders/7"]);
    }

    #[tokio::test]
    async fn test_policy_failure_is_fatal_by_default() {
        let server = MockServer::start().await;
        mount_organization(&server).await;
        Mock::given(method("POST"))
            .and(path("/crm/v1/projects/p1:getIamPolicy"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = run_checker(&client_for(&server), &CheckerOptions::new(ORG))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("projects/p1"));
    }

    #[tokio::test]
    async fn test_policy_failure_becomes_warning_when_continuing() {
        let server = MockServer::start().await;
        mount_organization(&server).await;
        Mock::given(method("POST"))
            .and(path("/crm/v1/projects/p1:getIamPolicy"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut options = CheckerOptions::new(ORG);
        options.fan_out = FanOut {
            max_concurrency: 2,
            on_error: FailurePolicy::Continue,
        };

        let report = run_checker(&client_for(&server), &options).await.unwrap();
        assert_eq!(report.members, MemberMap::new());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].resource, "projects/p1");
    }

    #[tokio::test]
    async fn test_built_in_catalog_failure_is_fatal() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &[]).await;
        mount_projects(&server, vec![]).await;
        Mock::given(method("GET"))
            .and(path("/iam/v1/roles"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut options = CheckerOptions::new(ORG);
        options.fan_out.on_error = FailurePolicy::Continue;

        assert!(run_checker(&client_for(&server), &options).await.is_err());
    }

    #[tokio::test]
    async fn test_org_grantable_roles_failure_is_fatal() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &[]).await;
        mount_projects(&server, vec![project("p1", "organization", "111")]).await;
        mount_built_in_roles(&server, vec![role("roles/viewer", &["a.get"])]).await;
        Mock::given(method("POST"))
            .and(path("/iam/v1/roles:queryGrantableRoles"))
            .and(body_partial_json(json!({
                "fullResourceName": "//cloudresourcemanager.googleapis.com/organizations/111"
            })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        grantable_mock("projects/p1", vec![])
            .expect(0)
            .mount(&server)
            .await;

        let mut options = CheckerOptions::new(ORG);
        options.fan_out.on_error = FailurePolicy::Continue;

        let err = run_checker(&client_for(&server), &options)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("organizations/111"));
    }

    #[tokio::test]
    async fn test_org_policy_failure_is_fatal_when_continuing() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &[]).await;
        mount_projects(&server, vec![project("p1", "organization", "111")]).await;
        mount_built_in_roles(&server, vec![role("roles/viewer", &["a.get"])]).await;
        grantable_mock(ORG, vec![]).mount(&server).await;
        grantable_mock("projects/p1", vec![]).mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/crm/v1/organizations/111:getIamPolicy"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        policy_mock("/crm/v1/projects/p1:getIamPolicy", json!([]))
            .expect(0)
            .mount(&server)
            .await;

        let mut options = CheckerOptions::new(ORG);
        options.fan_out.on_error = FailurePolicy::Continue;

        let err = run_checker(&client_for(&server), &options)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("organizations/111"));
    }

    #[tokio::test]
    async fn test_project_roles_override_org_and_built_in_roles() {
        let server = MockServer::start().await;
        mount_folders(&server, ORG, &[]).await;
        mount_projects(&server, vec![project("p1", "organization", "111")]).await;
        mount_built_in_roles(
            &server,
            vec![
                role("roles/viewer", &["a.get", "a.list", "b.get"]),
                role("roles/editor", &["a.get", "a.set", "b.get", "b.set"]),
                role("roles/owner", &["*"]),
            ],
        )
        .await;
        grantable_mock(
            ORG,
            vec![
                role("roles/viewer", &["a.get", "a.list"]),
                role("roles/editor", &["a.get", "a.set"]),
            ],
        )
        .mount(&server)
        .await;
        grantable_mock("projects/p1", vec![role("roles/viewer", &["a.get"])])
            .mount(&server)
            .await;

        policy_mock("/crm/v1/organizations/111:getIamPolicy", json!([]))
            .mount(&server)
            .await;
        policy_mock(
            "/crm/v1/projects/p1:getIamPolicy",
            json!([
                {"role": "roles/viewer", "members": ["user:a@x.com"]},
                {"role": "roles/editor", "members": ["user:a@x.com"]},
                {"role": "roles/owner", "members": ["user:a@x.com"]}
            ]),
        )
        .mount(&server)
        .await;

        let report = run_checker(&client_for(&server), &CheckerOptions::new(ORG))
            .await
            .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        write_report(tmp.path(), &report.catalog, &report.members).unwrap();
        let members: Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join(MEMBERS_FILE)).unwrap())
                .unwrap();

        assert_eq!(
            members["user:a@x.com"]["resources"][0]["roles"],
            json!([
                {"name": "roles/viewer", "permission_count": 1},
                {"name": "roles/editor", "permission_count": 2},
                {"name": "roles/owner", "permission_count": 1}
            ])
        );
    }

    #[tokio::test]
    async fn test_abort_stops_policy_fetches_after_first_failure() {
        let server = MockServer::start().await;
        let ids: Vec<String> = (0..10).map(|i| format!("p{}", i)).collect();

        mount_folders(&server, ORG, &[]).await;
        mount_projects(
            &server,
            ids.iter()
                .map(|id| project(id, "organization", "111"))
                .collect(),
        )
        .await;
        mount_built_in_roles(&server, vec![role("roles/viewer", &["a.get"])]).await;
        grantable_mock(ORG, vec![]).mount(&server).await;
        policy_mock("/crm/v1/organizations/111:getIamPolicy", json!([]))
            .mount(&server)
            .await;
        for id in &ids {
            let resource = format!("projects/{}", id);
            grantable_mock(&resource, vec![]).mount(&server).await;
            let policy_path = format!("/crm/v1/{}:getIamPolicy", resource);
            if id == "p0" {
                Mock::given(method("POST"))
                    .and(path(policy_path))
                    .respond_with(ResponseTemplate::new(403))
                    .mount(&server)
                    .await;
            } else {
                Mock::given(method("POST"))
                    .and(path(policy_path))
                    .respond_with(
                        ResponseTemplate::new(200)
                            .set_body_json(json!({}))
                            .set_delay(Duration::from_millis(100)),
                    )
                    .mount(&server)
                    .await;
            }
        }

        let mut options = CheckerOptions::new(ORG);
        options.fan_out.max_concurrency = 1;

        let err = run_checker(&client_for(&server), &options)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("projects/p0"));

        let requests = server.received_requests().await.unwrap();
        let project_policy_calls = requests
            .iter()
            .filter(|r| {
                let path = r.url.path();
                path.starts_with("/crm/v1/projects/") && path.ends_with(":getIamPolicy")
            })
            .count();
        assert_eq!(project_policy_calls, 1);
    }

    #[tokio::test]
    async fn test_rejects_malformed_organization() {
        let server = MockServer::start().await;
        let result = run_checker(&client_for(&server), &CheckerOptions::new("123")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_roles_output_is_identical_across_runs() {
        let server = MockServer::start().await;
        mount_organization(&server).await;
        policy_mock("/crm/v1/projects/p1:getIamPolicy", json!([]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = run_checker(&client, &CheckerOptions::new(ORG)).await.unwrap();
        let second = run_checker(&client, &CheckerOptions::new(ORG)).await.unwrap();

        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let a = write_report(first_dir.path(), &first.catalog, &first.members).unwrap();
        let b = write_report(second_dir.path(), &second.catalog, &second.members).unwrap();
        assert_eq!(
            std::fs::read(a.roles).unwrap(),
            std::fs::read(b.roles).unwrap()
        );
    }
}
