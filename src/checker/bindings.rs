//! IAM policy collection and conversion to the member view
//!
//! Policies are gathered from the organization, each eligible project and
//! each folder, and merged in that order.

use super::fanout::{FanOut, FetchWarning};
use super::model::{merge_member_maps, MemberMap, RoleCatalog};
use crate::gcp::client::GcpClient;
use crate::gcp::policy::{get_iam_policy, Policy, PolicyTarget};
use crate::gcp::projects::Project;
use anyhow::Result;

/// One entry per (binding, member) pair, counted against the catalog
pub fn policy_to_members(
    resource_name: &str,
    policy: &Policy,
    catalog: &RoleCatalog,
) -> MemberMap {
    let mut members = MemberMap::new();

    for binding in &policy.bindings {
        for identity in &binding.members {
            members
                .entry(identity.clone())
                .or_default()
                .add_resource_role(resource_name, &binding.role, catalog);
        }
    }

    members
}

async fn fetch_members(
    client: &GcpClient,
    target: PolicyTarget,
    catalog: &RoleCatalog,
) -> Result<MemberMap> {
    let policy = get_iam_policy(client, &target).await?;
    Ok(policy_to_members(target.resource_name(), &policy, catalog))
}

async fn fan_out_policies<F>(
    client: &GcpClient,
    resources: Vec<String>,
    to_target: F,
    catalog: &RoleCatalog,
    fan_out: &FanOut,
) -> Result<(MemberMap, Vec<FetchWarning>)>
where
    F: Fn(String) -> PolicyTarget,
{
    let (partials, warnings) = fan_out
        .run(resources, |resource| {
            fetch_members(client, to_target(resource), catalog)
        })
        .await?;

    let mut members = MemberMap::new();
    merge_member_maps(&mut members, partials);
    Ok((members, warnings))
}

/// Collect and merge the member view of every policy source
pub async fn collect_bindings(
    client: &GcpClient,
    organization: &str,
    projects: &[Project],
    folders: &[String],
    catalog: &RoleCatalog,
    fan_out: &FanOut,
) -> Result<(MemberMap, Vec<FetchWarning>)> {
    let org_members = fetch_members(
        client,
        PolicyTarget::Organization(organization.to_string()),
        catalog,
    )
    .await?;
    tracing::info!("{} members hold roles on {}", org_members.len(), organization);

    let project_names = projects.iter().map(Project::resource_name).collect();
    let (project_members, mut warnings) =
        fan_out_policies(client, project_names, PolicyTarget::Project, catalog, fan_out).await?;
    tracing::info!(
        "{} members hold roles across {} projects",
        project_members.len(),
        projects.len()
    );

    let (folder_members, folder_warnings) = fan_out_policies(
        client,
        folders.to_vec(),
        PolicyTarget::Folder,
        catalog,
        fan_out,
    )
    .await?;
    warnings.extend(folder_warnings);
    tracing::info!(
        "{} members hold roles across {} folders",
        folder_members.len(),
        folders.len()
    );

    let mut members = MemberMap::new();
    merge_member_maps(&mut members, [org_members, project_members, folder_members]);
    Ok((members, warnings))
}
