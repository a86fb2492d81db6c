//! Role catalog assembly
//!
//! Sources, in increasing precedence: the built-in catalog, roles grantable on
//! the organization, roles grantable on each eligible project. A role name seen
//! in several sources keeps the permission list of the last one.

use super::fanout::{FanOut, FetchWarning};
use super::model::RoleCatalog;
use crate::gcp::client::GcpClient;
use crate::gcp::iam::{list_roles, query_grantable_roles, IamRole};
use crate::gcp::projects::Project;
use anyhow::Result;

/// Turn an IAM role listing into a catalog
pub fn catalog_from_roles(roles: Vec<IamRole>) -> RoleCatalog {
    roles
        .into_iter()
        .map(|role| (role.name, role.included_permissions))
        .collect()
}

/// Merge catalogs in order; later sources replace earlier entries
pub fn merge_catalogs<I>(sources: I) -> RoleCatalog
where
    I: IntoIterator<Item = RoleCatalog>,
{
    let mut merged = RoleCatalog::new();
    for source in sources {
        merged.extend(source);
    }
    merged
}

/// Fetch and merge every role source
pub async fn build_role_catalog(
    client: &GcpClient,
    organization: &str,
    projects: &[Project],
    fan_out: &FanOut,
) -> Result<(RoleCatalog, Vec<FetchWarning>)> {
    let built_in = catalog_from_roles(list_roles(client).await?);
    tracing::info!("Loaded {} built-in roles", built_in.len());

    let org_roles = catalog_from_roles(query_grantable_roles(client, organization).await?);
    tracing::info!("{} roles grantable on {}", org_roles.len(), organization);

    let resources = projects.iter().map(Project::resource_name).collect();
    let (project_roles, warnings) = fan_out
        .run(resources, |resource| async move {
            query_grantable_roles(client, &resource)
                .await
                .map(catalog_from_roles)
        })
        .await?;
    tracing::info!("Queried grantable roles on {} projects", project_roles.len());

    let catalog = merge_catalogs([built_in, org_roles].into_iter().chain(project_roles));
    tracing::info!("Role catalog holds {} roles", catalog.len());

    Ok((catalog, warnings))
}
