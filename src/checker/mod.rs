//! Organization-wide IAM role audit
//!
//! The pipeline runs once per invocation:
//!
//! 1. [`walker`] - recursive folder discovery under the organization
//! 2. [`discovery`] - project listing, label filtering, parent eligibility
//! 3. [`catalog`] - built-in + organization + per-project grantable roles
//! 4. [`bindings`] - IAM policies of the organization, projects and folders
//! 5. [`model`] - merge into one member -> resource -> role view
//! 6. [`report`] - `roles.json` and `members.json`
//!
//! [`audit`] ranks the resulting members for a quick read-out.

pub mod audit;
pub mod bindings;
pub mod catalog;
pub mod discovery;
pub mod fanout;
pub mod model;
pub mod report;
pub mod walker;

use crate::gcp::client::GcpClient;
use anyhow::{bail, Result};
use discovery::{discover_projects, ProjectFilter, ValidParents};
use fanout::{FailurePolicy, FanOut, FetchWarning};
use model::{MemberMap, RoleCatalog};

/// Inputs of one audit run
#[derive(Debug, Clone)]
pub struct CheckerOptions {
    /// `organizations/<id>`
    pub organization: String,
    pub project_filter: ProjectFilter,
    pub fan_out: FanOut,
    /// Failure handling while walking the folder tree
    pub folder_errors: FailurePolicy,
}

impl CheckerOptions {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            project_filter: ProjectFilter::default(),
            fan_out: FanOut::default(),
            folder_errors: FailurePolicy::Continue,
        }
    }
}

/// Everything collected by a run
#[derive(Debug, Clone, Default)]
pub struct CheckerReport {
    pub catalog: RoleCatalog,
    pub members: MemberMap,
    pub folders: Vec<String>,
    pub projects_listed: usize,
    pub projects_audited: usize,
    /// Failures tolerated under [`FailurePolicy::Continue`]
    pub warnings: Vec<FetchWarning>,
}

/// Collect the role catalog and the member view of an organization
pub async fn run_checker(client: &GcpClient, options: &CheckerOptions) -> Result<CheckerReport> {
    let organization = options.organization.as_str();
    if !organization.starts_with("organizations/") {
        bail!(
            "Invalid organization '{}': expected organizations/<id>",
            organization
        );
    }

    tracing::info!("Walking folders under {}", organization);
    let folders = walker::walk_folders(client, organization, options.folder_errors).await?;

    let valid_parents = ValidParents::new(organization, &folders);
    let projects = discover_projects(client, &options.project_filter, &valid_parents).await?;

    tracing::info!("Building role catalog");
    let (catalog, mut warnings) = catalog::build_role_catalog(
        client,
        organization,
        &projects.eligible,
        &options.fan_out,
    )
    .await?;

    tracing::info!("Collecting IAM policies");
    let (members, binding_warnings) = bindings::collect_bindings(
        client,
        organization,
        &projects.eligible,
        &folders,
        &catalog,
        &options.fan_out,
    )
    .await?;
    warnings.extend(binding_warnings);

    tracing::info!(
        "Collected {} members across {} projects and {} folders",
        members.len(),
        projects.eligible.len(),
        folders.len()
    );

    Ok(CheckerReport {
        catalog,
        members,
        folders,
        projects_listed: projects.all.len(),
        projects_audited: projects.eligible.len(),
        warnings,
    })
}
