//! Project discovery and filtering
//!
//! Projects are listed with a server-side filter (always `ACTIVE`, plus any
//! label equalities) and the same filter is re-checked locally. Only projects
//! whose parent is the organization or one of its folders are eligible for
//! role discovery and policy fetches.

use crate::gcp::client::GcpClient;
use crate::gcp::projects::{list_projects, Project};
use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashSet};

const ACTIVE: &str = "ACTIVE";

/// Parse `env:dev,project:foo` into label pairs.
///
/// Empty segments are ignored. The value is everything after the first `:`.
pub fn parse_labels(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();

    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((key, value)) = segment.split_once(':') else {
            bail!("Invalid project label '{}': expected key:value", segment);
        };
        if key.is_empty() {
            bail!("Invalid project label '{}': empty key", segment);
        }
        labels.insert(key.to_string(), value.to_string());
    }

    Ok(labels)
}

/// Lifecycle and label constraints applied to listed projects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub labels: BTreeMap<String, String>,
}

impl ProjectFilter {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    /// Resource Manager filter expression; space-separated terms are ANDed
    pub fn expression(&self) -> String {
        let mut terms = vec![format!("lifecycleState:{}", ACTIVE)];
        terms.extend(
            self.labels
                .iter()
                .map(|(key, value)| format!("labels.{}={}", key, value)),
        );
        terms.join(" ")
    }

    /// Local re-check of [`Self::expression`]. Label values compare
    /// case-insensitively, as the server filter does.
    pub fn matches(&self, project: &Project) -> bool {
        project.lifecycle_state == ACTIVE
            && self.labels.iter().all(|(key, value)| {
                project
                    .labels
                    .get(key)
                    .is_some_and(|actual| actual.eq_ignore_ascii_case(value))
            })
    }
}

/// Every parent a project may sit under to be audited
#[derive(Debug, Clone, Default)]
pub struct ValidParents(HashSet<String>);

impl ValidParents {
    pub fn new(organization: &str, folders: &[String]) -> Self {
        let mut parents = HashSet::with_capacity(folders.len() + 1);
        parents.insert(organization.to_string());
        parents.extend(folders.iter().cloned());
        Self(parents)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.0.contains(resource)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectDiscovery {
    /// Every project that passed the filter
    pub all: Vec<Project>,
    /// Projects whose parent is in [`ValidParents`]
    pub eligible: Vec<Project>,
}

/// Split already-listed projects by filter and parent eligibility
pub fn partition_projects(
    projects: Vec<Project>,
    filter: &ProjectFilter,
    valid_parents: &ValidParents,
) -> ProjectDiscovery {
    let all: Vec<Project> = projects.into_iter().filter(|p| filter.matches(p)).collect();
    let eligible = all
        .iter()
        .filter(|p| {
            p.parent_path()
                .is_some_and(|parent| valid_parents.contains(&parent))
        })
        .cloned()
        .collect();

    ProjectDiscovery { all, eligible }
}

/// List projects and select the ones to audit
pub async fn discover_projects(
    client: &GcpClient,
    filter: &ProjectFilter,
    valid_parents: &ValidParents,
) -> Result<ProjectDiscovery> {
    let expression = filter.expression();
    tracing::debug!("Listing projects with filter '{}'", expression);

    let listed = list_projects(client, &expression).await?;
    let listed_count = listed.len();
    let discovery = partition_projects(listed, filter, valid_parents);

    tracing::info!(
        "Listed {} projects, {} match the filter, {} sit under the organization's folders",
        listed_count,
        discovery.all.len(),
        discovery.eligible.len()
    );

    Ok(discovery)
}
