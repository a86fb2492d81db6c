//! Member-centric view of IAM grants
//!
//! These types serialize directly into `members.json`:
//!
//! ```json
//! {"user:a@x.com": {"resources": [{"name": "projects/p1",
//!     "roles": [{"name": "roles/viewer", "permission_count": 3}]}]}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role name -> permissions granted by that role
pub type RoleCatalog = BTreeMap<String, Vec<String>>;

/// Member identity (`user:..`, `serviceAccount:..`, `group:..`) -> grants
pub type MemberMap = BTreeMap<String, Member>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permission_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub roles: Vec<Role>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// Sum of the permission counts of every role on this resource
    pub fn permission_sum(&self) -> usize {
        self.roles.iter().map(|r| r.permission_count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub resources: Vec<Resource>,
}

impl Member {
    /// Record `role` on `resource_name`, appending to an existing entry for
    /// that resource or creating one.
    ///
    /// Unknown roles count zero permissions.
    pub fn add_resource_role(&mut self, resource_name: &str, role: &str, catalog: &RoleCatalog) {
        let role = Role {
            name: role.to_string(),
            permission_count: permission_count(catalog, role),
        };

        match self.resources.iter_mut().find(|r| r.name == resource_name) {
            Some(resource) => resource.roles.push(role),
            None => {
                let mut resource = Resource::new(resource_name);
                resource.roles.push(role);
                self.resources.push(resource);
            }
        }
    }

    /// Append another member's resources. Entries sharing a resource name stay separate.
    pub fn merge(&mut self, other: Member) {
        self.resources.extend(other.resources);
    }
}

/// Number of permissions the catalog lists for `role`, zero when unknown
pub fn permission_count(catalog: &RoleCatalog, role: &str) -> usize {
    catalog.get(role).map_or(0, Vec::len)
}

/// Merge partial member maps into `into`, in iteration order
pub fn merge_member_maps<I>(into: &mut MemberMap, sources: I)
where
    I: IntoIterator<Item = MemberMap>,
{
    for source in sources {
        for (identity, member) in source {
            into.entry(identity).or_default().merge(member);
        }
    }
}
