//! Ranking of members by how many permissions they hold.

use super::model::{Member, MemberMap};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MemberType {
    ServiceAccount,
    User,
    Group,
}

impl MemberType {
    pub fn prefix(self) -> &'static str {
        match self {
            MemberType::ServiceAccount => "serviceAccount:",
            MemberType::User => "user:",
            MemberType::Group => "group:",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Permissions summed over every resource
    #[default]
    TotalSum,
    /// Permissions on the single most privileged resource
    TopSum,
}

impl SortKey {
    pub fn score(self, member: &Member) -> usize {
        let per_resource = member.resources.iter().map(|r| r.permission_sum());
        match self {
            SortKey::TotalSum => per_resource.sum(),
            SortKey::TopSum => per_resource.max().unwrap_or(0),
        }
    }
}

/// Members of the given type, most privileged first, at most `limit` of them.
///
/// Ties keep identity order.
pub fn rank_members<'a>(
    members: &'a MemberMap,
    member_type: Option<MemberType>,
    sort: SortKey,
    limit: usize,
) -> Vec<(&'a str, &'a Member)> {
    let prefix = member_type.map_or("", MemberType::prefix);

    let mut ranked: Vec<(&str, &Member)> = members
        .iter()
        .filter(|(identity, _)| identity.starts_with(prefix))
        .map(|(identity, member)| (identity.as_str(), member))
        .collect();

    ranked.sort_by_key(|(_, member)| std::cmp::Reverse(sort.score(member)));
    ranked.truncate(limit);
    ranked
}

/// Render ranked members as indented text
pub fn render_ranking(ranked: &[(&str, &Member)]) -> String {
    let mut out = String::new();

    for (identity, member) in ranked {
        let _ = writeln!(out, "\n{}:", identity);
        for resource in &member.resources {
            let roles: Vec<String> = resource
                .roles
                .iter()
                .map(|role| format!("{} ({} permissions)", role.name, role.permission_count))
                .collect();
            let _ = writeln!(out, "    {}: {}", resource.name, roles.join(","));
        }
    }

    out
}
