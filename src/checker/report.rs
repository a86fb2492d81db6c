//! JSON artifacts written at the end of a run.

use super::model::{MemberMap, RoleCatalog};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ROLES_FILE: &str = "roles.json";
pub const MEMBERS_FILE: &str = "members.json";

/// Paths of the written artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub roles: PathBuf,
    pub members: PathBuf,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write `roles.json` and `members.json` into `data_dir`.
///
/// Both files are attempted even if the first one fails; any failure is
/// logged and the combined error lists every artifact that was not written.
pub fn write_report(
    data_dir: &Path,
    catalog: &RoleCatalog,
    members: &MemberMap,
) -> Result<WrittenReport> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let report = WrittenReport {
        roles: data_dir.join(ROLES_FILE),
        members: data_dir.join(MEMBERS_FILE),
    };

    let mut failed = Vec::new();
    for (path, result) in [
        (&report.roles, write_json(&report.roles, catalog)),
        (&report.members, write_json(&report.members, members)),
    ] {
        match result {
            Ok(()) => tracing::info!("Wrote {}", path.display()),
            Err(err) => {
                tracing::error!("{:#}", err);
                failed.push(path.display().to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!("Failed to write report artifacts: {}", failed.join(", "));
    }

    Ok(report)
}

/// Read a previously written `members.json`
pub fn load_members(data_dir: &Path) -> Result<MemberMap> {
    let path = data_dir.join(MEMBERS_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
