//! Recursive folder discovery under an organization or folder.

use super::fanout::FailurePolicy;
use crate::gcp::client::GcpClient;
use crate::gcp::folders::list_folders;
use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

/// List every folder nested under `parent`, excluding `parent` itself.
///
/// Each level lists the direct children first, followed by the descendants of
/// each child in turn. With [`FailurePolicy::Continue`] a parent whose children
/// cannot be listed is treated as a leaf; with [`FailurePolicy::Abort`] the
/// failure ends the walk.
pub async fn walk_folders(
    client: &GcpClient,
    parent: &str,
    on_error: FailurePolicy,
) -> Result<Vec<String>> {
    let folders = walk(client, parent.to_string(), on_error).await?;
    tracing::info!("Discovered {} folders under {}", folders.len(), parent);
    Ok(folders)
}

fn walk(
    client: &GcpClient,
    parent: String,
    on_error: FailurePolicy,
) -> LocalBoxFuture<'_, Result<Vec<String>>> {
    async move {
        let children = match list_folders(client, &parent).await {
            Ok(children) => children,
            Err(err) if on_error == FailurePolicy::Continue => {
                tracing::warn!("Skipping folders under {}: {:#}", parent, err);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut names: Vec<String> = children.into_iter().map(|f| f.name).collect();
        tracing::debug!("{} has {} direct child folders", parent, names.len());

        for child in names.clone() {
            let descendants = walk(client, child, on_error).await?;
            names.extend(descendants);
        }

        Ok(names)
    }
    .boxed_local()
}
