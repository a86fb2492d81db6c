//! GCP API interaction module
//!
//! Thin REST adapters over the Cloud Resource Manager and IAM APIs. Every
//! function takes the [`client::GcpClient`] it should use; nothing is looked
//! up from ambient state.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Main GCP client, endpoints and paging
//! - [`http`] - HTTP utilities for REST API calls
//! - [`projects`] - Project listing (Resource Manager v1)
//! - [`folders`] - Folder listing (Resource Manager v2)
//! - [`iam`] - Role catalog and grantable roles
//! - [`policy`] - IAM policies of organizations, projects and folders
//!
//! # Example
//!
//! ```ignore
//! use gcp_role_checker::gcp::client::{Endpoints, GcpClient};
//! use gcp_role_checker::gcp::policy::{get_iam_policy, PolicyTarget};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new(Endpoints::default()).await?;
//!     let target = PolicyTarget::Organization("organizations/123".into());
//!     let policy = get_iam_policy(&client, &target).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod folders;
pub mod http;
pub mod iam;
pub mod policy;
pub mod projects;
