//! Audit IAM role bindings across a GCP organization.
//!
//! Walks the organization's folder tree, lists its projects, builds the role
//! catalog and flattens every IAM policy into a per-member view written to
//! `roles.json` and `members.json`.

pub mod checker;
pub mod config;
pub mod gcp;
