//! Bounded fan-out of per-resource API calls
//!
//! One future per resource, at most `max_concurrency` in flight. Outcomes are
//! consumed as they complete and [`FailurePolicy`] decides what a failure
//! means: `abort` returns on the first one, `continue` drains every call
//! before anything is merged.

use anyhow::Result;
use clap::ValueEnum;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::pin;

pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// What to do when a remote call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the run on the first failure; nothing is written
    Abort,
    /// Keep going and report the failure as a warning
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// A failure tolerated under [`FailurePolicy::Continue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWarning {
    pub resource: String,
    pub message: String,
}

impl fmt::Display for FetchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.message)
    }
}

/// Result of one fanned-out call
#[derive(Debug)]
struct Outcome<T> {
    resource: String,
    result: Result<T>,
}

/// Concurrency and failure settings shared by every fan-out phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    pub max_concurrency: usize,
    pub on_error: FailurePolicy,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            on_error: FailurePolicy::Abort,
        }
    }
}

impl FanOut {
    /// Run `call` once per resource.
    ///
    /// Under [`FailurePolicy::Abort`] the first failure is returned as soon as
    /// it completes. Calls still in flight are dropped and no new call starts.
    /// Values come back in completion order.
    pub async fn run<T, F, Fut>(
        &self,
        resources: Vec<String>,
        call: F,
    ) -> Result<(Vec<T>, Vec<FetchWarning>)>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut outcomes = pin!(stream::iter(resources)
            .map(|resource| {
                let pending = call(resource.clone());
                async move {
                    Outcome {
                        resource,
                        result: pending.await,
                    }
                }
            })
            .buffer_unordered(self.max_concurrency.max(1)));

        let mut values = Vec::new();
        let mut warnings = Vec::new();
        while let Some(outcome) = outcomes.next().await {
            if let Some(value) = self.settle(outcome, &mut warnings)? {
                values.push(value);
            }
        }

        Ok((values, warnings))
    }

    /// Apply `on_error` to one outcome
    fn settle<T>(
        &self,
        outcome: Outcome<T>,
        warnings: &mut Vec<FetchWarning>,
    ) -> Result<Option<T>> {
        match outcome.result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self.on_error {
                FailurePolicy::Abort => Err(err),
                FailurePolicy::Continue => {
                    tracing::warn!("Skipping {}: {:#}", outcome.resource, err);
                    warnings.push(FetchWarning {
                        resource: outcome.resource,
                        message: format!("{:#}", err),
                    });
                    Ok(None)
                }
            },
        }
    }
}
