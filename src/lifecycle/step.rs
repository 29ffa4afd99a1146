//! The contract between lifecycle steps and the scheduler driving them:
//! step identity, the outcome of one invocation, and the failure taxonomy
//! the scheduler bases its retry decisions on.

use crate::topology::{IndexRef, TopologyError, TopologySnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coordinates of one step inside a lifecycle policy: the phase it belongs
/// to, the action within that phase, and the step's own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepKey {
    pub phase: String,
    pub action: String,
    pub name: String,
}

impl StepKey {
    pub fn new(
        phase: impl Into<String>,
        action: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            phase: phase.into(),
            action: action.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.phase, self.action, self.name)
    }
}

/// Result of one step invocation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The transition had nothing to do; the input snapshot stands.
    Unchanged,
    /// The transition applied. The scheduler should submit the new snapshot
    /// for merge and move the lifecycle to the step's successor.
    Advanced(TopologySnapshot),
}

impl StepOutcome {
    pub fn advanced(&self) -> Option<&TopologySnapshot> {
        match self {
            StepOutcome::Advanced(snapshot) => Some(snapshot),
            StepOutcome::Unchanged => None,
        }
    }

    /// The topology to continue from: the new snapshot when the step
    /// advanced, `current` otherwise.
    pub fn into_snapshot(self, current: &TopologySnapshot) -> TopologySnapshot {
        match self {
            StepOutcome::Advanced(snapshot) => snapshot,
            StepOutcome::Unchanged => current.clone(),
        }
    }
}

/// Why a step invocation could not advance the lifecycle. Each variant is
/// classified as retryable (re-dispatch later, unchanged) or not (halt until
/// an operator or another actor intervenes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(
        "index {index} is not part of a data stream; stopping execution of lifecycle {} until the index is added to a data stream",
        .policy.as_deref().unwrap_or("<unmanaged>")
    )]
    NotInDataStream {
        index: String,
        policy: Option<String>,
    },
    #[error(
        "index {index} is the write index for data stream {data_stream}; stopping execution of lifecycle {} as a data stream's write index cannot be replaced. manually rolling over the data stream will resume the policy once the index is no longer its write index",
        .policy.as_deref().unwrap_or("<unmanaged>")
    )]
    WriteIndexProtected {
        index: String,
        data_stream: String,
        policy: Option<String>,
    },
    #[error(
        "target index {target} does not exist; stopping execution of lifecycle {} for index {index}",
        .policy.as_deref().unwrap_or("<unmanaged>")
    )]
    TargetMissing {
        target: String,
        index: String,
        policy: Option<String>,
    },
    #[error("target index prefix must not be empty")]
    EmptyTargetPrefix,
    #[error("inconsistent topology: {0}")]
    InconsistentTopology(#[from] TopologyError),
}

impl StepError {
    /// Whether the scheduler may re-dispatch the step unchanged and expect
    /// it to eventually succeed once external state catches up. Everything
    /// else requires intervention and must not be blindly retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StepError::NotInDataStream { .. } | StepError::TargetMissing { .. }
        )
    }
}

/// A single cluster-state transition inside a lifecycle policy. A step is a
/// pure function over a topology snapshot: it never performs I/O and never
/// mutates its input, so the scheduler is free to re-invoke it on every
/// retry and to run steps for different indices concurrently.
pub trait ClusterStateStep {
    fn key(&self) -> &StepKey;

    /// The step to run after this one advances, if any.
    fn next_key(&self) -> Option<&StepKey>;

    /// Whether the step as a whole tolerates blind re-dispatch after an
    /// error. Individual errors refine this via [`StepError::is_retryable`].
    fn is_retryable(&self) -> bool;

    fn perform(
        &self,
        index: &IndexRef,
        snapshot: &TopologySnapshot,
    ) -> Result<StepOutcome, StepError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_taxonomy() {
        let retryable = [
            StepError::NotInDataStream {
                index: "logs-000001".to_string(),
                policy: Some("hot-to-frozen".to_string()),
            },
            StepError::TargetMissing {
                target: "restored-logs-000001".to_string(),
                index: "logs-000001".to_string(),
                policy: None,
            },
        ];
        for err in retryable {
            assert!(err.is_retryable(), "{err} should be retryable");
        }

        let terminal = [
            StepError::WriteIndexProtected {
                index: "logs-000003".to_string(),
                data_stream: "logs".to_string(),
                policy: Some("hot-to-frozen".to_string()),
            },
            StepError::EmptyTargetPrefix,
            StepError::InconsistentTopology(TopologyError::EmptyBackingSequence {
                data_stream: "logs".to_string(),
            }),
        ];
        for err in terminal {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn unmanaged_indices_are_reported_as_such() {
        let err = StepError::NotInDataStream {
            index: "logs-000001".to_string(),
            policy: None,
        };
        assert!(err.to_string().contains("<unmanaged>"));
    }

    #[test]
    fn step_key_displays_full_path() {
        let key = StepKey::new("frozen", "searchable_snapshot", "swap-backing-index");
        assert_eq!(key.to_string(), "frozen/searchable_snapshot/swap-backing-index");
    }
}
