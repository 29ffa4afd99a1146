//! Convenience re-exports for downstream crates. Pull this module in via
//! `use streamor::prelude::*;` when you want the most common types without
//! spelunking the module tree.

pub use crate::lifecycle::replace::{ReplaceBackingIndexStep, REPLACE_BACKING_INDEX_STEP};
pub use crate::lifecycle::step::{ClusterStateStep, StepError, StepKey, StepOutcome};
pub use crate::topology::{
    DataStreamRecord, IndexRecord, IndexRef, TopologyError, TopologySnapshot,
    TopologySnapshotBuilder,
};
pub use crate::util::error::{Result as StreamorResult, SerializationError, StreamorError};
