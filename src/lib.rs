//! Core library for the streamor data-stream lifecycle engine: an immutable
//! cluster-topology model plus the idempotent state transitions lifecycle
//! policies run against it. The flagship transition swaps a data stream's
//! backing index for a restored or shrunken counterpart without ever
//! touching the stream's write index.

pub mod lifecycle;
pub mod prelude;
pub mod topology;
pub mod util;

pub use lifecycle::replace::{ReplaceBackingIndexStep, REPLACE_BACKING_INDEX_STEP};
pub use lifecycle::settings::{
    target_index_name, LIFECYCLE_POLICY_SETTING, PARTIAL_INDEX_PREFIX, RESTORED_INDEX_PREFIX,
    SHRUNKEN_INDEX_PREFIX,
};
pub use lifecycle::step::{ClusterStateStep, StepError, StepKey, StepOutcome};
pub use topology::{
    DataStreamRecord, IndexRecord, IndexRef, TopologyError, TopologySnapshot,
    TopologySnapshotBuilder,
};
pub use util::error::{Result as StreamorResult, SerializationError, StreamorError};
