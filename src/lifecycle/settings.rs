//! Well-known lifecycle settings keys and index naming conventions.

/// Index setting carrying the name of the lifecycle policy managing it.
pub const LIFECYCLE_POLICY_SETTING: &str = "index.lifecycle.name";

/// Prefix given to an index produced by a shrink action.
pub const SHRUNKEN_INDEX_PREFIX: &str = "shrink-";

/// Prefix given to an index restored from a snapshot.
pub const RESTORED_INDEX_PREFIX: &str = "restored-";

/// Prefix given to a partially mounted searchable-snapshot index.
pub const PARTIAL_INDEX_PREFIX: &str = "partial-";

/// Name of the index expected to stand in for `source` after the action
/// identified by `prefix` has run.
pub fn target_index_name(prefix: &str, source: &str) -> String {
    format!("{prefix}{source}")
}
