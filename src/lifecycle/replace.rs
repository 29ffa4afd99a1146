//! Swaps one backing index of a data stream for its restored or shrunken
//! counterpart. For a stream backed by `[logs-000001, logs-000002]`,
//! replacing the first generation with `shrink-logs-000001` leaves the
//! stream backed by `[shrink-logs-000001, logs-000002]`; the original index
//! keeps existing but is no longer a member. The write index (the last
//! generation) is never replaced.

use crate::lifecycle::settings::target_index_name;
use crate::lifecycle::step::{ClusterStateStep, StepError, StepKey, StepOutcome};
use crate::topology::{IndexRef, TopologySnapshot};
use log::{debug, warn};

/// Well-known name of this step inside lifecycle policies.
pub const REPLACE_BACKING_INDEX_STEP: &str = "replace-datastream-backing-index";

/// Replaces a data-stream backing index with the target index derived by
/// prepending `target_prefix` to the source index's name. The target is
/// produced beforehand by another actor (shrink, snapshot restore); this
/// step only performs the membership substitution, and only once the target
/// is registered in the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceBackingIndexStep {
    key: StepKey,
    next_key: StepKey,
    target_prefix: String,
}

impl ReplaceBackingIndexStep {
    pub fn new(
        key: StepKey,
        next_key: StepKey,
        target_prefix: impl Into<String>,
    ) -> Result<Self, StepError> {
        let target_prefix = target_prefix.into();
        if target_prefix.is_empty() {
            return Err(StepError::EmptyTargetPrefix);
        }
        Ok(Self {
            key,
            next_key,
            target_prefix,
        })
    }

    pub fn target_prefix(&self) -> &str {
        &self.target_prefix
    }
}

impl ClusterStateStep for ReplaceBackingIndexStep {
    fn key(&self) -> &StepKey {
        &self.key
    }

    fn next_key(&self) -> Option<&StepKey> {
        Some(&self.next_key)
    }

    fn is_retryable(&self) -> bool {
        true
    }

    fn perform(
        &self,
        index: &IndexRef,
        snapshot: &TopologySnapshot,
    ) -> Result<StepOutcome, StepError> {
        let target_name = target_index_name(&self.target_prefix, &index.name);

        let Some(source) = snapshot.index_by_ref(index) else {
            // Deleted (or recreated under a new incarnation) since the step
            // was scheduled. Nothing left to replace.
            debug!(
                "event=replace_backing_index_skipped step={} index={} reason=source_index_gone",
                REPLACE_BACKING_INDEX_STEP, index
            );
            return Ok(StepOutcome::Unchanged);
        };
        let policy = source.lifecycle_policy().map(str::to_string);

        let Some(data_stream) = snapshot.parent_data_stream(&index.name) else {
            debug!(
                "event=replace_backing_index_halted step={} index={} policy={} reason=not_in_data_stream",
                REPLACE_BACKING_INDEX_STEP,
                index,
                policy.as_deref().unwrap_or("-")
            );
            return Err(StepError::NotInDataStream {
                index: index.name.clone(),
                policy,
            });
        };

        let write_index = data_stream.write_index()?;
        if write_index.name == index.name {
            warn!(
                "event=replace_backing_index_halted step={} index={} data_stream={} policy={} reason=write_index_protected",
                REPLACE_BACKING_INDEX_STEP,
                index,
                data_stream.name,
                policy.as_deref().unwrap_or("-")
            );
            return Err(StepError::WriteIndexProtected {
                index: index.name.clone(),
                data_stream: data_stream.name.clone(),
                policy,
            });
        }

        let Some(target) = snapshot.index(&target_name) else {
            debug!(
                "event=replace_backing_index_halted step={} index={} target={} policy={} reason=target_missing",
                REPLACE_BACKING_INDEX_STEP,
                index,
                target_name,
                policy.as_deref().unwrap_or("-")
            );
            return Err(StepError::TargetMissing {
                target: target_name,
                index: index.name.clone(),
                policy,
            });
        };

        // Membership was established by name; the substitution itself matches
        // the full reference. A stream naming this index under a different
        // incarnation is corrupt and surfaces as an inconsistency here.
        let replaced = data_stream.replace_backing_index(index, target.index.clone())?;
        debug!(
            "event=replace_backing_index_applied step={} index={} target={} data_stream={}",
            REPLACE_BACKING_INDEX_STEP, index, target.index, data_stream.name
        );
        Ok(StepOutcome::Advanced(snapshot.with_data_stream(replaced)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::settings::{LIFECYCLE_POLICY_SETTING, RESTORED_INDEX_PREFIX};
    use crate::topology::{
        DataStreamRecord, IndexRecord, TopologySnapshot, TopologySnapshotBuilder,
    };

    fn idx(name: &str) -> IndexRef {
        IndexRef::new(name, format!("uuid-{name}"))
    }

    fn managed(index: &IndexRef) -> IndexRecord {
        IndexRecord::new(index.clone()).with_setting(LIFECYCLE_POLICY_SETTING, "hot-to-frozen")
    }

    fn logs_builder() -> (TopologySnapshotBuilder, Vec<IndexRef>) {
        let members = vec![idx("logs-000001"), idx("logs-000002"), idx("logs-000003")];
        let mut builder = TopologySnapshot::builder(11);
        for member in &members {
            builder = builder.index(managed(member));
        }
        let builder = builder.data_stream(DataStreamRecord::new(
            "logs",
            "@timestamp",
            members.clone(),
            3,
        ));
        (builder, members)
    }

    fn restore_step() -> ReplaceBackingIndexStep {
        ReplaceBackingIndexStep::new(
            StepKey::new("frozen", "searchable_snapshot", REPLACE_BACKING_INDEX_STEP),
            StepKey::new("frozen", "searchable_snapshot", "delete-source-index"),
            RESTORED_INDEX_PREFIX,
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_prefix_at_construction() {
        let err = ReplaceBackingIndexStep::new(
            StepKey::new("frozen", "searchable_snapshot", REPLACE_BACKING_INDEX_STEP),
            StepKey::new("frozen", "searchable_snapshot", "delete-source-index"),
            "",
        )
        .unwrap_err();
        assert_eq!(err, StepError::EmptyTargetPrefix);
    }

    #[test]
    fn absent_source_is_a_benign_skip() {
        let (builder, _) = logs_builder();
        let snapshot = builder.build().unwrap();
        let outcome = restore_step()
            .perform(&idx("logs-999999"), &snapshot)
            .unwrap();
        assert_eq!(outcome, StepOutcome::Unchanged);
    }

    #[test]
    fn recreated_incarnation_is_a_benign_skip() {
        let (builder, members) = logs_builder();
        let snapshot = builder.build().unwrap();
        // Same name as a live backing index, different incarnation.
        let stale = IndexRef::new(members[0].name.clone(), "uuid-previous-incarnation");
        let outcome = restore_step().perform(&stale, &snapshot).unwrap();
        assert_eq!(outcome, StepOutcome::Unchanged);
    }

    #[test]
    fn index_outside_any_stream_is_retryable() {
        let orphan = idx("logs-000001");
        let snapshot = TopologySnapshot::builder(1)
            .index(managed(&orphan))
            .build()
            .unwrap();
        let err = restore_step().perform(&orphan, &snapshot).unwrap_err();
        assert_eq!(
            err,
            StepError::NotInDataStream {
                index: "logs-000001".to_string(),
                policy: Some("hot-to-frozen".to_string()),
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn write_index_is_never_replaced() {
        let (builder, members) = logs_builder();
        // Even with the target registered, the write index stays protected.
        let target = idx("restored-logs-000003");
        let snapshot = builder.index(managed(&target)).build().unwrap();

        let err = restore_step().perform(&members[2], &snapshot).unwrap_err();
        assert_eq!(
            err,
            StepError::WriteIndexProtected {
                index: "logs-000003".to_string(),
                data_stream: "logs".to_string(),
                policy: Some("hot-to-frozen".to_string()),
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_target_is_retryable_and_mutates_nothing() {
        let (builder, members) = logs_builder();
        let snapshot = builder.build().unwrap();
        let err = restore_step().perform(&members[0], &snapshot).unwrap_err();
        assert_eq!(
            err,
            StepError::TargetMissing {
                target: "restored-logs-000001".to_string(),
                index: "logs-000001".to_string(),
                policy: Some("hot-to-frozen".to_string()),
            }
        );
        assert!(err.is_retryable());
        assert_eq!(
            snapshot.data_stream("logs").unwrap().indices,
            members,
            "failed invocation must not touch the stream"
        );
    }

    #[test]
    fn successful_replacement_swaps_exactly_one_slot() {
        let (builder, members) = logs_builder();
        let target = idx("restored-logs-000001");
        let snapshot = builder.index(managed(&target)).build().unwrap();

        let outcome = restore_step().perform(&members[0], &snapshot).unwrap();
        let advanced = outcome.advanced().expect("step should advance");

        let stream = advanced.data_stream("logs").unwrap();
        assert_eq!(
            stream.indices,
            vec![target.clone(), members[1].clone(), members[2].clone()]
        );
        assert_eq!(stream.write_index().unwrap(), &members[2]);
        assert_eq!(advanced.version(), snapshot.version());
        // Source and target index records themselves are untouched.
        assert_eq!(advanced.index("logs-000001"), snapshot.index("logs-000001"));
        assert_eq!(
            advanced.index("restored-logs-000001"),
            snapshot.index("restored-logs-000001")
        );
    }

    #[test]
    fn second_invocation_after_success_reports_not_in_data_stream() {
        let (builder, members) = logs_builder();
        let target = idx("restored-logs-000001");
        let snapshot = builder.index(managed(&target)).build().unwrap();

        let step = restore_step();
        let advanced = step
            .perform(&members[0], &snapshot)
            .unwrap()
            .into_snapshot(&snapshot);

        // The source index still exists but is no longer a member; the
        // scheduler sees a retryable halt, not a silent success.
        let err = step.perform(&members[0], &advanced).unwrap_err();
        assert!(matches!(err, StepError::NotInDataStream { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn incarnation_mismatch_inside_stream_is_fatal() {
        let source = idx("logs-000001");
        let write = idx("logs-000002");
        let target = idx("restored-logs-000001");
        let snapshot = TopologySnapshot::builder(1)
            .index(managed(&source))
            .index(managed(&write))
            .index(managed(&target))
            .build()
            .unwrap();
        // Bypass the builder's validation to model upstream corruption: the
        // stream names the source index under a previous incarnation.
        let corrupted = snapshot.with_data_stream(DataStreamRecord::new(
            "logs",
            "@timestamp",
            vec![
                IndexRef::new("logs-000001", "uuid-previous-incarnation"),
                write.clone(),
            ],
            2,
        ));

        let err = restore_step().perform(&source, &corrupted).unwrap_err();
        assert!(matches!(err, StepError::InconsistentTopology(_)));
        assert!(!err.is_retryable());
    }
}
