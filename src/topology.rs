//! Immutable cluster-topology metadata: indices, data streams, and the
//! point-in-time snapshot that lifecycle steps compute over. Snapshots are
//! never mutated in place; every change derives a new value so concurrent
//! steps can each work from their own copy and submit results for an
//! optimistic merge.

use crate::lifecycle::settings::LIFECYCLE_POLICY_SETTING;
use crate::util::error::SerializationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identity of a single index incarnation. Two indices sharing a name but
/// created at different times carry different uuids, so a reference held
/// across a delete/recreate race never resolves to the impostor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRef {
    pub name: String,
    pub uuid: String,
}

impl IndexRef {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.uuid)
    }
}

/// Registered metadata for one index: its identity plus arbitrary
/// string-valued settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub index: IndexRef,
    pub settings: BTreeMap<String, String>,
}

impl IndexRecord {
    pub fn new(index: IndexRef) -> Self {
        Self {
            index,
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Name of the lifecycle policy managing this index, if any.
    pub fn lifecycle_policy(&self) -> Option<&str> {
        self.setting(LIFECYCLE_POLICY_SETTING)
    }
}

/// A named stream of indices ordered oldest to newest. The last entry is the
/// write index, the only one accepting new documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStreamRecord {
    pub name: String,
    pub timestamp_field: String,
    pub indices: Vec<IndexRef>,
    pub generation: u64,
}

impl DataStreamRecord {
    pub fn new(
        name: impl Into<String>,
        timestamp_field: impl Into<String>,
        indices: Vec<IndexRef>,
        generation: u64,
    ) -> Self {
        Self {
            name: name.into(),
            timestamp_field: timestamp_field.into(),
            indices,
            generation,
        }
    }

    /// The stream's write index. A stream with an empty backing sequence is
    /// corrupt; that state is reported rather than panicked on.
    pub fn write_index(&self) -> Result<&IndexRef, TopologyError> {
        self.indices
            .last()
            .ok_or_else(|| TopologyError::EmptyBackingSequence {
                data_stream: self.name.clone(),
            })
    }

    pub fn contains(&self, index: &IndexRef) -> bool {
        self.indices.iter().any(|member| member == index)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.indices.iter().any(|member| member.name == name)
    }

    /// Derives a new record with `existing` substituted by `replacement` at
    /// the same position. Sequence length, ordering, and the write-index slot
    /// are all preserved; replacing the write index itself is refused.
    pub fn replace_backing_index(
        &self,
        existing: &IndexRef,
        replacement: IndexRef,
    ) -> Result<DataStreamRecord, TopologyError> {
        if self.write_index()? == existing {
            return Err(TopologyError::WriteIndexSubstitution {
                data_stream: self.name.clone(),
                index: existing.name.clone(),
            });
        }
        let position = self
            .indices
            .iter()
            .position(|member| member == existing)
            .ok_or_else(|| TopologyError::NotABackingIndex {
                data_stream: self.name.clone(),
                index: existing.name.clone(),
            })?;
        let mut indices = self.indices.clone();
        indices[position] = replacement;
        Ok(DataStreamRecord {
            indices,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("data stream {data_stream} has no backing indices")]
    EmptyBackingSequence { data_stream: String },
    #[error("index {index} is not a backing index of data stream {data_stream}")]
    NotABackingIndex { data_stream: String, index: String },
    #[error("index {index} is the write index of data stream {data_stream} and cannot be substituted")]
    WriteIndexSubstitution { data_stream: String, index: String },
    #[error("data stream {data_stream} references index {index} which is not registered in the snapshot")]
    DanglingBackingIndex { data_stream: String, index: String },
    #[error("index {index} is a backing index of both {first} and {second}")]
    SharedBackingIndex {
        index: String,
        first: String,
        second: String,
    },
}

/// Point-in-time view of every index and data stream in the cluster. Values
/// of this type are immutable; `with_data_stream` derives the next snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    version: u64,
    indices: BTreeMap<String, IndexRecord>,
    data_streams: BTreeMap<String, DataStreamRecord>,
}

impl TopologySnapshot {
    pub fn builder(version: u64) -> TopologySnapshotBuilder {
        TopologySnapshotBuilder {
            version,
            indices: BTreeMap::new(),
            data_streams: BTreeMap::new(),
        }
    }

    /// Version of the authoritative topology this snapshot was taken from.
    /// Derived snapshots keep it, so the merge that accepts a transition can
    /// detect submissions computed from a stale view.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self, name: &str) -> Option<&IndexRecord> {
        self.indices.get(name)
    }

    /// Resolves a full index reference. A record under the same name whose
    /// uuid differs is a later incarnation, not a match.
    pub fn index_by_ref(&self, index: &IndexRef) -> Option<&IndexRecord> {
        self.indices
            .get(&index.name)
            .filter(|record| record.index.uuid == index.uuid)
    }

    pub fn data_stream(&self, name: &str) -> Option<&DataStreamRecord> {
        self.data_streams.get(name)
    }

    pub fn indices(&self) -> impl Iterator<Item = &IndexRecord> {
        self.indices.values()
    }

    pub fn data_streams(&self) -> impl Iterator<Item = &DataStreamRecord> {
        self.data_streams.values()
    }

    /// The data stream holding an index of this name as a backing member,
    /// if any. An index belongs to at most one stream (enforced at build
    /// time).
    pub fn parent_data_stream(&self, index_name: &str) -> Option<&DataStreamRecord> {
        self.data_streams
            .values()
            .find(|stream| stream.contains_name(index_name))
    }

    /// Derives the next snapshot with one data-stream record swapped in.
    /// Every other record is carried over untouched.
    pub fn with_data_stream(&self, record: DataStreamRecord) -> TopologySnapshot {
        let mut data_streams = self.data_streams.clone();
        data_streams.insert(record.name.clone(), record);
        TopologySnapshot {
            version: self.version,
            indices: self.indices.clone(),
            data_streams,
        }
    }

    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<TopologySnapshot, SerializationError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Assembles a snapshot and verifies its structural invariants: every stream
/// has at least one backing index, every backing reference resolves to a
/// registered index of the same incarnation, and no index backs two streams.
#[derive(Debug, Clone)]
pub struct TopologySnapshotBuilder {
    version: u64,
    indices: BTreeMap<String, IndexRecord>,
    data_streams: BTreeMap<String, DataStreamRecord>,
}

impl TopologySnapshotBuilder {
    pub fn index(mut self, record: IndexRecord) -> Self {
        self.indices.insert(record.index.name.clone(), record);
        self
    }

    pub fn data_stream(mut self, record: DataStreamRecord) -> Self {
        self.data_streams.insert(record.name.clone(), record);
        self
    }

    pub fn build(self) -> Result<TopologySnapshot, TopologyError> {
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for stream in self.data_streams.values() {
            if stream.indices.is_empty() {
                return Err(TopologyError::EmptyBackingSequence {
                    data_stream: stream.name.clone(),
                });
            }
            for member in &stream.indices {
                match self.indices.get(&member.name) {
                    Some(record) if record.index.uuid == member.uuid => {}
                    _ => {
                        return Err(TopologyError::DanglingBackingIndex {
                            data_stream: stream.name.clone(),
                            index: member.name.clone(),
                        })
                    }
                }
                if let Some(first) = owners.insert(&member.name, &stream.name) {
                    return Err(TopologyError::SharedBackingIndex {
                        index: member.name.clone(),
                        first: first.to_string(),
                        second: stream.name.clone(),
                    });
                }
            }
        }
        Ok(TopologySnapshot {
            version: self.version,
            indices: self.indices,
            data_streams: self.data_streams,
        })
    }
}
