//! Snapshot persistence for the whole store.
//!
//! A snapshot is a one-line header carrying a format version and a CRC32C of
//! the body, followed by the JSON body:
//!
//! ```text
//! REVERIE-SNAPSHOT v1 crc32c=1a2b3c4d
//! {"version":1,"dim_vector":64,"age":12,"concepts":[...],"relations":[...]}
//! ```
//!
//! Restoring always builds a fresh store and validates every record before
//! handing it back, so callers can swap it in only on success.

use crate::category::Category;
use crate::concept::{Concept, ConceptSpec, Relation, validate_vector};
use crate::error::{NetworkError, NetworkResult};
use crate::metrics::MetricsSnapshot;
use crate::store::{ConceptStore, StoreConfig, refresh_weakness};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MAGIC: &str = "REVERIE-SNAPSHOT";
const FORMAT_VERSION: u32 = 1;

/// Persisted form of a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    /// Unique name
    pub name: String,
    /// Base vector
    pub base_vector: Vec<f32>,
    /// Strength in [0, 1]
    pub strength: f32,
    /// Store age at registration
    pub created_at: u64,
    /// Category
    pub category: Category,
    /// Parents of synthesized concepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    /// Visit counter
    #[serde(default)]
    pub activation_count: u64,
    /// Age of the last visit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activated_at: Option<u64>,
    /// Age since which strength has been under the floor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weak_since: Option<u64>,
}

/// Persisted form of a relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    /// Source concept
    pub source: String,
    /// Target concept
    pub target: String,
    /// Weight in [0, 1]
    pub weight: f32,
    /// Store age at creation
    pub discovery_age: u64,
    /// Provenance tag
    pub context: String,
    /// Co-occurrence counter used for novelty
    #[serde(default)]
    pub cooccurrence_count: u64,
    /// Age of the last reinforcement; defaults to `discovery_age`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reinforced_at: Option<u64>,
    /// Age since which the weight has been under the floor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weak_since: Option<u64>,
}

/// Complete serialisable copy of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Body format version
    pub version: u32,
    /// Vector width of every concept
    pub dim_vector: usize,
    /// Store age at capture
    pub age: u64,
    /// Concepts in name order
    pub concepts: Vec<ConceptRecord>,
    /// Relations in (source, target) order
    pub relations: Vec<RelationRecord>,
    /// Network counters at capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

impl Snapshot {
    /// Copy the full state of `store`
    #[must_use]
    pub fn capture(store: &ConceptStore) -> Self {
        let concepts = store
            .concepts()
            .map(|c| ConceptRecord {
                name: c.name.clone(),
                base_vector: c.base_vector.clone(),
                strength: c.strength,
                created_at: c.created_at,
                category: c.category,
                parents: c.parents.iter().cloned().collect(),
                activation_count: c.activation_count,
                last_activated_at: c.last_activated_at,
                weak_since: c.weak_since,
            })
            .collect();
        let relations = store
            .relations()
            .map(|r| RelationRecord {
                source: r.source.clone(),
                target: r.target.clone(),
                weight: r.weight,
                discovery_age: r.discovery_age,
                context: r.context.clone(),
                cooccurrence_count: r.cooccurrence_count,
                last_reinforced_at: Some(r.last_reinforced_at),
                weak_since: r.weak_since,
            })
            .collect();
        Self {
            version: FORMAT_VERSION,
            dim_vector: store.dim(),
            age: store.age(),
            concepts,
            relations,
            metrics: None,
        }
    }

    /// Attach counter values to carry across restarts
    #[must_use]
    pub const fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Encode with header and checksum.
    ///
    /// # Errors
    ///
    /// [`NetworkError::SnapshotCorrupt`] if the body cannot be serialised
    /// (non-finite floats).
    pub fn to_bytes(&self) -> NetworkResult<Vec<u8>> {
        let body = serde_json::to_vec(self)
            .map_err(|e| NetworkError::corrupt("body", format!("serialisation failed: {e}")))?;
        let checksum = crc32c::crc32c(&body);
        let mut out = Vec::with_capacity(body.len() + 48);
        writeln!(out, "{MAGIC} v{FORMAT_VERSION} crc32c={checksum:08x}")
            .map_err(|e| NetworkError::corrupt("header", e.to_string()))?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode and verify header and checksum. Record-level checks happen in
    /// [`Snapshot::restore`].
    ///
    /// # Errors
    ///
    /// [`NetworkError::SnapshotCorrupt`] naming `header` or `body`.
    pub fn from_bytes(bytes: &[u8]) -> NetworkResult<Self> {
        let split = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| NetworkError::corrupt("header", "missing header line"))?;
        let (header, body) = (&bytes[..split], &bytes[split + 1..]);
        let header = std::str::from_utf8(header)
            .map_err(|_| NetworkError::corrupt("header", "header is not UTF-8"))?;

        let mut parts = header.split_whitespace();
        if parts.next() != Some(MAGIC) {
            return Err(NetworkError::corrupt("header", "not a snapshot file"));
        }
        let version = parts
            .next()
            .and_then(|v| v.strip_prefix('v'))
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| NetworkError::corrupt("header", "missing format version"))?;
        if version != FORMAT_VERSION {
            return Err(NetworkError::corrupt(
                "header",
                format!("unsupported format version {version}"),
            ));
        }
        let expected = parts
            .next()
            .and_then(|c| c.strip_prefix("crc32c="))
            .and_then(|c| u32::from_str_radix(c, 16).ok())
            .ok_or_else(|| NetworkError::corrupt("header", "missing checksum"))?;
        let actual = crc32c::crc32c(body);
        if actual != expected {
            return Err(NetworkError::corrupt(
                "body",
                format!("checksum mismatch: header {expected:08x}, body {actual:08x}"),
            ));
        }

        serde_json::from_slice(body)
            .map_err(|e| NetworkError::corrupt("body", format!("invalid JSON: {e}")))
    }

    /// Build a new store from this snapshot, validating every record.
    ///
    /// `config` supplies the non-persisted tuning (floors, history length).
    ///
    /// # Errors
    ///
    /// [`NetworkError::SnapshotCorrupt`] naming the first invalid record.
    pub fn restore(&self, config: StoreConfig) -> NetworkResult<ConceptStore> {
        if self.version != FORMAT_VERSION {
            return Err(NetworkError::corrupt(
                "header",
                format!("unsupported body version {}", self.version),
            ));
        }
        if self.dim_vector != config.dim_vector {
            return Err(NetworkError::corrupt(
                "header",
                format!(
                    "dim_vector {} does not match store dimension {}",
                    self.dim_vector, config.dim_vector
                ),
            ));
        }

        let mut store = ConceptStore::new(config)?;
        store.set_age(self.age);
        let concept_floor = store.config().concept_floor;
        let relation_floor = store.config().relation_floor;

        for (i, record) in self.concepts.iter().enumerate() {
            let at = || format!("concepts[{i}] '{}'", record.name);
            if record.name.is_empty() {
                return Err(NetworkError::corrupt(at(), "empty name"));
            }
            if store.contains(&record.name) {
                return Err(NetworkError::corrupt(at(), "duplicate name"));
            }
            validate_vector(&record.name, &record.base_vector, self.dim_vector)
                .map_err(|e| NetworkError::corrupt(at(), e.to_string()))?;
            if !record.strength.is_finite() || !(0.0..=1.0).contains(&record.strength) {
                return Err(NetworkError::corrupt(
                    at(),
                    format!("strength {} outside [0, 1]", record.strength),
                ));
            }
            let spec = ConceptSpec::new(record.name.clone())
                .with_strength(record.strength)
                .with_category(record.category)
                .with_parents(record.parents.iter().cloned());
            let mut concept = Concept::new(spec, record.base_vector.clone(), record.created_at);
            concept.activation_count = record.activation_count;
            concept.last_activated_at = record.last_activated_at;
            concept.weak_since = record.weak_since;
            refresh_weakness(
                &mut concept.weak_since,
                concept.strength,
                concept_floor,
                self.age,
            );
            store.insert_concept(concept);
        }

        for (i, record) in self.relations.iter().enumerate() {
            let at = || format!("relations[{i}] '{}' -> '{}'", record.source, record.target);
            if record.source == record.target {
                return Err(NetworkError::corrupt(at(), "self loop"));
            }
            if !store.contains(&record.source) || !store.contains(&record.target) {
                return Err(NetworkError::corrupt(at(), "endpoint is not a known concept"));
            }
            if store.relation(&record.source, &record.target).is_some() {
                return Err(NetworkError::corrupt(at(), "duplicate relation"));
            }
            if !record.weight.is_finite() || !(0.0..=1.0).contains(&record.weight) {
                return Err(NetworkError::corrupt(
                    at(),
                    format!("weight {} outside [0, 1]", record.weight),
                ));
            }
            let mut relation = Relation::new(
                record.source.clone(),
                record.target.clone(),
                record.weight,
                record.discovery_age,
                record.context.clone(),
            );
            relation.cooccurrence_count = record.cooccurrence_count;
            relation.last_reinforced_at = record.last_reinforced_at.unwrap_or(record.discovery_age);
            relation.weak_since = record.weak_since;
            refresh_weakness(
                &mut relation.weak_since,
                relation.weight,
                relation_floor,
                self.age,
            );
            store.insert_relation(relation);
        }

        debug!(
            target: "reverie::snapshot",
            concepts = store.len(),
            relations = store.relation_count(),
            "snapshot restored into staging store"
        );
        Ok(store)
    }
}

/// Where snapshot blobs live. The core only needs put and get.
pub trait SnapshotSink: Send + Sync {
    /// Persist a blob, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Io`] when the backing medium fails.
    fn put(&self, bytes: &[u8]) -> NetworkResult<()>;

    /// Fetch the last persisted blob, if any.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Io`] when the backing medium fails.
    fn get(&self) -> NetworkResult<Option<Vec<u8>>>;
}

/// Snapshot stored in a single file, replaced atomically via rename
#[derive(Debug, Clone)]
pub struct FileSnapshotSink {
    path: PathBuf,
}

impl FileSnapshotSink {
    /// Sink writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> NetworkError {
        NetworkError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SnapshotSink for FileSnapshotSink {
    fn put(&self, bytes: &[u8]) -> NetworkResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, bytes).map_err(|e| self.io_error(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))?;
        info!(
            target: "reverie::snapshot",
            path = %self.path.display(),
            bytes = bytes.len(),
            "snapshot written"
        );
        Ok(())
    }

    fn get(&self) -> NetworkResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-process sink, handy for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySnapshotSink {
    blob: Mutex<Option<Vec<u8>>>,
}

impl SnapshotSink for MemorySnapshotSink {
    fn put(&self, bytes: &[u8]) -> NetworkResult<()> {
        *self.blob.lock() = Some(bytes.to_vec());
        Ok(())
    }

    fn get(&self) -> NetworkResult<Option<Vec<u8>>> {
        Ok(self.blob.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config() -> StoreConfig {
        StoreConfig {
            dim_vector: 3,
            ..StoreConfig::default()
        }
    }

    fn sample() -> ConceptStore {
        let mut rng = StdRng::seed_from_u64(17);
        let mut store = ConceptStore::new(config()).unwrap();
        store.add_concept("a", None, &mut rng).unwrap();
        store.add_concept("b", None, &mut rng).unwrap();
        store.relate("a", "b", 0.4, "doc-1").unwrap();
        store.tick();
        store
    }

    #[test]
    fn header_carries_checksum() {
        let bytes = Snapshot::capture(&sample()).to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("REVERIE-SNAPSHOT v1 crc32c="));
    }

    #[test]
    fn flipped_byte_is_detected() {
        let mut bytes = Snapshot::capture(&sample()).to_bytes().unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0x01;
        let err = Snapshot::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, NetworkError::SnapshotCorrupt { ref record, .. } if record == "body"));
    }

    #[test]
    fn dangling_relation_names_record() {
        let mut snapshot = Snapshot::capture(&sample());
        snapshot.relations[0].target = "ghost".to_string();
        let err = snapshot.restore(config()).unwrap_err();
        match err {
            NetworkError::SnapshotCorrupt { record, .. } => {
                assert!(record.starts_with("relations[0]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn restore_preserves_age_and_metadata() {
        let original = sample();
        let restored = Snapshot::capture(&original).restore(config()).unwrap();
        assert_eq!(restored.age(), 1);
        let relation = restored.relation("a", "b").unwrap();
        assert_eq!(relation.context, "doc-1");
        assert_eq!(relation.weight, 0.4);
    }

    #[test]
    fn retention_clock_survives_restore() {
        let config = StoreConfig {
            retention_window: 5,
            ..config()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut live = ConceptStore::new(config.clone()).unwrap();
        live.add_concept("a", None, &mut rng).unwrap();
        live.add_concept("b", None, &mut rng).unwrap();
        live.relate("a", "b", 0.5, "").unwrap();
        live.tick();
        live.decay_unused(0.01, 0).unwrap();
        assert_eq!(live.relation("a", "b").unwrap().weak_since, Some(1));
        for _ in 0..10 {
            live.tick();
        }

        let snapshot = Snapshot::capture(&live);
        let bytes = snapshot.to_bytes().unwrap();
        let mut restored = Snapshot::from_bytes(&bytes).unwrap().restore(config).unwrap();
        assert_eq!(restored.relation("a", "b").unwrap().weak_since, Some(1));

        let expected = live.prune();
        let pruned = restored.prune();
        assert_eq!(pruned.removed_relations.len(), expected.removed_relations.len());
        assert_eq!(pruned.removed_concepts.len(), expected.removed_concepts.len());
        assert!(!pruned.is_empty());
    }

    #[test]
    fn missing_weakness_stamp_starts_at_snapshot_age() {
        let mut snapshot = Snapshot::capture(&sample());
        snapshot.relations[0].weight = 0.0;
        snapshot.relations[0].weak_since = None;
        let restored = snapshot.restore(config()).unwrap();
        assert_eq!(restored.relation("a", "b").unwrap().weak_since, Some(1));
    }

    #[test]
    fn metrics_ride_along_in_the_body() {
        let counters = MetricsSnapshot {
            cycles: 4,
            auto_modifications: 9,
            emergences: 2,
            syntheses: 1,
        };
        let bytes = Snapshot::capture(&sample())
            .with_metrics(counters)
            .to_bytes()
            .unwrap();
        let decoded = Snapshot::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.metrics, Some(counters));
    }

    #[test]
    fn memory_sink_round_trip() {
        let sink = MemorySnapshotSink::default();
        assert!(sink.get().unwrap().is_none());
        sink.put(b"blob").unwrap();
        assert_eq!(sink.get().unwrap().as_deref(), Some(&b"blob"[..]));
    }
}
