use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::domain::document::{IndexedRecord, Metric};
use crate::error::MatchError;

/// First line of a snapshot file. Records the embedding configuration the
/// vectors were produced under, so a later load (or a query-side consumer)
/// can reject vectors built with a different model or normalization mode
/// instead of silently degrading similarity quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotManifest {
    pub model: String,
    pub dimension: usize,
    pub normalized: bool,
    pub metric: Metric,
}

#[derive(Debug)]
pub struct Snapshot {
    pub manifest: SnapshotManifest,
    pub records: Vec<IndexedRecord>,
}

/// Writes an embedding snapshot as JSONL: the manifest on line one, then
/// one record per line. Vector and metadata travel in the same row, which
/// is what keeps them aligned.
pub fn write_snapshot(
    path: &Path,
    manifest: &SnapshotManifest,
    records: &[IndexedRecord],
) -> Result<(), MatchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MatchError::SnapshotInvalid(format!("cannot create {parent:?}: {e}")))?;
    }
    let file = File::create(path)
        .map_err(|e| MatchError::SnapshotInvalid(format!("cannot create {path:?}: {e}")))?;
    let mut out = BufWriter::new(file);

    let manifest_line = serde_json::to_string(manifest)
        .map_err(|e| MatchError::SnapshotInvalid(format!("manifest serialization failed: {e}")))?;
    writeln!(out, "{manifest_line}")
        .map_err(|e| MatchError::SnapshotInvalid(format!("write failed: {e}")))?;

    for record in records {
        if record.vector.len() != manifest.dimension {
            return Err(MatchError::DimensionMismatch {
                index: format!("snapshot {path:?}"),
                expected: manifest.dimension,
                actual: record.vector.len(),
            });
        }
        let line = serde_json::to_string(record).map_err(|e| {
            MatchError::SnapshotInvalid(format!("record '{}' serialization failed: {e}", record.id))
        })?;
        writeln!(out, "{line}")
            .map_err(|e| MatchError::SnapshotInvalid(format!("write failed: {e}")))?;
    }
    out.flush()
        .map_err(|e| MatchError::SnapshotInvalid(format!("write failed: {e}")))?;

    info!("Wrote {} records to snapshot {path:?}", records.len());
    Ok(())
}

/// Loads a snapshot and validates every record against its manifest.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, MatchError> {
    let file = File::open(path)
        .map_err(|e| MatchError::SnapshotInvalid(format!("cannot open {path:?}: {e}")))?;
    let mut lines = BufReader::new(file).lines();

    let manifest_line = lines
        .next()
        .ok_or_else(|| MatchError::SnapshotInvalid(format!("{path:?} is empty")))?
        .map_err(|e| MatchError::SnapshotInvalid(format!("read failed: {e}")))?;
    let manifest: SnapshotManifest = serde_json::from_str(&manifest_line)
        .map_err(|e| MatchError::SnapshotInvalid(format!("malformed manifest: {e}")))?;

    let mut records = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line.map_err(|e| MatchError::SnapshotInvalid(format!("read failed: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: IndexedRecord = serde_json::from_str(&line).map_err(|e| {
            MatchError::SnapshotInvalid(format!("malformed record on line {}: {e}", line_no + 2))
        })?;
        if record.vector.len() != manifest.dimension {
            return Err(MatchError::DimensionMismatch {
                index: format!("snapshot {path:?}"),
                expected: manifest.dimension,
                actual: record.vector.len(),
            });
        }
        records.push(record);
    }

    debug!("Loaded {} records from snapshot {path:?}", records.len());
    Ok(Snapshot { manifest, records })
}

/// Rejects a snapshot whose embedding configuration disagrees with the
/// running one. Querying an index built under a different model or
/// normalization mode produces incomparable scores with no runtime signal,
/// so the mismatch is checked here instead.
pub fn validate_manifest(
    manifest: &SnapshotManifest,
    model: &str,
    normalized: bool,
) -> Result<(), MatchError> {
    if manifest.model != model {
        return Err(MatchError::SnapshotInvalid(format!(
            "snapshot was built with model '{}', current model is '{model}'",
            manifest.model
        )));
    }
    if manifest.normalized != normalized {
        return Err(MatchError::SnapshotInvalid(format!(
            "snapshot normalization ({}) differs from configured normalization ({normalized})",
            manifest.normalized
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::IndexedRecord;
    use tempfile::tempdir;

    fn manifest() -> SnapshotManifest {
        SnapshotManifest {
            model: "AllMiniLML6V2".to_string(),
            dimension: 3,
            normalized: true,
            metric: Metric::Cosine,
        }
    }

    #[test]
    fn snapshot_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resume_embeddings.jsonl");
        let records = vec![
            IndexedRecord::new("r1", vec![0.1, 0.2, 0.3]).with_metadata("category", "CHEF"),
            IndexedRecord::new("r2", vec![0.4, 0.5, 0.6]).with_metadata("category", "HR"),
        ];

        write_snapshot(&path, &manifest(), &records).unwrap();
        let snapshot = read_snapshot(&path).unwrap();

        assert_eq!(snapshot.manifest, manifest());
        assert_eq!(snapshot.records, records);
    }

    #[test]
    fn rejects_record_with_wrong_dimension_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        let records = vec![IndexedRecord::new("r1", vec![0.1, 0.2])];
        let err = write_snapshot(&path, &manifest(), &records).unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.jsonl");
        std::fs::write(&path, "this is not json\n").unwrap();
        let err = read_snapshot(&path).unwrap_err();
        assert!(matches!(err, MatchError::SnapshotInvalid(_)));
    }

    #[test]
    fn manifest_mismatch_is_rejected() {
        let m = manifest();
        assert!(validate_manifest(&m, "AllMiniLML6V2", true).is_ok());
        assert!(matches!(
            validate_manifest(&m, "BGESmallENV15", true),
            Err(MatchError::SnapshotInvalid(_))
        ));
        assert!(matches!(
            validate_manifest(&m, "AllMiniLML6V2", false),
            Err(MatchError::SnapshotInvalid(_))
        ));
    }
}
