//! Feature-table persistence: two-column CSV files of opcode fingerprints.
//!
//! The on-disk shape is shared between extraction output and corpus input,
//! so a table written here reloads bit-for-bit: `Opcode,SHA-256 Hash` header
//! (ignored on read) followed by one `opcode,digest` row per opcode. Neither
//! column ever contains a comma, so no quoting layer is needed.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::classify::ProjectFeatures;
use crate::fingerprint::FeatureRow;

/// Header row of a feature table.
pub const FEATURE_CSV_HEADER: &str = "Opcode,SHA-256 Hash";

/// Error type for feature-table IO.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("failed to read feature table {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write feature table {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list feature directory {path}: {source}")]
    ListDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write fingerprint rows as a feature table, preserving row order.
pub fn write_feature_table(path: &Path, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    let mut body = String::with_capacity(rows.len() * 80 + FEATURE_CSV_HEADER.len() + 1);
    body.push_str(FEATURE_CSV_HEADER);
    body.push('\n');
    for row in rows {
        let _ = writeln!(body, "{},{}", row.opcode, row.digest);
    }
    fs::write(path, body)
        .map_err(|source| FeatureError::Write { path: path.display().to_string(), source })
}

/// Read a feature table into an opcode -> digest map.
///
/// The header row is skipped; rows without exactly two fields are ignored.
pub fn read_feature_table(path: &Path) -> Result<HashMap<String, String>, FeatureError> {
    let body = fs::read_to_string(path)
        .map_err(|source| FeatureError::Read { path: path.display().to_string(), source })?;

    let mut features = HashMap::new();
    for line in body.lines().skip(1) {
        let fields: Vec<&str> = line.split(',').collect();
        if let [opcode, digest] = fields[..] {
            features.insert(opcode.to_string(), digest.to_string());
        }
    }
    Ok(features)
}

/// Load every `*.csv` table in `dir` as a corpus.
///
/// The project name is the file stem. Entries are loaded in file-name order
/// so classification tie-breaking (first project wins) is deterministic
/// across platforms.
pub fn load_corpus(dir: &Path) -> Result<Vec<ProjectFeatures>, FeatureError> {
    let entries = fs::read_dir(dir)
        .map_err(|source| FeatureError::ListDir { path: dir.display().to_string(), source })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|source| FeatureError::ListDir { path: dir.display().to_string(), source })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut corpus = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let features = read_feature_table(&path)?;
        debug!(project = %name, features = features.len(), "loaded feature table");
        corpus.push(ProjectFeatures { name, features });
    }
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FeatureRow;

    fn rows() -> Vec<FeatureRow> {
        vec![
            FeatureRow { opcode: "mov".into(), digest: "a".repeat(64) },
            FeatureRow { opcode: "bl".into(), digest: "b".repeat(64) },
        ]
    }

    #[test]
    fn table_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("demo.csv");
        write_feature_table(&path, &rows()).expect("write table");

        let body = fs::read_to_string(&path).expect("read back");
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some(FEATURE_CSV_HEADER));
        assert_eq!(lines.next(), Some(format!("mov,{}", "a".repeat(64)).as_str()));

        let features = read_feature_table(&path).expect("parse table");
        assert_eq!(features.len(), 2);
        assert_eq!(features.get("bl"), Some(&"b".repeat(64)));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("odd.csv");
        fs::write(&path, "Opcode,SHA-256 Hash\nmov,aa\nnot a row\nbl,bb,extra\n").unwrap();
        let features = read_feature_table(&path).expect("parse table");
        assert_eq!(features.len(), 1);
        assert_eq!(features.get("mov").map(String::as_str), Some("aa"));
    }

    #[test]
    fn corpus_loads_in_file_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_feature_table(&dir.path().join("zeta.csv"), &rows()).unwrap();
        write_feature_table(&dir.path().join("alpha.csv"), &rows()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let corpus = load_corpus(dir.path()).expect("load corpus");
        let names: Vec<&str> = corpus.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
