//! Similarity-based classification against a corpus of feature tables.
//!
//! Each known project contributes an opcode -> digest map. A target file
//! matches a project on the fraction of the *project's* opcodes whose digest
//! equals the target's digest for the same opcode, so similarity 1.0 means
//! every feature of that project was reproduced exactly.

use std::collections::HashMap;

use serde::Serialize;

/// Feature set of one known project.
#[derive(Debug, Clone)]
pub struct ProjectFeatures {
    pub name: String,
    /// opcode -> SHA-256 hex digest.
    pub features: HashMap<String, String>,
}

/// Best match found for a target against a corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub project: String,
    /// `matched / total`, in [0.0, 1.0].
    pub similarity: f64,
    /// Opcodes of the project whose digest the target reproduced exactly.
    pub matched: usize,
    /// Size of the project's feature set.
    pub total: usize,
}

impl MatchResult {
    /// Complete identification: every project feature matched.
    pub fn is_exact(&self) -> bool {
        self.similarity == 1.0
    }
}

/// Classify a target opcode->digest map against the corpus.
///
/// Projects with an empty feature set are skipped (their ratio is undefined).
/// On equal similarity the earlier project in corpus order wins; callers that
/// need a different tie-break must order the corpus themselves.
/// Returns `None` when the corpus has no scorable project.
pub fn classify(target: &HashMap<String, String>, corpus: &[ProjectFeatures]) -> Option<MatchResult> {
    let mut best: Option<MatchResult> = None;

    for project in corpus {
        let total = project.features.len();
        if total == 0 {
            continue;
        }

        let matched = project
            .features
            .iter()
            .filter(|(opcode, digest)| target.get(opcode.as_str()) == Some(digest))
            .count();
        let similarity = matched as f64 / total as f64;

        let better = match &best {
            Some(current) => similarity > current.similarity,
            None => true,
        };
        if better {
            best = Some(MatchResult { project: project.name.clone(), similarity, matched, total });
        }
    }

    best
}
