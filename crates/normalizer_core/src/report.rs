use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ExtractionResult, SourceKind};

/// Emitted after each source finishes, in completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub source: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped_duplicates: usize,
    /// Successful results per kind.
    pub by_kind: BTreeMap<SourceKind, usize>,
}

impl BatchStats {
    pub fn tally(results: &[ExtractionResult], skipped_duplicates: usize) -> Self {
        let mut stats = BatchStats {
            total: results.len(),
            skipped_duplicates,
            ..Default::default()
        };
        for result in results {
            if result.is_success() {
                stats.success += 1;
                *stats.by_kind.entry(result.kind()).or_insert(0) += 1;
            } else {
                stats.failed += 1;
            }
        }
        stats
    }
}

/// Results in submission order plus aggregate statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ExtractionResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    pub fn get(&self, source: &str) -> Option<&ExtractionResult> {
        self.results.iter().find(|r| r.source() == source)
    }

    /// Rewrites every result and recomputes the statistics.
    pub fn map_results<F>(self, f: F) -> Self
    where
        F: FnMut(ExtractionResult) -> ExtractionResult,
    {
        let results: Vec<ExtractionResult> = self.results.into_iter().map(f).collect();
        let stats = BatchStats::tally(&results, self.stats.skipped_duplicates);
        BatchReport { results, stats }
    }
}
