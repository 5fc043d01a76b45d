use std::collections::{BTreeMap, HashSet};

use crate::{BatchReport, BatchStats, ExtractionResult};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    Running,
    /// Cancel requested; no new intake, in-flight jobs still report back.
    Cancelling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobEntry {
    pub(crate) source: String,
    pub(crate) result: Option<ExtractionResult>,
}

/// Bookkeeping for one batch run. Jobs are keyed by submission order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchState {
    phase: BatchPhase,
    next_job_id: JobId,
    jobs: BTreeMap<JobId, JobEntry>,
    seen: HashSet<String>,
    completed: usize,
    skipped_duplicates: usize,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn skipped_duplicates(&self) -> usize {
        self.skipped_duplicates
    }

    /// True once every submitted job has a result (vacuously true when empty).
    pub fn is_complete(&self) -> bool {
        self.completed == self.jobs.len()
    }

    /// Jobs that have not reported a result yet, in submission order.
    pub fn pending(&self) -> Vec<(JobId, String)> {
        self.jobs
            .iter()
            .filter(|(_, entry)| entry.result.is_none())
            .map(|(id, entry)| (*id, entry.source.clone()))
            .collect()
    }

    pub fn report(&self) -> BatchReport {
        let results: Vec<ExtractionResult> = self
            .jobs
            .values()
            .filter_map(|entry| entry.result.clone())
            .collect();
        let stats = BatchStats::tally(&results, self.skipped_duplicates);
        BatchReport { results, stats }
    }

    pub(crate) fn set_phase(&mut self, phase: BatchPhase) {
        self.phase = phase;
    }

    /// Registers a source unless it was already submitted in this batch.
    pub(crate) fn register(&mut self, source: String) -> Option<JobId> {
        if !self.seen.insert(source.clone()) {
            self.skipped_duplicates += 1;
            return None;
        }
        self.next_job_id += 1;
        let job_id = self.next_job_id;
        self.jobs.insert(
            job_id,
            JobEntry {
                source,
                result: None,
            },
        );
        Some(job_id)
    }

    /// Stores a result for a pending job; returns the job's source on success.
    pub(crate) fn record(&mut self, job_id: JobId, result: ExtractionResult) -> Option<String> {
        let entry = self.jobs.get_mut(&job_id)?;
        if entry.result.is_some() {
            return None;
        }
        entry.result = Some(result);
        self.completed += 1;
        Some(entry.source.clone())
    }
}
