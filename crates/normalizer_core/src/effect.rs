use crate::{BatchProgress, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Extract { job_id: JobId, source: String },
    ReportProgress(BatchProgress),
    CancelPending,
}
