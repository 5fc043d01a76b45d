use crate::{ExtractionResult, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller submitted source identifiers (paths or URLs) for extraction.
    SourcesSubmitted(Vec<String>),
    /// A worker finished one source, successfully or not.
    SourceFinished {
        job_id: JobId,
        result: ExtractionResult,
    },
    /// Caller asked to abandon sources that are still in flight.
    CancelRequested,
}
