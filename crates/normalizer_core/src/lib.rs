//! Normalizer core: source kinds, extraction results and the pure batch state machine.
mod effect;
mod kind;
mod msg;
mod report;
mod result;
mod state;
mod update;

pub use effect::Effect;
pub use kind::{supported_kinds, SourceKind, UnknownKindLabel};
pub use msg::Msg;
pub use report::{BatchProgress, BatchReport, BatchStats};
pub use result::{ExtractionResult, TextStats};
pub use state::{BatchPhase, BatchState, JobId};
pub use update::update;
