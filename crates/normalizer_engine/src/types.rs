use std::fmt;

use bytes::Bytes;
use normalizer_core::{BatchProgress, BatchStats, SourceKind};

use crate::classify::ClassifyError;
use crate::loaders::LoadError;
use crate::readability::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(BatchProgress),
    BatchFinished(BatchStats),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone)]
pub struct FetchOutput {
    pub body: Bytes,
    pub headers: reqwest::header::HeaderMap,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Every failure the dispatcher can surface for a single source.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("unsupported source kind {kind} for {input}")]
    UnsupportedKind { input: String, kind: SourceKind },
    #[error("network error: {0}")]
    Network(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cancelled")]
    Cancelled,
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<ClassifyError> for NormalizeError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::NotFound(input) => NormalizeError::NotFound(input),
        }
    }
}
