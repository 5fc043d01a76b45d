//! Normalizer engine: classification, decoding, extraction and batch execution.
mod batch;
mod classify;
mod cleanup;
mod config;
mod decode;
mod dispatch;
mod engine;
mod fetch;
mod loaders;
mod mojibake;
mod readability;
mod types;

pub use batch::{
    post_process, BatchRunner, CallbackProgressSink, ChannelProgressSink, NullProgressSink,
    ProgressSink, CANCELLED,
};
pub use classify::{
    classify, is_url, kind_for_extension, kind_for_mime, sniff_signature, source_info,
    validate_source, ClassifyError, SourceInfo,
};
pub use cleanup::{clean_extracted_text, clean_pdf_artifacts, remove_html_noise};
pub use config::{fixed_clock, system_clock, Clock, ConfigError, EngineConfig, DEFAULT_WORKER_COUNT};
pub use decode::{
    decode, decode_with_detector, header_charset, lookup_encoding, meta_charset,
    ChardetngDetector, CharsetDetector, DecodeStage, DecodedText, Detection, DETECTION_THRESHOLD,
    META_SCAN_LEN,
};
pub use dispatch::Dispatcher;
pub use engine::{BatchHandle, EngineHandle};
pub use fetch::{browser_headers, FetchSettings, Fetcher, ReqwestFetcher};
pub use loaders::{
    render_table, BuiltinLoader, CalamineFlattener, DocumentLoader, LoadError, TabularFlattener,
};
pub use mojibake::repair_mojibake;
pub use readability::{
    collect_candidates, parse_with_fallback, prune_noise, score_block, select_blocks, BlockTag,
    ContentBlock, ContentScorer, DocumentParser, FragmentParser, MarkupParser, ParseError,
    CONTENT_KEYWORDS, NOISE_PATTERNS, NOISE_TAGS, SELECTION_LIMIT, UNWANTED_KEYWORDS,
};
pub use types::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, NormalizeError};

pub use normalizer_core::{
    supported_kinds, BatchProgress, BatchReport, BatchStats, ExtractionResult, SourceKind,
    TextStats,
};
