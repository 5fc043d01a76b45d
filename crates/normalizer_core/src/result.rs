use serde::{Deserialize, Serialize};

use crate::SourceKind;

/// Character, word and line counts of an extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,
}

impl TextStats {
    /// Chars are Unicode scalar values, words are whitespace separated,
    /// lines are `\n` separated. Empty text has zero lines.
    pub fn of(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            line_count: text.split('\n').count(),
        }
    }
}

/// Metadata envelope produced for one source. Immutable once built;
/// use [`ExtractionResult::with_text`] to derive a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    source: String,
    text: String,
    kind: SourceKind,
    char_count: usize,
    word_count: usize,
    line_count: usize,
    processed_at: String,
    success: bool,
    error: Option<String>,
}

impl ExtractionResult {
    pub fn success(
        source: impl Into<String>,
        text: impl Into<String>,
        kind: SourceKind,
        processed_at: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let stats = TextStats::of(&text);
        Self {
            source: source.into(),
            text,
            kind,
            char_count: stats.char_count,
            word_count: stats.word_count,
            line_count: stats.line_count,
            processed_at: processed_at.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(
        source: impl Into<String>,
        kind: SourceKind,
        error: impl Into<String>,
        processed_at: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            text: String::new(),
            kind,
            char_count: 0,
            word_count: 0,
            line_count: 0,
            processed_at: processed_at.into(),
            success: false,
            error: Some(error.into()),
        }
    }

    /// Same envelope with replaced text and recomputed counts.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        let stats = TextStats::of(&text);
        Self {
            text,
            char_count: stats.char_count,
            word_count: stats.word_count,
            line_count: stats.line_count,
            ..self
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn processed_at(&self) -> &str {
        &self.processed_at
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
