use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic category of an input source. Assigned once per processing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Word,
    Ppt,
    Csv,
    Txt,
    Excel,
    Url,
    Unknown,
}

const SUPPORTED: [SourceKind; 7] = [
    SourceKind::Pdf,
    SourceKind::Word,
    SourceKind::Ppt,
    SourceKind::Csv,
    SourceKind::Txt,
    SourceKind::Excel,
    SourceKind::Url,
];

/// Every kind the dispatcher can extract text from.
pub fn supported_kinds() -> &'static [SourceKind] {
    &SUPPORTED
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Word => "word",
            SourceKind::Ppt => "ppt",
            SourceKind::Csv => "csv",
            SourceKind::Txt => "txt",
            SourceKind::Excel => "excel",
            SourceKind::Url => "url",
            SourceKind::Unknown => "unknown",
        }
    }

    pub fn is_supported(self) -> bool {
        self != SourceKind::Unknown
    }

    /// Human-readable format name, `None` for `Unknown`.
    pub fn description(self) -> Option<&'static str> {
        match self {
            SourceKind::Pdf => Some("Portable Document Format"),
            SourceKind::Word => Some("Microsoft Word Document"),
            SourceKind::Ppt => Some("Microsoft PowerPoint Presentation"),
            SourceKind::Csv => Some("Comma-Separated Values"),
            SourceKind::Txt => Some("Plain Text File"),
            SourceKind::Excel => Some("Microsoft Excel Spreadsheet"),
            SourceKind::Url => Some("Web URL"),
            SourceKind::Unknown => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKindLabel(pub String);

impl fmt::Display for UnknownKindLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source kind label {:?}", self.0)
    }
}

impl std::error::Error for UnknownKindLabel {}

impl FromStr for SourceKind {
    type Err = UnknownKindLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED
            .iter()
            .chain(std::iter::once(&SourceKind::Unknown))
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownKindLabel(s.to_string()))
    }
}
