use std::fs::File;
use std::io::Read;
use std::path::Path;

use engine_logging::engine_debug;
use normalizer_core::SourceKind;
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("source not found: {0}")]
    NotFound(String),
}

const EXTENSION_KINDS: &[(&str, SourceKind)] = &[
    ("pdf", SourceKind::Pdf),
    ("doc", SourceKind::Word),
    ("docx", SourceKind::Word),
    ("ppt", SourceKind::Ppt),
    ("pptx", SourceKind::Ppt),
    ("csv", SourceKind::Csv),
    ("txt", SourceKind::Txt),
    ("xls", SourceKind::Excel),
    ("xlsx", SourceKind::Excel),
];

const MIME_KINDS: &[(&str, SourceKind)] = &[
    ("application/pdf", SourceKind::Pdf),
    ("application/msword", SourceKind::Word),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        SourceKind::Word,
    ),
    ("application/vnd.ms-powerpoint", SourceKind::Ppt),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        SourceKind::Ppt,
    ),
    ("text/csv", SourceKind::Csv),
    ("application/csv", SourceKind::Csv),
    ("text/plain", SourceKind::Txt),
    ("application/vnd.ms-excel", SourceKind::Excel),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        SourceKind::Excel,
    ),
];

const SIGNATURE_LEN: usize = 8;
const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_CONTAINERS: &[(&str, SourceKind)] = &[
    ("docx", SourceKind::Word),
    ("pptx", SourceKind::Ppt),
    ("xlsx", SourceKind::Excel),
];
const OLE_CONTAINERS: &[(&str, SourceKind)] = &[
    ("doc", SourceKind::Word),
    ("ppt", SourceKind::Ppt),
    ("xls", SourceKind::Excel),
];

/// Classify a path or URL: URL test, existence, extension, MIME registry,
/// then the first eight bytes of the file. First match wins.
pub fn classify(input: &str) -> Result<SourceKind, ClassifyError> {
    if is_url(input) {
        return Ok(SourceKind::Url);
    }

    let path = Path::new(input);
    if !path.exists() {
        return Err(ClassifyError::NotFound(input.to_string()));
    }

    let extension = lowercase_extension(path);
    if let Some(kind) = extension.as_deref().and_then(kind_for_extension) {
        engine_debug!("classified {} as {} by extension", input, kind);
        return Ok(kind);
    }

    if let Some(kind) = mime_guess::from_path(path).first_raw().and_then(kind_for_mime) {
        engine_debug!("classified {} as {} by mime type", input, kind);
        return Ok(kind);
    }

    match read_signature(path) {
        Ok(header) => {
            let kind = sniff_signature(&header, extension.as_deref());
            engine_debug!("classified {} as {} by signature", input, kind);
            Ok(kind)
        }
        Err(err) => {
            engine_debug!("signature read failed for {}: {}", input, err);
            Ok(SourceKind::Unknown)
        }
    }
}

/// True when `input` parses as a URI with both a scheme and a host.
pub fn is_url(input: &str) -> bool {
    Url::parse(input)
        .map(|url| !url.scheme().is_empty() && url.has_host())
        .unwrap_or(false)
}

pub fn kind_for_extension(extension: &str) -> Option<SourceKind> {
    let extension = extension.trim_start_matches('.');
    EXTENSION_KINDS
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, kind)| *kind)
}

pub fn kind_for_mime(mime: &str) -> Option<SourceKind> {
    MIME_KINDS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(mime))
        .map(|(_, kind)| *kind)
}

/// Kind implied by a file header. ZIP and OLE containers are disambiguated
/// by the (lowercase, dotless) extension.
pub fn sniff_signature(header: &[u8], extension: Option<&str>) -> SourceKind {
    if header.starts_with(PDF_MAGIC) {
        return SourceKind::Pdf;
    }
    let containers = if header.starts_with(ZIP_MAGIC) {
        ZIP_CONTAINERS
    } else if header.starts_with(OLE_MAGIC) {
        OLE_CONTAINERS
    } else {
        return SourceKind::Unknown;
    };
    extension
        .and_then(|ext| containers.iter().find(|(candidate, _)| *candidate == ext))
        .map(|(_, kind)| *kind)
        .unwrap_or(SourceKind::Unknown)
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn read_signature(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(SIGNATURE_LEN);
    File::open(path)?
        .take(SIGNATURE_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}

/// Classification succeeded and produced a supported kind.
pub fn validate_source(input: &str) -> bool {
    classify(input).map(SourceKind::is_supported).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub source: String,
    pub kind: SourceKind,
    pub size_bytes: Option<u64>,
    pub exists: bool,
    pub is_url: bool,
    pub error: Option<String>,
}

/// Describe a source without extracting it. Never fails.
pub fn source_info(input: &str) -> SourceInfo {
    match classify(input) {
        Ok(SourceKind::Url) => SourceInfo {
            source: input.to_string(),
            kind: SourceKind::Url,
            size_bytes: None,
            exists: true,
            is_url: true,
            error: None,
        },
        Ok(kind) => {
            let metadata = std::fs::metadata(input).ok();
            SourceInfo {
                source: input.to_string(),
                kind,
                size_bytes: metadata.as_ref().map(|m| m.len()),
                exists: metadata.is_some(),
                is_url: false,
                error: None,
            }
        }
        Err(err) => SourceInfo {
            source: input.to_string(),
            kind: SourceKind::Unknown,
            size_bytes: None,
            exists: false,
            is_url: false,
            error: Some(err.to_string()),
        },
    }
}
