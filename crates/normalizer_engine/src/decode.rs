use std::borrow::Cow;
use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, EUC_KR_INIT, REPLACEMENT, UTF_8, UTF_8_INIT, WINDOWS_1252_INIT};
use engine_logging::engine_debug;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE};

/// Bytes scanned for a `<meta charset>` declaration.
pub const META_SCAN_LEN: usize = 2048;
/// Detector confidence above which a statistical guess is accepted.
pub const DETECTION_THRESHOLD: f32 = 0.7;

static HEADER_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)charset=([^;\s]+)").expect("header charset pattern"));
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*charset["\s]*=["\s]*([^">\s]+)"#).expect("meta charset pattern")
});

/// Labels tried in order when nothing better is known. The decode must be
/// clean; the single-byte entries always succeed.
static TRIAL_ENCODINGS: &[(&str, &Encoding)] = &[
    ("UTF-8", &UTF_8_INIT),
    ("EUC-KR", &EUC_KR_INIT),
    ("CP949", &EUC_KR_INIT),
    ("ISO-8859-1", &WINDOWS_1252_INIT),
    ("Latin-1", &WINDOWS_1252_INIT),
];

/// Common labels outside the WHATWG registry.
static LABEL_ALIASES: &[(&str, &Encoding)] = &[
    ("cp949", &EUC_KR_INIT),
    ("ms949", &EUC_KR_INIT),
    ("uhc", &EUC_KR_INIT),
    ("latin-1", &WINDOWS_1252_INIT),
    ("cp1252", &WINDOWS_1252_INIT),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Hint,
    TransportHeader,
    MetaTag,
    Detection,
    TrialList,
    ForcedUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    pub stage: DecodeStage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub encoding: &'static Encoding,
    pub confidence: f32,
}

/// Statistical charset guesser used by the detection stage.
pub trait CharsetDetector: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Option<Detection>;
}

/// chardetng plus BOM sniffing. chardetng only reports whether its guess is
/// high-confidence, so that flag and a strict trial decode are folded into
/// a score: 1.0 for a BOM, 0.9 confident and clean, 0.6 clean, 0.3 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChardetngDetector;

impl CharsetDetector for ChardetngDetector {
    fn detect(&self, bytes: &[u8]) -> Option<Detection> {
        if bytes.is_empty() {
            return None;
        }
        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return Some(Detection {
                encoding,
                confidence: 1.0,
            });
        }
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let (encoding, high_confidence) = detector.guess_assess(None, true);
        let clean = encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .is_some();
        let confidence = match (high_confidence, clean) {
            (true, true) => 0.9,
            (false, true) => 0.6,
            _ => 0.3,
        };
        Some(Detection {
            encoding,
            confidence,
        })
    }
}

/// Decode bytes with the default detector. See [`decode_with_detector`].
pub fn decode(
    bytes: &[u8],
    headers: Option<&HeaderMap>,
    declared_encoding: Option<&str>,
) -> DecodedText {
    decode_with_detector(bytes, headers, declared_encoding, &ChardetngDetector)
}

/// Resolve the text encoding of `bytes`. Stages run in order and the first
/// one that yields text wins: caller hint, Content-Type charset, meta tag in
/// the first 2 KiB, statistical detection, the trial list, and finally a
/// lossy UTF-8 decode that cannot fail.
pub fn decode_with_detector(
    bytes: &[u8],
    headers: Option<&HeaderMap>,
    declared_encoding: Option<&str>,
    detector: &dyn CharsetDetector,
) -> DecodedText {
    let decoded = hint_stage(bytes, declared_encoding)
        .or_else(|| header_stage(bytes, headers))
        .or_else(|| meta_stage(bytes))
        .or_else(|| detection_stage(bytes, detector))
        .or_else(|| trial_stage(bytes))
        .unwrap_or_else(|| forced_utf8(bytes));
    engine_debug!(
        "decoded {} bytes as {} ({:?})",
        bytes.len(),
        decoded.encoding_label,
        decoded.stage
    );
    decoded
}

/// Resolve an encoding label, tolerating underscores and a few non-WHATWG
/// aliases. The replacement encoding is never returned.
pub fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().trim_matches(['"', '\'']);
    let normalized = label.to_ascii_lowercase().replace('_', "-");
    Encoding::for_label(label.as_bytes())
        .or_else(|| Encoding::for_label(normalized.as_bytes()))
        .or_else(|| {
            LABEL_ALIASES
                .iter()
                .find(|(alias, _)| *alias == normalized)
                .map(|(_, encoding)| *encoding)
        })
        .filter(|encoding| *encoding != REPLACEMENT)
}

fn hint_stage(bytes: &[u8], declared_encoding: Option<&str>) -> Option<DecodedText> {
    let encoding = lookup_encoding(declared_encoding?)?;
    Some(decode_lossy(bytes, encoding, DecodeStage::Hint))
}

fn header_stage(bytes: &[u8], headers: Option<&HeaderMap>) -> Option<DecodedText> {
    let content_type = headers?.get(CONTENT_TYPE)?.to_str().ok()?;
    let label = header_charset(content_type)?;
    let encoding = lookup_encoding(&label)?;
    Some(decode_lossy(bytes, encoding, DecodeStage::TransportHeader))
}

fn meta_stage(bytes: &[u8]) -> Option<DecodedText> {
    let label = meta_charset(bytes)?;
    // A meta tag readable as ASCII rules out UTF-16.
    let encoding = lookup_encoding(&label)?.output_encoding();
    Some(decode_lossy(bytes, encoding, DecodeStage::MetaTag))
}

fn detection_stage(bytes: &[u8], detector: &dyn CharsetDetector) -> Option<DecodedText> {
    let detection = detector.detect(bytes)?;
    if detection.confidence <= DETECTION_THRESHOLD || detection.encoding == REPLACEMENT {
        engine_debug!(
            "detector guess {} rejected at confidence {:.2}",
            detection.encoding.name(),
            detection.confidence
        );
        return None;
    }
    Some(decode_lossy(bytes, detection.encoding, DecodeStage::Detection))
}

fn trial_stage(bytes: &[u8]) -> Option<DecodedText> {
    TRIAL_ENCODINGS.iter().find_map(|(label, encoding)| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| DecodedText {
                text: text.into_owned(),
                encoding_label: (*label).to_string(),
                stage: DecodeStage::TrialList,
            })
    })
}

fn forced_utf8(bytes: &[u8]) -> DecodedText {
    DecodedText {
        text: String::from_utf8_lossy(bytes).into_owned(),
        encoding_label: UTF_8.name().to_string(),
        stage: DecodeStage::ForcedUtf8,
    }
}

fn decode_lossy(bytes: &[u8], encoding: &'static Encoding, stage: DecodeStage) -> DecodedText {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        engine_debug!("replacement characters while decoding as {}", encoding.name());
    }
    DecodedText {
        text: text.into_owned(),
        encoding_label: encoding.name().to_string(),
        stage,
    }
}

/// Charset parameter of a Content-Type value, quotes stripped.
pub fn header_charset(content_type: &str) -> Option<String> {
    HEADER_CHARSET
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(['"', '\'']).to_string())
        .filter(|label| !label.is_empty())
}

/// Charset declared by a meta tag within the first [`META_SCAN_LEN`] bytes.
pub fn meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_SCAN_LEN)];
    let head: Cow<'_, str> = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&head)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(['"', '\'']).to_string())
        .filter(|label| !label.is_empty())
}
