use std::cmp::Ordering;
use std::sync::LazyLock;

use ego_tree::NodeId;
use engine_logging::{engine_debug, engine_warn};
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};

use crate::cleanup::clean_extracted_text;
use crate::mojibake::repair_mojibake;

/// Elements removed from the tree, with their subtrees, before scoring.
pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "form",
    "button", "input", "select", "textarea", "option", "meta", "link",
];

/// Class or id substrings that mark an element as page chrome.
pub const NOISE_PATTERNS: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "footer",
    "header",
    "ad",
    "advertisement",
    "banner",
    "popup",
    "modal",
    "comment",
    "social",
    "share",
    "related",
    "recommend",
    "widget",
];

pub const CONTENT_KEYWORDS: &[&str] = &["content", "article", "post", "main", "body", "text", "story"];
pub const UNWANTED_KEYWORDS: &[&str] = &[
    "nav", "menu", "sidebar", "footer", "header", "ad", "comment", "widget",
];

/// Selection stops once the accumulated text exceeds this many characters.
pub const SELECTION_LIMIT: usize = 3000;

/// Selectors tried, in order, when scoring yields nothing.
const FALLBACK_SELECTORS: &[&str] = &[
    "article",
    ".content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".story-content",
    ".text-content",
    "#content",
    "#main-content",
    "#post-content",
    "#article-content",
    "main",
    ".main",
    "#main",
    ".post-body",
    ".entry-body",
    ".article-body",
    ".news-content",
    ".blog-content",
];
const FALLBACK_MIN_CHARS: usize = 100;

static FALLBACK: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    FALLBACK_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .collect()
});

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no parser accepted the markup: {}", .attempts.join("; "))]
    AllParsersFailed { attempts: Vec<String> },
}

/// One step of the parser chain.
pub trait MarkupParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, markup: &str) -> Result<Html, String>;
}

const DOCUMENT_MARKERS: &[&str] = &["<!doctype", "<html", "<body"];

/// Full html5ever document parse. Only accepts markup that carries a
/// doctype, `<html>` or `<body>` tag.
#[derive(Debug, Default)]
pub struct DocumentParser;

impl MarkupParser for DocumentParser {
    fn name(&self) -> &'static str {
        "document"
    }

    fn parse(&self, markup: &str) -> Result<Html, String> {
        if !looks_like_document(markup) {
            return Err("not a complete document".to_string());
        }
        Ok(Html::parse_document(markup))
    }
}

fn looks_like_document(markup: &str) -> bool {
    let lowered = markup.to_ascii_lowercase();
    DOCUMENT_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Fragment parse, for snippets that are not whole documents. Accepts any
/// markup that is not blank.
#[derive(Debug, Default)]
pub struct FragmentParser;

impl MarkupParser for FragmentParser {
    fn name(&self) -> &'static str {
        "fragment"
    }

    fn parse(&self, markup: &str) -> Result<Html, String> {
        if markup.trim().is_empty() {
            return Err("empty markup".to_string());
        }
        Ok(Html::parse_fragment(markup))
    }
}

/// First parser that accepts the markup wins.
pub fn parse_with_fallback(
    parsers: &[Box<dyn MarkupParser>],
    markup: &str,
) -> Result<Html, ParseError> {
    let mut attempts = Vec::with_capacity(parsers.len());
    for parser in parsers {
        match parser.parse(markup) {
            Ok(document) => return Ok(document),
            Err(err) => {
                engine_debug!("{} parser rejected markup: {}", parser.name(), err);
                attempts.push(format!("{}: {}", parser.name(), err));
            }
        }
    }
    Err(ParseError::AllParsersFailed { attempts })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Paragraph,
    Division,
    Article,
    Section,
}

impl BlockTag {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "p" => Some(BlockTag::Paragraph),
            "div" => Some(BlockTag::Division),
            "article" => Some(BlockTag::Article),
            "section" => Some(BlockTag::Section),
            _ => None,
        }
    }
}

/// A scoring candidate, detached from the parse tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub tag: BlockTag,
    /// Lowercased class list and id, space separated.
    pub markers: String,
    /// Descendant text with whitespace runs collapsed.
    pub text: String,
    pub link_count: usize,
    pub score: f64,
}

impl ContentBlock {
    pub fn new(
        tag: BlockTag,
        markers: impl Into<String>,
        text: impl Into<String>,
        link_count: usize,
    ) -> Self {
        let mut block = Self {
            tag,
            markers: markers.into().to_lowercase(),
            text: text.into(),
            link_count,
            score: 0.0,
        };
        block.score = score_block(&block);
        block
    }

    fn from_element(element: ElementRef<'_>) -> Option<Self> {
        let tag = BlockTag::from_name(element.value().name())?;
        let text = collapse_whitespace(&element.text().collect::<String>());
        if text.is_empty() {
            return None;
        }
        let link_count = element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|descendant| descendant.value().name() == "a")
            .count();
        Some(Self::new(tag, markers_of(element.value()), text, link_count))
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Heuristic content score, never negative.
pub fn score_block(block: &ContentBlock) -> f64 {
    let length = block.char_len() as f64;
    let mut score = 0.0;

    if length > 50.0 {
        score += (length / 100.0).min(5.0);
    }

    let sentence_marks = block
        .text
        .chars()
        .filter(|c| matches!(c, '.' | '!' | '?'))
        .count();
    score += sentence_marks as f64 * 0.5;

    let markers = block.markers.to_lowercase();
    let content_hits = CONTENT_KEYWORDS
        .iter()
        .filter(|keyword| markers.contains(*keyword))
        .count();
    let unwanted_hits = UNWANTED_KEYWORDS
        .iter()
        .filter(|keyword| markers.contains(*keyword))
        .count();
    score += 2.0 * content_hits as f64;
    score -= 3.0 * unwanted_hits as f64;

    if block.link_count as f64 > length / 100.0 {
        score -= 2.0;
    }

    score.max(0.0)
}

/// Readability-style main content extractor.
pub struct ContentScorer {
    parsers: Vec<Box<dyn MarkupParser>>,
    selection_limit: usize,
    selector_fallback: bool,
}

impl Default for ContentScorer {
    fn default() -> Self {
        Self {
            parsers: vec![Box::new(DocumentParser), Box::new(FragmentParser)],
            selection_limit: SELECTION_LIMIT,
            selector_fallback: false,
        }
    }
}

impl ContentScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parsers(mut self, parsers: Vec<Box<dyn MarkupParser>>) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_selection_limit(mut self, limit: usize) -> Self {
        self.selection_limit = limit;
        self
    }

    pub fn with_selector_fallback(mut self, enabled: bool) -> Self {
        self.selector_fallback = enabled;
        self
    }

    /// Parse then extract. Fails only when every parser rejects the markup.
    pub fn extract_from_markup(&self, markup: &str) -> Result<String, ParseError> {
        let document = parse_with_fallback(&self.parsers, markup)?;
        Ok(self.extract_main_content(document))
    }

    /// Prune noise, score candidates, keep the best until the selection
    /// limit is passed, then clean and repair the joined text.
    pub fn extract_main_content(&self, mut document: Html) -> String {
        let pruned = prune_noise(&mut document);
        let blocks = collect_candidates(&document);
        engine_debug!(
            "pruned {} noise elements, {} scored candidates",
            pruned,
            blocks.len()
        );

        let selected = select_blocks(blocks, self.selection_limit);
        let joined = selected
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = finish_text(&joined);

        if text.is_empty() && self.selector_fallback {
            engine_warn!("scoring produced no text, trying content selectors");
            return finish_text(&selector_fallback_text(&document));
        }
        text
    }
}

/// Detach every noise element. Returns how many subtrees were removed.
pub fn prune_noise(document: &mut Html) -> usize {
    let doomed: Vec<NodeId> = document
        .tree
        .root()
        .descendants()
        .filter(|node| node.value().as_element().is_some_and(is_noise))
        .map(|node| node.id())
        .collect();
    for id in &doomed {
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.detach();
        }
    }
    doomed.len()
}

fn is_noise(element: &Element) -> bool {
    if NOISE_TAGS.contains(&element.name()) {
        return true;
    }
    [element.attr("class"), element.attr("id")]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .any(|value| NOISE_PATTERNS.iter().any(|pattern| value.contains(pattern)))
}

/// Scored candidates reachable from the document root, in document order.
pub fn collect_candidates(document: &Html) -> Vec<ContentBlock> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(ContentBlock::from_element)
        .collect()
}

/// Positive scores only, best first with ties in document order. A block is
/// appended while the running total is still within `limit`.
pub fn select_blocks(mut blocks: Vec<ContentBlock>, limit: usize) -> Vec<ContentBlock> {
    blocks.retain(|block| block.score > 0.0);
    blocks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut total = 0;
    let mut selected = Vec::new();
    for block in blocks {
        if total > limit {
            break;
        }
        total += block.char_len();
        selected.push(block);
    }
    selected
}

fn finish_text(raw: &str) -> String {
    repair_mojibake(&clean_extracted_text(raw))
}

fn selector_fallback_text(document: &Html) -> String {
    let reachable: Vec<ElementRef<'_>> = document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect();

    for selector in FALLBACK.iter() {
        if let Some(text) = reachable
            .iter()
            .filter(|element| selector.matches(element))
            .map(|element| separated_text(*element))
            .find(|text| text.chars().count() > FALLBACK_MIN_CHARS)
        {
            return text;
        }
    }

    reachable
        .iter()
        .find(|element| element.value().name() == "body")
        .map(|body| separated_text(*body))
        .unwrap_or_default()
}

fn separated_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn markers_of(element: &Element) -> String {
    let class = element.attr("class").unwrap_or_default();
    let id = element.attr("id").unwrap_or_default();
    format!("{class} {id}").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
