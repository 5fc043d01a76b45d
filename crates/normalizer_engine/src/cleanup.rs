use std::sync::LazyLock;

use regex::Regex;

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern"));
static INLINE_SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("inline space pattern"));
static ANY_SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("space pattern"));
static HYPHENATED_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-\n(\w)").expect("hyphenation pattern"));

/// Shortest line kept regardless of its final character.
const MIN_LINE_CHARS: usize = 10;
const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ':', ';'];

/// Collapse blank-line runs and inline whitespace, then drop short lines
/// that do not end like a sentence.
pub fn clean_extracted_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = BLANK_LINE_RUNS.replace_all(text, "\n\n");
    let text = INLINE_SPACE_RUNS.replace_all(&text, " ");
    text.trim()
        .split('\n')
        .map(str::trim)
        .filter(|line| keep_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn keep_line(line: &str) -> bool {
    line.chars().count() > MIN_LINE_CHARS
        || (!line.is_empty() && line.ends_with(TERMINAL_PUNCTUATION))
}

/// Drop form feeds and rejoin words hyphenated across a line break.
pub fn clean_pdf_artifacts(text: &str) -> String {
    let text = text.replace('\u{c}', "");
    HYPHENATED_BREAK.replace_all(&text, "$1$2").into_owned()
}

/// Flatten all whitespace in scraped page text to single spaces.
pub fn remove_html_noise(text: &str) -> String {
    ANY_SPACE_RUNS.replace_all(text, " ").trim().to_string()
}
