use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// Ordered repair table. Each rule runs over the output of the previous
/// one, so the order is part of the behaviour.
///
/// The rules are literal substring rewrites and fire on legitimate text as
/// well: a French "château" becomes "ch-teau", and any run of two or more
/// question marks disappears.
const REPAIR_TABLE: &[(&str, &str)] = &[
    ("Ã¡", "ㅏ"),
    ("Ã¢", "ㅑ"),
    ("Ã£", "ㅓ"),
    ("Ã¤", "ㅕ"),
    ("Ã¥", "ㅗ"),
    ("Ã¦", "ㅛ"),
    ("Ã§", "ㅜ"),
    ("Ã¨", "ㅠ"),
    ("Ã©", "ㅡ"),
    ("Ãª", "ㅣ"),
    ("Ã«", "ㅢ"),
    (r"\?{2,}", ""),
    ("â", "-"),
    ("â¢", "•"),
    ("â", "\""),
    ("â", "\""),
    ("â", "'"),
    ("â", "'"),
];

static REPAIRS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    REPAIR_TABLE
        .iter()
        .map(|(pattern, replacement)| {
            (Regex::new(pattern).expect("repair pattern"), *replacement)
        })
        .collect()
});

/// Rewrite known UTF-8-read-as-Latin-1 sequences.
pub fn repair_mojibake(text: &str) -> String {
    let mut repaired = text.to_string();
    for (pattern, replacement) in REPAIRS.iter() {
        repaired = pattern
            .replace_all(&repaired, NoExpand(replacement))
            .into_owned();
    }
    repaired
}
