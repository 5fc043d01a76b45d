use std::sync::Once;

use normalizer_engine::{
    collect_candidates, prune_noise, score_block, BlockTag, ContentBlock, ContentScorer,
    DocumentParser, FragmentParser, MarkupParser, ParseError,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scraper::Html;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

const PROSE: &str = "The river town woke slowly that morning. Fishermen dragged their boats \
    across the wet stones while the bakery filled the square with the smell of bread. \
    Children ran between the stalls, chasing a dog that had stolen a sausage. By noon \
    the fog had lifted and the whole valley was visible from the church tower. Visitors \
    climbed the narrow stairs to see it. Nobody could remember a clearer day in years, \
    and the old ferryman said it was a sign of a good harvest to come.";

fn nav_block(label: &str) -> String {
    let links: String = (1..=6)
        .map(|n| format!("<li><a href=\"/{label}/{n}\">{label} link number {n}</a></li>"))
        .collect();
    format!("<nav><ul>{links}</ul></nav>")
}

fn article_page() -> String {
    format!(
        "<html><head><title>Town</title><script>var tracking = 1;</script></head><body>\
         {}{}<article class=\"post-content\">{PROSE}</article>{}</body></html>",
        nav_block("home"),
        nav_block("topics"),
        nav_block("archive"),
    )
}

fn collapsed(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn article_text_is_extracted_without_navigation() {
    init_logging();
    let text = ContentScorer::new()
        .extract_from_markup(&article_page())
        .expect("parse");
    assert_eq!(text, collapsed(PROSE));
    assert!(!text.contains("link number"));
    assert!(!text.contains("tracking"));
}

#[test]
fn noise_classes_are_pruned() {
    init_logging();
    let mut document = Html::parse_document(
        "<html><body><div class=\"Sidebar\">side</div><div id=\"top-banner\">ad</div>\
         <p>kept paragraph</p><footer>bye</footer></body></html>",
    );
    let removed = prune_noise(&mut document);
    assert_eq!(removed, 3);
    let texts: Vec<String> = collect_candidates(&document)
        .into_iter()
        .map(|block| block.text)
        .collect();
    assert_eq!(texts, vec!["kept paragraph".to_string()]);
}

#[test]
fn candidate_text_and_links_are_measured() {
    init_logging();
    let document = Html::parse_document(
        "<html><body><div class=\"Story\" id=\"Main\">See <a href=\"/a\">one</a>\n and \
         <a href=\"/b\">two</a>.</div></body></html>",
    );
    let blocks = collect_candidates(&document);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].tag, BlockTag::Division);
    assert_eq!(blocks[0].text, "See one and two.");
    assert_eq!(blocks[0].link_count, 2);
    assert_eq!(blocks[0].markers, "story main");
}

#[test]
fn page_of_only_short_fragments_yields_empty_text() {
    init_logging();
    let text = ContentScorer::new()
        .extract_from_markup("<html><body><div>hi</div><p>yo</p></body></html>")
        .expect("parse");
    assert_eq!(text, "");
}

#[test]
fn selector_fallback_recovers_unscored_content() {
    init_logging();
    let body = "word ".repeat(40);
    let markup = format!("<html><body><main><span>{body}</span></main></body></html>");

    let plain = ContentScorer::new().extract_from_markup(&markup).expect("parse");
    assert_eq!(plain, "");

    let recovered = ContentScorer::new()
        .with_selector_fallback(true)
        .extract_from_markup(&markup)
        .expect("parse");
    assert_eq!(recovered, body.trim());
}

#[test]
fn selection_stops_after_limit_is_passed() {
    init_logging();
    let para = "A complete sentence that keeps going for a while. ".repeat(4);
    let markup = format!(
        "<html><body><p>{para}</p><p>{para}</p><p>{para}</p></body></html>"
    );
    let text = ContentScorer::new()
        .with_selection_limit(250)
        .extract_from_markup(&markup)
        .expect("parse");
    // Blank separators are dropped by line filtering.
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn blank_markup_fails_every_parser() {
    init_logging();
    let err = ContentScorer::new().extract_from_markup("   ").unwrap_err();
    let ParseError::AllParsersFailed { attempts } = err;
    assert_eq!(attempts.len(), 2);
}

struct Refusing;

impl MarkupParser for Refusing {
    fn name(&self) -> &'static str {
        "refusing"
    }

    fn parse(&self, _markup: &str) -> Result<Html, String> {
        Err("not today".to_string())
    }
}

struct Fragment;

impl MarkupParser for Fragment {
    fn name(&self) -> &'static str {
        "fragment"
    }

    fn parse(&self, markup: &str) -> Result<Html, String> {
        Ok(Html::parse_fragment(markup))
    }
}

#[test]
fn parser_chain_falls_back_to_next_parser() {
    init_logging();
    let scorer = ContentScorer::new().with_parsers(vec![Box::new(Refusing), Box::new(Fragment)]);
    let text = scorer
        .extract_from_markup("<p>One short paragraph. With two sentences!</p>")
        .expect("fragment parser");
    assert_eq!(text, "One short paragraph. With two sentences!");
}

#[test]
fn default_chain_parses_snippets_as_fragments() {
    init_logging();
    let snippet = "<p>One short paragraph. With two sentences!</p>";
    assert_eq!(
        DocumentParser.parse(snippet).unwrap_err(),
        "not a complete document"
    );
    assert!(DocumentParser.parse("<!DOCTYPE html><p>x</p>").is_ok());
    assert!(FragmentParser.parse(snippet).is_ok());

    let text = ContentScorer::new()
        .extract_from_markup(snippet)
        .expect("fragment parser");
    assert_eq!(text, "One short paragraph. With two sentences!");
}

#[test]
fn only_refusing_parsers_report_each_attempt() {
    init_logging();
    let scorer = ContentScorer::new().with_parsers(vec![Box::new(Refusing)]);
    let err = scorer.extract_from_markup("<p>x</p>").unwrap_err();
    assert_eq!(
        err,
        ParseError::AllParsersFailed {
            attempts: vec!["refusing: not today".to_string()]
        }
    );
}

proptest! {
    #[test]
    fn scores_are_never_negative(
        text in "[a-z .!?]{0,400}",
        markers in "[a-z -]{0,40}",
        links in 0usize..50,
    ) {
        let block = ContentBlock::new(BlockTag::Division, markers, text, links);
        prop_assert!(score_block(&block) >= 0.0);
    }

    #[test]
    fn content_markers_never_lower_the_score(
        text in "[a-z .!?]{0,400}",
        markers in "[a-z -]{0,40}",
    ) {
        let base = ContentBlock::new(BlockTag::Paragraph, markers.clone(), text.clone(), 0);
        let richer = ContentBlock::new(BlockTag::Paragraph, format!("{markers} content story"), text, 0);
        prop_assert!(score_block(&richer) >= score_block(&base));
    }

    #[test]
    fn unwanted_markers_never_raise_the_score(
        text in "[a-z .!?]{0,400}",
        markers in "[a-z -]{0,40}",
    ) {
        let base = ContentBlock::new(BlockTag::Paragraph, markers.clone(), text.clone(), 0);
        let worse = ContentBlock::new(BlockTag::Paragraph, format!("{markers} sidebar widget"), text, 0);
        prop_assert!(score_block(&worse) <= score_block(&base));
    }
}
