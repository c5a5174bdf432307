use std::sync::Arc;

use lazy_static::lazy_static;
use lector_core::ArticleDocument;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

const TITLE_SELECTORS: &[&str] = &[
    "h1",
    "article h1",
    ".post-title",
    ".article-title",
    ".entry-title",
    "[class*=\"title\"]",
    "title",
];

const TITLE_META: &[&str] = &["meta[property=\"og:title\"]", "meta[name=\"title\"]"];

const DATE_SELECTORS: &[&str] = &[
    "time[datetime]",
    "time",
    "[class*=\"date\"]",
    "[class*=\"published\"]",
    "[class*=\"time\"]",
    "article time",
    ".post-date",
    ".article-date",
    ".published-date",
];

const DATE_ATTRIBUTES: &[&str] = &["datetime", "title"];

const DATE_META: &[&str] = &[
    "meta[property=\"article:published_time\"]",
    "meta[name=\"date\"]",
    "meta[name=\"publish-date\"]",
];

const BODY_SELECTORS: &[&str] = &[
    "article",
    ".post",
    ".content",
    ".article-content",
    ".entry-content",
    ".post-content",
    "[class*=\"article\"]",
    "[class*=\"content\"]",
    "main",
];

/// Stripped from a content block before its text is measured.
const BLOCK_NOISE: &[&str] = &[
    "script",
    "style",
    "nav",
    "header",
    "footer",
    "aside",
    ".ad",
    ".advertisement",
    ".sidebar",
];

/// Stripped from the whole page when no content block qualifies.
const PAGE_NOISE: &[&str] = &["header", "footer", "nav", "aside", "script", "style"];

/// Elements whose boundaries separate words even without whitespace in the markup.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "td", "th", "tr", "ul",
];

lazy_static! {
    static ref DEFAULT_RULES: Arc<ExtractionRules> = Arc::new(ExtractionRules::default());
}

/// Ordered selector chains driving the extraction heuristic. Earlier entries win.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub title_selectors: Vec<Selector>,
    pub title_meta: Vec<Selector>,
    /// Selector-based titles must be longer than this many characters.
    pub min_title_chars: usize,
    pub date_selectors: Vec<Selector>,
    pub date_attributes: Vec<String>,
    pub date_meta: Vec<Selector>,
    pub body_selectors: Vec<Selector>,
    pub block_noise: Vec<Selector>,
    pub page_noise: Vec<Selector>,
    /// A content block must yield more than this many characters.
    pub min_body_chars: usize,
    pub document_title: Vec<Selector>,
    pub page_root: Vec<Selector>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            title_selectors: parse_selectors(TITLE_SELECTORS),
            title_meta: parse_selectors(TITLE_META),
            min_title_chars: 10,
            date_selectors: parse_selectors(DATE_SELECTORS),
            date_attributes: DATE_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            date_meta: parse_selectors(DATE_META),
            body_selectors: parse_selectors(BODY_SELECTORS),
            block_noise: parse_selectors(BLOCK_NOISE),
            page_noise: parse_selectors(PAGE_NOISE),
            min_body_chars: 100,
            document_title: parse_selectors(&["title"]),
            page_root: parse_selectors(&["body"]),
        }
    }
}

/// Compiles a selector table, dropping (and logging) entries that do not parse.
pub fn parse_selectors(table: &[&str]) -> Vec<Selector> {
    table
        .iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!("Ignoring invalid selector {:?}: {:?}", raw, e);
                None
            }
        })
        .collect()
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ArticleDocument;
}

/// Best-effort title/date/body extraction over ordered selector chains.
#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    rules: Arc<ExtractionRules>,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }

    pub fn with_rules(rules: ExtractionRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    fn extract_title(&self, doc: &Html) -> Option<String> {
        let rules = &self.rules;
        rules
            .title_selectors
            .iter()
            .find_map(|selector| {
                let text = first_text(doc, selector)?;
                (text.chars().count() > rules.min_title_chars).then_some(text)
            })
            .or_else(|| meta_content(doc, &rules.title_meta))
            .or_else(|| {
                rules
                    .document_title
                    .iter()
                    .find_map(|selector| first_text(doc, selector))
            })
    }

    fn extract_date(&self, doc: &Html) -> Option<String> {
        let rules = &self.rules;
        rules
            .date_selectors
            .iter()
            .find_map(|selector| {
                let element = doc.select(selector).next()?;
                rules
                    .date_attributes
                    .iter()
                    .find_map(|name| non_empty(element.value().attr(name)?))
                    .or_else(|| non_empty(&element.text().collect::<String>()))
            })
            .or_else(|| meta_content(doc, &rules.date_meta))
    }

    fn extract_body(&self, doc: &Html) -> String {
        let rules = &self.rules;
        let block = rules.body_selectors.iter().find_map(|selector| {
            let element = doc.select(selector).next()?;
            let text = collect_text(element, &rules.block_noise);
            let text = text.trim();
            (text.chars().count() > rules.min_body_chars).then(|| text.to_string())
        });

        let text = match block {
            Some(text) => text,
            None => {
                tracing::debug!("No content block qualified, falling back to the whole page");
                let root = rules
                    .page_root
                    .iter()
                    .find_map(|selector| doc.select(selector).next())
                    .unwrap_or_else(|| doc.root_element());
                collect_text(root, &rules.page_noise)
            }
        };

        normalize_whitespace(&text)
    }
}

impl Extractor for HeuristicExtractor {
    fn extract(&self, html: &str) -> ArticleDocument {
        let doc = Html::parse_document(html);
        ArticleDocument {
            title: self.extract_title(&doc),
            published_at: self.extract_date(&doc),
            body: self.extract_body(&doc),
        }
    }
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    let element = doc.select(selector).next()?;
    non_empty(&element.text().collect::<String>())
}

fn meta_content(doc: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        let element = doc.select(selector).next()?;
        non_empty(element.value().attr("content")?)
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Text of `element`'s descendants, skipping subtrees matched by `noise`.
fn collect_text(element: ElementRef<'_>, noise: &[Selector]) -> String {
    let mut text = String::new();
    push_text(element, noise, &mut text);
    text
}

fn push_text(element: ElementRef<'_>, noise: &[Selector], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if noise.iter().any(|selector| selector.matches(&child)) {
                    continue;
                }
                let is_block = BLOCK_TAGS.contains(&child.value().name());
                if is_block {
                    out.push(' ');
                }
                push_text(child, noise, out);
                if is_block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
