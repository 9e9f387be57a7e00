//! Main-text extraction from HTML.
//!
//! Picks the most likely content container, drops boilerplate subtrees
//! (scripts, navigation, cookie banners...) and returns plain text with one
//! line per block element.

use std::sync::LazyLock;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["article", "main", "[role='main']"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside", "button", "select", "head",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "li", "ul", "ol", "dl", "dt", "dd", "h1", "h2",
    "h3", "h4", "h5", "h6", "table", "tr", "td", "th", "blockquote", "pre", "br", "hr",
];

/// Whole id/class tokens marking chrome rather than content. Compared
/// exactly, so `has-sidebar` or `cookies-and-identifiers` are kept.
const BOILERPLATE_MARKERS: &[&str] = &[
    "cookie-banner", "cookie-bar", "cookie-consent", "cookie-notice", "cookie-popup", "cookie-law-info-bar",
    "cookies-banner", "consent-banner", "consent-dialog", "consent-modal", "gdpr-banner", "cc-banner",
    "cc-window", "onetrust-banner-sdk", "onetrust-consent-sdk", "CybotCookiebotDialog", "navbar", "sidebar",
    "breadcrumb", "breadcrumbs",
];

/// Extract readable text, or `None` when nothing survives.
pub fn main_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    for selector in CONTENT_ROOTS.iter() {
        if let Some(root) = doc.select(selector).next() {
            if let Some(text) = text_of(root) {
                return Some(text);
            }
        }
    }

    let root = doc.select(&BODY).next().unwrap_or_else(|| doc.root_element());
    text_of(root)
}

fn text_of(root: ElementRef<'_>) -> Option<String> {
    let mut raw = String::new();
    collect(root, &mut raw);
    let text = normalize(&raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn collect(el: ElementRef<'_>, out: &mut String) {
    let block = BLOCK_TAGS.contains(&el.value().name());
    if block {
        out.push('\n');
    }
    for child in el.children() {
        match child.value() {
            // source line breaks are not content breaks
            Node::Text(text) => out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c })),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_boilerplate(child_el) {
                        collect(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
    if block {
        out.push('\n');
    }
}

fn is_boilerplate(el: ElementRef<'_>) -> bool {
    let v = el.value();
    if SKIPPED_TAGS.contains(&v.name()) {
        return true;
    }
    if v.attr("hidden").is_some() || v.attr("aria-hidden") == Some("true") {
        return true;
    }
    let marked = |s: &str| BOILERPLATE_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(s));
    v.attr("id").is_some_and(marked) || v.classes().any(marked)
}

/// Collapse runs of whitespace per line and drop blank lines.
fn normalize(raw: &str) -> String {
    raw.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ──
