use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::amount::{extract_amount, RawValue};
use crate::finding::{Finding, Origin};
use crate::html;

/// Price-like patterns, most specific first.
static AMOUNT_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)Valor[:\s]*.*?R\$\s*([0-9.,\s]+)").unwrap(),
        Regex::new(r"(?i)R\$\s*([0-9.,\s]+)").unwrap(),
        Regex::new(r"(?i)Valor[:\s]*([0-9.,\s]+)").unwrap(),
    ]
});
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)R\$\s*([0-9.,\s]+)").unwrap());
/// Page banner ("Editais de Licitação"), never an item title.
static BANNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)editais de licita").unwrap());
static HEADINGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1,h2,h3").unwrap());
static CONTAINERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, .card, .edital").unwrap());

/// Ancestor levels inspected when looking for a title.
const MAX_TITLE_DEPTH: usize = 8;

/// A price-like string found in the page, before parsing and dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedCandidate {
    pub raw: String,
    pub context: Option<String>,
}

/// Walks every element under `<body>` looking for currency text, then does
/// one global `R$` pass over the whole body.
///
/// The global pass repeats most per-element hits; dedup happens later in
/// [`findings_from_candidates`].
pub fn scrape_candidates(doc: &Html) -> Vec<ScrapedCandidate> {
    let Some(body) = html::body(doc) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();

    for el in body.descendants().skip(1).filter_map(ElementRef::wrap) {
        if html::is_hidden(&el) {
            continue;
        }
        let text = html::inner_text(el);
        if text.is_empty() {
            continue;
        }
        let Some(raw) = match_amount(&text) else {
            continue;
        };
        candidates.push(ScrapedCandidate {
            raw,
            context: nearby_title(el),
        });
    }

    let body_text = html::inner_text(body);
    for caps in CURRENCY_RE.captures_iter(&body_text) {
        let raw = caps[1].trim();
        if !raw.is_empty() {
            candidates.push(ScrapedCandidate {
                raw: raw.to_string(),
                context: None,
            });
        }
    }

    tracing::debug!(count = candidates.len(), "Scraped currency candidates");
    candidates
}

/// First pattern that matches decides; an all-whitespace capture skips the
/// element rather than trying the next pattern.
fn match_amount(text: &str) -> Option<String> {
    let caps = AMOUNT_PATTERNS.iter().find_map(|re| re.captures(text))?;
    let raw = caps[1].trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn nearby_title(el: ElementRef<'_>) -> Option<String> {
    let mut current = Some(el);
    let mut depth = 0;

    while let Some(node) = current {
        if depth >= MAX_TITLE_DEPTH || node.value().name() == "body" {
            break;
        }

        let heading = node
            .select(&HEADINGS)
            .next()
            .map(html::inner_text)
            .filter(|t| !t.is_empty());
        if heading.is_some() {
            return heading;
        }

        if CONTAINERS.matches(&node) {
            let text = html::inner_text(node);
            let title = html::first_line(&text);
            return if title.is_empty() {
                None
            } else {
                Some(title.to_string())
            };
        }

        current = node.parent().and_then(ElementRef::wrap);
        depth += 1;
    }

    None
}

/// Parses `markup` and scrapes it in one go. The parsed document never
/// outlives this call, so callers may hold the result across awaits.
pub fn scrape_page(markup: &str) -> Vec<Finding> {
    let doc = Html::parse_document(markup);
    findings_from_candidates(scrape_candidates(&doc))
}

/// Turns raw candidates into UI findings.
///
/// Whitespace is removed from each raw figure; figures without a `.` or `,`
/// are dropped (years, codes). The first candidate per lower-cased figure
/// wins. Banner titles are cleared, and zero amounts are skipped.
pub fn findings_from_candidates(candidates: Vec<ScrapedCandidate>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut findings = Vec::new();

    for candidate in candidates {
        let raw: String = candidate.raw.split_whitespace().collect();
        if raw.is_empty() || !raw.contains(['.', ',']) {
            continue;
        }
        if !seen.insert(raw.to_lowercase()) {
            continue;
        }

        let title = candidate
            .context
            .filter(|t| !t.is_empty() && !BANNER_RE.is_match(t));
        let valor = extract_amount(RawValue::Text(&raw));
        if valor == 0.0 {
            continue;
        }

        findings.push(Finding {
            edital: title,
            lote: None,
            valor,
            raw,
            source: Origin::Ui,
        });
    }

    findings
}
