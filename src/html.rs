use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements whose content never renders as text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Elements that start on their own line when rendered.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "thead", "tfoot", "tr", "td", "th", "ul", "option", "caption",
];

/// Approximation of the browser's `innerText`: hidden content dropped,
/// whitespace collapsed, block boundaries rendered as line breaks, blank
/// lines removed.
pub fn inner_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => {
                for ch in t.chars() {
                    out.push(if ch.is_whitespace() { ' ' } else { ch });
                }
            }
            Node::Element(e) => {
                let name = e.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    let block = BLOCK.contains(&name);
                    if block {
                        out.push('\n');
                    }
                    push_text(child_el, out);
                    if block {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

/// True for non-rendered elements and anything nested inside them.
pub fn is_hidden(el: &ElementRef<'_>) -> bool {
    SKIPPED.contains(&el.value().name())
        || el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| SKIPPED.contains(&a.value().name()))
}

pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// The `<body>` element, if the document has one.
pub fn body(doc: &Html) -> Option<ElementRef<'_>> {
    let sel = Selector::parse("body").ok()?;
    doc.select(&sel).next()
}
