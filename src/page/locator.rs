use std::collections::HashSet;
use std::fmt;

use scraper::{ElementRef, Html, Selector};

use crate::error::AppError;
use crate::html;

/// Element query in the small Playwright-like syntax the suite is configured
/// with:
///
/// - `article`, `.reports a`, `[data-testid="edital"]`: plain CSS
/// - `a:has-text("Detalhes")`: CSS filtered by case-insensitive inner text
/// - `text=Calculadora`: innermost elements containing the text
/// - any of the above joined by top-level commas, matched in document order
#[derive(Clone)]
pub enum Locator {
    Css { source: String, selector: Selector },
    HasText { source: String, selector: Selector, text: String },
    Text(String),
    Any(Vec<Locator>),
}

/// Owned snapshot of a located element, detached from the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    pub tag: String,
    /// Rendered text, see [`html::inner_text`].
    pub text: String,
    /// Raw `textContent`: every descendant text node, whitespace as authored.
    pub text_content: String,
    pub href: Option<String>,
    /// Own `href`, or the first descendant link's.
    pub link: Option<String>,
    /// `tag:nth-child(n)` chain from the root, for addressing the same
    /// element in a live DOM.
    pub path: String,
}

impl Locator {
    pub fn parse(spec: &str) -> Result<Self, AppError> {
        let mut parts = split_top_level(spec)
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(parse_single)
            .collect::<Result<Vec<_>, _>>()?;

        match parts.len() {
            0 => Err(AppError::Selector {
                selector: spec.to_string(),
                detail: "empty locator".to_string(),
            }),
            1 => Ok(parts.remove(0)),
            _ => Ok(Locator::Any(parts)),
        }
    }

    /// Matches in document order, without repeats.
    pub fn find_all<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Locator::Css { selector, .. } => doc.select(selector).collect(),
            Locator::HasText { selector, text, .. } => doc
                .select(selector)
                .filter(|el| contains_ci(&html::inner_text(*el), text))
                .collect(),
            Locator::Text(text) => innermost_with_text(doc, text),
            Locator::Any(parts) => {
                let ids: HashSet<_> = parts
                    .iter()
                    .flat_map(|p| p.find_all(doc))
                    .map(|el| el.id())
                    .collect();
                doc.tree
                    .root()
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| ids.contains(&el.id()))
                    .collect()
            }
        }
    }

    /// Parses `markup` and returns owned handles for every match.
    pub fn handles(&self, markup: &str) -> Vec<ElementHandle> {
        let doc = Html::parse_document(markup);
        self.find_all(&doc)
            .into_iter()
            .map(ElementHandle::from_element)
            .collect()
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({self})")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { source, .. } | Locator::HasText { source, .. } => f.write_str(source),
            Locator::Text(text) => write!(f, "text={text}"),
            Locator::Any(parts) => {
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                Ok(())
            }
        }
    }
}

impl ElementHandle {
    pub fn from_element(el: ElementRef<'_>) -> Self {
        let href = el.value().attr("href").map(str::to_string);
        let link = href.clone().or_else(|| {
            let a_sel = Selector::parse("a[href]").ok()?;
            el.select(&a_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        });
        Self {
            tag: el.value().name().to_string(),
            text: html::inner_text(el),
            text_content: el.text().collect(),
            href,
            link,
            path: css_path(el),
        }
    }
}

fn css_path(el: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .map(|e| {
            let position = e.prev_siblings().filter(|n| n.value().is_element()).count() + 1;
            format!("{}:nth-child({})", e.value().name(), position)
        })
        .collect();
    parts.reverse();
    parts.join(" > ")
}

fn parse_single(part: &str) -> Result<Locator, AppError> {
    if let Some(text) = part.strip_prefix("text=") {
        return Ok(Locator::Text(unquote(text).to_string()));
    }

    if let Some(idx) = part.find(":has-text(") {
        let css = match part[..idx].trim() {
            "" => "*",
            css => css,
        };
        let arg = part[idx + ":has-text(".len()..]
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| AppError::Selector {
                selector: part.to_string(),
                detail: "unterminated :has-text(".to_string(),
            })?;
        return Ok(Locator::HasText {
            source: part.to_string(),
            selector: css_selector(css)?,
            text: unquote(arg.trim()).to_string(),
        });
    }

    Ok(Locator::Css {
        source: part.to_string(),
        selector: css_selector(part)?,
    })
}

fn css_selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::Selector {
        selector: css.to_string(),
        detail: e.to_string(),
    })
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// Splits on commas outside quotes, brackets and parentheses.
fn split_top_level(spec: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in spec.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&spec[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&spec[start..]);
    parts
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Elements containing `text` none of whose children also contain it.
fn innermost_with_text<'a>(doc: &'a Html, text: &str) -> Vec<ElementRef<'a>> {
    let Some(body) = html::body(doc) else {
        return Vec::new();
    };
    let has_text = |el: &ElementRef<'_>| !html::is_hidden(el) && contains_ci(&html::inner_text(*el), text);

    body.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| has_text(el))
        .filter(|el| !el.children().filter_map(ElementRef::wrap).any(|c| has_text(&c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Html {
        let page = std::fs::read_to_string("tests/fixtures/editais_page.html")
            .expect("Missing fixture: tests/fixtures/editais_page.html");
        Html::parse_document(&page)
    }

    #[test]
    fn test_parse_variants() {
        assert!(matches!(Locator::parse("article").unwrap(), Locator::Css { .. }));
        assert!(matches!(Locator::parse("text=Calculadora").unwrap(), Locator::Text(t) if t == "Calculadora"));
        match Locator::parse(r#"a:has-text("Ver edital")"#).unwrap() {
            Locator::HasText { text, .. } => assert_eq!(text, "Ver edital"),
            other => panic!("unexpected {other:?}"),
        }
        match Locator::parse(r#"a:has-text("a, b"), .reports a"#).unwrap() {
            Locator::Any(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(Locator::parse("").is_err());
        assert!(Locator::parse(" , ").is_err());
        assert!(Locator::parse("a:has-text(\"x\"").is_err());
        assert!(Locator::parse("[[broken").is_err());
    }

    #[test]
    fn test_css_and_attribute() {
        let doc = fixture();
        assert_eq!(Locator::parse("article").unwrap().find_all(&doc).len(), 2);
        let testid = Locator::parse(r#"[data-testid="edital"]"#).unwrap();
        assert_eq!(testid.find_all(&doc).len(), 1);
        assert!(Locator::parse(".nope").unwrap().find_all(&doc).is_empty());
    }

    #[test]
    fn test_has_text_is_case_insensitive() {
        let doc = fixture();
        let details = Locator::parse(r#"a:has-text("detalhes"), a:has-text("Ver edital")"#).unwrap();
        let hrefs: Vec<_> = details
            .find_all(&doc)
            .into_iter()
            .filter_map(|el| el.value().attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["/editais/12", "/editais/13"]);
    }

    #[test]
    fn test_union_is_document_ordered_and_unique() {
        let doc = fixture();
        let reports = Locator::parse(
            r#"a:has-text("Relatório"), a:has-text("relatorios"), a:has-text("relatórios"), .reports a"#,
        )
        .unwrap();
        let texts: Vec<_> = reports.find_all(&doc).into_iter().map(html::inner_text).collect();
        assert_eq!(texts, vec!["Relatório anual", "Mensal"]);
    }

    #[test]
    fn test_text_finds_innermost() {
        let doc = fixture();
        let found = Locator::parse("text=Calculadora").unwrap().find_all(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value().name(), "li");
    }

    #[test]
    fn test_handles_resolve_links() {
        let page = r#"<body><div class="card"><h3>X</h3><a href="/editais/1">abrir</a></div>
                      <a href="/r.pdf">Relatório</a></body>"#;
        let cards = Locator::parse(".card").unwrap().handles(page);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].href, None);
        assert_eq!(cards[0].link.as_deref(), Some("/editais/1"));
        assert_eq!(cards[0].path, "html:nth-child(1) > body:nth-child(2) > div:nth-child(1)");

        let links = Locator::parse("a:has-text(\"relatório\")").unwrap().handles(page);
        assert_eq!(links[0].href.as_deref(), Some("/r.pdf"));
        assert_eq!(links[0].text, "Relatório");
        assert_eq!(links[0].path, "html:nth-child(1) > body:nth-child(2) > a:nth-child(2)");
    }

    #[test]
    fn test_path_addresses_same_element() {
        let page = std::fs::read_to_string("tests/fixtures/editais_page.html")
            .expect("Missing fixture: tests/fixtures/editais_page.html");
        let lot = Locator::parse("text=Calculadora").unwrap().handles(&page);
        assert_eq!(lot.len(), 1);
        assert_eq!(lot[0].tag, "li");

        let by_path = Locator::parse(&lot[0].path).unwrap().handles(&page);
        assert_eq!(by_path, lot);
    }

    #[test]
    fn test_text_content_keeps_authored_whitespace() {
        let page = "<body><div class=\"lote\">\n  <p>Calculadora</p>\n  <p>R$ 10,00</p>\n</div></body>";
        let lote = &Locator::parse(".lote").unwrap().handles(page)[0];
        assert_eq!(lote.text, "Calculadora\nR$ 10,00");
        assert_eq!(lote.text_content, "\n  Calculadora\n  R$ 10,00\n");
    }

    #[test]
    fn test_display_round_trips_source() {
        let spec = r#"a:has-text("Detalhes"), text=Calculadora"#;
        assert_eq!(Locator::parse(spec).unwrap().to_string(), spec);
    }
}
