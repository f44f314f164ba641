//! Generic HTML → text extraction via `scraper`.
//!
//! No site-specific rules: visible text of `<body>` (or the whole document
//! when there is no body), with script-like subtrees skipped structurally,
//! plus `<title>` and the meta description.
use crate::types::{Document, DocumentMetadata};
use scraper::{ElementRef, Html, Node, Selector};

const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "td", "th",
    "article", "section", "main", "header", "footer", "nav", "aside", "blockquote",
    "pre", "figcaption", "dt", "dd", "table", "ul", "ol",
];

/// Build a raw (not yet normalized) document from a fetched page.
pub fn extract_document(source: &str, html: &str) -> Document {
    // `Html` is !Send; keep it inside this sync function.
    let doc = Html::parse_document(html);
    Document {
        content: page_text(&doc),
        metadata: DocumentMetadata {
            source: source.to_string(),
            title: title(&doc),
            description: description(&doc),
        },
    }
}

fn select_first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()
}

fn title(doc: &Html) -> Option<String> {
    let el = select_first(doc, "title")?;
    let text: String = el.text().collect();
    non_empty(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn description(doc: &Html) -> Option<String> {
    ["meta[name=\"description\"]", "meta[property=\"og:description\"]"]
        .iter()
        .filter_map(|s| select_first(doc, s))
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn page_text(doc: &Html) -> String {
    let root = select_first(doc, "body").unwrap_or_else(|| doc.root_element());
    let mut buf = String::new();
    collect_text(&root, &mut buf);
    buf
}

fn collect_text(node: &ElementRef<'_>, buf: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if SKIP_TAGS.contains(&tag) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    buf.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, buf);
                }
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
