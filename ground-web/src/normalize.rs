//! Deterministic cleanup applied to every fetched document before assembly.
use crate::types::Document;
use regex::Regex;
use std::sync::LazyLock;

// Whitespace includes the ASCII separators U+001C..U+001F.
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x1C-\x1F]+").expect("static regex"));
static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<script.*?</script>").expect("static regex"));
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<style.*?</style>").expect("static regex"));
// Word characters include every numeric char (`½`, `²`), not just digits.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\p{N}\s\x1C-\x1F.,?!()/;-]").expect("static regex"));

/// Collapse whitespace, drop leftover `<script>`/`<style>` fragments, strip
/// everything but word characters, whitespace and `. , ? ! ( ) / ; -`, then
/// collapse again. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    let text = WHITESPACE.replace_all(raw, " ");
    let text = SCRIPT.replace_all(text.trim(), "");
    let text = STYLE.replace_all(&text, "");
    let text = DISALLOWED.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Metadata passes through untouched.
pub fn normalize_document(doc: Document) -> Document {
    Document {
        content: normalize_text(&doc.content),
        metadata: doc.metadata,
    }
}
