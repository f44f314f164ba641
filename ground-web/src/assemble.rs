//! Renders normalized documents into the grounding text sent to the model.
//!
//! Block layout (1-based index, blocks separated by a blank line):
//!
//! ```text
//! URL 1
//! Source: https://example.com/a
//! Title: Example
//! Description: N/A
//! Content: ...
//! ```
use crate::types::{Document, RetrievalContext};

const MISSING: &str = "N/A";

fn or_missing(field: Option<&str>) -> &str {
    field.filter(|s| !s.is_empty()).unwrap_or(MISSING)
}

pub fn render_doc_string(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "URL {}\nSource: {}\nTitle: {}\nDescription: {}\nContent: {}\n",
                i + 1,
                or_missing(Some(doc.metadata.source.as_str())),
                or_missing(doc.metadata.title.as_deref()),
                or_missing(doc.metadata.description.as_deref()),
                doc.content,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn assemble(documents: Vec<Document>, trace: &[String]) -> RetrievalContext {
    RetrievalContext {
        doc_string: render_doc_string(&documents),
        trace: trace.join("\n"),
        documents,
    }
}
