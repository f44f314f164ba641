use url::Url;

/// A search result link in provider order. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub url: Url,
    pub rank: usize,
    /// The link exactly as the provider returned it, used for display.
    pub link: String,
}

impl SearchCandidate {
    pub fn new(url: Url, rank: usize) -> Self {
        let link = url.to_string();
        Self { url, rank, link }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// URL the page was requested from.
    pub source: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Page text plus metadata, produced by fetching one admitted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// Output of one retrieval run: the documents, their rendered form handed to
/// the model, and the list of visited sites shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalContext {
    pub documents: Vec<Document>,
    pub doc_string: String,
    pub trace: String,
}

impl RetrievalContext {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}
