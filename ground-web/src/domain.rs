use std::fmt;
use url::Url;

/// Deduplication key: the URL's network location (host plus any explicit
/// port). `www.a.com` and `a.com` are different domains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Domain(String);

impl Domain {
    /// `None` for URLs without a host (`mailto:`, `data:` ...).
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str().filter(|h| !h.is_empty())?;
        Some(match url.port() {
            Some(port) => Domain(format!("{host}:{port}")),
            None => Domain(host.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
