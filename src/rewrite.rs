use bytes::Bytes;

/// Whether a WMTS query asks for the capabilities document.
pub fn is_capabilities_request(query: &str) -> bool {
    query.contains("REQUEST=GetCapabilities")
}

/// Replace every occurrence of `from` with `to` in raw bytes.
///
/// Matches are found left to right and never overlap. The document is not
/// parsed, so relative URLs are left alone.
pub fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() || haystack.len() < from.len() {
        return haystack.to_vec();
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

/// Points capabilities documents at this proxy instead of the upstream server.
#[derive(Debug, Clone)]
pub struct CapabilitiesRewriter {
    upstream_url: String,
    self_url: String,
}

impl CapabilitiesRewriter {
    pub fn new(upstream_url: impl Into<String>, self_url: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            self_url: self_url.into(),
        }
    }

    /// Rewrite `body` if `query` is a GetCapabilities request, otherwise return it untouched.
    pub fn apply(&self, query: &str, body: Bytes) -> Bytes {
        if !is_capabilities_request(query) {
            return body;
        }
        Bytes::from(replace_all(&body, self.upstream_url.as_bytes(), self.self_url.as_bytes()))
    }
}
