//! Configuration for the sync client.

use pagesync_protocol::PageId;

/// Configuration for a [`SyncClient`](crate::SyncClient).
///
/// Connection-level concerns (timeouts, authentication, TLS) belong to the
/// `HttpClient` implementation and are configured once at its construction;
/// this struct only carries what the core itself needs to build requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server, without a trailing slash.
    pub base_url: String,
    /// Page size cap for paginated search and listing calls.
    pub page_size: u32,
    /// Minimum accepted length for a search query, after trimming.
    pub min_query_len: usize,
}

impl ClientConfig {
    /// Creates a configuration for the given server.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            page_size: 25,
            min_query_len: 3,
        }
    }

    /// Sets the pagination page size.
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the minimum search query length.
    #[must_use]
    pub fn with_min_query_len(mut self, len: usize) -> Self {
        self.min_query_len = len;
        self
    }

    /// Collection endpoint for create and key/title lookups.
    pub(crate) fn content_url(&self) -> String {
        format!("{}/rest/api/content", self.base_url)
    }

    /// Single-resource endpoint for fetch, update, and delete.
    pub(crate) fn content_id_url(&self, id: PageId) -> String {
        format!("{}/rest/api/content/{}", self.base_url, id)
    }

    /// CQL search endpoint.
    pub(crate) fn search_url(&self) -> String {
        format!("{}/rest/api/content/search", self.base_url)
    }

    /// Direct-children listing endpoint.
    pub(crate) fn child_pages_url(&self, id: PageId) -> String {
        format!("{}/rest/api/content/{}/child/page", self.base_url, id)
    }

    /// Label sub-resource endpoint.
    pub(crate) fn label_url(&self, id: PageId) -> String {
        format!("{}/rest/api/content/{}/label", self.base_url, id)
    }

    /// Sidecar form endpoint.
    pub(crate) fn scaffold_url(&self, id: PageId) -> String {
        format!("{}/rest/scaffolding/1.0/api/form/{}", self.base_url, id)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash() {
        let config = ClientConfig::new("https://wiki.example.com/");
        assert_eq!(config.base_url, "https://wiki.example.com");
        assert_eq!(
            config.content_url(),
            "https://wiki.example.com/rest/api/content"
        );
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::new("http://wiki")
            .with_page_size(50)
            .with_min_query_len(5);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.min_query_len, 5);
    }

    #[test]
    fn endpoint_paths() {
        let config = ClientConfig::new("http://wiki");
        let id = PageId::parse("42").unwrap();
        assert_eq!(config.content_id_url(id), "http://wiki/rest/api/content/42");
        assert_eq!(
            config.child_pages_url(id),
            "http://wiki/rest/api/content/42/child/page"
        );
        assert_eq!(config.label_url(id), "http://wiki/rest/api/content/42/label");
        assert_eq!(
            config.scaffold_url(id),
            "http://wiki/rest/scaffolding/1.0/api/form/42"
        );
    }
}
