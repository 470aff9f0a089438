//! Hypermedia links.
//!
//! Every list-shaped response and every entity carries a `self`/`collection`
//! pair. All hrefs are computed from one configured URL prefix, e.g.
//! `https://api.example.com/api/v1`.

use serde::{Deserialize, Serialize};

/// A hypermedia affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation name (`self`, `collection`, ...).
    pub rel: String,
    /// Target URL.
    pub href: String,
}

impl Link {
    /// Create a link.
    #[must_use]
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }
}

/// Computes composite URLs from the configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypermedia {
    url_prefix: String,
}

impl Hypermedia {
    /// Create a link builder. A trailing `/` on the prefix is ignored.
    #[must_use]
    pub fn new(url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self { url_prefix }
    }

    /// `{prefix}/composites/`
    #[must_use]
    pub fn collection_href(&self) -> String {
        format!("{}/composites/", self.url_prefix)
    }

    /// `{prefix}/composites/{id}/`
    #[must_use]
    pub fn composite_href(&self, breeder_id: &str) -> String {
        format!("{}/composites/{breeder_id}/", self.url_prefix)
    }

    /// `{prefix}/composites/both/{breeder_id}/{pet_id}/`
    #[must_use]
    pub fn pet_href(&self, breeder_id: &str, pet_id: &str) -> String {
        format!("{}/composites/both/{breeder_id}/{pet_id}/", self.url_prefix)
    }

    /// `{prefix}/composites/breeders/id/{id}/`
    #[must_use]
    pub fn breeder_lookup_href(&self, breeder_id: &str) -> String {
        format!("{}/composites/breeders/id/{breeder_id}/", self.url_prefix)
    }

    /// `{prefix}/composites/customers/id/{id}/`
    #[must_use]
    pub fn customer_lookup_href(&self, customer_id: &str) -> String {
        format!("{}/composites/customers/id/{customer_id}/", self.url_prefix)
    }

    /// `self` and `collection` both pointing at the list endpoint.
    #[must_use]
    pub fn collection_links(&self) -> Vec<Link> {
        self.entity_links(self.collection_href())
    }

    /// `self` pointing at `self_href`, `collection` at the list endpoint.
    #[must_use]
    pub fn entity_links(&self, self_href: String) -> Vec<Link> {
        vec![
            Link::new("self", self_href),
            Link::new("collection", self.collection_href()),
        ]
    }

    /// RFC 8288 `Link` header value for a created composite.
    #[must_use]
    pub fn link_header(&self, self_href: &str) -> String {
        format!(
            "<{self_href}>; rel=\"self\", <{}>; rel=\"collection\"",
            self.collection_href()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_on_prefix_is_ignored() {
        let links = Hypermedia::new("http://localhost:8080/api/v1/");
        assert_eq!(
            links.collection_href(),
            "http://localhost:8080/api/v1/composites/"
        );
        assert_eq!(
            links.composite_href("42"),
            "http://localhost:8080/api/v1/composites/42/"
        );
    }

    #[test]
    fn test_entity_links_pair() {
        let links = Hypermedia::new("http://x");
        let pair = links.entity_links(links.pet_href("b1", "p1"));

        assert_eq!(pair[0], Link::new("self", "http://x/composites/both/b1/p1/"));
        assert_eq!(pair[1], Link::new("collection", "http://x/composites/"));
    }

    #[test]
    fn test_link_header_format() {
        let links = Hypermedia::new("http://x");
        assert_eq!(
            links.link_header(&links.composite_href("7")),
            "<http://x/composites/7/>; rel=\"self\", <http://x/composites/>; rel=\"collection\""
        );
    }
}
