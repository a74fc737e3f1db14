//! Tolerant list-response pages
//!
//! List endpoints answer in one of two shapes, depending on backend version:
//! a bare JSON array, or `{ "results": [...], "next": <url|null> }` where
//! `next` carries a `page` query parameter. Both shapes of the same logical
//! list must decode to the same items.

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Cursor URL for the next page, if the server paginated
    pub next: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListShape<T> {
    Paged {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
    Bare(Vec<T>),
}

impl<T: DeserializeOwned> Page<T> {
    /// Parse either response shape from a raw JSON body.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        let shape: ListShape<T> = serde_json::from_str(body)?;
        Ok(match shape {
            ListShape::Paged { results, next } => Page {
                items: results,
                next,
            },
            ListShape::Bare(items) => Page { items, next: None },
        })
    }
}

impl<T> Page<T> {
    /// Page number encoded in the `next` cursor URL, if any.
    pub fn next_page(&self) -> Option<u32> {
        let next = self.next.as_deref()?;
        let (_, query) = next.split_once('?')?;
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                if key == "page" {
                    let value = urlencoding::decode(value).ok()?;
                    return value.parse().ok();
                }
            }
        }
        None
    }
}
