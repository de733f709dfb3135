//! Feed sources: where articles come from and how they are turned into
//! [`ArticleRecord`]s.
//!
//! * [`FeedSource`]: one registry entry (journal name + feed URL).
//! * [`Fetch`]: the seam between the pipeline and the network.
//!   [`HttpFetcher`] is the production implementation; tests plug in an
//!   in-memory one.
//! * [`parse`]: turns raw feed bytes into normalised articles.

mod article;
mod fetch;
mod parse;
mod repair;

// Re-export the public API of this module so callers can write
// `use crate::source::{ArticleRecord, FeedSource, Fetch};`
pub use article::ArticleRecord;
pub use fetch::HttpFetcher;
pub use parse::parse;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A journal in the source registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Human-readable journal name, used as the section heading.
    pub name: String,
    /// RSS / Atom feed URL.
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Retrieves the raw body of a feed.
///
/// The assembler calls [`fetch()`](Fetch::fetch) once per source, strictly
/// sequentially.  Implementations own their retry policy; an `Err` is final
/// for that source in the current run.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
