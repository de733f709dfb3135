//! Per-source article selection.

use chrono::NaiveDate;

use crate::source::ArticleRecord;

/// How a source's parsed articles are narrowed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The first `limit` articles in feed order.  Feeds are conventionally
    /// newest-first, so this is "the latest N".
    TopN { limit: usize },
    /// Articles published on the run's UTC date, optionally capped.
    SameDay { limit: Option<usize> },
}

/// Apply `selection` to `articles`, keeping feed order.
///
/// `today` is the run's UTC calendar date; it is only consulted in
/// same-day mode.  Undated articles never pass the same-day test.
pub fn select(
    articles: Vec<ArticleRecord>,
    selection: Selection,
    today: NaiveDate,
) -> Vec<ArticleRecord> {
    match selection {
        Selection::TopN { limit } => articles.into_iter().take(limit).collect(),
        Selection::SameDay { limit } => articles
            .into_iter()
            .filter(|a| a.published_on(today))
            .take(limit.unwrap_or(usize::MAX))
            .collect(),
    }
}
