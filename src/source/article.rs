//! The normalised article type every feed dialect is converted into.
//!
//! RSS 2.0, RSS 1.0 (RDF) and Atom entries all end up as an
//! [`ArticleRecord`], so filtering and rendering never need to know which
//! dialect a journal publishes.

use chrono::{DateTime, NaiveDate, Utc};
use html_escape::decode_html_entities;
use serde::Serialize;

/// Title used when a feed entry has no usable title.
pub const NO_TITLE: &str = "no title";

/// Link used when a feed entry has no usable link.
pub const NO_LINK: &str = "#";

/// A single article, normalised from any feed dialect.
///
/// `title` and `link` are always present (see [`NO_TITLE`] / [`NO_LINK`]).
/// `title` is stored as plain text: HTML entities are decoded here, and
/// escaping is the renderer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,

    /// Publication timestamp, normalised to UTC.
    ///
    /// `None` when the entry carried no parseable date.
    pub published_at: Option<DateTime<Utc>>,

    /// Author names in feed order.  Empty when the feed has no author data.
    pub authors: Vec<String>,
}

impl ArticleRecord {
    /// Build a record, substituting the sentinels for missing or blank
    /// title / link.  Entities left in the title (`&nbsp;`, `&#8217;`, ...)
    /// are decoded.
    pub fn new(
        title: Option<&str>,
        link: Option<&str>,
        published_at: Option<DateTime<Utc>>,
        authors: Vec<String>,
    ) -> Self {
        let title = title
            .map(|t| collapse_whitespace(&decode_html_entities(t)))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string());
        let link = link
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(NO_LINK)
            .to_string();

        Self {
            title,
            link,
            published_at,
            authors,
        }
    }

    /// Whether the article was published on `date` (UTC calendar date).
    /// Undated articles are never "on" any date.
    pub fn published_on(&self, date: NaiveDate) -> bool {
        self.published_at
            .map(|ts| ts.date_naive() == date)
            .unwrap_or(false)
    }
}

/// Feed titles frequently contain hard line breaks and indentation.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_title_and_link_use_sentinels() {
        let article = ArticleRecord::new(None, None, None, vec![]);
        assert_eq!(article.title, NO_TITLE);
        assert_eq!(article.link, NO_LINK);
        assert!(article.authors.is_empty());
        assert!(article.published_at.is_none());
    }

    #[test]
    fn blank_title_counts_as_missing() {
        let article = ArticleRecord::new(Some("  \n "), Some("  "), None, vec![]);
        assert_eq!(article.title, NO_TITLE);
        assert_eq!(article.link, NO_LINK);
    }

    #[test]
    fn title_whitespace_is_collapsed_but_markup_kept_raw() {
        let article = ArticleRecord::new(
            Some("\n   Feline  <i>Bartonella</i>\n   & more  "),
            Some(" https://example.com/a "),
            None,
            vec![],
        );
        assert_eq!(article.title, "Feline <i>Bartonella</i> & more");
        assert_eq!(article.link, "https://example.com/a");
    }

    #[test]
    fn title_entities_are_decoded() {
        let article = ArticleRecord::new(Some("A&nbsp;B"), None, None, vec![]);
        assert_eq!(article.title, "A B");

        let article = ArticleRecord::new(Some("Don&#8217;t &lt;panic&gt;"), None, None, vec![]);
        assert_eq!(article.title, "Don\u{2019}t <panic>");
    }

    #[test]
    fn published_on_compares_utc_date() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 23, 30, 0).unwrap();
        let article = ArticleRecord::new(Some("A"), None, Some(ts), vec![]);
        assert!(article.published_on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
        assert!(!article.published_on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()));
    }

    #[test]
    fn undated_is_never_published_on() {
        let article = ArticleRecord::new(Some("A"), None, None, vec![]);
        assert!(!article.published_on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()));
    }
}
