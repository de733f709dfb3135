//! Feed parsing and normalisation.
//!
//! Raw bytes are first decoded to UTF-8 and run through the text repairs in
//! [`super::repair`] (bare `&`, truncated bodies).  The result goes through
//! [`feed_rs`], which understands RSS 0.9x, RSS 1.0 (RDF), RSS 2.0, Atom and
//! JSON Feed.  When it rejects a document the [`rss`] crate gets a second
//! try; anything it recovers is kept and the feed is flagged malformed.
//! [`parse`] never fails: the worst case is an empty article list with a
//! diagnostic.
//!
//! Dates and authors come in many shapes across dialects.  Both are resolved
//! here into the plain types of [`ArticleRecord`].

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use feed_rs::model::{Entry, Person};
use tracing::{debug, warn};

use super::repair::{close_truncated, decode_to_utf8, escape_bare_ampersands, is_truncated};
use super::ArticleRecord;
use crate::error::EntryError;

/// Name feed-rs gives a person it could not split into name and email; the
/// original text is then in `email`.
const FEED_RS_UNNAMED: &str = "author";

/// Result of parsing one feed body.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    /// Articles in feed order.
    pub articles: Vec<ArticleRecord>,
    /// Set when the document was malformed; the articles are whatever could
    /// be recovered.
    pub malformed: Option<String>,
    /// Entries dropped because they could not be normalised.
    pub skipped: usize,
}

/// Parse a feed body into articles.  Never fails; see [`ParsedFeed`].
pub fn parse(bytes: &[u8]) -> ParsedFeed {
    let mut problems = Vec::new();

    let decoded = decode_to_utf8(bytes);
    let mut text = escape_bare_ampersands(&decoded);
    if matches!(text, Cow::Owned(_)) {
        problems.push("unescaped '&' repaired".to_string());
    }
    if is_truncated(&text) {
        if let Some(closed) = close_truncated(&text) {
            problems.push("truncated feed, kept the complete entries".to_string());
            text = Cow::Owned(closed);
        }
    }

    let entries = match read_document(&text) {
        Ok((entries, problem)) => {
            problems.extend(problem);
            entries
        }
        Err(e) => {
            return ParsedFeed {
                malformed: Some(format!("unparseable feed: {e}")),
                ..ParsedFeed::default()
            }
        }
    };

    let malformed = (!problems.is_empty()).then(|| problems.join("; "));
    if let Some(diagnostic) = &malformed {
        warn!(%diagnostic, "malformed feed, continuing with recovered entries");
    }
    collect(entries.into_iter(), malformed)
}

type EntryResults = Vec<Result<ArticleRecord, EntryError>>;

/// feed-rs first, then the `rss` reader.  A fallback success comes back with
/// a note saying so.
fn read_document(text: &str) -> Result<(EntryResults, Option<String>), String> {
    let parser = feed_rs::parser::Builder::new()
        .timestamp_parser(parse_date_lenient)
        .build();

    let primary = match parser.parse(text.as_bytes()) {
        Ok(feed) => return Ok((feed.entries.iter().map(from_feed_rs).collect(), None)),
        Err(e) => e,
    };

    warn!(error = %primary, "feed rejected, retrying with the lenient RSS reader");
    match rss::Channel::read_from(text.as_bytes()) {
        Ok(channel) => Ok((
            channel.items().iter().map(from_rss).collect(),
            Some(format!("malformed feed ({primary}), entries recovered as RSS")),
        )),
        Err(fallback) => {
            warn!(error = %fallback, "lenient RSS reader failed too, no entries recovered");
            Err(primary.to_string())
        }
    }
}

fn collect<I>(entries: I, malformed: Option<String>) -> ParsedFeed
where
    I: Iterator<Item = Result<ArticleRecord, EntryError>>,
{
    let mut parsed = ParsedFeed {
        malformed,
        ..ParsedFeed::default()
    };
    for (index, entry) in entries.enumerate() {
        match entry {
            Ok(article) => parsed.articles.push(article),
            Err(e) => {
                debug!(index, error = %e, "skipping feed entry");
                parsed.skipped += 1;
            }
        }
    }
    parsed
}

// ---------------------------------------------------------------------------
// Per-dialect entry conversion
// ---------------------------------------------------------------------------

fn from_feed_rs(entry: &Entry) -> Result<ArticleRecord, EntryError> {
    let title = entry.title.as_ref().map(|t| t.content.as_str());
    let link = select_link(entry);
    // feed-rs has already run raw date strings through `parse_date_lenient`.
    let dates = DateCandidates {
        published: entry.published,
        updated: entry.updated,
        raw: Vec::new(),
    };
    build(title, link, dates, AuthorField::Structured(&entry.authors))
}

fn from_rss(item: &rss::Item) -> Result<ArticleRecord, EntryError> {
    let dublin_core = item.dublin_core_ext();

    let mut raw = Vec::new();
    raw.extend(item.pub_date());
    if let Some(dc) = dublin_core {
        raw.extend(dc.dates().iter().map(String::as_str));
    }
    let dates = DateCandidates {
        published: None,
        updated: None,
        raw,
    };

    let authors = match (dublin_core.map(|dc| dc.creators()), item.author()) {
        (Some(creators), _) if !creators.is_empty() => AuthorField::List(creators),
        (_, Some(author)) => AuthorField::Plain(author),
        _ => AuthorField::Missing,
    };

    build(item.title(), item.link(), dates, authors)
}

fn build(
    title: Option<&str>,
    link: Option<&str>,
    dates: DateCandidates<'_>,
    authors: AuthorField<'_>,
) -> Result<ArticleRecord, EntryError> {
    let blank = |s: Option<&str>| s.map_or(true, |s| s.trim().is_empty());
    if blank(title) && blank(link) {
        return Err(EntryError::Blank);
    }
    Ok(ArticleRecord::new(
        title,
        link,
        dates.resolve(),
        normalize_authors(authors),
    ))
}

/// Prefer an `alternate` (or rel-less) link, then any link, then an id that
/// is itself a URL.
fn select_link(entry: &Entry) -> Option<&str> {
    let non_blank = || entry.links.iter().filter(|l| !l.href.trim().is_empty());
    non_blank()
        .find(|l| {
            l.rel
                .as_deref()
                .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| non_blank().next())
        .map(|l| l.href.as_str())
        .or_else(|| {
            let id = entry.id.trim();
            (id.starts_with("http://") || id.starts_with("https://")).then_some(id)
        })
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Date sources for one entry, in priority order.
struct DateCandidates<'a> {
    published: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    raw: Vec<&'a str>,
}

impl DateCandidates<'_> {
    fn resolve(&self) -> Option<DateTime<Utc>> {
        self.published
            .or(self.updated)
            .or_else(|| self.raw.iter().find_map(|raw| parse_date_lenient(raw)))
    }
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%d %b %Y %H:%M:%S %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%B %d, %Y", "%b %d, %Y"];

/// Best-effort parser for the date strings found in the wild.
///
/// Values without a zone are taken as UTC; bare dates as midnight UTC.
pub fn parse_date_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let zoned = DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .or_else(|| {
            ZONED_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        });
    if let Some(dt) = zoned {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(naive.and_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Authors
// ---------------------------------------------------------------------------

/// The shapes author metadata arrives in.
enum AuthorField<'a> {
    Missing,
    /// A single free-text author, e.g. RSS `<author>`.
    Plain(&'a str),
    /// A list of free-text names, e.g. Dublin Core `<dc:creator>`.
    List(&'a [String]),
    /// Structured people (Atom `<author>`, or whatever feed-rs mapped).
    Structured(&'a [Person]),
}

fn normalize_authors(field: AuthorField<'_>) -> Vec<String> {
    let names: Vec<String> = match field {
        AuthorField::Missing => Vec::new(),
        AuthorField::Plain(text) => vec![plain_author(text)],
        AuthorField::List(names) => names.iter().map(|n| plain_author(n)).collect(),
        AuthorField::Structured(people) => people.iter().filter_map(person_name).collect(),
    };
    names.into_iter().filter(|n| !n.is_empty()).collect()
}

/// RSS 2.0 wants `addr@example.com (Full Name)`; keep only the name.
fn plain_author(text: &str) -> String {
    let text = text.trim();
    if let (Some(open), true) = (text.find('('), text.ends_with(')')) {
        let inner = text[open + 1..text.len() - 1].trim();
        if !inner.is_empty() && text[..open].contains('@') {
            return inner.to_string();
        }
    }
    text.to_string()
}

/// A person's name, or failing that whatever else identifies them.
fn person_name(person: &Person) -> Option<String> {
    let name = person.name.trim();
    if !name.is_empty() && name != FEED_RS_UNNAMED {
        return Some(plain_author(name));
    }
    person
        .email
        .as_deref()
        .or(person.uri.as_deref())
        .map(plain_author)
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
