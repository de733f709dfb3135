//! Report assembly: run every source through fetch → parse → select and
//! collect the outcomes in registry order.
//!
//! Sources are processed one at a time.  A failing source is recorded and the
//! run moves on; nothing here can abort the run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::filter::{select, Selection};
use crate::source::{parse, ArticleRecord, FeedSource, Fetch};

/// What happened to one source in this run.  Exactly one of these, never a
/// mix: an errored source carries no articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Ok { articles: Vec<ArticleRecord> },
    /// Fetched and parsed fine, but nothing survived selection.
    Empty,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: FeedSource,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceReport {
    /// Selected articles; empty unless the outcome is `Ok`.
    pub fn articles(&self) -> &[ArticleRecord] {
        match &self.outcome {
            SourceOutcome::Ok { articles } => articles,
            SourceOutcome::Empty | SourceOutcome::Error { .. } => &[],
        }
    }
}

/// Everything the renderer needs.  Sources are in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub generated_at: DateTime<Utc>,
}

/// Run the pipeline over every configured source.
///
/// `today` is the UTC date same-day selection compares against; the caller
/// takes it once when the run starts.  `generated_at` is stamped after the
/// last source finishes.
pub fn assemble(config: &Config, fetcher: &dyn Fetch, today: NaiveDate) -> RunReport {
    let selection = config.selection();

    let sources = config
        .journals
        .iter()
        .map(|source| {
            let outcome = run_source(source, fetcher, selection, today);
            match &outcome {
                SourceOutcome::Ok { articles } => {
                    info!(source = %source.name, articles = articles.len(), "source ok")
                }
                SourceOutcome::Empty => {
                    info!(source = %source.name, "source has no matching articles")
                }
                SourceOutcome::Error { message } => {
                    warn!(source = %source.name, error = %message, "source failed")
                }
            }
            SourceReport {
                source: source.clone(),
                outcome,
            }
        })
        .collect();

    RunReport {
        sources,
        generated_at: Utc::now(),
    }
}

fn run_source(
    source: &FeedSource,
    fetcher: &dyn Fetch,
    selection: Selection,
    today: NaiveDate,
) -> SourceOutcome {
    let body = match fetcher.fetch(&source.url) {
        Ok(body) => body,
        Err(e) => {
            return SourceOutcome::Error {
                message: e.to_string(),
            }
        }
    };

    let parsed = parse(&body);
    if parsed.articles.is_empty() {
        if let Some(diagnostic) = parsed.malformed {
            return SourceOutcome::Error {
                message: diagnostic,
            };
        }
    }

    let articles = select(parsed.articles, selection, today);
    if articles.is_empty() {
        SourceOutcome::Empty
    } else {
        SourceOutcome::Ok { articles }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use chrono::Datelike;
    use reqwest::StatusCode;

    use crate::config::Mode;
    use crate::error::FetchError;

    enum Canned {
        Body(String),
        Status(u16),
    }

    /// In-memory fetcher keyed by URL.  Records every URL requested.
    #[derive(Default)]
    struct StubFetcher {
        responses: HashMap<String, Canned>,
        calls: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn body(mut self, url: &str, body: impl Into<String>) -> Self {
            self.responses.insert(url.to_string(), Canned::Body(body.into()));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.responses.insert(url.to_string(), Canned::Status(status));
            self
        }
    }

    impl Fetch for StubFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            match self.responses.get(url) {
                Some(Canned::Body(body)) => Ok(body.clone().into_bytes()),
                Some(Canned::Status(code)) => Err(FetchError::Exhausted {
                    attempts: 3,
                    last: Box::new(FetchError::Status {
                        url: url.to_string(),
                        status: StatusCode::from_u16(*code).unwrap(),
                    }),
                }),
                None => panic!("unexpected fetch of {url}"),
            }
        }
    }

    /// RSS 2.0 feed with `count` items, all published on `date`.
    fn rss_feed(count: usize, date: NaiveDate) -> String {
        let pub_date = date
            .and_hms_opt(6, 0, 0)
            .unwrap()
            .and_utc()
            .to_rfc2822();
        let items: String = (0..count)
            .map(|i| {
                format!(
                    "<item><title>Article {i}</title><link>https://example.com/{i}</link>\
                     <pubDate>{pub_date}</pubDate></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>T</title>{items}</channel></rss>"#
        )
    }

    fn config(journals: &[(&str, &str)], limit: usize, mode: Mode) -> Config {
        Config {
            journals: journals
                .iter()
                .map(|(name, url)| FeedSource::new(*name, *url))
                .collect(),
            article_limit: limit,
            mode,
            ..Config::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn caps_to_limit_in_feed_order() {
        let fetcher = StubFetcher::default().body("https://a", rss_feed(12, today()));
        let config = config(&[("A", "https://a")], 10, Mode::TopN);

        let report = assemble(&config, &fetcher, today());

        assert_eq!(report.sources.len(), 1);
        let articles = report.sources[0].articles();
        assert_eq!(articles.len(), 10);
        for (i, article) in articles.iter().enumerate() {
            assert_eq!(article.title, format!("Article {i}"));
        }
        assert!(matches!(report.sources[0].outcome, SourceOutcome::Ok { .. }));
    }

    #[test]
    fn recovered_malformed_feed_is_ok() {
        let unversioned = "<rss><channel><title>T</title>\
                           <item><title>One</title><link>https://e/1</link></item>\
                           </channel></rss>";
        let unescaped = rss_feed(2, today()).replace("Article 0", "Cats & Dogs");
        let fetcher = StubFetcher::default()
            .body("https://a", unversioned)
            .body("https://b", unescaped);
        let config = config(&[("A", "https://a"), ("B", "https://b")], 5, Mode::TopN);

        let report = assemble(&config, &fetcher, today());

        assert!(matches!(report.sources[0].outcome, SourceOutcome::Ok { .. }));
        assert_eq!(report.sources[0].articles()[0].title, "One");
        assert!(matches!(report.sources[1].outcome, SourceOutcome::Ok { .. }));
        assert_eq!(report.sources[1].articles()[0].title, "Cats & Dogs");
        assert_eq!(report.sources[1].articles().len(), 2);
    }

    #[test]
    fn exhausted_fetch_is_error_with_message() {
        let fetcher = StubFetcher::default().status("https://down", 500);
        let config = config(&[("Down", "https://down")], 5, Mode::TopN);

        let report = assemble(&config, &fetcher, today());

        match &report.sources[0].outcome {
            SourceOutcome::Error { message } => {
                assert!(!message.is_empty());
                assert!(message.contains("500"));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert!(report.sources[0].articles().is_empty());
    }

    #[test]
    fn registry_order_survives_mixed_outcomes() {
        let fetcher = StubFetcher::default()
            .status("https://z", 503)
            .body("https://y", rss_feed(0, today()))
            .body("https://x", rss_feed(2, today()))
            .body("https://w", "not a feed at all");
        let config = config(
            &[
                ("Z", "https://z"),
                ("Y", "https://y"),
                ("X", "https://x"),
                ("W", "https://w"),
            ],
            5,
            Mode::TopN,
        );

        let report = assemble(&config, &fetcher, today());

        let names: Vec<_> = report.sources.iter().map(|s| s.source.name.as_str()).collect();
        assert_eq!(names, vec!["Z", "Y", "X", "W"]);
        assert_eq!(
            *fetcher.calls.borrow(),
            vec!["https://z", "https://y", "https://x", "https://w"],
            "each source fetched exactly once, in order"
        );

        assert!(matches!(report.sources[0].outcome, SourceOutcome::Error { .. }));
        assert_eq!(report.sources[1].outcome, SourceOutcome::Empty);
        assert_eq!(report.sources[2].articles().len(), 2);
        assert!(
            matches!(report.sources[3].outcome, SourceOutcome::Error { .. }),
            "unparseable body is reported, not dropped"
        );
    }

    #[test]
    fn same_day_only_keeps_todays_articles() {
        let yesterday = today().pred_opt().unwrap();
        let feed = rss_feed(3, yesterday).replace(
            "</channel>",
            &format!(
                "<item><title>Fresh</title><link>https://example.com/fresh</link>\
                 <pubDate>{}</pubDate></item>\
                 <item><title>Undated</title><link>https://example.com/undated</link></item>\
                 </channel>",
                today().and_hms_opt(1, 0, 0).unwrap().and_utc().to_rfc2822()
            ),
        );
        let fetcher = StubFetcher::default()
            .body("https://a", feed)
            .body("https://b", rss_feed(2, yesterday));
        let config = config(&[("A", "https://a"), ("B", "https://b")], 5, Mode::SameDay);

        let report = assemble(&config, &fetcher, today());

        let a = report.sources[0].articles();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].title, "Fresh");
        for article in report.sources.iter().flat_map(|s| s.articles()) {
            let published = article.published_at.expect("same-day output is always dated");
            assert_eq!(published.date_naive(), today());
            assert_eq!(published.day(), 1);
        }
        assert_eq!(report.sources[1].outcome, SourceOutcome::Empty);
    }

    #[test]
    fn identical_input_gives_identical_report() {
        let fetcher = StubFetcher::default()
            .body("https://a", rss_feed(7, today()))
            .status("https://b", 502);
        let config = config(&[("A", "https://a"), ("B", "https://b")], 5, Mode::TopN);

        let first = assemble(&config, &fetcher, today());
        let second = assemble(&config, &fetcher, today());

        assert_eq!(first.sources, second.sources);
        assert!(second.generated_at >= first.generated_at);
    }

    #[test]
    fn serializes_with_status_tag() {
        let report = RunReport {
            sources: vec![
                SourceReport {
                    source: FeedSource::new("A", "https://a"),
                    outcome: SourceOutcome::Empty,
                },
                SourceReport {
                    source: FeedSource::new("B", "https://b"),
                    outcome: SourceOutcome::Error {
                        message: "boom".into(),
                    },
                },
            ],
            generated_at: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sources"][0]["status"], "empty");
        assert_eq!(json["sources"][0]["source"]["name"], "A");
        assert_eq!(json["sources"][1]["status"], "error");
        assert_eq!(json["sources"][1]["message"], "boom");
    }
}
