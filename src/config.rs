//! Run configuration.
//!
//! A [`Config`] is built once at startup (built-in defaults, optionally
//! overridden by a YAML file and then by CLI flags) and handed to the
//! pipeline by reference.  Nothing in the pipeline reads global state.
//!
//! ```yaml
//! article_limit: 10
//! mode: same_day
//! fetch:
//!   timeout_secs: 15
//!   max_retries: 1
//! journals:
//!   - name: Veterinary Quarterly
//!     url: https://www.tandfonline.com/action/showFeed?jc=tveq20&type=rss
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::Selection;
use crate::source::FeedSource;

/// Journals polled when no config file supplies its own list.
const DEFAULT_JOURNALS: &[(&str, &str)] = &[
    (
        "Veterinary Quarterly",
        "https://www.tandfonline.com/action/showFeed?jc=tveq20&type=rss",
    ),
    (
        "Journal of Veterinary Internal Medicine (JVIM)",
        "https://onlinelibrary.wiley.com/feed/19391676/most-recent",
    ),
    (
        "Journal of Small Animal Practice",
        "https://onlinelibrary.wiley.com/feed/17485827/most-recent",
    ),
    (
        "Journal of Feline Medicine and Surgery (JFMS)",
        "https://journals.sagepub.com/action/showFeed?type=etoc&feed=rss&jc=jfm",
    ),
    (
        "American Journal of Veterinary Research (AJVR)",
        "https://avmajournals.avma.org/view/journals/ajvr/ajvr-overview.xml",
    ),
    (
        "Journal of Veterinary Medical Science (JVMS)",
        "https://www.jstage.jst.go.jp/AF05S010NewRssDld?btnaction=JT0041&sryCd=jvms&rssLang=en",
    ),
];

// Some publisher platforms reject non-browser clients outright.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// How articles are selected per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// First `article_limit` entries in feed order.
    TopN,
    /// Only entries published on the current UTC date.
    SameDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    /// Total attempts per feed, including the first one.
    pub max_retries: u32,
    pub user_agent: String,
    /// Skip TLS certificate verification.
    pub insecure_tls: bool,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            insecure_tls: false,
        }
    }
}

/// Presentation-time zone.  Timestamps stay UTC until rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub utc_offset_hours: i32,
    pub zone_label: String,
}

impl DisplaySettings {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            zone_label: "JST".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page heading of the rendered digest.
    pub title: String,
    /// `lang` attribute of the rendered page.
    pub lang: String,
    /// Source registry.  Order is the order sources appear in the report.
    pub journals: Vec<FeedSource>,
    pub article_limit: usize,
    pub mode: Mode,
    /// In same-day mode, also cap each source to `article_limit`.
    pub same_day_cap: bool,
    pub fetch: FetchSettings,
    pub display: DisplaySettings,
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Latest Veterinary Journal Articles".to_string(),
            lang: "en".to_string(),
            journals: DEFAULT_JOURNALS
                .iter()
                .map(|(name, url)| FeedSource::new(*name, *url))
                .collect(),
            article_limit: 5,
            mode: Mode::TopN,
            same_day_cap: true,
            fetch: FetchSettings::default(),
            display: DisplaySettings::default(),
            output: PathBuf::from("index.html"),
        }
    }
}

impl Config {
    /// Defaults when `path` is `None`, otherwise the YAML file layered over
    /// the defaults.
    ///
    /// Not validated: CLI flags may still override fields, so callers run
    /// [`validate`](Self::validate) once the final values are in place.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.journals.is_empty() {
            return Err(invalid("at least one journal is required"));
        }
        let mut seen = HashSet::new();
        for journal in &self.journals {
            if journal.name.trim().is_empty() {
                return Err(invalid(format!(
                    "journal with url {} has a blank name",
                    journal.url
                )));
            }
            if !(journal.url.starts_with("http://") || journal.url.starts_with("https://")) {
                return Err(invalid(format!(
                    "journal {:?} has a non-http url {:?}",
                    journal.name, journal.url
                )));
            }
            if !seen.insert(journal.name.as_str()) {
                return Err(invalid(format!("journal {:?} is listed twice", journal.name)));
            }
        }
        if self.article_limit == 0 {
            return Err(invalid("article_limit must be at least 1"));
        }
        if self.fetch.max_retries == 0 {
            return Err(invalid("fetch.max_retries must be at least 1"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(invalid("fetch.timeout_secs must be at least 1"));
        }
        if self.lang.trim().is_empty() {
            return Err(invalid("lang must not be blank"));
        }
        if self.display.utc_offset_hours.abs() > 23 {
            return Err(invalid("display.utc_offset_hours must be within -23..=23"));
        }
        Ok(())
    }

    pub fn selection(&self) -> Selection {
        match self.mode {
            Mode::TopN => Selection::TopN {
                limit: self.article_limit,
            },
            Mode::SameDay => Selection::SameDay {
                limit: self.same_day_cap.then_some(self.article_limit),
            },
        }
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
