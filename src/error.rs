//! Error taxonomy for the digest pipeline.
//!
//! Per-source failures ([`FetchError`], [`EntryError`]) never abort a run;
//! they are folded into the source's outcome by [`crate::report`].  Only
//! [`ConfigError`] and [`WriteError`] reach the process boundary.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to retrieve a feed body.  Every variant is a network-kind failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    /// Timeout, refused connection, or a broken body.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-2xx status.
    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
    /// Every attempt failed; carries the last failure.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// A single feed entry that could not be turned into an article.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry has neither a title nor a link")]
    Blank,
}

/// Failure to persist the rendered report.  Fatal for the run.
#[derive(Debug, Error)]
#[error("could not write {}: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_includes_last_failure() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(FetchError::Status {
                url: "https://example.com/feed".into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt"));
        assert!(msg.contains("500"));
        assert!(msg.contains("https://example.com/feed"));
    }
}
