//! journal-digest: a "latest articles" page for a fixed set of journals.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  FeedSource  ┌──────────────┐  bytes  ┌──────────┐
//! │  config  │ ───────────► │ source/fetch │ ──────► │  parse   │
//! └──────────┘              └──────────────┘         └──────────┘
//!                                                          │ ArticleRecord
//!                                                          ▼
//! ┌──────────┐   String     ┌──────────────┐ outcome ┌──────────┐
//! │  output  │ ◄─────────── │    render    │ ◄────── │  filter  │
//! └──────────┘              └──────────────┘  report └──────────┘
//! ```
//!
//! * **`config`**: the immutable run configuration and source registry.
//! * **`source/`**: `FeedSource`, the `Fetch` seam, the HTTP fetcher and
//!   the feed parser/normaliser.
//! * **`filter`**: top-N / same-day selection.
//! * **`report`**: runs every source in registry order and records
//!   `Ok` / `Empty` / `Error` per source.
//! * **`render`**: HTML (or JSON) for a finished report.
//! * **`output`**: overwrites the destination file.
//! * **`main`**: wires everything together.

mod cli;
mod config;
mod error;
mod filter;
mod output;
mod render;
mod report;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use source::HttpFetcher;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // -- configuration -------------------------------------------------------
    let args = Cli::parse();
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    info!(
        journals = config.journals.len(),
        mode = ?config.mode,
        limit = config.article_limit,
        "journal-digest starting"
    );

    // -- fetch, parse, select ------------------------------------------------
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let today = Utc::now().date_naive();
    let report = report::assemble(&config, &fetcher, today);

    // -- render and persist --------------------------------------------------
    let rendered = render::render(&report, &config, args.format).context("rendering digest")?;
    if let Err(e) = output::write_atomic(&config.output, rendered.as_bytes()) {
        error!(error = %e, "could not write digest");
        return Err(e.into());
    }

    info!(path = %config.output.display(), "digest written");
    Ok(())
}
