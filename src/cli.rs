//! Command-line interface.
//!
//! Flags override the config file, which overrides the built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, Mode};
use crate::render::Format;

/// Render the latest articles from a set of journal feeds into one page.
///
/// ```sh
/// # Built-in journal list, writes ./index.html
/// journal-digest
///
/// # Only today's articles, custom list, JSON output
/// journal-digest --config journals.yaml --same-day --format json -o today.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "JOURNAL_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where to write the digest (overrides the config file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Articles per journal (overrides the config file)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Only include articles published today (UTC)
    #[arg(long)]
    pub same_day: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    pub format: Format,
}

impl Cli {
    /// Layer the flags over `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(limit) = self.limit {
            config.article_limit = limit;
        }
        if self.same_day {
            config.mode = Mode::SameDay;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_alone() {
        let cli = Cli::parse_from(["journal-digest"]);
        assert_eq!(cli.format, Format::Html);

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "journal-digest",
            "-o",
            "/tmp/digest.json",
            "--limit",
            "10",
            "--same-day",
            "--format",
            "json",
        ]);
        assert_eq!(cli.format, Format::Json);

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.output, PathBuf::from("/tmp/digest.json"));
        assert_eq!(config.article_limit, 10);
        assert_eq!(config.mode, Mode::SameDay);
    }

    #[test]
    fn limit_flag_repairs_an_invalid_file_value() {
        let path = crate::config::tests::write_scratch_yaml("cli-limit", "article_limit: 0\n");
        let cli = Cli::parse_from(["journal-digest", "--limit", "5"]);

        let mut config = Config::load(Some(&path)).unwrap();
        cli.apply(&mut config);
        config.validate().unwrap();
        assert_eq!(config.article_limit, 5);
    }
}
