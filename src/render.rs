//! Turning a [`RunReport`] into the published document.
//!
//! This is the only place text is HTML-escaped.  Article titles arrive
//! entity-decoded from [`ArticleRecord::new`] and are escaped exactly once
//! here.

use chrono::{DateTime, FixedOffset, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::Config;
use crate::report::{RunReport, SourceOutcome};
use crate::source::ArticleRecord;

/// Shown when an article has no author metadata.
pub const NO_AUTHOR: &str = "no author info";

/// Authors listed before the rest are folded into "et al.".
const MAX_LISTED_AUTHORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Html,
    Json,
}

pub fn render(
    report: &RunReport,
    config: &Config,
    format: Format,
) -> Result<String, serde_json::Error> {
    match format {
        Format::Html => Ok(render_html(report, config)),
        Format::Json => serde_json::to_string_pretty(report),
    }
}

/// `A, B, C, et al.` for long lists, `A, B` for short ones, [`NO_AUTHOR`]
/// for none.
pub fn format_authors(authors: &[String]) -> String {
    match authors.len() {
        0 => NO_AUTHOR.to_string(),
        n if n > MAX_LISTED_AUTHORS => {
            format!("{}, et al.", authors[..MAX_LISTED_AUTHORS].join(", "))
        }
        _ => authors.join(", "),
    }
}

const STYLE: &str = r#"
      body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif; line-height: 1.6; margin: 20px; background-color: #f9f9f9; color: #333; }
      .container { max-width: 800px; margin: auto; background: #fff; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
      h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
      h2 { color: #34495e; margin-top: 40px; border-left: 5px solid #3498db; padding-left: 10px; }
      ul { list-style-type: none; padding-left: 0; }
      li { background: #ecf0f1; margin-bottom: 10px; padding: 15px; border-radius: 5px; }
      a { color: #2980b9; text-decoration: none; font-weight: bold; }
      a:hover { text-decoration: underline; }
      .meta { color: #7f8c8d; font-size: 0.9em; }
      .placeholder { color: #7f8c8d; }
      .error { color: #c0392b; }
      .update-time { text-align: right; color: #7f8c8d; font-size: 0.9em; }
"#;

pub fn render_html(report: &RunReport, config: &Config) -> String {
    let offset = config.display.offset();
    let title = encode_text(&config.title);
    let lang = encode_double_quoted_attribute(&config.lang);

    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n  \
         <title>{title}</title>\n  <style>{STYLE}  </style>\n</head>\n<body>\n\
         <div class=\"container\">\n<h1>{title}</h1>\n"
    );

    for source in &report.sources {
        html.push_str(&format!(
            "<h2>{}</h2>\n<ul>\n",
            encode_text(&source.source.name)
        ));
        match &source.outcome {
            SourceOutcome::Ok { articles } => {
                for article in articles {
                    html.push_str(&render_article(article, offset));
                }
            }
            SourceOutcome::Empty => {
                html.push_str("<li class=\"placeholder\">No new articles.</li>\n");
            }
            SourceOutcome::Error { message } => html.push_str(&format!(
                "<li class=\"error\">Could not fetch articles: {}</li>\n",
                encode_text(message)
            )),
        }
        html.push_str("</ul>\n");
    }

    html.push_str(&format!(
        "<p class=\"update-time\">Last updated: {} {}</p>\n</div>\n</body>\n</html>\n",
        local_time(report.generated_at, offset).format("%Y-%m-%d %H:%M:%S"),
        encode_text(&config.display.zone_label),
    ));
    html
}

fn render_article(article: &ArticleRecord, offset: FixedOffset) -> String {
    let date = article
        .published_at
        .map(|ts| local_time(ts, offset).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "no date".into());

    format!(
        "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>\
         <div class=\"meta\">{} | {}</div></li>\n",
        encode_double_quoted_attribute(&article.link),
        encode_text(&article.title),
        date,
        encode_text(&format_authors(&article.authors)),
    )
}

fn local_time(ts: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    ts.with_timezone(&offset)
}
