//! Text-level repairs applied before a feed reaches the XML parsers.
//!
//! Publisher feeds break in a few recurring ways: a non-UTF-8 encoding that
//! the parsers ignore, bare `&` in titles and URLs, and bodies cut off
//! mid-entry.  Each repair here is a no-op on a well-formed UTF-8 feed.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Prologs longer than this are not worth scanning for an encoding label.
const MAX_PROLOG: usize = 1024;

/// Decode `bytes` into UTF-8 text.
///
/// A byte-order mark wins, then the `encoding` in the XML declaration.
/// Undeclared bytes that are not valid UTF-8 are read as Windows-1252.
/// Whenever the text is transcoded, the declaration is rewritten to say
/// `UTF-8` so the parsers do not decode it a second time.
pub fn decode_to_utf8(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return if encoding == UTF_8 {
            text
        } else {
            Cow::Owned(declare_utf8(&text))
        };
    }

    // An ASCII-readable prolog cannot really be UTF-16, whatever it claims.
    let declared = declared_encoding(bytes).filter(|e| *e != UTF_16LE && *e != UTF_16BE);
    match declared {
        Some(encoding) if encoding != UTF_8 => {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            Cow::Owned(declare_utf8(&text))
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => {
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                Cow::Owned(declare_utf8(&text))
            }
        },
    }
}

fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(MAX_PROLOG)];
    let head = match std::str::from_utf8(head) {
        Ok(head) => head,
        // Cut inside a multi-byte sequence, or not UTF-8 past the prolog.
        Err(e) => std::str::from_utf8(&head[..e.valid_up_to()]).ok()?,
    };
    let prolog = &head[..prolog_end(head)?];
    let (start, end) = encoding_value_span(prolog)?;
    Encoding::for_label(prolog[start..end].trim().as_bytes())
}

/// Byte offset just past `?>` of a leading XML declaration.
fn prolog_end(text: &str) -> Option<usize> {
    if !text.starts_with("<?xml") {
        return None;
    }
    text.find("?>").map(|i| i + 2)
}

/// Span of the quoted value of `encoding=` inside a declaration.
fn encoding_value_span(prolog: &str) -> Option<(usize, usize)> {
    let key = prolog.find("encoding")? + "encoding".len();
    let after_key = &prolog[key..];
    let eq = after_key.find('=')?;
    let after_eq = &after_key[eq + 1..];
    let pad = after_eq.len() - after_eq.trim_start().len();
    let quote = after_eq[pad..].chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let start = key + eq + 1 + pad + 1;
    let len = prolog[start..].find(quote)?;
    Some((start, start + len))
}

fn declare_utf8(text: &str) -> String {
    match prolog_end(text).and_then(|end| encoding_value_span(&text[..end])) {
        Some((start, end)) => format!("{}UTF-8{}", &text[..start], &text[end..]),
        None => text.to_string(),
    }
}

/// Rewrite every `&` that does not start an entity or character reference
/// to `&amp;`.  CDATA sections and comments are copied untouched.
///
/// Returns `Cow::Borrowed` when nothing needed repairing.
pub fn escape_bare_ampersands(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut changed = false;
    let mut rest = text;

    while let Some(i) = rest.find(['&', '<']) {
        out.push_str(&rest[..i]);
        rest = &rest[i..];

        if let Some(skip) = verbatim_len(rest, "<![CDATA[", "]]>")
            .or_else(|| verbatim_len(rest, "<!--", "-->"))
        {
            out.push_str(&rest[..skip]);
            rest = &rest[skip..];
        } else if rest.starts_with('&') {
            if starts_with_reference(rest) {
                out.push('&');
            } else {
                out.push_str("&amp;");
                changed = true;
            }
            rest = &rest[1..];
        } else {
            out.push('<');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

/// Length of a `open ... close` section at the start of `text`, running to
/// the end of the text when `close` is missing.
fn verbatim_len(text: &str, open: &str, close: &str) -> Option<usize> {
    if !text.starts_with(open) {
        return None;
    }
    Some(
        text[open.len()..]
            .find(close)
            .map_or(text.len(), |i| open.len() + i + close.len()),
    )
}

/// `&name;`, `&#123;` or `&#x1F;` at the start of `text`.
fn starts_with_reference(text: &str) -> bool {
    let body = &text[1..];
    let Some(end) = body.find(';') else {
        return false;
    };
    let reference = &body[..end];

    if let Some(hex) = reference
        .strip_prefix("#x")
        .or_else(|| reference.strip_prefix("#X"))
    {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(dec) = reference.strip_prefix('#') {
        return !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit());
    }

    let mut chars = reference.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Whether the document stops before its root element is closed.
///
/// JSON feeds and empty bodies are never reported as truncated.
pub fn is_truncated(text: &str) -> bool {
    let text = text.trim_end();
    if text.is_empty() || text.trim_start().starts_with('{') {
        return false;
    }
    let Some(open) = text.rfind("</") else {
        return true;
    };
    let Some(name) = text[open + 2..].strip_suffix('>') else {
        return true;
    };
    let local = name.trim().rsplit(':').next().unwrap_or_default();
    !matches!(local, "rss" | "feed" | "RDF")
}

/// Cut a truncated document after its last complete entry and close the
/// root, so the complete entries can still be read.
pub fn close_truncated(text: &str) -> Option<String> {
    let (cut, closing) = if let Some(i) = text.rfind("</entry>") {
        (i + "</entry>".len(), "</feed>")
    } else if let Some(i) = text.rfind("</item>") {
        let closing = if text.contains("<rdf:RDF") {
            "</rdf:RDF>"
        } else {
            "</channel></rss>"
        };
        (i + "</item>".len(), closing)
    } else {
        return None;
    };
    Some(format!("{}{closing}", &text[..cut]))
}
