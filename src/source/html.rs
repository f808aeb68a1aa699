//! Extraction of notices from the notice-board listing page.
//!
//! The listing is a table. Each notice occupies a `<td class="list-data-focus">` cell
//! holding a link (whose text is the title) followed by a bold "Published By" line.
//! The upload date sits in the cell just before it:
//!
//! ```text
//! <td><font>15-01-2024</font></td>
//! <td class="list-data-focus">
//!   <a href="https://.../notice.pdf"><font>TITLE</font></a><br>
//!   <font><b>Published By: Examination Branch</b></font>
//! </td>
//! ```
//!
//! Scanning is local to each cell and tolerant of attribute order, quoting, case and
//! whitespace. Rows are returned in page order, which is newest first.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Url;

use super::SourceError;
use crate::types::Notice;

const ROW_MARKER: &str = "list-data-focus";

static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b([^>]*)>(.*?)</td\s*>").unwrap());
static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());
static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});
static FONT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<font\b[^>]*>(.*?)</font\s*>").unwrap());
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<b\b[^>]*>(.*?)</b\s*>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}-\d{1,2}-\d{4})\b").unwrap());
static PUBLISHED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^published\s*by\s*:?\s*").unwrap());

/// Parses the listing page into notices, newest first.
///
/// Relative links are resolved against `base`. Fails if the page has no notice rows
/// or a row has no title, since either means the page layout changed.
pub fn parse_listing(html: &str, base: &Url) -> Result<Vec<Notice>, SourceError> {
    let mut notices = Vec::new();
    let mut saw_marker = false;
    let mut previous_cell: Option<&str> = None;

    for cell in CELL.captures_iter(html) {
        let attrs = cell.get(1).map_or("", |m| m.as_str());
        let body = cell.get(2).map_or("", |m| m.as_str());

        if has_class(attrs, ROW_MARKER) {
            saw_marker = true;
            let mut notice = parse_row(body, base)?;
            if let Some(date) = previous_cell.and_then(parse_date) {
                notice = notice.with_published_on(date);
            }
            notices.push(notice);
        }
        previous_cell = Some(body);
    }

    if !saw_marker {
        return Err(SourceError::Parse(format!(
            "no notice rows (td.{}) found",
            ROW_MARKER
        )));
    }
    Ok(notices)
}

fn parse_row(body: &str, base: &Url) -> Result<Notice, SourceError> {
    let anchor = ANCHOR.captures(body);

    let title_html = match &anchor {
        Some(a) => a.get(2).map_or("", |m| m.as_str()),
        None => FONT
            .captures(body)
            .and_then(|f| f.get(1))
            .map_or(body, |m| m.as_str()),
    };
    let title = text_content(title_html);
    if title.is_empty() {
        return Err(SourceError::Parse("notice row without a title".to_string()));
    }

    let url = anchor
        .as_ref()
        .and_then(|a| a.get(1))
        .and_then(|attrs| attribute(&HREF_ATTR, attrs.as_str()))
        .and_then(|href| resolve(base, &decode_entities(&href)));

    let publisher = BOLD
        .captures(body)
        .and_then(|b| b.get(1))
        .map(|m| strip_published_by(&text_content(m.as_str())))
        .unwrap_or_default();

    Ok(Notice::new(title, url, publisher))
}

fn strip_published_by(text: &str) -> String {
    PUBLISHED_BY.replace(text, "").into_owned()
}

fn has_class(attrs: &str, class: &str) -> bool {
    attribute(&CLASS_ATTR, attrs)
        .is_some_and(|value| value.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
}

/// Extracts a quoted or bare attribute value using one of the attribute patterns.
fn attribute(pattern: &Regex, attrs: &str) -> Option<String> {
    let caps = pattern.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string())
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    let text = text_content(cell);
    let raw = DATE.captures(&text)?.get(1)?.as_str().to_string();
    NaiveDate::parse_from_str(&raw, "%d-%m-%Y").ok()
}

/// Strips tags, decodes entities and collapses whitespace.
pub fn text_content(html: &str) -> String {
    let stripped = TAG.replace_all(html, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the named entities the board uses plus numeric character references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&end| end <= 10) {
            Some(end) => {
                let entity = &tail[1..end];
                match decode_entity(entity) {
                    Some(c) => out.push(c),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
