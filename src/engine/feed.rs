//! RSS item extraction.
//!
//! Deal feeds are plain RSS 2.0: a list of `<item>` elements with
//! `title`, `link` and an HTML `description`. We only need those three
//! fields, so this walks the document text directly rather than building
//! a full XML tree.

use crate::llm::parse_price;
use crate::types::ScrapedDeal;

/// Extract up to `limit` items from an RSS document.
/// Items without a link are skipped.
pub fn parse_items(xml: &str, limit: usize) -> Vec<ScrapedDeal> {
    let mut items = Vec::new();
    let mut rest = xml;

    while items.len() < limit {
        let Some(start) = find_open_tag(rest, "item") else { break };
        let body = &rest[start..];
        let Some(end) = body.find("</item>") else { break };
        let block = &body[..end];
        rest = &body[end + "</item>".len()..];

        let url = tag_text(block, "link").unwrap_or_default();
        if url.is_empty() {
            continue;
        }
        let title = tag_text(block, "title").unwrap_or_default();
        let summary = tag_text(block, "description")
            .or_else(|| tag_text(block, "summary"))
            .unwrap_or_default();

        items.push(ScrapedDeal { title, summary, url });
    }

    items
}

/// Byte offset just past the `>` of the first `<name>` or `<name ...>` tag.
fn find_open_tag(text: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut from = 0;
    while let Some(pos) = text[from..].find(&needle) {
        let after = from + pos + needle.len();
        match text[after..].chars().next() {
            Some('>') => return Some(after + 1),
            Some(c) if c.is_whitespace() => {
                let close = text[after..].find('>')?;
                return Some(after + close + 1);
            }
            _ => from = after,
        }
    }
    None
}

/// Cleaned text content of the first `<name>` element in `block`.
fn tag_text(block: &str, name: &str) -> Option<String> {
    let start = find_open_tag(block, name)?;
    let end = block[start..].find(&format!("</{name}>"))?;
    let raw = unwrap_cdata(block[start..start + end].trim());
    Some(clean_text(raw))
}

fn unwrap_cdata(text: &str) -> &str {
    text.strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text)
}

/// Decode entities, drop markup and collapse whitespace.
///
/// Feed descriptions are escaped HTML, so entities are decoded once to
/// expose the markup and once more for the text inside it.
pub fn clean_text(text: &str) -> String {
    let markup = decode_entities(text);
    let stripped = decode_entities(&strip_tags(&markup));
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| Some((decode_entity(&rest[1..semi])?, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// A named entity or a `#NNN` / `#xHH` character reference, without the
/// surrounding `&` and `;`.
fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// First `$`-prefixed amount in the text, e.g. `"$249.99 at Amazon"`.
/// Amounts written as "$50 off" are discounts, not prices, and are skipped.
pub fn extract_offer_price(text: &str) -> Option<f64> {
    for (idx, _) in text.match_indices('$') {
        let after = &text[idx + 1..];
        if !after.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let amount_len = after
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
            .unwrap_or(after.len());
        if after[amount_len..].trim_start().to_lowercase().starts_with("off") {
            continue;
        }
        if let Some(price) = parse_price(&after[..amount_len]) {
            if price > 0.0 {
                return Some(price);
            }
        }
    }
    None
}
