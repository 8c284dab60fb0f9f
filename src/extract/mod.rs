//! Extraction of data embedded in fetched pages.
//!
//! Both target sites ship their listing data inside the page rather than in
//! a clean API: a `<script>` tag holding a JSON document, a JavaScript
//! state assignment, or plain element attributes. These helpers pull that
//! data out of a [`FetchResponse`](crate::fetcher::FetchResponse) body and
//! report anything missing as a `Parse` error naming the selector.

use scraper::{Html, Selector};

use crate::app::{GleanerError, Result};

/// Parse the JSON document inside the first element matching `selector`
/// (typically `script#__NEXT_DATA__`). Trailing non-JSON content after the
/// document is tolerated.
pub fn script_json(html: &Html, selector: &str) -> Result<serde_json::Value> {
    let sel = parse_selector(selector)?;
    let element = html
        .select(&sel)
        .next()
        .ok_or_else(|| GleanerError::Parse(format!("no element matches {selector:?}")))?;
    let text: String = element.text().collect();
    first_json_value(&text)
        .ok_or_else(|| GleanerError::Parse(format!("element {selector:?} holds no JSON document")))
}

/// Parse a `window.NAME = {...}` style assignment out of the page's inline
/// scripts. `marker` is the assigned name, e.g. `__INITIAL_STATE__`.
pub fn state_json(body: &str, marker: &str) -> Result<serde_json::Value> {
    let position = body
        .find(marker)
        .ok_or_else(|| GleanerError::Parse(format!("marker {marker:?} not found in page")))?;
    let after = &body[position + marker.len()..];
    let assigned = after
        .find('=')
        .map(|eq| &after[eq + 1..])
        .ok_or_else(|| GleanerError::Parse(format!("marker {marker:?} is not an assignment")))?;
    first_json_value(assigned)
        .ok_or_else(|| GleanerError::Parse(format!("no JSON document after {marker:?}")))
}

/// Look up an attribute on the first element matching `selector`,
/// HTML-entity decoded. Missing element or attribute yields `None`.
pub fn attr(html: &Html, selector: &str, name: &str) -> Result<Option<String>> {
    let sel = parse_selector(selector)?;
    Ok(html
        .select(&sel)
        .next()
        .and_then(|element| element.value().attr(name))
        .map(|value| html_escape::decode_html_entities(value).to_string()))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| GleanerError::Parse(format!("bad selector {selector:?}: {e}")))
}

/// First JSON value in `text`, ignoring leading whitespace and anything
/// after the value (`;`, closing script tags).
fn first_json_value(text: &str) -> Option<serde_json::Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<serde_json::Value>()
        .next()
        .and_then(|parsed| parsed.ok())
}
