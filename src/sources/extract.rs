//! DOM helpers shared by the HTML scrapers

use scraper::{ElementRef, Selector};
use url::Url;

use crate::errors::{SourceError, SourceResult};

pub fn selector(css: &str) -> SourceResult<Selector> {
    Selector::parse(css).map_err(|e| SourceError::parse_error("selector", format!("{}: {:?}", css, e)))
}

/// Visible text of an element with whitespace collapsed
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of the first descendant matching `selector`, or an empty string
pub fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element.select(selector).next().map(text_of).unwrap_or_default()
}

/// Attribute of the first descendant matching `selector`, trimmed
pub fn first_attr(element: ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Resolve a possibly relative link against the page it was found on
pub fn absolutize(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string())
}

/// Trimmed, non-empty text nodes that are direct children of `element`
pub fn direct_text_nodes(element: ElementRef<'_>) -> Vec<String> {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Whether a pagination control is present and usable
pub fn is_enabled(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_none() && value.attr("aria-disabled") != Some("true")
}
