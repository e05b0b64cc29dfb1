use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Ordered list of candidate CSS selectors for one field.
///
/// Analytics pages change their markup often, so every field is looked up
/// through several selectors and the first one that matches wins.
pub struct SelectorChain {
    field: &'static str,
    candidates: Vec<(String, Selector)>,
}

impl SelectorChain {
    pub fn new(field: &'static str, candidates: &[&str]) -> Self {
        let candidates = candidates
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some((raw.to_string(), selector)),
                Err(e) => {
                    warn!("Skipping invalid selector '{}' for {}: {}", raw, field, e);
                    None
                }
            })
            .collect();

        Self { field, candidates }
    }

    /// First element matched by the first selector that matches anything.
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        for (raw, selector) in &self.candidates {
            if let Some(element) = scope.select(selector).next() {
                debug!("{}: matched '{}'", self.field, raw);
                return Some(element);
            }
        }
        debug!("{}: no selector matched", self.field);
        None
    }

    /// Every element matched by the first selector that matches anything.
    pub fn all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for (raw, selector) in &self.candidates {
            let matches: Vec<_> = scope.select(selector).collect();
            if !matches.is_empty() {
                debug!("{}: '{}' matched {} elements", self.field, raw, matches.len());
                return matches;
            }
        }
        debug!("{}: no selector matched", self.field);
        Vec::new()
    }

    /// Normalised text of the first match; empty text counts as absent.
    pub fn text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.first(scope)
            .map(element_text)
            .filter(|text| !text.is_empty())
    }

    /// Attribute of the first match; empty values count as absent.
    pub fn attr(&self, scope: ElementRef<'_>, name: &str) -> Option<String> {
        self.first(scope)
            .and_then(|el| el.value().attr(name))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Text content with runs of whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Integer from the first run of digits, or 0 when there is none.
pub fn parse_leading_number(text: &str) -> u32 {
    DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Text of the `index`-th `td` cell of a table row.
pub fn cell_text(row: ElementRef<'_>, cells: &Selector, index: usize) -> Option<String> {
    row.select(cells)
        .nth(index)
        .map(element_text)
        .filter(|text| !text.is_empty())
}
