//! Filter chains and HTML escaping.
//!
//! A filter chain is a `|`-separated list of filter names, applied left to
//! right: `"trim|upper"`. Every name is looked up among the built-in filters
//! first and then in the [`FilterRegistry`]; an unknown name fails the whole
//! chain with [`TemplateError::UnknownFilter`].
//!
//! [`escape`] runs a chain and then HTML-escapes the result. [`batch`] runs a
//! chain and leaves the value as the last filter returned it.
//!
//! # Built-in filters
//!
//! | Name | Effect |
//! |------|--------|
//! | `escape`, `e` | HTML-escape |
//! | `upper`, `lower` | Change case |
//! | `trim` | Strip surrounding whitespace |
//! | `ucfirst` | Uppercase the first character |
//! | `nl2br` | Insert `<br />` before every newline |
//! | `strip_tags` | Remove anything between `<` and `>` |
//! | `slug` | ASCII, lowercase, dash-separated (`"Ça va?"` → `"ca-va"`) |
//! | `json` | Serialize the value as JSON |
//!
//! # Escape policy
//!
//! The policy is fixed: `&`, `<`, `>`, `"` and `'` are replaced with
//! `&amp;`, `&lt;`, `&gt;`, `&quot;` and `&#039;`. Input is always UTF-8;
//! [`escape_bytes`] replaces invalid sequences with U+FFFD first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::TemplateError;
use crate::value::display;

/// Separator between names in a filter chain.
pub const CHAIN_SEPARATOR: char = '|';

/// A filter callable.
pub type FilterFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Externally registered filters, keyed by name.
///
/// Built-in filters take precedence over registered ones with the same name.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a filter, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    pub fn get(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Applies one filter by name.
    pub fn apply(&self, name: &str, value: Value) -> Result<Value, TemplateError> {
        if let Some(result) = builtin(name, &value) {
            return Ok(result);
        }
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| TemplateError::UnknownFilter(name.to_string()))?;
        filter(value).map_err(|message| TemplateError::Filter {
            name: name.to_string(),
            message,
        })
    }

    /// Applies every filter in `chain`, left to right.
    ///
    /// Names are taken verbatim: `"a||b"`, `" a"` and `""` all name filters
    /// that do not exist.
    pub fn apply_chain(&self, chain: &str, value: Value) -> Result<Value, TemplateError> {
        chain
            .split(CHAIN_SEPARATOR)
            .try_fold(value, |value, name| self.apply(name, value))
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

fn builtin(name: &str, value: &Value) -> Option<Value> {
    let text = || display(value);
    let result = match name {
        "escape" | "e" => html_escape(&text()),
        "upper" => text().to_uppercase(),
        "lower" => text().to_lowercase(),
        "trim" => text().trim().to_string(),
        "ucfirst" => ucfirst(&text()),
        "nl2br" => text().replace('\n', "<br />\n"),
        "strip_tags" => strip_tags(&text()),
        "slug" => slug(&text()),
        "json" => value.to_string(),
        _ => return None,
    };
    Some(Value::String(result))
}

fn ucfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn slug(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut out = String::with_capacity(ascii.len());
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// HTML-escapes text with the fixed policy.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// HTML-escapes raw bytes, replacing invalid UTF-8 with U+FFFD.
pub fn escape_bytes(bytes: &[u8]) -> String {
    html_escape(&String::from_utf8_lossy(bytes))
}

/// Runs `chain` over `value`, then HTML-escapes the displayed result.
///
/// `None` and `Some("")` skip the chain.
pub fn escape(
    registry: &FilterRegistry,
    value: Value,
    chain: Option<&str>,
) -> Result<String, TemplateError> {
    let value = match chain {
        Some(chain) if !chain.is_empty() => registry.apply_chain(chain, value)?,
        _ => value,
    };
    Ok(html_escape(&display(&value)))
}

/// Runs `chain` over `value` without escaping.
pub fn batch(registry: &FilterRegistry, value: Value, chain: &str) -> Result<Value, TemplateError> {
    registry.apply_chain(chain, value)
}
