//! Named sections and the capture state machine.
//!
//! A template fills a section by opening a capture, emitting output, and
//! closing it again:
//!
//! ```text
//! {% start("scripts") %}<script src="app.js"></script>{% stop() %}
//! ```
//!
//! While a capture is open, output written through [`SectionStore::write`]
//! lands in the capture buffer instead of the template's output. Closing the
//! capture combines the buffer with whatever the section already holds,
//! according to the [`CaptureMode`] it was opened with.
//!
//! Only one capture can be open at a time. The name `content` is reserved for
//! the body a layout wraps and can never be captured.

use std::collections::HashMap;

use crate::error::TemplateError;

/// Section that holds the rendered body inside a layout.
pub const CONTENT_SECTION: &str = "content";

/// How captured text combines with what a section already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Replace,
    Append,
    Prepend,
}

impl CaptureMode {
    fn combine(self, prior: Option<String>, captured: String) -> String {
        match (self, prior) {
            (CaptureMode::Replace, _) | (_, None) => captured,
            (CaptureMode::Append, Some(mut prior)) => {
                prior.push_str(&captured);
                prior
            }
            (CaptureMode::Prepend, Some(prior)) => captured + &prior,
        }
    }
}

#[derive(Debug)]
struct Capture {
    name: String,
    mode: CaptureMode,
    buffer: String,
}

/// Finalized sections plus the (at most one) open capture.
#[derive(Debug, Default)]
pub struct SectionStore {
    sections: HashMap<String, String>,
    active: Option<Capture>,
}

impl SectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store for a layout pass, holding the wrapped body as `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        let mut store = Self::new();
        store
            .sections
            .insert(CONTENT_SECTION.to_string(), content.into());
        store
    }

    /// Opens a capture that replaces the section on [`stop`](Self::stop).
    pub fn start(&mut self, name: &str) -> Result<(), TemplateError> {
        self.open(name, CaptureMode::Replace)
    }

    /// Opens a capture whose text goes after the existing section content.
    pub fn append(&mut self, name: &str) -> Result<(), TemplateError> {
        self.open(name, CaptureMode::Append)
    }

    /// Opens a capture whose text goes before the existing section content.
    pub fn prepend(&mut self, name: &str) -> Result<(), TemplateError> {
        self.open(name, CaptureMode::Prepend)
    }

    pub fn open(&mut self, name: &str, mode: CaptureMode) -> Result<(), TemplateError> {
        if name == CONTENT_SECTION {
            return Err(TemplateError::ReservedSectionName);
        }
        if let Some(active) = &self.active {
            return Err(TemplateError::NestedCapture {
                active: active.name.clone(),
                requested: name.to_string(),
            });
        }
        tracing::trace!(section = name, mode = ?mode, "capture opened");
        self.active = Some(Capture {
            name: name.to_string(),
            mode,
            buffer: String::new(),
        });
        Ok(())
    }

    /// Closes the open capture and stores the combined text.
    ///
    /// The buffer is drained exactly once; the store is idle afterwards.
    pub fn stop(&mut self) -> Result<(), TemplateError> {
        let Capture { name, mode, buffer } =
            self.active.take().ok_or(TemplateError::NoActiveCapture)?;
        let prior = self.sections.remove(&name);
        let combined = mode.combine(prior, buffer);
        tracing::trace!(section = %name, mode = ?mode, len = combined.len(), "capture closed");
        self.sections.insert(name, combined);
        Ok(())
    }

    /// Adds text to the open capture.
    ///
    /// Returns the text back when nothing is capturing so the caller can
    /// write it to its own output.
    pub fn write<'a>(&mut self, text: &'a str) -> Option<&'a str> {
        match &mut self.active {
            Some(capture) => {
                capture.buffer.push_str(text);
                None
            }
            None => Some(text),
        }
    }

    /// Looks up a finalized section.
    pub fn read(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }

    /// Looks up a section, falling back to `default`.
    pub fn read_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.read(name).unwrap_or(default)
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Name of the open capture, if any.
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|c| c.name.as_str())
    }

    /// Finalized sections other than `content`.
    pub fn into_sections(self) -> HashMap<String, String> {
        let mut sections = self.sections;
        sections.remove(CONTENT_SECTION);
        sections
    }

    /// Layout store seeded with `content` and the given finalized sections.
    pub fn inherit(content: impl Into<String>, sections: HashMap<String, String>) -> Self {
        let mut store = Self {
            sections,
            active: None,
        };
        store
            .sections
            .insert(CONTENT_SECTION.to_string(), content.into());
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(store: &mut SectionStore, text: &str) {
        assert!(store.write(text).is_none(), "expected an open capture");
    }

    #[test]
    fn test_content_is_reserved() {
        let mut store = SectionStore::new();
        assert!(matches!(
            store.start("content"),
            Err(TemplateError::ReservedSectionName)
        ));
        assert!(matches!(
            store.append("content"),
            Err(TemplateError::ReservedSectionName)
        ));
        assert!(!store.is_capturing());
    }

    #[test]
    fn test_nested_capture_rejected() {
        let mut store = SectionStore::new();
        store.start("x").unwrap();
        match store.start("y") {
            Err(TemplateError::NestedCapture { active, requested }) => {
                assert_eq!(active, "x");
                assert_eq!(requested, "y");
            }
            other => panic!("expected NestedCapture, got {:?}", other),
        }
        assert_eq!(store.active_name(), Some("x"));
    }

    #[test]
    fn test_same_name_is_still_nested() {
        let mut store = SectionStore::new();
        store.start("s").unwrap();
        for result in [store.start("s"), store.append("s"), store.prepend("s")] {
            match result {
                Err(TemplateError::NestedCapture { active, requested }) => {
                    assert_eq!(active, "s");
                    assert_eq!(requested, "s");
                }
                other => panic!("expected NestedCapture, got {:?}", other),
            }
        }
        capture(&mut store, "kept");
        store.stop().unwrap();
        assert_eq!(store.read("s"), Some("kept"));
    }

    #[test]
    fn test_stop_without_start() {
        let mut store = SectionStore::new();
        assert!(matches!(store.stop(), Err(TemplateError::NoActiveCapture)));
    }

    #[test]
    fn test_replace() {
        let mut store = SectionStore::new();
        store.start("title").unwrap();
        capture(&mut store, "First");
        store.stop().unwrap();
        store.start("title").unwrap();
        capture(&mut store, "Second");
        store.stop().unwrap();
        assert_eq!(store.read("title"), Some("Second"));
    }

    #[test]
    fn test_append_and_prepend() {
        let mut store = SectionStore::new();
        store.start("s").unwrap();
        capture(&mut store, "A");
        store.stop().unwrap();
        store.append("s").unwrap();
        capture(&mut store, "B");
        store.stop().unwrap();
        assert_eq!(store.read("s"), Some("AB"));

        let mut store = SectionStore::new();
        store.start("s").unwrap();
        capture(&mut store, "A");
        store.stop().unwrap();
        store.prepend("s").unwrap();
        capture(&mut store, "B");
        store.stop().unwrap();
        assert_eq!(store.read("s"), Some("BA"));
    }

    #[test]
    fn test_append_without_prior_acts_as_replace() {
        let mut store = SectionStore::new();
        store.prepend("s").unwrap();
        capture(&mut store, "only");
        store.stop().unwrap();
        assert_eq!(store.read("s"), Some("only"));
    }

    #[test]
    fn test_stop_drains_once() {
        let mut store = SectionStore::new();
        store.start("s").unwrap();
        capture(&mut store, "A");
        store.stop().unwrap();
        assert!(store.stop().is_err());
        assert_eq!(store.write("after"), Some("after"));
        assert_eq!(store.read("s"), Some("A"));
    }

    #[test]
    fn test_read_or_default() {
        let store = SectionStore::new();
        assert_eq!(store.read_or("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_content_seed_is_readable_but_not_inherited() {
        let mut store = SectionStore::with_content("<p>body</p>");
        assert_eq!(store.read("content"), Some("<p>body</p>"));
        store.start("nav").unwrap();
        capture(&mut store, "links");
        store.stop().unwrap();

        let sections = store.into_sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections["nav"], "links");

        let layout = SectionStore::inherit("outer", sections);
        assert_eq!(layout.read("content"), Some("outer"));
        assert_eq!(layout.read("nav"), Some("links"));
    }
}
