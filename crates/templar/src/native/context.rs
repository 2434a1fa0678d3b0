//! Per-render state.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::TemplateError;
use crate::sections::{CaptureMode, SectionStore};

/// A layout registered by `layout(name, data)`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayoutRequest {
    pub name: String,
    pub data: Map<String, Value>,
}

/// State shared by every template executed within one render pass.
///
/// Partials run at increasing depths inside the same context. A capture
/// belongs to the depth that opened it: only output of the template running
/// at that depth is diverted into it. Output of a nested partial goes to the
/// partial's own buffer and reaches the capture only when the caller emits
/// the partial's result.
#[derive(Debug, Default)]
pub(crate) struct RenderContext {
    sections: SectionStore,
    capture_depth: Option<usize>,
    layout: Option<LayoutRequest>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sections(sections: SectionStore) -> Self {
        Self {
            sections,
            ..Self::default()
        }
    }

    /// Writes `text` for the template running at `depth`.
    pub fn emit(&mut self, depth: usize, out: &mut String, text: &str) {
        if self.capture_depth == Some(depth) {
            if let Some(text) = self.sections.write(text) {
                out.push_str(text);
            }
        } else {
            out.push_str(text);
        }
    }

    pub fn open(&mut self, name: &str, mode: CaptureMode, depth: usize) -> Result<(), TemplateError> {
        self.sections.open(name, mode)?;
        self.capture_depth = Some(depth);
        Ok(())
    }

    /// Closes the capture opened at `depth`.
    pub fn stop(&mut self, depth: usize) -> Result<(), TemplateError> {
        if self.capture_depth != Some(depth) {
            return Err(TemplateError::NoActiveCapture);
        }
        self.sections.stop()?;
        self.capture_depth = None;
        Ok(())
    }

    /// Name of a capture opened at `depth` and still open.
    pub fn open_capture_at(&self, depth: usize) -> Option<&str> {
        match self.capture_depth {
            Some(d) if d == depth => self.sections.active_name(),
            _ => None,
        }
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.read(name)
    }

    pub fn set_layout(&mut self, name: String, data: Map<String, Value>) {
        tracing::debug!(layout = %name, "layout registered");
        self.layout = Some(LayoutRequest { name, data });
    }

    pub fn take_layout(&mut self) -> Option<LayoutRequest> {
        self.layout.take()
    }

    /// Finalized sections other than `content`.
    pub fn into_sections(self) -> HashMap<String, String> {
        self.sections.into_sections()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_diverts_only_owning_depth() {
        let mut ctx = RenderContext::new();
        let mut page = String::new();
        let mut partial = String::new();

        ctx.emit(0, &mut page, "before ");
        ctx.open("s", CaptureMode::Replace, 0).unwrap();
        ctx.emit(0, &mut page, "captured");
        ctx.emit(1, &mut partial, "partial output");
        ctx.stop(0).unwrap();
        ctx.emit(0, &mut page, "after");

        assert_eq!(page, "before after");
        assert_eq!(partial, "partial output");
        assert_eq!(ctx.section("s"), Some("captured"));
    }

    #[test]
    fn test_stop_from_other_depth_is_rejected() {
        let mut ctx = RenderContext::new();
        ctx.open("s", CaptureMode::Replace, 0).unwrap();
        assert!(matches!(ctx.stop(1), Err(TemplateError::NoActiveCapture)));
        assert_eq!(ctx.open_capture_at(0), Some("s"));
        assert_eq!(ctx.open_capture_at(1), None);
    }

    #[test]
    fn test_capture_is_global_across_depths() {
        let mut ctx = RenderContext::new();
        ctx.open("a", CaptureMode::Replace, 0).unwrap();
        assert!(matches!(
            ctx.open("b", CaptureMode::Append, 1),
            Err(TemplateError::NestedCapture { .. })
        ));
    }

    #[test]
    fn test_layout_request_is_taken_once() {
        let mut ctx = RenderContext::new();
        ctx.set_layout("base".into(), Map::new());
        assert_eq!(ctx.take_layout().map(|l| l.name), Some("base".to_string()));
        assert!(ctx.take_layout().is_none());
    }
}
