//! The native engine: file templates with layouts, sections and partials.
//!
//! A render runs in two passes. The body pass executes the requested template;
//! while it runs the template may register a layout with `layout(name, data)`
//! and fill named sections. If a layout was registered, the layout pass renders
//! it in a fresh context whose `content` section holds the body output.
//! Layouts can register layouts of their own; the chain ends at the first
//! template that does not.
//!
//! ```text
//! templates/
//! ├── page.tpl      {% layout("base", {title: "Home"}) %}<p>Hello</p>
//! └── base.tpl      <title>{{ title }}</title>{{ section("content") }}
//! ```
//!
//! Rendering `page` yields `<title>Home</title><p>Hello</p>`.

mod context;
mod interp;

use std::fs;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{EngineKind, TemplarConfig};
use crate::engine::TemplateEngine;
use crate::error::TemplateError;
use crate::filters::FilterRegistry;
use crate::resolver::{FsResolver, Resolve};
use crate::sections::SectionStore;
use crate::value::into_scope;
use crate::widget::WidgetLocator;

use context::RenderContext;
use interp::Frame;

pub use interp::{FUNCTIONS, RESERVED_PREFIX, TEMPLATE_BINDING};

/// Maximum nesting of partials and layouts.
pub const MAX_DEPTH: usize = 64;

/// Renders native templates resolved through a [`Resolve`] implementation.
///
/// `NativeEngine` is `Send + Sync`. Each call builds its own render state, so
/// one engine can serve concurrent renders.
pub struct NativeEngine {
    resolver: Box<dyn Resolve>,
    filters: FilterRegistry,
    widgets: Option<Arc<dyn WidgetLocator>>,
    inherit_sections: bool,
}

impl NativeEngine {
    pub fn new(resolver: impl Resolve + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            filters: FilterRegistry::new(),
            widgets: None,
            inherit_sections: false,
        }
    }

    /// Engine over an [`FsResolver`] built from `config`.
    pub fn from_config(config: &TemplarConfig) -> Self {
        Self::new(FsResolver::from_config(config)).with_inherited_sections(config.inherit_sections)
    }

    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_widgets(mut self, widgets: Arc<dyn WidgetLocator>) -> Self {
        self.widgets = Some(widgets);
        self
    }

    /// Makes the body's finalized sections visible to its layout.
    pub fn with_inherited_sections(mut self, inherit: bool) -> Self {
        self.inherit_sections = inherit;
        self
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn resolver(&self) -> &dyn Resolve {
        self.resolver.as_ref()
    }

    /// Renders `name` and, if it registered one, its layout chain.
    pub fn render(&self, name: &str, data: Map<String, Value>) -> Result<String, TemplateError> {
        self.render_pass(name, data, SectionStore::new(), 0)
    }

    /// Renders `name` alone and returns its direct output.
    ///
    /// Layouts the template registers are ignored.
    pub fn partial(&self, name: &str, data: Map<String, Value>) -> Result<String, TemplateError> {
        let mut ctx = RenderContext::new();
        self.execute(&mut ctx, name, data, 0)
    }

    fn render_pass(
        &self,
        name: &str,
        data: Map<String, Value>,
        sections: SectionStore,
        depth: usize,
    ) -> Result<String, TemplateError> {
        let mut ctx = RenderContext::with_sections(sections);
        let content = self.execute(&mut ctx, name, data, depth)?;

        let Some(layout) = ctx.take_layout() else {
            return Ok(content);
        };
        tracing::debug!(template = name, layout = %layout.name, "rendering layout");

        let seeded = if self.inherit_sections {
            SectionStore::inherit(content, ctx.into_sections())
        } else {
            SectionStore::with_content(content)
        };
        self.render_pass(&layout.name, layout.data, seeded, depth + 1)
    }

    /// Resolves, parses and runs one template inside `ctx`.
    pub(crate) fn execute(
        &self,
        ctx: &mut RenderContext,
        name: &str,
        data: Map<String, Value>,
        depth: usize,
    ) -> Result<String, TemplateError> {
        if depth > MAX_DEPTH {
            return Err(TemplateError::RecursionLimit {
                name: name.to_string(),
                limit: MAX_DEPTH,
            });
        }

        let path = self.resolver.resolve(name)?;
        let source = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        let template =
            templar_syntax::parse(&source).map_err(|source| TemplateError::Syntax { path, source })?;

        tracing::debug!(template = name, depth, "executing template");
        let output = Frame::new(self, name, depth, data)
            .run(ctx, &template.nodes)
            .map_err(|err| err.in_template(name))?;

        if let Some(section) = ctx.open_capture_at(depth) {
            return Err(TemplateError::UnclosedSection(section.to_string()).in_template(name));
        }
        Ok(output)
    }

    pub(crate) fn run_widget(
        &self,
        name: &str,
        options: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        let locator = self
            .widgets
            .as_ref()
            .ok_or(TemplateError::WidgetsUnavailable)?;
        let widget = locator
            .locate(name, options)
            .ok_or_else(|| TemplateError::UnknownWidget(name.to_string()))?;
        widget.run().map_err(|message| TemplateError::Widget {
            name: name.to_string(),
            message,
        })
    }
}

impl TemplateEngine for NativeEngine {
    fn render_named(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        self.render(name, into_scope(data.clone())?)
    }

    fn has_template(&self, name: &str) -> bool {
        self.resolver.resolve(name).is_ok()
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Native
    }
}
