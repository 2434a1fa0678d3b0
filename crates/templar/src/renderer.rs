//! The renderer entry point.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{EngineKind, TemplarConfig};
use crate::engine::TemplateEngine;
use crate::error::TemplateError;
use crate::filters::FilterRegistry;
use crate::jinja::MiniJinjaEngine;
use crate::native::NativeEngine;
use crate::widget::WidgetLocator;

/// Renders templates by name, dispatching each name to the configured engine.
///
/// # Example
///
/// ```rust,no_run
/// use serde::Serialize;
/// use templar::{Templar, TemplarConfig};
///
/// #[derive(Serialize)]
/// struct Page { title: String }
///
/// let config = TemplarConfig::new()
///     .with_default_directory("views")
///     .with_namespace("admin", "admin/views")?;
///
/// let templar = Templar::builder(config)
///     .filter("shout", |v| Ok(serde_json::json!(format!("{}!", v.as_str().unwrap_or("")))))
///     .build()?;
///
/// // views/home.tpl
/// let html = templar.render("home", &Page { title: "Welcome".into() })?;
/// // admin/views/users/list.tpl
/// let html = templar.render("admin::users/list", &Page { title: "Users".into() })?;
/// # Ok::<(), templar::TemplateError>(())
/// ```
pub struct Templar {
    config: TemplarConfig,
    native: NativeEngine,
    jinja: MiniJinjaEngine,
}

impl Templar {
    /// Builds a renderer with no filters and no widgets.
    pub fn new(config: TemplarConfig) -> Result<Self, TemplateError> {
        Self::builder(config).build()
    }

    pub fn builder(config: TemplarConfig) -> TemplarBuilder {
        TemplarBuilder::new(config)
    }

    pub fn config(&self) -> &TemplarConfig {
        &self.config
    }

    /// The engine for `kind`.
    pub fn engine(&self, kind: EngineKind) -> &dyn TemplateEngine {
        match kind {
            EngineKind::Native => &self.native,
            EngineKind::Jinja => &self.jinja,
        }
    }

    /// The engine configured for `name`.
    pub fn engine_for(&self, name: &str) -> &dyn TemplateEngine {
        self.engine(self.config.engine_for(name))
    }

    /// Renders `name` with `data` as its variables.
    ///
    /// `data` must serialize to a map (a struct, a `HashMap`, `json!({..})`)
    /// or to nothing (`()`); anything else fails with
    /// [`TemplateError::Context`].
    pub fn render<S: Serialize + ?Sized>(&self, name: &str, data: &S) -> Result<String, TemplateError> {
        let data = serde_json::to_value(data)?;
        let engine = self.engine_for(name);
        tracing::debug!(template = name, engine = %engine.kind(), "render");
        engine.render_named(name, &data)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.engine_for(name).has_template(name)
    }

    /// Drops compiled Jinja templates so edits on disk are picked up.
    ///
    /// Native templates are always read from disk.
    pub fn clear_cache(&mut self) {
        self.jinja.clear_cache();
    }
}

/// Collects filters and widgets before building a [`Templar`].
pub struct TemplarBuilder {
    config: TemplarConfig,
    filters: FilterRegistry,
    widgets: Option<Arc<dyn WidgetLocator>>,
}

impl TemplarBuilder {
    pub fn new(config: TemplarConfig) -> Self {
        Self {
            config,
            filters: FilterRegistry::new(),
            widgets: None,
        }
    }

    /// Registers a filter for escape and batch chains.
    pub fn filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(serde_json::Value) -> Result<serde_json::Value, String> + Send + Sync + 'static,
    {
        self.filters.register(name, filter);
        self
    }

    /// Replaces the filter registry.
    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    pub fn widgets(mut self, widgets: impl WidgetLocator + 'static) -> Self {
        self.widgets = Some(Arc::new(widgets));
        self
    }

    pub fn build(self) -> Result<Templar, TemplateError> {
        self.config.validate()?;

        let mut native = NativeEngine::from_config(&self.config).with_filters(self.filters.clone());
        let mut jinja = MiniJinjaEngine::from_config(&self.config).with_filters(self.filters);
        if let Some(widgets) = self.widgets {
            native = native.with_widgets(Arc::clone(&widgets));
            jinja = jinja.with_widgets(widgets);
        }

        tracing::debug!(
            default_directory = %self.config.default_directory.display(),
            namespaces = self.config.namespaces.len(),
            default_engine = %self.config.default_engine,
            "templar ready"
        );
        Ok(Templar {
            config: self.config,
            native,
            jinja,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_rejects_non_map_data() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.tpl"), "ok").unwrap();
        let templar = Templar::new(TemplarConfig::new().with_default_directory(dir.path())).unwrap();

        assert_eq!(templar.render("page", &()).unwrap(), "ok");
        assert_eq!(templar.render("page", &HashMap::<String, i32>::new()).unwrap(), "ok");
        assert!(matches!(
            templar.render("page", &vec![1, 2]),
            Err(TemplateError::Context(_))
        ));
    }

    #[test]
    fn test_engine_dispatch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.tpl"), "native {{ x }}").unwrap();
        fs::write(dir.path().join("page.html"), "jinja {{ x }}").unwrap();

        let config = TemplarConfig::new()
            .with_default_directory(dir.path())
            .with_template_engine("page.html", EngineKind::Jinja);
        let templar = Templar::new(config).unwrap();

        assert_eq!(templar.render("page", &json!({"x": 1})).unwrap(), "native 1");
        assert_eq!(templar.render("page.html", &json!({"x": 2})).unwrap(), "jinja 2");
        assert_eq!(templar.engine_for("page.html").kind(), EngineKind::Jinja);
    }

    #[test]
    fn test_build_validates_config() {
        let config = TemplarConfig::new().with_namespace_engine("ghost", EngineKind::Jinja);
        assert!(matches!(Templar::new(config), Err(TemplateError::Config(_))));
    }
}
