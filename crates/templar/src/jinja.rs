//! MiniJinja-backed engine.
//!
//! [`MiniJinjaEngine`] renders Jinja templates found under the same default
//! directory and namespaces as native templates. Jinja template names carry
//! their own extension (`"emails/welcome.html"`, `"mail::receipt.txt"`), so
//! the configured native extension is not appended.
//!
//! Compiled templates are cached in the MiniJinja environment for the lifetime
//! of the engine. Call [`MiniJinjaEngine::clear_cache`] to pick up changes on
//! disk.
//!
//! Registered filters are available as Jinja filters. The `e`, `escape` and
//! `batch` functions behave as they do in native templates:
//!
//! ```text
//! {{ e(user.name, "trim|ucfirst") }}
//! {{ batch(price, "cents|currency") }}
//! {{ title | slug }}
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{Environment, Error, ErrorKind, Value};

use crate::config::{EngineKind, TemplarConfig};
use crate::engine::TemplateEngine;
use crate::error::TemplateError;
use crate::filters::{self, FilterRegistry};
use crate::resolver::{candidate_path, NamespaceTable, TemplateRef};
use crate::value::into_scope;
use crate::widget::WidgetLocator;

/// Built-in filters exposed to Jinja that MiniJinja lacks.
const EXTRA_FILTERS: &[&str] = &["ucfirst", "nl2br", "strip_tags", "slug", "json"];

pub struct MiniJinjaEngine {
    env: Environment<'static>,
    default_directory: PathBuf,
    namespaces: NamespaceTable,
}

impl MiniJinjaEngine {
    /// Creates an engine loading templates from `default_directory` and the
    /// roots in `namespaces`.
    pub fn new(default_directory: impl Into<PathBuf>, namespaces: NamespaceTable) -> Self {
        let default_directory = default_directory.into();
        let mut env = Environment::new();

        let loader_root = default_directory.clone();
        let loader_namespaces = namespaces.clone();
        env.set_loader(move |name| load(&loader_root, &loader_namespaces, name));
        register_functions(&mut env, FilterRegistry::new());

        Self {
            env,
            default_directory,
            namespaces,
        }
    }

    pub fn from_config(config: &TemplarConfig) -> Self {
        Self::new(config.default_directory.clone(), config.namespaces.clone())
    }

    /// Exposes `filters` to templates, as Jinja filters and through the
    /// `e`/`escape`/`batch` functions.
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        register_functions(&mut self.env, filters);
        self
    }

    /// Adds a `widget(name, options)` function.
    pub fn with_widgets(mut self, widgets: Arc<dyn WidgetLocator>) -> Self {
        self.env.add_function(
            "widget",
            move |name: String, options: Option<Value>| -> Result<Value, Error> {
                let options = match options {
                    Some(options) if !options.is_none() && !options.is_undefined() => {
                        into_scope(to_json(&options)?).map_err(to_jinja)?
                    }
                    _ => Default::default(),
                };
                let widget = widgets
                    .locate(&name, &options)
                    .ok_or_else(|| to_jinja(TemplateError::UnknownWidget(name.clone())))?;
                let output = widget.run().map_err(|message| {
                    to_jinja(TemplateError::Widget {
                        name: name.clone(),
                        message,
                    })
                })?;
                Ok(Value::from_safe_string(output))
            },
        );
        self
    }

    /// Returns the underlying MiniJinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Returns the underlying MiniJinja environment for custom registration.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    /// Drops every compiled template.
    pub fn clear_cache(&mut self) {
        self.env.clear_templates();
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let template = TemplateRef::parse(name);
        let root = template.root(&self.default_directory, &self.namespaces)?;
        Ok(candidate_path(root, &template.relative_path(), ""))
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render_named(&self, name: &str, data: &serde_json::Value) -> Result<String, TemplateError> {
        let scope = into_scope(data.clone())?;
        let path = self.path_for(name)?;

        tracing::debug!(template = name, path = %path.display(), "rendering jinja template");
        let template = self.env.get_template(name).map_err(|err| match err.kind() {
            ErrorKind::TemplateNotFound => TemplateError::TemplateNotFound(path.clone()),
            _ => TemplateError::from(err).in_template(name),
        })?;
        template
            .render(&scope)
            .map_err(|err| TemplateError::from(err).in_template(name))
    }

    fn has_template(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Jinja
    }
}

fn load(
    default_directory: &Path,
    namespaces: &NamespaceTable,
    name: &str,
) -> Result<Option<String>, Error> {
    let template = TemplateRef::parse(name);
    let Ok(root) = template.root(default_directory, namespaces) else {
        return Ok(None);
    };
    let path = candidate_path(root, &template.relative_path(), "");
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(&path).map(Some).map_err(|err| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read template '{}'", path.display()),
        )
        .with_source(err)
    })
}

/// Registers `e`, `escape`, `batch` and every filter in `filters`.
pub fn register_functions(env: &mut Environment<'static>, filters: FilterRegistry) {
    let filters = Arc::new(filters);

    for name in ["e", "escape"] {
        let filters = Arc::clone(&filters);
        env.add_function(
            name,
            move |value: Value, chain: Option<String>| -> Result<Value, Error> {
                let escaped = filters::escape(&filters, to_json(&value)?, chain.as_deref())
                    .map_err(to_jinja)?;
                Ok(Value::from_safe_string(escaped))
            },
        );
    }

    let batch_filters = Arc::clone(&filters);
    env.add_function(
        "batch",
        move |value: Value, chain: String| -> Result<Value, Error> {
            let result = filters::batch(&batch_filters, to_json(&value)?, &chain).map_err(to_jinja)?;
            Ok(Value::from_serialize(&result))
        },
    );

    let names: Vec<String> = EXTRA_FILTERS
        .iter()
        .map(|name| name.to_string())
        .chain(filters.names().map(str::to_string))
        .collect();
    for name in names {
        let filters = Arc::clone(&filters);
        let filter_name = name.clone();
        env.add_filter(name, move |value: Value| -> Result<Value, Error> {
            let result = filters
                .apply(&filter_name, to_json(&value)?)
                .map_err(to_jinja)?;
            Ok(Value::from_serialize(&result))
        });
    }
}

fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    if value.is_undefined() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::InvalidOperation, "value cannot be converted").with_source(err)
    })
}

fn to_jinja(err: TemplateError) -> Error {
    Error::new(ErrorKind::InvalidOperation, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, name: &str, source: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    #[test]
    fn test_render_from_default_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "hello.txt", "Hello, {{ name }}!");
        let engine = MiniJinjaEngine::new(dir.path(), NamespaceTable::new());
        let out = engine
            .render_named("hello.txt", &json!({"name": "Jinja"}))
            .unwrap();
        assert_eq!(out, "Hello, Jinja!");
    }

    #[test]
    fn test_namespaced_names_and_includes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "mail/footer.txt", "-- {{ sender }}");
        write(
            dir.path(),
            "mail/welcome.txt",
            "Welcome\n{% include \"mail::footer.txt\" %}",
        );

        let mut namespaces = NamespaceTable::new();
        namespaces.insert("mail", dir.path().join("mail")).unwrap();
        let engine = MiniJinjaEngine::new(dir.path().join("unused"), namespaces);

        let out = engine
            .render_named("mail::welcome.txt", &json!({"sender": "Ops"}))
            .unwrap();
        assert_eq!(out, "Welcome\n-- Ops");
        assert!(engine.has_template("mail::footer.txt"));
    }

    #[test]
    fn test_not_found_maps_to_template_not_found() {
        let dir = TempDir::new().unwrap();
        let engine = MiniJinjaEngine::new(dir.path(), NamespaceTable::new());
        match engine.render_named("missing.html", &json!({})) {
            Err(TemplateError::TemplateNotFound(path)) => {
                assert!(path.ends_with("missing.html"));
            }
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
        assert!(matches!(
            engine.render_named("ghost::x.html", &json!({})),
            Err(TemplateError::UndefinedNamespace(_))
        ));
    }

    #[test]
    fn test_escape_and_batch_functions() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "page.html",
            r#"{{ e(name, "upper") }}|{{ batch(n, "double") }}|{{ title | slug }}"#,
        );

        let mut registry = FilterRegistry::new();
        registry.register("double", |v: serde_json::Value| {
            Ok(json!(v.as_i64().unwrap_or(0) * 2))
        });
        let engine = MiniJinjaEngine::new(dir.path(), NamespaceTable::new()).with_filters(registry);

        let out = engine
            .render_named(
                "page.html",
                &json!({"name": "<it's>", "n": 21, "title": "Hello World"}),
            )
            .unwrap();
        assert_eq!(out, "&lt;IT&#039;S&gt;|42|hello-world");
    }

    #[test]
    fn test_runtime_error_is_wrapped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.txt", r#"{{ batch(1, "bogus") }}"#);
        let engine = MiniJinjaEngine::new(dir.path(), NamespaceTable::new());
        let err = engine.render_named("bad.txt", &json!({})).unwrap_err();
        assert_eq!(err.template_trace(), vec!["bad.txt"]);
        assert!(matches!(err.root_cause(), TemplateError::Jinja(_)));
    }
}
