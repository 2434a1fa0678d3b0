//! # Templar - file templates with layouts, sections and escaping
//!
//! Templar renders templates stored on disk, addressed by name:
//!
//! - `"pages/home"` lives at `{default_directory}/pages/home{extension}`
//! - `"admin::users/list"` lives under the root registered for `admin`
//!
//! Native templates are plain text with `{{ expr }}` output tags and
//! `{% ... %}` statements. A template can wrap itself in a layout, fill named
//! sections for the layout to place, and render partials:
//!
//! ```text
//! {# pages/home.tpl #}
//! {% layout("layouts::main", {title: "Home"}) %}
//! {% start("scripts") %}<script src="/home.js"></script>{% stop() %}
//! <h1>{{ e(user.name) }}</h1>
//! {{ partial("partials/news", {items: news}) }}
//!
//! {# layouts/main.tpl #}
//! <title>{{ e(title) }}</title>
//! {{ section("content") }}
//! {{ section("scripts", "") }}
//! ```
//!
//! Output is never escaped implicitly. Use `e(value)` or
//! `e(value, "trim|upper")` to run a filter chain and HTML-escape the result,
//! and `batch(value, "chain")` to run a chain without escaping.
//!
//! Templates can also be rendered through MiniJinja; see [`MiniJinjaEngine`]
//! and [`EngineKind`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use templar::{Templar, TemplarConfig};
//!
//! let templar = Templar::new(TemplarConfig::new().with_default_directory("templates"))?;
//! let html = templar.render("pages/home", &json!({"user": {"name": "Ann"}}))?;
//! # Ok::<(), templar::TemplateError>(())
//! ```
//!
//! ## Template functions
//!
//! | Function | Effect |
//! |----------|--------|
//! | `partial(name, data)` | Render another template, return its output |
//! | `insert(name, data)` | Render another template and write its output |
//! | `layout(name, data)` | Wrap this template's output in `name` |
//! | `section(name, default)` | Read a section |
//! | `start(name)` / `append(name)` / `prepend(name)` | Begin capturing into a section |
//! | `stop()` | End the capture |
//! | `e(value, chain)` / `escape(value, chain)` | Filter and HTML-escape |
//! | `batch(value, chain)` | Filter only |
//! | `widget(name, options)` | Run a widget from the configured locator |
//!
//! Every template also sees `template`, its own name. A data key named
//! `template` is available as `data_template`.

mod config;
mod engine;
mod error;
mod filters;
mod jinja;
mod native;
mod renderer;
mod resolver;
mod sections;
mod value;
mod widget;

pub use config::{EngineKind, TemplarConfig, DEFAULT_DIRECTORY, DEFAULT_EXTENSION};
pub use engine::TemplateEngine;
pub use error::TemplateError;
pub use filters::{
    batch, escape, escape_bytes, html_escape, FilterFn, FilterRegistry, CHAIN_SEPARATOR,
};
pub use jinja::{register_functions, MiniJinjaEngine};
pub use native::{NativeEngine, FUNCTIONS, MAX_DEPTH, RESERVED_PREFIX, TEMPLATE_BINDING};
pub use renderer::{Templar, TemplarBuilder};
pub use resolver::{
    candidate_path, FsResolver, NamespaceTable, Resolve, TemplateRef, NAMESPACE_DELIMITER,
};
pub use sections::{CaptureMode, SectionStore, CONTENT_SECTION};
pub use value::{display, is_truthy};
pub use widget::{Widget, WidgetLocator, WidgetRegistry};
