//! Widgets: self-rendering components looked up by name.
//!
//! A template calls `widget("cart", {items: 3})`. The renderer asks its
//! [`WidgetLocator`] for a widget under that name, built with the given
//! options, and writes whatever [`Widget::run`] returns. Without a locator
//! the call fails with [`TemplateError::WidgetsUnavailable`](crate::TemplateError::WidgetsUnavailable).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// A component that renders itself.
pub trait Widget {
    fn run(&self) -> Result<String, String>;
}

/// Finds widgets by name.
pub trait WidgetLocator: Send + Sync {
    /// Builds the widget `name` with `options`, or `None` if unknown.
    fn locate(&self, name: &str, options: &Map<String, Value>) -> Option<Box<dyn Widget>>;
}

type Factory = Arc<dyn Fn(&Map<String, Value>) -> Box<dyn Widget> + Send + Sync>;

/// A [`WidgetLocator`] backed by factory closures.
///
/// ```rust
/// use templar::{Widget, WidgetLocator, WidgetRegistry};
///
/// struct Badge(String);
///
/// impl Widget for Badge {
///     fn run(&self) -> Result<String, String> {
///         Ok(format!("<span class=\"badge\">{}</span>", self.0))
///     }
/// }
///
/// let mut widgets = WidgetRegistry::new();
/// widgets.register("badge", |options| {
///     let label = options.get("label").and_then(|v| v.as_str()).unwrap_or("new");
///     Box::new(Badge(label.to_string()))
/// });
///
/// let widget = widgets.locate("badge", &Default::default()).unwrap();
/// assert_eq!(widget.run().unwrap(), "<span class=\"badge\">new</span>");
/// ```
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    factories: HashMap<String, Factory>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Map<String, Value>) -> Box<dyn Widget> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl WidgetLocator for WidgetRegistry {
    fn locate(&self, name: &str, options: &Map<String, Value>) -> Option<Box<dyn Widget>> {
        self.factories.get(name).map(|factory| factory(options))
    }
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort_unstable();
        f.debug_struct("WidgetRegistry")
            .field("widgets", &names)
            .finish()
    }
}
