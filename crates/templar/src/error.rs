//! Error types for template resolution and rendering.
//!
//! Everything in this crate fails with [`TemplateError`]. Errors are never
//! recovered internally: a failed layout pass after a successful body pass
//! fails the whole render, with no partial output.

use std::path::PathBuf;

use templar_syntax::SyntaxError;
use thiserror::Error;

/// Error type for template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A `namespace::name` template referenced an unregistered namespace.
    #[error("template namespace '{0}::' not defined")]
    UndefinedNamespace(String),

    /// The resolved template path does not exist.
    #[error("template file '{}' not found", .0.display())]
    TemplateNotFound(PathBuf),

    /// `content` is filled by the layout pass and cannot be captured.
    #[error("the section name \"content\" is reserved")]
    ReservedSectionName,

    /// A capture was started while another one was still open.
    #[error("cannot start section '{requested}' while section '{active}' is capturing")]
    NestedCapture { active: String, requested: String },

    /// `stop()` was called with no open capture.
    #[error("you must start a section before you can stop it")]
    NoActiveCapture,

    /// A template finished while a capture it opened was still active.
    #[error("section '{0}' was started but never stopped")]
    UnclosedSection(String),

    /// A filter chain referenced a name that is neither built in nor registered.
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    /// A filter rejected its input.
    #[error("filter '{name}' failed: {message}")]
    Filter { name: String, message: String },

    /// A template called a function the renderer does not provide.
    #[error("unknown template function '{0}'")]
    UnknownFunction(String),

    /// A template function was called with the wrong arguments.
    #[error("{function}(): {message}")]
    InvalidArguments {
        function: &'static str,
        message: String,
    },

    /// A `for` loop over something that is not a list or map.
    #[error("line {line}: cannot iterate over a {kind}")]
    NotIterable { line: usize, kind: &'static str },

    /// `widget()` was called but no widget locator is configured.
    #[error("widgets are not available: no widget locator configured")]
    WidgetsUnavailable,

    /// The widget locator has no widget under this name.
    #[error("unknown widget '{0}'")]
    UnknownWidget(String),

    /// A widget's `run()` failed.
    #[error("widget '{name}' failed: {message}")]
    Widget { name: String, message: String },

    /// Partials or layouts nested deeper than the renderer allows.
    #[error("template nesting exceeded {limit} levels at '{name}'")]
    RecursionLimit { name: String, limit: usize },

    /// The template file could not be parsed.
    #[error("syntax error in '{}': {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },

    /// A fault raised while executing a template body.
    ///
    /// Wraps the original error, including faults from nested partials.
    #[error("error rendering template '{template}': {source}")]
    Execution {
        template: String,
        #[source]
        source: Box<TemplateError>,
    },

    /// The data passed to `render` is not usable as a template scope.
    #[error("invalid render context: {0}")]
    Context(String),

    /// Namespace identifiers cannot contain `::`.
    #[error("invalid namespace '{0}': namespace identifiers cannot contain '::'")]
    InvalidNamespace(String),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading a template file failed.
    #[error("failed to read template '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error reported by the MiniJinja engine.
    #[error("jinja error: {0}")]
    Jinja(#[from] minijinja::Error),
}

impl TemplateError {
    /// Wraps `self` as a fault raised while executing `template`.
    pub(crate) fn in_template(self, template: &str) -> Self {
        TemplateError::Execution {
            template: template.to_string(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any [`TemplateError::Execution`]
    /// wrappers.
    pub fn root_cause(&self) -> &TemplateError {
        let mut current = self;
        while let TemplateError::Execution { source, .. } = current {
            current = &**source;
        }
        current
    }

    /// Names of the templates the error propagated through, outermost first.
    pub fn template_trace(&self) -> Vec<&str> {
        let mut trace = Vec::new();
        let mut current = self;
        while let TemplateError::Execution { template, source } = current {
            trace.push(template.as_str());
            current = &**source;
        }
        trace
    }
}

impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        TemplateError::Context(err.to_string())
    }
}

impl From<serde_yaml::Error> for TemplateError {
    fn from(err: serde_yaml::Error) -> Self {
        TemplateError::Config(err.to_string())
    }
}
