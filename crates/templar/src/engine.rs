//! Template engine abstraction.
//!
//! [`TemplateEngine`] is the contract both backends fulfil: render a template
//! by name with a map of variables. [`NativeEngine`](crate::NativeEngine)
//! implements it with layouts and sections; [`MiniJinjaEngine`](crate::MiniJinjaEngine)
//! implements it through MiniJinja. [`Templar`](crate::Templar) picks one per
//! template name.

use serde_json::Value;

use crate::config::EngineKind;
use crate::error::TemplateError;

/// A template engine that renders templates by name.
///
/// Implementations are shared across threads and must not keep per-render
/// state in `self`.
pub trait TemplateEngine: Send + Sync {
    /// Renders the template `name` with `data` as its variables.
    ///
    /// `data` must be an object or `null`.
    ///
    /// # Errors
    ///
    /// Resolution errors for `name` itself are returned as-is
    /// ([`TemplateError::UndefinedNamespace`], [`TemplateError::TemplateNotFound`]).
    /// Faults raised while executing the template come back wrapped in
    /// [`TemplateError::Execution`].
    fn render_named(&self, name: &str, data: &Value) -> Result<String, TemplateError>;

    /// Checks if a template with the given name resolves to a file.
    fn has_template(&self, name: &str) -> bool;

    /// Which [`EngineKind`] this engine is.
    fn kind(&self) -> EngineKind;
}
