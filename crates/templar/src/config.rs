//! Renderer configuration.
//!
//! [`TemplarConfig`] is the long-lived, read-mostly part of the renderer: where
//! templates live, what extension they carry, which namespaces exist and which
//! engine renders which template. It is deserializable so applications can
//! keep it next to the rest of their settings; loading files is up to them.
//!
//! ```rust
//! use templar::{EngineKind, TemplarConfig};
//!
//! let config = TemplarConfig::from_yaml(r#"
//! default_directory: views
//! files_extension: .html
//! namespaces:
//!   admin: admin/views
//! namespace_engines:
//!   admin: jinja
//! "#).unwrap();
//!
//! assert_eq!(config.engine_for("admin::users"), EngineKind::Jinja);
//! assert_eq!(config.engine_for("home"), EngineKind::Native);
//! ```
//!
//! Keys are also accepted in camelCase (`defaultDirectory`, `filesExtension`).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::resolver::{NamespaceTable, TemplateRef, NAMESPACE_DELIMITER};

/// Directory used for names without a namespace.
pub const DEFAULT_DIRECTORY: &str = "templates";

/// Suffix appended to native template names.
pub const DEFAULT_EXTENSION: &str = ".tpl";

/// Which engine renders a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Native syntax with layouts and sections.
    #[default]
    Native,
    /// MiniJinja. Template names include the file extension.
    Jinja,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Native => write!(f, "native"),
            EngineKind::Jinja => write!(f, "jinja"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplarConfig {
    /// Root for templates without a namespace.
    #[serde(alias = "defaultDirectory")]
    pub default_directory: PathBuf,

    /// Suffix appended to native template names (e.g. `.tpl`).
    #[serde(alias = "filesExtension")]
    pub files_extension: String,

    pub namespaces: NamespaceTable,

    /// Engine used when no more specific rule matches.
    #[serde(alias = "defaultEngine")]
    pub default_engine: EngineKind,

    /// Engine per namespace identifier.
    #[serde(alias = "namespaceEngines")]
    pub namespace_engines: HashMap<String, EngineKind>,

    /// Engine per full template name. Wins over namespace rules.
    #[serde(alias = "templateEngines")]
    pub template_engines: HashMap<String, EngineKind>,

    /// Carry the body's sections into the layout pass, next to `content`.
    #[serde(alias = "inheritSections")]
    pub inherit_sections: bool,
}

impl Default for TemplarConfig {
    fn default() -> Self {
        Self {
            default_directory: PathBuf::from(DEFAULT_DIRECTORY),
            files_extension: DEFAULT_EXTENSION.to_string(),
            namespaces: NamespaceTable::new(),
            default_engine: EngineKind::Native,
            namespace_engines: HashMap::new(),
            template_engines: HashMap::new(),
            inherit_sections: false,
        }
    }
}

impl TemplarConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from a YAML document.
    ///
    /// Missing keys take their defaults; unknown keys are an error.
    pub fn from_yaml(yaml: &str) -> Result<Self, TemplateError> {
        let config: TemplarConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_default_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_directory = dir.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.files_extension = extension.into();
        self
    }

    pub fn with_namespace(
        mut self,
        namespace: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Result<Self, TemplateError> {
        self.namespaces.insert(namespace, root)?;
        Ok(self)
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.default_engine = engine;
        self
    }

    pub fn with_namespace_engine(mut self, namespace: impl Into<String>, engine: EngineKind) -> Self {
        self.namespace_engines.insert(namespace.into(), engine);
        self
    }

    pub fn with_template_engine(mut self, name: impl Into<String>, engine: EngineKind) -> Self {
        self.template_engines.insert(name.into(), engine);
        self
    }

    pub fn with_inherited_sections(mut self, inherit: bool) -> Self {
        self.inherit_sections = inherit;
        self
    }

    /// Checks cross-field consistency.
    ///
    /// Namespace identifiers cannot contain `::`, and engine rules may only
    /// name namespaces that are registered.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if let Some((namespace, _)) = self
            .namespaces
            .iter()
            .find(|(namespace, _)| namespace.contains(NAMESPACE_DELIMITER))
        {
            return Err(TemplateError::InvalidNamespace(namespace.to_string()));
        }
        for namespace in self.namespace_engines.keys() {
            if self.namespaces.get(namespace).is_none() {
                return Err(TemplateError::Config(format!(
                    "engine configured for unknown namespace '{}'",
                    namespace
                )));
            }
        }
        Ok(())
    }

    /// Selects the engine for a template name.
    ///
    /// Per-template rules win over per-namespace rules, which win over
    /// [`default_engine`](Self::default_engine).
    pub fn engine_for(&self, name: &str) -> EngineKind {
        if let Some(engine) = self.template_engines.get(name) {
            return *engine;
        }
        TemplateRef::parse(name)
            .namespace()
            .and_then(|ns| self.namespace_engines.get(ns))
            .copied()
            .unwrap_or(self.default_engine)
    }
}
