//! Template name to file path resolution.
//!
//! Names come in two shapes:
//!
//! | Name | Resolves to |
//! |------|-------------|
//! | `"pages/home"` | `{default_directory}/pages/home{extension}` |
//! | `"admin::users/list"` | `{namespaces["admin"]}/users/list{extension}` |
//!
//! Everything after the first `::` is the relative path; any further `::`
//! separators are read as `/`, so `"admin::users::list"` is the same template
//! as `"admin::users/list"`.
//!
//! The candidate path is built by plain concatenation (root, `/`, relative
//! path, extension) and must name an existing file at the moment of
//! resolution. Nothing is cached: adding or removing a file on disk is visible
//! to the next render.
//!
//! # Security
//!
//! Names are not sanitized. `"../secrets"` resolves outside the template
//! directory. Never pass untrusted input as a template name.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::TemplarConfig;
use crate::error::TemplateError;

/// Separator between a namespace and the template path.
pub const NAMESPACE_DELIMITER: &str = "::";

/// Namespace identifier to root directory mapping.
///
/// Identifiers cannot contain [`NAMESPACE_DELIMITER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, PathBuf>",
    into = "BTreeMap<String, PathBuf>"
)]
pub struct NamespaceTable {
    roots: BTreeMap<String, PathBuf>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a namespace root.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidNamespace`] if the identifier contains `::`.
    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Result<(), TemplateError> {
        let namespace = namespace.into();
        if namespace.contains(NAMESPACE_DELIMITER) {
            return Err(TemplateError::InvalidNamespace(namespace));
        }
        self.roots.insert(namespace, root.into());
        Ok(())
    }

    pub fn get(&self, namespace: &str) -> Option<&Path> {
        self.roots.get(namespace).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.roots.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl TryFrom<BTreeMap<String, PathBuf>> for NamespaceTable {
    type Error = TemplateError;

    fn try_from(map: BTreeMap<String, PathBuf>) -> Result<Self, Self::Error> {
        let mut table = NamespaceTable::new();
        for (namespace, root) in map {
            table.insert(namespace, root)?;
        }
        Ok(table)
    }
}

impl From<NamespaceTable> for BTreeMap<String, PathBuf> {
    fn from(table: NamespaceTable) -> Self {
        table.roots
    }
}

/// A template name split into its namespace and relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// `namespace::segment[::segment..]`
    Namespaced {
        namespace: String,
        segments: Vec<String>,
    },
    /// A name relative to the default directory.
    Default { segments: Vec<String> },
}

impl TemplateRef {
    pub fn parse(name: &str) -> Self {
        let mut parts = name.split(NAMESPACE_DELIMITER);
        match (parts.next(), name.contains(NAMESPACE_DELIMITER)) {
            (Some(namespace), true) => TemplateRef::Namespaced {
                namespace: namespace.to_string(),
                segments: parts.map(str::to_string).collect(),
            },
            _ => TemplateRef::Default {
                segments: vec![name.to_string()],
            },
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            TemplateRef::Namespaced { namespace, .. } => Some(namespace),
            TemplateRef::Default { .. } => None,
        }
    }

    /// The path below the root, segments joined with `/`.
    pub fn relative_path(&self) -> String {
        match self {
            TemplateRef::Namespaced { segments, .. } | TemplateRef::Default { segments } => {
                segments.join("/")
            }
        }
    }

    /// Picks the root directory this reference lives under.
    pub fn root<'a>(
        &self,
        default_directory: &'a Path,
        namespaces: &'a NamespaceTable,
    ) -> Result<&'a Path, TemplateError> {
        match self {
            TemplateRef::Namespaced { namespace, .. } => namespaces
                .get(namespace)
                .ok_or_else(|| TemplateError::UndefinedNamespace(namespace.clone())),
            TemplateRef::Default { .. } => Ok(default_directory),
        }
    }
}

/// Joins root, relative path and extension the way names are documented to
/// resolve: `root + "/" + relative + extension`.
pub fn candidate_path(root: &Path, relative: &str, extension: &str) -> PathBuf {
    let mut path = OsString::from(root.as_os_str());
    path.push("/");
    path.push(relative);
    path.push(extension);
    PathBuf::from(path)
}

/// Maps template names to existing files.
///
/// The render engine is generic over this trait so resolution can be swapped
/// out (tests, virtual filesystems, stricter sandboxing).
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: &str) -> Result<PathBuf, TemplateError>;
}

/// Filesystem resolver over a default directory and a [`NamespaceTable`].
#[derive(Debug, Clone)]
pub struct FsResolver {
    default_directory: PathBuf,
    extension: String,
    namespaces: NamespaceTable,
}

impl FsResolver {
    pub fn new(
        default_directory: impl Into<PathBuf>,
        extension: impl Into<String>,
        namespaces: NamespaceTable,
    ) -> Self {
        Self {
            default_directory: default_directory.into(),
            extension: extension.into(),
            namespaces,
        }
    }

    pub fn from_config(config: &TemplarConfig) -> Self {
        Self::new(
            config.default_directory.clone(),
            config.files_extension.clone(),
            config.namespaces.clone(),
        )
    }

    pub fn default_directory(&self) -> &Path {
        &self.default_directory
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Builds the candidate path without checking that it exists.
    pub fn candidate(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let template = TemplateRef::parse(name);
        let root = template.root(&self.default_directory, &self.namespaces)?;
        Ok(candidate_path(
            root,
            &template.relative_path(),
            &self.extension,
        ))
    }
}

impl Resolve for FsResolver {
    fn resolve(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let path = self.candidate(name)?;
        if path.is_file() {
            tracing::debug!(template = name, path = %path.display(), "resolved template");
            Ok(path)
        } else {
            tracing::debug!(template = name, path = %path.display(), "template file missing");
            Err(TemplateError::TemplateNotFound(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_parse_default_name() {
        assert_eq!(
            TemplateRef::parse("pages/home"),
            TemplateRef::Default {
                segments: vec!["pages/home".into()]
            }
        );
    }

    #[test]
    fn test_parse_namespaced_name() {
        let template = TemplateRef::parse("admin::users::list");
        assert_eq!(template.namespace(), Some("admin"));
        assert_eq!(template.relative_path(), "users/list");
    }

    #[test]
    fn test_namespace_table_rejects_delimiter() {
        let mut table = NamespaceTable::new();
        let err = table.insert("a::b", "/tmp").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidNamespace(ns) if ns == "a::b"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_candidate_is_plain_concatenation() {
        let resolver = FsResolver::new("templates", ".tpl", NamespaceTable::new());
        assert_eq!(
            resolver.candidate("home").unwrap(),
            PathBuf::from("templates/home.tpl")
        );
    }

    #[test]
    fn test_resolve_default_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pages/home.tpl");

        let resolver = FsResolver::new(dir.path(), ".tpl", NamespaceTable::new());
        let path = resolver.resolve("pages/home").unwrap();
        assert!(path.ends_with("pages/home.tpl"));
    }

    #[test]
    fn test_resolve_namespace() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "admin/users/list.tpl");

        let mut namespaces = NamespaceTable::new();
        namespaces.insert("admin", dir.path().join("admin")).unwrap();
        let resolver = FsResolver::new("unused", ".tpl", namespaces);

        assert!(resolver.resolve("admin::users/list").is_ok());
        assert!(resolver.resolve("admin::users::list").is_ok());
    }

    #[test]
    fn test_resolve_undefined_namespace() {
        let resolver = FsResolver::new("templates", ".tpl", NamespaceTable::new());
        let err = resolver.resolve("shop::cart").unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedNamespace(ns) if ns == "shop"));
    }

    #[test]
    fn test_resolve_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let resolver = FsResolver::new(dir.path(), ".tpl", NamespaceTable::new());
        match resolver.resolve("nope") {
            Err(TemplateError::TemplateNotFound(path)) => {
                assert!(path.to_string_lossy().ends_with("/nope.tpl"));
            }
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_is_live() {
        let dir = TempDir::new().unwrap();
        let resolver = FsResolver::new(dir.path(), ".tpl", NamespaceTable::new());

        assert!(resolver.resolve("late").is_err());
        touch(dir.path(), "late.tpl");
        assert!(resolver.resolve("late").is_ok());
        fs::remove_file(dir.path().join("late.tpl")).unwrap();
        assert!(resolver.resolve("late").is_err());
    }

    #[test]
    fn test_directory_is_not_a_template() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("folder.tpl")).unwrap();
        let resolver = FsResolver::new(dir.path(), ".tpl", NamespaceTable::new());
        assert!(matches!(
            resolver.resolve("folder"),
            Err(TemplateError::TemplateNotFound(_))
        ));
    }
}
