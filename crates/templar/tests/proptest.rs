//! Property-based tests for name resolution and section capture.

use std::path::PathBuf;

use proptest::prelude::*;
use templar::{FsResolver, NamespaceTable, SectionStore, TemplateError};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

proptest! {
    /// Names without `::` resolve to `dir + "/" + name + ext`.
    #[test]
    fn default_names_concatenate(
        parts in prop::collection::vec(segment(), 1..4),
        ext in "\\.[a-z]{1,5}",
    ) {
        let name = parts.join("/");
        let resolver = FsResolver::new("templates", ext.clone(), NamespaceTable::new());
        prop_assert_eq!(
            resolver.candidate(&name).unwrap(),
            PathBuf::from(format!("templates/{}{}", name, ext))
        );
    }

    /// `ns::a::b` and `ns::a/b` name the same file under the namespace root.
    #[test]
    fn namespaced_names_join_segments(
        ns in segment(),
        parts in prop::collection::vec(segment(), 1..4),
    ) {
        let mut namespaces = NamespaceTable::new();
        namespaces.insert(ns.clone(), "/srv/views").unwrap();
        let resolver = FsResolver::new("templates", ".tpl", namespaces);

        let expected = PathBuf::from(format!("/srv/views/{}.tpl", parts.join("/")));
        let colon_name = format!("{}::{}", ns, parts.join("::"));
        let slash_name = format!("{}::{}", ns, parts.join("/"));
        prop_assert_eq!(resolver.candidate(&colon_name).unwrap(), expected.clone());
        prop_assert_eq!(resolver.candidate(&slash_name).unwrap(), expected);
    }

    /// Unregistered namespaces always fail, naming the namespace.
    #[test]
    fn unknown_namespace_fails(ns in segment(), rest in segment()) {
        let resolver = FsResolver::new("templates", ".tpl", NamespaceTable::new());
        let err = resolver.candidate(&format!("{}::{}", ns, rest)).unwrap_err();
        prop_assert!(matches!(err, TemplateError::UndefinedNamespace(found) if found == ns));
    }

    /// Append and prepend over a sequence of captures build the expected text.
    #[test]
    fn capture_sequences_combine(ops in prop::collection::vec((any::<bool>(), "[a-z]{0,4}"), 1..8)) {
        let mut store = SectionStore::new();
        let mut expected = String::new();

        for (append, text) in &ops {
            if *append {
                store.append("s").unwrap();
                expected.push_str(text);
            } else {
                store.prepend("s").unwrap();
                expected.insert_str(0, text);
            }
            prop_assert!(store.write(text).is_none());
            store.stop().unwrap();
        }

        prop_assert_eq!(store.read("s"), Some(expected.as_str()));
    }
}
