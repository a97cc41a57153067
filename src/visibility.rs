//! Visibility rules and the document order of symbols.

use crate::symbols::{is_within, ResolvedTable};

/// Whether no component of a dotted name is private.
///
/// A component is private when it starts with an underscore and is not a
/// `__magic__` name.
pub fn is_public_family(name: &str) -> bool {
    name.split('.').all(|component| {
        let magic = component.len() >= 4 && component.starts_with("__") && component.ends_with("__");
        magic || !component.starts_with('_')
    })
}

/// `str.islower`: at least one cased character and no upper-case one.
fn is_lower(name: &str) -> bool {
    name.chars().any(char::is_lowercase) && !name.chars().any(char::is_uppercase)
}

/// Sort key of a symbol: shallow modules first, then case-insensitive
/// name, with an all-lower-case spelling before any other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    level: usize,
    folded: String,
    not_lower: bool,
}

impl SortKey {
    pub fn new(level: usize, name: &str) -> Self {
        Self {
            level,
            folded: name.to_lowercase(),
            not_lower: !is_lower(name),
        }
    }
}

impl ResolvedTable {
    /// Whether `name` is part of the documented public API.
    ///
    /// A module is public only when some non-module symbol below it is, so
    /// a package whose contents were all grafted away stays out of the
    /// document.
    pub fn is_public(&self, name: &str) -> bool {
        let Some(symbol) = self.table.symbol(name) else {
            return false;
        };
        if !self.is_visible(name, &symbol.root) {
            return false;
        }
        if !symbol.is_module() {
            return true;
        }
        self.table.symbols().any(|(child, descendant)| {
            !descendant.is_module()
                && is_within(child, name)
                && self.is_visible(child, &descendant.root)
        })
    }

    /// Visibility by name alone.
    ///
    /// Below a module that declares `__all__`, only the exported names and
    /// their direct members are visible, and the module itself when one of
    /// its exports exists. Otherwise no component of the name may be
    /// private.
    fn is_visible(&self, name: &str, root: &str) -> bool {
        match self.table.exports(root) {
            Some(exports) if !exports.is_empty() => {
                if name == root {
                    return exports.iter().any(|export| self.table.symbol(export).is_some());
                }
                let parent = name.rsplit_once('.').map(|(parent, _)| parent).unwrap_or(name);
                exports.contains(name) || exports.contains(parent)
            }
            _ => is_public_family(name),
        }
    }

    pub fn sort_key(&self, name: &str) -> SortKey {
        let level = self.table.symbol(name).map(|symbol| symbol.level).unwrap_or_default();
        SortKey::new(level, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ModuleSource, TableBuilder};

    fn resolved(modules: &[(&str, &str)]) -> ResolvedTable {
        let mut builder = TableBuilder::new();
        for (name, source) in modules {
            builder.parse(&ModuleSource::new(*name, *source)).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_public_family() {
        assert!(is_public_family("pkg.mod.func"));
        assert!(is_public_family("pkg.Class.__init__"));
        assert!(!is_public_family("pkg._private.func"));
        assert!(!is_public_family("pkg.mod._helper"));
        assert!(!is_public_family("pkg.__x"));
    }

    #[test]
    fn test_export_set_is_the_sole_authority() {
        let table = resolved(&[(
            "m",
            "__all__ = ['Foo']\nclass Foo:\n    def run(self): ...\nclass Bar: ...\n",
        )]);
        assert!(table.is_public("m"));
        assert!(table.is_public("m.Foo"));
        assert!(table.is_public("m.Foo.run"));
        assert!(!table.is_public("m.Bar"));
    }

    #[test]
    fn test_underscore_rule_without_export_set() {
        let table = resolved(&[("m", "def foo(): ...\ndef _bar(): ...\n")]);
        assert!(table.is_public("m.foo"));
        assert!(!table.is_public("m._bar"));
    }

    #[test]
    fn test_private_only_module_is_hidden() {
        let table = resolved(&[("m", "def _only(): ...\n"), ("n", "")]);
        assert!(!table.is_public("m"));
        assert!(!table.is_public("n"));
    }

    #[test]
    fn test_export_set_without_existing_names_hides_module() {
        let table = resolved(&[("m", "__all__ = ['Missing']\ndef foo(): ...\n")]);
        assert!(!table.is_public("m"));
        assert!(!table.is_public("m.foo"));
        assert!(table.sections("m").is_empty());
    }

    #[test]
    fn test_module_emptied_by_grafting_is_hidden() {
        let mut builder = TableBuilder::new();
        builder
            .parse(&ModuleSource::new("pkg", "from .a.b import Deep\n").package())
            .unwrap();
        builder
            .parse(&ModuleSource::new("pkg.a", "").package())
            .unwrap();
        builder
            .parse(&ModuleSource::new("pkg.a.b", "class Deep: ...\n"))
            .unwrap();
        let table = builder.finish();
        assert!(!table.is_public("pkg.a"));
        assert!(!table.is_public("pkg.a.b"));
        assert_eq!(table.sections("pkg"), vec!["pkg", "pkg.Deep"]);
    }

    #[test]
    fn test_sort_order() {
        let mut names = vec!["b", "B", "a", "A_b", "a_b"];
        names.sort_by_key(|name| SortKey::new(0, name));
        assert_eq!(names, vec!["a", "a_b", "A_b", "b", "B"]);

        assert!(SortKey::new(0, "z") < SortKey::new(1, "a"));
    }
}
