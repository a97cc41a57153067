//! Re-export grafting.
//!
//! A package that imports a symbol from one of its submodules re-exports
//! it: the symbol and everything below it move to the package namespace,
//! documented once, under the name the package gives it.

use log::{debug, warn};
use std::collections::HashSet;

use crate::builder::TableBuilder;
use crate::expr::Expr;
use crate::symbols::{is_within, join_name, ResolvedTable, SymbolTable};

impl TableBuilder {
    /// Graft every re-exported symbol and freeze the table.
    ///
    /// Grafting repeats until no alias is eligible, so a symbol re-exported
    /// through several package levels ends up in the outermost one.
    pub fn finish(self) -> ResolvedTable {
        let mut table = self.table;
        let mut skipped = HashSet::new();
        let mut grafted = 0;
        loop {
            let candidates: Vec<(String, String)> = table
                .aliases
                .iter()
                .filter(|(alias, _)| !skipped.contains(*alias))
                .filter_map(|(alias, value)| {
                    let (module, _) = alias.rsplit_once('.')?;
                    let target = target_name(&table, module, value)?;
                    Some((alias.clone(), target))
                })
                .collect();
            let mut changed = false;
            for (alias, target) in candidates {
                // an earlier graft of this round may have moved the target
                if !is_eligible(&table, &alias, &target) {
                    continue;
                }
                match graft(&mut table, &alias, &target) {
                    Ok(moved) => {
                        grafted += moved;
                        changed = true;
                    }
                    Err(taken) => {
                        warn!(
                            "Cannot graft {} as {}: '{}' is already documented",
                            target, alias, taken
                        );
                        skipped.insert(alias);
                    }
                }
            }
            if !changed {
                break;
            }
        }
        if grafted > 0 {
            debug!("Grafted {} symbols", grafted);
        }
        ResolvedTable { table }
    }
}

/// The full name an alias value refers to, qualifying its first component
/// through the aliases of `module` (`sub.Target` after `from . import sub`).
fn target_name(table: &SymbolTable, module: &str, value: &Expr) -> Option<String> {
    let path = value.dotted_path()?;
    let (head, rest) = path.split_once('.').unwrap_or((path.as_str(), ""));
    match table
        .aliases
        .get(&join_name(&[module, head]))
        .and_then(Expr::dotted_path)
    {
        Some(base) if base != head => Some(join_name(&[&base, rest])),
        _ => Some(path.clone()),
    }
}

/// Whether `alias` (recorded in module `M`) may take over `target`.
///
/// The target must be a non-module symbol declared directly in its owning
/// module `R`, and `R` must lie strictly below the loaded module `M`.
fn is_eligible(table: &SymbolTable, alias: &str, target: &str) -> bool {
    if alias == target {
        return false;
    }
    let Some(symbol) = table.symbols.get(target) else {
        return false;
    };
    if symbol.is_module() {
        return false;
    }
    let declared_at_top = target
        .strip_prefix(symbol.root.as_str())
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|local| !local.contains('.'));
    if !declared_at_top {
        return false;
    }
    let Some((module, _)) = alias.rsplit_once('.') else {
        return false;
    };
    table.is_module(module) && symbol.root != module && is_within(&symbol.root, module)
}

/// Move `target` and its descendants under `alias`.
///
/// Returns the number of moved entries, or the first new name that is
/// already taken, in which case nothing moves.
fn graft(table: &mut SymbolTable, alias: &str, target: &str) -> Result<usize, String> {
    let moved: Vec<String> = table
        .symbols
        .keys()
        .filter(|name| is_within(name, target))
        .cloned()
        .collect();
    let renamed: Vec<String> = moved
        .iter()
        .map(|name| format!("{}{}", alias, &name[target.len()..]))
        .collect();
    if let Some(taken) = renamed
        .iter()
        .find(|name| table.symbols.contains_key(*name) && !moved.contains(name))
    {
        return Err(taken.clone());
    }

    let module = alias.rsplit_once('.').map(|(module, _)| module).unwrap_or(alias);
    let level = table
        .symbols
        .get(module)
        .map(|symbol| symbol.level)
        .unwrap_or_default();
    for (old, new) in moved.iter().zip(renamed) {
        if let Some(mut symbol) = table.symbols.shift_remove(old) {
            debug!("graft {} -> {}", old, new);
            symbol.root = module.to_string();
            symbol.level = level;
            table.symbols.insert(new, symbol);
        }
    }
    Ok(moved.len())
}

#[cfg(test)]
mod tests {
    use crate::builder::{ModuleSource, TableBuilder};
    use crate::symbols::ResolvedTable;

    fn finish(modules: &[(&str, &str, bool)]) -> ResolvedTable {
        let mut builder = TableBuilder::new();
        for (name, source, is_package) in modules {
            let mut module = ModuleSource::new(*name, *source);
            if *is_package {
                module = module.package();
            }
            builder.parse(&module).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_graft_moves_whole_subtree() {
        let table = finish(&[
            ("pkg", "from .sub import Target as Alias\n", true),
            ("pkg.sub", "class Target:\n    def method(self): ...\n", false),
        ]);
        assert!(table.contains("pkg.Alias"));
        assert!(table.contains("pkg.Alias.method"));
        assert!(!table.contains("pkg.sub.Target"));
        assert!(!table.contains("pkg.sub.Target.method"));

        let alias = table.symbol("pkg.Alias.method").unwrap();
        assert_eq!(alias.root, "pkg");
        assert_eq!(alias.level, 0);
    }

    #[test]
    fn test_chained_reexports_reach_outermost_package() {
        let table = finish(&[
            ("a", "from .b import f\n", true),
            ("a.b", "from .c import f\n", true),
            ("a.b.c", "def f(): ...\n", false),
        ]);
        assert!(table.contains("a.f"));
        assert!(!table.contains("a.b.f"));
        assert!(!table.contains("a.b.c.f"));
        assert_eq!(table.symbol("a.f").unwrap().level, 0);
    }

    #[test]
    fn test_attribute_alias_through_module_import() {
        let table = finish(&[
            ("pkg", "from . import sub\nHandle = sub.Handle\n", true),
            ("pkg.sub", "class Handle: ...\n", false),
        ]);
        assert!(table.contains("pkg.Handle"));
        assert!(!table.contains("pkg.sub.Handle"));
    }

    #[test]
    fn test_only_ancestor_packages_graft() {
        let table = finish(&[
            ("pkg", "from .sub import Outer\n", true),
            ("pkg.sub", "class Outer:\n    class Inner: ...\n", false),
            ("pkg.other", "from .sub import Outer\nfrom .sub import Outer as O2\n", false),
        ]);
        // `pkg.other` is a sibling of `pkg.sub`, only the package re-exports
        assert!(table.contains("pkg.Outer"));
        assert!(table.contains("pkg.Outer.Inner"));
        assert!(!table.contains("pkg.other.Outer"));
        assert!(!table.contains("pkg.other.O2"));
    }

    #[test]
    fn test_collision_keeps_original() {
        let table = finish(&[
            ("pkg", "from .sub import f\ndef f(): ...\n", true),
            ("pkg.sub", "def f(): ...\n", false),
        ]);
        assert!(table.contains("pkg.f"));
        assert!(table.contains("pkg.sub.f"));
    }

    #[test]
    fn test_prefix_without_dot_boundary_is_not_moved() {
        let table = finish(&[
            ("pkg", "from .sub import run\n", true),
            ("pkg.sub", "def run(): ...\ndef run_all(): ...\n", false),
        ]);
        assert!(table.contains("pkg.run"));
        assert!(table.contains("pkg.sub.run_all"));
        assert!(!table.contains("pkg.run_all"));
    }
}
