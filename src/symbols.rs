//! The symbol table shared by the build, graft and render phases.

use indexmap::{IndexMap, IndexSet};

use crate::expr::Expr;

/// Kind of a documented symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Class,
    Function,
    /// Module-level constant, listed in its module's constants table.
    Field,
}

/// Pre-rendered content of a symbol, minus its name.
///
/// Headings are produced at render time because grafting may rename the
/// symbol after its fragment was built.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Module,
    Function {
        is_async: bool,
        /// Decorator and signature tables.
        tables: String,
    },
    Class {
        /// Decorator, bases and member tables.
        tables: String,
    },
    Field {
        /// Resolved or inferred type of the constant.
        type_hint: String,
    },
}

/// A documented entity keyed by its full dotted name.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub fragment: Fragment,
    /// Depth of the owning root module's dotted path.
    pub level: usize,
    /// The module that owns this symbol.
    pub root: String,
    /// Docstring with doctest sessions already fenced.
    pub docstring: Option<String>,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self.fragment {
            Fragment::Module => SymbolKind::Module,
            Fragment::Function { .. } => SymbolKind::Function,
            Fragment::Class { .. } => SymbolKind::Class,
            Fragment::Field { .. } => SymbolKind::Field,
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind() == SymbolKind::Module
    }
}

/// Depth of a dotted module name: `pkg` is 0, `pkg.sub` is 1.
pub fn module_level(name: &str) -> usize {
    name.matches('.').count()
}

/// Join dotted name parts, skipping empty ones.
pub fn join_name(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether `name` is `base` itself or lies below it.
pub fn is_within(name: &str, base: &str) -> bool {
    name == base
        || name
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Symbols, aliases and export sets of any number of modules.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub(crate) symbols: IndexMap<String, Symbol>,
    /// Full dotted name to the expression it currently denotes.
    pub(crate) aliases: IndexMap<String, Expr>,
    /// Module name to the full names listed in its `__all__`.
    pub(crate) exports: IndexMap<String, IndexSet<String>>,
}

impl SymbolTable {
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.symbols.iter()
    }

    pub fn alias(&self, name: &str) -> Option<&Expr> {
        self.aliases.get(name)
    }

    /// Export set of `module`; empty when it declares none.
    pub fn exports(&self, module: &str) -> Option<&IndexSet<String>> {
        self.exports.get(module)
    }

    pub fn is_module(&self, name: &str) -> bool {
        self.symbols.get(name).is_some_and(Symbol::is_module)
    }
}

/// The table after grafting: read-only, ready to filter and render.
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    pub(crate) table: SymbolTable,
}

impl ResolvedTable {
    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.table.symbol(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.symbols.contains_key(name)
    }
}
