use log::debug;
use std::collections::{BTreeMap, HashMap};

use crate::error::{ApiError, Result};
use crate::expr::{Constant, Expr};
use crate::markdown::{code, doctest, table};
use crate::pep585;
use crate::resolver::Resolver;
use crate::symbols::{join_name, module_level, Fragment, Symbol, SymbolTable};
use crate::syntax::{self, clean_docstring, Arguments, ClassDef, FunctionDef, ModuleAst, Param, Stmt};

/// Source text of one module, as handed over by the loading layer.
#[derive(Debug, Clone)]
pub struct ModuleSource {
    /// Fully-qualified dotted module name.
    pub name: String,
    pub source: String,
    /// Whether the module is a package `__init__`, which anchors its
    /// relative imports at itself instead of its parent.
    pub is_package: bool,
}

impl ModuleSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            is_package: false,
        }
    }

    pub fn package(mut self) -> Self {
        self.is_package = true;
        self
    }
}

/// A provider of runtime docstrings, used to backfill symbols whose
/// source carries none.
pub trait DocstringSource {
    /// Docstring of the attribute at dotted `path` below `module`; an
    /// empty path denotes the module itself.
    fn docstring(&self, module: &str, path: &str) -> Option<String>;
}

/// Flat map from full dotted name to docstring.
impl DocstringSource for HashMap<String, String> {
    fn docstring(&self, module: &str, path: &str) -> Option<String> {
        self.get(&join_name(&[module, path])).cloned()
    }
}

/// Populates a [`SymbolTable`] module by module.
///
/// The builder is consumed by [`TableBuilder::finish`], which grafts
/// re-exports and hands out the read-only table used for rendering.
#[derive(Debug, Default)]
pub struct TableBuilder {
    pub(crate) table: SymbolTable,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Parse a module's source and add its declarations.
    pub fn parse(&mut self, module: &ModuleSource) -> Result<()> {
        let ast = syntax::parse_module(&module.name, &module.source)?;
        self.load(&module.name, module.is_package, &ast)
    }

    /// Add the declarations of an already parsed module.
    pub fn load(&mut self, root: &str, is_package: bool, ast: &ModuleAst) -> Result<()> {
        if self.table.is_module(root) {
            return Err(ApiError::DuplicateSymbol(root.to_string()));
        }
        let before = self.table.symbols.len();
        self.table.symbols.insert(
            root.to_string(),
            Symbol {
                fragment: Fragment::Module,
                level: module_level(root),
                root: root.to_string(),
                docstring: ast.docstring.as_deref().map(doctest),
            },
        );
        self.table.exports.entry(root.to_string()).or_default();

        for stmt in &ast.body {
            match stmt {
                Stmt::Import(_) | Stmt::ImportFrom { .. } => self.import(root, is_package, stmt),
                Stmt::Assign { .. } | Stmt::AnnAssign { .. } => self.global(root, stmt),
                Stmt::TypeAlias { name, value } => {
                    self.table
                        .aliases
                        .insert(join_name(&[root, name]), value.clone());
                }
                Stmt::FunctionDef(_) | Stmt::ClassDef(_) => {}
            }
        }
        for stmt in &ast.body {
            match stmt {
                Stmt::FunctionDef(def) => self.function(root, "", def),
                Stmt::ClassDef(def) => self.class(root, "", def),
                _ => {}
            }
        }

        debug!(
            "Loaded module {} ({} symbols)",
            root,
            self.table.symbols.len() - before
        );
        Ok(())
    }

    fn import(&mut self, root: &str, is_package: bool, stmt: &Stmt) {
        match stmt {
            Stmt::Import(names) => {
                for name in names {
                    self.table
                        .aliases
                        .insert(join_name(&[root, name.bound_name()]), Expr::dotted(&name.name));
                }
            }
            Stmt::ImportFrom {
                module,
                level,
                names,
            } => {
                let module = module.as_deref().unwrap_or_default();
                let base = relative_base(root, is_package, *level);
                for name in names {
                    let target = join_name(&[&base, module, &name.name]);
                    self.table
                        .aliases
                        .insert(join_name(&[root, name.bound_name()]), Expr::dotted(&target));
                }
            }
            _ => {}
        }
    }

    /// Record a module-level assignment as an alias, a constant and,
    /// for `__all__`, the export set.
    fn global(&mut self, root: &str, stmt: &Stmt) {
        let (id, value, annotation) = match stmt {
            Stmt::AnnAssign {
                target: Expr::Name(id),
                annotation,
                value: Some(value),
            } => (id, value, Some(annotation)),
            Stmt::Assign {
                target: Expr::Name(id),
                value,
            } => (id, value, None),
            _ => return,
        };
        let name = join_name(&[root, id]);
        self.table.aliases.insert(name.clone(), value.clone());

        if is_upper(id) {
            let type_hint = match annotation {
                Some(annotation) => Resolver::new(root, &self.table.aliases).resolve(annotation),
                None => const_type(value),
            };
            let keep_previous = matches!(
                self.table.symbols.get(&name),
                Some(Symbol { fragment: Fragment::Field { type_hint: previous }, .. }) if previous != "Any"
            );
            if !keep_previous {
                self.table.symbols.insert(
                    name,
                    Symbol {
                        fragment: Fragment::Field { type_hint },
                        level: module_level(root),
                        root: root.to_string(),
                        docstring: None,
                    },
                );
            }
        }

        if id == "__all__" {
            if let Expr::Tuple(items) | Expr::List(items) = value {
                let exports = self.table.exports.entry(root.to_string()).or_default();
                for item in items {
                    if let Expr::Constant(Constant::Str(export)) = item {
                        exports.insert(join_name(&[root, export]));
                    }
                }
            }
        }
    }

    fn function(&mut self, root: &str, prefix: &str, def: &FunctionDef) {
        let name = join_name(&[root, prefix, &def.name]);
        let tables = {
            let resolver = Resolver::new(root, &self.table.aliases);
            let decorators: Vec<String> = def
                .decorators
                .iter()
                .map(|decorator| format!("@{}", resolver.resolve(decorator)))
                .collect();
            let mut tables = String::new();
            if !decorators.is_empty() {
                tables.push_str(&table(
                    &["Decorators"],
                    decorators.iter().map(|decorator| vec![code(decorator)]),
                ));
            }
            let is_classmethod =
                !prefix.is_empty() && decorators.iter().any(|d| d == "@classmethod");
            tables.push_str(&signature_table(
                &resolver,
                &def.args,
                def.returns.as_ref(),
                is_classmethod,
            ));
            tables
        };
        self.table.symbols.insert(
            name,
            Symbol {
                fragment: Fragment::Function {
                    is_async: def.is_async,
                    tables,
                },
                level: module_level(root),
                root: root.to_string(),
                docstring: def.docstring.as_deref().map(doctest),
            },
        );
    }

    fn class(&mut self, root: &str, prefix: &str, def: &ClassDef) {
        let name = join_name(&[root, prefix, &def.name]);
        let tables = {
            let resolver = Resolver::new(root, &self.table.aliases);
            let mut tables = String::new();
            let decorators: Vec<String> = def
                .decorators
                .iter()
                .map(|decorator| format!("@{}", resolver.resolve(decorator)))
                .collect();
            if !decorators.is_empty() {
                tables.push_str(&table(
                    &["Decorators"],
                    decorators.iter().map(|decorator| vec![code(decorator)]),
                ));
            }
            let bases: Vec<String> = def.bases.iter().map(|base| resolver.resolve(base)).collect();
            if !bases.is_empty() {
                tables.push_str(&table(
                    &["Bases"],
                    bases.iter().map(|base| vec![code(base)]),
                ));
            }
            let is_enum = bases.iter().any(|base| base.starts_with("enum."));
            tables.push_str(&member_table(&resolver, &def.body, is_enum));
            tables
        };
        self.table.symbols.insert(
            name,
            Symbol {
                fragment: Fragment::Class { tables },
                level: module_level(root),
                root: root.to_string(),
                docstring: def.docstring.as_deref().map(doctest),
            },
        );

        let nested = join_name(&[prefix, &def.name]);
        for stmt in &def.body {
            match stmt {
                Stmt::FunctionDef(method) => self.function(root, &nested, method),
                Stmt::ClassDef(inner) => self.class(root, &nested, inner),
                _ => {}
            }
        }
    }

    /// Fold an independently built table into this one.
    ///
    /// Fails on the first symbol or alias defined by both tables, before
    /// anything is moved.
    pub fn merge(&mut self, other: TableBuilder) -> Result<()> {
        if let Some(name) = other
            .table
            .symbols
            .keys()
            .find(|name| self.table.symbols.contains_key(*name))
        {
            return Err(ApiError::DuplicateSymbol(name.clone()));
        }
        if let Some(name) = other
            .table
            .aliases
            .keys()
            .find(|name| self.table.aliases.contains_key(*name))
        {
            return Err(ApiError::DuplicateAlias(name.clone()));
        }
        let SymbolTable {
            symbols,
            aliases,
            exports,
        } = other.table;
        self.table.symbols.extend(symbols);
        self.table.aliases.extend(aliases);
        for (module, names) in exports {
            self.table.exports.entry(module).or_default().extend(names);
        }
        Ok(())
    }

    /// Fill in missing docstrings of `module`'s symbols from `source`.
    ///
    /// Returns how many docstrings were added.
    pub fn load_docstring(&mut self, module: &str, source: &dyn DocstringSource) -> usize {
        let mut added = 0;
        for (name, symbol) in self.table.symbols.iter_mut() {
            if symbol.root != module
                || symbol.docstring.is_some()
                || matches!(symbol.fragment, Fragment::Field { .. })
            {
                continue;
            }
            let path = name
                .strip_prefix(module)
                .unwrap_or(name)
                .trim_start_matches('.');
            if let Some(doc) = source.docstring(module, path) {
                symbol.docstring = Some(doctest(&clean_docstring(&doc)));
                added += 1;
            }
        }
        if added > 0 {
            debug!("Backfilled {} docstrings of {}", added, module);
        }
        added
    }
}

/// Package that relative imports with `level` leading dots start from.
fn relative_base(root: &str, is_package: bool, level: usize) -> String {
    if level == 0 {
        return String::new();
    }
    let mut base = if is_package { root } else { parent(root) };
    for _ in 1..level {
        base = parent(base);
    }
    base.to_string()
}

fn parent(name: &str) -> &str {
    name.rsplit_once('.').map(|(parent, _)| parent).unwrap_or_default()
}

/// `str.isupper`: at least one cased character and no lower-case one.
fn is_upper(name: &str) -> bool {
    name.chars().any(char::is_uppercase) && !name.chars().any(char::is_lowercase)
}

/// Parameter, annotation and default columns of a function.
fn signature_table(
    resolver: &Resolver<'_>,
    args: &Arguments,
    returns: Option<&Expr>,
    is_classmethod: bool,
) -> String {
    let first = args.posonly.first().or(args.args.first());
    let annotate = |param: &Param| -> String {
        if param.name == "self" {
            return "Self".to_string();
        }
        match &param.annotation {
            Some(annotation) => resolver.resolve(annotation),
            None if is_classmethod && first == Some(param) => "type[Self]".to_string(),
            None => "Any".to_string(),
        }
    };

    // (title, annotation, default)
    let mut columns: Vec<(String, String, Option<&Expr>)> = Vec::new();
    for param in &args.posonly {
        columns.push((param.name.clone(), annotate(param), param.default.as_ref()));
    }
    if !args.posonly.is_empty() {
        columns.push(("/".to_string(), String::new(), None));
    }
    for param in &args.args {
        columns.push((param.name.clone(), annotate(param), param.default.as_ref()));
    }
    match &args.vararg {
        Some(param) => columns.push((format!("*{}", param.name), annotate(param), None)),
        None if !args.kwonly.is_empty() => columns.push(("*".to_string(), String::new(), None)),
        None => {}
    }
    for param in &args.kwonly {
        columns.push((param.name.clone(), annotate(param), param.default.as_ref()));
    }
    if let Some(param) = &args.kwarg {
        columns.push((format!("**{}", param.name), annotate(param), None));
    }
    let returns = returns
        .map(|returns| resolver.resolve(returns))
        .unwrap_or_else(|| "Any".to_string());
    columns.push(("return".to_string(), returns, None));

    let titles: Vec<&str> = columns.iter().map(|(title, _, _)| title.as_str()).collect();
    let mut rows = vec![columns.iter().map(|(_, ty, _)| code(ty)).collect::<Vec<_>>()];
    if columns.iter().any(|(_, _, default)| default.is_some()) {
        rows.push(
            columns
                .iter()
                .map(|(_, _, default)| match default {
                    Some(default) => code(&default.to_string()),
                    None => " ".to_string(),
                })
                .collect(),
        );
    }
    table(&titles, rows)
}

/// `Enums` table of an enum class, `Members | Type` table otherwise.
fn member_table(resolver: &Resolver<'_>, body: &[Stmt], is_enum: bool) -> String {
    let mut enums = Vec::new();
    let mut members = BTreeMap::new();
    for stmt in body {
        let (attr, type_hint) = match stmt {
            Stmt::AnnAssign {
                target: Expr::Name(attr),
                ..
            } if is_enum => (attr, String::new()),
            Stmt::AnnAssign {
                target: Expr::Name(attr),
                annotation,
                ..
            } => (attr, resolver.resolve(annotation)),
            Stmt::Assign {
                target: Expr::Name(attr),
                value,
            } => (attr, const_type(value)),
            _ => continue,
        };
        if is_enum {
            enums.push(attr.clone());
        } else if crate::visibility::is_public_family(attr) {
            members.insert(attr.clone(), type_hint);
        }
    }
    if !enums.is_empty() {
        table(&["Enums"], enums.into_iter().map(|name| vec![name]))
    } else if !members.is_empty() {
        table(
            &["Members", "Type"],
            members
                .iter()
                .map(|(name, type_hint)| vec![code(name), code(type_hint)]),
        )
    } else {
        String::new()
    }
}

/// Type of a literal value, as documented for constants and members.
pub fn const_type(value: &Expr) -> String {
    match value {
        Expr::Constant(constant) => constant.type_name().to_string(),
        Expr::Tuple(items) => format!("tuple{}", element_types(&[items.iter().collect()])),
        Expr::List(items) => format!("list{}", element_types(&[items.iter().collect()])),
        Expr::Set(items) => format!("set{}", element_types(&[items.iter().collect()])),
        Expr::Dict(pairs) => {
            let mut keys = Vec::with_capacity(pairs.len());
            for (key, _) in pairs {
                match key {
                    Some(key) => keys.push(key),
                    None => return "dict".to_string(),
                }
            }
            let values = pairs.iter().map(|(_, value)| value).collect();
            format!("dict{}", element_types(&[keys, values]))
        }
        Expr::Call { func, .. } => func
            .dotted_path()
            .filter(|name| pep585::is_constructor(name))
            .unwrap_or_else(|| "Any".to_string()),
        _ => "Any".to_string(),
    }
}

/// `[int, str]`-style parameters of a homogeneous literal container, or
/// nothing when an element group is empty or not made of literals.
fn element_types(groups: &[Vec<&Expr>]) -> String {
    let mut types = Vec::with_capacity(groups.len());
    for group in groups {
        let mut current: Option<&str> = None;
        for element in group {
            let Expr::Constant(constant) = element else {
                return String::new();
            };
            let element_type = constant.type_name();
            match current {
                Some(previous) if previous != element_type => {
                    current = Some("Any");
                    break;
                }
                _ => current = Some(element_type),
            }
        }
        match current {
            Some(element_type) => types.push(element_type),
            None => return String::new(),
        }
    }
    format!("[{}]", types.join(", "))
}
