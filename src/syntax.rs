//! Python source front-end.
//!
//! Source text is parsed with tree-sitter and lowered into an owned
//! declaration tree holding only what the symbol table builder walks:
//! imports, global assignments, functions and classes.
mod lower;

pub(crate) use lower::clean_docstring;

use log::debug;
use std::cell::RefCell;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::{ApiError, Result};
use crate::expr::Expr;

/// Declarations of one module, in source order.
#[derive(Debug, Clone, Default)]
pub struct ModuleAst {
    pub docstring: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `import a.b` / `import a.b as c`
    Import(Vec<ImportName>),
    /// `from ..m import x as y`; `level` counts the leading dots.
    ImportFrom {
        module: Option<String>,
        level: usize,
        names: Vec<ImportName>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
    },
    /// `type Name = value`
    TypeAlias {
        name: String,
        value: Expr,
    },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportName {
    pub name: String,
    pub asname: Option<String>,
}

impl ImportName {
    /// The name bound in the importing namespace.
    pub fn bound_name(&self) -> &str {
        self.asname.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub decorators: Vec<Expr>,
    pub args: Arguments,
    pub returns: Option<Expr>,
    pub docstring: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Arguments {
    pub posonly: Vec<Param>,
    pub args: Vec<Param>,
    pub vararg: Option<Param>,
    pub kwonly: Vec<Param>,
    pub kwarg: Option<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub docstring: Option<String>,
}

thread_local! {
    static PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn parse_tree(source: &str) -> Result<Option<Tree>> {
    PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let language: Language = tree_sitter_python::LANGUAGE.into();
            let mut parser = Parser::new();
            parser.set_language(&language)?;
            *slot = Some(parser);
        }
        Ok(slot.as_mut().and_then(|parser| parser.parse(source, None)))
    })
}

/// Locate the first `ERROR` or `MISSING` node below `node`.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(first_error)
        .or(Some(node))
}

/// Statement children of a `module` or `block`, comments skipped.
fn statements<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Locate the first construct the grammar accepts but Python rejects:
/// Python 2 `print`/`exec` statements, a block not indented below its
/// header, or an indented statement at module level.
fn first_rejected(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "print_statement" | "exec_statement" => return Some(node),
        "module" => {
            let mut previous_row = None;
            for stmt in statements(node) {
                let start = stmt.start_position();
                // `a = 1; b = 2` shares a line
                if previous_row != Some(start.row) && start.column != 0 {
                    return Some(stmt);
                }
                previous_row = Some(stmt.end_position().row);
            }
        }
        "function_definition" | "class_definition" if node.child_by_field_name("body").is_none() => {
            return Some(node);
        }
        "block" => {
            let header = node.parent().map(|parent| parent.start_position().column);
            match (header, statements(node).first()) {
                (_, None) => return Some(node),
                (Some(header), Some(first)) if first.start_position().column <= header => {
                    return Some(*first);
                }
                _ => {}
            }
        }
        _ => {}
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(first_rejected)
}

/// Parse the source of module `module` into its declaration tree.
///
/// Any syntax error aborts with [`ApiError::Syntax`] pointing at the first
/// offending node.
pub fn parse_module(module: &str, source: &str) -> Result<ModuleAst> {
    let syntax_error = |line: usize, column: usize| ApiError::Syntax {
        module: module.to_string(),
        line,
        column,
    };
    let tree = parse_tree(source)?.ok_or_else(|| syntax_error(1, 1))?;
    let root = tree.root_node();
    if let Some(bad) = first_error(root).or_else(|| first_rejected(root)) {
        let position = bad.start_position();
        return Err(syntax_error(position.row + 1, position.column + 1));
    }

    let lowering = lower::Lowering::new(source);
    let ast = lowering.module(root);
    debug!(
        "Parsed module {} ({} top-level declarations)",
        module,
        ast.body.len()
    );
    Ok(ast)
}

/// Parse `text` as one standalone expression.
///
/// Returns `None` when the text is not exactly one expression, which is how
/// string literals that are not forward references are told apart.
pub fn parse_expression(text: &str) -> Option<Expr> {
    let tree = parse_tree(text).ok().flatten()?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    lower::Lowering::new(text).single_expression(root)
}
