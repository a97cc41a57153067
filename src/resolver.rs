//! Alias substitution and normalization of annotation expressions.

use indexmap::IndexMap;
use log::info;

use crate::expr::{Constant, Expr, Keyword};
use crate::pep585;
use crate::syntax::parse_expression;

/// Resolves names of one root module through the alias table.
///
/// The resolver never mutates the table; resolving the same expression
/// twice yields the same text.
pub struct Resolver<'a> {
    root: &'a str,
    aliases: &'a IndexMap<String, Expr>,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a str, aliases: &'a IndexMap<String, Expr>) -> Self {
        Self { root, aliases }
    }

    /// Resolve `expr` and return its canonical text.
    pub fn resolve(&self, expr: &Expr) -> String {
        self.resolve_expr(expr).to_string()
    }

    pub fn resolve_expr(&self, expr: &Expr) -> Expr {
        self.transform(expr, &mut Vec::new())
    }

    fn qualified(&self, id: &str) -> String {
        format!("{}.{}", self.root, id)
    }

    /// What a subscript or attribute base stands for: the alias target of
    /// a bare name (or the name itself), extended by attribute access.
    fn identity(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Name(id) => Some(
                self.aliases
                    .get(&self.qualified(id))
                    .and_then(Expr::dotted_path)
                    .unwrap_or_else(|| id.clone()),
            ),
            Expr::Attribute { value, attr } => self
                .identity(value)
                .map(|base| format!("{}.{}", base, attr)),
            _ => None,
        }
    }

    /// Substitute the alias value of a bare name.
    ///
    /// A value referring to its own name (`T = TypeVar('T')`, `import os`)
    /// is not substituted, and `visiting` stops indirect cycles.
    fn substitute(&self, id: &str, visiting: &mut Vec<String>) -> Option<Expr> {
        let key = self.qualified(id);
        let value = self.aliases.get(&key)?;
        if value.mentions(id) || visiting.contains(&key) {
            return None;
        }
        visiting.push(key);
        let resolved = self.transform(value, visiting);
        visiting.pop();
        Some(resolved)
    }

    fn transform_all(&self, items: &[Expr], visiting: &mut Vec<String>) -> Vec<Expr> {
        items
            .iter()
            .map(|item| self.transform(item, visiting))
            .collect()
    }

    fn transform(&self, expr: &Expr, visiting: &mut Vec<String>) -> Expr {
        match expr {
            Expr::Name(id) => self
                .substitute(id, visiting)
                .unwrap_or_else(|| expr.clone()),
            // forward reference; an indented one is not valid Python
            Expr::Constant(Constant::Str(text)) if !text.starts_with(char::is_whitespace) => {
                match parse_expression(text) {
                    Some(reference) => self.transform(&reference, visiting),
                    None => expr.clone(),
                }
            }
            Expr::Constant(_) | Expr::Raw(_) => expr.clone(),
            Expr::Attribute { value, attr } => {
                if self.identity(value).as_deref() == Some("typing") {
                    return Expr::Name(attr.clone());
                }
                Expr::Attribute {
                    value: Box::new(self.transform(value, visiting)),
                    attr: attr.clone(),
                }
            }
            Expr::Subscript { value, slice } => self.subscript(value, slice, visiting),
            Expr::Call {
                func,
                args,
                keywords,
            } => Expr::Call {
                func: Box::new(self.transform(func, visiting)),
                args: self.transform_all(args, visiting),
                keywords: keywords
                    .iter()
                    .map(|keyword| Keyword {
                        arg: keyword.arg.clone(),
                        value: self.transform(&keyword.value, visiting),
                    })
                    .collect(),
            },
            Expr::BinOp { left, op, right } => Expr::BinOp {
                left: Box::new(self.transform(left, visiting)),
                op: *op,
                right: Box::new(self.transform(right, visiting)),
            },
            Expr::UnaryOp { op, operand } => Expr::UnaryOp {
                op: *op,
                operand: Box::new(self.transform(operand, visiting)),
            },
            Expr::Tuple(items) => Expr::Tuple(self.transform_all(items, visiting)),
            Expr::List(items) => Expr::List(self.transform_all(items, visiting)),
            Expr::Set(items) => Expr::Set(self.transform_all(items, visiting)),
            Expr::Dict(pairs) => Expr::Dict(
                pairs
                    .iter()
                    .map(|(key, value)| {
                        (
                            key.as_ref().map(|key| self.transform(key, visiting)),
                            self.transform(value, visiting),
                        )
                    })
                    .collect(),
            ),
            Expr::Starred(value) => Expr::Starred(Box::new(self.transform(value, visiting))),
        }
    }

    fn subscript(&self, value: &Expr, slice: &Expr, visiting: &mut Vec<String>) -> Expr {
        let identity = self.identity(value);
        match identity.as_deref() {
            Some("typing.Union" | "Union") => {
                let items = match slice {
                    Expr::Tuple(items) if !items.is_empty() => items.as_slice(),
                    other => std::slice::from_ref(other),
                };
                let mut members = items.iter().map(|item| self.transform(item, visiting));
                let first = members.next();
                let rest: Vec<Expr> = members.collect();
                if let Some(first) = first {
                    return rest.into_iter().fold(first, Expr::bit_or);
                }
            }
            Some("typing.Optional" | "Optional") => {
                return Expr::bit_or(
                    self.transform(slice, visiting),
                    Expr::Constant(Constant::None),
                );
            }
            // literal values are not forward references
            Some("typing.Literal" | "Literal") => {
                return Expr::Subscript {
                    value: Box::new(self.transform(value, visiting)),
                    slice: Box::new(slice.clone()),
                };
            }
            Some(name) => {
                if let Some(replacement) = pep585::replacement(name) {
                    info!(
                        "Deprecated alias {} in '{}', recommended to use {}",
                        name, self.root, replacement
                    );
                    return Expr::Subscript {
                        value: Box::new(Expr::dotted(replacement)),
                        slice: Box::new(self.transform(slice, visiting)),
                    };
                }
            }
            None => {}
        }
        Expr::Subscript {
            value: Box::new(self.transform(value, visiting)),
            slice: Box::new(self.transform(slice, visiting)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases(pairs: &[(&str, &str)]) -> IndexMap<String, Expr> {
        pairs
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    parse_expression(value).unwrap_or_else(|| Expr::Raw(value.to_string())),
                )
            })
            .collect()
    }

    fn resolve(table: &IndexMap<String, Expr>, text: &str) -> String {
        let expr = parse_expression(text).unwrap();
        Resolver::new("m", table).resolve(&expr)
    }

    #[test]
    fn test_union_and_optional() {
        let table = aliases(&[("m.typing", "typing"), ("m.Union", "typing.Union")]);
        assert_eq!(resolve(&table, "Union[A, B, C]"), "A | B | C");
        assert_eq!(resolve(&table, "typing.Optional[int]"), "int | None");
        assert_eq!(resolve(&table, "Union[int]"), "int");
    }

    #[test]
    fn test_import_alias_substitution() {
        let table = aliases(&[
            ("m.List", "typing.List"),
            ("m.np", "numpy"),
            ("m.os", "os"),
        ]);
        assert_eq!(resolve(&table, "List[int]"), "list[int]");
        assert_eq!(resolve(&table, "List"), "List");
        assert_eq!(resolve(&table, "np.ndarray"), "numpy.ndarray");
        assert_eq!(resolve(&table, "os.PathLike"), "os.PathLike");
    }

    #[test]
    fn test_type_alias_chain() {
        let table = aliases(&[("m.Vec", "list[float]"), ("m.Pair", "tuple[Vec, Vec]")]);
        assert_eq!(resolve(&table, "Pair"), "tuple[list[float], list[float]]");
    }

    #[test]
    fn test_self_reference_is_not_substituted() {
        let table = aliases(&[("m.T", "TypeVar('T')"), ("m.S", "Set[str]")]);
        assert_eq!(resolve(&table, "list[T]"), "list[T]");
        assert_eq!(resolve(&table, "S"), "Set[str]");
    }

    #[test]
    fn test_indirect_cycle_terminates() {
        let table = aliases(&[("m.A", "B"), ("m.B", "A")]);
        assert_eq!(resolve(&table, "A"), "A");
    }

    #[test]
    fn test_forward_references_and_literals() {
        let table = aliases(&[("m.Alias", "int")]);
        assert_eq!(resolve(&table, "list['Alias']"), "list[int]");
        assert_eq!(resolve(&table, "'not an expression!'"), "'not an expression!'");
        assert_eq!(resolve(&table, "list[' Alias']"), "list[' Alias']");
        assert_eq!(
            resolve(&table, "Literal['Alias', 'b']"),
            "Literal['Alias', 'b']"
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let table = aliases(&[("m.typing", "typing")]);
        let once = resolve(&table, "typing.Dict[str, typing.Optional[int]]");
        assert_eq!(once, "dict[str, int | None]");
        assert_eq!(resolve(&table, &once), once);
    }
}
