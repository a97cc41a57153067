//! Lowering of tree-sitter nodes into the declaration tree.

use std::iter::Peekable;
use std::str::Chars;
use tree_sitter::Node;

use super::{
    parse_expression, Arguments, ClassDef, FunctionDef, ImportName, ModuleAst, Param, Stmt,
};
use crate::expr::{Constant, Expr, Keyword, Operator, UnaryOperator};

/// Named children of `node`, without comments and line continuations.
fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "comment" | "line_continuation"))
        .collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

pub(super) struct Lowering<'s> {
    source: &'s str,
}

impl<'s> Lowering<'s> {
    pub(super) fn new(source: &'s str) -> Self {
        Self { source }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    /// Dotted names may be spelled with inner whitespace (`os . path`).
    fn dotted(&self, node: Node<'_>) -> String {
        self.text(node).split_whitespace().collect()
    }

    pub(super) fn module(&self, root: Node<'_>) -> ModuleAst {
        let statements = named_children(root);
        ModuleAst {
            docstring: self.docstring(&statements),
            body: self.statements(&statements),
        }
    }

    pub(super) fn single_expression(&self, root: Node<'_>) -> Option<Expr> {
        let statements = named_children(root);
        let [statement] = statements.as_slice() else {
            return None;
        };
        if statement.kind() != "expression_statement" {
            return None;
        }
        let mut parts = named_children(*statement);
        if parts
            .iter()
            .any(|p| matches!(p.kind(), "assignment" | "augmented_assignment" | "yield"))
        {
            return None;
        }
        match parts.len() {
            0 => None,
            1 => parts.pop().map(|p| self.expr(p)),
            _ => Some(Expr::Tuple(parts.into_iter().map(|p| self.expr(p)).collect())),
        }
    }

    fn docstring(&self, statements: &[Node<'_>]) -> Option<String> {
        let first = statements.first()?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let parts = named_children(*first);
        let [literal] = parts.as_slice() else {
            return None;
        };
        if !matches!(literal.kind(), "string" | "concatenated_string") {
            return None;
        }
        match self.expr(*literal) {
            Expr::Constant(Constant::Str(doc)) => Some(clean_docstring(&doc)),
            _ => None,
        }
    }

    fn statements(&self, nodes: &[Node<'_>]) -> Vec<Stmt> {
        let mut out = Vec::new();
        for node in nodes {
            self.statement(*node, &mut out);
        }
        out
    }

    fn statement(&self, node: Node<'_>, out: &mut Vec<Stmt>) {
        match node.kind() {
            "import_statement" => out.push(Stmt::Import(self.import_names(node))),
            "import_from_statement" => out.push(self.import_from(node)),
            "expression_statement" => {
                let first = named_children(node).into_iter().next();
                if let Some(assignment) = first.filter(|n| n.kind() == "assignment") {
                    out.extend(self.assignment(assignment));
                }
            }
            "type_alias_statement" => out.extend(self.type_alias(node)),
            "function_definition" => out.push(Stmt::FunctionDef(self.function(node, Vec::new()))),
            "class_definition" => out.push(Stmt::ClassDef(self.class(node, Vec::new()))),
            "decorated_definition" => out.extend(self.decorated(node)),
            "if_statement" | "try_statement" => self.flatten(node, out),
            _ => {}
        }
    }

    /// Hoist the statements of every branch of an `if`/`try` statement.
    fn flatten(&self, node: Node<'_>, out: &mut Vec<Stmt>) {
        for child in named_children(node) {
            match child.kind() {
                "block" => {
                    for statement in named_children(child) {
                        self.statement(statement, out);
                    }
                }
                "elif_clause" | "else_clause" | "except_clause" | "except_group_clause"
                | "finally_clause" => self.flatten(child, out),
                _ => {}
            }
        }
    }

    fn import_name(&self, node: Node<'_>) -> Option<ImportName> {
        match node.kind() {
            "dotted_name" => Some(ImportName {
                name: self.dotted(node),
                asname: None,
            }),
            "aliased_import" => Some(ImportName {
                name: self.dotted(node.child_by_field_name("name")?),
                asname: node
                    .child_by_field_name("alias")
                    .map(|alias| self.text(alias).to_string()),
            }),
            _ => None,
        }
    }

    fn import_names(&self, node: Node<'_>) -> Vec<ImportName> {
        field_children(node, "name")
            .into_iter()
            .filter_map(|name| self.import_name(name))
            .collect()
    }

    fn import_from(&self, node: Node<'_>) -> Stmt {
        let (module, level) = match node.child_by_field_name("module_name") {
            Some(m) if m.kind() == "relative_import" => {
                let mut module = None;
                let mut level = 0;
                for part in named_children(m) {
                    match part.kind() {
                        "import_prefix" => level = self.text(part).matches('.').count(),
                        "dotted_name" => module = Some(self.dotted(part)),
                        _ => {}
                    }
                }
                (module, level)
            }
            Some(m) => (Some(self.dotted(m)), 0),
            None => (None, 0),
        };
        Stmt::ImportFrom {
            module,
            level,
            names: self.import_names(node),
        }
    }

    fn assignment(&self, node: Node<'_>) -> Option<Stmt> {
        let target = self.expr(node.child_by_field_name("left")?);
        let right = node.child_by_field_name("right");
        if let Some(annotation) = node.child_by_field_name("type") {
            return Some(Stmt::AnnAssign {
                target,
                annotation: self.annotation(annotation),
                value: right.map(|value| self.expr(value)),
            });
        }
        let right = right?;
        // chained assignment (`a = b = 1`) binds more than one target
        if matches!(right.kind(), "assignment" | "augmented_assignment") {
            return None;
        }
        Some(Stmt::Assign {
            target,
            value: self.expr(right),
        })
    }

    fn type_alias(&self, node: Node<'_>) -> Option<Stmt> {
        let parts = named_children(node);
        let [left, right, ..] = parts.as_slice() else {
            return None;
        };
        let name = self.text(*left);
        let name = name.split('[').next().unwrap_or(name).trim().to_string();
        Some(Stmt::TypeAlias {
            name,
            value: self.annotation(*right),
        })
    }

    /// Annotations are re-read as plain expressions so that the `type`
    /// wrapper nodes of the grammar never reach the resolver.
    fn annotation(&self, node: Node<'_>) -> Expr {
        let text = self.text(node);
        parse_expression(text).unwrap_or_else(|| Expr::Raw(text.to_string()))
    }

    fn decorated(&self, node: Node<'_>) -> Option<Stmt> {
        let decorators: Vec<Expr> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| named_children(decorator).into_iter().next())
            .map(|expression| self.expr(expression))
            .collect();
        let definition = node.child_by_field_name("definition")?;
        match definition.kind() {
            "function_definition" => Some(Stmt::FunctionDef(self.function(definition, decorators))),
            "class_definition" => Some(Stmt::ClassDef(self.class(definition, decorators))),
            _ => None,
        }
    }

    fn function(&self, node: Node<'_>, decorators: Vec<Expr>) -> FunctionDef {
        let is_async = {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|child| child.kind() == "async");
            found
        };
        FunctionDef {
            name: node
                .child_by_field_name("name")
                .map(|name| self.text(name).to_string())
                .unwrap_or_default(),
            is_async,
            decorators,
            args: node
                .child_by_field_name("parameters")
                .map(|params| self.parameters(params))
                .unwrap_or_default(),
            returns: node
                .child_by_field_name("return_type")
                .map(|returns| self.annotation(returns)),
            docstring: node
                .child_by_field_name("body")
                .and_then(|body| self.docstring(&named_children(body))),
        }
    }

    fn splat_name(&self, node: Node<'_>) -> String {
        self.text(node).trim_start_matches('*').trim().to_string()
    }

    fn parameters(&self, node: Node<'_>) -> Arguments {
        let mut args = Arguments::default();
        let mut keyword_only = false;
        for child in named_children(node) {
            let param = match child.kind() {
                "positional_separator" => {
                    args.posonly.append(&mut args.args);
                    continue;
                }
                "keyword_separator" => {
                    keyword_only = true;
                    continue;
                }
                "list_splat_pattern" => {
                    args.vararg = Some(Param::new(self.splat_name(child)));
                    keyword_only = true;
                    continue;
                }
                "dictionary_splat_pattern" => {
                    args.kwarg = Some(Param::new(self.splat_name(child)));
                    continue;
                }
                "identifier" => Param::new(self.text(child)),
                "default_parameter" | "typed_default_parameter" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    Param {
                        name: self.text(name).to_string(),
                        annotation: child
                            .child_by_field_name("type")
                            .map(|ty| self.annotation(ty)),
                        default: child
                            .child_by_field_name("value")
                            .map(|value| self.expr(value)),
                    }
                }
                "typed_parameter" => {
                    let annotation = child
                        .child_by_field_name("type")
                        .map(|ty| self.annotation(ty));
                    let Some(inner) = named_children(child).into_iter().next() else {
                        continue;
                    };
                    match inner.kind() {
                        "list_splat_pattern" => {
                            args.vararg = Some(Param {
                                name: self.splat_name(inner),
                                annotation,
                                default: None,
                            });
                            keyword_only = true;
                            continue;
                        }
                        "dictionary_splat_pattern" => {
                            args.kwarg = Some(Param {
                                name: self.splat_name(inner),
                                annotation,
                                default: None,
                            });
                            continue;
                        }
                        _ => Param {
                            name: self.text(inner).to_string(),
                            annotation,
                            default: None,
                        },
                    }
                }
                _ => continue,
            };
            if keyword_only {
                args.kwonly.push(param);
            } else {
                args.args.push(param);
            }
        }
        args
    }

    fn class(&self, node: Node<'_>, decorators: Vec<Expr>) -> ClassDef {
        let bases = node
            .child_by_field_name("superclasses")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter(|base| !matches!(base.kind(), "keyword_argument" | "dictionary_splat"))
                    .map(|base| self.expr(base))
                    .collect()
            })
            .unwrap_or_default();
        let body = node
            .child_by_field_name("body")
            .map(named_children)
            .unwrap_or_default();
        ClassDef {
            name: node
                .child_by_field_name("name")
                .map(|name| self.text(name).to_string())
                .unwrap_or_default(),
            bases,
            decorators,
            docstring: self.docstring(&body),
            body: self.statements(&body),
        }
    }

    fn raw(&self, node: Node<'_>) -> Expr {
        Expr::Raw(self.text(node).to_string())
    }

    fn boxed(&self, node: Option<Node<'_>>) -> Option<Box<Expr>> {
        node.map(|n| Box::new(self.expr(n)))
    }

    pub(super) fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "identifier" => Expr::Name(self.text(node).to_string()),
            "attribute" => {
                let (Some(value), Some(attr)) = (
                    self.boxed(node.child_by_field_name("object")),
                    node.child_by_field_name("attribute"),
                ) else {
                    return self.raw(node);
                };
                Expr::Attribute {
                    value,
                    attr: self.text(attr).to_string(),
                }
            }
            "subscript" => {
                let Some(value) = self.boxed(node.child_by_field_name("value")) else {
                    return self.raw(node);
                };
                let mut items: Vec<Expr> = field_children(node, "subscript")
                    .into_iter()
                    .map(|item| self.expr(item))
                    .collect();
                let slice = if items.len() == 1 {
                    items.remove(0)
                } else {
                    Expr::Tuple(items)
                };
                Expr::Subscript {
                    value,
                    slice: Box::new(slice),
                }
            }
            "call" => self.call(node),
            "binary_operator" => {
                let operator = node
                    .child_by_field_name("operator")
                    .and_then(|op| Operator::from_symbol(self.text(op)));
                match (
                    self.boxed(node.child_by_field_name("left")),
                    operator,
                    self.boxed(node.child_by_field_name("right")),
                ) {
                    (Some(left), Some(op), Some(right)) => Expr::BinOp { left, op, right },
                    _ => self.raw(node),
                }
            }
            "unary_operator" => {
                let operator = node
                    .child_by_field_name("operator")
                    .and_then(|op| UnaryOperator::from_symbol(self.text(op)));
                match (operator, self.boxed(node.child_by_field_name("argument"))) {
                    (Some(op), Some(operand)) => Expr::UnaryOp { op, operand },
                    _ => self.raw(node),
                }
            }
            "parenthesized_expression" => match named_children(node).as_slice() {
                [inner] => self.expr(*inner),
                _ => self.raw(node),
            },
            "tuple" | "expression_list" => Expr::Tuple(self.items(node)),
            "list" => Expr::List(self.items(node)),
            "set" => Expr::Set(self.items(node)),
            "dictionary" => {
                let mut pairs = Vec::new();
                for entry in named_children(node) {
                    match entry.kind() {
                        "pair" => {
                            let (Some(key), Some(value)) = (
                                entry.child_by_field_name("key"),
                                entry.child_by_field_name("value"),
                            ) else {
                                return self.raw(node);
                            };
                            pairs.push((Some(self.expr(key)), self.expr(value)));
                        }
                        "dictionary_splat" => match named_children(entry).into_iter().next() {
                            Some(value) => pairs.push((None, self.expr(value))),
                            None => return self.raw(node),
                        },
                        _ => return self.raw(node),
                    }
                }
                Expr::Dict(pairs)
            }
            "list_splat" => match named_children(node).into_iter().next() {
                Some(value) => Expr::Starred(Box::new(self.expr(value))),
                None => self.raw(node),
            },
            "string" => match decode_string(self.text(node)) {
                Some(constant) => Expr::Constant(constant),
                None => self.raw(node),
            },
            "concatenated_string" => {
                let mut joined = String::new();
                for part in named_children(node) {
                    match decode_string(self.text(part)) {
                        Some(Constant::Str(s)) => joined.push_str(&s),
                        _ => return self.raw(node),
                    }
                }
                Expr::Constant(Constant::Str(joined))
            }
            "integer" => Expr::Constant(integer(self.text(node))),
            "float" => Expr::Constant(Constant::Float(self.text(node).replace('_', ""))),
            "true" => Expr::Constant(Constant::Bool(true)),
            "false" => Expr::Constant(Constant::Bool(false)),
            "none" => Expr::Constant(Constant::None),
            "ellipsis" => Expr::Constant(Constant::Ellipsis),
            _ => self.raw(node),
        }
    }

    fn items(&self, node: Node<'_>) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .map(|item| self.expr(item))
            .collect()
    }

    fn call(&self, node: Node<'_>) -> Expr {
        let (Some(func), Some(arguments)) = (
            self.boxed(node.child_by_field_name("function")),
            node.child_by_field_name("arguments"),
        ) else {
            return self.raw(node);
        };
        if arguments.kind() != "argument_list" {
            // `f(x for x in y)`
            return self.raw(node);
        }
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        for argument in named_children(arguments) {
            match argument.kind() {
                "keyword_argument" => {
                    let (Some(name), Some(value)) = (
                        argument.child_by_field_name("name"),
                        argument.child_by_field_name("value"),
                    ) else {
                        return self.raw(node);
                    };
                    keywords.push(Keyword {
                        arg: Some(self.text(name).to_string()),
                        value: self.expr(value),
                    });
                }
                "dictionary_splat" => match named_children(argument).into_iter().next() {
                    Some(value) => keywords.push(Keyword {
                        arg: None,
                        value: self.expr(value),
                    }),
                    None => return self.raw(node),
                },
                _ => args.push(self.expr(argument)),
            }
        }
        Expr::Call {
            func,
            args,
            keywords,
        }
    }
}

/// Normalize an integer literal the way `ast.unparse` prints it.
fn integer(text: &str) -> Constant {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if digits.ends_with(['j', 'J']) {
        return Constant::Float(digits);
    }
    let lower = digits.to_ascii_lowercase();
    let lower = lower.trim_end_matches('l');
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i128::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()
    } else {
        lower.parse::<i128>().ok()
    };
    Constant::Int(parsed.map(|v| v.to_string()).unwrap_or(digits))
}

/// Decode a string literal. Formatted strings yield `None`.
fn decode_string(text: &str) -> Option<Constant> {
    let body_start = text.find(['\'', '"'])?;
    let prefix = text[..body_start].to_ascii_lowercase();
    let body = &text[body_start..];
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    if body.len() < quote_len * 2 {
        return None;
    }
    let inner = &body[quote_len..body.len() - quote_len];
    if prefix.contains('f') || prefix.contains('t') {
        return None;
    }
    if prefix.contains('b') {
        return Some(Constant::Bytes(text.to_string()));
    }
    if prefix.contains('r') {
        Some(Constant::Str(inner.to_string()))
    } else {
        Some(Constant::Str(unescape(inner)))
    }
}

fn take_code_point(chars: &mut Peekable<Chars<'_>>, radix: u32, max: usize) -> (String, Option<char>) {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some(c) if c.is_digit(radix) => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    let value = u32::from_str_radix(&digits, radix)
        .ok()
        .and_then(char::from_u32);
    (digits, value)
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut digits = escaped.to_string();
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            'x' | 'u' | 'U' => {
                let width = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let (digits, decoded) = take_code_point(&mut chars, 16, width);
                match decoded {
                    Some(decoded) if digits.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(escaped);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        match c {
            '\t' => {
                let pad = 8 - column % 8;
                out.push_str(&" ".repeat(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

/// Clean up docstring indentation like `inspect.cleandoc`.
pub(crate) fn clean_docstring(doc: &str) -> String {
    let expanded: Vec<String> = doc.split('\n').map(expand_tabs).collect();
    let margin = expanded
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start();
            (!content.is_empty()).then(|| line.chars().count() - content.chars().count())
        })
        .min()
        .unwrap_or(0);

    let mut lines: Vec<String> = Vec::with_capacity(expanded.len());
    for (i, line) in expanded.iter().enumerate() {
        if i == 0 {
            lines.push(line.trim_start().to_string());
        } else {
            lines.push(line.chars().skip(margin).collect());
        }
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_and_raw_strings() {
        assert_eq!(decode_string("'a\\nb'"), Some(Constant::Str("a\nb".to_string())));
        assert_eq!(decode_string("r'a\\nb'"), Some(Constant::Str("a\\nb".to_string())));
        assert_eq!(
            decode_string("\"\"\"doc\"\"\""),
            Some(Constant::Str("doc".to_string()))
        );
        assert_eq!(decode_string("f'{x}'"), None);
        assert_eq!(
            decode_string("b'xy'"),
            Some(Constant::Bytes("b'xy'".to_string()))
        );
    }

    #[test]
    fn test_unescape_code_points() {
        assert_eq!(unescape("\\x41\\u00e9\\101"), "AéA");
        assert_eq!(unescape("\\q"), "\\q");
    }

    #[test]
    fn test_integer_normalization() {
        assert_eq!(integer("1_000"), Constant::Int("1000".to_string()));
        assert_eq!(integer("0b101"), Constant::Int("5".to_string()));
        assert_eq!(integer("3j"), Constant::Float("3j".to_string()));
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("Summary.\n\n    Body\n      indented\n    "), "Summary.\n\nBody\n  indented");
        assert_eq!(clean_docstring("\n    Leading blank.\n    "), "Leading blank.");
        assert_eq!(clean_docstring("One line."), "One line.");
    }
}
