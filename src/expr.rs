//! Expression trees for annotations, alias values and default values.
//!
//! Rendering follows Python's `ast.unparse` conventions so that a resolved
//! annotation reads exactly like hand-written Python.

use std::fmt::{self, Write};

/// A Python expression, reduced to the shapes the resolver rewrites.
///
/// Constructs the engine never looks inside (lambdas, comprehensions,
/// comparisons, f-strings, slices) are kept verbatim as [`Expr::Raw`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Set(Vec<Expr>),
    /// `None` keys are `**mapping` entries.
    Dict(Vec<(Option<Expr>, Expr)>),
    Starred(Box<Expr>),
    Constant(Constant),
    Raw(String),
}

/// A keyword argument of a call; `arg` is `None` for `**kwargs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Ellipsis,
    /// Decimal text of an integer literal.
    Int(String),
    Float(String),
    Str(String),
    /// Source text of a bytes literal, including prefix and quotes.
    Bytes(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Invert,
    UAdd,
    USub,
}

// Precedence levels of `ast.unparse`.
const PREC_TEST: u8 = 4;
const PREC_EXPR: u8 = 9;
const PREC_ATOM: u8 = 18;
const PREC_FACTOR: u8 = 15;

impl Operator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mult,
            "@" => Operator::MatMult,
            "/" => Operator::Div,
            "//" => Operator::FloorDiv,
            "%" => Operator::Mod,
            "**" => Operator::Pow,
            "<<" => Operator::LShift,
            ">>" => Operator::RShift,
            "|" => Operator::BitOr,
            "^" => Operator::BitXor,
            "&" => Operator::BitAnd,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mult => "*",
            Operator::MatMult => "@",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitAnd => "&",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Operator::BitOr => 9,
            Operator::BitXor => 10,
            Operator::BitAnd => 11,
            Operator::LShift | Operator::RShift => 12,
            Operator::Add | Operator::Sub => 13,
            Operator::Mult
            | Operator::MatMult
            | Operator::Div
            | Operator::FloorDiv
            | Operator::Mod => 14,
            Operator::Pow => 16,
        }
    }
}

impl UnaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "~" => Some(UnaryOperator::Invert),
            "+" => Some(UnaryOperator::UAdd),
            "-" => Some(UnaryOperator::USub),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Invert => "~",
            UnaryOperator::UAdd => "+",
            UnaryOperator::USub => "-",
        }
    }
}

impl Expr {
    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name(id.into())
    }

    pub fn bit_or(left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(left),
            op: Operator::BitOr,
            right: Box::new(right),
        }
    }

    /// Build a `Name`/`Attribute` chain from a dotted path such as `a.b.c`.
    pub fn dotted(path: &str) -> Self {
        let mut parts = path.split('.');
        let first = Expr::name(parts.next().unwrap_or_default());
        parts.fold(first, |value, attr| Expr::Attribute {
            value: Box::new(value),
            attr: attr.to_string(),
        })
    }

    /// The dotted path of a pure `Name`/`Attribute` chain.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Expr::Name(id) => Some(id.clone()),
            Expr::Attribute { value, attr } => {
                let mut path = value.dotted_path()?;
                path.push('.');
                path.push_str(attr);
                Some(path)
            }
            _ => None,
        }
    }

    /// Whether a bare name `id` or a string literal equal to `id` occurs
    /// anywhere in this tree.
    pub fn mentions(&self, id: &str) -> bool {
        match self {
            Expr::Name(n) => n == id,
            Expr::Constant(Constant::Str(s)) => s == id,
            Expr::Constant(_) | Expr::Raw(_) => false,
            Expr::Attribute { value, .. } => value.mentions(id),
            Expr::Subscript { value, slice } => value.mentions(id) || slice.mentions(id),
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                func.mentions(id)
                    || args.iter().any(|a| a.mentions(id))
                    || keywords.iter().any(|k| k.value.mentions(id))
            }
            Expr::BinOp { left, right, .. } => left.mentions(id) || right.mentions(id),
            Expr::UnaryOp { operand, .. } => operand.mentions(id),
            Expr::Tuple(items) | Expr::List(items) | Expr::Set(items) => {
                items.iter().any(|e| e.mentions(id))
            }
            Expr::Dict(pairs) => pairs
                .iter()
                .any(|(k, v)| k.as_ref().is_some_and(|k| k.mentions(id)) || v.mentions(id)),
            Expr::Starred(value) => value.mentions(id),
        }
    }

    fn write_to(&self, out: &mut String, context: u8) {
        match self {
            Expr::Name(id) => out.push_str(id),
            Expr::Attribute { value, attr } => {
                value.write_to(out, PREC_ATOM);
                out.push('.');
                out.push_str(attr);
            }
            Expr::Subscript { value, slice } => {
                value.write_to(out, PREC_ATOM);
                out.push('[');
                match slice.as_ref() {
                    Expr::Tuple(items) if items.len() == 1 => {
                        items[0].write_to(out, PREC_TEST);
                        out.push(',');
                    }
                    Expr::Tuple(items) if !items.is_empty() => write_items(out, items),
                    other => other.write_to(out, PREC_TEST),
                }
                out.push(']');
            }
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                func.write_to(out, PREC_ATOM);
                out.push('(');
                let mut first = true;
                for arg in args {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    arg.write_to(out, PREC_TEST);
                }
                for keyword in keywords {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    match &keyword.arg {
                        Some(arg) => {
                            out.push_str(arg);
                            out.push('=');
                        }
                        None => out.push_str("**"),
                    }
                    keyword.value.write_to(out, PREC_TEST);
                }
                out.push(')');
            }
            Expr::BinOp { left, op, right } => {
                let precedence = op.precedence();
                let parens = context > precedence;
                if parens {
                    out.push('(');
                }
                // `**` is the only right-associative operator.
                let (left_ctx, right_ctx) = if *op == Operator::Pow {
                    (precedence + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                left.write_to(out, left_ctx);
                let _ = write!(out, " {} ", op.symbol());
                right.write_to(out, right_ctx);
                if parens {
                    out.push(')');
                }
            }
            Expr::UnaryOp { op, operand } => {
                let parens = context > PREC_FACTOR;
                if parens {
                    out.push('(');
                }
                out.push_str(op.symbol());
                operand.write_to(out, PREC_FACTOR);
                if parens {
                    out.push(')');
                }
            }
            Expr::Tuple(items) => {
                out.push('(');
                write_items(out, items);
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Expr::List(items) => {
                out.push('[');
                write_items(out, items);
                out.push(']');
            }
            Expr::Set(items) => {
                if items.is_empty() {
                    // `{}` would be a dict
                    out.push_str("{*()}");
                } else {
                    out.push('{');
                    write_items(out, items);
                    out.push('}');
                }
            }
            Expr::Dict(pairs) => {
                out.push('{');
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    match key {
                        Some(key) => {
                            key.write_to(out, PREC_TEST);
                            out.push_str(": ");
                            value.write_to(out, PREC_TEST);
                        }
                        None => {
                            out.push_str("**");
                            value.write_to(out, PREC_EXPR + 1);
                        }
                    }
                }
                out.push('}');
            }
            Expr::Starred(value) => {
                out.push('*');
                value.write_to(out, PREC_EXPR);
            }
            Expr::Constant(constant) => constant.write_to(out),
            Expr::Raw(text) => {
                let parens = context > PREC_TEST;
                if parens {
                    out.push('(');
                }
                out.push_str(text);
                if parens {
                    out.push(')');
                }
            }
        }
    }
}

fn write_items(out: &mut String, items: &[Expr]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_to(out, PREC_TEST);
    }
}

impl Constant {
    fn write_to(&self, out: &mut String) {
        match self {
            Constant::None => out.push_str("None"),
            Constant::Bool(true) => out.push_str("True"),
            Constant::Bool(false) => out.push_str("False"),
            Constant::Ellipsis => out.push_str("..."),
            Constant::Int(text) | Constant::Float(text) | Constant::Bytes(text) => {
                out.push_str(text)
            }
            Constant::Str(s) => out.push_str(&repr_str(s)),
        }
    }

    /// The Python type name of the literal, as `type(value).__qualname__`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::None => "NoneType",
            Constant::Bool(_) => "bool",
            Constant::Ellipsis => "ellipsis",
            Constant::Int(_) => "int",
            Constant::Float(text) => {
                if text.ends_with(['j', 'J']) {
                    "complex"
                } else {
                    "float"
                }
            }
            Constant::Str(_) => "str",
            Constant::Bytes(_) => "bytes",
        }
    }
}

/// Python `repr()` of a string.
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out, PREC_TEST);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(id: &str) -> Expr {
        Expr::name(id)
    }

    fn subscript(value: Expr, slice: Expr) -> Expr {
        Expr::Subscript {
            value: Box::new(value),
            slice: Box::new(slice),
        }
    }

    #[test]
    fn test_union_chain_is_left_associative() {
        let chain = Expr::bit_or(Expr::bit_or(name("A"), name("B")), name("C"));
        assert_eq!(chain.to_string(), "A | B | C");

        let nested = Expr::bit_or(name("A"), Expr::bit_or(name("B"), name("C")));
        assert_eq!(nested.to_string(), "A | (B | C)");
    }

    #[test]
    fn test_subscript_tuple_has_no_parens() {
        let dict = subscript(name("dict"), Expr::Tuple(vec![name("str"), name("int")]));
        assert_eq!(dict.to_string(), "dict[str, int]");

        let single = subscript(name("tuple"), Expr::Tuple(vec![name("int")]));
        assert_eq!(single.to_string(), "tuple[int,]");
    }

    #[test]
    fn test_top_level_tuple() {
        assert_eq!(Expr::Tuple(vec![]).to_string(), "()");
        assert_eq!(Expr::Tuple(vec![name("a")]).to_string(), "(a,)");
        assert_eq!(
            Expr::Tuple(vec![name("a"), name("b")]).to_string(),
            "(a, b)"
        );
    }

    #[test]
    fn test_string_repr() {
        assert_eq!(repr_str("abc"), "'abc'");
        assert_eq!(repr_str("it's"), "\"it's\"");
        assert_eq!(repr_str("a'b\"c"), "'a\\'b\"c'");
        assert_eq!(repr_str("line\nnext"), "'line\\nnext'");
    }

    #[test]
    fn test_call_with_keywords() {
        let call = Expr::Call {
            func: Box::new(name("TypeVar")),
            args: vec![Expr::Constant(Constant::Str("T".to_string()))],
            keywords: vec![Keyword {
                arg: Some("bound".to_string()),
                value: name("int"),
            }],
        };
        assert_eq!(call.to_string(), "TypeVar('T', bound=int)");
    }

    #[test]
    fn test_precedence_parens() {
        let sum = Expr::BinOp {
            left: Box::new(name("a")),
            op: Operator::Add,
            right: Box::new(name("b")),
        };
        let product = Expr::BinOp {
            left: Box::new(sum),
            op: Operator::Mult,
            right: Box::new(name("c")),
        };
        assert_eq!(product.to_string(), "(a + b) * c");

        let negative = Expr::UnaryOp {
            op: UnaryOperator::USub,
            operand: Box::new(Expr::Constant(Constant::Int("1".to_string()))),
        };
        assert_eq!(negative.to_string(), "-1");
    }

    #[test]
    fn test_mentions() {
        let call = Expr::Call {
            func: Box::new(name("TypeVar")),
            args: vec![Expr::Constant(Constant::Str("T".to_string()))],
            keywords: vec![],
        };
        assert!(call.mentions("T"));
        assert!(!call.mentions("S"));
        assert!(!subscript(name("Set"), name("str")).mentions("S"));
    }

    #[test]
    fn test_dotted_paths() {
        let path = Expr::dotted("collections.abc.Iterable");
        assert_eq!(path.to_string(), "collections.abc.Iterable");
        assert_eq!(path.dotted_path().as_deref(), Some("collections.abc.Iterable"));
        assert_eq!(Expr::dotted("int"), name("int"));
        assert!(subscript(name("list"), name("int")).dotted_path().is_none());
    }

    #[test]
    fn test_constant_type_names() {
        assert_eq!(Constant::Int("1".into()).type_name(), "int");
        assert_eq!(Constant::Float("1.5".into()).type_name(), "float");
        assert_eq!(Constant::Float("2j".into()).type_name(), "complex");
        assert_eq!(Constant::None.type_name(), "NoneType");
    }
}
