//! Apidoc Ultra
//!
//! Compiles the public API of Python modules into cross-referenced Markdown
//! documents, one per root package, without importing the code.

pub mod assembler;
pub mod builder;
pub mod config;
pub mod error;
pub mod expr;
pub mod graft;
pub mod loader;
pub mod markdown;
pub mod pep585;
pub mod resolver;
pub mod symbols;
pub mod syntax;
pub mod visibility;

pub use assembler::RenderOptions;
pub use builder::{const_type, DocstringSource, ModuleSource, TableBuilder};
pub use config::{ApiConfig, ModuleEntry, RootEntry};
pub use error::{ApiError, Result};
pub use expr::Expr;
pub use loader::{gen_api, load_modules};
pub use resolver::Resolver;
pub use symbols::{Fragment, ResolvedTable, Symbol, SymbolKind, SymbolTable};
pub use syntax::{parse_expression, parse_module, ModuleAst};
pub use visibility::{is_public_family, SortKey};
