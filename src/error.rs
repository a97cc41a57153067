use thiserror::Error;

/// Errors raised by the documentation engine.
///
/// Only structural failures are errors. Unresolvable aliases, missing
/// docstrings and unreadable modules degrade the output and are logged instead.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Syntax error in module '{module}' at line {line}, column {column}")]
    Syntax {
        module: String,
        line: usize,
        column: usize,
    },

    #[error("Symbol '{0}' is defined by more than one partial table")]
    DuplicateSymbol(String),

    #[error("Alias '{0}' is recorded by more than one partial table")]
    DuplicateAlias(String),

    #[error("Failed to load the Python grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("Invalid module name '{0}'")]
    InvalidModuleName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
