use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read dataset file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse dataset file `{path}`: {message}")]
    ParseFile { path: PathBuf, message: String },
    #[error("dataset is missing required columns: {missing:?}")]
    MissingColumns { missing: Vec<String> },
    #[error("row {row} has {actual} cells, expected {expected}")]
    RowArity { row: usize, expected: usize, actual: usize },
}

/// Raised while lexing or parsing a generated query plan. Converted to a
/// typed pipeline outcome before it can reach a user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanParseError {
    #[error("unexpected character `{0}` in plan source")]
    UnexpectedCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unexpected end of plan source")]
    UnexpectedEnd,
    #[error("statement must assign to a name, found `{0}`")]
    MissingAssignment(String),
}

/// Internal sandbox faults. The executor maps every variant to
/// `ExecutionResult::ExecutionError` with a non-technical description.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SandboxError {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{function}` expected {expected} arguments, got {actual}")]
    Arity { function: String, expected: String, actual: usize },
    #[error("`{function}` argument {index} has the wrong type: expected {expected}")]
    ArgumentType { function: String, index: usize, expected: String },
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("plan did not bind `{0}` to a table")]
    MissingResult(String),
    #[error("plan exceeded its execution budget")]
    BudgetExhausted,
    #[error("plan exceeded its execution deadline")]
    DeadlineExceeded,
}
