//! Restricted query-plan language.
//!
//! Generated plans are not general-purpose code: they are short programs in
//! an allow-listed function-call DSL over the tabular library, statically
//! inspected before execution. A plan binds intermediate names and must
//! leave its output in `result`; the base table is visible as `dataset`.

pub mod lexer;
pub mod parser;
pub mod safety;

pub use parser::{parse, Expr, Program, Stmt};
pub use safety::{validate, SafetyVerdict, ValidatedPlan};

use serde::{Deserialize, Serialize};

/// Name the base table is bound to inside a plan.
pub const INPUT_TABLE_NAME: &str = "dataset";

/// Binding the executor reads as the plan output.
pub const RESULT_NAME: &str = "result";

/// Optional binding holding the filtered working set; when present and
/// empty it signals "no matching records" even if `result` is non-empty.
pub const FILTERED_NAME: &str = "filtered";

/// Functions a plan may call. Everything else is a safety violation.
pub const ALLOWED_FUNCTIONS: [&str; 20] = [
    "filter",
    "eq",
    "ne",
    "gt",
    "ge",
    "lt",
    "le",
    "isin",
    "contains",
    "and",
    "or",
    "not",
    "select",
    "distinct",
    "sort",
    "limit",
    "group_sum",
    "group_count",
    "sum",
    "count",
];

/// A generated query plan as received from the planning stage, before any
/// safety inspection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub task_type: String,
    pub source: String,
}

impl QueryPlan {
    pub fn new(task_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self { task_type: task_type.into(), source: source.into() }
    }
}
