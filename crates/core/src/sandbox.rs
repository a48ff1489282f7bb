//! Sandboxed evaluation of validated query plans.
//!
//! The evaluation context exposes exactly three things: the builtin
//! tabular functions, a private copy of the base table bound to
//! `dataset`, and literals. Every fault is caught and converted to a
//! typed outcome; nothing escapes to the caller, and the table copy is
//! dropped when the run completes.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::errors::SandboxError;
use crate::plan::{
    parse, Expr, SafetyVerdict, ValidatedPlan, FILTERED_NAME, INPUT_TABLE_NAME, RESULT_NAME,
};
use crate::table::{CellValue, Table};

/// Terminal outcome of running one plan. `EmptyResult` is a valid,
/// answerable state ("no matching records"), distinct from any error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExecutionResult {
    Success(Table),
    EmptyResult,
    ExecutionError(String),
    RejectedBySafety(SafetyVerdict),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExecLimits {
    /// Wall-clock bound for one plan run.
    pub deadline: Duration,
    /// Row-processing budget across all table operations.
    pub max_ops: u64,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self { deadline: Duration::from_secs(2), max_ops: 2_000_000 }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Executor {
    limits: ExecLimits,
}

impl Executor {
    pub fn new(limits: ExecLimits) -> Self {
        Self { limits }
    }

    /// Run a validated plan against a private copy of `base`. The copy is
    /// mandated even though builtins never mutate their input: concurrent
    /// turns must never observe each other through the shared table.
    pub fn run(&self, plan: &ValidatedPlan, base: &Table) -> ExecutionResult {
        let program = match parse(plan.source()) {
            Ok(program) => program,
            Err(error) => {
                tracing::warn!(
                    event_name = "sandbox.plan_unparseable",
                    task_type = plan.task_type(),
                    "generated plan failed to parse"
                );
                return ExecutionResult::ExecutionError(error.to_string());
            }
        };

        let mut session = Session {
            env: BTreeMap::new(),
            deadline: Instant::now() + self.limits.deadline,
            remaining_ops: self.limits.max_ops,
        };
        session.env.insert(INPUT_TABLE_NAME.to_string(), Value::Table(base.clone()));

        for statement in &program.statements {
            match session.eval(&statement.expr) {
                Ok(value) => {
                    session.env.insert(statement.target.clone(), value);
                }
                Err(error) => {
                    tracing::warn!(
                        event_name = "sandbox.execution_fault",
                        task_type = plan.task_type(),
                        fault = %error,
                        "plan evaluation faulted"
                    );
                    return ExecutionResult::ExecutionError(error.to_string());
                }
            }
        }

        if let Some(Value::Table(filtered)) = session.env.get(FILTERED_NAME) {
            if filtered.is_empty() {
                return ExecutionResult::EmptyResult;
            }
        }

        match session.env.remove(RESULT_NAME) {
            Some(Value::Table(result)) if result.is_empty() => ExecutionResult::EmptyResult,
            Some(Value::Table(result)) => ExecutionResult::Success(result),
            _ => ExecutionResult::ExecutionError(
                SandboxError::MissingResult(RESULT_NAME.to_string()).to_string(),
            ),
        }
    }
}

#[derive(Clone, Debug)]
enum Value {
    Table(Table),
    Pred(Pred),
    Str(String),
    Num(f64),
    List(Vec<Value>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Pred(_) => "predicate",
            Self::Str(_) => "string",
            Self::Num(_) => "number",
            Self::List(_) => "list",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Lit {
    Str(String),
    Num(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Clone, Debug)]
enum Pred {
    Cmp { column: String, op: CmpOp, literal: Lit },
    IsIn { column: String, values: Vec<Lit> },
    Contains { column: String, needle: String },
    And(Vec<Pred>),
    Or(Vec<Pred>),
    Not(Box<Pred>),
}

struct Session {
    env: BTreeMap<String, Value>,
    deadline: Instant,
    remaining_ops: u64,
}

impl Session {
    fn eval(&mut self, expr: &Expr) -> Result<Value, SandboxError> {
        if Instant::now() > self.deadline {
            return Err(SandboxError::DeadlineExceeded);
        }
        match expr {
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::Num(value) => Ok(Value::Num(*value)),
            Expr::List(items) => {
                let values =
                    items.iter().map(|item| self.eval(item)).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            Expr::Ident(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| SandboxError::UnknownIdentifier(name.clone())),
            Expr::Call { name, args } => {
                let values =
                    args.iter().map(|arg| self.eval(arg)).collect::<Result<Vec<_>, _>>()?;
                self.call(name, values)
            }
        }
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, SandboxError> {
        match name {
            "eq" => comparison(name, CmpOp::Eq, args),
            "ne" => comparison(name, CmpOp::Ne, args),
            "gt" => comparison(name, CmpOp::Gt, args),
            "ge" => comparison(name, CmpOp::Ge, args),
            "lt" => comparison(name, CmpOp::Lt, args),
            "le" => comparison(name, CmpOp::Le, args),
            "isin" => isin(args),
            "contains" => contains(args),
            "and" => junction(name, args, Pred::And),
            "or" => junction(name, args, Pred::Or),
            "not" => {
                let [value] = take_args::<1>(name, args)?;
                Ok(Value::Pred(Pred::Not(Box::new(as_pred(name, 0, value)?))))
            }
            "filter" => {
                let [table, predicate] = take_args::<2>(name, args)?;
                let table = as_table(name, 0, table)?;
                let predicate = as_pred(name, 1, predicate)?;
                self.charge(table.row_count())?;
                let resolver = PredColumns::resolve(&predicate, &table)?;
                Ok(Value::Table(table.retain_rows(|row| resolver.matches(&predicate, row))))
            }
            "select" => {
                let [table, columns] = take_args::<2>(name, args)?;
                let table = as_table(name, 0, table)?;
                let columns = as_string_list(name, 1, columns)?;
                self.charge(table.row_count())?;
                project(&table, &columns)
            }
            "distinct" => {
                if args.len() == 1 {
                    let [table] = take_args::<1>(name, args)?;
                    let table = as_table(name, 0, table)?;
                    self.charge(table.row_count())?;
                    Ok(Value::Table(dedupe_rows(&table)))
                } else {
                    let [table, columns] = take_args::<2>(name, args)?;
                    let table = as_table(name, 0, table)?;
                    let columns = as_string_list(name, 1, columns)?;
                    self.charge(table.row_count())?;
                    let Value::Table(projected) = project(&table, &columns)? else {
                        return Err(SandboxError::ArgumentType {
                            function: name.to_string(),
                            index: 0,
                            expected: "table".to_string(),
                        });
                    };
                    Ok(Value::Table(dedupe_rows(&projected)))
                }
            }
            "sort" => {
                let (table, column, descending) = if args.len() == 2 {
                    let [table, column] = take_args::<2>(name, args)?;
                    (table, column, false)
                } else {
                    let [table, column, direction] = take_args::<3>(name, args)?;
                    let direction = as_str(name, 2, direction)?;
                    (table, column, direction.eq_ignore_ascii_case("desc"))
                };
                let table = as_table(name, 0, table)?;
                let column = as_str(name, 1, column)?;
                self.charge(table.row_count())?;
                let index = table
                    .column_index(&column)
                    .ok_or_else(|| SandboxError::UnknownColumn(column.clone()))?;
                Ok(Value::Table(table.sorted_by_column(index, descending)))
            }
            "limit" => {
                let [table, count] = take_args::<2>(name, args)?;
                let table = as_table(name, 0, table)?;
                let count = as_num(name, 1, count)?;
                let count = if count.is_sign_negative() { 0.0 } else { count };
                Ok(Value::Table(table.truncated(count as usize)))
            }
            "group_sum" => {
                let [table, by, value_column] = take_args::<3>(name, args)?;
                let table = as_table(name, 0, table)?;
                let by = as_string_list(name, 1, by)?;
                let value_column = as_str(name, 2, value_column)?;
                self.charge(table.row_count())?;
                group_aggregate(&table, &by, Some(&value_column))
            }
            "group_count" => {
                let [table, by] = take_args::<2>(name, args)?;
                let table = as_table(name, 0, table)?;
                let by = as_string_list(name, 1, by)?;
                self.charge(table.row_count())?;
                group_aggregate(&table, &by, None)
            }
            "sum" => {
                let [table, column] = take_args::<2>(name, args)?;
                let table = as_table(name, 0, table)?;
                let column = as_str(name, 1, column)?;
                self.charge(table.row_count())?;
                let index = table
                    .column_index(&column)
                    .ok_or_else(|| SandboxError::UnknownColumn(column.clone()))?;
                let total = table
                    .rows()
                    .iter()
                    .filter_map(|row| row[index].as_number())
                    .sum::<f64>();
                Ok(Value::Table(
                    Table::new(vec![column], vec![vec![CellValue::Number(total)]])
                        .unwrap_or_else(|_| Table::empty(Vec::new())),
                ))
            }
            "count" => {
                let [table] = take_args::<1>(name, args)?;
                let table = as_table(name, 0, table)?;
                Ok(Value::Table(
                    Table::new(
                        vec!["count".to_string()],
                        vec![vec![CellValue::Number(table.row_count() as f64)]],
                    )
                    .unwrap_or_else(|_| Table::empty(Vec::new())),
                ))
            }
            other => Err(SandboxError::UnknownFunction(other.to_string())),
        }
    }

    fn charge(&mut self, rows: usize) -> Result<(), SandboxError> {
        if Instant::now() > self.deadline {
            return Err(SandboxError::DeadlineExceeded);
        }
        let cost = rows as u64;
        if cost > self.remaining_ops {
            self.remaining_ops = 0;
            return Err(SandboxError::BudgetExhausted);
        }
        self.remaining_ops -= cost;
        Ok(())
    }
}

/// Column indexes referenced by a predicate, resolved once per filter.
struct PredColumns {
    indexes: BTreeMap<String, usize>,
}

impl PredColumns {
    fn resolve(predicate: &Pred, table: &Table) -> Result<Self, SandboxError> {
        let mut columns = BTreeSet::new();
        collect_columns(predicate, &mut columns);
        let mut indexes = BTreeMap::new();
        for column in columns {
            let index = table
                .column_index(&column)
                .ok_or_else(|| SandboxError::UnknownColumn(column.clone()))?;
            indexes.insert(column, index);
        }
        Ok(Self { indexes })
    }

    fn matches(&self, predicate: &Pred, row: &[CellValue]) -> bool {
        match predicate {
            Pred::Cmp { column, op, literal } => {
                cmp_matches(&row[self.indexes[column]], *op, literal)
            }
            Pred::IsIn { column, values } => {
                let cell = &row[self.indexes[column]];
                values.iter().any(|literal| cmp_matches(cell, CmpOp::Eq, literal))
            }
            Pred::Contains { column, needle } => row[self.indexes[column]]
                .as_text()
                .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Pred::And(parts) => parts.iter().all(|part| self.matches(part, row)),
            Pred::Or(parts) => parts.iter().any(|part| self.matches(part, row)),
            Pred::Not(inner) => !self.matches(inner, row),
        }
    }
}

fn collect_columns(predicate: &Pred, columns: &mut BTreeSet<String>) {
    match predicate {
        Pred::Cmp { column, .. } | Pred::IsIn { column, .. } | Pred::Contains { column, .. } => {
            columns.insert(column.clone());
        }
        Pred::And(parts) | Pred::Or(parts) => {
            for part in parts {
                collect_columns(part, columns);
            }
        }
        Pred::Not(inner) => collect_columns(inner, columns),
    }
}

/// Comparison semantics: nulls match nothing except through `ne`; numeric
/// comparisons tolerate numeric text on either side; ordering comparisons
/// between two text values are lexicographic (useful for period tokens).
fn cmp_matches(cell: &CellValue, op: CmpOp, literal: &Lit) -> bool {
    let equal_or_ordering = match (cell, literal) {
        (CellValue::Null, _) => None,
        (CellValue::Number(a), Lit::Num(b)) => a.partial_cmp(b),
        (CellValue::Text(a), Lit::Str(b)) => Some(a.as_str().cmp(b.as_str())),
        (CellValue::Text(a), Lit::Num(b)) => {
            a.parse::<f64>().ok().and_then(|parsed| parsed.partial_cmp(b))
        }
        (CellValue::Number(a), Lit::Str(b)) => {
            b.parse::<f64>().ok().and_then(|parsed| a.partial_cmp(&parsed))
        }
    };

    let Some(ordering) = equal_or_ordering else {
        return op == CmpOp::Ne;
    };
    match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::Ne => !ordering.is_eq(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
    }
}

fn project(table: &Table, columns: &[String]) -> Result<Value, SandboxError> {
    let mut indexes = Vec::with_capacity(columns.len());
    for column in columns {
        let index = table
            .column_index(column)
            .ok_or_else(|| SandboxError::UnknownColumn(column.clone()))?;
        indexes.push(index);
    }
    let rows = table
        .rows()
        .iter()
        .map(|row| indexes.iter().map(|&index| row[index].clone()).collect())
        .collect();
    Ok(Value::Table(
        Table::new(columns.to_vec(), rows).unwrap_or_else(|_| Table::empty(columns.to_vec())),
    ))
}

fn dedupe_rows(table: &Table) -> Table {
    let mut seen = BTreeSet::new();
    let rows = table
        .rows()
        .iter()
        .filter(|row| {
            let key = row.iter().map(|cell| cell.to_json().to_string()).collect::<Vec<_>>().join("\u{1f}");
            seen.insert(key)
        })
        .cloned()
        .collect();
    table.with_rows(rows)
}

fn group_aggregate(
    table: &Table,
    by: &[String],
    value_column: Option<&str>,
) -> Result<Value, SandboxError> {
    let mut by_indexes = Vec::with_capacity(by.len());
    for column in by {
        let index = table
            .column_index(column)
            .ok_or_else(|| SandboxError::UnknownColumn(column.clone()))?;
        by_indexes.push(index);
    }
    let value_index = match value_column {
        Some(column) => Some(
            table
                .column_index(column)
                .ok_or_else(|| SandboxError::UnknownColumn(column.to_string()))?,
        ),
        None => None,
    };

    let mut order = Vec::new();
    let mut groups: BTreeMap<String, (Vec<CellValue>, f64)> = BTreeMap::new();
    for row in table.rows() {
        let key_cells =
            by_indexes.iter().map(|&index| row[index].clone()).collect::<Vec<_>>();
        let key = key_cells
            .iter()
            .map(|cell| cell.to_json().to_string())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (key_cells, 0.0)
        });
        match value_index {
            Some(index) => {
                if let Some(value) = row[index].as_number() {
                    entry.1 += value;
                }
            }
            None => entry.1 += 1.0,
        }
    }

    let mut columns = by.to_vec();
    columns.push(value_column.unwrap_or("count").to_string());
    let rows = order
        .iter()
        .map(|key| {
            let (cells, total) = &groups[key];
            let mut row = cells.clone();
            row.push(CellValue::Number(*total));
            row
        })
        .collect();
    Ok(Value::Table(Table::new(columns.clone(), rows).unwrap_or_else(|_| Table::empty(columns))))
}

fn comparison(name: &str, op: CmpOp, args: Vec<Value>) -> Result<Value, SandboxError> {
    let [column, literal] = take_args::<2>(name, args)?;
    let column = as_str(name, 0, column)?;
    let literal = as_lit(name, 1, literal)?;
    Ok(Value::Pred(Pred::Cmp { column, op, literal }))
}

fn isin(args: Vec<Value>) -> Result<Value, SandboxError> {
    let [column, values] = take_args::<2>("isin", args)?;
    let column = as_str("isin", 0, column)?;
    let Value::List(items) = values else {
        return Err(SandboxError::ArgumentType {
            function: "isin".to_string(),
            index: 1,
            expected: "list".to_string(),
        });
    };
    let values = items
        .into_iter()
        .map(|item| as_lit("isin", 1, item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Pred(Pred::IsIn { column, values }))
}

fn contains(args: Vec<Value>) -> Result<Value, SandboxError> {
    let [column, needle] = take_args::<2>("contains", args)?;
    Ok(Value::Pred(Pred::Contains {
        column: as_str("contains", 0, column)?,
        needle: as_str("contains", 1, needle)?,
    }))
}

fn junction(
    name: &str,
    args: Vec<Value>,
    build: fn(Vec<Pred>) -> Pred,
) -> Result<Value, SandboxError> {
    if args.len() < 2 {
        return Err(SandboxError::Arity {
            function: name.to_string(),
            expected: "at least 2".to_string(),
            actual: args.len(),
        });
    }
    let parts = args
        .into_iter()
        .enumerate()
        .map(|(index, value)| as_pred(name, index, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Pred(build(parts)))
}

fn take_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], SandboxError> {
    let actual = args.len();
    args.try_into().map_err(|_| SandboxError::Arity {
        function: name.to_string(),
        expected: N.to_string(),
        actual,
    })
}

fn as_table(name: &str, index: usize, value: Value) -> Result<Table, SandboxError> {
    match value {
        Value::Table(table) => Ok(table),
        other => Err(argument_type(name, index, "table", &other)),
    }
}

fn as_pred(name: &str, index: usize, value: Value) -> Result<Pred, SandboxError> {
    match value {
        Value::Pred(predicate) => Ok(predicate),
        other => Err(argument_type(name, index, "predicate", &other)),
    }
}

fn as_str(name: &str, index: usize, value: Value) -> Result<String, SandboxError> {
    match value {
        Value::Str(text) => Ok(text),
        other => Err(argument_type(name, index, "string", &other)),
    }
}

fn as_num(name: &str, index: usize, value: Value) -> Result<f64, SandboxError> {
    match value {
        Value::Num(number) => Ok(number),
        other => Err(argument_type(name, index, "number", &other)),
    }
}

fn as_lit(name: &str, index: usize, value: Value) -> Result<Lit, SandboxError> {
    match value {
        Value::Str(text) => Ok(Lit::Str(text)),
        Value::Num(number) => Ok(Lit::Num(number)),
        other => Err(argument_type(name, index, "string or number", &other)),
    }
}

fn as_string_list(name: &str, index: usize, value: Value) -> Result<Vec<String>, SandboxError> {
    match value {
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Str(text) => Ok(text),
                other => Err(argument_type(name, index, "list of strings", &other)),
            })
            .collect(),
        other => Err(argument_type(name, index, "list of strings", &other)),
    }
}

fn argument_type(name: &str, index: usize, expected: &str, actual: &Value) -> SandboxError {
    SandboxError::ArgumentType {
        function: name.to_string(),
        index,
        expected: format!("{expected}, got {}", actual.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ExecLimits, ExecutionResult, Executor};
    use crate::plan::{validate, QueryPlan};
    use crate::table::{CellValue, Table};

    fn ledger_fixture() -> Table {
        let columns = crate::dataset::EXPECTED_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        let row = |property: &str, tenant: &str, ledger_type: &str, quarter: &str, profit: f64| {
            vec![
                CellValue::Text("PropCo".to_string()),
                CellValue::Text(property.to_string()),
                CellValue::Text(tenant.to_string()),
                CellValue::Text(ledger_type.to_string()),
                CellValue::Text("rental_income".to_string()),
                CellValue::Text("base_rent".to_string()),
                CellValue::Text("4100".to_string()),
                CellValue::Text("Base rent".to_string()),
                CellValue::Text("2024-M01".to_string()),
                CellValue::Text(quarter.to_string()),
                CellValue::Text("2024".to_string()),
                CellValue::Number(profit),
            ]
        };
        Table::new(
            columns,
            vec![
                row("Building 160", "Acme Corp", "revenue", "2024-Q1", 1000.0),
                row("Building 160", "Acme Corp", "expenses", "2024-Q1", -400.0),
                row("Building 180", "Globex LLC", "revenue", "2024-Q1", 700.0),
                row("Building 180", "Globex LLC", "revenue", "2024-Q2", 750.0),
                row("Building 180", "Initech", "revenue", "2024-Q2", 20.0),
            ],
        )
        .expect("fixture table")
    }

    fn run(source: &str) -> ExecutionResult {
        run_with_limits(source, ExecLimits::default())
    }

    fn run_with_limits(source: &str, limits: ExecLimits) -> ExecutionResult {
        let plan = validate(QueryPlan::new("test", source)).expect("plan passes safety");
        Executor::new(limits).run(&plan, &ledger_fixture())
    }

    #[test]
    fn pnl_grouping_pipeline_succeeds() {
        let result = run(
            "filtered = filter(dataset, eq(\"quarter\", \"2024-Q1\"))\n\
             result = group_sum(filtered, [\"ledger_type\"], \"profit\")",
        );
        let ExecutionResult::Success(table) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(table.columns(), ["ledger_type".to_string(), "profit".to_string()]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "profit"), Some(&CellValue::Number(1700.0)));
        assert_eq!(table.cell(1, "profit"), Some(&CellValue::Number(-400.0)));
    }

    #[test]
    fn ranking_pipeline_sorts_and_limits() {
        let result = run(
            "counts = group_count(distinct(dataset, [\"property_name\", \"tenant_name\"]), [\"property_name\"])\n\
             ranked = sort(counts, \"count\", \"desc\")\n\
             result = limit(ranked, 1)",
        );
        let ExecutionResult::Success(table) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.cell(0, "property_name"),
            Some(&CellValue::Text("Building 180".to_string()))
        );
        assert_eq!(table.cell(0, "count"), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn zero_row_filter_is_empty_result_not_error() {
        let result = run(
            "filtered = filter(dataset, eq(\"quarter\", \"2030-Q1\"))\n\
             result = group_sum(filtered, [\"ledger_type\"], \"profit\")",
        );
        assert_eq!(result, ExecutionResult::EmptyResult);
    }

    #[test]
    fn empty_filtered_binding_wins_even_with_nonempty_result() {
        let result = run(
            "filtered = filter(dataset, eq(\"quarter\", \"2030-Q1\"))\n\
             result = count(filtered)",
        );
        assert_eq!(result, ExecutionResult::EmptyResult);
    }

    #[test]
    fn missing_result_binding_is_an_execution_error() {
        let result = run("only = filter(dataset, eq(\"quarter\", \"2024-Q1\"))");
        assert!(matches!(result, ExecutionResult::ExecutionError(_)));
    }

    #[test]
    fn unknown_column_is_caught_as_execution_error() {
        let result = run("result = filter(dataset, eq(\"street_address\", \"Main St\"))");
        let ExecutionResult::ExecutionError(description) = result else {
            panic!("expected execution error");
        };
        assert!(description.contains("street_address"));
    }

    #[test]
    fn budget_and_deadline_bound_execution() {
        let tiny_budget = ExecLimits { max_ops: 2, ..ExecLimits::default() };
        let result =
            run_with_limits("result = filter(dataset, eq(\"year\", \"2024\"))", tiny_budget);
        assert!(matches!(result, ExecutionResult::ExecutionError(_)));

        let expired = ExecLimits { deadline: Duration::ZERO, ..ExecLimits::default() };
        let result = run_with_limits("result = count(dataset)", expired);
        assert!(matches!(result, ExecutionResult::ExecutionError(_)));
    }

    #[test]
    fn base_table_is_never_mutated_and_reruns_are_identical() {
        let base = ledger_fixture();
        let snapshot = base.clone();
        let plan = validate(QueryPlan::new(
            "test",
            "result = sort(filter(dataset, eq(\"ledger_type\", \"revenue\")), \"profit\", \"desc\")",
        ))
        .expect("plan passes safety");
        let executor = Executor::default();

        let first = executor.run(&plan, &base);
        let second = executor.run(&plan, &base);

        assert_eq!(first, second);
        assert_eq!(base, snapshot);
    }

    #[test]
    fn numeric_comparisons_tolerate_numeric_text() {
        let result = run("result = filter(dataset, ge(\"year\", 2024))");
        let ExecutionResult::Success(table) = result else {
            panic!("expected success");
        };
        assert_eq!(table.row_count(), 5);
    }
}
