use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::DatasetError;

/// A single cell of the in-memory ledger table. `Number` is used only for
/// columns declared numeric at load time; everything else is `Text` or,
/// for empty cells, `Null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Number(value) => {
                Number::from_f64(*value).map(Value::Number).unwrap_or(Value::Null)
            }
            Self::Text(value) => Value::String(value.clone()),
        }
    }

    /// Total ordering for sorting: nulls first, then numbers, then text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

/// Ordered-column, ordered-row tabular value. This is both the shared base
/// dataset and the shape of every sandbox result; results are always
/// detached copies, never views into the base table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, DatasetError> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RowArity {
                    row: index,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    /// Rows kept where the predicate holds. Produces a detached table.
    pub fn retain_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        let rows = self.rows.iter().filter(|row| keep(row)).cloned().collect();
        Self { columns: self.columns.clone(), rows }
    }

    pub fn with_rows(&self, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns: self.columns.clone(), rows }
    }

    pub fn sorted_by_column(&self, column: usize, descending: bool) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let ordering = a[column].compare(&b[column]);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Self { columns: self.columns.clone(), rows }
    }

    pub fn truncated(&self, limit: usize) -> Self {
        Self { columns: self.columns.clone(), rows: self.rows.iter().take(limit).cloned().collect() }
    }

    /// Serialize rows as JSON records for answer grounding.
    pub fn records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (column, cell) in self.columns.iter().zip(row.iter()) {
                    record.insert(column.clone(), cell.to_json());
                }
                Value::Object(record)
            })
            .collect()
    }
}
