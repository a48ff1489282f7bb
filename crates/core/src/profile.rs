use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::table::Table;

/// Columns whose distinct values are profiled for entity grounding.
/// `profit` is excluded: a continuous measure has no useful value list.
pub const PROFILE_VALUE_COLUMNS: [&str; 11] = [
    "entity_name",
    "property_name",
    "tenant_name",
    "ledger_type",
    "ledger_group",
    "ledger_category",
    "ledger_code",
    "ledger_description",
    "month",
    "quarter",
    "year",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub description: String,
    pub required_columns: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRanges {
    pub min_month: Option<String>,
    pub max_month: Option<String>,
    pub min_quarter: Option<String>,
    pub max_quarter: Option<String>,
    pub min_year: Option<String>,
    pub max_year: Option<String>,
}

/// Immutable startup snapshot of dataset shape. Built once per process and
/// shared read-only by every pipeline turn; grounds routing, extraction
/// validation, and definitions answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub columns: Vec<String>,
    pub unique_values: BTreeMap<String, Vec<String>>,
    pub null_counts: BTreeMap<String, usize>,
    pub time_ranges: TimeRanges,
    pub supported_metrics: BTreeMap<String, MetricDefinition>,
}

impl DatasetProfile {
    pub fn build(table: &Table) -> Self {
        let mut unique_values = BTreeMap::new();
        for column in PROFILE_VALUE_COLUMNS {
            if let Some(index) = table.column_index(column) {
                let mut values = table
                    .rows()
                    .iter()
                    .filter_map(|row| row[index].as_text().map(|text| text.to_string()))
                    .collect::<Vec<_>>();
                values.sort();
                values.dedup();
                unique_values.insert(column.to_string(), values);
            }
        }

        let mut null_counts = BTreeMap::new();
        for (index, column) in table.columns().iter().enumerate() {
            let nulls = table.rows().iter().filter(|row| row[index].is_null()).count();
            null_counts.insert(column.clone(), nulls);
        }

        let time_ranges = TimeRanges {
            min_month: first_of(&unique_values, "month"),
            max_month: last_of(&unique_values, "month"),
            min_quarter: first_of(&unique_values, "quarter"),
            max_quarter: last_of(&unique_values, "quarter"),
            min_year: first_of(&unique_values, "year"),
            max_year: last_of(&unique_values, "year"),
        };

        Self {
            columns: table.columns().to_vec(),
            unique_values,
            null_counts,
            time_ranges,
            supported_metrics: supported_metrics(),
        }
    }

    pub fn known_values(&self, column: &str) -> &[String] {
        self.unique_values.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the metric is registered and every column it needs exists.
    /// Empty or `unknown` metrics pass: absence of a metric is not an error.
    pub fn supports_metric(&self, requested: &str) -> bool {
        let requested = requested.trim().to_lowercase();
        if requested.is_empty() || requested == "unknown" {
            return true;
        }
        let Some(definition) = self.supported_metrics.get(&requested) else {
            return false;
        };
        definition
            .required_columns
            .iter()
            .all(|required| self.columns.iter().any(|column| column == required))
    }

    /// Compact JSON rendition used as prompt context. Deliberately omits
    /// the full unique-value lists to keep token cost bounded.
    pub fn prompt_json(&self) -> String {
        json!({
            "columns": self.columns,
            "dataset_guide": dataset_guide(),
            "time_columns": ["month", "quarter", "year"],
            "metric_column": "profit",
            "supported_metrics": self.supported_metrics,
            "time_ranges": self.time_ranges,
            "pnl_definition": PNL_DEFINITION,
        })
        .to_string()
    }
}

pub const PNL_DEFINITION: &str = "P&L uses ledger_type buckets: revenue_total = sum(profit) for \
     ledger_type='revenue', expenses_total = sum(profit) for ledger_type='expenses' (typically \
     negative), and net_pnl = revenue_total + expenses_total";

fn first_of(unique_values: &BTreeMap<String, Vec<String>>, column: &str) -> Option<String> {
    unique_values.get(column).and_then(|values| values.first().cloned())
}

fn last_of(unique_values: &BTreeMap<String, Vec<String>>, column: &str) -> Option<String> {
    unique_values.get(column).and_then(|values| values.last().cloned())
}

/// Registry of metrics the planner may be asked to compute, with the
/// columns each one needs present in the loaded dataset.
pub fn supported_metrics() -> BTreeMap<String, MetricDefinition> {
    let mut metrics = BTreeMap::new();
    metrics.insert(
        "pnl".to_string(),
        MetricDefinition {
            description: "Net profit and loss = revenue_total + expenses_total (expenses are negative)."
                .to_string(),
            required_columns: vec!["ledger_type".to_string(), "profit".to_string()],
        },
    );
    metrics.insert(
        "revenue_total".to_string(),
        MetricDefinition {
            description: "Total revenue where ledger_type == 'revenue'.".to_string(),
            required_columns: vec!["ledger_type".to_string(), "profit".to_string()],
        },
    );
    metrics.insert(
        "expenses_total".to_string(),
        MetricDefinition {
            description: "Total expenses where ledger_type == 'expenses'.".to_string(),
            required_columns: vec!["ledger_type".to_string(), "profit".to_string()],
        },
    );
    metrics.insert(
        "net_pnl".to_string(),
        MetricDefinition {
            description: "Net P&L computed as revenue_total + expenses_total.".to_string(),
            required_columns: vec!["ledger_type".to_string(), "profit".to_string()],
        },
    );
    metrics.insert(
        "count".to_string(),
        MetricDefinition {
            description: "Count rows or unique entities by grouping dimensions.".to_string(),
            required_columns: Vec::new(),
        },
    );
    metrics.insert(
        "sum_profit".to_string(),
        MetricDefinition {
            description: "Sum of profit across selected scope.".to_string(),
            required_columns: vec!["profit".to_string()],
        },
    );
    metrics
}

fn dataset_guide() -> Value {
    json!({
        "column_definitions": {
            "entity_name": "Company/entity managing the assets.",
            "property_name": "Property identifier (e.g., Building 180).",
            "tenant_name": "Tenant identifier where available; may be null.",
            "ledger_type": "High-level financial type, typically revenue or expenses.",
            "ledger_group": "Ledger grouping under a type (e.g., general_expenses, rental_income).",
            "ledger_category": "Detailed financial category under ledger_group.",
            "ledger_code": "Numeric code for accounting line item; 4xxx/8xxx style numbers map here.",
            "ledger_description": "Human-readable description of ledger line item.",
            "month": "Month period in YYYY-MNN format (e.g., 2025-M01).",
            "quarter": "Quarter period in YYYY-QN format (e.g., 2025-Q1).",
            "year": "Year period (e.g., 2025).",
            "profit": "Signed financial value. Positive=Revenue, Negative=Loss.",
        },
        "query_hints": [
            "If query includes P&L/profit/loss/revenue/expenses, aggregate the profit column.",
            "If query includes a 4-digit accounting number, map it to ledger_code.",
            "If query includes YYYY-MNN, filter month exactly.",
            "If query includes YYYY-QN, filter quarter exactly.",
            "If query includes YYYY only, filter year exactly.",
            "If no timeframe is provided, do not apply a time filter.",
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::DatasetProfile;
    use crate::table::{CellValue, Table};

    fn ledger_fixture() -> Table {
        let columns = crate::dataset::EXPECTED_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        let row = |property: &str, tenant: Option<&str>, ledger_type: &str, month: &str,
                   quarter: &str, year: &str, profit: f64| {
            vec![
                CellValue::Text("PropCo".to_string()),
                CellValue::Text(property.to_string()),
                tenant.map(|t| CellValue::Text(t.to_string())).unwrap_or(CellValue::Null),
                CellValue::Text(ledger_type.to_string()),
                CellValue::Text("rental_income".to_string()),
                CellValue::Text("base_rent".to_string()),
                CellValue::Text("4100".to_string()),
                CellValue::Text("Base rent".to_string()),
                CellValue::Text(month.to_string()),
                CellValue::Text(quarter.to_string()),
                CellValue::Text(year.to_string()),
                CellValue::Number(profit),
            ]
        };
        Table::new(
            columns,
            vec![
                row("Building 160", Some("Acme Corp"), "revenue", "2024-M01", "2024-Q1", "2024", 100.0),
                row("Building 180", None, "expenses", "2024-M03", "2024-Q1", "2024", -40.0),
                row("Building 160", Some("Acme Corp"), "revenue", "2025-M01", "2025-Q1", "2025", 120.0),
            ],
        )
        .expect("fixture table")
    }

    #[test]
    fn profiles_unique_values_null_counts_and_time_ranges() {
        let profile = DatasetProfile::build(&ledger_fixture());

        assert_eq!(
            profile.known_values("property_name"),
            ["Building 160".to_string(), "Building 180".to_string()]
        );
        assert_eq!(profile.null_counts["tenant_name"], 1);
        assert_eq!(profile.time_ranges.min_month.as_deref(), Some("2024-M01"));
        assert_eq!(profile.time_ranges.max_month.as_deref(), Some("2025-M01"));
        assert_eq!(profile.time_ranges.max_year.as_deref(), Some("2025"));
    }

    #[test]
    fn metric_support_checks_registry_and_required_columns() {
        let profile = DatasetProfile::build(&ledger_fixture());
        assert!(profile.supports_metric("pnl"));
        assert!(profile.supports_metric("COUNT"));
        assert!(profile.supports_metric(""));
        assert!(profile.supports_metric("unknown"));
        assert!(!profile.supports_metric("cap_rate"));
    }

    #[test]
    fn prompt_json_is_compact_and_omits_value_lists() {
        let profile = DatasetProfile::build(&ledger_fixture());
        let rendered = profile.prompt_json();
        assert!(rendered.contains("supported_metrics"));
        assert!(rendered.contains("dataset_guide"));
        assert!(!rendered.contains("Acme Corp"));
    }
}
