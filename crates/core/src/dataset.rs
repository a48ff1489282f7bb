use std::path::Path;

use crate::errors::DatasetError;
use crate::table::{CellValue, Table};

/// Schema contract for the ledger dataset. Loading fails when any of these
/// columns is absent; extra columns are carried through untouched.
pub const EXPECTED_COLUMNS: [&str; 12] = [
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
    "profit",
];

/// Columns parsed as numbers. Everything else stays textual, including
/// ledger codes and period tokens such as `2025-M01`.
pub const NUMERIC_COLUMNS: [&str; 1] = ["profit"];

/// Load the ledger CSV into an in-memory table, validating the schema.
/// Called once at startup; the result is shared read-only for the life of
/// the process.
pub fn load_dataset(path: &Path) -> Result<Table, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| map_csv_error(path, source))?;

    let headers = reader
        .headers()
        .map_err(|source| map_csv_error(path, source))?
        .iter()
        .map(|header| header.to_string())
        .collect::<Vec<_>>();
    validate_columns(&headers)?;

    let numeric = headers
        .iter()
        .map(|header| NUMERIC_COLUMNS.contains(&header.as_str()))
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| map_csv_error(path, source))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(index, raw)| parse_cell(raw, numeric[index]))
            .collect::<Vec<_>>();
        rows.push(row);
    }

    let table = Table::new(headers, rows)?;
    tracing::info!(
        event_name = "dataset.loaded",
        row_count = table.row_count(),
        column_count = table.columns().len(),
        "ledger dataset loaded"
    );
    Ok(table)
}

pub fn validate_columns(columns: &[String]) -> Result<(), DatasetError> {
    let missing = EXPECTED_COLUMNS
        .iter()
        .filter(|expected| !columns.iter().any(|column| column == *expected))
        .map(|expected| expected.to_string())
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DatasetError::MissingColumns { missing })
    }
}

fn map_csv_error(path: &Path, source: csv::Error) -> DatasetError {
    let message = source.to_string();
    match source.into_kind() {
        csv::ErrorKind::Io(io_error) => {
            DatasetError::ReadFile { path: path.to_path_buf(), source: io_error }
        }
        _ => DatasetError::ParseFile { path: path.to_path_buf(), message },
    }
}

fn parse_cell(raw: &str, numeric: bool) -> CellValue {
    if raw.is_empty() {
        return CellValue::Null;
    }
    if numeric {
        match raw.parse::<f64>() {
            Ok(value) => CellValue::Number(value),
            Err(_) => CellValue::Null,
        }
    } else {
        CellValue::Text(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{load_dataset, validate_columns, EXPECTED_COLUMNS};
    use crate::table::CellValue;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn loads_rows_with_numeric_profit_and_null_blanks() {
        let header = EXPECTED_COLUMNS.join(",");
        let csv = format!(
            "{header}\n\
             PropCo,Building 160,Acme Corp,revenue,rental_income,base_rent,4100,Base rent,2024-M01,2024-Q1,2024,1250.75\n\
             PropCo,Building 180,,expenses,general_expenses,maintenance,8200,Maintenance,2024-M02,2024-Q1,2024,-420.10\n"
        );
        let file = write_csv(&csv);
        let table = load_dataset(file.path()).expect("dataset loads");

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "profit"), Some(&CellValue::Number(1250.75)));
        assert_eq!(table.cell(1, "tenant_name"), Some(&CellValue::Null));
        assert_eq!(
            table.cell(1, "ledger_code"),
            Some(&CellValue::Text("8200".to_string()))
        );
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let file = write_csv("entity_name,profit\nPropCo,10.0\n");
        let error = load_dataset(file.path()).expect_err("schema must fail");
        assert!(error.to_string().contains("missing required columns"));
    }

    #[test]
    fn validate_columns_accepts_extra_columns() {
        let mut columns =
            EXPECTED_COLUMNS.iter().map(|name| name.to_string()).collect::<Vec<_>>();
        columns.push("notes".to_string());
        assert!(validate_columns(&columns).is_ok());
    }
}
