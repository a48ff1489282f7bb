pub mod resolve;
pub mod time;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    #[default]
    None,
    Highest,
    Lowest,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ranking {
    pub mode: RankMode,
    pub top_k: Option<u32>,
}

impl Ranking {
    pub fn is_active(&self) -> bool {
        self.mode != RankMode::None || self.top_k.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScopeMode {
    #[default]
    None,
    Exact,
    Range,
    Relative,
}

/// Extracted time scope. At most one of month/quarter/year is set once the
/// scope has been normalized (month wins over quarter, quarter over year).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeScope {
    pub mode: TimeScopeMode,
    pub month: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<String>,
    pub column: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub relative_period: Option<String>,
}

impl TimeScope {
    pub fn is_set(&self) -> bool {
        self.mode != TimeScopeMode::None
    }
}

/// Column-aligned structured extraction from one user message. Values are
/// untrusted until resolved against the dataset profile; unresolved values
/// are treated as absent, never as query predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityBundle {
    pub entity_name: Vec<String>,
    pub property_name: Vec<String>,
    pub tenant_name: Vec<String>,
    pub ledger_type: Vec<String>,
    pub ledger_group: Vec<String>,
    pub ledger_category: Vec<String>,
    pub ledger_code: Vec<String>,
    pub ledger_description: Vec<String>,
    /// Ledger-like literals whose column is uncertain, kept verbatim until
    /// resolution can place them in a concrete ledger column.
    pub ledger_raw_mentions: Vec<String>,
    pub request_target: Vec<String>,
    pub requested_metric: String,
    pub ranking: Ranking,
    pub time_scope: TimeScope,
    pub needs_clarification: bool,
    pub clarification_prompt: String,
}

/// Ledger columns that participate in cross-column value rescue.
pub const LEDGER_COLUMNS: [&str; 5] =
    ["ledger_type", "ledger_group", "ledger_category", "ledger_code", "ledger_description"];

/// Columns whose extracted values must exist in the profile before a
/// dataset query may run.
pub const MISSING_CHECK_COLUMNS: [&str; 8] = [
    "entity_name",
    "property_name",
    "tenant_name",
    "ledger_code",
    "ledger_type",
    "ledger_group",
    "ledger_category",
    "ledger_description",
];

/// Columns holding concrete values that disqualify the definitions lane.
pub const CONCRETE_VALUE_COLUMNS: [&str; 9] = [
    "entity_name",
    "property_name",
    "tenant_name",
    "ledger_type",
    "ledger_group",
    "ledger_category",
    "ledger_code",
    "ledger_description",
    "ledger_raw_mentions",
];

impl EntityBundle {
    pub fn values(&self, column: &str) -> Option<&Vec<String>> {
        match column {
            "entity_name" => Some(&self.entity_name),
            "property_name" => Some(&self.property_name),
            "tenant_name" => Some(&self.tenant_name),
            "ledger_type" => Some(&self.ledger_type),
            "ledger_group" => Some(&self.ledger_group),
            "ledger_category" => Some(&self.ledger_category),
            "ledger_code" => Some(&self.ledger_code),
            "ledger_description" => Some(&self.ledger_description),
            "ledger_raw_mentions" => Some(&self.ledger_raw_mentions),
            _ => None,
        }
    }

    pub fn values_mut(&mut self, column: &str) -> Option<&mut Vec<String>> {
        match column {
            "entity_name" => Some(&mut self.entity_name),
            "property_name" => Some(&mut self.property_name),
            "tenant_name" => Some(&mut self.tenant_name),
            "ledger_type" => Some(&mut self.ledger_type),
            "ledger_group" => Some(&mut self.ledger_group),
            "ledger_category" => Some(&mut self.ledger_category),
            "ledger_code" => Some(&mut self.ledger_code),
            "ledger_description" => Some(&mut self.ledger_description),
            "ledger_raw_mentions" => Some(&mut self.ledger_raw_mentions),
            _ => None,
        }
    }

    /// True when any explicit entity value is present, used to defer a
    /// clarification in favor of value validation.
    pub fn has_explicit_entity(&self) -> bool {
        ["property_name", "tenant_name", "entity_name", "ledger_code"].iter().any(|column| {
            self.values(column)
                .map(|values| values.iter().any(|value| !value.trim().is_empty()))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityBundle, RankMode, Ranking, TimeScopeMode};

    #[test]
    fn bundle_deserializes_from_partial_json_with_defaults() {
        let bundle: EntityBundle = serde_json::from_str(
            r#"{"property_name": ["Building 160"], "requested_metric": "pnl",
                "ranking": {"mode": "highest", "top_k": 1},
                "time_scope": {"mode": "exact", "quarter": "2024-Q1"}}"#,
        )
        .expect("partial bundle parses");

        assert_eq!(bundle.property_name, vec!["Building 160".to_string()]);
        assert_eq!(bundle.ranking.mode, RankMode::Highest);
        assert_eq!(bundle.time_scope.mode, TimeScopeMode::Exact);
        assert!(bundle.entity_name.is_empty());
        assert!(!bundle.needs_clarification);
    }

    #[test]
    fn ranking_activity_covers_mode_and_top_k() {
        assert!(!Ranking::default().is_active());
        assert!(Ranking { mode: RankMode::Lowest, top_k: None }.is_active());
        assert!(Ranking { mode: RankMode::None, top_k: Some(5) }.is_active());
    }

    #[test]
    fn explicit_entity_detection_ignores_blank_values() {
        let mut bundle = EntityBundle::default();
        assert!(!bundle.has_explicit_entity());
        bundle.tenant_name.push("  ".to_string());
        assert!(!bundle.has_explicit_entity());
        bundle.ledger_code.push("4100".to_string());
        assert!(bundle.has_explicit_entity());
    }
}
