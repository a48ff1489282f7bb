//! Wire contracts for the structured completion calls.
//!
//! Parsing is strict in shape but forgiving in content: unknown intent
//! labels and actions are normalized by the caller, and any shape failure
//! is a single typed error the stage can fail closed on.

use atrium_core::EntityBundle;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::LlmError;

/// Combined router output: one structured call classifies and extracts so
/// the extractor can never disagree with the router about relevance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterOutput {
    pub intent: String,
    pub action: String,
    pub fallback_message: String,
    pub clarification_prompt: String,
    pub reason: String,
    pub entities: EntityBundle,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerOutput {
    pub task_type: String,
    pub plan_code: String,
    pub needs_clarification: bool,
    pub clarification_prompt: String,
}

pub fn parse_router_output(value: Value) -> Result<RouterOutput, LlmError> {
    serde_json::from_value(value).map_err(|error| LlmError::Malformed(error.to_string()))
}

pub fn parse_planner_output(value: Value) -> Result<PlannerOutput, LlmError> {
    serde_json::from_value(value).map_err(|error| LlmError::Malformed(error.to_string()))
}

fn string_list() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

pub fn router_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intent": {
                "type": "string",
                "enum": [
                    "dataset_knowledge",
                    "definitions",
                    "general_knowledge",
                    "ambiguous",
                    "adversarial",
                    "gibberish",
                ],
            },
            "action": {"type": "string", "enum": ["continue", "fallback", "clarify"]},
            "fallback_message": {"type": "string"},
            "clarification_prompt": {"type": "string"},
            "reason": {"type": "string"},
            "entities": {
                "type": "object",
                "properties": {
                    "entity_name": string_list(),
                    "property_name": string_list(),
                    "tenant_name": string_list(),
                    "ledger_type": string_list(),
                    "ledger_group": string_list(),
                    "ledger_category": string_list(),
                    "ledger_code": string_list(),
                    "ledger_description": string_list(),
                    "ledger_raw_mentions": string_list(),
                    "request_target": string_list(),
                    "requested_metric": {"type": "string"},
                    "ranking": {
                        "type": "object",
                        "properties": {
                            "mode": {"type": "string", "enum": ["none", "highest", "lowest"]},
                            "top_k": {"type": ["integer", "null"]},
                        },
                    },
                    "time_scope": {
                        "type": "object",
                        "properties": {
                            "mode": {
                                "type": "string",
                                "enum": ["none", "exact", "range", "relative"],
                            },
                            "month": {"type": ["string", "null"]},
                            "quarter": {"type": ["string", "null"]},
                            "year": {"type": ["string", "null"]},
                            "column": {"type": ["string", "null"]},
                            "start": {"type": ["string", "null"]},
                            "end": {"type": ["string", "null"]},
                            "relative_period": {"type": ["string", "null"]},
                        },
                    },
                    "needs_clarification": {"type": "boolean"},
                    "clarification_prompt": {"type": "string"},
                },
            },
        },
        "required": ["intent", "action", "reason", "entities"],
    })
}

pub fn planner_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "task_type": {"type": "string"},
            "plan_code": {"type": "string"},
            "needs_clarification": {"type": "boolean"},
            "clarification_prompt": {"type": "string"},
        },
        "required": ["task_type", "plan_code"],
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_planner_output, parse_router_output};

    #[test]
    fn router_output_parses_with_partial_entities() {
        let parsed = parse_router_output(json!({
            "intent": "dataset_knowledge",
            "action": "continue",
            "reason": "in-scope",
            "entities": {
                "property_name": ["Building 160"],
                "requested_metric": "pnl",
                "time_scope": {"mode": "exact", "quarter": "2024-Q1"},
            },
        }))
        .expect("router output parses");

        assert_eq!(parsed.intent, "dataset_knowledge");
        assert_eq!(parsed.entities.property_name, vec!["Building 160".to_string()]);
        assert_eq!(parsed.entities.time_scope.quarter.as_deref(), Some("2024-Q1"));
    }

    #[test]
    fn wrong_shapes_fail_as_malformed() {
        assert!(parse_router_output(json!({"entities": ["not", "an", "object"]})).is_err());
        assert!(parse_planner_output(json!("just a string")).is_err());
    }

    #[test]
    fn planner_output_defaults_optional_fields() {
        let parsed = parse_planner_output(json!({
            "task_type": "pnl",
            "plan_code": "result = count(dataset)",
        }))
        .expect("planner output parses");
        assert!(!parsed.needs_clarification);
        assert!(parsed.clarification_prompt.is_empty());
    }
}
