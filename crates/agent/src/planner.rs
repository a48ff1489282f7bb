//! Query planning stage: ask the completion service for a restricted plan,
//! then statically validate it before anything may run. A rejected plan is
//! never retried; the turn degrades to a fallback answer instead.

use atrium_core::plan::{validate, QueryPlan, SafetyVerdict};
use atrium_core::profile::DatasetProfile;
use atrium_core::{EntityBundle, ValidatedPlan};
use serde_json::json;

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts::build_planner_prompt;
use crate::schemas::{parse_planner_output, planner_schema};

pub const PLAN_CLARIFICATION: &str =
    "Please clarify what information you want me to extract.";

#[derive(Clone, Debug, PartialEq)]
pub enum PlanningOutcome {
    /// A plan that passed static inspection, ready for the executor.
    Planned { plan: ValidatedPlan, raw: QueryPlan },
    NeedsClarification(String),
    Rejected(SafetyVerdict),
}

pub async fn generate_plan(
    llm: &dyn LlmClient,
    profile: &DatasetProfile,
    user_text: &str,
    entities: &EntityBundle,
    history: &[ChatMessage],
    max_output_tokens: u32,
) -> PlanningOutcome {
    let system_prompt = build_planner_prompt(&profile.prompt_json());
    let user_payload = json!({
        "user_query": user_text,
        "request_target": entities.request_target,
        "requested_metric": entities.requested_metric,
        "ranking": entities.ranking,
        "time_scope": entities.time_scope,
        "extracted_entities": entities,
    })
    .to_string();
    let request = CompletionRequest {
        system_prompt: &system_prompt,
        user_prompt: &user_payload,
        history,
        max_output_tokens,
    };

    let output = match llm.complete_structured(request, "query_plan", &planner_schema()).await {
        Ok(raw) => match parse_planner_output(raw) {
            Ok(output) => output,
            Err(error) => {
                tracing::warn!(
                    event_name = "planner.response_malformed",
                    error = %error,
                    "structured planning response failed shape validation"
                );
                return PlanningOutcome::NeedsClarification(PLAN_CLARIFICATION.to_string());
            }
        },
        Err(error) => {
            tracing::warn!(
                event_name = "planner.completion_failed",
                error = %error,
                "plan generation call failed"
            );
            return PlanningOutcome::NeedsClarification(PLAN_CLARIFICATION.to_string());
        }
    };

    if output.needs_clarification {
        let prompt = if output.clarification_prompt.trim().is_empty() {
            PLAN_CLARIFICATION.to_string()
        } else {
            output.clarification_prompt
        };
        return PlanningOutcome::NeedsClarification(prompt);
    }

    let source = output.plan_code.trim().to_string();
    if source.is_empty() {
        return PlanningOutcome::NeedsClarification(PLAN_CLARIFICATION.to_string());
    }

    let task_type = if output.task_type.trim().is_empty() {
        "asset_details".to_string()
    } else {
        output.task_type
    };
    let raw = QueryPlan::new(task_type.clone(), source);

    match validate(raw.clone()) {
        Ok(plan) => {
            tracing::info!(
                event_name = "planner.plan_generated",
                task_type = %task_type,
                "query plan generated and validated"
            );
            PlanningOutcome::Planned { plan, raw }
        }
        Err(verdict) => PlanningOutcome::Rejected(verdict),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use atrium_core::profile::DatasetProfile;
    use atrium_core::table::{CellValue, Table};
    use atrium_core::EntityBundle;
    use serde_json::{json, Value};

    use super::{generate_plan, PlanningOutcome, PLAN_CLARIFICATION};
    use crate::llm::{CompletionRequest, LlmClient, LlmError};

    struct StaticLlm {
        response: Option<Value>,
    }

    #[async_trait]
    impl LlmClient for StaticLlm {
        async fn complete_text(
            &self,
            _request: CompletionRequest<'_>,
        ) -> Result<String, LlmError> {
            Err(LlmError::Transport("unused".to_string()))
        }

        async fn complete_structured(
            &self,
            _request: CompletionRequest<'_>,
            _schema_name: &str,
            _schema: &Value,
        ) -> Result<Value, LlmError> {
            self.response.clone().ok_or(LlmError::Timeout)
        }
    }

    fn profile() -> DatasetProfile {
        let table = Table::new(
            atrium_core::EXPECTED_COLUMNS.iter().map(|name| name.to_string()).collect(),
            vec![vec![
                CellValue::Text("PropCo".to_string()),
                CellValue::Text("Building 160".to_string()),
                CellValue::Text("Acme Corp".to_string()),
                CellValue::Text("revenue".to_string()),
                CellValue::Text("rental_income".to_string()),
                CellValue::Text("base_rent".to_string()),
                CellValue::Text("4100".to_string()),
                CellValue::Text("Base rent".to_string()),
                CellValue::Text("2024-M01".to_string()),
                CellValue::Text("2024-Q1".to_string()),
                CellValue::Text("2024".to_string()),
                CellValue::Number(10.0),
            ]],
        )
        .expect("fixture");
        DatasetProfile::build(&table)
    }

    #[tokio::test]
    async fn valid_plan_is_validated_and_returned() {
        let llm = StaticLlm {
            response: Some(json!({
                "task_type": "pnl",
                "plan_code": "filtered = filter(dataset, eq(\"quarter\", \"2024-Q1\"))\nresult = group_sum(filtered, [\"ledger_type\"], \"profit\")",
            })),
        };
        let outcome =
            generate_plan(&llm, &profile(), "pnl 2024-Q1", &EntityBundle::default(), &[], 700)
                .await;
        let PlanningOutcome::Planned { plan, raw } = outcome else {
            panic!("expected planned outcome");
        };
        assert_eq!(plan.task_type(), "pnl");
        assert!(raw.source.contains("group_sum"));
    }

    #[tokio::test]
    async fn unsafe_plan_is_rejected_not_clarified() {
        let llm = StaticLlm {
            response: Some(json!({
                "task_type": "exfil",
                "plan_code": "result = fetch(\"http://example.com\")",
            })),
        };
        let outcome =
            generate_plan(&llm, &profile(), "anything", &EntityBundle::default(), &[], 700).await;
        let PlanningOutcome::Rejected(verdict) = outcome else {
            panic!("expected rejection");
        };
        assert!(!verdict.allowed);
        assert!(verdict.violations.contains("http"));
    }

    #[tokio::test]
    async fn empty_code_and_failures_ask_for_clarification() {
        let llm = StaticLlm {
            response: Some(json!({"task_type": "none", "plan_code": "   "})),
        };
        let outcome =
            generate_plan(&llm, &profile(), "anything", &EntityBundle::default(), &[], 700).await;
        assert_eq!(
            outcome,
            PlanningOutcome::NeedsClarification(PLAN_CLARIFICATION.to_string())
        );

        let llm = StaticLlm { response: None };
        let outcome =
            generate_plan(&llm, &profile(), "anything", &EntityBundle::default(), &[], 700).await;
        assert!(matches!(outcome, PlanningOutcome::NeedsClarification(_)));
    }

    #[tokio::test]
    async fn model_clarification_request_is_honored() {
        let llm = StaticLlm {
            response: Some(json!({
                "task_type": "comparison",
                "plan_code": "",
                "needs_clarification": true,
                "clarification_prompt": "Which two properties should I compare?",
            })),
        };
        let outcome =
            generate_plan(&llm, &profile(), "compare them", &EntityBundle::default(), &[], 700)
                .await;
        assert_eq!(
            outcome,
            PlanningOutcome::NeedsClarification(
                "Which two properties should I compare?".to_string()
            )
        );
    }
}
