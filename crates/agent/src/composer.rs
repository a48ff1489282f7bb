//! Final-answer composition.
//!
//! For successful executions the result rows are the sole grounding
//! context; for definitions the profile context stands in. Fallback
//! categories never reach a model call — their canonical messages are
//! emitted directly by the pipeline.

use atrium_core::entities::time::humanize_month_tokens;
use atrium_core::profile::DatasetProfile;
use atrium_core::table::Table;
use atrium_core::MSG_NOT_PRESENT;
use serde::Serialize;
use serde_json::{json, Value};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts::build_answer_prompt;

/// Upper bound on rows handed to the answer call.
pub const RESULT_ROW_LIMIT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct ResultPayload {
    pub rows: Vec<Value>,
    pub total_rows: usize,
    pub truncated: bool,
    pub task_type: String,
}

impl ResultPayload {
    pub fn from_table(table: &Table, task_type: &str) -> Self {
        let total_rows = table.row_count();
        let rows = table.truncated(RESULT_ROW_LIMIT).records();
        Self {
            truncated: total_rows > rows.len(),
            rows,
            total_rows,
            task_type: task_type.to_string(),
        }
    }
}

pub async fn answer_from_result(
    llm: &dyn LlmClient,
    profile: &DatasetProfile,
    user_text: &str,
    payload: &ResultPayload,
    history: &[ChatMessage],
    max_output_tokens: u32,
) -> Result<String, crate::llm::LlmError> {
    if payload.rows.is_empty() {
        return Ok(humanize_month_tokens(MSG_NOT_PRESENT));
    }
    let system_prompt = build_answer_prompt(&profile.prompt_json());
    let user_prompt =
        json!({"user_query": user_text, "result_json": payload}).to_string();
    let answer = llm
        .complete_text(CompletionRequest {
            system_prompt: &system_prompt,
            user_prompt: &user_prompt,
            history,
            max_output_tokens,
        })
        .await?;
    Ok(humanize_month_tokens(answer.trim()))
}

/// Definitions lane: compose from profile context only, no rows involved.
pub async fn answer_from_profile(
    llm: &dyn LlmClient,
    profile: &DatasetProfile,
    user_text: &str,
    history: &[ChatMessage],
    max_output_tokens: u32,
) -> Result<String, crate::llm::LlmError> {
    let system_prompt = build_answer_prompt(&profile.prompt_json());
    let user_prompt = json!({"user_query": user_text, "result_json": {}}).to_string();
    let answer = llm
        .complete_text(CompletionRequest {
            system_prompt: &system_prompt,
            user_prompt: &user_prompt,
            history,
            max_output_tokens,
        })
        .await?;
    Ok(humanize_month_tokens(answer.trim()))
}
