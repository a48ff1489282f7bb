//! Per-turn pipeline state machine.
//!
//! `Start → Routed → {Clarify, Fallback, DefinitionsDirect, Planning} →
//! Executed → Finalized`. No state is revisited within a turn: there is no
//! retry loop, which bounds worst-case latency. Each turn owns its state
//! exclusively; the only shared inputs are the immutable base table and
//! profile.

use std::sync::Arc;

use atrium_core::entities::{resolve, time};
use atrium_core::guards::{pre_route, GuardConfig};
use atrium_core::intent::{MSG_CANNOT_PROCEED, MSG_NO_MATCHING_RECORDS};
use atrium_core::profile::DatasetProfile;
use atrium_core::sandbox::{ExecLimits, ExecutionResult, Executor};
use atrium_core::table::Table;
use atrium_core::{EntityBundle, FallbackKind, Intent, QueryPlan, RoutingAction};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::composer::{answer_from_profile, answer_from_result, ResultPayload};
use crate::llm::{ChatMessage, LlmClient};
use crate::planner::{generate_plan, PlanningOutcome, PLAN_CLARIFICATION};
use crate::router::classify_and_extract;

pub const GENERIC_CLARIFICATION: &str = "Please clarify your question.";
pub const MISSING_DETAILS_CLARIFICATION: &str = "Please clarify the missing details.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    Start,
    Routed,
    Clarify,
    Fallback,
    DefinitionsDirect,
    Planning,
    Executed,
    Finalized,
}

impl TurnState {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Routed => "routed",
            Self::Clarify => "clarify",
            Self::Fallback => "fallback",
            Self::DefinitionsDirect => "definitions_direct",
            Self::Planning => "planning",
            Self::Executed => "executed",
            Self::Finalized => "finalized",
        }
    }
}

/// Terminal output of one turn. Exactly one of answer, clarification, or
/// fallback is ever populated; the enum makes that structural.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Answer(String),
    Clarification(String),
    Fallback { kind: FallbackKind, message: String },
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::Clarification(text) => text,
            Self::Fallback { message, .. } => message,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Answer(_) => "factual",
            Self::Clarification(_) => "clarification",
            Self::Fallback { kind, .. } => match kind {
                FallbackKind::NotPresent => "not_present",
                FallbackKind::OutOfScope => "out_of_scope",
                FallbackKind::Adversarial => "adversarial",
                FallbackKind::Gibberish => "gibberish",
            },
        }
    }
}

/// One user-request lifecycle. Owned exclusively by the pipeline
/// invocation and handed back whole; nothing is written into shared
/// structures.
#[derive(Clone, Debug)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub user_text: String,
    pub intent: Option<Intent>,
    pub entities: EntityBundle,
    pub plan: Option<QueryPlan>,
    pub execution: Option<ExecutionResult>,
    pub outcome: TurnOutcome,
}

impl ConversationTurn {
    pub fn final_text(&self) -> &str {
        self.outcome.text()
    }
}

pub struct Pipeline {
    table: Arc<Table>,
    profile: Arc<DatasetProfile>,
    llm: Arc<dyn LlmClient>,
    guard_config: GuardConfig,
    executor: Executor,
    extractor_tokens: u32,
    planner_tokens: u32,
    answer_tokens: u32,
    today_override: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new(table: Arc<Table>, profile: Arc<DatasetProfile>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            table,
            profile,
            llm,
            guard_config: GuardConfig::default(),
            executor: Executor::default(),
            extractor_tokens: 320,
            planner_tokens: 700,
            answer_tokens: 220,
            today_override: None,
        }
    }

    pub fn with_guard_config(mut self, config: GuardConfig) -> Self {
        self.guard_config = config;
        self
    }

    pub fn with_exec_limits(mut self, limits: ExecLimits) -> Self {
        self.executor = Executor::new(limits);
        self
    }

    pub fn with_token_budgets(mut self, extractor: u32, planner: u32, answer: u32) -> Self {
        self.extractor_tokens = extractor;
        self.planner_tokens = planner;
        self.answer_tokens = answer;
        self
    }

    /// Pin "today" for relative time-scope resolution; tests use this to
    /// stay deterministic.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today_override = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today_override.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Process one user message start to finish. Never panics and never
    /// returns an error: every failure mode terminates in a typed outcome.
    pub async fn run_turn(&self, user_text: &str, history: &[ChatMessage]) -> ConversationTurn {
        let id = Uuid::new_v4();
        let text = user_text.trim().to_string();
        let mut turn = Turn {
            id,
            user_text: text.clone(),
            state: TurnState::Start,
            intent: None,
            entities: EntityBundle::default(),
            plan: None,
            execution: None,
        };
        tracing::info!(event_name = "pipeline.turn_received", turn_id = %id, "turn started");

        if let Some(verdict) = pre_route(&text, &self.guard_config) {
            turn.intent = Some(verdict.intent());
            turn.advance(TurnState::Fallback);
            return turn.finish(TurnOutcome::Fallback {
                kind: verdict.fallback_kind(),
                message: verdict.message().to_string(),
            });
        }

        let routed = classify_and_extract(
            self.llm.as_ref(),
            &self.profile,
            &text,
            history,
            self.extractor_tokens,
        )
        .await;
        turn.advance(TurnState::Routed);
        turn.intent = Some(routed.decision.intent);
        turn.entities = routed.entities;

        match routed.decision.action {
            RoutingAction::Fallback => {
                let kind = FallbackKind::for_intent(routed.decision.intent);
                turn.advance(TurnState::Fallback);
                turn.finish(TurnOutcome::Fallback { kind, message: kind.message().to_string() })
            }
            RoutingAction::Clarify => {
                let prompt = non_empty_or(&routed.decision.clarification_prompt, GENERIC_CLARIFICATION);
                turn.advance(TurnState::Clarify);
                turn.finish(TurnOutcome::Clarification(prompt))
            }
            RoutingAction::Continue => self.continue_turn(turn, &text, history).await,
        }
    }

    async fn continue_turn(
        &self,
        mut turn: Turn,
        text: &str,
        history: &[ChatMessage],
    ) -> ConversationTurn {
        time::resolve_relative_time_scope(&mut turn.entities, self.today());
        let unresolved = resolve::resolve_ledger_raw_mentions(&mut turn.entities, &self.profile);
        let mut missing = resolve::missing_requested_values(&mut turn.entities, &self.profile);
        if !unresolved.is_empty() {
            missing.insert("ledger_raw_mentions".to_string(), unresolved);
        }
        if !missing.is_empty() {
            tracing::info!(
                event_name = "pipeline.entities_not_present",
                turn_id = %turn.id,
                missing_columns = missing.len(),
                "requested values absent from dataset"
            );
            turn.advance(TurnState::Fallback);
            return turn.finish(fallback(FallbackKind::NotPresent));
        }
        if !self.profile.supports_metric(&turn.entities.requested_metric) {
            tracing::info!(
                event_name = "pipeline.unsupported_metric",
                turn_id = %turn.id,
                requested_metric = %turn.entities.requested_metric,
                "requested metric not supported by profile"
            );
            turn.advance(TurnState::Fallback);
            return turn.finish(fallback(FallbackKind::NotPresent));
        }
        if turn.entities.needs_clarification {
            let prompt =
                non_empty_or(&turn.entities.clarification_prompt, MISSING_DETAILS_CLARIFICATION);
            turn.advance(TurnState::Clarify);
            return turn.finish(TurnOutcome::Clarification(prompt));
        }

        match turn.intent {
            Some(Intent::Definitions) => {
                turn.advance(TurnState::DefinitionsDirect);
                match answer_from_profile(
                    self.llm.as_ref(),
                    &self.profile,
                    text,
                    history,
                    self.answer_tokens,
                )
                .await
                {
                    Ok(answer) => turn.finish(TurnOutcome::Answer(answer)),
                    Err(error) => {
                        tracing::warn!(
                            event_name = "pipeline.definitions_answer_failed",
                            turn_id = %turn.id,
                            error = %error,
                            "definitions answer call failed"
                        );
                        turn.finish(TurnOutcome::Clarification(PLAN_CLARIFICATION.to_string()))
                    }
                }
            }
            Some(Intent::DatasetKnowledge) => self.plan_and_execute(turn, text, history).await,
            Some(
                intent @ (Intent::GeneralKnowledge | Intent::Adversarial | Intent::Gibberish),
            ) => {
                // A continue action with a terminal intent is a model
                // inconsistency; close it out with the canonical message.
                let kind = FallbackKind::for_intent(intent);
                turn.advance(TurnState::Fallback);
                turn.finish(TurnOutcome::Fallback { kind, message: kind.message().to_string() })
            }
            _ => {
                turn.advance(TurnState::Clarify);
                turn.finish(TurnOutcome::Clarification(GENERIC_CLARIFICATION.to_string()))
            }
        }
    }

    async fn plan_and_execute(
        &self,
        mut turn: Turn,
        text: &str,
        history: &[ChatMessage],
    ) -> ConversationTurn {
        turn.advance(TurnState::Planning);
        let outcome = generate_plan(
            self.llm.as_ref(),
            &self.profile,
            text,
            &turn.entities,
            history,
            self.planner_tokens,
        )
        .await;

        let plan = match outcome {
            PlanningOutcome::NeedsClarification(prompt) => {
                turn.advance(TurnState::Clarify);
                return turn.finish(TurnOutcome::Clarification(prompt));
            }
            PlanningOutcome::Rejected(verdict) => {
                turn.execution = Some(ExecutionResult::RejectedBySafety(verdict));
                turn.advance(TurnState::Fallback);
                return turn.finish(TurnOutcome::Fallback {
                    kind: FallbackKind::Adversarial,
                    message: MSG_CANNOT_PROCEED.to_string(),
                });
            }
            PlanningOutcome::Planned { plan, raw } => {
                turn.plan = Some(raw);
                plan
            }
        };

        turn.advance(TurnState::Executed);
        let result = self.executor.run(&plan, &self.table);
        turn.execution = Some(result.clone());

        match result {
            ExecutionResult::Success(result_table) => {
                let payload = ResultPayload::from_table(&result_table, plan.task_type());
                match answer_from_result(
                    self.llm.as_ref(),
                    &self.profile,
                    text,
                    &payload,
                    history,
                    self.answer_tokens,
                )
                .await
                {
                    Ok(answer) => turn.finish(TurnOutcome::Answer(answer)),
                    Err(error) => {
                        tracing::warn!(
                            event_name = "pipeline.answer_failed",
                            turn_id = %turn.id,
                            error = %error,
                            "final answer call failed"
                        );
                        turn.finish(fallback(FallbackKind::NotPresent))
                    }
                }
            }
            ExecutionResult::EmptyResult => {
                let answer =
                    time::time_range_not_present_answer(&turn.entities, &self.profile.time_ranges)
                        .unwrap_or_else(|| MSG_NO_MATCHING_RECORDS.to_string());
                turn.finish(TurnOutcome::Answer(answer))
            }
            ExecutionResult::ExecutionError(_) => turn.finish(fallback(FallbackKind::NotPresent)),
            ExecutionResult::RejectedBySafety(_) => turn.finish(TurnOutcome::Fallback {
                kind: FallbackKind::Adversarial,
                message: MSG_CANNOT_PROCEED.to_string(),
            }),
        }
    }
}

fn fallback(kind: FallbackKind) -> TurnOutcome {
    TurnOutcome::Fallback { kind, message: kind.message().to_string() }
}

fn non_empty_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// In-flight turn record; `finish` seals it into a ConversationTurn and
/// emits the terminal log line.
struct Turn {
    id: Uuid,
    user_text: String,
    state: TurnState,
    intent: Option<Intent>,
    entities: EntityBundle,
    plan: Option<QueryPlan>,
    execution: Option<ExecutionResult>,
}

impl Turn {
    fn advance(&mut self, to: TurnState) {
        tracing::debug!(
            event_name = "pipeline.transition",
            turn_id = %self.id,
            from = self.state.name(),
            to = to.name(),
            "state transition"
        );
        self.state = to;
    }

    fn finish(mut self, outcome: TurnOutcome) -> ConversationTurn {
        self.advance(TurnState::Finalized);
        tracing::info!(
            event_name = "pipeline.final_response",
            turn_id = %self.id,
            outcome_category = outcome.category(),
            "turn finalized"
        );
        ConversationTurn {
            id: self.id,
            user_text: self.user_text,
            intent: self.intent,
            entities: self.entities,
            plan: self.plan,
            execution: self.execution,
            outcome,
        }
    }
}
