//! Routing & extraction stage: one structured call that classifies the
//! request and extracts entities in the same pass, then deterministic
//! post-processing (gate, clarification deferral).
//!
//! Failure policy: any transport, timeout, or shape failure closes into
//! `ambiguous` with an empty bundle. A partially parsed object is never
//! propagated downstream.

use atrium_core::gate;
use atrium_core::profile::DatasetProfile;
use atrium_core::{EntityBundle, Intent, RoutingAction};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts::build_router_prompt;
use crate::schemas::{parse_router_output, router_schema};

pub const DEFAULT_CLARIFICATION: &str =
    "Please rephrase your request with the target and time scope.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingDecision {
    pub intent: Intent,
    pub action: RoutingAction,
    pub clarification_prompt: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutedTurn {
    pub decision: RoutingDecision,
    pub entities: EntityBundle,
}

impl RoutedTurn {
    fn fail_closed(reason: &str) -> Self {
        Self {
            decision: RoutingDecision {
                intent: Intent::Ambiguous,
                action: RoutingAction::Clarify,
                clarification_prompt: DEFAULT_CLARIFICATION.to_string(),
                reason: reason.to_string(),
            },
            entities: EntityBundle::default(),
        }
    }
}

pub async fn classify_and_extract(
    llm: &dyn LlmClient,
    profile: &DatasetProfile,
    user_text: &str,
    history: &[ChatMessage],
    max_output_tokens: u32,
) -> RoutedTurn {
    let system_prompt = build_router_prompt(&profile.prompt_json());
    let request = CompletionRequest {
        system_prompt: &system_prompt,
        user_prompt: user_text,
        history,
        max_output_tokens,
    };

    let raw = match llm.complete_structured(request, "intent_extraction", &router_schema()).await {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event_name = "router.completion_failed",
                error = %error,
                "combined intent+extraction call failed; closing to ambiguous"
            );
            return RoutedTurn::fail_closed("combined intent+extraction failed");
        }
    };

    let output = match parse_router_output(raw) {
        Ok(output) => output,
        Err(error) => {
            tracing::warn!(
                event_name = "router.response_malformed",
                error = %error,
                "structured routing response failed shape validation"
            );
            return RoutedTurn::fail_closed("routing response was malformed");
        }
    };

    let mut intent = Intent::parse_or_ambiguous(&output.intent);
    let mut action = RoutingAction::parse_or_clarify(&output.action);
    let entities = output.entities;

    if action == RoutingAction::Continue {
        intent = gate::apply(intent, &entities);
    }

    // Validate explicit entities before asking for clarification: a value
    // that turns out to be absent produces the more specific answer.
    if action == RoutingAction::Clarify
        && intent == Intent::DatasetKnowledge
        && entities.has_explicit_entity()
    {
        action = RoutingAction::Continue;
        tracing::info!(
            event_name = "router.clarify_deferred",
            "clarification deferred in favor of entity validation"
        );
    }

    tracing::info!(
        event_name = "router.intent_detected",
        intent = intent.as_str(),
        reason = %output.reason,
        "routing decision made"
    );

    RoutedTurn {
        decision: RoutingDecision {
            intent,
            action,
            clarification_prompt: output.clarification_prompt,
            reason: output.reason,
        },
        entities,
    }
}
