//! Deterministic eligibility gate for the definitions lane.
//!
//! The classifier has a known bias: requests that *sound* definitional are
//! routed to `definitions` even when they need a concrete lookup. This gate
//! re-checks every turn and reclassifies; it is the only hard guarantee
//! against that bias, so it runs regardless of model confidence.

use crate::entities::{EntityBundle, TimeScopeMode, CONCRETE_VALUE_COLUMNS};
use crate::intent::Intent;

/// True only for pure profile-only explanatory questions: no concrete
/// values, no answer target, no computed metric, no ranking, no time
/// scope, no pending clarification.
pub fn definitions_is_eligible(bundle: &EntityBundle) -> bool {
    for column in CONCRETE_VALUE_COLUMNS {
        if let Some(values) = bundle.values(column) {
            if values.iter().any(|value| !value.trim().is_empty()) {
                return false;
            }
        }
    }

    if bundle.request_target.iter().any(|target| !target.trim().is_empty()) {
        return false;
    }

    let metric = bundle.requested_metric.trim().to_lowercase();
    if !metric.is_empty() && metric != "unknown" {
        return false;
    }

    if bundle.ranking.is_active() {
        return false;
    }

    if bundle.time_scope.mode != TimeScopeMode::None {
        return false;
    }

    !bundle.needs_clarification
}

/// Apply the gate to a routed intent. Only the definitions lane can be
/// overridden; every other intent passes through unchanged.
pub fn apply(intent: Intent, bundle: &EntityBundle) -> Intent {
    if intent == Intent::Definitions && !definitions_is_eligible(bundle) {
        tracing::info!(
            event_name = "gate.definitions_downgraded",
            "definitions intent reclassified to dataset_knowledge"
        );
        return Intent::DatasetKnowledge;
    }
    intent
}
