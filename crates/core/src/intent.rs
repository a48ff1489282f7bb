use serde::{Deserialize, Serialize};

/// Canonical fallback messages. Wording is asserted by callers and tests;
/// do not edit without updating both.
pub const MSG_NOT_PRESENT: &str = "The requested information is not present in the dataset";
pub const MSG_OUT_OF_SCOPE: &str =
    "I am a real estate asset manager agent, please ask me questions about real estate assets in my base";
pub const MSG_CANNOT_PROCEED: &str = "Cannot proceed with this request";
pub const MSG_GIBBERISH: &str = "I don't understand the question, please rephrase it";
pub const MSG_MULTIPLE_QUESTIONS: &str =
    "Please, don't ask more than one question at a time. Choose one and ask again";
/// Distinct from [`MSG_NOT_PRESENT`]: the query ran and matched nothing,
/// which is a valid outcome rather than a failure.
pub const MSG_NO_MATCHING_RECORDS: &str =
    "No matching records were found in the dataset for this request";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DatasetKnowledge,
    Definitions,
    GeneralKnowledge,
    Ambiguous,
    Adversarial,
    Gibberish,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatasetKnowledge => "dataset_knowledge",
            Self::Definitions => "definitions",
            Self::GeneralKnowledge => "general_knowledge",
            Self::Ambiguous => "ambiguous",
            Self::Adversarial => "adversarial",
            Self::Gibberish => "gibberish",
        }
    }

    /// Parse a model-reported label; anything unrecognized collapses to
    /// `Ambiguous` so a malformed response never widens the intent set.
    pub fn parse_or_ambiguous(raw: &str) -> Self {
        match raw.trim() {
            "dataset_knowledge" => Self::DatasetKnowledge,
            "definitions" => Self::Definitions,
            "general_knowledge" => Self::GeneralKnowledge,
            "adversarial" => Self::Adversarial,
            "gibberish" => Self::Gibberish,
            _ => Self::Ambiguous,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    Continue,
    Fallback,
    Clarify,
}

impl RoutingAction {
    pub fn parse_or_clarify(raw: &str) -> Self {
        match raw.trim() {
            "continue" => Self::Continue,
            "fallback" => Self::Fallback,
            _ => Self::Clarify,
        }
    }
}

/// User-visible failure category for a terminal fallback answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    NotPresent,
    OutOfScope,
    Adversarial,
    Gibberish,
}

impl FallbackKind {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotPresent => MSG_NOT_PRESENT,
            Self::OutOfScope => MSG_OUT_OF_SCOPE,
            Self::Adversarial => MSG_CANNOT_PROCEED,
            Self::Gibberish => MSG_GIBBERISH,
        }
    }

    /// Category for a fallback-routed intent. Non-fallback intents map to
    /// `NotPresent`, the safe default for anything that reached a dead end.
    pub fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Adversarial => Self::Adversarial,
            Intent::Gibberish => Self::Gibberish,
            Intent::GeneralKnowledge => Self::OutOfScope,
            _ => Self::NotPresent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FallbackKind, Intent, RoutingAction, MSG_CANNOT_PROCEED, MSG_OUT_OF_SCOPE};

    #[test]
    fn unknown_intent_labels_collapse_to_ambiguous() {
        assert_eq!(Intent::parse_or_ambiguous("dataset_knowledge"), Intent::DatasetKnowledge);
        assert_eq!(Intent::parse_or_ambiguous("definitely_not_a_label"), Intent::Ambiguous);
        assert_eq!(Intent::parse_or_ambiguous(""), Intent::Ambiguous);
    }

    #[test]
    fn unknown_actions_collapse_to_clarify() {
        assert_eq!(RoutingAction::parse_or_clarify("continue"), RoutingAction::Continue);
        assert_eq!(RoutingAction::parse_or_clarify("fallback"), RoutingAction::Fallback);
        assert_eq!(RoutingAction::parse_or_clarify("retry"), RoutingAction::Clarify);
    }

    #[test]
    fn fallback_kind_per_intent_has_stable_message() {
        assert_eq!(FallbackKind::for_intent(Intent::Adversarial).message(), MSG_CANNOT_PROCEED);
        assert_eq!(FallbackKind::for_intent(Intent::GeneralKnowledge).message(), MSG_OUT_OF_SCOPE);
        assert_eq!(
            FallbackKind::for_intent(Intent::DatasetKnowledge),
            FallbackKind::NotPresent
        );
    }

    #[test]
    fn intent_labels_round_trip() {
        for intent in [
            Intent::DatasetKnowledge,
            Intent::Definitions,
            Intent::GeneralKnowledge,
            Intent::Ambiguous,
            Intent::Adversarial,
            Intent::Gibberish,
        ] {
            assert_eq!(Intent::parse_or_ambiguous(intent.as_str()), intent);
        }
    }
}
