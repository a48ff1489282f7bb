use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::plan::lexer::{lex, Token};
use crate::plan::{QueryPlan, ALLOWED_FUNCTIONS, INPUT_TABLE_NAME};

/// Substrings that must never appear in plan source, scanned lowercase.
/// Grouped by the capability they would reach for. Over-rejection is the
/// accepted trade-off; a rejected plan degrades to a canonical fallback.
pub const FORBIDDEN_PATTERNS: &[&str] = &[
    // import-like tokens
    "import",
    "include",
    "require",
    "extern",
    "__",
    "::",
    // filesystem and path literals
    "/",
    "\\",
    "open(",
    "file",
    "path",
    // network
    "http",
    "url",
    "socket",
    "fetch",
    "request",
    "curl",
    // process and environment state
    "env(",
    "environ",
    "process",
    "command",
    "spawn",
    "system",
    "shell",
    "subprocess",
    // dynamic evaluation
    "exec",
    "eval",
    "compile",
    "unsafe",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub allowed: bool,
    pub violations: BTreeSet<String>,
}

/// A plan that passed static inspection. Constructible only through
/// [`validate`], which is what lets the executor demand proof of
/// inspection in its signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPlan {
    plan: QueryPlan,
}

impl ValidatedPlan {
    pub fn task_type(&self) -> &str {
        &self.plan.task_type
    }

    pub fn source(&self) -> &str {
        &self.plan.source
    }
}

/// Statically inspect a generated plan: forbidden-pattern scan over the
/// raw source, then an identifier walk over the token stream. Any symbol
/// outside the builtin set, the input table handle, and the plan's own
/// bindings is a violation.
pub fn validate(plan: QueryPlan) -> Result<ValidatedPlan, SafetyVerdict> {
    let mut violations = BTreeSet::new();

    let lowered = plan.source.to_lowercase();
    for pattern in FORBIDDEN_PATTERNS {
        if lowered.contains(pattern) {
            violations.insert((*pattern).to_string());
        }
    }

    // Identifier inspection is best-effort on unlexable input; the lexer
    // rejection itself surfaces later as an execution fault, not a safety
    // violation.
    if let Ok(tokens) = lex(&plan.source) {
        let mut bindings = BTreeSet::new();
        bindings.insert(INPUT_TABLE_NAME.to_string());
        for window in tokens.windows(2) {
            if let [Token::Ident(name), Token::Equals] = window {
                bindings.insert(name.clone());
            }
        }

        let mut index = 0;
        while index < tokens.len() {
            if let Token::Ident(name) = &tokens[index] {
                let is_call = matches!(tokens.get(index + 1), Some(Token::LParen));
                let is_assignment = matches!(tokens.get(index + 1), Some(Token::Equals));
                if is_call {
                    if !ALLOWED_FUNCTIONS.contains(&name.as_str()) {
                        violations.insert(format!("unknown-function:{name}"));
                    }
                } else if !is_assignment && !bindings.contains(name) {
                    violations.insert(format!("unknown-identifier:{name}"));
                }
            }
            index += 1;
        }
    }

    if violations.is_empty() {
        Ok(ValidatedPlan { plan })
    } else {
        tracing::warn!(
            event_name = "plan.safety_rejected",
            violation_count = violations.len(),
            "generated plan rejected by safety validation"
        );
        Err(SafetyVerdict { allowed: false, violations })
    }
}
