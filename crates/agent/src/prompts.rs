//! Prompt builders for the routing, planning, and answer calls.
//!
//! The dataset profile is injected as compact JSON; the planner prompt
//! additionally pins the restricted plan language so generated code stays
//! inside the allow-list the validator enforces.

use atrium_core::intent::{MSG_CANNOT_PROCEED, MSG_GIBBERISH, MSG_OUT_OF_SCOPE};

pub fn build_router_prompt(profile_json: &str) -> String {
    format!(
        "You are the guard and extractor for a real-estate asset management agent.\n\
         \n\
         Dataset context:\n{profile_json}\n\
         \n\
         Steps:\n\
         1) Classify intent into one of: dataset_knowledge, definitions, general_knowledge, \
         ambiguous, adversarial, gibberish.\n\
         2) Choose action: continue (in-scope dataset or definitions question), fallback \
         (out-of-scope/adversarial/gibberish), clarify (missing required details).\n\
         3) If action=continue, extract entities with strict column alignment. Extract only \
         concrete values explicitly mentioned in the user text; never invent values and never \
         convert abstract business terms into column values.\n\
         4) If a ledger-like literal is present but the exact ledger column is uncertain, put it \
         in ledger_raw_mentions exactly as written. Financial intent words (P&L, profit, loss, \
         revenue, expenses) map to request_target and requested_metric, not to ledger columns.\n\
         5) requested_metric must be a canonical label: pnl, net_pnl, revenue_total, \
         expenses_total, count, sum_profit, or unknown. ranking.mode is highest|lowest|none with \
         top_k set for top-N requests.\n\
         6) Exact month/quarter/year mentions fill time_scope with mode=exact; phrases like \
         \"this year\" or \"last quarter\" set mode=relative with relative_period; no timeframe \
         means mode=none.\n\
         7) Use dataset_knowledge for any dataset-backed retrieval, filtering, ranking, \
         aggregation, comparison, or availability question. Use definitions only for explanatory \
         or methodology questions answerable without touching rows.\n\
         \n\
         Fallback messages:\n\
         - general_knowledge: \"{MSG_OUT_OF_SCOPE}\"\n\
         - adversarial: \"{MSG_CANNOT_PROCEED}\"\n\
         - gibberish: \"{MSG_GIBBERISH}\"\n\
         \n\
         Return output matching the response schema exactly."
    )
}

pub fn build_planner_prompt(profile_json: &str) -> String {
    format!(
        "You generate query plans over a ledger table for a real-estate agent.\n\
         \n\
         Dataset context:\n{profile_json}\n\
         \n\
         Plans are short programs in a restricted language, one assignment per line:\n\
         - The input table is bound to `dataset`; the output MUST be assigned to `result`.\n\
         - Bind the filtered working set to `filtered` before aggregating so empty matches are \
         detected.\n\
         - Allowed functions, and nothing else: filter, eq, ne, gt, ge, lt, le, isin, contains, \
         and, or, not, select, distinct, sort, limit, group_sum, group_count, sum, count.\n\
         - String and number literals only; no imports, no other identifiers.\n\
         \n\
         Example (net P&L for one quarter):\n\
         filtered = filter(dataset, eq(\"quarter\", \"2024-Q1\"))\n\
         result = group_sum(filtered, [\"ledger_type\"], \"profit\")\n\
         \n\
         Example (property with most tenants):\n\
         pairs = distinct(dataset, [\"property_name\", \"tenant_name\"])\n\
         counts = group_count(pairs, [\"property_name\"])\n\
         result = limit(sort(counts, \"count\", \"desc\"), 1)\n\
         \n\
         Use the resolved entity values verbatim as filter literals. If the request cannot be \
         expressed, set needs_clarification=true with a specific prompt instead of inventing a \
         plan. Return output matching the response schema exactly."
    )
}

pub fn build_answer_prompt(profile_json: &str) -> String {
    format!(
        "You phrase final answers for a real-estate asset management agent.\n\
         \n\
         Dataset context:\n{profile_json}\n\
         \n\
         The user payload contains the original question and result_json holding the rows the \
         query produced. Ground every number and name in result_json; never invent values that \
         are not present. When result_json is empty, answer from the dataset context only for \
         definition/methodology questions. Answer in one short paragraph, no markdown tables."
    )
}

#[cfg(test)]
mod tests {
    use super::{build_answer_prompt, build_planner_prompt, build_router_prompt};
    use atrium_core::intent::MSG_OUT_OF_SCOPE;
    use atrium_core::plan::ALLOWED_FUNCTIONS;

    #[test]
    fn router_prompt_embeds_profile_and_canonical_fallbacks() {
        let prompt = build_router_prompt("{\"columns\":[\"profit\"]}");
        assert!(prompt.contains("{\"columns\":[\"profit\"]}"));
        assert!(prompt.contains(MSG_OUT_OF_SCOPE));
        assert!(prompt.contains("dataset_knowledge"));
    }

    #[test]
    fn planner_prompt_names_every_allowed_function() {
        let prompt = build_planner_prompt("{}");
        for function in ALLOWED_FUNCTIONS {
            assert!(prompt.contains(function), "prompt missing builtin {function}");
        }
        assert!(prompt.contains("`result`"));
    }

    #[test]
    fn answer_prompt_forbids_invented_values() {
        let prompt = build_answer_prompt("{}");
        assert!(prompt.contains("never invent values"));
    }
}
