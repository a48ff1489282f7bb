//! Resolution of extracted entity values against the dataset profile.
//!
//! Extracted strings are tolerant matches, not trusted predicates: each one
//! is normalized and resolved to a canonical dataset value, rescued across
//! sibling ledger columns when uniquely possible, and otherwise reported as
//! missing so the turn can end with the canonical "not present" answer.

use std::collections::{BTreeMap, BTreeSet};

use crate::entities::{EntityBundle, LEDGER_COLUMNS, MISSING_CHECK_COLUMNS};
use crate::profile::DatasetProfile;

/// Lowercase, strip punctuation to spaces, collapse runs. The common
/// currency for all tolerant comparisons in this module.
pub fn normalize(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    let mut last_was_space = true;
    for character in value.chars() {
        if character.is_ascii_alphanumeric() {
            normalized.push(character.to_ascii_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            normalized.push(' ');
            last_was_space = true;
        }
    }
    while normalized.ends_with(' ') {
        normalized.pop();
    }
    normalized
}

/// Resolve requested values to canonical dataset values using exact then
/// substring matching. Returns `(resolved, unresolved)`; when two or more
/// mentions jointly match one canonical value ("Building" + "160"), the
/// joined match supersedes the per-mention results.
pub fn resolve_requested_values(
    requested: &[String],
    allowed: &[String],
) -> (Vec<String>, Vec<String>) {
    if allowed.is_empty() {
        return (requested.to_vec(), Vec::new());
    }

    let mut normalized_to_originals: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for value in allowed {
        let normalized = normalize(value);
        if !normalized.is_empty() {
            normalized_to_originals.entry(normalized).or_default().push(value);
        }
    }

    let find_best_matches = |raw: &str| -> Vec<String> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Vec::new();
        }
        if let Some(originals) = normalized_to_originals.get(&normalized) {
            return originals.iter().map(|value| (*value).clone()).collect();
        }
        let mut substring_matches = BTreeSet::new();
        for (allowed_norm, originals) in &normalized_to_originals {
            if allowed_norm.contains(&normalized) || normalized.contains(allowed_norm.as_str()) {
                substring_matches.extend(originals.iter().map(|value| (*value).clone()));
            }
        }
        let mut matches = substring_matches.into_iter().collect::<Vec<_>>();
        matches.sort_by_key(String::len);
        matches
    };

    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();
    for value in requested {
        let raw = value.trim();
        if raw.is_empty() {
            continue;
        }
        let matches = find_best_matches(raw);
        match matches.into_iter().next() {
            Some(best) => resolved.push(best),
            None => unresolved.push(raw.to_string()),
        }
    }

    if requested.len() >= 2 {
        let joined = requested
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            if let Some(canonical) = find_best_matches(&joined).into_iter().next() {
                let canonical_norm = normalize(&canonical);
                resolved.retain(|item| normalize(item) != canonical_norm);
                resolved.push(canonical.clone());
                unresolved.retain(|item| !canonical_norm.contains(&normalize(item)));
            }
        }
    }

    let mut deduped = Vec::new();
    let mut seen = BTreeSet::new();
    for item in resolved {
        let key = normalize(&item);
        if !key.is_empty() && seen.insert(key) {
            deduped.push(item);
        }
    }
    (deduped, unresolved)
}

/// A mention is explicit enough to justify a "not present" answer only when
/// it carries a digit or at least two substantial tokens. Single vague
/// words ("office") are dropped silently instead.
pub fn is_explicit_identifier(value: &str) -> bool {
    let normalized = normalize(value);
    if normalized.is_empty() {
        return false;
    }
    if normalized.chars().any(|character| character.is_ascii_digit()) {
        return true;
    }
    let tokens = normalized.split(' ').collect::<Vec<_>>();
    if tokens.len() == 1 {
        return false;
    }
    if tokens.iter().all(|token| token.len() <= 2) {
        return false;
    }
    tokens.len() >= 2
}

/// Rescue an unresolved ledger value by an exact match in exactly one
/// sibling ledger column. Ambiguous rescues are rejected.
fn cross_column_ledger_rescue(
    source_column: &str,
    raw_value: &str,
    profile: &DatasetProfile,
) -> Option<(&'static str, String)> {
    if !LEDGER_COLUMNS.contains(&source_column) {
        return None;
    }
    let normalized_raw = normalize(raw_value);
    if normalized_raw.is_empty() {
        return None;
    }

    let mut candidates: Vec<(&'static str, String)> = Vec::new();
    let mut seen = BTreeSet::new();
    for column in LEDGER_COLUMNS {
        for allowed in profile.known_values(column) {
            if normalize(allowed) == normalized_raw && seen.insert((column, normalize(allowed))) {
                candidates.push((column, allowed.clone()));
            }
        }
    }

    if candidates.len() == 1 {
        candidates.into_iter().next()
    } else {
        None
    }
}

/// Resolve every checked column in place and report values that are
/// genuinely absent from the dataset. Resolved canonical values replace
/// the raw mentions inside the bundle.
pub fn missing_requested_values(
    bundle: &mut EntityBundle,
    profile: &DatasetProfile,
) -> BTreeMap<String, Vec<String>> {
    let mut missing = BTreeMap::new();

    for column in MISSING_CHECK_COLUMNS {
        let requested = match bundle.values(column) {
            Some(values) if !values.is_empty() => values.clone(),
            _ => continue,
        };
        let (resolved, absent) = resolve_requested_values(&requested, profile.known_values(column));
        if let Some(values) = bundle.values_mut(column) {
            *values = resolved;
        }

        let mut still_absent = Vec::new();
        for raw_value in absent {
            match cross_column_ledger_rescue(column, &raw_value, profile) {
                Some((destination, canonical)) => {
                    if let Some(values) = bundle.values_mut(destination) {
                        let canonical_norm = normalize(&canonical);
                        if !values.iter().any(|existing| normalize(existing) == canonical_norm) {
                            values.push(canonical);
                        }
                    }
                }
                None => still_absent.push(raw_value),
            }
        }

        let explicit_absent = still_absent
            .into_iter()
            .filter(|value| is_explicit_identifier(value))
            .collect::<Vec<_>>();
        if !explicit_absent.is_empty() {
            missing.insert(column.to_string(), explicit_absent);
        }
    }

    missing
}

/// Place raw ledger mentions into a concrete ledger column when exactly one
/// candidate matches (exact first, then substring). Returns the mentions
/// that stay unresolved; those are reported like missing values.
pub fn resolve_ledger_raw_mentions(
    bundle: &mut EntityBundle,
    profile: &DatasetProfile,
) -> Vec<String> {
    let raw_mentions = std::mem::take(&mut bundle.ledger_raw_mentions);
    let mut unresolved = Vec::new();

    for raw in raw_mentions {
        let raw_value = raw.trim().to_string();
        if raw_value.is_empty() {
            continue;
        }
        let raw_norm = normalize(&raw_value);
        if raw_norm.is_empty() {
            continue;
        }

        let mut exact: Vec<(&'static str, String)> = Vec::new();
        let mut substring: Vec<(&'static str, String)> = Vec::new();
        let mut seen_exact = BTreeSet::new();
        let mut seen_substring = BTreeSet::new();
        for column in LEDGER_COLUMNS {
            for allowed in profile.known_values(column) {
                let canonical_norm = normalize(allowed);
                if canonical_norm.is_empty() {
                    continue;
                }
                if canonical_norm == raw_norm {
                    if seen_exact.insert((column, canonical_norm.clone())) {
                        exact.push((column, allowed.clone()));
                    }
                } else if canonical_norm.contains(&raw_norm)
                    && seen_substring.insert((column, canonical_norm))
                {
                    substring.push((column, allowed.clone()));
                }
            }
        }

        let chosen = match (exact.len(), substring.len()) {
            (1, _) => exact.into_iter().next(),
            (0, 1) => substring.into_iter().next(),
            _ => None,
        };

        match chosen {
            Some((destination, canonical)) => {
                if let Some(values) = bundle.values_mut(destination) {
                    let canonical_norm = normalize(&canonical);
                    if !values.iter().any(|existing| normalize(existing) == canonical_norm) {
                        values.push(canonical);
                    }
                }
            }
            None => unresolved.push(raw_value),
        }
    }

    bundle.ledger_raw_mentions = unresolved.clone();
    unresolved
}

#[cfg(test)]
mod tests {
    use super::{
        is_explicit_identifier, missing_requested_values, normalize, resolve_ledger_raw_mentions,
        resolve_requested_values,
    };
    use crate::entities::EntityBundle;
    use crate::profile::DatasetProfile;
    use crate::table::{CellValue, Table};

    fn profile_fixture() -> DatasetProfile {
        let columns = crate::dataset::EXPECTED_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        let row = |property: &str, tenant: &str, group: &str, category: &str, code: &str| {
            vec![
                CellValue::Text("PropCo".to_string()),
                CellValue::Text(property.to_string()),
                CellValue::Text(tenant.to_string()),
                CellValue::Text("revenue".to_string()),
                CellValue::Text(group.to_string()),
                CellValue::Text(category.to_string()),
                CellValue::Text(code.to_string()),
                CellValue::Text("Base rent".to_string()),
                CellValue::Text("2024-M01".to_string()),
                CellValue::Text("2024-Q1".to_string()),
                CellValue::Text("2024".to_string()),
                CellValue::Number(10.0),
            ]
        };
        let table = Table::new(
            columns,
            vec![
                row("Building 160", "Acme Corp", "rental_income", "base_rent", "4100"),
                row("Building 180", "Globex LLC", "rental_income", "revenue_rent_taxed", "4200"),
            ],
        )
        .expect("fixture table");
        DatasetProfile::build(&table)
    }

    #[test]
    fn normalize_collapses_punctuation_and_case() {
        assert_eq!(normalize("  Building-160! "), "building 160");
        assert_eq!(normalize("___"), "");
    }

    #[test]
    fn exact_and_substring_resolution() {
        let allowed = vec!["Building 160".to_string(), "Building 180".to_string()];
        let (resolved, unresolved) =
            resolve_requested_values(&["building 160".to_string()], &allowed);
        assert_eq!(resolved, vec!["Building 160".to_string()]);
        assert!(unresolved.is_empty());

        let (resolved, unresolved) = resolve_requested_values(&["160".to_string()], &allowed);
        assert_eq!(resolved, vec!["Building 160".to_string()]);
        assert!(unresolved.is_empty());

        let (resolved, unresolved) = resolve_requested_values(&["Tower 900".to_string()], &allowed);
        assert!(resolved.is_empty());
        assert_eq!(unresolved, vec!["Tower 900".to_string()]);
    }

    #[test]
    fn joined_mentions_rescue_multi_token_values() {
        let allowed = vec!["Building 160".to_string()];
        let (resolved, unresolved) =
            resolve_requested_values(&["Building".to_string(), "160".to_string()], &allowed);
        assert_eq!(resolved, vec!["Building 160".to_string()]);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn explicit_identifier_filter() {
        assert!(is_explicit_identifier("Building 900"));
        assert!(is_explicit_identifier("4100"));
        assert!(!is_explicit_identifier("office"));
        assert!(!is_explicit_identifier("a b"));
    }

    #[test]
    fn missing_values_resolve_in_place_and_report_absent_explicit_values() {
        let profile = profile_fixture();
        let mut bundle = EntityBundle {
            property_name: vec!["building 160".to_string(), "Tower 900".to_string()],
            ..EntityBundle::default()
        };
        let missing = missing_requested_values(&mut bundle, &profile);

        assert_eq!(bundle.property_name, vec!["Building 160".to_string()]);
        assert_eq!(missing["property_name"], vec!["Tower 900".to_string()]);
    }

    #[test]
    fn vague_single_word_absences_are_dropped_not_reported() {
        let profile = profile_fixture();
        let mut bundle =
            EntityBundle { tenant_name: vec!["office".to_string()], ..EntityBundle::default() };
        let missing = missing_requested_values(&mut bundle, &profile);
        assert!(missing.is_empty());
        assert!(bundle.tenant_name.is_empty());
    }

    #[test]
    fn ledger_value_rescued_across_sibling_columns() {
        let profile = profile_fixture();
        let mut bundle = EntityBundle {
            ledger_description: vec!["revenue_rent_taxed".to_string()],
            ..EntityBundle::default()
        };
        let missing = missing_requested_values(&mut bundle, &profile);

        assert!(missing.is_empty());
        assert_eq!(bundle.ledger_category, vec!["revenue_rent_taxed".to_string()]);
        assert!(bundle.ledger_description.is_empty());
    }

    #[test]
    fn raw_mentions_resolve_to_unique_column_or_stay_unresolved() {
        let profile = profile_fixture();
        let mut bundle = EntityBundle {
            ledger_raw_mentions: vec!["revenue_rent_taxed".to_string(), "zzz_unknown".to_string()],
            ..EntityBundle::default()
        };
        let unresolved = resolve_ledger_raw_mentions(&mut bundle, &profile);

        assert_eq!(unresolved, vec!["zzz_unknown".to_string()]);
        assert_eq!(bundle.ledger_category, vec!["revenue_rent_taxed".to_string()]);
        assert_eq!(bundle.ledger_raw_mentions, vec!["zzz_unknown".to_string()]);
    }
}
