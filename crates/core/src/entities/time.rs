//! Time-scope normalization and human-readable period formatting.
//!
//! Relative periods ("last quarter") are resolved against an injected date
//! so turns are deterministic under test; resolution always collapses the
//! scope to at most one exact month/quarter/year token.

use chrono::{Datelike, NaiveDate};

use crate::entities::{EntityBundle, TimeScopeMode};
use crate::profile::TimeRanges;

pub fn month_name(token: &str) -> Option<&'static str> {
    match token {
        "M01" => Some("January"),
        "M02" => Some("February"),
        "M03" => Some("March"),
        "M04" => Some("April"),
        "M05" => Some("May"),
        "M06" => Some("June"),
        "M07" => Some("July"),
        "M08" => Some("August"),
        "M09" => Some("September"),
        "M10" => Some("October"),
        "M11" => Some("November"),
        "M12" => Some("December"),
        _ => None,
    }
}

/// Resolve a relative period and normalize the scope in place. When the
/// outcome is an exact scope, any pending clarification is cleared: the
/// period question has been answered deterministically.
pub fn resolve_relative_time_scope(bundle: &mut EntityBundle, today: NaiveDate) {
    let scope = &mut bundle.time_scope;

    let relative = scope
        .relative_period
        .as_deref()
        .map(|period| period.trim().to_lowercase())
        .unwrap_or_default();
    if !relative.is_empty() {
        let year = today.year();
        match relative.as_str() {
            "current_year" | "last_year" | "next_year" => {
                let offset = match relative.as_str() {
                    "last_year" => -1,
                    "next_year" => 1,
                    _ => 0,
                };
                scope.year = Some((year + offset).to_string());
                scope.quarter = None;
                scope.month = None;
            }
            "current_quarter" | "last_quarter" | "next_quarter" => {
                let mut quarter = (today.month0() / 3) + 1;
                let mut quarter_year = year;
                if relative == "last_quarter" {
                    if quarter == 1 {
                        quarter = 4;
                        quarter_year -= 1;
                    } else {
                        quarter -= 1;
                    }
                } else if relative == "next_quarter" {
                    if quarter == 4 {
                        quarter = 1;
                        quarter_year += 1;
                    } else {
                        quarter += 1;
                    }
                }
                scope.quarter = Some(format!("{quarter_year}-Q{quarter}"));
                scope.month = None;
                scope.year = None;
            }
            "current_month" | "last_month" | "next_month" => {
                let mut month = today.month();
                let mut month_year = year;
                if relative == "last_month" {
                    if month == 1 {
                        month = 12;
                        month_year -= 1;
                    } else {
                        month -= 1;
                    }
                } else if relative == "next_month" {
                    if month == 12 {
                        month = 1;
                        month_year += 1;
                    } else {
                        month += 1;
                    }
                }
                scope.month = Some(format!("{month_year}-M{month:02}"));
                scope.quarter = None;
                scope.year = None;
            }
            _ => {}
        }
    }

    let has_month = scope.month.as_deref().map(str::trim).is_some_and(|m| !m.is_empty());
    let has_quarter = scope.quarter.as_deref().map(str::trim).is_some_and(|q| !q.is_empty());
    let has_year = scope.year.as_deref().map(str::trim).is_some_and(|y| !y.is_empty());

    if has_month || has_quarter || has_year {
        scope.mode = TimeScopeMode::Exact;
        scope.relative_period = None;
        if has_month {
            scope.quarter = None;
            scope.year = None;
        } else if has_quarter {
            scope.month = None;
            scope.year = None;
        } else {
            scope.month = None;
            scope.quarter = None;
        }
    } else if scope.mode == TimeScopeMode::Exact {
        scope.mode = TimeScopeMode::None;
        scope.relative_period = None;
    }

    if bundle.time_scope.mode == TimeScopeMode::Exact {
        bundle.needs_clarification = false;
        bundle.clarification_prompt.clear();
    }
}

/// Human-readable requested period, e.g. "quarter 2024-Q1".
pub fn format_requested_period(bundle: &EntityBundle) -> Option<String> {
    let scope = &bundle.time_scope;
    if scope.mode != TimeScopeMode::Exact {
        return None;
    }
    if let Some(month) = scope.month.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        return Some(format!("month {month}"));
    }
    if let Some(quarter) = scope.quarter.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        return Some(format!("quarter {quarter}"));
    }
    scope
        .year
        .as_deref()
        .map(str::trim)
        .filter(|y| !y.is_empty())
        .map(|year| format!("year {year}"))
}

/// Human-readable available dataset range, most precise period first.
pub fn available_range_text(ranges: &TimeRanges) -> Option<String> {
    if let (Some(min), Some(max)) = (ranges.min_month.as_deref(), ranges.max_month.as_deref()) {
        return Some(format!(
            "from {} to {}",
            humanize_month_tokens(min),
            humanize_month_tokens(max)
        ));
    }
    if let (Some(min), Some(max)) = (ranges.min_quarter.as_deref(), ranges.max_quarter.as_deref())
    {
        return Some(format!("from {min} to {max}"));
    }
    if let (Some(min), Some(max)) = (ranges.min_year.as_deref(), ranges.max_year.as_deref()) {
        return Some(format!("from {min} to {max}"));
    }
    None
}

/// Specific out-of-range message when both the requested period and the
/// dataset coverage are known; `None` defers to the generic fallback.
pub fn time_range_not_present_answer(
    bundle: &EntityBundle,
    ranges: &TimeRanges,
) -> Option<String> {
    let requested = format_requested_period(bundle)?;
    let available = available_range_text(ranges)?;
    Some(format!(
        "You are asking for information in {requested}, but the information I have is {available}."
    ))
}

/// Replace `YYYY-MNN` and bare `MNN` tokens with month names for final
/// user-facing text.
pub fn humanize_month_tokens(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut token = String::new();

    let flush = |token: &mut String, output: &mut String| {
        if token.is_empty() {
            return;
        }
        output.push_str(&humanize_token(token));
        token.clear();
    };

    for character in text.chars() {
        if character.is_ascii_alphanumeric() || character == '-' {
            token.push(character);
        } else {
            flush(&mut token, &mut output);
            output.push(character);
        }
    }
    flush(&mut token, &mut output);
    output
}

fn humanize_token(token: &str) -> String {
    if let Some((year, month_token)) = token.split_once('-') {
        if year.len() == 4
            && year.chars().all(|character| character.is_ascii_digit())
            && is_month_token(month_token)
        {
            if let Some(name) = month_name(month_token) {
                return format!("{name} {year}");
            }
        }
    }
    if is_month_token(token) {
        if let Some(name) = month_name(token) {
            return name.to_string();
        }
    }
    token.to_string()
}

fn is_month_token(token: &str) -> bool {
    token.len() == 3
        && token.starts_with('M')
        && token[1..].chars().all(|character| character.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        available_range_text, format_requested_period, humanize_month_tokens,
        resolve_relative_time_scope, time_range_not_present_answer,
    };
    use crate::entities::{EntityBundle, TimeScopeMode};
    use crate::profile::TimeRanges;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).expect("valid date")
    }

    fn bundle_with_relative(period: &str) -> EntityBundle {
        let mut bundle = EntityBundle::default();
        bundle.time_scope.mode = TimeScopeMode::Relative;
        bundle.time_scope.relative_period = Some(period.to_string());
        bundle
    }

    #[test]
    fn relative_periods_resolve_against_injected_date() {
        let mut bundle = bundle_with_relative("last_year");
        resolve_relative_time_scope(&mut bundle, today());
        assert_eq!(bundle.time_scope.year.as_deref(), Some("2024"));
        assert_eq!(bundle.time_scope.mode, TimeScopeMode::Exact);

        let mut bundle = bundle_with_relative("last_quarter");
        resolve_relative_time_scope(&mut bundle, today());
        assert_eq!(bundle.time_scope.quarter.as_deref(), Some("2024-Q4"));

        let mut bundle = bundle_with_relative("last_month");
        resolve_relative_time_scope(&mut bundle, today());
        assert_eq!(bundle.time_scope.month.as_deref(), Some("2025-M01"));

        let mut bundle = bundle_with_relative("next_month");
        resolve_relative_time_scope(&mut bundle, today());
        assert_eq!(bundle.time_scope.month.as_deref(), Some("2025-M03"));
    }

    #[test]
    fn month_wins_over_quarter_and_year() {
        let mut bundle = EntityBundle::default();
        bundle.time_scope.mode = TimeScopeMode::Exact;
        bundle.time_scope.month = Some("2024-M06".to_string());
        bundle.time_scope.quarter = Some("2024-Q2".to_string());
        bundle.time_scope.year = Some("2024".to_string());
        resolve_relative_time_scope(&mut bundle, today());

        assert_eq!(bundle.time_scope.month.as_deref(), Some("2024-M06"));
        assert!(bundle.time_scope.quarter.is_none());
        assert!(bundle.time_scope.year.is_none());
    }

    #[test]
    fn exact_mode_without_tokens_collapses_to_none() {
        let mut bundle = EntityBundle::default();
        bundle.time_scope.mode = TimeScopeMode::Exact;
        resolve_relative_time_scope(&mut bundle, today());
        assert_eq!(bundle.time_scope.mode, TimeScopeMode::None);
    }

    #[test]
    fn exact_scope_clears_pending_clarification() {
        let mut bundle = bundle_with_relative("current_year");
        bundle.needs_clarification = true;
        bundle.clarification_prompt = "Which year?".to_string();
        resolve_relative_time_scope(&mut bundle, today());
        assert!(!bundle.needs_clarification);
        assert!(bundle.clarification_prompt.is_empty());
    }

    #[test]
    fn out_of_range_answer_names_request_and_coverage() {
        let mut bundle = EntityBundle::default();
        bundle.time_scope.mode = TimeScopeMode::Exact;
        bundle.time_scope.quarter = Some("2030-Q1".to_string());

        let ranges = TimeRanges {
            min_month: Some("2024-M01".to_string()),
            max_month: Some("2025-M06".to_string()),
            ..TimeRanges::default()
        };

        assert_eq!(format_requested_period(&bundle).as_deref(), Some("quarter 2030-Q1"));
        assert_eq!(
            available_range_text(&ranges).as_deref(),
            Some("from January 2024 to June 2025")
        );
        let answer = time_range_not_present_answer(&bundle, &ranges).expect("specific answer");
        assert!(answer.contains("quarter 2030-Q1"));
        assert!(answer.contains("from January 2024 to June 2025"));
    }

    #[test]
    fn month_tokens_humanize_inside_longer_text() {
        assert_eq!(
            humanize_month_tokens("Profit peaked in 2024-M03, dipped in M04."),
            "Profit peaked in March 2024, dipped in April."
        );
        assert_eq!(humanize_month_tokens("2024-Q1 stays as is"), "2024-Q1 stays as is");
    }
}
