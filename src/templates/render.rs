use crate::models::asset::{
    display_value, is_truthy, numeric_value, APY_FIELD, CAP_FIELD, EPOCH_FIELD, EPOCH_START_FIELD,
    FALLBACK_ICON_FIELD, ICON_FIELD, TVL_FIELD,
};
use crate::models::{AssetRecord, DisplayUnit};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

pub const PREV_PREFIX: &str = "prev.";
pub const DIFF_SUFFIX: &str = "_diff";
pub const UNKNOWN_TICKER: &str = "unknown";

/// Previous-snapshot placeholders that always resolve, even on first sight.
const GUARANTEED_PREV_FIELDS: [&str; 4] = [CAP_FIELD, TVL_FIELD, EPOCH_FIELD, EPOCH_START_FIELD];

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{(.*?)\}\}").unwrap();
    static ref CURRENCY_GAP: Regex = Regex::new(r"(\d)([$€£¥])").unwrap();
}

/// Renders `template` for an asset at the current wall-clock time.
pub fn render(template: &str, current: &AssetRecord, previous: &AssetRecord) -> DisplayUnit {
    render_at(template, current, previous, Utc::now().timestamp())
}

/// Renders `template` for an asset as if the clock read `now` (unix seconds).
///
/// Placeholders are `{{key}}` tokens resolved against the current fields,
/// the previous fields under a `prev.` prefix and a few derived values
/// (`last_epoch_seconds`, `epoch_duration`). Anything left unresolved is
/// dropped from the output.
pub fn render_at(template: &str, current: &AssetRecord, previous: &AssetRecord, now: i64) -> DisplayUnit {
    let context = build_context(current, previous, now);

    let text = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        context.get(&caps[1]).cloned().unwrap_or_default()
    });
    let text = CURRENCY_GAP.replace_all(&text, "${1} ${2}").into_owned();

    DisplayUnit {
        text,
        thumbnail: thumbnail(current),
        footer: current.ticker().unwrap_or_else(|| UNKNOWN_TICKER.to_string()),
    }
}

fn build_context(current: &AssetRecord, previous: &AssetRecord, now: i64) -> HashMap<String, String> {
    let mut context: HashMap<String, String> = current
        .iter()
        .map(|(key, value)| (key.clone(), display_value(value)))
        .collect();

    context.insert("last_epoch_seconds".to_string(), last_epoch_seconds(current, now));
    if let Some(duration) = epoch_duration(current, previous) {
        context.insert("epoch_duration".to_string(), duration);
    }

    for (field, decimals) in [(TVL_FIELD, 0), (CAP_FIELD, 0), (APY_FIELD, 2)] {
        if let Some(value) = current.get(field) {
            context.insert(field.to_string(), format_number(value, decimals));
        }
    }

    for (key, value) in previous.iter() {
        context.insert(format!("{PREV_PREFIX}{key}"), display_value(value));
    }
    for field in GUARANTEED_PREV_FIELDS {
        context.entry(format!("{PREV_PREFIX}{field}")).or_default();
    }

    for (key, value) in context.iter_mut() {
        if key.ends_with(DIFF_SUFFIX) {
            if let Some(diff) = numeric_value(&Value::String(value.clone())) {
                *value = format!("{:+.2}", diff);
            }
        }
    }

    context
}

fn last_epoch_seconds(current: &AssetRecord, now: i64) -> String {
    match current.get(EPOCH_START_FIELD) {
        Some(start @ Value::Number(_)) => whole_difference(&Value::from(now), start).unwrap_or_else(|| "0".to_string()),
        _ => "0".to_string(),
    }
}

/// Seconds between the previous and the current epoch start.
fn epoch_duration(current: &AssetRecord, previous: &AssetRecord) -> Option<String> {
    if previous.is_empty() || !is_truthy(previous.field(EPOCH_START_FIELD)) {
        return None;
    }
    whole_difference(current.field(EPOCH_START_FIELD), previous.field(EPOCH_START_FIELD))
}

/// `later - earlier` after truncating both to whole numbers. Exact for
/// integers in range, falls back to floating point beyond it.
fn whole_difference(later: &Value, earlier: &Value) -> Option<String> {
    if let (Value::Number(l), Value::Number(e)) = (later, earlier) {
        if let Some(diff) = l.as_i64().zip(e.as_i64()).and_then(|(l, e)| l.checked_sub(e)) {
            return Some(diff.to_string());
        }
    }
    let diff = numeric_value(later)?.trunc() - numeric_value(earlier)?.trunc();
    diff.is_finite().then(|| format!("{:.0}", diff))
}

/// Rounds numeric values (half to even) to `decimals` places; anything else
/// keeps its string form.
pub fn format_number(value: &Value, decimals: usize) -> String {
    match numeric_value(value) {
        Some(number) if decimals == 0 => {
            let rounded = number.round_ties_even();
            if rounded.abs() < i64::MAX as f64 {
                format!("{}", rounded as i64)
            } else {
                format!("{:.0}", rounded)
            }
        }
        Some(number) => format!("{:.*}", decimals, number),
        None => display_value(value),
    }
}

fn thumbnail(current: &AssetRecord) -> Option<String> {
    [ICON_FIELD, FALLBACK_ICON_FIELD]
        .iter()
        .find_map(|field| match current.get(field) {
            Some(Value::String(url)) if !url.is_empty() => Some(url.clone()),
            _ => None,
        })
}
