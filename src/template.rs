//! Template substitution engine
//!
//! Scans user-supplied template strings for bracketed `[name]` placeholders
//! and resolves them against a flat enriched record. A single tokenizer pass
//! produces literal and placeholder segments, then a resolver pass builds the
//! output, making the leave-unresolved policy explicit.
//!
//! Two placeholder forms are reserved: `[time|<format>]` renders the record's
//! unix `time` field as a local date/time using chrono strftime specifiers,
//! and the `[dailyForecast]` marker in a body template is expanded by
//! [`expand_daily`] into the concatenated per-day substitution.
//!
//! No HTML escaping is performed; substituted values land verbatim in the
//! output document.

use std::fmt::Write;

use chrono::{Local, TimeZone};
use serde_json::Value;

use crate::data::EnrichedRecord;

/// Marker replaced by the per-day loop expansion
pub const DAILY_LOOP_MARKER: &str = "[dailyForecast]";

/// Prefix selecting the time-formatting placeholder form
const TIME_PREFIX: &str = "time|";

/// A parsed template segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied to the output unchanged
    Literal(&'a str),
    /// A bracketed placeholder, without its brackets
    Placeholder(&'a str),
}

/// Splits a template into literal and placeholder segments
///
/// Each placeholder is the shortest span between a `[` and the next `]`.
/// A `[` without a closing `]` is treated as literal text.
pub fn tokenize(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|i| open + i) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        segments.push(Segment::Placeholder(&rest[open + 1..close]));
        rest = &rest[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    segments
}

/// Substitutes a record's fields into a template
///
/// Placeholders naming a field are replaced with the stringified value;
/// `[time|<format>]` placeholders format the record's unix timestamp as a
/// local date/time. Placeholders that cannot be resolved — unknown field
/// name, missing `time` field, or an invalid format specifier — are left in
/// the output as their literal bracketed text.
pub fn substitute(record: &EnrichedRecord, template: &str) -> String {
    let mut output = String::with_capacity(template.len());

    for segment in tokenize(template) {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Placeholder(name) => match resolve(record, name) {
                Some(value) => output.push_str(&value),
                None => {
                    output.push('[');
                    output.push_str(name);
                    output.push(']');
                }
            },
        }
    }
    output
}

/// Expands the daily-loop marker in a body template
///
/// When `body` contains the literal `[dailyForecast]` marker, every
/// occurrence is replaced with the concatenation of `daily_template`
/// substituted against each daily record in index order. No separator is
/// inserted between iterations.
pub fn expand_daily(body: &str, daily: &[EnrichedRecord], daily_template: &str) -> String {
    if !body.contains(DAILY_LOOP_MARKER) {
        return body.to_string();
    }

    let expanded: String = daily
        .iter()
        .map(|record| substitute(record, daily_template))
        .collect();
    body.replace(DAILY_LOOP_MARKER, &expanded)
}

/// Resolves a placeholder name against a record
fn resolve(record: &EnrichedRecord, name: &str) -> Option<String> {
    if let Some(format) = name.strip_prefix(TIME_PREFIX) {
        return format_time(record.time()?, format);
    }
    record.get(name).map(display_value)
}

/// Formats a unix timestamp as a local date/time string
///
/// Returns `None` when the timestamp is out of range or the format string
/// holds an invalid specifier, so malformed placeholders fall back to the
/// leave-unresolved policy instead of corrupting the render.
fn format_time(timestamp: i64, format: &str) -> Option<String> {
    let local = Local.timestamp_opt(timestamp, 0).single()?;
    let mut rendered = String::new();
    write!(rendered, "{}", local.format(format)).ok()?;
    Some(rendered)
}

/// Stringifies a record value for output
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
