use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

/// Metrics requested for the daily ad-account insights document.
pub const INSIGHT_FIELDS: &[&str] = &[
    "account_id",
    "account_name",
    "spend",
    "impressions",
    "reach",
    "frequency",
    "clicks",
    "inline_link_clicks",
    "cpc",
    "cpm",
    "ctr",
    "actions",
    "date_start",
    "date_stop",
];

/// Date-range echo fields; the requested range replaces whatever comes back.
const RANGE_FIELDS: &[&str] = &["date_start", "date_stop"];

// Shape check only: month 01-12 and day 01-31. "2024-02-31" passes; calendar
// validity is not checked.
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid date pattern")
});

pub fn is_valid_date(date: &str) -> bool {
    DATE_SHAPE.is_match(date)
}

/// The day before `now`, in UTC, as `YYYY-MM-DD`.
pub fn yesterday_utc(now: DateTime<Utc>) -> String {
    (now - Duration::days(1)).format("%Y-%m-%d").to_string()
}

enum FieldAcc {
    Sum(f64),
    Distinct(Vec<Value>),
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

// Identifiers look numeric but must never be summed
fn is_identity_field(field: &str) -> bool {
    field == "id" || field.ends_with("_id")
}

fn number_value(sum: f64) -> Value {
    if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
        Value::Number(Number::from(sum as i64))
    } else {
        Number::from_f64(sum).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Folds several insight rows into one: numeric fields (numbers or numeric
/// strings) are summed; other fields keep their distinct values in first-seen
/// order, collapsing to the bare value when there is only one. The range echo
/// fields are left out.
pub fn aggregate_rows(rows: &[Map<String, Value>]) -> Map<String, Value> {
    let mut order: Vec<String> = Vec::new();
    let mut accs: std::collections::HashMap<String, FieldAcc> = std::collections::HashMap::new();

    for row in rows {
        for (field, value) in row {
            if value.is_null() || RANGE_FIELDS.contains(&field.as_str()) {
                continue;
            }

            let numeric = if is_identity_field(field) { None } else { as_number(value) };
            let replacement = match (accs.get_mut(field), numeric) {
                (None, _) => {
                    order.push(field.clone());
                    Some(match numeric {
                        Some(n) => FieldAcc::Sum(n),
                        None => FieldAcc::Distinct(vec![value.clone()]),
                    })
                }
                (Some(FieldAcc::Sum(total)), Some(n)) => {
                    *total += n;
                    None
                }
                (Some(FieldAcc::Sum(total)), None) => {
                    // Mixed field: fall back to distinct values
                    let mut values = vec![number_value(*total)];
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                    Some(FieldAcc::Distinct(values))
                }
                (Some(FieldAcc::Distinct(values)), _) => {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                    None
                }
            };
            if let Some(acc) = replacement {
                accs.insert(field.clone(), acc);
            }
        }
    }

    let mut out = Map::new();
    for field in order {
        let value = match accs.remove(&field) {
            Some(FieldAcc::Sum(total)) => number_value(total),
            Some(FieldAcc::Distinct(mut values)) if values.len() == 1 => values.remove(0),
            Some(FieldAcc::Distinct(values)) => Value::Array(values),
            None => continue,
        };
        out.insert(field, value);
    }
    out
}
