use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AgeBound, ConditionSet, Constraint, FormKeyRule, Malformed};

const MAX_REPORTER_AGE: i64 = 150;

/// Condition row as stored by the backend: arrays of loosely typed values.
///
/// Unknown keys are rejected, but values are decoded leniently so one corrupt
/// column only disables the dimension it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<i64>,
    #[serde(default)]
    pub country_codes: Value,
    #[serde(default)]
    pub language_codes: Value,
    #[serde(default)]
    pub risk_category_ids: Value,
    #[serde(default)]
    pub risk_subcategory_ids: Value,
    #[serde(default)]
    pub supplier_org_ids: Value,
    #[serde(default)]
    pub worksite_ids: Value,
    #[serde(default)]
    pub reporter_min_age: Value,
    #[serde(default)]
    pub reporter_max_age: Value,
    #[serde(default)]
    pub severity_levels: Value,
    #[serde(default)]
    pub membership_tags: Value,
    #[serde(default)]
    pub form_key: Value,
}

impl From<ConditionRecord> for ConditionSet {
    fn from(record: ConditionRecord) -> Self {
        ConditionSet {
            countries: decode_set(record.country_codes, decode_code),
            languages: decode_set(record.language_codes, decode_code),
            risk_categories: decode_set(record.risk_category_ids, decode_id),
            risk_subcategories: decode_set(record.risk_subcategory_ids, decode_id),
            suppliers: decode_set(record.supplier_org_ids, decode_id),
            worksites: decode_set(record.worksite_ids, decode_id),
            severities: decode_set(record.severity_levels, decode_severity),
            reporter_min_age: decode_age(record.reporter_min_age),
            reporter_max_age: decode_age(record.reporter_max_age),
            membership_tags: decode_set(record.membership_tags, decode_code),
            form_key: decode_form_key(record.form_key),
        }
    }
}

impl From<ConditionSet> for ConditionRecord {
    fn from(set: ConditionSet) -> Self {
        ConditionRecord {
            condition_id: None,
            country_codes: encode_set(set.countries, Value::from),
            language_codes: encode_set(set.languages, Value::from),
            risk_category_ids: encode_set(set.risk_categories, Value::from),
            risk_subcategory_ids: encode_set(set.risk_subcategories, Value::from),
            supplier_org_ids: encode_set(set.suppliers, Value::from),
            worksite_ids: encode_set(set.worksites, Value::from),
            reporter_min_age: encode_age(set.reporter_min_age),
            reporter_max_age: encode_age(set.reporter_max_age),
            severity_levels: encode_set(set.severities, Value::from),
            membership_tags: encode_set(set.membership_tags, Value::from),
            form_key: match set.form_key {
                FormKeyRule::Any => Value::Null,
                FormKeyRule::Exactly(key) => Value::String(key),
                FormKeyRule::Malformed(malformed) => malformed.raw,
            },
        }
    }
}

/// Per-item outcome while decoding a set column.
enum Item<T> {
    Keep(T),
    Blank,
}

fn decode_set<T, F>(raw: Value, decode: F) -> Constraint<T>
where
    T: Ord,
    F: Fn(&Value) -> Result<Item<T>, String>,
{
    let items = match &raw {
        Value::Null => return Constraint::Any,
        Value::Array(items) => items,
        other => {
            let reason = format!("expected an array, found {}", kind_of(other));
            return Constraint::Malformed(Malformed::new(raw.clone(), reason));
        }
    };

    let mut values = BTreeSet::new();
    for item in items {
        match decode(item) {
            Ok(Item::Keep(value)) => {
                values.insert(value);
            }
            Ok(Item::Blank) => {}
            Err(reason) => return Constraint::Malformed(Malformed::new(raw.clone(), reason)),
        }
    }

    Constraint::one_of(values)
}

fn decode_code(value: &Value) -> Result<Item<String>, String> {
    match value {
        Value::String(code) => {
            let trimmed = code.trim();
            if trimmed.is_empty() {
                Ok(Item::Blank)
            } else {
                Ok(Item::Keep(trimmed.to_string()))
            }
        }
        other => Err(format!("expected a string, found {}", kind_of(other))),
    }
}

fn decode_id(value: &Value) -> Result<Item<i64>, String> {
    integer_of(value).map(Item::Keep)
}

fn decode_severity(value: &Value) -> Result<Item<u8>, String> {
    let level = integer_of(value)?;
    if (1..=5).contains(&level) {
        Ok(Item::Keep(level as u8))
    } else {
        Err(format!("severity level {level} outside 1-5"))
    }
}

fn decode_age(raw: Value) -> AgeBound {
    if raw.is_null() {
        return AgeBound::Open;
    }
    match integer_of(&raw) {
        Ok(age) if (0..=MAX_REPORTER_AGE).contains(&age) => AgeBound::At(age as u8),
        Ok(age) => AgeBound::Malformed(Malformed::new(raw, format!("age {age} out of range"))),
        Err(reason) => AgeBound::Malformed(Malformed::new(raw, reason)),
    }
}

fn decode_form_key(raw: Value) -> FormKeyRule {
    match &raw {
        Value::Null => FormKeyRule::Any,
        Value::String(key) if key.trim().is_empty() => FormKeyRule::Any,
        Value::String(key) => FormKeyRule::Exactly(key.trim().to_string()),
        other => {
            let reason = format!("expected a string, found {}", kind_of(other));
            FormKeyRule::Malformed(Malformed::new(raw.clone(), reason))
        }
    }
}

/// Accepts JSON integers and numeric strings, the two shapes the builder has written.
fn integer_of(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| format!("expected an integer, found {number}")),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("expected an integer, found \"{text}\"")),
        other => Err(format!("expected an integer, found {}", kind_of(other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn encode_set<T, F>(constraint: Constraint<T>, encode: F) -> Value
where
    F: Fn(T) -> Value,
{
    match constraint {
        Constraint::Any => Value::Array(Vec::new()),
        Constraint::OneOf(values) => Value::Array(values.into_iter().map(encode).collect()),
        Constraint::Malformed(malformed) => malformed.raw,
    }
}

fn encode_age(bound: AgeBound) -> Value {
    match bound {
        AgeBound::Open => Value::Null,
        AgeBound::At(age) => Value::from(age),
        AgeBound::Malformed(malformed) => malformed.raw,
    }
}
