//! Branch conditions for conditional task nodes.
//!
//! A condition compares one applicant fact (looked up by a dotted path such
//! as `profile.yearsExperience`) against a literal. All conditions of a
//! conditional node must hold for the true outcome to be taken; an empty
//! condition list always takes the true outcome.

use crate::node::ConditionalTask;
use chrono::{DateTime, NaiveDate, Utc};
use jobdesk_core::NodeId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Comparison applied between the fact and the literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    IsEmpty,
    IsNotEmpty,
}

/// How the literal (and the fact) are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

/// One comparison on an applicant fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    /// Literal compared against the fact, kept as text. Numbers and booleans
    /// in a record are read into their text form.
    #[serde(default, deserialize_with = "scalar_text")]
    pub value: String,
    #[serde(default)]
    pub value_type: ValueType,
}

impl Condition {
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value_type,
        }
    }

    /// Evaluates the condition against `facts`.
    ///
    /// Missing facts only satisfy `is_empty`. A literal that cannot be read
    /// as the declared value type never matches.
    #[must_use]
    pub fn evaluate(&self, facts: &Map<String, Value>) -> bool {
        let fact = lookup(facts, &self.field);
        match self.operator {
            ConditionOperator::IsEmpty => is_empty(fact),
            ConditionOperator::IsNotEmpty => !is_empty(fact),
            _ => match fact {
                None | Some(Value::Null) => false,
                Some(fact) => self.compare(fact),
            },
        }
    }

    fn compare(&self, fact: &Value) -> bool {
        use ConditionOperator as Op;

        match self.operator {
            Op::Contains => return contains(fact, &self.value),
            Op::NotContains => return !contains(fact, &self.value),
            _ => {}
        }

        let ordering = match self.value_type {
            ValueType::String => as_text(fact).map(|f| f.as_str().cmp(self.value.as_str())),
            ValueType::Number => match (as_number(fact), self.value.trim().parse::<f64>().ok()) {
                (Some(f), Some(v)) => f.partial_cmp(&v),
                _ => None,
            },
            ValueType::Boolean => match (fact.as_bool(), parse_bool(&self.value)) {
                (Some(f), Some(v)) => Some(f.cmp(&v)),
                _ => None,
            },
            ValueType::Date => match (fact.as_str().and_then(parse_date), parse_date(&self.value)) {
                (Some(f), Some(v)) => Some(f.cmp(&v)),
                _ => None,
            },
        };

        let Some(ordering) = ordering else {
            return false;
        };
        match self.operator {
            Op::Equals => ordering == Ordering::Equal,
            Op::NotEquals => ordering != Ordering::Equal,
            Op::GreaterThan => ordering == Ordering::Greater,
            Op::LessThan => ordering == Ordering::Less,
            Op::GreaterOrEqual => ordering != Ordering::Less,
            Op::LessOrEqual => ordering != Ordering::Greater,
            Op::Contains | Op::NotContains | Op::IsEmpty | Op::IsNotEmpty => false,
        }
    }
}

impl ConditionalTask {
    /// Whether every condition holds for `facts`.
    #[must_use]
    pub fn matches(&self, facts: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| c.evaluate(facts))
    }

    /// Picks the outcome node for `facts`; `None` when that outcome is unwired.
    #[must_use]
    pub fn branch(&self, facts: &Map<String, Value>) -> Option<&NodeId> {
        if self.matches(facts) {
            self.true_outcome.as_ref()
        } else {
            self.false_outcome.as_ref()
        }
    }
}

fn scalar_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, number or boolean, found {other}"
        ))),
    }
}

fn lookup<'a>(facts: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = facts.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.as_object()?.get(segment))
}

fn is_empty(fact: Option<&Value>) -> bool {
    match fact {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => false,
    }
}

fn contains(fact: &Value, needle: &str) -> bool {
    match fact {
        Value::String(s) => s.to_lowercase().contains(&needle.to_lowercase()),
        Value::Array(items) => items
            .iter()
            .filter_map(as_text)
            .any(|item| item.eq_ignore_ascii_case(needle)),
        _ => false,
    }
}

fn as_text(fact: &Value) -> Option<String> {
    match fact {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(fact: &Value) -> Option<f64> {
    match fact {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn number_comparisons() {
        let applicant = facts(json!({ "profile": { "yearsExperience": 4 } }));
        let at_least_three = Condition::new(
            "profile.yearsExperience",
            ConditionOperator::GreaterOrEqual,
            "3",
            ValueType::Number,
        );
        assert!(at_least_three.evaluate(&applicant));

        let over_five = Condition::new(
            "profile.yearsExperience",
            ConditionOperator::GreaterThan,
            "5",
            ValueType::Number,
        );
        assert!(!over_five.evaluate(&applicant));
    }

    #[test]
    fn string_equality_and_contains() {
        let applicant = facts(json!({
            "location": "Berlin",
            "skills": ["Rust", "SQL"],
            "summary": "Backend engineer, distributed systems"
        }));
        assert!(Condition::new("location", ConditionOperator::Equals, "Berlin", ValueType::String)
            .evaluate(&applicant));
        assert!(Condition::new("location", ConditionOperator::NotEquals, "Paris", ValueType::String)
            .evaluate(&applicant));
        assert!(Condition::new("skills", ConditionOperator::Contains, "rust", ValueType::String)
            .evaluate(&applicant));
        assert!(
            Condition::new(
                "summary",
                ConditionOperator::Contains,
                "Distributed",
                ValueType::String
            )
            .evaluate(&applicant)
        );
        assert!(Condition::new("skills", ConditionOperator::NotContains, "Go", ValueType::String)
            .evaluate(&applicant));
    }

    #[test]
    fn boolean_and_date() {
        let applicant = facts(json!({
            "relocate": true,
            "availableFrom": "2024-06-01"
        }));
        assert!(Condition::new("relocate", ConditionOperator::Equals, "true", ValueType::Boolean)
            .evaluate(&applicant));
        assert!(
            Condition::new(
                "availableFrom",
                ConditionOperator::LessThan,
                "2024-07-01T00:00:00Z",
                ValueType::Date
            )
            .evaluate(&applicant)
        );
    }

    #[test]
    fn emptiness_and_missing_facts() {
        let applicant = facts(json!({ "coverLetter": "  ", "portfolio": [] }));
        assert!(Condition::new("coverLetter", ConditionOperator::IsEmpty, "", ValueType::String)
            .evaluate(&applicant));
        assert!(Condition::new("portfolio", ConditionOperator::IsEmpty, "", ValueType::String)
            .evaluate(&applicant));
        assert!(Condition::new("referral", ConditionOperator::IsEmpty, "", ValueType::String)
            .evaluate(&applicant));
        assert!(!Condition::new("referral", ConditionOperator::Equals, "x", ValueType::String)
            .evaluate(&applicant));
    }

    #[test]
    fn unreadable_literal_never_matches() {
        let applicant = facts(json!({ "score": 80 }));
        let bad =
            Condition::new("score", ConditionOperator::GreaterThan, "high", ValueType::Number);
        assert!(!bad.evaluate(&applicant));
    }

    #[test]
    fn branch_picks_outcome() {
        let yes: NodeId = "interview".parse().expect("id");
        let no: NodeId = "reject".parse().expect("id");
        let task = ConditionalTask {
            conditions: vec![Condition::new(
                "score",
                ConditionOperator::GreaterOrEqual,
                "70",
                ValueType::Number,
            )],
            true_outcome: Some(yes.clone()),
            false_outcome: Some(no.clone()),
        };
        assert_eq!(task.branch(&facts(json!({ "score": 85 }))), Some(&yes));
        assert_eq!(task.branch(&facts(json!({ "score": 40 }))), Some(&no));
        assert_eq!(task.branch(&facts(json!({}))), Some(&no));
    }

    #[test]
    fn empty_condition_list_takes_true_outcome() {
        let task = ConditionalTask::default();
        assert!(task.matches(&Map::new()));
        assert_eq!(task.branch(&Map::new()), None);
    }

    #[test]
    fn condition_serde_shape() {
        let parsed: Condition = serde_json::from_value(json!({
            "field": "score",
            "operator": "greater_than",
            "value": "50",
            "valueType": "number"
        }))
        .expect("deserialize");
        assert_eq!(parsed.operator, ConditionOperator::GreaterThan);
        assert_eq!(parsed.value_type, ValueType::Number);

        let defaults: Condition =
            serde_json::from_value(json!({ "field": "cv", "operator": "is_not_empty" }))
                .expect("deserialize");
        assert_eq!(defaults.value, "");
        assert_eq!(defaults.value_type, ValueType::String);
    }

    #[test]
    fn scalar_literals_are_read_as_text() {
        let numeric: Condition = serde_json::from_value(json!({
            "field": "score",
            "operator": "greater_than",
            "value": 70,
            "valueType": "number"
        }))
        .expect("deserialize");
        assert_eq!(numeric.value, "70");
        assert!(numeric.evaluate(&facts(json!({ "score": 85 }))));
        assert!(!numeric.evaluate(&facts(json!({ "score": 40 }))));

        let flag: Condition = serde_json::from_value(json!({
            "field": "relocate",
            "operator": "equals",
            "value": true,
            "valueType": "boolean"
        }))
        .expect("deserialize");
        assert_eq!(flag.value, "true");
        assert!(flag.evaluate(&facts(json!({ "relocate": true }))));

        let nested: Result<Condition, _> = serde_json::from_value(json!({
            "field": "score",
            "operator": "equals",
            "value": [70]
        }));
        assert!(nested.is_err());
    }
}
