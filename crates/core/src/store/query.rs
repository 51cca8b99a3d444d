//! Query model for `fetchRecords`: projection, `where` conditions and `whereGroups`.
//!
//! The wire format mixes two spellings: top-level conditions use
//! `FieldName/Operator/Values` while conditions nested in groups use
//! `fieldName/operator/values`. Both deserialize into the same [`Condition`].
//!
//! Evaluation (`matches`) is used by the in-memory store. String comparisons for
//! `Contains` and `StartsWith` are case-insensitive; ordering operators compare numbers
//! numerically and everything else lexicographically, which is correct for ISO-8601 dates.

use super::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    EqualTo,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    Contains,
    StartsWith,
}

/// One predicate on a single field. Multiple values mean "any of".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "FieldName")]
    pub field: String,
    #[serde(rename = "Operator")]
    pub operator: Operator,
    #[serde(rename = "Values")]
    pub values: Vec<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            values: vec![value.into()],
        }
    }

    pub fn equal_to(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::EqualTo, value)
    }

    pub fn at_least(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::GreaterThanOrEqualTo, value)
    }

    pub fn at_most(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::LessThanOrEqualTo, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Contains, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::StartsWith, value)
    }

    pub fn matches(&self, record: &Record) -> bool {
        let actual = match record.get(&self.field) {
            Some(Value::Null) | None => return false,
            Some(v) => v,
        };

        self.values.iter().any(|expected| match self.operator {
            Operator::EqualTo => loosely_equal(actual, expected),
            Operator::GreaterThanOrEqualTo => {
                matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::LessThanOrEqualTo => {
                matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::Contains => text_of(actual)
                .to_lowercase()
                .contains(&text_of(expected).to_lowercase()),
            Operator::StartsWith => text_of(actual)
                .to_lowercase()
                .starts_with(&text_of(expected).to_lowercase()),
        })
    }
}

/// Boolean connective for groups and sub-groups. An empty string on the wire means AND.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    fn combine(self, mut results: impl Iterator<Item = bool>) -> bool {
        match self {
            Logic::And => results.all(|r| r),
            Logic::Or => results.any(|r| r),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubGroup {
    #[serde(with = "camel_conditions")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub operator: Logic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhereGroup {
    pub operator: Logic,
    #[serde(rename = "subGroups")]
    pub sub_groups: Vec<SubGroup>,
}

impl WhereGroup {
    /// A group that matches when any one of the conditions matches.
    pub fn any_of(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            operator: Logic::Or,
            sub_groups: conditions
                .into_iter()
                .map(|c| SubGroup {
                    conditions: vec![c],
                    operator: Logic::And,
                })
                .collect(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.operator.combine(self.sub_groups.iter().map(|g| {
            g.operator
                .combine(g.conditions.iter().map(|c| c.matches(record)))
        }))
    }
}

/// Parameters of a `fetchRecords` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchQuery {
    #[serde(with = "field_list", default)]
    pub fields: Vec<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(rename = "whereGroups", default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<WhereGroup>,
}

impl FetchQuery {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn group(mut self, group: WhereGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Conditions are ANDed together, and with every group.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
            && self.groups.iter().all(|g| g.matches(record))
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => text_of(actual) == text_of(expected),
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(text_of(actual).cmp(&text_of(expected))),
    }
}

mod camel_conditions {
    use super::{Condition, Operator};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    #[derive(Serialize, Deserialize)]
    struct CamelCondition {
        #[serde(rename = "fieldName")]
        field: String,
        operator: Operator,
        values: Vec<Value>,
    }

    pub fn serialize<S: Serializer>(conditions: &[Condition], s: S) -> Result<S::Ok, S::Error> {
        conditions
            .iter()
            .map(|c| CamelCondition {
                field: c.field.clone(),
                operator: c.operator,
                values: c.values.clone(),
            })
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Condition>, D::Error> {
        let raw = Vec::<CamelCondition>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|c| Condition {
                field: c.field,
                operator: c.operator,
                values: c.values,
            })
            .collect())
    }
}

mod field_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct FieldRef {
        field: FieldName,
    }

    #[derive(Serialize, Deserialize)]
    struct FieldName {
        #[serde(rename = "Name")]
        name: String,
    }

    pub fn serialize<S: Serializer>(fields: &[String], s: S) -> Result<S::Ok, S::Error> {
        fields
            .iter()
            .map(|name| FieldRef {
                field: FieldName { name: name.clone() },
            })
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(Vec::<FieldRef>::deserialize(d)?
            .into_iter()
            .map(|f| f.field.name)
            .collect())
    }
}
