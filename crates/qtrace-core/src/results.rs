//! Scenario-specific result values.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Key under which the verdict message is reported.
pub const ERROR_KEY: &str = "error";

pub type Results = BTreeMap<String, ResultValue>;

/// A value a scenario reports next to its verdict.
///
/// Serialized untagged, so `results` exports as an ordinary JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    /// A result the scenario reported without a value.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ResultValue>),
    Map(BTreeMap<String, ResultValue>),
}

impl ResultValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResultValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for ResultValue {
    fn from(v: bool) -> Self {
        ResultValue::Bool(v)
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        ResultValue::Int(v)
    }
}

impl From<u32> for ResultValue {
    fn from(v: u32) -> Self {
        ResultValue::Int(i64::from(v))
    }
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> Self {
        ResultValue::Float(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        ResultValue::Text(v.to_string())
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        ResultValue::Text(v)
    }
}

impl<T: Into<ResultValue>> From<Vec<T>> for ResultValue {
    fn from(v: Vec<T>) -> Self {
        ResultValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ResultValue>> for ResultValue {
    fn from(v: BTreeMap<String, ResultValue>) -> Self {
        ResultValue::Map(v)
    }
}

/// Reads `results`, taking `null` as no results.
pub(crate) fn deserialize_or_empty<'de, D>(deserializer: D) -> Result<Results, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Results>::deserialize(deserializer)?.unwrap_or_default())
}
