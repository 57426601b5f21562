//! Dynamically-typed values carried by script events

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::host::Entity;

/// A dynamically-typed script value
///
/// Script events carry their arguments as a single `MValue` payload which is
/// normally a `List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MValue {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Entity(Entity),
    List(Vec<MValue>),
    /// Keys keep their source order
    Dict(IndexMap<String, MValue>),
}

impl MValue {
    /// Coerce this payload into an ordered argument sequence
    ///
    /// A list yields its items in source order, `Nil` yields no arguments and
    /// any other value becomes a single argument.
    pub fn to_args(&self) -> Vec<MValue> {
        match self {
            MValue::List(items) => items.clone(),
            MValue::Nil => Vec::new(),
            other => vec![other.clone()],
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, MValue::Nil)
    }
}

impl From<bool> for MValue {
    fn from(value: bool) -> Self {
        MValue::Bool(value)
    }
}

impl From<i64> for MValue {
    fn from(value: i64) -> Self {
        MValue::Int(value)
    }
}

impl From<u64> for MValue {
    fn from(value: u64) -> Self {
        MValue::UInt(value)
    }
}

impl From<f64> for MValue {
    fn from(value: f64) -> Self {
        MValue::Double(value)
    }
}

impl From<&str> for MValue {
    fn from(value: &str) -> Self {
        MValue::String(value.to_string())
    }
}

impl From<String> for MValue {
    fn from(value: String) -> Self {
        MValue::String(value)
    }
}

impl From<Entity> for MValue {
    fn from(value: Entity) -> Self {
        MValue::Entity(value)
    }
}

impl<T: Into<MValue>> From<Vec<T>> for MValue {
    fn from(values: Vec<T>) -> Self {
        MValue::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_keeps_source_order() {
        let payload = MValue::List(vec![MValue::from(3i64), MValue::from("b"), MValue::Bool(true)]);
        assert_eq!(
            payload.to_args(),
            vec![MValue::Int(3), MValue::String("b".into()), MValue::Bool(true)]
        );
    }

    #[test]
    fn test_empty_and_nil_payloads() {
        assert!(MValue::List(Vec::new()).to_args().is_empty());
        assert!(MValue::Nil.to_args().is_empty());
    }

    #[test]
    fn test_scalar_payload_becomes_single_argument() {
        assert_eq!(MValue::from("solo").to_args(), vec![MValue::from("solo")]);
    }

    #[test]
    fn test_nested_list_is_not_flattened() {
        let inner = MValue::from(vec![1i64, 2]);
        let payload = MValue::List(vec![inner.clone()]);
        assert_eq!(payload.to_args(), vec![inner]);
    }

    #[test]
    fn test_tagged_json_shape() {
        let json = serde_json::to_string(&MValue::from(vec!["a"])).unwrap();
        assert_eq!(json, r#"{"type":"list","value":[{"type":"string","value":"a"}]}"#);
        let nil: MValue = serde_json::from_str(r#"{"type":"nil"}"#).unwrap();
        assert!(nil.is_nil());
    }

    #[test]
    fn test_dict_keeps_key_order() {
        let json = r#"{"type":"dict","value":{"zeta":{"type":"int","value":1},"alpha":{"type":"bool","value":true}}}"#;
        let dict: MValue = serde_json::from_str(json).unwrap();
        let MValue::Dict(entries) = &dict else {
            panic!("expected a dict, got {:?}", dict);
        };
        let keys: Vec<&str> = entries.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(serde_json::to_string(&dict).unwrap(), json);
    }
}
