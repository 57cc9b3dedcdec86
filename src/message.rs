use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};

/// A Bayeux message as routed by the engine
///
/// The engine only reads `channel`; everything else is carried opaquely.
/// Equality is structural over every field, so two identical messages
/// published separately collapse into one pending entry per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub channel: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

impl Message {
    pub fn new(channel: impl Into<String>, data: Value) -> Self {
        Self {
            channel: channel.into(),
            data,
            id: None,
            client_id: None,
            ext: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Decode a message from its JSON wire form
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// Must agree with `Value`'s equality: integers and floats never compare
// equal, and `0.0 == -0.0`.
impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.channel.hash(state);
        hash_value(&self.data, state);
        self.id.hash(state);
        self.client_id.hash(state);
        match &self.ext {
            Some(ext) => {
                1u8.hash(state);
                hash_value(ext, state);
            }
            None => 0u8.hash(state),
        }
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            if let Some(u) = n.as_u64() {
                0u8.hash(state);
                u.hash(state);
            } else if let Some(i) = n.as_i64() {
                1u8.hash(state);
                i.hash(state);
            } else if let Some(f) = n.as_f64() {
                2u8.hash(state);
                let f = if f == 0.0 { 0.0 } else { f };
                f.to_bits().hash(state);
            }
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            map.len().hash(state);
            for (key, item) in map {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality_collapses_in_set() {
        let mut set = HashSet::new();
        set.insert(Message::new("/foo", json!({"a": 1, "b": [1, 2]})));
        set.insert(Message::new("/foo", json!({"b": [1, 2], "a": 1})));
        assert_eq!(set.len(), 1);

        set.insert(Message::new("/foo", json!({"a": 2, "b": [1, 2]})));
        set.insert(Message::new("/foo", json!({"a": 1, "b": [1, 2]})).with_id("7"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_signed_zero_collapses_in_set() {
        let positive = Message::new("/foo", json!({"x": 0.0}));
        let negative = Message::new("/foo", json!({"x": -0.0}));
        assert_eq!(positive, negative);

        let mut set = HashSet::new();
        set.insert(positive);
        set.insert(negative);
        assert_eq!(set.len(), 1);

        set.insert(Message::new("/foo", json!({"x": 0})));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_decode_bayeux_fields() {
        let msg = Message::from_json(
            r#"{"channel":"/chat/room","data":{"text":"hi"},"clientId":"abc","id":"1"}"#,
        )
        .unwrap();
        assert_eq!(msg.channel, "/chat/room");
        assert_eq!(msg.data, json!({"text": "hi"}));
        assert_eq!(msg.client_id.as_deref(), Some("abc"));
        assert_eq!(msg.id.as_deref(), Some("1"));
        assert!(msg.ext.is_none());
    }

    #[test]
    fn test_decode_requires_channel() {
        assert!(Message::from_json(r#"{"data":"x"}"#).is_err());
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let json = Message::new("/foo", json!("x")).to_json().unwrap();
        assert_eq!(json, r#"{"channel":"/foo","data":"x"}"#);
    }
}
