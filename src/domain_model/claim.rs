use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const EXPIRY_CLAIM: &str = "exp";
pub const EXPIRATION_CLAIM: &str = "expiration";
pub const NOT_BEFORE_CLAIM: &str = "nbf";

/// A single typed fact about the principal. Duplicate types are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }

    /// Flattens a JSON claim set in token order. Arrays become one claim per element.
    pub fn from_json_map(map: &serde_json::Map<String, Value>) -> Vec<Claim> {
        let mut claims = Vec::with_capacity(map.len());
        for (claim_type, value) in map {
            match value {
                Value::Array(items) => {
                    for item in items {
                        claims.push(Claim::new(claim_type, json_text(item)));
                    }
                }
                other => claims.push(Claim::new(claim_type, json_text(other))),
            }
        }
        claims
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.claim_type, self.value)
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
