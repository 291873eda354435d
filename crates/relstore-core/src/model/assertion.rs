use serde::{Deserialize, Serialize};

use super::tuple::TupleKey;

/// An expected check outcome recorded against an authorization model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub tuple_key: TupleKey,
    pub expectation: bool,
    #[serde(default)]
    pub contextual_tuples: Vec<TupleKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Assertion {
    pub fn new(tuple_key: TupleKey, expectation: bool) -> Self {
        Self {
            tuple_key,
            expectation,
            contextual_tuples: Vec::new(),
            context: None,
        }
    }
}
