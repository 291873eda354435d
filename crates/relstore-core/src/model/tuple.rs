use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named condition attached to a relationship, with its bound parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipCondition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RelationshipCondition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Map<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Deep equality, treating an absent context and an empty one as the same
    pub fn same_as(&self, other: &RelationshipCondition) -> bool {
        fn normalized(
            c: &Option<serde_json::Map<String, serde_json::Value>>,
        ) -> Option<&serde_json::Map<String, serde_json::Value>> {
            c.as_ref().filter(|m| !m.is_empty())
        }
        self.name == other.name && normalized(&self.context) == normalized(&other.context)
    }
}

/// Deep equality of two optional conditions
pub fn conditions_equal(
    a: Option<&RelationshipCondition>,
    b: Option<&RelationshipCondition>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    }
}

/// A relationship `(object, relation, user)` with an optional condition
///
/// `object` is `type:id`; `user` is `type:id`, `type:*`, `type:id#relation`
/// or `*`. The condition never takes part in the tuple's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleKey {
    pub object: String,
    pub relation: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<RelationshipCondition>,
}

impl TupleKey {
    pub fn new(
        object: impl Into<String>,
        relation: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            object: object.into(),
            relation: relation.into(),
            user: user.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: RelationshipCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Copy of this key with the condition stripped
    pub fn without_condition(&self) -> TupleKey {
        TupleKey {
            object: self.object.clone(),
            relation: self.relation.clone(),
            user: self.user.clone(),
            condition: None,
        }
    }
}

impl std::fmt::Display for TupleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

/// Whether a tuple's user is a concrete user or a set of users
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserType {
    /// `type:id` or `type:*`
    User,
    /// `type:id#relation` or the bare `*`
    UserSet,
}

impl UserType {
    /// Persisted column value
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::User => "user",
            UserType::UserSet => "userset",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live relationship as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    pub key: TupleKey,
    pub store: String,
    /// Monotonic identifier; also the default pagination key
    pub ulid: String,
    pub inserted_at: DateTime<Utc>,
}

/// Kind of mutation recorded in the changelog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TupleOperation {
    Write,
    Delete,
}

impl TupleOperation {
    /// Persisted column value
    pub fn as_i64(&self) -> i64 {
        match self {
            TupleOperation::Write => 0,
            TupleOperation::Delete => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(TupleOperation::Write),
            1 => Some(TupleOperation::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for TupleOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TupleOperation::Write => f.write_str("WRITE"),
            TupleOperation::Delete => f.write_str("DELETE"),
        }
    }
}

/// One committed mutation, as read back from the changelog
///
/// Deletes carry the tuple identity only; their condition is redacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleChange {
    pub tuple_key: TupleKey,
    pub operation: TupleOperation,
    pub timestamp: DateTime<Utc>,
    pub ulid: String,
}
