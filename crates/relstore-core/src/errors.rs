use relstore_core_types::RequestId;
use thiserror::Error;

use crate::model::TupleOperation;

/// Result type alias using the canonical error facility
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error that crosses a crate boundary is an [`ExError`] carrying one of
/// these kinds. Each kind maps to a stable code so callers (and tests) can
/// match on the failure without parsing messages. Backend-specific codes are
/// reduced to this set by the store's error classifier and never leak further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup
    NotFound,

    // Write path
    /// Raw uniqueness violation reported by the backend
    Collision,
    /// A delete of a missing tuple or an insert of an existing tuple under policy `Error`
    InvalidWriteInput,
    /// A duplicate insert under policy `Ignore` whose condition differs from the stored one
    ConditionConflict,
    /// Fewer rows were deleted than were locked
    WriteConflictOnDelete,
    /// An insert collided with a row committed after the lock was taken
    WriteConflictOnInsert,

    // Validation
    InvalidInput,
    InvalidContinuationToken,

    // Integration/IO
    Persistence,
    Serialization,
    Timeout,
    Migration,
    Config,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Collision => "ERR_COLLISION",
            ExErrorKind::InvalidWriteInput => "ERR_INVALID_WRITE_INPUT",
            ExErrorKind::ConditionConflict => "ERR_CONDITION_CONFLICT",
            ExErrorKind::WriteConflictOnDelete => "ERR_WRITE_CONFLICT_ON_DELETE",
            ExErrorKind::WriteConflictOnInsert => "ERR_WRITE_CONFLICT_ON_INSERT",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidContinuationToken => "ERR_INVALID_CONTINUATION_TOKEN",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Migration => "ERR_MIGRATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether this kind reports a lost race or policy conflict on the write path.
    ///
    /// Callers that retry do so at the level of the whole write call.
    pub fn is_write_conflict(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidWriteInput
                | ExErrorKind::ConditionConflict
                | ExErrorKind::WriteConflictOnDelete
                | ExErrorKind::WriteConflictOnInsert
        )
    }
}

/// Canonical structured error type
///
/// Classification fields support programmatic handling; the optional context
/// (operation, store, tuple key) supports debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    store_id: Option<String>,
    tuple_key: Option<String>,
    operation: Option<TupleOperation>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            store_id: None,
            tuple_key: None,
            operation: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add store ID context
    pub fn with_store_id(mut self, id: impl Into<String>) -> Self {
        self.store_id = Some(id.into());
        self
    }

    /// Add the offending tuple key (in `object#relation@user` form)
    pub fn with_tuple_key(mut self, key: impl Into<String>) -> Self {
        self.tuple_key = Some(key.into());
        self
    }

    /// Add the tuple operation that was rejected
    pub fn with_operation(mut self, operation: TupleOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn store_id(&self) -> Option<&str> {
        self.store_id.as_deref()
    }

    pub fn tuple_key(&self) -> Option<&str> {
        self.tuple_key.as_deref()
    }

    pub fn operation(&self) -> Option<TupleOperation> {
        self.operation
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(store_id) = &self.store_id {
            write!(f, " (store: {})", store_id)?;
        }
        if let Some(tuple_key) = &self.tuple_key {
            write!(f, " (tuple: {})", tuple_key)?;
        }
        if let Some(operation) = self.operation {
            write!(f, " (operation: {})", operation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Build the policy rejection for a delete of a missing tuple or an insert of an existing one.
pub fn invalid_write_input(tuple_key: impl Into<String>, operation: TupleOperation) -> ExError {
    let tuple_key = tuple_key.into();
    let message = match operation {
        TupleOperation::Delete => "cannot delete a tuple which does not exist",
        TupleOperation::Write => "cannot write a tuple which already exists",
    };
    ExError::new(ExErrorKind::InvalidWriteInput)
        .with_tuple_key(tuple_key)
        .with_operation(operation)
        .with_message(message)
}

/// Build the rejection for re-writing an existing tuple with a different condition.
pub fn condition_conflict(tuple_key: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::ConditionConflict)
        .with_tuple_key(tuple_key)
        .with_operation(TupleOperation::Write)
        .with_message("attempted to write a tuple which already exists with a different condition")
}

// ========== End Error Facility ==========

/// Validation errors for tuple keys and write requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TupleError {
    /// Object is not of the form `type:id`
    #[error("Invalid object '{object}': expected 'type:id'")]
    InvalidObject { object: String },

    /// Relation is empty or contains reserved characters
    #[error("Invalid relation '{relation}'")]
    InvalidRelation { relation: String },

    /// User is empty or malformed
    #[error("Invalid user '{user}'")]
    InvalidUser { user: String },

    /// Condition has an empty name
    #[error("Invalid condition on tuple {tuple_key}: {reason}")]
    InvalidCondition { tuple_key: String, reason: String },

    /// The same tuple appears more than once across deletes and writes
    #[error("Duplicate tuple in write request: {tuple_key}")]
    DuplicateTupleInWrite { tuple_key: String },

    /// The write request is larger than the datastore accepts in one call
    #[error("Write request has {count} tuples, exceeding the limit of {limit}")]
    ExceedsMaxTuplesPerWrite { count: usize, limit: usize },

    /// Authorization model has more type definitions than allowed
    #[error("Authorization model has {count} type definitions, exceeding the limit of {limit}")]
    ExceedsMaxTypesPerModel { count: usize, limit: usize },

    /// Serialization error (condition context, model or assertion blobs)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<TupleError> for ExError {
    fn from(err: TupleError) -> Self {
        match err {
            TupleError::DuplicateTupleInWrite { ref tuple_key } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_tuple_key(tuple_key.clone())
                    .with_message(err.to_string())
            }
            TupleError::InvalidCondition { ref tuple_key, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_tuple_key(tuple_key.clone())
                    .with_message(err.to_string())
            }
            TupleError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
            }
            TupleError::InvalidObject { .. }
            | TupleError::InvalidRelation { .. }
            | TupleError::InvalidUser { .. }
            | TupleError::ExceedsMaxTuplesPerWrite { .. }
            | TupleError::ExceedsMaxTypesPerModel { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for TupleError {
    fn from(err: serde_json::Error) -> Self {
        TupleError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        TupleError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_path_error_kind_codes() {
        let cases = [
            (ExErrorKind::Collision, "ERR_COLLISION"),
            (ExErrorKind::InvalidWriteInput, "ERR_INVALID_WRITE_INPUT"),
            (ExErrorKind::ConditionConflict, "ERR_CONDITION_CONFLICT"),
            (
                ExErrorKind::WriteConflictOnDelete,
                "ERR_WRITE_CONFLICT_ON_DELETE",
            ),
            (
                ExErrorKind::WriteConflictOnInsert,
                "ERR_WRITE_CONFLICT_ON_INSERT",
            ),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_is_write_conflict() {
        assert!(ExErrorKind::WriteConflictOnInsert.is_write_conflict());
        assert!(ExErrorKind::ConditionConflict.is_write_conflict());
        assert!(!ExErrorKind::Collision.is_write_conflict());
        assert!(!ExErrorKind::NotFound.is_write_conflict());
    }

    #[test]
    fn test_invalid_write_input_carries_operation() {
        let err = invalid_write_input("doc:1#viewer@user:anne", TupleOperation::Delete);
        assert_eq!(err.kind(), ExErrorKind::InvalidWriteInput);
        assert_eq!(err.operation(), Some(TupleOperation::Delete));
        assert_eq!(err.tuple_key(), Some("doc:1#viewer@user:anne"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::NotFound)
            .with_op("get_store")
            .with_store_id("01ABC")
            .with_message("store not found");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_NOT_FOUND]"));
        assert!(rendered.contains("get_store"));
        assert!(rendered.contains("01ABC"));
    }

    #[test]
    fn test_tuple_error_conversion() {
        let err: ExError = TupleError::DuplicateTupleInWrite {
            tuple_key: "doc:1#viewer@user:anne".into(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.tuple_key(), Some("doc:1#viewer@user:anne"));
    }

    #[test]
    fn test_source_chain() {
        let inner = ExError::new(ExErrorKind::Persistence).with_message("disk I/O error");
        let outer = ExError::new(ExErrorKind::Timeout).with_source(inner);
        let source = std::error::Error::source(&outer).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("[ERR_PERSISTENCE]: disk I/O error"));
    }
}
