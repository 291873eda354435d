//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the logging macros,
//! the datastore operations and the test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Entity identifiers
pub const FIELD_STORE_ID: &str = "store_id";
pub const FIELD_MODEL_ID: &str = "model_id";
pub const FIELD_OBJECT_TYPE: &str = "object_type";

// Write-path sizes
pub const FIELD_DELETES_LEN: &str = "deletes_len";
pub const FIELD_WRITES_LEN: &str = "writes_len";
pub const FIELD_LOCK_KEYS_LEN: &str = "lock_keys_len";
pub const FIELD_BATCHES: &str = "batches";

// Read-path sizes
pub const FIELD_PAGE_SIZE: &str = "page_size";
pub const FIELD_ROWS_LEN: &str = "rows_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_STORE_ID.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_error_fields_are_flat_keys() {
        // tracing field names cannot contain '.' when emitted via macros
        assert!(!FIELD_ERR_KIND.contains('.'));
        assert!(!FIELD_ERR_CODE.contains('.'));
    }
}
