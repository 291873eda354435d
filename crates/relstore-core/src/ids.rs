//! Monotonic identifiers for tuples, changelog entries, stores and models
//!
//! Ids are UUIDv7: a 48-bit millisecond timestamp followed by random bits.
//! Their lowercase hyphenated form sorts lexicographically in generation
//! order, which is what the pagination cursor relies on.

use std::sync::Mutex;

use chrono::Utc;
use uuid::{Builder, Uuid};

/// Source of sortable unique ids
pub trait IdGenerator: Send + Sync {
    /// Next id; strictly greater than every id this generator returned before
    fn next_id(&self) -> String;
}

/// UUIDv7 generator that never goes backwards, even when the clock does or
/// several ids fall within the same millisecond
#[derive(Debug, Default)]
pub struct UlidLikeGenerator {
    last: Mutex<u128>,
}

impl UlidLikeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn candidate() -> u128 {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut random = [0u8; 10];
        random.copy_from_slice(&Uuid::new_v4().as_bytes()[..10]);
        Builder::from_unix_timestamp_millis(millis, &random)
            .into_uuid()
            .as_u128()
    }
}

impl IdGenerator for UlidLikeGenerator {
    fn next_id(&self) -> String {
        let candidate = Self::candidate();
        // a poisoned lock still holds a valid last value
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let next = if candidate > *last {
            candidate
        } else {
            last.wrapping_add(1)
        };
        *last = next;
        Uuid::from_u128(next).hyphenated().to_string()
    }
}
