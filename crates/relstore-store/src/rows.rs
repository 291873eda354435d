//! Row mapping shared by the read and write paths

use chrono::{DateTime, TimeZone, Utc};
use relstore_core::errors::{ExError, ExErrorKind};
use relstore_core::tuple_utils::{build_object, decode_condition};
use relstore_core::{Tuple, TupleChange, TupleKey, TupleOperation};
use rusqlite::Row;

use crate::errors::Result;

/// Columns selected for every tuple read, in `RawTuple::from_row` order
pub const TUPLE_COLUMNS: &str =
    "object_type, object_id, relation, _user, condition_name, condition_context, ulid, inserted_at";

/// Columns selected for every changelog read, in `RawChange::from_row` order
pub const CHANGE_COLUMNS: &str =
    "object_type, object_id, relation, _user, condition_name, condition_context, operation, ulid, inserted_at";

pub fn datetime_to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// # Errors
///
/// `Internal` if the stored value is outside chrono's range.
pub fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
    Utc.timestamp_opt(secs, nanos).single().ok_or_else(|| {
        ExError::new(ExErrorKind::Internal)
            .with_message(format!("stored timestamp {} out of range", micros))
    })
}

/// A tuple row before its condition blob and timestamp are decoded
pub struct RawTuple {
    object_type: String,
    object_id: String,
    relation: String,
    user: String,
    condition_name: Option<String>,
    condition_context: Option<Vec<u8>>,
    ulid: String,
    inserted_at: i64,
}

impl RawTuple {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            object_type: row.get(0)?,
            object_id: row.get(1)?,
            relation: row.get(2)?,
            user: row.get(3)?,
            condition_name: row.get(4)?,
            condition_context: row.get(5)?,
            ulid: row.get(6)?,
            inserted_at: row.get(7)?,
        })
    }

    pub fn into_tuple(self, store: &str) -> Result<Tuple> {
        let condition = decode_condition(self.condition_name, self.condition_context)?;
        Ok(Tuple {
            key: TupleKey {
                object: build_object(&self.object_type, &self.object_id),
                relation: self.relation,
                user: self.user,
                condition,
            },
            store: store.to_string(),
            ulid: self.ulid,
            inserted_at: micros_to_datetime(self.inserted_at)?,
        })
    }
}

pub struct RawChange {
    tuple: RawTuple,
    operation: i64,
}

impl RawChange {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            tuple: RawTuple {
                object_type: row.get(0)?,
                object_id: row.get(1)?,
                relation: row.get(2)?,
                user: row.get(3)?,
                condition_name: row.get(4)?,
                condition_context: row.get(5)?,
                ulid: row.get(7)?,
                inserted_at: row.get(8)?,
            },
            operation: row.get(6)?,
        })
    }

    pub fn into_change(self, store: &str) -> Result<TupleChange> {
        let operation = TupleOperation::from_i64(self.operation).ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_message(format!("unknown changelog operation {}", self.operation))
        })?;
        let tuple = self.tuple.into_tuple(store)?;
        Ok(TupleChange {
            tuple_key: tuple.key,
            operation,
            timestamp: tuple.inserted_at,
            ulid: tuple.ulid,
        })
    }
}
