//! Backend error classification
//!
//! Reduces driver errors to a closed set so that nothing above this module
//! needs to know SQLite result codes.

use rusqlite::ffi;
use rusqlite::ErrorCode;

/// What a backend error means to the datastore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorClass {
    /// A single-row lookup matched nothing
    NotFound,
    /// A primary-key or unique constraint rejected the statement
    Collision,
    /// The statement was interrupted (deadline passed)
    Interrupted,
    Other,
}

/// One implementation per backend
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, err: &rusqlite::Error) -> BackendErrorClass;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteErrorClassifier;

impl ErrorClassifier for SqliteErrorClassifier {
    fn classify(&self, err: &rusqlite::Error) -> BackendErrorClass {
        match err {
            rusqlite::Error::QueryReturnedNoRows => BackendErrorClass::NotFound,
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                ErrorCode::ConstraintViolation
                    if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    BackendErrorClass::Collision
                }
                ErrorCode::OperationInterrupted => BackendErrorClass::Interrupted,
                _ => BackendErrorClass::Other,
            },
            _ => BackendErrorClass::Other,
        }
    }
}
