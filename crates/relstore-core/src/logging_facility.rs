//! Structured logging facility for relstore
//!
//! - Single initialization point via `init(profile)`
//! - Operation bracketing macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Debug-level progress events from inside an operation (`log_op_step!`)
//! - Test capture mode for asserting emitted events
//!
//! # Usage
//!
//! ```rust
//! use relstore_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Every public datastore operation emits exactly one `start` event and then
//! exactly one of `end` or `end_error`, all tagged with the same `op`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
