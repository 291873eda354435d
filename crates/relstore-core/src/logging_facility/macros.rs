//! Canonical logging macros
//!
//! Field names come from `relstore_core_types::schema` so that the capture
//! layer and log consumers agree on them.

/// Log the start of an operation
///
/// ```
/// # use relstore_core::log_op_start;
/// log_op_start!("write");
/// log_op_start!("write", store_id = "01HSTORE", writes_len = 3usize);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::relstore_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::relstore_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use relstore_core::log_op_end;
/// log_op_end!("read_changes", duration_ms = 4u64, rows_len = 10usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::relstore_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::relstore_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log the failed end of an operation
///
/// `$err` is anything convertible into `ExError`; the kind and stable code
/// are attached as flat fields.
///
/// ```
/// # use relstore_core::log_op_error;
/// # use relstore_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::NotFound);
/// log_op_error!("get_store", err.clone(), duration_ms = 1u64);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::relstore_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::relstore_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($field)*
        );
    }};
}

/// Debug-level progress inside an operation (batch counts, row counts)
///
/// ```
/// # use relstore_core::log_op_step;
/// log_op_step!("write", "locked", lock_keys_len = 12usize, batches = 1usize);
/// ```
#[macro_export]
macro_rules! log_op_step {
    ($op:expr, $step:expr) => {
        $crate::tracing::debug!(
            component = module_path!(),
            op = $op,
            event = $step,
        );
    };
    ($op:expr, $step:expr, $($field:tt)*) => {
        $crate::tracing::debug!(
            component = module_path!(),
            op = $op,
            event = $step,
            $($field)*
        );
    };
}
