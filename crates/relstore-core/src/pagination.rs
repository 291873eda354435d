//! Opaque continuation tokens and overfetch paging
//!
//! A page is fetched with `page_size + 1` rows. When the extra row comes
//! back, the token is that row's ordering key and the next page starts at it
//! inclusively (`key >= token`), so no separate count query is needed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::errors::{ExError, ExErrorKind, Result};

/// Page request: a resume token from a previous page and a page size
///
/// `page_size == 0` reads everything in one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub from: Option<String>,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            from: None,
            page_size,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_token(mut self, token: impl Into<String>) -> Self {
        self.from = Some(token.into());
        self
    }

    /// Rows to request from the backend, `None` when unbounded
    pub fn fetch_limit(&self) -> Option<usize> {
        (self.page_size > 0).then(|| self.page_size + 1)
    }

    /// Decoded resume key, if a token was supplied
    ///
    /// # Errors
    ///
    /// `InvalidContinuationToken` if the token is not one this crate produced.
    pub fn decoded_from(&self) -> Result<Option<String>> {
        self.from.as_deref().map(decode_token).transpose()
    }
}

pub fn encode_token(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key.as_bytes())
}

/// # Errors
///
/// `InvalidContinuationToken` for anything that is not URL-safe base64 of a
/// non-empty UTF-8 key.
pub fn decode_token(token: &str) -> Result<String> {
    let invalid = || {
        ExError::new(ExErrorKind::InvalidContinuationToken)
            .with_message(format!("malformed continuation token '{}'", token))
    };
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let key = String::from_utf8(bytes).map_err(|_| invalid())?;
    if key.is_empty() {
        return Err(invalid());
    }
    Ok(key)
}

/// Cut an overfetched result down to one page
///
/// Returns the page and, when a `page_size + 1`-th row was present, a token
/// carrying that row's key.
pub fn split_page<T>(
    mut rows: Vec<T>,
    page_size: usize,
    key_of: impl Fn(&T) -> String,
) -> (Vec<T>, Option<String>) {
    if page_size == 0 || rows.len() <= page_size {
        return (rows, None);
    }
    let token = rows.get(page_size).map(|extra| encode_token(&key_of(extra)));
    rows.truncate(page_size);
    (rows, token)
}
