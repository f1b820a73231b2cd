//! Cursor codec.
//!
//! Owns the opaque wire format of continuation tokens and nothing else:
//!
//! ```text
//! base64url(json(OrderingKey)) "." base64url(HMAC-SHA256(secret, json))
//! ```
//!
//! The signature makes tokens tamper-evident; the embedded field and
//! direction let the engine reject tokens issued for another ordering.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::error::{PaginationError, StorageError};
use crate::ports::OrderingKey;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on accepted token length, checked before any decoding.
pub const MAX_CURSOR_TOKEN_LEN: usize = 4 * 1024;

/// Cursor encode/decode failures.
#[derive(Debug, Eq, PartialEq, Error)]
pub enum CursorError {
    #[error("cursor token is empty")]
    Empty,

    #[error("cursor token exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("cursor token is malformed")]
    Malformed,

    #[error("cursor token signature does not match")]
    InvalidSignature,

    #[error("cursor payload is invalid: {0}")]
    InvalidPayload(String),

    #[error("cursor could not be encoded: {0}")]
    Encode(String),
}

impl From<CursorError> for PaginationError {
    fn from(err: CursorError) -> Self {
        match err {
            CursorError::Encode(msg) => {
                PaginationError::Storage(StorageError::SerializationError(msg))
            }
            other => PaginationError::InvalidCursor(other.to_string()),
        }
    }
}

/// Signs and verifies continuation tokens.
#[derive(Clone)]
pub struct CursorCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

impl CursorCodec {
    /// Create a codec signing with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Encode a position as an opaque token.
    pub fn encode(&self, key: &OrderingKey) -> Result<String, CursorError> {
        let payload = serde_json::to_vec(key).map_err(|e| CursorError::Encode(e.to_string()))?;
        let signature = self.mac(&payload)?.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Decode a token produced by [`CursorCodec::encode`] with the same secret.
    ///
    /// Surrounding whitespace is trimmed.
    pub fn decode(&self, token: &str) -> Result<OrderingKey, CursorError> {
        let token = token.trim();

        if token.is_empty() {
            return Err(CursorError::Empty);
        }

        if token.len() > MAX_CURSOR_TOKEN_LEN {
            return Err(CursorError::TooLong {
                len: token.len(),
                max: MAX_CURSOR_TOKEN_LEN,
            });
        }

        let (payload, signature) = token.split_once('.').ok_or(CursorError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CursorError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CursorError::Malformed)?;

        self.mac(&payload)?
            .verify_slice(&signature)
            .map_err(|_| CursorError::InvalidSignature)?;

        serde_json::from_slice(&payload).map_err(|e| CursorError::InvalidPayload(e.to_string()))
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256, CursorError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| CursorError::Encode(e.to_string()))?;
        mac.update(payload);
        Ok(mac)
    }
}
