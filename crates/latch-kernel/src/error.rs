use latch_store::StoreError;
use latch_types::{ActionKind, RecordEncodeError};
use thiserror::Error;

use crate::minter::MintError;
use crate::registry::ValidationError;

/// Errors surfaced by the deferral request path. Nothing is swallowed here:
/// generator and store failures propagate to the original request.
#[derive(Debug, Error)]
pub enum DeferError {
    #[error("no handler registered for action kind '{0}'")]
    UnknownHandler(ActionKind),
    #[error("pre-check validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(
        "failed to mint a unique token after {attempts} attempts; alphabet/length too small for the current volume"
    )]
    TokenSpaceExhausted { attempts: usize },
    #[error("token format has an empty alphabet or zero length")]
    UnusableTokenFormat,
    #[error("failed to encode action payload: {0}")]
    Encode(#[from] RecordEncodeError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<MintError> for DeferError {
    fn from(err: MintError) -> Self {
        match err {
            MintError::UnusableFormat => DeferError::UnusableTokenFormat,
            MintError::SpaceExhausted { attempts } => DeferError::TokenSpaceExhausted { attempts },
            MintError::Store(err) => DeferError::Store(err),
        }
    }
}

/// Errors surfaced by the confirmation path.
#[derive(Debug, Error)]
pub enum ConfirmError {
    /// Recoverable, user-facing outcome ("invalid code" / "code expired").
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// The stored action kind has no registered handler; deployment drift.
    #[error("no handler registered for action kind '{0}'")]
    UnknownHandler(ActionKind),
    /// The payload was accepted at deferral time but no longer validates:
    /// the world drifted during the deferral window. Fatal for this record.
    #[error("replay validation failed: {0}")]
    Validation(#[source] ValidationError),
    #[error("handler commit failed: {0}")]
    Commit(#[source] anyhow::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConfirmError {
    /// The recoverable rejection kind, if this error is one.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            ConfirmError::Rejected(rejection) => Some(*rejection),
            _ => None,
        }
    }
}

/// The single result-kind outcome the confirmation manager exposes for
/// recoverable refusals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Unknown token, or a token that was already used; callers cannot
    /// tell the two cases apart.
    #[error("unknown or already used token")]
    NotFound,
    /// The record's `valid_until` lies in the past. The record is left
    /// untouched.
    #[error("token expired")]
    Expired,
}
