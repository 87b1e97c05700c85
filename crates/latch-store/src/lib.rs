//! Durable storage for deferred-action records, plus filesystem and
//! in-memory backends.

mod fs_store;
mod mem_store;

pub use fs_store::FsStore;
pub use mem_store::MemStore;

use latch_types::{DeferredAction, TargetRef, Timestamp, Token};
use std::{io, path::PathBuf, sync::Arc};

pub type StoreResult<T> = Result<T, StoreError>;
pub type DynStore = Arc<dyn ActionStore>;

/// Answer an [`ActionStore::update_pending`] callback gives about the record
/// it was shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingUpdate {
    /// Flip `confirmed = true` and persist before releasing the lock.
    Confirm,
    /// Leave the record untouched.
    Keep,
}

pub type PendingUpdateFn<'a> = &'a mut dyn FnMut(&DeferredAction) -> PendingUpdate;

/// Trait implemented by all deferred-action stores.
///
/// `update_pending` is the one operation with a transactional contract:
/// implementations hold their native exclusive lock across the callback, so
/// two concurrent calls for the same token serialize and only the first can
/// observe the record unconfirmed.
pub trait ActionStore: Send + Sync {
    /// Pure create. Fails with [`StoreError::TokenExists`] if a record with
    /// the same token is already present.
    fn insert(&self, record: DeferredAction) -> StoreResult<()>;

    fn get(&self, token: &Token) -> StoreResult<Option<DeferredAction>>;

    fn contains(&self, token: &Token) -> StoreResult<bool>;

    /// Number of non-confirmed, non-expired records referencing `target`.
    /// Advisory only; not a concurrency gate.
    fn count_pending(&self, target: &TargetRef, now: Timestamp) -> StoreResult<usize>;

    /// Exclusive read-modify-write over the non-confirmed record with
    /// `token`. Returns `Ok(None)` when no such record exists; an unknown
    /// token and an already-confirmed one are indistinguishable here. The
    /// callback runs under the store's write lock; answering
    /// [`PendingUpdate::Confirm`] persists `confirmed = true` before the
    /// lock is released. Returns the (possibly updated) record otherwise.
    fn update_pending(
        &self,
        token: &Token,
        apply: PendingUpdateFn<'_>,
    ) -> StoreResult<Option<DeferredAction>>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CBOR serialization error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("a record with token '{token}' already exists")]
    TokenExists { token: Token },
}

pub(crate) fn io_error(path: impl Into<PathBuf>, err: io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source: err,
    }
}
