use crate::{ActionStore, PendingUpdate, PendingUpdateFn, StoreError, StoreResult, io_error};
use latch_cbor::to_canonical_cbor;
use latch_types::{DeferredAction, TargetRef, Timestamp, Token};
use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Filesystem-backed store rooted at `<root>/.latch/actions`, one
/// canonical-CBOR file per record, named by the hex of the token bytes so
/// custom alphabets can never produce an unsafe path.
///
/// Updates serialize through a store-level mutex; the atomicity guarantee is
/// per process, which matches the single-request model the confirmation path
/// assumes.
#[derive(Clone)]
pub struct FsStore {
    actions_dir: PathBuf,
    update_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for FsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsStore")
            .field("actions_dir", &self.actions_dir)
            .finish()
    }
}

impl FsStore {
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let actions_dir = root.as_ref().join(".latch").join("actions");
        fs::create_dir_all(&actions_dir).map_err(|e| io_error(&actions_dir, e))?;
        Ok(Self {
            actions_dir,
            update_lock: Arc::new(Mutex::new(())),
        })
    }

    fn record_path(&self, token: &Token) -> PathBuf {
        self.actions_dir.join(hex::encode(token.as_str()))
    }

    fn write_new(path: &Path, bytes: &[u8], token: &Token) -> StoreResult<()> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(bytes).map_err(|e| io_error(path, e))?;
                file.sync_all().map_err(|e| io_error(path, e))?;
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(StoreError::TokenExists {
                token: token.clone(),
            }),
            Err(err) => Err(io_error(path, err)),
        }
    }

    fn rewrite(path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let tmp = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| io_error(&tmp, e))?;
        file.write_all(bytes).map_err(|e| io_error(&tmp, e))?;
        file.sync_all().map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| io_error(path, e))
    }

    fn read_record(&self, path: &Path) -> StoreResult<Option<DeferredAction>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(path, err)),
        };
        Ok(Some(serde_cbor::from_slice(&bytes)?))
    }
}

impl ActionStore for FsStore {
    fn insert(&self, record: DeferredAction) -> StoreResult<()> {
        let bytes = to_canonical_cbor(&record)?;
        let path = self.record_path(&record.token);
        Self::write_new(&path, &bytes, &record.token)
    }

    fn get(&self, token: &Token) -> StoreResult<Option<DeferredAction>> {
        self.read_record(&self.record_path(token))
    }

    fn contains(&self, token: &Token) -> StoreResult<bool> {
        Ok(self.record_path(token).exists())
    }

    fn count_pending(&self, target: &TargetRef, now: Timestamp) -> StoreResult<usize> {
        let entries = fs::read_dir(&self.actions_dir).map_err(|e| io_error(&self.actions_dir, e))?;
        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.actions_dir, e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                continue;
            }
            if let Some(record) = self.read_record(&path)? {
                if record.target.as_ref() == Some(target) && record.is_pending(now) {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn update_pending(
        &self,
        token: &Token,
        apply: PendingUpdateFn<'_>,
    ) -> StoreResult<Option<DeferredAction>> {
        let _guard = self.update_lock.lock().unwrap();
        let path = self.record_path(token);
        let Some(mut record) = self.read_record(&path)? else {
            return Ok(None);
        };
        if record.confirmed {
            return Ok(None);
        }
        if apply(&record) == PendingUpdate::Confirm {
            record.confirmed = true;
            let bytes = to_canonical_cbor(&record)?;
            Self::rewrite(&path, &bytes)?;
        }
        Ok(Some(record))
    }
}
