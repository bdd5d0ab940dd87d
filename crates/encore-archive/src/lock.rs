//! Per-path encode serialization
//!
//! Encode calls for the same target file must never race: the second caller
//! queues behind the in-flight write and then applies its own patch on top
//! of the freshly written file. The table is keyed by canonicalized path so
//! aliases of the same file share one lock; different paths proceed
//! independently. Cross-process locking is out of scope.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Process-wide table of per-path write locks
struct PathLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut table = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            table
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Get the write lock for a target path
///
/// The returned mutex outlives the table entry; holding its guard
/// serializes all encodes for that path within this process.
pub(crate) fn write_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<PathLocks> = OnceLock::new();
    LOCKS.get_or_init(PathLocks::new).lock_for(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_shares_one_lock() {
        let a = write_lock(Path::new("/tmp/encore-lock-test.stems"));
        let b = write_lock(Path::new("/tmp/encore-lock-test.stems"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_paths_are_independent() {
        let a = write_lock(Path::new("/tmp/encore-lock-a.stems"));
        let b = write_lock(Path::new("/tmp/encore-lock-b.stems"));
        assert!(!Arc::ptr_eq(&a, &b));

        // Holding one must not block the other.
        let _guard_a = a.lock().unwrap();
        let guard_b = b.try_lock();
        assert!(guard_b.is_ok());
    }
}
