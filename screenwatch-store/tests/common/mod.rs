use std::path::PathBuf;

use screenwatch_store::Store;

/// Lowest bcrypt cost; keeps the tests fast.
pub const TEST_HASH_COST: u32 = 4;

pub struct TestStore {
    pub store: Store,
    pub path: PathBuf,
    _tempdir: tempfile::TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenwatch.json");
        Self {
            store: Store::open(&path).with_hash_cost(TEST_HASH_COST),
            path,
            _tempdir: dir,
        }
    }
}
