// Key-value storage media for store snapshots

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A string-keyed, string-valued storage slot set.
///
/// Every call may fail (medium unavailable, quota exceeded); callers decide
/// how much that matters.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local storage, optionally capped at a total byte quota
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes pushing the total size (keys plus values)
    /// past `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: HashMap::new(),
            quota: Some(bytes),
        }
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(eyre!("Storage quota exceeded: {} bytes needed, {} allowed", needed, quota));
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

// ============================================================================
// Files
// ============================================================================

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temp file that is renamed into place while holding an
/// exclusive lock on `<key>.lock`; reads take the shared lock.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open or create a file store in `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create storage directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock_file(&self, key: &str) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(format!("{}.lock", key)))
            .context("Failed to open lock file")
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.lock_file(key)?;
        lock.lock_shared().context("Failed to acquire shared lock")?;
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        // Lock is released when `lock` is dropped
        Ok(Some(content))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let path = self.value_path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        {
            let mut tmp = File::create(&tmp_path).context("Failed to create temp file")?;
            tmp.write_all(value.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &path).context("Failed to move snapshot into place")?;

        debug!(key, bytes = value.len(), path = ?path, "FileStorage: wrote item");
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let path = self.value_path(key);
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove item")?;
        }
        Ok(())
    }
}

/// Keys become file names, so keep them to a safe alphabet
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// SQLite
// ============================================================================

/// Key-value table in a SQLite database
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let db = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        Self::with_connection(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .context("Failed to create storage schema")?;
        Ok(Self { db })
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }
}

impl Storage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.db
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read storage item")
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let updated_at = chrono::Utc::now().timestamp_millis();
        self.db
            .execute(
                "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )
            .context("Failed to write storage item")?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.db
            .execute("DELETE FROM storage WHERE key = ?1", [key])
            .context("Failed to remove storage item")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(storage: &mut dyn Storage) {
        assert_eq!(storage.get_item("slot").unwrap(), None);

        storage.set_item("slot", "{\"a\":1}").unwrap();
        assert_eq!(storage.get_item("slot").unwrap().as_deref(), Some("{\"a\":1}"));

        storage.set_item("slot", "{\"a\":2}").unwrap();
        assert_eq!(storage.get_item("slot").unwrap().as_deref(), Some("{\"a\":2}"));

        storage.remove_item("slot").unwrap();
        assert_eq!(storage.get_item("slot").unwrap(), None);

        // Removing a missing key is fine
        storage.remove_item("slot").unwrap();
    }

    #[test]
    fn test_memory_storage() {
        exercise(&mut MemoryStorage::new());
    }

    #[test]
    fn test_memory_storage_quota() {
        let mut storage = MemoryStorage::with_quota(16);
        storage.set_item("k", "0123456789").unwrap();
        // Replacing a value only counts the new size
        storage.set_item("k", "abcdefghij").unwrap();
        assert!(storage.set_item("k", "this value is far too long").is_err());
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("abcdefghij"));
        assert!(storage.set_item("other", "0123456789").is_err());
    }

    #[test]
    fn test_file_storage() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path().join("nested")).unwrap();
        assert!(storage.dir().exists());
        exercise(&mut storage);
    }

    #[test]
    fn test_file_storage_persists_across_handles() {
        let temp = TempDir::new().unwrap();
        {
            let mut storage = FileStorage::open(temp.path()).unwrap();
            storage.set_item("task-manager-storage", "hello").unwrap();
        }
        let storage = FileStorage::open(temp.path()).unwrap();
        assert_eq!(
            storage.get_item("task-manager-storage").unwrap().as_deref(),
            Some("hello")
        );
        assert!(temp.path().join("task-manager-storage.json").exists());
        assert!(!temp.path().join("task-manager-storage.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_key_validation() {
        assert!(validate_key("task-manager-storage").is_ok());
        assert!(validate_key("under_score").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());

        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path()).unwrap();
        assert!(storage.set_item("a/b", "x").is_err());
    }

    #[test]
    fn test_sqlite_storage_in_memory() {
        exercise(&mut SqliteStorage::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_storage_on_disk() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("data").join("taskboard.db");
        {
            let mut storage = SqliteStorage::open(&db_path).unwrap();
            storage.set_item("k", "v").unwrap();
        }
        assert!(db_path.exists());
        let storage = SqliteStorage::open(&db_path).unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));

        let count: i64 = storage
            .db()
            .query_row("SELECT COUNT(*) FROM storage", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
