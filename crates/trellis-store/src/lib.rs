pub mod codec;
pub mod debounce;
pub mod prefs;

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compute a filesystem-safe storage key from a conversation key.
/// storage_key = blake3(conversation_key) → hex string (first 32 chars).
pub fn storage_key(conversation_key: &str) -> String {
    let hash = blake3::hash(conversation_key.as_bytes());
    hash.to_hex()[..32].to_string()
}

/// Entry key for a conversation's tree snapshot.
pub fn tree_entry_key(conversation_key: &str) -> String {
    format!("tree.{}", storage_key(conversation_key))
}

/// Entry key for a conversation's scroll offsets.
pub fn scroll_entry_key(conversation_key: &str) -> String {
    format!("scroll.{}", storage_key(conversation_key))
}

/// Entry key for the user's panel size preference (one per user, not per
/// conversation).
pub const PANEL_ENTRY_KEY: &str = "panel";

/// Return the per-user store root: platform data dir + `trellis`,
/// falling back to `~/.trellis`, then a local dot-directory.
pub fn store_root() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("trellis")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".trellis")
    } else {
        PathBuf::from(".trellis-store")
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// File-based exclusive lock guard.
pub struct LockGuard {
    _file: fs::File,
}

/// Acquire an exclusive file lock. Creates the lock file if needed.
pub fn lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(LockGuard { _file: file })
}

/// Durable string-to-string store, one entry per key.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// One JSON file per entry under a root directory, written atomically under
/// a store-wide lock.
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the per-user data dir.
    pub fn user_default() -> Self {
        Self::new(store_root())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys the crate hands out are plain ascii and file as-is. Anything
        // else files under its hash, so two distinct keys can never share an
        // entry.
        let plain = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        let name = if plain {
            key.to_string()
        } else {
            blake3::hash(key.as_bytes()).to_hex().to_string()
        };
        self.root.join(format!("{name}.json"))
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("store.lock")
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let _lock = lock_file(&self.lock_path())?;
        write_atomic(&self.entry_path(key), value.as_bytes())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let _lock = lock_file(&self.lock_path())?;
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and embedders that manage durability themselves.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
