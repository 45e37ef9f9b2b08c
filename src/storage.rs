use crate::config::STORE_PREFIX;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const ENTRY_EXT: &str = "bin";

/// One saved photo. `buffer` holds the base64 text of the encoded image and
/// may be absent on entries written by older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: String,
    pub buffer: Option<String>,
}

impl StoredImage {
    pub fn new(encoded: &[u8]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            buffer: Some(STANDARD.encode(encoded)),
        }
    }

    /// Encoded image bytes, `Ok(None)` when the entry has no buffer.
    pub fn encoded(&self) -> Result<Option<Vec<u8>>> {
        self.buffer
            .as_deref()
            .map(|text| {
                STANDARD
                    .decode(text)
                    .with_context(|| format!("base64 buffer of reference {}", self.id))
            })
            .transpose()
    }
}

/// Append-only set of reference photos, one postcard file per entry. File
/// names start with the write time so a sorted listing is arrival order.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    root: PathBuf,
}

impl Default for ReferenceStore {
    fn default() -> Self {
        Self::open(STORE_PREFIX.as_path())
    }
}

impl ReferenceStore {
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every reference, oldest first. Unreadable or corrupt entry files are
    /// logged and skipped.
    pub fn load(&self) -> Result<Vec<StoredImage>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut files = std::fs::read_dir(&self.root)
            .with_context(|| format!("listing {}", self.root.display()))?
            .filter_map(|dirent| dirent.ok().map(|d| d.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == ENTRY_EXT))
            .collect::<Vec<_>>();
        files.sort();

        Ok(files.iter().filter_map(|file| read_entry(file)).collect())
    }

    /// Store `encoded` as a new reference and return the entry written.
    pub fn append(&self, encoded: &[u8]) -> Result<StoredImage> {
        let entry = StoredImage::new(encoded);
        self.push(entry.clone())?;
        Ok(entry)
    }

    /// Write `entry` to its own file. The file only appears under its final
    /// name once fully written, so readers never see a partial entry.
    pub fn push(&self, entry: StoredImage) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating {}", self.root.display()))?;
        let data = postcard::to_allocvec(&entry)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .with_context(|| format!("creating temp file in {}", self.root.display()))?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;

        let file = self.root.join(entry_file_name());
        tmp.persist_noclobber(&file)
            .map_err(|e| e.error)
            .with_context(|| format!("writing {}", file.display()))?;
        log::debug!("stored reference {} as {}", entry.id, file.display());
        Ok(())
    }

    pub fn purge(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)
                .with_context(|| format!("removing {}", self.root.display()))?;
        }
        Ok(())
    }
}

fn entry_file_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:020}-{}.{}", nanos, uuid::Uuid::new_v4(), ENTRY_EXT)
}

fn read_entry(file: &Path) -> Option<StoredImage> {
    let parsed = std::fs::read(file)
        .with_context(|| format!("reading {}", file.display()))
        .and_then(|data| {
            postcard::from_bytes(&data).with_context(|| format!("parsing {}", file.display()))
        });
    match parsed {
        Ok(entry) => Some(entry),
        Err(e) => {
            log::warn!("skipping stored entry: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::open(dir.path().join("refs"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::open(dir.path());
        let first = store.append(b"first").unwrap();
        let second = store.append(b"second").unwrap();

        let entries = store.load().unwrap();
        assert_eq!(entries, vec![first, second]);
        assert_eq!(entries[1].encoded().unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_missing_buffer_is_none() {
        let entry = StoredImage {
            id: "legacy".into(),
            buffer: None,
        };
        assert!(entry.encoded().unwrap().is_none());
    }

    #[test]
    fn test_bad_base64_is_error() {
        let entry = StoredImage {
            id: "broken".into(),
            buffer: Some("***".into()),
        };
        assert!(entry.encoded().is_err());
    }

    #[test]
    fn test_truncated_entry_does_not_fail_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::open(dir.path());
        let first = store.append(b"first").unwrap();
        let second = store.append(b"second").unwrap();

        let data = postcard::to_allocvec(&StoredImage::new(b"third")).unwrap();
        std::fs::write(
            dir.path().join(format!("99999999999999999999-cut.{}", ENTRY_EXT)),
            &data[..data.len() - 3],
        )
        .unwrap();
        // temp file of a write still in progress
        std::fs::write(dir.path().join(".tmpXYZ"), &data[..4]).unwrap();

        assert_eq!(store.load().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_concurrent_appends_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::open(dir.path());

        std::thread::scope(|s| {
            for i in 0..8u8 {
                let store = &store;
                s.spawn(move || {
                    store.append(&[i; 64]).unwrap();
                });
            }
            for _ in 0..4 {
                let store = &store;
                s.spawn(move || {
                    for _ in 0..20 {
                        let seen = store.load().unwrap();
                        assert!(seen.len() <= 8);
                    }
                });
            }
        });

        let mut payloads = store
            .load()
            .unwrap()
            .iter()
            .map(|entry| entry.encoded().unwrap().unwrap()[0])
            .collect::<Vec<_>>();
        payloads.sort();
        assert_eq!(payloads, (0..8u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_purge_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReferenceStore::open(dir.path().join("refs"));
        store.append(b"x").unwrap();
        store.purge().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert!(!store.root().exists());
    }
}
