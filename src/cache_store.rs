//! C2: the on-disk write-back staging area (§4.2).
//!
//! Every key that is opened for write or created locally gets a data file
//! plus a sidecar metadata file under the cache directory. The data file is
//! plain bytes; the sidecar is the envelope serialised as TOML (§3). Disk
//! layout is flat: `slug(key)` disambiguates keys that would otherwise
//! collide once path separators are substituted (§9).

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::envelope::{Envelope, Kind};
use crate::error::{FsError, FsResult};
use crate::s3_client::ObjectStore;

/// Maps a bucket key to a filesystem-safe, collision-resistant name.
/// `/` becomes `_`, and every slug is suffixed with a hash of the full key so
/// that e.g. `a/b` and `a_b` never land on the same cache file (§3, §9).
pub fn slug(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let digest = hasher.finish();
    let mut safe: String = key
        .chars()
        .map(|c| if c == '/' || c == ',' || c.is_control() { '_' } else { c })
        .collect();
    if safe.is_empty() {
        safe.push_str("_root_");
    }
    safe.push('-');
    safe.push_str(&format!("{digest:016x}"));
    safe
}

/// Splits a cache-directory entry name into `(bucket, slug)` iff it is an
/// upload-eligible sidecar — i.e. it splits on `,` into exactly three fields
/// `(bucket, slug, "meta")` (§4.6).
pub fn split_sidecar_name(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.split(',');
    let bucket = parts.next()?;
    let slug = parts.next()?;
    let marker = parts.next()?;
    if marker != "meta" || parts.next().is_some() {
        return None;
    }
    Some((bucket, slug))
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    bucket: String,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(CacheStore { root, bucket: bucket.into() })
    }

    /// Data file name: `{bucket},{slug(key)}` (§3).
    pub fn data_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{},{}", self.bucket, slug(key)))
    }

    /// Sidecar name: `{bucket},{slug(key)},meta` (§3).
    pub fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{},{},meta", self.bucket, slug(key)))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data_path(key).is_file()
    }

    /// Reads the sidecar, if any.
    pub fn read_meta(&self, key: &str) -> FsResult<Option<Envelope>> {
        let path = self.meta_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Envelope::from_sidecar_text(&text)
            .map(Some)
            .map_err(|e| FsError::Transport(e.to_string()))
    }

    /// Writes the sidecar via create-then-rename so a crash mid-write never
    /// leaves a half-written envelope for the uploader to read (§4.2, §9).
    pub fn write_meta(&self, key: &str, envelope: &Envelope) -> FsResult<()> {
        let final_path = self.meta_path(key);
        let tmp_path = self.root.join(format!("{}.tmp-{}", slug(key), std::process::id()));
        let text = envelope
            .to_sidecar_text()
            .map_err(|e| FsError::Transport(e.to_string()))?;
        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Ensures a (possibly empty) data file exists locally for `key`, pulling
    /// the current object body down first if the key is not already staged.
    /// A 404 from the store means "new file created locally" (§4.5, §7). Does
    /// not touch the sidecar: `release` is the sole place that marks a key
    /// upload-eligible (§4.2, §4.6).
    pub async fn ensure_loaded(&self, key: &str, store: &dyn ObjectStore, default_kind: Kind) -> FsResult<()> {
        if self.exists(key) {
            return Ok(());
        }
        match store.get(key, default_kind).await {
            Ok((_envelope, body)) => {
                fs::write(self.data_path(key), &body)?;
                Ok(())
            }
            Err(crate::s3_client::StoreError::NotFound) => {
                fs::write(self.data_path(key), [])?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates an empty, zero-length staged file with no store round-trip and
    /// no sidecar — used by `create`/`mknod` for brand-new objects (§4.9).
    /// `release` is what marks the key upload-eligible.
    pub fn touch_empty(&self, key: &str) -> FsResult<()> {
        File::create(self.data_path(key))?;
        Ok(())
    }

    pub fn read_range(&self, key: &str, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let file = File::open(self.data_path(key))?;
        let len = file.metadata()?.len();
        if offset >= len {
            return Ok(Vec::new());
        }
        let want = (size as u64).min(len - offset) as usize;
        let mut buf = vec![0u8; want];
        file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Writes `data` at `offset`, growing the file with an implicit hole if
    /// `offset` is past the current end (§4.6, POSIX sparse-write semantics).
    /// Returns the file's length after the write.
    pub fn write_range(&self, key: &str, offset: u64, data: &[u8]) -> FsResult<u64> {
        let path = self.data_path(key);
        let file = OpenOptions::new().write(true).open(&path)?;
        file.write_all_at(data, offset)?;
        Ok(file.metadata()?.len())
    }

    pub fn truncate(&self, key: &str, length: u64) -> FsResult<()> {
        let path = self.data_path(key);
        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_len(length)?;
        Ok(())
    }

    pub fn size_of(&self, key: &str) -> FsResult<u64> {
        Ok(fs::metadata(self.data_path(key))?.len())
    }

    /// Drops both the data and sidecar files for `key` (after a successful
    /// upload, or on `unlink`).
    pub fn clear(&self, key: &str) -> FsResult<()> {
        let data = self.data_path(key);
        let meta = self.meta_path(key);
        if data.is_file() {
            fs::remove_file(&data)?;
        }
        if meta.is_file() {
            fs::remove_file(&meta)?;
        }
        Ok(())
    }

    /// Moves a staged key to a new key without touching the data, used by
    /// `rename` when the renamed object is still dirty locally.
    pub fn rename_local(&self, old_key: &str, new_key: &str) -> FsResult<()> {
        let old_data = self.data_path(old_key);
        if !old_data.is_file() {
            return Ok(());
        }
        fs::rename(&old_data, self.data_path(new_key))?;
        if self.meta_path(old_key).is_file() {
            fs::rename(self.meta_path(old_key), self.meta_path(new_key))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3_client::fake::FakeObjectStore;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[test]
    fn slug_disambiguates_path_separator_collisions() {
        assert_ne!(slug("a/b"), slug("a_b"));
    }

    #[test]
    fn sidecar_file_name_matches_the_three_field_comma_scheme() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "mybucket").unwrap();
        let meta_name = store.meta_path("a/b.txt").file_name().unwrap().to_string_lossy().to_string();
        let (bucket, slug_part) = split_sidecar_name(&meta_name).expect("eligible sidecar name");
        assert_eq!(bucket, "mybucket");
        assert_eq!(slug_part, slug("a/b.txt"));
    }

    #[test]
    fn split_sidecar_name_rejects_non_sidecar_entries() {
        assert!(split_sidecar_name("mybucket,abc123").is_none());
        assert!(split_sidecar_name("mybucket,abc123,meta,extra").is_none());
        assert!(split_sidecar_name("not-a-sidecar").is_none());
    }

    #[test]
    fn touch_empty_then_read_range_is_empty() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        store.touch_empty("a.txt").unwrap();
        assert!(store.exists("a.txt"));
        assert!(store.read_meta("a.txt").unwrap().is_none());
        assert_eq!(store.read_range("a.txt", 0, 10).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn write_then_read_range_round_trips() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        store.touch_empty("a.txt").unwrap();
        let len = store.write_range("a.txt", 0, b"hello").unwrap();
        assert_eq!(len, 5);
        assert_eq!(store.read_range("a.txt", 0, 5).unwrap(), b"hello");
    }

    #[test]
    fn write_past_end_creates_a_hole() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        store.touch_empty("a.txt").unwrap();
        let len = store.write_range("a.txt", 10, b"x").unwrap();
        assert_eq!(len, 11);
        let data = store.read_range("a.txt", 0, 11).unwrap();
        assert_eq!(data.len(), 11);
        assert_eq!(data[10], b'x');
    }

    #[test]
    fn truncate_shrinks_file() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        store.touch_empty("a.txt").unwrap();
        store.write_range("a.txt", 0, b"hello world").unwrap();
        store.truncate("a.txt", 5).unwrap();
        assert_eq!(store.size_of("a.txt").unwrap(), 5);
    }

    #[test]
    fn write_meta_round_trips() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        let mut env = Envelope::new_file();
        env.size = 42;
        store.write_meta("a.txt", &env).unwrap();
        let read_back = store.read_meta("a.txt").unwrap().unwrap();
        assert_eq!(read_back.size, 42);
    }

    #[tokio::test]
    async fn ensure_loaded_downloads_existing_object() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        let fake = FakeObjectStore::new();
        fake.seed("a.txt", Envelope::new_file(), Bytes::from_static(b"remote"));

        store.ensure_loaded("a.txt", &fake, Kind::File).await.unwrap();
        assert!(store.read_meta("a.txt").unwrap().is_none());
        assert_eq!(store.read_range("a.txt", 0, 6).unwrap(), b"remote");
    }

    #[tokio::test]
    async fn ensure_loaded_creates_empty_file_on_missing_object() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        let fake = FakeObjectStore::new();

        store.ensure_loaded("new.txt", &fake, Kind::File).await.unwrap();
        assert!(store.exists("new.txt"));
        assert!(store.read_meta("new.txt").unwrap().is_none());
        assert_eq!(store.read_range("new.txt", 0, 10).unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn ensure_loaded_is_a_noop_once_staged() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        let fake = FakeObjectStore::new();
        fake.seed("a.txt", Envelope::new_file(), Bytes::from_static(b"remote"));

        store.ensure_loaded("a.txt", &fake, Kind::File).await.unwrap();
        store.write_range("a.txt", 0, b"local!").unwrap();
        store.ensure_loaded("a.txt", &fake, Kind::File).await.unwrap();
        assert_eq!(store.read_range("a.txt", 0, 6).unwrap(), b"local!");
    }

    #[test]
    fn clear_removes_both_files() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        store.touch_empty("a.txt").unwrap();
        store.clear("a.txt").unwrap();
        assert!(!store.exists("a.txt"));
        assert!(store.read_meta("a.txt").unwrap().is_none());
    }

    #[test]
    fn rename_local_moves_both_files() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "bucket").unwrap();
        store.touch_empty("old.txt").unwrap();
        store.rename_local("old.txt", "new.txt").unwrap();
        assert!(!store.exists("old.txt"));
        assert!(store.exists("new.txt"));
    }
}
