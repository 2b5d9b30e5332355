//! Shared harness for the dispatcher integration tests (§8, §10.6): builds an
//! `S3Fs` wired to an in-memory `FakeObjectStore` and a disposable cache
//! directory, with no real FUSE mount involved. `fuser`'s `Reply*` types have
//! no public constructor outside the `fuser` crate, so these tests drive
//! `s3fs_rs::fs::ops` directly instead of the `Filesystem` trait.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use s3fs_rs::cache_store::CacheStore;
use s3fs_rs::config::{self, Cli};
use s3fs_rs::fs::S3Fs;
use s3fs_rs::s3_client::fake::FakeObjectStore;
use s3fs_rs::s3_client::ObjectStore;

pub const UID: u32 = 1000;
pub const GID: u32 = 1000;

pub fn build_fs(cache_dir: &Path, bucket: &str) -> (S3Fs, Arc<FakeObjectStore>) {
    let fake = Arc::new(FakeObjectStore::new());
    let cache_store = CacheStore::new(cache_dir, bucket).expect("init cache dir");
    let cli = Cli {
        bucket: bucket.to_string(),
        mountpoint: PathBuf::from("/mnt"),
        cache_dir: cache_dir.to_path_buf(),
        config: PathBuf::from("/nonexistent-config.toml"),
        region: None,
        endpoint_url: None,
        retry_max_attempts: None,
        request_timeout_seconds: None,
        uploader_scan_interval_seconds: None,
        kernel_attr_timeout_seconds: None,
        kernel_entry_timeout_seconds: None,
        role: None,
    };
    let config = config::load_config(cli);
    let store: Arc<dyn ObjectStore> = fake.clone();
    (S3Fs::new(store, cache_store, &config), fake)
}
