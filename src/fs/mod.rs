//! C6: the FUSE operation dispatcher (§4.5).
//!
//! `S3Fs` holds every piece of process-local state — the object-store
//! handle, the cache-store/attribute-cache/directory-cache trio, and the
//! inode bookkeeping the kernel needs — while the `impl Filesystem` block
//! below forwards each kernel callback to its submodule, exactly the way the
//! teacher's own `fs/mod.rs` dispatches to `attr`/`read`/`write`/etc.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fuser::Filesystem;

use crate::attr_cache::AttributeCache;
use crate::cache_store::CacheStore;
use crate::config::Config;
use crate::dir_cache::DirectoryCache;
use crate::envelope::{Envelope, Kind};
use crate::error::FsResult;
use crate::s3_client::ObjectStore;

pub mod prelude;
mod attr;
mod create;
mod delete;
pub mod ops;
mod read;
mod rename;
mod write;
mod xattr;

pub const ROOT_INO: u64 = 1;

/// Synthesises a stable, collision-resistant inode number for `key` (§9):
/// a 63-bit hash, keeping the top bit clear so it never collides with the
/// fixed root inode's low value by construction of the mask alone.
pub fn ino_for_key(key: &str) -> u64 {
    if key.is_empty() {
        return ROOT_INO;
    }
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() & 0x7FFF_FFFF_FFFF_FFFF) | 1
}

pub struct S3Fs {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) cache_store: CacheStore,
    pub(crate) attr_cache: AttributeCache,
    pub(crate) dir_cache: DirectoryCache,
    pub(crate) ino_to_key: HashMap<u64, String>,
    pub(crate) next_fh: u64,
    pub(crate) attr_ttl: Duration,
    pub(crate) entry_ttl: Duration,
}

impl S3Fs {
    pub fn new(store: Arc<dyn ObjectStore>, cache_store: CacheStore, config: &Config) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime");
        let mut ino_to_key = HashMap::new();
        ino_to_key.insert(ROOT_INO, String::new());
        S3Fs {
            store,
            runtime,
            cache_store,
            attr_cache: AttributeCache::new(),
            dir_cache: DirectoryCache::new(),
            ino_to_key,
            next_fh: 1,
            attr_ttl: Duration::from_secs(config.kernel_attr_timeout_seconds),
            entry_ttl: Duration::from_secs(config.kernel_entry_timeout_seconds),
        }
    }

    /// Records `key`'s inode and returns it, so a later `getattr`/`read`/
    /// `write` on the same inode can recover the key.
    pub(crate) fn remember(&mut self, key: &str) -> u64 {
        let ino = ino_for_key(key);
        self.ino_to_key.insert(ino, key.to_string());
        ino
    }

    pub(crate) fn resolve(&self, ino: u64) -> Option<&str> {
        self.ino_to_key.get(&ino).map(|s| s.as_str())
    }

    /// FUSE requires a distinct handle per `open`, but since every read/
    /// write/release callback also carries the inode, the handle itself is
    /// just a counter here — no fh-to-key bookkeeping is needed.
    pub(crate) fn alloc_fh(&mut self) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        fh
    }

    /// Returns the cached envelope for `key`, `head`-ing the store on a miss
    /// and caching the result (§4.3, §4.5's `getattr` algorithm).
    pub(crate) fn fetch_or_cached_envelope(&mut self, key: &str, default_kind: Kind) -> FsResult<Envelope> {
        if let Some(env) = self.attr_cache.get(key) {
            return Ok(env.clone());
        }
        let store = self.store.clone();
        let env = self.runtime.block_on(store.head(key, default_kind))?;
        self.attr_cache.put(key, env.clone());
        Ok(env)
    }
}

/// The `Arc<Mutex<..>>` wrapper fuser actually mounts: kernel callbacks are
/// already serialized per mount (§5), so the mutex only exists to satisfy
/// `Filesystem`'s `&mut self` signature from behind a clonable handle.
#[derive(Clone)]
pub struct FsHandle(pub Arc<Mutex<S3Fs>>);

impl Filesystem for FsHandle {
    fn getattr(&mut self, req: &fuser::Request, ino: u64, reply: fuser::ReplyAttr) {
        let mut fs = self.0.lock().unwrap();
        attr::getattr(&mut fs, req, ino, reply);
    }

    fn setattr(
        &mut self,
        req: &fuser::Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<fuser::TimeOrNow>,
        mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: fuser::ReplyAttr,
    ) {
        let mut fs = self.0.lock().unwrap();
        attr::setattr(&mut fs, req, ino, mode, uid, gid, size, atime, mtime, fh, reply);
    }

    fn statfs(&mut self, _req: &fuser::Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        attr::statfs(reply);
    }

    fn lookup(&mut self, req: &fuser::Request, parent: u64, name: &OsStr, reply: fuser::ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        read::lookup(&mut fs, req, parent, name, reply);
    }

    fn readdir(&mut self, _req: &fuser::Request, ino: u64, fh: u64, offset: i64, reply: fuser::ReplyDirectory) {
        let mut fs = self.0.lock().unwrap();
        read::readdir(&mut fs, ino, fh, offset, reply);
    }

    fn open(&mut self, _req: &fuser::Request<'_>, ino: u64, flags: i32, reply: fuser::ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        read::open(&mut fs, ino, flags, reply);
    }

    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let mut fs = self.0.lock().unwrap();
        read::read(&mut fs, ino, fh, offset, size, reply);
    }

    fn readlink(&mut self, _req: &fuser::Request<'_>, ino: u64, reply: fuser::ReplyData) {
        let mut fs = self.0.lock().unwrap();
        read::readlink(&mut fs, ino, reply);
    }

    fn write(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        let mut fs = self.0.lock().unwrap();
        write::write(&mut fs, ino, fh, offset, data, reply);
    }

    fn flush(&mut self, _req: &fuser::Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: fuser::ReplyEmpty) {
        write::flush(reply);
    }

    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        write::release(&mut fs, ino, fh, reply);
    }

    fn fsync(&mut self, _req: &fuser::Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: fuser::ReplyEmpty) {
        write::fsync(reply);
    }

    fn mknod(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: fuser::ReplyEntry,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::mknod(&mut fs, req, parent, name, mode, reply);
    }

    fn create(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::create(&mut fs, req, parent, name, mode, reply);
    }

    fn mkdir(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: fuser::ReplyEntry,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::mkdir(&mut fs, req, parent, name, mode, reply);
    }

    fn symlink(
        &mut self,
        req: &fuser::Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &std::path::Path,
        reply: fuser::ReplyEntry,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::symlink(&mut fs, req, parent, link_name, target, reply);
    }

    fn unlink(&mut self, _req: &fuser::Request<'_>, parent: u64, name: &OsStr, reply: fuser::ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::unlink(&mut fs, parent, name, reply);
    }

    fn rmdir(&mut self, _req: &fuser::Request<'_>, parent: u64, name: &OsStr, reply: fuser::ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::rmdir(&mut fs, parent, name, reply);
    }

    fn rename(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: fuser::ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        rename::rename(&mut fs, parent, name, newparent, newname, reply);
    }

    fn getxattr(&mut self, _req: &fuser::Request<'_>, _ino: u64, _name: &OsStr, _size: u32, reply: fuser::ReplyXattr) {
        xattr::getxattr(reply);
    }

    fn setxattr(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        _name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: fuser::ReplyEmpty,
    ) {
        xattr::setxattr(reply);
    }

    fn listxattr(&mut self, _req: &fuser::Request<'_>, _ino: u64, _size: u32, reply: fuser::ReplyXattr) {
        xattr::listxattr(reply);
    }

    fn removexattr(&mut self, _req: &fuser::Request<'_>, _ino: u64, _name: &OsStr, reply: fuser::ReplyEmpty) {
        xattr::removexattr(reply);
    }

    fn link(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        _newparent: u64,
        _newname: &OsStr,
        reply: fuser::ReplyEntry,
    ) {
        xattr::link(reply);
    }
}
