//! Reply-free core logic for every dispatcher operation in §4.5.
//!
//! `fuser`'s `Reply*` types have no public constructor outside the `fuser`
//! crate itself, so the only way to exercise this logic from a test (§10.6)
//! is to keep it independent of them. Each `fs/*.rs` sibling module is a
//! thin adapter: convert `OsStr`/`Request` into plain values, call here,
//! translate the `Result` into the right `reply.*` call.

use bytes::Bytes;
use fuser::{FileAttr, FileType, TimeOrNow};

use crate::envelope::{Envelope, Kind};
use crate::error::{FsError, FsResult};
use crate::name_mapper;

use super::attr::to_file_attr;
use super::{S3Fs, ROOT_INO};

pub fn getattr(fs: &mut S3Fs, ino: u64, uid: u32, gid: u32) -> FsResult<FileAttr> {
    if ino == ROOT_INO {
        return Ok(to_file_attr(&Envelope::root(), ROOT_INO, uid, gid));
    }
    let key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();
    let env = fs.fetch_or_cached_envelope(&key, Kind::File)?;
    Ok(to_file_attr(&env, ino, uid, gid))
}

pub fn setattr(
    fs: &mut S3Fs,
    ino: u64,
    uid: u32,
    gid: u32,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
) -> FsResult<FileAttr> {
    if ino == ROOT_INO {
        return Ok(to_file_attr(&Envelope::root(), ROOT_INO, uid, gid));
    }
    let key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();
    fs.fetch_or_cached_envelope(&key, Kind::File)?;

    // truncate(path, length): §4.5.
    if let Some(new_size) = size {
        let store = fs.store.clone();
        fs.runtime.block_on(fs.cache_store.ensure_loaded(&key, store.as_ref(), Kind::File))?;
        fs.cache_store.truncate(&key, new_size)?;
        fs.attr_cache.update(&key, |e| {
            e.size = new_size;
            e.touch_mtime();
        });
    }

    // utime(path, atime, mtime): §4.5.
    if atime.is_some() || mtime.is_some() {
        let now = now_secs();
        let resolve = |t: Option<TimeOrNow>, fallback: u64| match t {
            Some(TimeOrNow::SpecificTime(st)) => {
                st.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(fallback)
            }
            Some(TimeOrNow::Now) => now,
            None => fallback,
        };
        let current = fs.attr_cache.get(&key).cloned().unwrap_or_else(Envelope::new_file);
        let mut updated = current.clone();
        updated.atime = resolve(atime, current.atime);
        updated.mtime = resolve(mtime, current.mtime);
        updated.ctime = now;
        let store = fs.store.clone();
        fs.runtime.block_on(store.copy(&key, &key, &updated))?;
        fs.attr_cache.put(&key, updated);
    }

    let env = fs.attr_cache.get(&key).cloned().unwrap_or_else(Envelope::new_file);
    Ok(to_file_attr(&env, ino, uid, gid))
}

pub fn lookup(fs: &mut S3Fs, parent: u64, name: &str, uid: u32, gid: u32) -> FsResult<(u64, FileAttr)> {
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);
    let ino = fs.remember(&key);
    let env = fs.fetch_or_cached_envelope(&key, Kind::File)?;
    Ok((ino, to_file_attr(&env, ino, uid, gid)))
}

/// Returns `(ino, FileType, display_name)` for every entry, including `.`
/// and `..`; the caller applies `readdir`'s offset windowing.
pub fn readdir(fs: &mut S3Fs, ino: u64) -> FsResult<Vec<(u64, FileType, String)>> {
    let dir_key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();

    if !fs.dir_cache.is_populated(&dir_key) {
        let prefix = name_mapper::list_prefix_for(&dir_key);
        let store = fs.store.clone();
        let listing = fs.runtime.block_on(store.list_prefix(&prefix))?;
        let keys: Vec<&str> = listing.iter().map(|e| e.key.as_str()).collect();
        let names = name_mapper::child_names(&prefix, keys);
        fs.dir_cache.populate(&dir_key, names);
    }

    let mut entries = vec![(ino, FileType::Directory, ".".to_string())];
    let (parent_key, _) = name_mapper::split_parent(&dir_key);
    let parent_ino = if dir_key.is_empty() { ROOT_INO } else { fs.remember(&parent_key) };
    entries.push((parent_ino, FileType::Directory, "..".to_string()));

    if let Some(children) = fs.dir_cache.get(&dir_key) {
        for name in children.clone() {
            let is_dir = name.ends_with('/');
            let display = name.trim_end_matches('/');
            let child_key = name_mapper::join(&dir_key, display);
            let child_ino = fs.remember(&child_key);
            let kind = if is_dir { FileType::Directory } else { FileType::RegularFile };
            entries.push((child_ino, kind, display.to_string()));
        }
    }
    Ok(entries)
}

/// `open(path, flags)`: ensures a local data file exists for a write-mode
/// open, with no store interaction either way (§4.5). Returns the new fh.
pub fn open(fs: &mut S3Fs, ino: u64, write_requested: bool) -> FsResult<u64> {
    let key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();
    if write_requested && !fs.cache_store.exists(&key) {
        fs.cache_store.touch_empty(&key)?;
    }
    Ok(fs.alloc_fh())
}

pub fn read(fs: &mut S3Fs, ino: u64, offset: i64, size: u32) -> FsResult<Vec<u8>> {
    let key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();
    let offset = offset.max(0) as u64;

    if fs.cache_store.exists(&key) {
        return fs.cache_store.read_range(&key, offset, size);
    }

    let end_inclusive = offset + size.max(1) as u64 - 1;
    let store = fs.store.clone();
    let bytes = fs.runtime.block_on(store.get_range(&key, offset, end_inclusive))?;
    let len = bytes.len().min(size as usize);
    Ok(bytes[..len].to_vec())
}

pub fn readlink(fs: &mut S3Fs, ino: u64) -> FsResult<Vec<u8>> {
    let key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();
    let store = fs.store.clone();
    let (env, body) = fs.runtime.block_on(store.get(&key, Kind::Symlink))?;
    fs.attr_cache.put(&key, env);
    Ok(body.to_vec())
}

pub fn write(fs: &mut S3Fs, ino: u64, offset: i64, data: &[u8]) -> FsResult<u32> {
    let key = fs.resolve(ino).ok_or(FsError::NotFound)?.to_string();
    let store = fs.store.clone();
    fs.runtime.block_on(fs.cache_store.ensure_loaded(&key, store.as_ref(), Kind::File))?;

    let new_len = fs.cache_store.write_range(&key, offset.max(0) as u64, data)?;
    fs.attr_cache.update(&key, |e| {
        e.size = new_len;
        e.touch_mtime();
    });
    if fs.attr_cache.get(&key).is_none() {
        let mut env = Envelope::new_file();
        env.size = new_len;
        fs.attr_cache.put(&key, env);
    }
    Ok(data.len() as u32)
}

pub fn release(fs: &mut S3Fs, ino: u64) -> FsResult<()> {
    let key = match fs.resolve(ino) {
        Some(k) => k.to_string(),
        None => return Ok(()),
    };
    if fs.cache_store.exists(&key) {
        let now = now_secs();
        let mut env = fs.attr_cache.get(&key).cloned().unwrap_or_else(Envelope::new_file);
        env.atime = now;
        env.acl = "private".to_string();
        env.target_key = Some(key.clone());
        fs.cache_store.write_meta(&key, &env)?;
        fs.attr_cache.put(&key, env);
    }
    Ok(())
}

pub fn mknod(fs: &mut S3Fs, parent: u64, name: &str, mode: u32, uid: u32, gid: u32) -> FsResult<(u64, FileAttr)> {
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);
    let ino = fs.remember(&key);

    let mut env = Envelope::new_file();
    env.mode = libc::S_IFREG as u32 | (mode & 0o7777);
    fs.attr_cache.put(&key, env.clone());
    fs.dir_cache.add_child(&parent_key, name);

    Ok((ino, to_file_attr(&env, ino, uid, gid)))
}

pub fn create(
    fs: &mut S3Fs,
    parent: u64,
    name: &str,
    mode: u32,
    uid: u32,
    gid: u32,
) -> FsResult<(u64, FileAttr, u64)> {
    let (ino, attr) = mknod(fs, parent, name, mode, uid, gid)?;
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);
    fs.cache_store.touch_empty(&key)?;
    let fh = fs.alloc_fh();
    Ok((ino, attr, fh))
}

pub fn mkdir(fs: &mut S3Fs, parent: u64, name: &str, mode: u32, uid: u32, gid: u32) -> FsResult<(u64, FileAttr)> {
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);
    if key.is_empty() {
        return Err(FsError::BadRequest("mkdir: empty key"));
    }

    let mut env = Envelope::new_dir();
    env.mode = libc::S_IFDIR as u32 | (mode & 0o7777);
    let store = fs.store.clone();
    fs.runtime.block_on(store.put(&key, Bytes::new(), &env))?;

    let ino = fs.remember(&key);
    fs.attr_cache.put(&key, env.clone());
    fs.dir_cache.add_child(&parent_key, &format!("{name}/"));
    Ok((ino, to_file_attr(&env, ino, uid, gid)))
}

pub fn symlink(
    fs: &mut S3Fs,
    parent: u64,
    name: &str,
    target: &str,
    uid: u32,
    gid: u32,
) -> FsResult<(u64, FileAttr)> {
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);

    let env = Envelope::new_symlink();
    let store = fs.store.clone();
    fs.runtime.block_on(store.put(&key, Bytes::from(target.as_bytes().to_vec()), &env))?;

    let ino = fs.remember(&key);
    fs.attr_cache.put(&key, env.clone());
    fs.dir_cache.add_child(&parent_key, name);
    Ok((ino, to_file_attr(&env, ino, uid, gid)))
}

pub fn unlink(fs: &mut S3Fs, parent: u64, name: &str) -> FsResult<()> {
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);

    fs.attr_cache.remove(&key);
    fs.cache_store.clear(&key)?;
    let store = fs.store.clone();
    fs.runtime.block_on(store.delete(&key))?;
    fs.dir_cache.remove_child(&parent_key, name);
    Ok(())
}

pub fn rmdir(fs: &mut S3Fs, parent: u64, name: &str) -> FsResult<()> {
    let parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let key = name_mapper::join(&parent_key, name);
    if key.is_empty() {
        return Err(FsError::BadRequest("rmdir: empty key"));
    }

    fs.attr_cache.remove(&key);
    fs.cache_store.clear(&key)?;
    let store = fs.store.clone();
    fs.runtime.block_on(store.delete(&key))?;
    fs.dir_cache.remove_child(&parent_key, &format!("{name}/"));
    fs.dir_cache.invalidate(&key);
    Ok(())
}

pub fn rename(fs: &mut S3Fs, parent: u64, name: &str, newparent: u64, newname: &str) -> FsResult<()> {
    let old_parent_key = fs.resolve(parent).ok_or(FsError::NotFound)?.to_string();
    let new_parent_key = fs.resolve(newparent).ok_or(FsError::NotFound)?.to_string();
    let old_key = name_mapper::join(&old_parent_key, name);
    let new_key = name_mapper::join(&new_parent_key, newname);

    let env = fs.fetch_or_cached_envelope(&old_key, Kind::File)?;

    let mut copy_env = env.clone();
    copy_env.copy_source = Some(old_key.clone());
    let store = fs.store.clone();
    fs.runtime.block_on(store.copy(&old_key, &new_key, &copy_env))?;

    fs.remember(&new_key);
    fs.attr_cache.put(&new_key, env);
    fs.dir_cache.add_child(&new_parent_key, newname);
    // Non-atomic against the store (§9): a crash here can leave `new` and
    // `old` both present. Carrying any not-yet-uploaded local content across
    // the rename keeps this mount internally consistent either way.
    let _ = fs.cache_store.rename_local(&old_key, &new_key);

    unlink(fs, parent, name)
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
