//! `mknod`/`create`/`mkdir`/`symlink` (§4.5): thin `Reply*` adapters over the
//! reply-free logic in [`super::ops`].

use super::ops;
use super::prelude::*;
use crate::fs::S3Fs;

/// Registers a brand-new regular file locally with no store round-trip; the
/// object materialises on first flush via `release` (§4.5).
pub fn mknod(fs: &mut S3Fs, req: &Request, parent: u64, name: &OsStr, mode: u32, reply: ReplyEntry) {
    let (uid, gid) = (req.uid(), req.gid());
    let name_str = name.to_string_lossy();
    match ops::mknod(fs, parent, &name_str, mode, uid, gid) {
        Ok((_ino, attr)) => reply.entry(&fs.entry_ttl, &attr, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}

/// `create` is `mknod` + `open` in one kernel round-trip.
pub fn create(fs: &mut S3Fs, req: &Request, parent: u64, name: &OsStr, mode: u32, reply: ReplyCreate) {
    let (uid, gid) = (req.uid(), req.gid());
    let name_str = name.to_string_lossy();
    match ops::create(fs, parent, &name_str, mode, uid, gid) {
        Ok((_ino, attr, fh)) => reply.created(&fs.entry_ttl, &attr, 0, fh, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}

/// PUTs an empty marker object with directory-mode metadata (§4.5). Rejects
/// an empty resulting key with `EINVAL`.
pub fn mkdir(fs: &mut S3Fs, req: &Request, parent: u64, name: &OsStr, mode: u32, reply: ReplyEntry) {
    let (uid, gid) = (req.uid(), req.gid());
    let name_str = name.to_string_lossy();
    match ops::mkdir(fs, parent, &name_str, mode, uid, gid) {
        Ok((_ino, attr)) => reply.entry(&fs.entry_ttl, &attr, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn symlink(
    fs: &mut S3Fs,
    req: &Request,
    parent: u64,
    link_name: &OsStr,
    target: &std::path::Path,
    reply: ReplyEntry,
) {
    let (uid, gid) = (req.uid(), req.gid());
    let name_str = link_name.to_string_lossy();
    let target_str = target.to_string_lossy();
    match ops::symlink(fs, parent, &name_str, &target_str, uid, gid) {
        Ok((_ino, attr)) => reply.entry(&fs.entry_ttl, &attr, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}
