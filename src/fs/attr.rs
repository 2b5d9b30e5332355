//! `getattr`/`setattr`/`statfs` (§4.5): thin `Reply*` adapters over the
//! reply-free logic in [`super::ops`].

use super::ops;
use super::prelude::*;
use crate::fs::S3Fs;

pub(crate) fn to_file_attr(env: &Envelope, ino: u64, uid: u32, gid: u32) -> FileAttr {
    let kind = match env.kind() {
        Kind::Directory => FileType::Directory,
        Kind::Symlink => FileType::Symlink,
        Kind::File => FileType::RegularFile,
    };
    let blksize: u32 = 262_144;
    let to_time = |secs: u64| UNIX_EPOCH + Duration::from_secs(secs);
    FileAttr {
        ino,
        size: env.size,
        blocks: env.size / blksize as u64,
        atime: to_time(env.atime),
        mtime: to_time(env.mtime),
        ctime: to_time(env.ctime),
        crtime: to_time(env.ctime),
        kind,
        perm: (env.mode & 0o7777) as u16,
        nlink: 1,
        uid,
        gid,
        rdev: 0,
        flags: 0,
        blksize,
    }
}

pub fn getattr(fs: &mut S3Fs, req: &Request, ino: u64, reply: ReplyAttr) {
    let (uid, gid) = (req.uid(), req.gid());
    match ops::getattr(fs, ino, uid, gid) {
        Ok(attr) => reply.attr(&fs.attr_ttl, &attr),
        Err(e) => reply.error(e.to_errno()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn setattr(
    fs: &mut S3Fs,
    req: &Request,
    ino: u64,
    _mode: Option<u32>,
    _uid: Option<u32>,
    _gid: Option<u32>,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
    _fh: Option<u64>,
    reply: ReplyAttr,
) {
    let (uid, gid) = (req.uid(), req.gid());
    match ops::setattr(fs, ino, uid, gid, size, atime, mtime) {
        Ok(attr) => reply.attr(&fs.attr_ttl, &attr),
        Err(e) => reply.error(e.to_errno()),
    }
}

/// Fixed synthetic totals (§4.5: `statfs` has no real backing quota).
pub fn statfs(reply: fuser::ReplyStatfs) {
    let block_size: u32 = 262_144;
    let total_blocks: u64 = 1 << 30;
    reply.statfs(total_blocks, total_blocks, total_blocks, 1_000_000, 1_000_000, block_size, 255, block_size);
}
