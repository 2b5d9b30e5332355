//! `lookup`/`readdir`/`open`/`read`/`readlink` (§4.5): thin `Reply*` adapters
//! over the reply-free logic in [`super::ops`].

use super::ops;
use super::prelude::*;
use crate::fs::S3Fs;

pub fn lookup(fs: &mut S3Fs, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
    let (uid, gid) = (req.uid(), req.gid());
    let name_str = name.to_string_lossy();
    match ops::lookup(fs, parent, &name_str, uid, gid) {
        Ok((_ino, attr)) => reply.entry(&fs.entry_ttl, &attr, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn readdir(fs: &mut S3Fs, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
    let entries = match ops::readdir(fs, ino) {
        Ok(entries) => entries,
        Err(e) => return reply.error(e.to_errno()),
    };
    for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
        if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
            break;
        }
    }
    reply.ok();
}

pub fn open(fs: &mut S3Fs, ino: u64, flags: i32, reply: ReplyOpen) {
    let write_requested = (flags & libc::O_WRONLY != 0) || (flags & libc::O_RDWR != 0);
    match ops::open(fs, ino, write_requested) {
        Ok(fh) => reply.opened(fh, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn read(fs: &mut S3Fs, ino: u64, _fh: u64, offset: i64, size: u32, reply: ReplyData) {
    match ops::read(fs, ino, offset, size) {
        Ok(data) => reply.data(&data),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn readlink(fs: &mut S3Fs, ino: u64, reply: ReplyData) {
    match ops::readlink(fs, ino) {
        Ok(data) => reply.data(&data),
        Err(e) => reply.error(e.to_errno()),
    }
}
