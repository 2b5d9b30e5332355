//! `write`/`flush`/`release`/`fsync` (§4.5): thin `Reply*` adapters over the
//! reply-free logic in [`super::ops`].

use super::ops;
use super::prelude::*;
use crate::fs::S3Fs;

pub fn write(fs: &mut S3Fs, ino: u64, _fh: u64, offset: i64, data: &[u8], reply: ReplyWrite) {
    match ops::write(fs, ino, offset, data) {
        Ok(written) => reply.written(written),
        Err(e) => reply.error(e.to_errno()),
    }
}

/// No-op: writes only persist at `release` (§4.5).
pub fn flush(reply: ReplyEmpty) {
    reply.ok();
}

/// No-op: durability happens at `release` plus the uploader's later PUT,
/// not here (§9: a known, deliberate weakening).
pub fn fsync(reply: ReplyEmpty) {
    reply.ok();
}

pub fn release(fs: &mut S3Fs, ino: u64, _fh: u64, reply: ReplyEmpty) {
    match ops::release(fs, ino) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
