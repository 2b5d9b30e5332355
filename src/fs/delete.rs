//! `unlink`/`rmdir` (§4.5): thin `Reply*` adapters over the reply-free logic
//! in [`super::ops`].

use super::ops;
use super::prelude::*;
use crate::fs::S3Fs;

pub fn unlink(fs: &mut S3Fs, parent: u64, name: &OsStr, reply: ReplyEmpty) {
    let name_str = name.to_string_lossy();
    match ops::unlink(fs, parent, &name_str) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn rmdir(fs: &mut S3Fs, parent: u64, name: &OsStr, reply: ReplyEmpty) {
    let name_str = name.to_string_lossy();
    match ops::rmdir(fs, parent, &name_str) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
