//! `rename` (§4.5): thin `Reply*` adapter over the reply-free logic in
//! [`super::ops`].

use super::ops;
use super::prelude::*;
use crate::fs::S3Fs;

pub fn rename(fs: &mut S3Fs, parent: u64, name: &OsStr, newparent: u64, newname: &OsStr, reply: ReplyEmpty) {
    let name_str = name.to_string_lossy();
    let newname_str = newname.to_string_lossy();
    match ops::rename(fs, parent, &name_str, newparent, &newname_str) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
