//! Common imports shared by the dispatcher submodules, following the
//! teacher's own `fs/prelude.rs` placement.

pub use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};

pub use libc::{EINVAL, ENOENT, EOPNOTSUPP};

pub use std::ffi::OsStr;
pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use crate::envelope::{Envelope, Kind};
pub use crate::error::FsError;

pub use super::{ino_for_key, S3Fs, ROOT_INO};
