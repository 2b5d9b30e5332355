//! `getxattr`/`setxattr`/`listxattr`/`removexattr`/`link` (§4.5): none of
//! these are supported, matching the teacher's `fs/xattr.rs` shape but
//! replying `EOPNOTSUPP` instead of pretending success.

use super::prelude::*;

pub fn getxattr(reply: ReplyXattr) {
    reply.error(EOPNOTSUPP);
}

pub fn setxattr(reply: ReplyEmpty) {
    reply.error(EOPNOTSUPP);
}

pub fn listxattr(reply: ReplyXattr) {
    reply.error(EOPNOTSUPP);
}

pub fn removexattr(reply: ReplyEmpty) {
    reply.error(EOPNOTSUPP);
}

pub fn link(reply: ReplyEntry) {
    reply.error(EOPNOTSUPP);
}
