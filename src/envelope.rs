//! Attribute envelope: the mode/time/size/acl bundle carried alongside every
//! object as S3 user metadata (§3).
//!
//! The envelope round-trips three ways: as `x-amz-meta-s3fs-*` headers on the
//! object itself, as a TOML blob in a cache-store sidecar file, and as a
//! `fuser::FileAttr` synthesised for the kernel.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Headers are namespaced under this prefix; `aws-sdk-s3` already strips the
/// outer `x-amz-meta-` wrapper, so this is the only prefix callers see.
pub const META_PREFIX: &str = "s3fs-";

pub const DEFAULT_FILE_MODE: u32 = (libc::S_IFREG | 0o644) as u32;
pub const DEFAULT_DIR_MODE: u32 = (libc::S_IFDIR | 0o755) as u32;
pub const DEFAULT_SYMLINK_MODE: u32 = (libc::S_IFLNK | 0o777) as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    File,
    Directory,
    Symlink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub mode: u32,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    pub size: u64,
    pub acl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_source: Option<String>,
    /// Only meaningful inside a sidecar: the key the uploader should PUT to.
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl Envelope {
    pub fn new_file() -> Self {
        let now = now_secs();
        Envelope {
            mode: DEFAULT_FILE_MODE,
            atime: now,
            mtime: now,
            ctime: now,
            size: 0,
            acl: "private".to_string(),
            copy_source: None,
            target_key: None,
        }
    }

    pub fn new_dir() -> Self {
        let now = now_secs();
        Envelope {
            mode: DEFAULT_DIR_MODE,
            atime: now,
            mtime: now,
            ctime: now,
            size: 4,
            acl: "private".to_string(),
            copy_source: None,
            target_key: None,
        }
    }

    pub fn new_symlink() -> Self {
        let now = now_secs();
        Envelope {
            mode: DEFAULT_SYMLINK_MODE,
            atime: now,
            mtime: now,
            ctime: now,
            size: 0,
            acl: "private".to_string(),
            copy_source: None,
            target_key: None,
        }
    }

    pub fn root() -> Self {
        let now = now_secs();
        Envelope {
            mode: DEFAULT_DIR_MODE,
            atime: now,
            mtime: now,
            ctime: now,
            size: 4,
            acl: "private".to_string(),
            copy_source: None,
            target_key: None,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.mode & libc::S_IFMT as u32 {
            m if m == libc::S_IFDIR as u32 => Kind::Directory,
            m if m == libc::S_IFLNK as u32 => Kind::Symlink,
            _ => Kind::File,
        }
    }

    pub fn touch_mtime(&mut self) {
        let now = now_secs();
        self.mtime = now;
        self.ctime = now;
    }

    /// Builds the `x-amz-meta-s3fs-*` header map for a PUT (§3, §6).
    pub fn to_headers(&self) -> HashMap<String, String> {
        let mut h = HashMap::new();
        h.insert(format!("{META_PREFIX}mode"), self.mode.to_string());
        h.insert(format!("{META_PREFIX}atime"), self.atime.to_string());
        h.insert(format!("{META_PREFIX}mtime"), self.mtime.to_string());
        h.insert(format!("{META_PREFIX}ctime"), self.ctime.to_string());
        h.insert(format!("{META_PREFIX}size"), self.size.to_string());
        h.insert(format!("{META_PREFIX}acl"), self.acl.clone());
        h
    }

    /// Reconstructs an envelope from lower-cased response headers, filling in
    /// defaults for anything missing (§3: "On read-back, missing fields use
    /// the defaults above").
    pub fn from_headers(headers: &HashMap<String, String>, default_kind: Kind, content_length: u64) -> Self {
        let now = now_secs();
        let default_mode = match default_kind {
            Kind::File => DEFAULT_FILE_MODE,
            Kind::Directory => DEFAULT_DIR_MODE,
            Kind::Symlink => DEFAULT_SYMLINK_MODE,
        };
        let get = |name: &str| headers.get(&format!("{META_PREFIX}{name}")).cloned();

        let mode = get("mode").and_then(|v| v.parse().ok()).unwrap_or(default_mode);
        let atime = get("atime").and_then(|v| v.parse().ok()).unwrap_or(now);
        let mtime = get("mtime").and_then(|v| v.parse().ok()).unwrap_or(now);
        let ctime = get("ctime").and_then(|v| v.parse().ok()).unwrap_or(now);
        let size = get("size")
            .and_then(|v| v.parse().ok())
            .unwrap_or(if default_kind == Kind::Directory { 4 } else { content_length });
        let acl = get("acl").unwrap_or_else(|| "private".to_string());

        Envelope {
            mode,
            atime,
            mtime,
            ctime,
            size,
            acl,
            copy_source: None,
            target_key: None,
        }
    }

    pub fn to_sidecar_text(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn from_sidecar_text(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_envelope_is_regular_zero_size() {
        let env = Envelope::new_file();
        assert_eq!(env.kind(), Kind::File);
        assert_eq!(env.size, 0);
    }

    #[test]
    fn headers_round_trip_through_from_headers() {
        let env = Envelope::new_file();
        let headers = env.to_headers();
        let restored = Envelope::from_headers(&headers, Kind::File, 0);
        assert_eq!(restored.mode, env.mode);
        assert_eq!(restored.size, env.size);
        assert_eq!(restored.acl, env.acl);
    }

    #[test]
    fn missing_headers_fall_back_to_defaults() {
        let headers = HashMap::new();
        let restored = Envelope::from_headers(&headers, Kind::Directory, 0);
        assert_eq!(restored.mode, DEFAULT_DIR_MODE);
        assert_eq!(restored.size, 4);
    }

    #[test]
    fn sidecar_round_trips_including_fn() {
        let mut env = Envelope::new_file();
        env.target_key = Some("dir/file.txt".to_string());
        let text = env.to_sidecar_text().unwrap();
        let restored = Envelope::from_sidecar_text(&text).unwrap();
        assert_eq!(restored.target_key.as_deref(), Some("dir/file.txt"));
    }
}
