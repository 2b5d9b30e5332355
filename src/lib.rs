//! Library surface for the binary in `main.rs`, split out so integration
//! tests can drive the dispatcher (C6) against a fake `ObjectStore` without a
//! real FUSE mount (§10.6).

pub mod attr_cache;
pub mod cache_store;
pub mod config;
pub mod dir_cache;
pub mod envelope;
pub mod error;
pub mod fs;
pub mod name_mapper;
pub mod s3_client;
pub mod supervisor;
pub mod uploader;
