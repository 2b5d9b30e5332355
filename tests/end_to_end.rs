//! End-to-end scenarios (§8), driven against the dispatcher's reply-free core
//! the same way as `dispatcher_properties.rs`.

mod common;

use bytes::Bytes;
use tempfile::tempdir;

use common::{build_fs, GID, UID};
use s3fs_rs::cache_store::CacheStore;
use s3fs_rs::envelope::Envelope;
use s3fs_rs::error::FsError;
use s3fs_rs::fs::{ino_for_key, ops, ROOT_INO};
use s3fs_rs::s3_client::ObjectStore;
use s3fs_rs::uploader;

#[test]
fn scenario_create_write_read() {
    let dir = tempdir().unwrap();
    let (mut fs, _fake) = build_fs(dir.path(), "bucket");

    let (ino, _) = ops::mknod(&mut fs, ROOT_INO, "a.txt", 0o644, UID, GID).unwrap();
    let written = ops::write(&mut fs, ino, 0, b"hello").unwrap();
    assert_eq!(written, 5);

    let data = ops::read(&mut fs, ino, 0, 5).unwrap();
    assert_eq!(data, b"hello");

    let attr = ops::getattr(&mut fs, ino, UID, GID).unwrap();
    assert_eq!(attr.size, 5);
}

#[test]
fn scenario_directory_listing() {
    let dir = tempdir().unwrap();
    let (mut fs, _fake) = build_fs(dir.path(), "bucket");

    let (d_ino, _) = ops::mkdir(&mut fs, ROOT_INO, "d", 0o755, UID, GID).unwrap();
    ops::mknod(&mut fs, d_ino, "x", 0o644, UID, GID).unwrap();

    let entries = ops::readdir(&mut fs, d_ino).unwrap();
    let names: Vec<&str> = entries.iter().map(|(_, _, name)| name.as_str()).collect();
    assert_eq!(names.iter().filter(|n| **n == "x").count(), 1);
}

#[test]
fn scenario_persistence_via_uploader() {
    let dir = tempdir().unwrap();
    let (mut fs, fake) = build_fs(dir.path(), "bucket");
    let cache = CacheStore::new(dir.path(), "bucket").unwrap();

    let (ino, _) = ops::mknod(&mut fs, ROOT_INO, "a.txt", 0o644, UID, GID).unwrap();
    ops::write(&mut fs, ino, 0, b"hello").unwrap();
    ops::release(&mut fs, ino).unwrap();
    assert!(cache.read_meta("a.txt").unwrap().is_some());

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(uploader::scan_once(dir.path(), "bucket", fake.as_ref())).unwrap();

    assert!(cache.read_meta("a.txt").unwrap().is_none());
    assert!(!cache.exists("a.txt"));

    let (env, body) = rt.block_on(fake.get("a.txt", s3fs_rs::envelope::Kind::File)).unwrap();
    assert_eq!(env.size, 5);
    assert_eq!(&body[..], b"hello");
}

#[test]
fn scenario_range_read_of_a_large_remote_object() {
    let dir = tempdir().unwrap();
    let (mut fs, fake) = build_fs(dir.path(), "bucket");

    let size: usize = 1024 * 1024;
    let big: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    fake.seed("big.bin", Envelope::new_file(), Bytes::from(big.clone()));

    let (ino, _) = ops::lookup(&mut fs, ROOT_INO, "big.bin", UID, GID).unwrap();
    let data = ops::read(&mut fs, ino, 524_288, 4096).unwrap();
    assert_eq!(data, &big[524_288..524_288 + 4096]);
}

#[test]
fn scenario_rename_across_existence() {
    let dir = tempdir().unwrap();
    let (mut fs, fake) = build_fs(dir.path(), "bucket");

    let (ino, _) = ops::mknod(&mut fs, ROOT_INO, "x", 0o644, UID, GID).unwrap();
    ops::write(&mut fs, ino, 0, b"1").unwrap();
    ops::release(&mut fs, ino).unwrap();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(uploader::scan_once(dir.path(), "bucket", fake.as_ref())).unwrap();

    ops::rename(&mut fs, ROOT_INO, "x", ROOT_INO, "y").unwrap();

    assert!(matches!(ops::getattr(&mut fs, ino, UID, GID), Err(FsError::NotFound)));

    let (new_ino, _) = ops::lookup(&mut fs, ROOT_INO, "y", UID, GID).unwrap();
    let data = ops::read(&mut fs, new_ino, 0, 1).unwrap();
    assert_eq!(data, b"1");
}

#[test]
fn scenario_missing_remote_object_surfaces_as_not_found() {
    let dir = tempdir().unwrap();
    let (mut fs, _fake) = build_fs(dir.path(), "bucket");

    assert!(matches!(
        ops::lookup(&mut fs, ROOT_INO, "ghost.txt", UID, GID),
        Err(FsError::NotFound)
    ));

    let ino = ino_for_key("ghost.txt");
    assert!(matches!(ops::read(&mut fs, ino, 0, 1), Err(FsError::NotFound)));
}
