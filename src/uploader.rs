//! C7: the uploader daemon (§4.6).
//!
//! A standalone scan loop, run in its own OS process (§4.7/§10.4): no
//! teacher counterpart existed (the teacher uploaded synchronously inside
//! `release`), so this is grounded on the general "scan a directory, act on
//! eligible entries, sleep, repeat" shape the wider example pool uses for
//! background daemons.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache_store::split_sidecar_name;
use crate::envelope::Envelope;
use crate::s3_client::ObjectStore;

const QUIT_SENTINEL: &str = ".quit";

/// Runs the scan loop until the `.quit` sentinel appears in `cache_dir`.
pub async fn run(cache_dir: &Path, bucket: &str, store: &dyn ObjectStore, scan_interval: Duration) {
    loop {
        let quit_path = cache_dir.join(QUIT_SENTINEL);
        if quit_path.is_file() {
            if let Err(e) = fs::remove_file(&quit_path) {
                warn!(error = %e, "failed to remove quit sentinel");
            }
            info!("uploader received quit sentinel, exiting");
            return;
        }

        if let Err(e) = scan_once(cache_dir, bucket, store).await {
            warn!(error = %e, "uploader scan failed");
        }

        tokio::time::sleep(scan_interval).await;
    }
}

/// One pass over the cache directory (§4.6 steps 2-3). Public so tests (and
/// a future "drain once" CLI mode) can drive a single cycle without the
/// sleep loop in [`run`].
pub async fn scan_once(cache_dir: &Path, bucket: &str, store: &dyn ObjectStore) -> std::io::Result<()> {
    let dir_entries = fs::read_dir(cache_dir)?;
    for dir_entry in dir_entries {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name();
        let name = name.to_string_lossy();

        let Some((entry_bucket, _slug)) = split_sidecar_name(&name) else {
            continue;
        };
        if entry_bucket != bucket {
            continue;
        }

        if let Err(e) = upload_one(cache_dir, &dir_entry.path(), store).await {
            warn!(sidecar = %name, error = %e, "skipping sidecar this cycle");
        }
    }
    Ok(())
}

async fn upload_one(cache_dir: &Path, meta_path: &Path, store: &dyn ObjectStore) -> Result<(), String> {
    let text = fs::read_to_string(meta_path).map_err(|e| e.to_string())?;
    let envelope = Envelope::from_sidecar_text(&text).map_err(|e| e.to_string())?;
    let target_key = envelope.target_key.clone().ok_or_else(|| "sidecar missing fn".to_string())?;

    let data_name = meta_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(",meta"))
        .ok_or_else(|| "sidecar name not well-formed".to_string())?;
    let data_path = cache_dir.join(data_name);
    if !data_path.is_file() {
        return Err(format!("data file missing for {target_key}"));
    }

    store
        .put_from_file(&target_key, &data_path, &envelope)
        .await
        .map_err(|e| e.to_string())?;

    let _ = fs::remove_file(meta_path);
    let _ = fs::remove_file(&data_path);
    Ok(())
}
