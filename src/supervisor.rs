//! C8: the supervisor (§4.7/§10.4).
//!
//! No teacher counterpart — the teacher was a single process. Grounded on
//! `std::process::Command`-based worker supervision: `fork(2)` after a
//! multi-threaded Tokio runtime has started is unsound, so the filesystem
//! server and uploader are started as sibling processes via self re-exec
//! with a hidden role argument instead.

use std::path::Path;
use std::process::{Child, Command};

use tracing::{error, info};

/// Starts the uploader and the filesystem server as sibling processes,
/// waits for the filesystem server to exit, signals the uploader to quit via
/// the `.quit` sentinel, waits for it too, and returns the filesystem
/// server's exit code.
pub fn run(bucket: &str, mountpoint: &Path, cache_dir: &Path, extra_args: &[String]) -> i32 {
    info!(bucket, mountpoint = %mountpoint.display(), cache_dir = %cache_dir.display(), "starting supervisor");

    let exe = match std::env::current_exe() {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to resolve current executable");
            return 1;
        }
    };

    let mut uploader_child = match spawn_role(&exe, "uploader", bucket, mountpoint, cache_dir, extra_args) {
        Ok(child) => child,
        Err(e) => {
            error!(error = %e, "failed to start uploader process");
            return 1;
        }
    };

    let mut fs_child = match spawn_role(&exe, "fs", bucket, mountpoint, cache_dir, extra_args) {
        Ok(child) => child,
        Err(e) => {
            error!(error = %e, "failed to start filesystem process");
            let _ = uploader_child.kill();
            let _ = uploader_child.wait();
            return 1;
        }
    };

    let exit_code = match fs_child.wait() {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            error!(error = %e, "failed to wait on filesystem process");
            1
        }
    };

    if let Err(e) = std::fs::File::create(cache_dir.join(".quit")) {
        error!(error = %e, "failed to write quit sentinel");
    }
    if let Err(e) = uploader_child.wait() {
        error!(error = %e, "failed to wait on uploader process");
    }

    exit_code
}

fn spawn_role(
    exe: &Path,
    role: &str,
    bucket: &str,
    mountpoint: &Path,
    cache_dir: &Path,
    extra_args: &[String],
) -> std::io::Result<Child> {
    Command::new(exe)
        .arg(bucket)
        .arg(mountpoint)
        .arg(cache_dir)
        .args(extra_args)
        .arg("--role")
        .arg(role)
        .spawn()
}
