//! Entry point and process-role dispatch (§4.7/§10.4).
//!
//! The binary's default role is the supervisor (C8): it re-execs itself
//! twice, once per sibling process, and waits on the filesystem server.
//! Each re-exec'd process initializes its own `tracing` subscriber, since
//! each is a separate OS process and none of them share a dispatcher —
//! matching the teacher's `client`/`server` split, just generalized to two
//! roles of the same binary instead of two separate binaries.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use s3fs_rs::config::{self, Cli, Config, Role};
use s3fs_rs::s3_client::{ObjectStore, S3ObjectStore};
use s3fs_rs::{cache_store, fs, supervisor, uploader};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();
    let cfg = config::load_config(cli);
    init_logging();

    let exit_code = match cfg.role {
        Role::Supervisor => run_supervisor(&cfg),
        Role::Fs => run_fs(&cfg),
        Role::Uploader => run_uploader(&cfg),
    };
    std::process::exit(exit_code);
}

/// Re-encodes the resolved configuration as CLI flags, so a re-exec'd child
/// sees exactly what this process resolved (CLI > config file > default)
/// without re-reading `config.toml` itself.
fn to_args(cfg: &Config) -> Vec<String> {
    let mut args = vec![
        "--region".to_string(),
        cfg.region.clone(),
        "--retry-max-attempts".to_string(),
        cfg.retry_max_attempts.to_string(),
        "--request-timeout-seconds".to_string(),
        cfg.request_timeout_seconds.to_string(),
        "--uploader-scan-interval-seconds".to_string(),
        cfg.uploader_scan_interval_seconds.to_string(),
        "--kernel-attr-timeout-seconds".to_string(),
        cfg.kernel_attr_timeout_seconds.to_string(),
        "--kernel-entry-timeout-seconds".to_string(),
        cfg.kernel_entry_timeout_seconds.to_string(),
    ];
    if let Some(url) = &cfg.endpoint_url {
        args.push("--endpoint-url".to_string());
        args.push(url.clone());
    }
    args
}

fn run_supervisor(cfg: &Config) -> i32 {
    let extra_args = to_args(cfg);
    supervisor::run(&cfg.bucket, &cfg.mountpoint, &cfg.cache_dir, &extra_args)
}

fn build_store(cfg: &Config) -> Result<S3ObjectStore, i32> {
    let (access_key_id, secret_access_key) = config::load_credentials().map_err(|e| {
        tracing::error!(error = %e, "failed to load credentials");
        1
    })?;
    Ok(S3ObjectStore::new(
        cfg.bucket.clone(),
        cfg.region.clone(),
        cfg.endpoint_url.clone(),
        &access_key_id,
        &secret_access_key,
    ))
}

fn run_fs(cfg: &Config) -> i32 {
    let store = match build_store(cfg) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let cache_store = match cache_store::CacheStore::new(&cfg.cache_dir, &cfg.bucket) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize cache directory");
            return 1;
        }
    };

    let store_handle: Arc<dyn ObjectStore> = Arc::new(store);
    let state = fs::S3Fs::new(store_handle, cache_store, cfg);
    let handle = fs::FsHandle(Arc::new(Mutex::new(state)));

    let options = vec![
        fuser::MountOption::FSName(format!("s3fs:{}", cfg.bucket)),
        fuser::MountOption::DefaultPermissions,
        fuser::MountOption::AutoUnmount,
    ];

    tracing::info!(mountpoint = %cfg.mountpoint.display(), bucket = %cfg.bucket, "mounting filesystem");
    match fuser::mount2(handle, &cfg.mountpoint, &options) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "mount failed");
            1
        }
    }
}

fn run_uploader(cfg: &Config) -> i32 {
    let store = match build_store(cfg) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to build tokio runtime");
            return 1;
        }
    };

    tracing::info!(bucket = %cfg.bucket, cache_dir = %cfg.cache_dir.display(), "starting uploader");
    runtime.block_on(uploader::run(
        &cfg.cache_dir,
        &cfg.bucket,
        &store,
        Duration::from_secs(cfg.uploader_scan_interval_seconds),
    ));
    0
}
