//! CLI surface (§6) and the optional `config.toml` overlay (§10.1).
//!
//! Precedence is CLI > config file > built-in default, the same order the
//! teacher's `load_config` applied — generalized here with `clap`'s own
//! `Option` fields standing in for the teacher's hand-rolled `Default` shim.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "s3fs-rs", about = "Mount an S3-compatible bucket as a POSIX filesystem")]
pub struct Cli {
    /// Bucket name.
    pub bucket: String,
    /// Local mount point.
    pub mountpoint: PathBuf,
    /// Local cache directory shared between the filesystem and uploader.
    pub cache_dir: PathBuf,

    /// Path to an optional config.toml overlay.
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub endpoint_url: Option<String>,
    #[arg(long)]
    pub retry_max_attempts: Option<u32>,
    #[arg(long)]
    pub request_timeout_seconds: Option<u64>,
    #[arg(long)]
    pub uploader_scan_interval_seconds: Option<u64>,
    #[arg(long)]
    pub kernel_attr_timeout_seconds: Option<u64>,
    #[arg(long)]
    pub kernel_entry_timeout_seconds: Option<u64>,

    /// Internal role selector used by the supervisor's re-exec (§10.4). Not
    /// meant to be passed by a human operator.
    #[arg(long, hide = true)]
    pub role: Option<Role>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Supervisor,
    Fs,
    Uploader,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct FileConfig {
    region: Option<String>,
    endpoint_url: Option<String>,
    retry_max_attempts: Option<u32>,
    request_timeout_seconds: Option<u64>,
    uploader_scan_interval_seconds: Option<u64>,
    kernel_attr_timeout_seconds: Option<u64>,
    kernel_entry_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub mountpoint: PathBuf,
    pub cache_dir: PathBuf,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub retry_max_attempts: u32,
    pub request_timeout_seconds: u64,
    pub uploader_scan_interval_seconds: u64,
    pub kernel_attr_timeout_seconds: u64,
    pub kernel_entry_timeout_seconds: u64,
    pub role: Role,
}

impl Config {
    fn defaults(bucket: String, mountpoint: PathBuf, cache_dir: PathBuf) -> Self {
        Config {
            bucket,
            mountpoint,
            cache_dir,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            retry_max_attempts: 3,
            request_timeout_seconds: 7,
            uploader_scan_interval_seconds: 3,
            kernel_attr_timeout_seconds: 1,
            kernel_entry_timeout_seconds: 1,
            role: Role::Supervisor,
        }
    }
}

fn load_file_config(path: &Path) -> FileConfig {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config.toml found, using defaults");
        return FileConfig::default();
    }
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse config.toml, using defaults");
                FileConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "failed to read config.toml, using defaults");
            FileConfig::default()
        }
    }
}

/// Builds the effective configuration: CLI flags override the file overlay,
/// which overrides the built-in default.
pub fn load_config(cli: Cli) -> Config {
    let file = load_file_config(&cli.config);
    let mut config = Config::defaults(cli.bucket, cli.mountpoint, cli.cache_dir);

    config.region = cli.region.or(file.region).unwrap_or(config.region);
    config.endpoint_url = cli.endpoint_url.or(file.endpoint_url);
    config.retry_max_attempts = cli.retry_max_attempts.or(file.retry_max_attempts).unwrap_or(config.retry_max_attempts);
    config.request_timeout_seconds = cli
        .request_timeout_seconds
        .or(file.request_timeout_seconds)
        .unwrap_or(config.request_timeout_seconds);
    config.uploader_scan_interval_seconds = cli
        .uploader_scan_interval_seconds
        .or(file.uploader_scan_interval_seconds)
        .unwrap_or(config.uploader_scan_interval_seconds);
    config.kernel_attr_timeout_seconds = cli
        .kernel_attr_timeout_seconds
        .or(file.kernel_attr_timeout_seconds)
        .unwrap_or(config.kernel_attr_timeout_seconds);
    config.kernel_entry_timeout_seconds = cli
        .kernel_entry_timeout_seconds
        .or(file.kernel_entry_timeout_seconds)
        .unwrap_or(config.kernel_entry_timeout_seconds);
    config.role = cli.role.unwrap_or(Role::Supervisor);

    config
}

/// Reads the two-line credential file at `$HOME/.s3fs/.secret` (§6). Missing
/// or malformed is a fatal startup error.
pub fn load_credentials() -> Result<(String, String), String> {
    let home = std::env::var("HOME").map_err(|_| "HOME is not set".to_string())?;
    let path = Path::new(&home).join(".s3fs").join(".secret");
    let content = fs::read_to_string(&path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let mut lines = content.lines();
    let access_key_id = lines.next().ok_or("credential file missing access key id line")?.trim().to_string();
    let secret_access_key = lines.next().ok_or("credential file missing secret access key line")?.trim().to_string();
    if access_key_id.is_empty() || secret_access_key.is_empty() {
        return Err("credential file has an empty key line".to_string());
    }
    Ok((access_key_id, secret_access_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_when_nothing_overrides_them() {
        let cli = Cli {
            bucket: "b".to_string(),
            mountpoint: PathBuf::from("/mnt"),
            cache_dir: PathBuf::from("/tmp/cache"),
            config: PathBuf::from("/nonexistent-config.toml"),
            region: None,
            endpoint_url: None,
            retry_max_attempts: None,
            request_timeout_seconds: None,
            uploader_scan_interval_seconds: None,
            kernel_attr_timeout_seconds: None,
            kernel_entry_timeout_seconds: None,
            role: None,
        };
        let config = load_config(cli);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.role, Role::Supervisor);
    }

    #[test]
    fn cli_flag_overrides_default() {
        let cli = Cli {
            bucket: "b".to_string(),
            mountpoint: PathBuf::from("/mnt"),
            cache_dir: PathBuf::from("/tmp/cache"),
            config: PathBuf::from("/nonexistent-config.toml"),
            region: Some("eu-west-1".to_string()),
            endpoint_url: None,
            retry_max_attempts: None,
            request_timeout_seconds: None,
            uploader_scan_interval_seconds: None,
            kernel_attr_timeout_seconds: None,
            kernel_entry_timeout_seconds: None,
            role: None,
        };
        let config = load_config(cli);
        assert_eq!(config.region, "eu-west-1");
    }
}
