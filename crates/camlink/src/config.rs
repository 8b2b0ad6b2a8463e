//! Runtime configuration read from the environment (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use camlink_protocol::{DEFAULT_ACK_LINGER, DEFAULT_CHUNK_SIZE, DEFAULT_POLL_INTERVAL};
use tracing::warn;

pub const DEFAULT_SPOOL_DIR: &str = "camlink-spool";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub chunk_size: usize,
    pub poll_interval: Duration,
    pub ack_linger: Duration,
    /// Root of the on-disk stand-in for screens and cameras. Each role
    /// displays into `<spool>/<role>` and scans its peer's directory.
    pub spool_dir: PathBuf,
    pub input_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ack_linger: DEFAULT_ACK_LINGER,
            spool_dir: PathBuf::from(DEFAULT_SPOOL_DIR),
            input_file: None,
            output_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to the
    /// default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let chunk_size = parse_or(&lookup, "CAMLINK_CHUNK_SIZE", defaults.chunk_size);
        let poll_ms = parse_or(
            &lookup,
            "CAMLINK_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        );
        let linger_ms = parse_or(
            &lookup,
            "CAMLINK_ACK_LINGER_MS",
            defaults.ack_linger.as_millis() as u64,
        );

        Self {
            chunk_size: if chunk_size == 0 {
                warn!("CAMLINK_CHUNK_SIZE=0, using {}", DEFAULT_CHUNK_SIZE);
                DEFAULT_CHUNK_SIZE
            } else {
                chunk_size
            },
            poll_interval: Duration::from_millis(poll_ms),
            ack_linger: Duration::from_millis(linger_ms),
            spool_dir: non_empty(&lookup, "CAMLINK_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.spool_dir),
            input_file: non_empty(&lookup, "CAMLINK_INPUT_FILE").map(PathBuf::from),
            output_dir: non_empty(&lookup, "CAMLINK_OUTPUT_DIR").map(PathBuf::from),
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match non_empty(lookup, key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{key}={raw:?} is not valid, using {default}");
            default
        }),
    }
}
