// SPDX-License-Identifier: GPL-3.0-only

//! Scan configuration
//!
//! Every field has a default matching a stock Linux host, so an empty TOML
//! file (or no file at all) yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Devices below this size cannot back a storage daemon (10 GiB)
pub const DEFAULT_MIN_SIZE_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Device paths handed to one signature probe invocation
pub const DEFAULT_SIGNATURE_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub sys_block_dir: PathBuf,
    pub dev_dir: PathBuf,
    pub disk_by_id_dir: PathBuf,
    pub mapper_dir: PathBuf,
    pub pv_link_prefix: String,
    pub dm_name_link_prefix: String,
    pub mpath_link_prefix: String,
    /// Node name prefixes never considered candidates
    pub excluded_prefixes: Vec<String>,
    pub min_size_bytes: u64,
    pub signature_batch_size: usize,
    /// LV tag namespace owned by the storage daemon (tags look like `ceph.osd_id=0`)
    pub tag_namespace: String,
    pub lvs_command: String,
    pub wipefs_command: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sys_block_dir: PathBuf::from("/sys/block"),
            dev_dir: PathBuf::from("/dev"),
            disk_by_id_dir: PathBuf::from("/dev/disk/by-id"),
            mapper_dir: PathBuf::from("/dev/mapper"),
            pv_link_prefix: "lvm-pv-uuid-".to_string(),
            dm_name_link_prefix: "dm-name-".to_string(),
            mpath_link_prefix: "mpath".to_string(),
            excluded_prefixes: ["dm-", "loop", "md", "nbd", "ram", "sr", "zram"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_size_bytes: DEFAULT_MIN_SIZE_BYTES,
            signature_batch_size: DEFAULT_SIGNATURE_BATCH_SIZE,
            tag_namespace: "ceph".to_string(),
            lvs_command: "lvs".to_string(),
            wipefs_command: "wipefs".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|error| ScanError::Config {
            path: Some(path.to_path_buf()),
            reason: error.to_string(),
        })?;

        let config: ScanConfig = toml::from_str(&raw).map_err(|error| ScanError::Config {
            path: Some(path.to_path_buf()),
            reason: error.to_string(),
        })?;

        config.validate().map_err(|error| match error {
            ScanError::Config { reason, .. } => ScanError::Config {
                path: Some(path.to_path_buf()),
                reason,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signature_batch_size == 0 {
            return Err(ScanError::Config {
                path: None,
                reason: "signature_batch_size must be at least 1".to_string(),
            });
        }

        if self.tag_namespace.is_empty() {
            return Err(ScanError::Config {
                path: None,
                reason: "tag_namespace must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn is_excluded(&self, dev_node: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| dev_node.starts_with(prefix.as_str()))
    }

    /// `/dev` as a string, the prefix every raw device path is built from
    pub fn dev_dir_str(&self) -> String {
        self.dev_dir.to_string_lossy().into_owned()
    }
}
