// SPDX-License-Identifier: GPL-3.0-only

//! Block-device pseudo-filesystem access
//!
//! Reads never fail the caller: a missing or unreadable attribute becomes the
//! [`UNKNOWN`] sentinel and numeric derivations fall back to 0.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use quickscan_types::{SysAttributes, UNKNOWN, human_readable_size};
use tracing::{debug, info, warn};

/// Attributes read for every candidate, relative to `/sys/block/<dev>`
pub const DEVICE_ATTRIBUTES: &[&str] = &[
    "removable",
    "size",
    "ro",
    "device/model",
    "device/vendor",
    "device/wwid",
    "device/vpd_pg80",
    "device/rev",
    "queue/nr_requests",
    "queue/rotational",
    "queue/scheduler",
    "queue/discard_granularity",
];

const LOGICAL_BLOCK_SIZE: &str = "queue/logical_block_size";

/// View of `/sys/block`
#[derive(Debug, Clone)]
pub struct SysBlock {
    root: PathBuf,
}

impl SysBlock {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn device_dir(&self, dev_node: &str) -> PathBuf {
        self.root.join(dev_node)
    }

    /// Block device names not starting with an excluded prefix, sorted
    pub fn candidates(&self, excluded: impl Fn(&str) -> bool) -> Vec<String> {
        let mut devices = match list_names(&self.root) {
            Ok(names) => names,
            Err(error) => {
                warn!("unable to list {}: {error}", self.root.display());
                return Vec::new();
            }
        };
        devices.retain(|name| !excluded(name.as_str()));
        devices.sort();

        info!("{} devices detected", devices.len());
        devices
    }

    /// Device-mapper holders built on top of `dev_node`, sorted by name
    pub fn holders(&self, dev_node: &str) -> Vec<String> {
        let mut holders = list_names(&self.device_dir(dev_node).join("holders")).unwrap_or_default();
        holders.sort();
        holders
    }

    /// True when `/sys/block/<dev>` has child partition entries (e.g. `sda1`)
    pub fn has_partitions(&self, dev_node: &str) -> bool {
        list_names(&self.device_dir(dev_node))
            .unwrap_or_default()
            .iter()
            .any(|name| name.starts_with(dev_node))
    }

    /// Read and normalize [`DEVICE_ATTRIBUTES`] for one device
    pub fn read_attributes(&self, dev_node: &str) -> SysAttributes {
        let started = Instant::now();
        info!("processing {dev_node}");

        let dir = self.device_dir(dev_node);
        let mut attrs = SysAttributes::new();

        for &attribute in DEVICE_ATTRIBUTES {
            let content = read_attribute(&dir.join(attribute));
            let key = attribute.rsplit('/').next().unwrap_or(attribute);

            match key {
                "size" => {
                    let sectors = content.parse::<u64>().unwrap_or(0);
                    let sector_size = read_attribute(&dir.join(LOGICAL_BLOCK_SIZE))
                        .parse::<u64>()
                        .unwrap_or(0);
                    let bytes = sectors.saturating_mul(sector_size);

                    attrs.insert("sectors", sectors);
                    attrs.insert("sectorsize", sector_size);
                    attrs.insert("human_readable_size", human_readable_size(bytes));
                    attrs.insert("size", bytes);
                }
                "scheduler" => attrs.insert("scheduler", active_scheduler(&content)),
                "vpd_pg80" => attrs.insert("serial", printable(&content)),
                _ => attrs.insert(key, content),
            }
        }

        debug!(
            "read_attributes({dev_node}) complete. Runtime {:.6} secs",
            started.elapsed().as_secs_f64()
        );
        attrs
    }
}

fn list_names(dir: &Path) -> std::io::Result<Vec<String>> {
    Ok(fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .collect())
}

/// Trimmed file content, [`UNKNOWN`] when the file cannot be read
pub fn read_attribute(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .replace(char::REPLACEMENT_CHARACTER, "")
            .trim()
            .to_string(),
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                debug!("error reading {}: {error}", path.display());
            }
            UNKNOWN.to_string()
        }
    }
}

/// `noop [mq-deadline] kyber` → `mq-deadline`
fn active_scheduler(raw: &str) -> String {
    raw.split(' ')
        .find(|option| option.starts_with('['))
        .map(|option| option.trim_start_matches('[').trim_end_matches(']').to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn printable(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_graphic() || matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn extracts_active_scheduler() {
        assert_eq!(active_scheduler("none [mq-deadline] kyber bfq"), "mq-deadline");
        assert_eq!(active_scheduler("[none] mq-deadline"), "none");
        assert_eq!(active_scheduler("none"), "none");
        assert_eq!(active_scheduler(UNKNOWN), UNKNOWN);
    }

    #[test]
    fn strips_non_printable_serial_bytes() {
        assert_eq!(printable("\u{0}\u{80}\u{0}\u{8}  S3Z9NB0K"), "S3Z9NB0K");
    }

    #[test]
    fn reads_and_normalizes_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "sda/size", b"41943040\n");
        write(root, "sda/queue/logical_block_size", b"512\n");
        write(root, "sda/queue/scheduler", b"none [mq-deadline] kyber\n");
        write(root, "sda/queue/rotational", b"1\n");
        write(root, "sda/device/model", b"DISK            \n");
        write(root, "sda/device/vpd_pg80", b"\x00\x80\x00\x08SER12345");

        let attrs = SysBlock::new(root).read_attributes("sda");

        assert_eq!(attrs.size_bytes(), 41943040 * 512);
        assert_eq!(attrs.integer("sectors"), 41943040);
        assert_eq!(attrs.integer("sectorsize"), 512);
        assert_eq!(attrs.text("human_readable_size"), "20.00 GB");
        assert_eq!(attrs.text("scheduler"), "mq-deadline");
        assert_eq!(attrs.text("model"), "DISK");
        assert_eq!(attrs.text("serial"), "SER12345");
        assert_eq!(attrs.text("vendor"), UNKNOWN);
        assert!(attrs.get("vpd_pg80").is_none());
        assert!(attrs.is_rotational());
    }

    #[test]
    fn unreadable_size_degrades_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sdz/size", b"garbage");

        let attrs = SysBlock::new(dir.path()).read_attributes("sdz");

        assert_eq!(attrs.size_bytes(), 0);
        assert_eq!(attrs.integer("sectors"), 0);
        assert_eq!(attrs.text("human_readable_size"), "0.00 B");
        assert_eq!(attrs.text("ro"), UNKNOWN);
    }

    #[test]
    fn lists_candidates_holders_and_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for node in ["sdb", "sda", "loop0", "dm-0", "nvme0n1"] {
            fs::create_dir_all(root.join(node)).unwrap();
        }
        fs::create_dir_all(root.join("sda/sda1")).unwrap();
        fs::create_dir_all(root.join("sdb/holders/dm-2")).unwrap();
        fs::create_dir_all(root.join("sdb/holders/dm-1")).unwrap();

        let sys = SysBlock::new(root);
        let candidates = sys.candidates(|name| name.starts_with("loop") || name.starts_with("dm-"));

        assert_eq!(candidates, vec!["nvme0n1", "sda", "sdb"]);
        assert!(sys.has_partitions("sda"));
        assert!(!sys.has_partitions("sdb"));
        assert_eq!(sys.holders("sdb"), vec!["dm-1", "dm-2"]);
        assert!(sys.holders("sda").is_empty());
    }

    #[test]
    fn missing_root_yields_no_candidates() {
        let sys = SysBlock::new("/nonexistent/quickscan/sys/block");
        assert!(sys.candidates(|_| false).is_empty());
    }
}
