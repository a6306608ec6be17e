// SPDX-License-Identifier: GPL-3.0-only

//! Eligibility checks
//!
//! Local checks run per record in a fixed order: size, partitions, LVM
//! membership, lock. The signature and multipath-completeness checks need the
//! whole canonical set and run afterwards. Checks only ever append reasons.

use std::path::Path;

use quickscan_types::{DeviceRecord, human_readable_size};
use tracing::info;

use crate::config::ScanConfig;
use crate::correlation::CorrelationMaps;
use crate::lock::LockProbe;
use crate::signatures::SignatureMap;
use crate::sysfs::SysBlock;

pub const REASON_PARTITIONS: &str = "Has partitions";
pub const REASON_LVM: &str = "LVM device";
pub const REASON_LOCKED: &str = "Locked";
pub const REASON_MULTIPATH_MISSING: &str = "multipath configuration missing";

pub fn too_small_reason(min_size_bytes: u64) -> String {
    format!("Device too small (< {})", human_readable_size(min_size_bytes))
}

pub struct LocalChecks<'a> {
    sys: &'a SysBlock,
    maps: &'a CorrelationMaps,
    config: &'a ScanConfig,
    lock: &'a dyn LockProbe,
}

impl<'a> LocalChecks<'a> {
    pub fn new(
        sys: &'a SysBlock,
        maps: &'a CorrelationMaps,
        config: &'a ScanConfig,
        lock: &'a dyn LockProbe,
    ) -> Self {
        Self {
            sys,
            maps,
            config,
            lock,
        }
    }

    pub fn run(&self, record: &mut DeviceRecord) {
        self.check_size(record);
        self.check_partitions(record);
        self.check_lvm(record);
        self.check_locked(record);
    }

    fn check_size(&self, record: &mut DeviceRecord) {
        if record.sys_api.size_bytes() < self.config.min_size_bytes {
            record.reject(too_small_reason(self.config.min_size_bytes));
        }
    }

    fn check_partitions(&self, record: &mut DeviceRecord) {
        if self.sys.has_partitions(&record.dev_node) {
            record.reject(REASON_PARTITIONS);
        }
    }

    fn check_lvm(&self, record: &mut DeviceRecord) {
        let is_pv = self.maps.is_pv(&record.dev_node)
            || record.mpath_node.as_deref().is_some_and(|node| self.maps.is_pv(node));
        if is_pv {
            record.reject(REASON_LVM);
        }
    }

    fn check_locked(&self, record: &mut DeviceRecord) {
        if !record.available() {
            info!(
                "skipping \"lock\" check, since {} has already been rejected",
                record.dev_path
            );
        } else if record.is_multipath() {
            info!("skipping \"lock\" check for mpath enabled device {}", record.dev_path);
        } else if self.lock.is_locked(Path::new(&record.dev_path)) {
            record.reject(REASON_LOCKED);
        }
    }
}

/// Sorted effective paths of records that are still available
pub fn available_paths(records: &[DeviceRecord]) -> Vec<String> {
    let mut paths: Vec<String> = records
        .iter()
        .filter(|record| record.available())
        .map(|record| record.path().to_string())
        .collect();
    paths.sort();
    paths
}

/// Reject still-available records whose check name carries a signature
pub fn apply_signatures(records: &mut [DeviceRecord], signatures: &SignatureMap) {
    for record in records.iter_mut().filter(|record| record.available()) {
        let Some(kinds) = signatures.get(record.check_name()) else {
            continue;
        };

        info!("rejecting {}", record.check_name());
        let kinds: Vec<&str> = kinds.iter().map(String::as_str).collect();
        record.reject(format!("{} detected", kinds.join(",")));
    }
}

/// Reject disks exposed under two names without a multipath map over them
pub fn check_multipath_complete(records: &mut [DeviceRecord]) {
    for record in records.iter_mut() {
        if record.alt_path.is_some() && record.mpath_node.is_none() {
            record.reject(REASON_MULTIPATH_MISSING);
        }
    }
}
