// SPDX-License-Identifier: GPL-3.0-only

//! Lookup tables correlating kernel nodes with LVM and multipath state
//!
//! Built once per run and read-only afterwards. Every source degrades to an
//! empty table on failure; nothing here aborts a scan.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::command::{CommandRunner, render};
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};

/// Stand-in for an escaped dash while splitting device-mapper names
const ESCAPED_DASH: &str = "/";

/// One row of `lvs` output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LvMetadata {
    pub vg_name: String,
    pub lv_name: String,
    #[serde(default)]
    pub lv_tags: String,
}

#[derive(Debug, Deserialize)]
struct LvsReport {
    report: Vec<LvsReportEntry>,
}

#[derive(Debug, Deserialize)]
struct LvsReportEntry {
    lv: Vec<LvMetadata>,
}

/// `{vg_name, lv_name}` decoded from a `dm-name-*` link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmLvName {
    pub vg_name: String,
    pub lv_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct CorrelationMaps {
    lv_metadata: HashMap<String, LvMetadata>,
    pv_devices: BTreeSet<String>,
    mpath_devices: BTreeMap<String, String>,
    dm_names: BTreeMap<String, DmLvName>,
}

impl CorrelationMaps {
    /// Gather all tables from the host
    pub async fn build(config: &ScanConfig, runner: &dyn CommandRunner) -> Self {
        let lv_metadata = build_lv_metadata(config, runner).await;

        let pv_devices = resolve_links(&config.disk_by_id_dir, &config.pv_link_prefix)
            .into_iter()
            .map(|(_link, target)| target)
            .collect();

        let mpath_devices = resolve_links(&config.mapper_dir, &config.mpath_link_prefix)
            .into_iter()
            .map(|(link, target)| (target, link.to_string_lossy().into_owned()))
            .collect();

        let dm_names = build_dm_names(&config.disk_by_id_dir, &config.dm_name_link_prefix);

        Self::from_parts(lv_metadata, pv_devices, mpath_devices, dm_names)
    }

    pub fn from_parts(
        lv_metadata: HashMap<String, LvMetadata>,
        pv_devices: BTreeSet<String>,
        mpath_devices: BTreeMap<String, String>,
        dm_names: BTreeMap<String, DmLvName>,
    ) -> Self {
        Self {
            lv_metadata,
            pv_devices,
            mpath_devices,
            dm_names,
        }
    }

    /// LVM metadata keyed `vg_name-lv_name`
    pub fn lv_metadata(&self, key: &str) -> Option<&LvMetadata> {
        self.lv_metadata.get(key)
    }

    /// True when `dev_node` is registered as an LVM physical volume
    pub fn is_pv(&self, dev_node: &str) -> bool {
        self.pv_devices.contains(dev_node)
    }

    /// Multipath alias path for a device-mapper node (e.g. `dm-3` → `/dev/mapper/mpatha`)
    pub fn mpath_alias(&self, dm_node: &str) -> Option<&str> {
        self.mpath_devices.get(dm_node).map(String::as_str)
    }

    /// LV a device-mapper node represents
    pub fn dm_lv(&self, dm_node: &str) -> Option<&DmLvName> {
        self.dm_names.get(dm_node)
    }
}

async fn build_lv_metadata(config: &ScanConfig, runner: &dyn CommandRunner) -> HashMap<String, LvMetadata> {
    let started = Instant::now();
    let args: Vec<String> = ["-a", "-o", "vg_name,lv_name,lv_tags", "--reportformat=json"]
        .into_iter()
        .map(String::from)
        .collect();

    let rows = match fetch_lv_rows(&config.lvs_command, &args, runner).await {
        Ok(rows) => rows,
        Err(error) => {
            warn!("LVM metadata unavailable: {error}");
            Vec::new()
        }
    };

    debug!(
        "build_lv_metadata complete. Runtime {:.6} secs",
        started.elapsed().as_secs_f64()
    );

    rows.into_iter()
        .map(|row| (format!("{}-{}", row.vg_name, row.lv_name), row))
        .collect()
}

async fn fetch_lv_rows(
    command: &str,
    args: &[String],
    runner: &dyn CommandRunner,
) -> Result<Vec<LvMetadata>> {
    let output = runner.run(command, args).await?;
    if !output.success() {
        return Err(ScanError::ExternalTool {
            command: render(command, args),
            code: output.exit_code,
            stderr: output.stderr_lossy(),
        });
    }

    let rows = parse_lvs_report(&output.stdout)?;
    info!("lvm call returned entries for {} objects", rows.len());
    Ok(rows)
}

/// Parse `lvs --reportformat=json` output (`report[0].lv`)
pub fn parse_lvs_report(stdout: &[u8]) -> Result<Vec<LvMetadata>> {
    let report: LvsReport = serde_json::from_slice(stdout).map_err(|error| ScanError::Parse {
        source_name: "lvs".to_string(),
        reason: error.to_string(),
    })?;

    report
        .report
        .into_iter()
        .next()
        .map(|entry| entry.lv)
        .ok_or_else(|| ScanError::Parse {
            source_name: "lvs".to_string(),
            reason: "report section is empty".to_string(),
        })
}

/// Links in `dir` whose name starts with `prefix`, paired with the basename of
/// their final target
pub fn resolve_links(dir: &Path, prefix: &str) -> Vec<(PathBuf, String)> {
    let Ok(entries) = fs::read_dir(dir) else {
        debug!("link directory {} not readable", dir.display());
        return Vec::new();
    };

    let mut links: Vec<(PathBuf, String)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|entry| {
            let link = entry.path();
            let target = fs::canonicalize(&link).or_else(|_| fs::read_link(&link)).ok()?;
            let name = target.file_name()?.to_string_lossy().into_owned();
            Some((link, name))
        })
        .collect();

    links.sort();
    links
}

fn build_dm_names(dir: &Path, prefix: &str) -> BTreeMap<String, DmLvName> {
    let mut map = BTreeMap::new();

    for (link, target) in resolve_links(dir, prefix) {
        let link_name = link
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match decode_dm_name(&link_name) {
            Some(name) => {
                map.insert(target, name);
            }
            None => debug!("skipping linkname {}. Not an LV link", link.display()),
        }
    }

    map
}

/// Decode `dm-name-<vg>-<lv>` where literal dashes are doubled.
///
/// Returns `None` for names that do not split into exactly four components
/// (e.g. multipath maps such as `dm-name-mpatha`).
pub fn decode_dm_name(link_name: &str) -> Option<DmLvName> {
    let escaped = link_name.replace("--", ESCAPED_DASH);
    let components: Vec<&str> = escaped.split('-').collect();
    if components.len() != 4 {
        return None;
    }

    Some(DmLvName {
        vg_name: components[2].replace(ESCAPED_DASH, "-"),
        lv_name: components[3].replace(ESCAPED_DASH, "-"),
    })
}
