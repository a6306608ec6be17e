// SPDX-License-Identifier: GPL-3.0-only

//! Device registry
//!
//! Enumerates candidates once, keeps one record per physical identity and
//! drives the eligibility checks across the canonical set.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use quickscan_types::{DeviceIdentity, DeviceRecord};
use tracing::{debug, info};

use crate::checks::{self, LocalChecks};
use crate::command::CommandRunner;
use crate::config::ScanConfig;
use crate::correlation::CorrelationMaps;
use crate::lock::LockProbe;
use crate::record::RecordBuilder;
use crate::signatures;
use crate::sysfs::SysBlock;

#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    maps: CorrelationMaps,
    devices: Vec<DeviceRecord>,
    analysed: bool,
}

impl DeviceRegistry {
    /// Discover and classify every candidate device on the host.
    ///
    /// With `skip_analysis` the records are built and deduplicated but no
    /// check runs, so every record reports itself available.
    ///
    /// Progress is logged through whatever global `tracing` subscriber the caller installed.
    pub async fn build(
        config: &ScanConfig,
        runner: Arc<dyn CommandRunner>,
        lock: &dyn LockProbe,
        skip_analysis: bool,
    ) -> Self {
        let sys = SysBlock::new(&config.sys_block_dir);
        let maps = CorrelationMaps::build(config, runner.as_ref()).await;

        let candidates = sys.candidates(|name| config.is_excluded(name));
        let mut devices = build_devices(&sys, &maps, config, lock, &candidates, skip_analysis);

        if !skip_analysis {
            analyse(&mut devices, config, runner).await;
        }

        Self {
            maps,
            devices,
            analysed: !skip_analysis,
        }
    }

    /// Canonical records in enumeration order
    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    /// False when the registry was built with analysis skipped
    pub fn analysed(&self) -> bool {
        self.analysed
    }

    /// Correlation tables the records were built from
    pub fn correlation(&self) -> &CorrelationMaps {
        &self.maps
    }
}

fn build_devices(
    sys: &SysBlock,
    maps: &CorrelationMaps,
    config: &ScanConfig,
    lock: &dyn LockProbe,
    candidates: &[String],
    skip_analysis: bool,
) -> Vec<DeviceRecord> {
    let started = Instant::now();
    let builder = RecordBuilder::new(sys, maps, config);
    let checks = LocalChecks::new(sys, maps, config, lock);

    let mut devices: Vec<DeviceRecord> = Vec::new();
    let mut by_identity: HashMap<DeviceIdentity, usize> = HashMap::new();

    for dev_node in candidates {
        let mut record = builder.build(dev_node);
        let identity = record.identity();

        if let Some(&index) = by_identity.get(&identity) {
            let existing = &mut devices[index];
            existing.alt_path = Some(record.dev_path.clone());
            info!(
                "skipping {dev_node} as a duplicate of {}",
                existing.dev_path
            );
            continue;
        }

        if !skip_analysis {
            checks.run(&mut record);
        }
        by_identity.insert(identity, devices.len());
        devices.push(record);
    }

    debug!(
        "build_devices complete. Runtime {:.6} secs",
        started.elapsed().as_secs_f64()
    );
    devices
}

async fn analyse(devices: &mut [DeviceRecord], config: &ScanConfig, runner: Arc<dyn CommandRunner>) {
    let started = Instant::now();

    let paths = checks::available_paths(devices);
    let found = signatures::scan(
        runner,
        &config.wipefs_command,
        &paths,
        config.signature_batch_size,
    )
    .await;
    checks::apply_signatures(devices, &found);
    checks::check_multipath_complete(devices);

    info!("finished");
    debug!(
        "analyse complete. Runtime {:.6} secs",
        started.elapsed().as_secs_f64()
    );
}
