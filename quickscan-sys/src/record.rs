// SPDX-License-Identifier: GPL-3.0-only

//! Per-candidate record construction

use quickscan_types::{DeviceRecord, LvRecord};
use tracing::{debug, warn};

use crate::config::ScanConfig;
use crate::correlation::CorrelationMaps;
use crate::sysfs::SysBlock;

/// Builds [`DeviceRecord`]s from sysfs and the shared correlation tables
pub struct RecordBuilder<'a> {
    sys: &'a SysBlock,
    maps: &'a CorrelationMaps,
    config: &'a ScanConfig,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(sys: &'a SysBlock, maps: &'a CorrelationMaps, config: &'a ScanConfig) -> Self {
        Self { sys, maps, config }
    }

    pub fn build(&self, dev_node: &str) -> DeviceRecord {
        let attrs = self.sys.read_attributes(dev_node);
        let mut record = DeviceRecord::new(dev_node, &self.config.dev_dir_str(), attrs);

        let holders = self.sys.holders(dev_node);
        record.lvs = self.logical_volumes(&holders);
        self.link_multipath(&mut record, &holders);

        record
    }

    fn logical_volumes(&self, holders: &[String]) -> Vec<LvRecord> {
        holders
            .iter()
            .filter_map(|holder| self.maps.dm_lv(holder))
            .map(|name| {
                let mut lv = LvRecord::new(&name.vg_name, &name.lv_name);
                let tags = self
                    .maps
                    .lv_metadata(&lv.metadata_key())
                    .map(|meta| meta.lv_tags.as_str())
                    .unwrap_or_default();
                lv.apply_tags(tags, &self.config.tag_namespace);
                lv
            })
            .collect()
    }

    fn link_multipath(&self, record: &mut DeviceRecord, holders: &[String]) {
        let mut matches = holders
            .iter()
            .filter_map(|holder| self.maps.mpath_alias(holder).map(|alias| (holder, alias)));

        let Some((node, alias)) = matches.next() else {
            return;
        };

        let ignored: Vec<&str> = matches.map(|(holder, _)| holder.as_str()).collect();
        if !ignored.is_empty() {
            warn!(
                "{} has several multipath holders, using {node} and ignoring {}",
                record.dev_node,
                ignored.join(",")
            );
        }

        debug!("{} is a multipath member of {alias}", record.dev_node);
        record.mpath_device = Some(alias.to_string());
        record.mpath_node = Some(node.clone());
    }
}
