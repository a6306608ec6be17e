//! Device record and identity models
//!
//! A [`DeviceRecord`] is the per-candidate aggregate the eligibility checks
//! work on. Its rejection reasons can only grow: a device with no reasons is
//! available, any reason makes it unavailable for good.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::attributes::SysAttributes;
use crate::lvm::LvRecord;

/// Physical identity used to recognise one disk exposed under several names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Build the identity from vendor, model and serial.
    ///
    /// Each part is trimmed, the parts are joined with `_` and remaining spaces
    /// become `_`. Missing parts read as `unknown`.
    pub fn from_attributes(attrs: &SysAttributes) -> Self {
        let vendor = attrs.text("vendor").trim();
        let model = attrs.text("model").trim();
        let serial = attrs.text("serial").trim();
        Self([vendor, model, serial].join("_").replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A candidate block device and everything learned about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Kernel node name (e.g. "sda")
    pub dev_node: String,

    /// Raw device path (e.g. "/dev/sda")
    pub dev_path: String,

    /// Second path the same physical disk was found under
    pub alt_path: Option<String>,

    /// Multipath alias path (e.g. "/dev/mapper/mpatha")
    pub mpath_device: Option<String>,

    /// Device-mapper node backing the multipath alias (e.g. "dm-3")
    pub mpath_node: Option<String>,

    /// Normalized sysfs attributes
    pub sys_api: SysAttributes,

    /// Logical volumes found through the device's holders
    pub lvs: Vec<LvRecord>,

    reject_reasons: Vec<String>,
}

impl DeviceRecord {
    pub fn new(dev_node: impl Into<String>, dev_dir: &str, sys_api: SysAttributes) -> Self {
        let dev_node = dev_node.into();
        let dev_path = format!("{}/{}", dev_dir.trim_end_matches('/'), dev_node);
        Self {
            dev_node,
            dev_path,
            alt_path: None,
            mpath_device: None,
            mpath_node: None,
            sys_api,
            lvs: Vec::new(),
            reject_reasons: Vec::new(),
        }
    }

    /// Effective path: the multipath alias when present, else the raw path
    pub fn path(&self) -> &str {
        self.mpath_device.as_deref().unwrap_or(&self.dev_path)
    }

    /// Name signature probes report this device under
    pub fn check_name(&self) -> &str {
        match &self.mpath_device {
            Some(alias) => alias.rsplit('/').next().unwrap_or(alias),
            None => &self.dev_node,
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::from_attributes(&self.sys_api)
    }

    pub fn is_multipath(&self) -> bool {
        self.mpath_device.is_some()
    }

    pub fn available(&self) -> bool {
        self.reject_reasons.is_empty()
    }

    pub fn reject_reasons(&self) -> &[String] {
        &self.reject_reasons
    }

    /// Append a rejection reason; reasons are never removed
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.reject_reasons.push(reason.into());
    }

    /// Node name of the alternate path, if any
    pub fn alt_node(&self) -> Option<&str> {
        self.alt_path
            .as_deref()
            .map(|path| path.rsplit('/').next().unwrap_or(path))
    }

    /// Nodes this disk is reachable through, primary first
    pub fn device_nodes(&self) -> Vec<&str> {
        let mut nodes = vec![self.dev_node.as_str()];
        nodes.extend(self.alt_node());
        nodes
    }
}

/// Fields a record exposes to reporting, in output order
#[derive(Serialize)]
struct DeviceReport<'a> {
    path: &'a str,
    dev_path: &'a str,
    alt_path: Option<&'a str>,
    device_id: String,
    available: bool,
    reject_reasons: &'a [String],
    mpath_device: Option<&'a str>,
    mpath_node: Option<&'a str>,
    lvs: &'a [LvRecord],
    sys_api: &'a SysAttributes,
}

impl Serialize for DeviceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DeviceReport {
            path: self.path(),
            dev_path: &self.dev_path,
            alt_path: self.alt_path.as_deref(),
            device_id: self.identity().to_string(),
            available: self.available(),
            reject_reasons: &self.reject_reasons,
            mpath_device: self.mpath_device.as_deref(),
            mpath_node: self.mpath_node.as_deref(),
            lvs: &self.lvs,
            sys_api: &self.sys_api,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(vendor: &str, model: &str, serial: &str) -> SysAttributes {
        let mut attrs = SysAttributes::new();
        attrs.insert("vendor", vendor);
        attrs.insert("model", model);
        attrs.insert("serial", serial);
        attrs
    }

    #[test]
    fn identity_normalizes_whitespace() {
        let id = DeviceIdentity::from_attributes(&attrs("ATA ", "Big Disk  ", " S123"));
        assert_eq!(id.as_str(), "ATA_Big_Disk_S123");

        let other = DeviceIdentity::from_attributes(&attrs("ATA", "Big Disk", "S123"));
        assert_eq!(id, other);
    }

    #[test]
    fn identity_without_serial_keeps_unknown() {
        let mut a = SysAttributes::new();
        a.insert("vendor", "0x1af4");
        a.insert("model", "VIRT");
        let b = a.clone();

        let a = DeviceIdentity::from_attributes(&a);
        assert_eq!(a.as_str(), "0x1af4_VIRT_unknown");
        assert_eq!(a, DeviceIdentity::from_attributes(&b));

        let blank = DeviceIdentity::from_attributes(&attrs("v", "m", "  "));
        assert_eq!(blank.as_str(), "v_m_");
    }

    #[test]
    fn path_prefers_multipath_alias() {
        let mut record = DeviceRecord::new("sda", "/dev", SysAttributes::new());
        assert_eq!(record.path(), "/dev/sda");
        assert_eq!(record.check_name(), "sda");

        record.mpath_device = Some("/dev/mapper/mpatha".to_string());
        record.mpath_node = Some("dm-3".to_string());
        assert_eq!(record.path(), "/dev/mapper/mpatha");
        assert_eq!(record.check_name(), "mpatha");
        assert!(record.is_multipath());
    }

    #[test]
    fn rejection_reasons_accumulate() {
        let mut record = DeviceRecord::new("sda", "/dev/", SysAttributes::new());
        assert_eq!(record.dev_path, "/dev/sda");
        assert!(record.available());

        record.reject("Has partitions");
        record.reject("LVM device");
        assert!(!record.available());
        assert_eq!(record.reject_reasons(), ["Has partitions", "LVM device"]);
    }

    #[test]
    fn device_nodes_include_alternate() {
        let mut record = DeviceRecord::new("sda", "/dev", SysAttributes::new());
        assert_eq!(record.device_nodes(), vec!["sda"]);

        record.alt_path = Some("/dev/sdb".to_string());
        assert_eq!(record.alt_node(), Some("sdb"));
        assert_eq!(record.device_nodes(), vec!["sda", "sdb"]);
    }

    #[test]
    fn report_view_orders_and_derives_fields() {
        let mut record = DeviceRecord::new("sda", "/dev", attrs("ACME", "DISK", "123"));
        record.reject("Locked");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["path"], "/dev/sda");
        assert_eq!(json["device_id"], "ACME_DISK_123");
        assert_eq!(json["available"], false);
        assert_eq!(json["reject_reasons"], serde_json::json!(["Locked"]));
        assert_eq!(json["alt_path"], serde_json::Value::Null);

        let text = serde_json::to_string(&record).unwrap();
        let path_at = text.find("\"path\"").unwrap();
        let sys_at = text.find("\"sys_api\"").unwrap();
        assert!(path_at < sys_at);
    }
}
