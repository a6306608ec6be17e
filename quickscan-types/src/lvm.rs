//! LVM logical volume linkage
//!
//! A device that carries LVs exposes one [`LvRecord`] per LV found through its
//! device-mapper holders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Logical volume built on top of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LvRecord {
    /// Volume group name
    pub vg_name: String,

    /// Logical volume name
    pub lv_name: String,

    /// LV tags; reserved-namespace tags have their prefix stripped
    #[serde(flatten)]
    pub tags: BTreeMap<String, String>,

    /// Informational note, set when no reserved-namespace tag was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(skip)]
    owned: bool,
}

impl LvRecord {
    pub fn new(vg_name: impl Into<String>, lv_name: impl Into<String>) -> Self {
        Self {
            vg_name: vg_name.into(),
            lv_name: lv_name.into(),
            tags: BTreeMap::new(),
            comment: None,
            owned: false,
        }
    }

    /// Key used by the LVM metadata map (`vg-lv`)
    pub fn metadata_key(&self) -> String {
        format!("{}-{}", self.vg_name, self.lv_name)
    }

    /// Merge an LVM tag string (`k=v,k=v`) into this record.
    ///
    /// Tags under `namespace` (e.g. `ceph.osd_id`) are stored without the
    /// namespace prefix. A tag named like one of the record's own fields
    /// (`vg_name`, `lv_name`, `comment`) overwrites that field. Returns true
    /// when at least one namespaced tag was present.
    pub fn merge_tags(&mut self, tags: &str, namespace: &str) -> bool {
        let prefix = format!("{namespace}.");
        let mut owned = false;

        for tag in tags.split(',').filter(|tag| !tag.is_empty()) {
            let (key, value) = tag.split_once('=').unwrap_or((tag, ""));
            let key = match key.strip_prefix(&prefix) {
                Some(stripped) => {
                    owned = true;
                    stripped
                }
                None => key,
            };
            match key {
                "vg_name" => self.vg_name = value.to_string(),
                "lv_name" => self.lv_name = value.to_string(),
                "comment" => self.comment = Some(value.to_string()),
                _ => {
                    self.tags.insert(key.to_string(), value.to_string());
                }
            }
        }

        owned
    }

    /// Merge tags and attach the "not used by" comment when none belong to `namespace`
    pub fn apply_tags(&mut self, tags: &str, namespace: &str) {
        self.owned = self.merge_tags(tags, namespace);
        if !self.owned {
            self.comment = Some(format!("not used by {namespace}"));
        }
    }

    /// True when a tag under the namespace was applied
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}
