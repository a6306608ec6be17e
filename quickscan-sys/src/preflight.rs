// SPDX-License-Identifier: GPL-3.0-only

//! Host preconditions checked before any discovery runs

use std::path::Path;

use tracing::debug;

use crate::config::ScanConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preflight {
    pub reasons: Vec<String>,
}

impl Preflight {
    pub fn ok(&self) -> bool {
        self.reasons.is_empty()
    }
}

pub fn check(config: &ScanConfig) -> Preflight {
    let is_root = unsafe { libc::geteuid() } == 0;
    let tools = [config.lvs_command.as_str(), config.wipefs_command.as_str()];
    evaluate(is_root, &config.disk_by_id_dir, &tools)
}

fn evaluate(is_root: bool, disk_by_id_dir: &Path, tools: &[&str]) -> Preflight {
    let mut reasons = Vec::new();

    if !is_root {
        reasons.push("must be root or run with sudo privileges".to_string());
    }

    let disk_dir = disk_by_id_dir.parent().unwrap_or(disk_by_id_dir);
    if !disk_dir.exists() {
        reasons.push(format!("{} not present - udev required", disk_dir.display()));
    }

    for tool in tools {
        match which::which(tool) {
            Ok(path) => debug!("{tool} found at {}", path.display()),
            Err(_) => reasons.push(format!("{tool} not installed")),
        }
    }

    Preflight { reasons }
}
