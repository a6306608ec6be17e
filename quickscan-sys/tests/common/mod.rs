// SPDX-License-Identifier: GPL-3.0-only

//! Fake host for registry tests: a sysfs tree, `/dev` identity links and
//! scripted `lvs`/`wipefs`/lock behavior.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use quickscan_sys::{CommandOutput, CommandRunner, LockProbe, Result, ScanConfig};
use tempfile::TempDir;

pub struct FakeHost {
    _dir: TempDir,
    pub config: ScanConfig,
}

impl FakeHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = ScanConfig {
            sys_block_dir: root.join("sys/block"),
            dev_dir: root.join("dev"),
            disk_by_id_dir: root.join("dev/disk/by-id"),
            mapper_dir: root.join("dev/mapper"),
            ..ScanConfig::default()
        };

        for path in [
            &config.sys_block_dir,
            &config.dev_dir,
            &config.disk_by_id_dir,
            &config.mapper_dir,
        ] {
            fs::create_dir_all(path).unwrap();
        }

        Self { _dir: dir, config }
    }

    fn sys(&self, rel: &str) -> PathBuf {
        self.config.sys_block_dir.join(rel)
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.sys(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Disk of `sectors` × `sector_size` bytes with the given identity
    pub fn add_disk(&self, node: &str, sectors: u64, sector_size: u64, vendor: &str, model: &str, serial: &str) {
        self.add_disk_without_serial(node, sectors, sector_size, vendor, model);

        let mut page = vec![0u8, 0x80, 0, serial.len() as u8];
        page.extend_from_slice(serial.as_bytes());
        let path = self.sys(&format!("{node}/device/vpd_pg80"));
        fs::write(path, page).unwrap();
    }

    /// Disk whose device exposes no unit serial number page
    pub fn add_disk_without_serial(&self, node: &str, sectors: u64, sector_size: u64, vendor: &str, model: &str) {
        self.write(&format!("{node}/size"), &format!("{sectors}\n"));
        self.write(&format!("{node}/queue/logical_block_size"), &format!("{sector_size}\n"));
        self.write(&format!("{node}/queue/rotational"), "0\n");
        self.write(&format!("{node}/queue/scheduler"), "[none] mq-deadline\n");
        self.write(&format!("{node}/device/vendor"), &format!("{vendor}\n"));
        self.write(&format!("{node}/device/model"), &format!("{model}\n"));

        self.add_dev_node(node);
    }

    /// 20 GiB disk with a unique serial
    pub fn add_large_disk(&self, node: &str) {
        self.add_disk(node, 41_943_040, 512, "ACME", "DISK", &format!("SN-{node}"));
    }

    pub fn add_dev_node(&self, node: &str) {
        fs::write(self.config.dev_dir.join(node), b"").unwrap();
    }

    pub fn add_partition(&self, node: &str, partition: &str) {
        fs::create_dir_all(self.sys(&format!("{node}/{partition}"))).unwrap();
    }

    pub fn add_holder(&self, node: &str, holder: &str) {
        fs::create_dir_all(self.sys(&format!("{node}/holders/{holder}"))).unwrap();
        self.add_dev_node(holder);
    }

    /// Virtual node that should never become a candidate
    pub fn add_virtual(&self, node: &str) {
        fs::create_dir_all(self.sys(node)).unwrap();
    }

    pub fn link_by_id(&self, name: &str, target: &str) {
        symlink(format!("../../{target}"), self.config.disk_by_id_dir.join(name)).unwrap();
    }

    pub fn link_mapper(&self, name: &str, target: &str) {
        symlink(format!("../{target}"), self.config.mapper_dir.join(name)).unwrap();
    }

    pub fn dev_path(&self, node: &str) -> String {
        self.config.dev_dir.join(node).to_string_lossy().into_owned()
    }

    pub fn mapper_path(&self, name: &str) -> String {
        self.config.mapper_dir.join(name).to_string_lossy().into_owned()
    }
}

/// Answers `lvs` with a fixed report and `wipefs` from a signature table
#[derive(Default)]
pub struct ScriptedRunner {
    pub lvs_stdout: String,
    pub lvs_exit_code: i32,
    /// Device name → signature types reported by `wipefs`
    pub signatures: BTreeMap<String, Vec<String>>,
    /// Batches containing any of these paths exit non-zero
    pub failing_paths: BTreeSet<String>,
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    pub fn with_signature(mut self, device: &str, kind: &str) -> Self {
        self.signatures
            .entry(device.to_string())
            .or_default()
            .push(kind.to_string());
        self
    }

    pub fn wipefs_batches(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(program, _)| program == "wipefs")
            .map(|(_, args)| args.iter().filter(|arg| !arg.starts_with('-')).cloned().collect())
            .collect()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(program, _)| program.clone())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        match program {
            "lvs" => Ok(CommandOutput {
                exit_code: self.lvs_exit_code,
                stdout: self.lvs_stdout.clone().into_bytes(),
                stderr: Vec::new(),
            }),
            "wipefs" => {
                let paths: Vec<&String> = args.iter().filter(|arg| !arg.starts_with('-')).collect();
                if paths.iter().any(|path| self.failing_paths.contains(*path)) {
                    return Ok(CommandOutput {
                        exit_code: 1,
                        stdout: Vec::new(),
                        stderr: b"wipefs: probing initialization failed".to_vec(),
                    });
                }

                let mut signatures = Vec::new();
                for path in paths {
                    let device = Path::new(path).file_name().unwrap().to_string_lossy().into_owned();
                    for kind in self.signatures.get(&device).into_iter().flatten() {
                        signatures.push(serde_json::json!({
                            "device": device,
                            "offset": "0x0",
                            "type": kind,
                            "uuid": null,
                            "label": null,
                        }));
                    }
                }

                let stdout = if signatures.is_empty() {
                    Vec::new()
                } else {
                    serde_json::to_vec(&serde_json::json!({ "signatures": signatures })).unwrap()
                };
                Ok(CommandOutput {
                    exit_code: 0,
                    stdout,
                    stderr: Vec::new(),
                })
            }
            other => panic!("unexpected command {other}"),
        }
    }
}

/// Reports the listed paths as locked and records every probe
#[derive(Default)]
pub struct ScriptedLock {
    pub locked: BTreeSet<String>,
    pub probed: Mutex<Vec<String>>,
}

impl ScriptedLock {
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl LockProbe for ScriptedLock {
    fn is_locked(&self, path: &Path) -> bool {
        let path = path.to_string_lossy().into_owned();
        let locked = self.locked.contains(&path);
        self.probed.lock().unwrap().push(path);
        locked
    }
}
