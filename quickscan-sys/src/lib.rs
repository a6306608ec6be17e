// SPDX-License-Identifier: GPL-3.0-only

//! Block device discovery and eligibility classification
//!
//! This crate reads host state and decides which raw block devices are free
//! to be claimed as storage backends:
//! - Attribute reading from `/sys/block`
//! - LVM and multipath correlation through `lvs` and `/dev` identity links
//! - Local eligibility checks and an exclusive-open lock probe
//! - Batched, concurrent `wipefs` signature probing
//!
//! Nothing here modifies a device. Most operations require root.

pub mod checks;
pub mod command;
pub mod config;
pub mod correlation;
pub mod error;
pub mod lock;
pub mod preflight;
pub mod record;
pub mod registry;
pub mod signatures;
pub mod sysfs;

pub use command::{CommandOutput, CommandRunner, Invocation, SystemCommandRunner, run_concurrent};
pub use config::ScanConfig;
pub use correlation::CorrelationMaps;
pub use error::{Result, ScanError};
pub use lock::{ExclusiveOpenProbe, LockProbe};
pub use preflight::Preflight;
pub use registry::DeviceRegistry;
pub use signatures::SignatureMap;
pub use sysfs::SysBlock;
