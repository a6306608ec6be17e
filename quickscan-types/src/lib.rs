// SPDX-License-Identifier: GPL-3.0-only

//! Canonical device models for quickscan
//!
//! This crate holds the data shared between the discovery engine and the
//! reporting layer:
//!
//! - **quickscan-sys**: builds these records from host state and runs the
//!   eligibility checks against them
//! - **quickscan-cli**: serializes them and applies [`DeviceFilter`] before
//!   printing
//!
//! Nothing in here touches the host; every type is plain data.

pub mod attributes;
pub mod common;
pub mod device;
pub mod filter;
pub mod lvm;

pub use attributes::{AttributeValue, SysAttributes, UNKNOWN};
pub use common::human_readable_size;
pub use device::{DeviceIdentity, DeviceRecord};
pub use filter::{AttributeMap, DeviceFilter, FieldValue, FilterError, FilterTarget, FilterValue, Scalar};
pub use lvm::LvRecord;
