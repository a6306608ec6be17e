// SPDX-License-Identifier: GPL-3.0-only

//! Report rendering

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use quickscan_types::{DeviceFilter, DeviceRecord};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    analysed: bool,
    devices: &'a [&'a DeviceRecord],
}

/// Records accepted by `filter`, in registry order
pub fn select<'a>(devices: &'a [DeviceRecord], filter: &DeviceFilter) -> Vec<&'a DeviceRecord> {
    devices.iter().filter(|device| filter.matches(*device)).collect()
}

pub fn render(
    format: ReportFormat,
    devices: &[&DeviceRecord],
    analysed: bool,
    generated_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    match format {
        ReportFormat::Json => as_json(devices, analysed, generated_at),
        ReportFormat::Text => Ok(as_text(devices)),
    }
}

fn as_json(
    devices: &[&DeviceRecord],
    analysed: bool,
    generated_at: DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        generated_at,
        analysed,
        devices,
    })
}

fn row(dev: &str, size: &str, rotates: &str, available: &str, model: &str, nodes: &str, reject: &str) -> String {
    format!("{dev:<25} {size:>10}  {rotates:<7}  {available:<9}  {model:<25} {nodes:<16} {reject}")
        .trim_end()
        .to_string()
}

fn as_text(devices: &[&DeviceRecord]) -> String {
    let mut sorted = devices.to_vec();
    sorted.sort_by(|a, b| a.path().cmp(b.path()));

    let mut lines = vec![row(
        "Device Path",
        "Size",
        "Rotates",
        "Available",
        "Model name",
        "Device Nodes",
        "Reject Reasons",
    )];

    for device in sorted {
        lines.push(row(
            device.path(),
            device.sys_api.text("human_readable_size"),
            if device.sys_api.is_rotational() { "True" } else { "False" },
            if device.available() { "True" } else { "False" },
            device.sys_api.text("model"),
            &device.device_nodes().join(","),
            &device.reject_reasons().join(","),
        ));
    }

    lines.join("\n")
}
