// SPDX-License-Identifier: GPL-3.0-only

//! Batched on-disk signature probing
//!
//! Device paths are split into fixed-size batches and every batch gets its
//! own `wipefs` invocation. All batches run concurrently and are joined
//! before any result is merged. A failed batch leaves its devices
//! unclassified; it never affects the other batches.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::command::{CommandRunner, Invocation, run_concurrent};
use crate::error::{Result, ScanError};

/// Detected signature types per device name, ordered
pub type SignatureMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Signature {
    pub device: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct WipefsReport {
    #[serde(default)]
    signatures: Vec<Signature>,
}

/// Parse `wipefs -J` output. Empty output means nothing was found.
pub fn parse_signatures(stdout: &[u8]) -> Result<Vec<Signature>> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let report: WipefsReport = serde_json::from_slice(stdout).map_err(|error| ScanError::Parse {
        source_name: "wipefs".to_string(),
        reason: error.to_string(),
    })?;
    Ok(report.signatures)
}

/// One invocation per `batch_size` paths, order preserved
pub fn batch_invocations(wipefs: &str, paths: &[String], batch_size: usize) -> Vec<Invocation> {
    paths
        .chunks(batch_size.max(1))
        .map(|batch| {
            let mut args = vec!["-J".to_string(), "--noheadings".to_string()];
            args.extend(batch.iter().cloned());
            Invocation::new(wipefs, args)
        })
        .collect()
}

/// Probe `paths` for signatures and merge the results of all batches
pub async fn scan(
    runner: Arc<dyn CommandRunner>,
    wipefs: &str,
    paths: &[String],
    batch_size: usize,
) -> SignatureMap {
    let mut merged = SignatureMap::new();
    if paths.is_empty() {
        info!("all disks are in use");
        return merged;
    }

    let started = Instant::now();
    let invocations = batch_invocations(wipefs, paths, batch_size);
    info!(
        "inspecting disk signatures for {} devices in {} batches",
        paths.len(),
        invocations.len()
    );

    let rendered: Vec<String> = invocations.iter().map(Invocation::render).collect();
    let results = run_concurrent(runner, invocations).await;

    for (command, result) in rendered.iter().zip(results) {
        let output = match result {
            Ok(output) => output,
            Err(error) => {
                error!("signature probe could not run: {error}");
                continue;
            }
        };

        if !output.success() {
            error!(
                "inspect failed RC={}: {} ({command})",
                output.exit_code,
                output.stderr_lossy()
            );
            continue;
        }

        match parse_signatures(&output.stdout) {
            Ok(signatures) if signatures.is_empty() => debug!("no signatures found by {command}"),
            Ok(signatures) => {
                for signature in signatures {
                    merged
                        .entry(signature.device)
                        .or_default()
                        .insert(signature.kind);
                }
            }
            Err(error) => error!("{error}"),
        }
    }

    if merged.is_empty() {
        info!("no signatures found");
    }

    debug!(
        "signature scan complete. Runtime {:.6} secs",
        started.elapsed().as_secs_f64()
    );
    merged
}
