// SPDX-License-Identifier: GPL-3.0-only

//! External command execution
//!
//! Commands run exactly once. A command that could not be started is an
//! error; a command that ran and exited non-zero is a successful
//! [`CommandOutput`] carrying its exit code, so callers decide how to degrade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// One program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn render(&self) -> String {
        render(&self.program, &self.args)
    }
}

pub fn render(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands on the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("running command {}", render(program, args));

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| ScanError::CommandSpawn {
                command: program.to_string(),
                reason: error.to_string(),
            })?;

        Ok(CommandOutput {
            // signal-terminated processes have no code
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Run every invocation concurrently and wait for all of them.
///
/// Results come back in invocation order. A task that panics only fails its
/// own slot.
pub async fn run_concurrent(
    runner: Arc<dyn CommandRunner>,
    invocations: Vec<Invocation>,
) -> Vec<Result<CommandOutput>> {
    let mut set = JoinSet::new();
    let mut rendered = Vec::with_capacity(invocations.len());

    for (index, invocation) in invocations.into_iter().enumerate() {
        rendered.push(invocation.render());
        let runner = Arc::clone(&runner);
        set.spawn(async move {
            let result = runner.run(&invocation.program, &invocation.args).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<CommandOutput>>> = rendered.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(join_error) => error!("command worker task failed: {join_error}"),
        }
    }

    slots
        .into_iter()
        .zip(rendered)
        .map(|(slot, command)| {
            slot.unwrap_or_else(|| {
                Err(ScanError::CommandSpawn {
                    command,
                    reason: "worker task did not complete".to_string(),
                })
            })
        })
        .collect()
}
