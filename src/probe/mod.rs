//! Reachability probes between pods
//!
//! A probe runs `ping` or `nc` in the client pod against the server pod IP
//! and classifies the result. A missing probe binary is kept apart from a
//! blocked connection so it can never pass for policy enforcement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::{debug, info};

use crate::k8s::{ExecError, ExecOutput, PodExecutor, ReadyPod};

/// Exit codes a shell uses for "cannot execute" and "command not found"
const EXIT_NOT_EXECUTABLE: i32 = 126;
const EXIT_NOT_FOUND: i32 = 127;

const TOOL_MISSING_MARKERS: [&str; 3] = [
    "executable file not found",
    "no such file or directory",
    "not found",
];

/// Probe command
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeKind {
    /// ICMP echo: `ping -c <count> <ip>`
    Icmp { count: u32 },
    /// TCP connect: `nc -z -w <timeout> <ip> <port>`
    Tcp { port: u16, timeout_secs: u32 },
}

impl Default for ProbeKind {
    fn default() -> Self {
        ProbeKind::Icmp { count: 2 }
    }
}

impl ProbeKind {
    /// Command line probing `target_ip`
    pub fn command(&self, target_ip: &str) -> Vec<String> {
        match self {
            ProbeKind::Icmp { count } => vec![
                "ping".to_string(),
                "-c".to_string(),
                count.to_string(),
                target_ip.to_string(),
            ],
            ProbeKind::Tcp { port, timeout_secs } => vec![
                "nc".to_string(),
                "-z".to_string(),
                "-w".to_string(),
                timeout_secs.to_string(),
                target_ip.to_string(),
                port.to_string(),
            ],
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Icmp { count } => write!(f, "icmp x{count}"),
            ProbeKind::Tcp { port, .. } => write!(f, "tcp/{port}"),
        }
    }
}

/// What a probe observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe command exited 0
    Reachable,
    /// The probe ran and reported the target unreachable
    Unreachable { detail: String },
    /// The probe binary does not exist in the client image
    ToolMissing { detail: String },
    /// Exec transport failed or timed out; nothing is known about the target
    Error { detail: String },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ProbeOutcome::Unreachable { .. })
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => write!(f, "reachable"),
            ProbeOutcome::Unreachable { detail } => write!(f, "unreachable ({detail})"),
            ProbeOutcome::ToolMissing { detail } => write!(f, "probe tool missing ({detail})"),
            ProbeOutcome::Error { detail } => write!(f, "probe error ({detail})"),
        }
    }
}

fn mentions_missing_tool(text: &str) -> bool {
    let text = text.to_lowercase();
    TOOL_MISSING_MARKERS.iter().any(|m| text.contains(m))
}

/// Last non-empty line of stderr, else of stdout
fn summary_line(output: &ExecOutput) -> String {
    [&output.stderr, &output.stdout]
        .iter()
        .filter_map(|s| s.lines().rev().find(|l| !l.trim().is_empty()))
        .next()
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

/// Classify the result of running a probe command
pub fn classify(result: &Result<ExecOutput, ExecError>) -> ProbeOutcome {
    let output = match result {
        Ok(output) => output,
        // Setup and timeout errors carry API text ("pods \"client\" not found"),
        // so only the command's own stderr is checked for a missing binary.
        Err(e @ ExecError::Stream { stderr, .. }) if mentions_missing_tool(stderr) => {
            return ProbeOutcome::ToolMissing {
                detail: e.to_string(),
            };
        }
        Err(e) => {
            return ProbeOutcome::Error {
                detail: e.to_string(),
            };
        }
    };

    if output.success() {
        return ProbeOutcome::Reachable;
    }

    match output.exit_code {
        Some(code @ (EXIT_NOT_EXECUTABLE | EXIT_NOT_FOUND)) => ProbeOutcome::ToolMissing {
            detail: format!("exit code {code}: {}", summary_line(output)),
        },
        Some(code) => ProbeOutcome::Unreachable {
            detail: format!("exit code {code}: {}", summary_line(output)),
        },
        None => {
            let detail = output
                .status_message
                .clone()
                .unwrap_or_else(|| summary_line(output));
            if mentions_missing_tool(&detail) || mentions_missing_tool(&output.stderr) {
                ProbeOutcome::ToolMissing { detail }
            } else {
                ProbeOutcome::Error {
                    detail: format!("no exit code reported: {detail}"),
                }
            }
        }
    }
}

/// Source of probe outcomes between two ready pods
pub trait Prober {
    fn probe(&self, client: &ReadyPod, server: &ReadyPod) -> impl Future<Output = ProbeOutcome>;
}

/// Runs the configured probe command in the client pod
pub struct ExecProber {
    executor: PodExecutor,
    kind: ProbeKind,
}

impl ExecProber {
    pub fn new(executor: PodExecutor, kind: ProbeKind) -> Self {
        Self { executor, kind }
    }
}

impl Prober for ExecProber {
    async fn probe(&self, client: &ReadyPod, server: &ReadyPod) -> ProbeOutcome {
        probe(&self.executor, &self.kind, client, server).await
    }
}

/// Probe from `client` to the IP of `server`
pub async fn probe(
    executor: &PodExecutor,
    kind: &ProbeKind,
    client: &ReadyPod,
    server: &ReadyPod,
) -> ProbeOutcome {
    let command = kind.command(server.ip());
    debug!("Probing {} -> {} with {:?}", client, server, command);

    let outcome = classify(&executor.exec(client, &command).await);
    info!("Probe {} -> {} ({}): {}", client.name(), server, kind, outcome);
    outcome
}
