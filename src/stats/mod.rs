//! Host health snapshots
//!
//! Composes the command runner and the latency probe into one structured
//! [`HostSnapshot`]. The behavioral contract callers rely on: any individual
//! sub-probe failure degrades that one field to its documented default; only
//! total unreachability marks the host offline. Latency and SSH status are
//! orthogonal facts — one failing never suppresses the other.

pub mod latency;
mod parser;

pub use latency::{resolve_targets, IcmpLatencyProbe, LatencyProbe, LatencyTarget};

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credential::HostCredential;
use crate::ssh::Transport;
use parser::{parse_engine_report, parse_percent, EngineReport};

/// One command line reporting engine version and container counts, then a
/// second line with host uptime. Each subshell degrades to empty on its own.
const ENGINE_PROBE_CMD: &str = "echo \"$(docker version --format '{{.Server.Version}}' 2>/dev/null)|$(docker ps -q 2>/dev/null | wc -l)|$(docker ps -aq 2>/dev/null | wc -l)\"; uptime -p 2>/dev/null || uptime";

/// Whole-host CPU usage as a single numeric line
const CPU_PROBE_CMD: &str =
    "top -bn1 | grep -i 'cpu(s)' | head -1 | awk '{print 100 - $8}'";

/// Memory usage as a single numeric line
const MEM_PROBE_CMD: &str = "free -m | awk 'NR==2 {printf \"%.2f\", $3*100/$2}'";

/// SSH reachability of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Online,
    Offline,
}

/// One complete, immutable measurement of a host's health.
///
/// Always fully populated: degraded fields carry documented defaults
/// (`"Unknown"` / `"N/A"` / zero), never absent values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    pub status: HostStatus,
    pub cpu_usage_pct: f64,
    pub ram_usage_pct: f64,
    pub docker_version: String,
    pub uptime_text: String,
    pub running_containers: u32,
    pub total_containers: u32,
    pub avg_latency_ms: u64,
    pub latency_by_target: HashMap<String, u64>,
}

/// Facts gathered over SSH once connectivity is established
struct HostFacts {
    engine: EngineReport,
    cpu_pct: f64,
    ram_pct: f64,
}

/// Probes one host and assembles a snapshot
pub struct HostStatsCollector {
    transport: Arc<dyn Transport>,
    probe: Arc<dyn LatencyProbe>,
}

impl HostStatsCollector {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            probe: Arc::new(IcmpLatencyProbe),
        }
    }

    /// Replace the latency probe. Tests use this to avoid the network.
    pub fn with_probe(transport: Arc<dyn Transport>, probe: Arc<dyn LatencyProbe>) -> Self {
        Self { transport, probe }
    }

    /// Build a fresh snapshot of one host.
    ///
    /// `targets` may be empty; the host's own address then becomes the single
    /// synthetic target, so at least one latency figure always exists.
    pub async fn collect(
        &self,
        credential: &HostCredential,
        targets: &[LatencyTarget],
    ) -> HostSnapshot {
        let targets: Vec<LatencyTarget> = if targets.is_empty() {
            vec![LatencyTarget::new(
                credential.address.clone(),
                credential.address.clone(),
            )]
        } else {
            targets.to_vec()
        };

        // Latency and SSH facts are gathered concurrently and independently
        let (latency_by_target, facts) = tokio::join!(
            self.measure_all(&targets),
            self.probe_host(credential),
        );

        let measured: Vec<u64> = latency_by_target
            .values()
            .copied()
            .filter(|&ms| ms > 0)
            .collect();
        let avg_latency_ms = if measured.is_empty() {
            0
        } else {
            measured.iter().sum::<u64>() / measured.len() as u64
        };

        match facts {
            Some(facts) => HostSnapshot {
                status: HostStatus::Online,
                cpu_usage_pct: facts.cpu_pct,
                ram_usage_pct: facts.ram_pct,
                docker_version: facts.engine.docker_version,
                uptime_text: facts.engine.uptime_text,
                running_containers: facts.engine.running_containers,
                total_containers: facts.engine.total_containers,
                avg_latency_ms,
                latency_by_target,
            },
            None => HostSnapshot {
                status: HostStatus::Offline,
                cpu_usage_pct: 0.0,
                ram_usage_pct: 0.0,
                docker_version: parser::UNKNOWN_VERSION.to_string(),
                uptime_text: parser::UNKNOWN_UPTIME.to_string(),
                running_containers: 0,
                total_containers: 0,
                avg_latency_ms,
                latency_by_target,
            },
        }
    }

    /// Probe every latency target concurrently and merge into one map.
    /// Target names are unique, so completion order cannot collide.
    async fn measure_all(&self, targets: &[LatencyTarget]) -> HashMap<String, u64> {
        let probes = targets.iter().map(|target| {
            let probe = self.probe.clone();
            async move { (target.name.clone(), probe.measure(target).await) }
        });
        join_all(probes).await.into_iter().collect()
    }

    /// Gather SSH-side facts. None means the host is unreachable outright;
    /// any individual command failure only zeroes its own field.
    async fn probe_host(&self, credential: &HostCredential) -> Option<HostFacts> {
        if let Err(e) = self.transport.check_connectivity(credential).await {
            warn!("Host {} unreachable: {}", credential.address, e);
            return None;
        }

        let engine = match self
            .transport
            .run_command(credential, ENGINE_PROBE_CMD)
            .await
        {
            Ok(output) => parse_engine_report(&output.stdout_text()),
            Err(e) => {
                debug!("Engine probe failed on {}: {}", credential.address, e);
                EngineReport::default()
            }
        };

        let cpu_pct = match self.transport.run_command(credential, CPU_PROBE_CMD).await {
            Ok(output) => parse_percent(&output.stdout_text()),
            Err(e) => {
                debug!("CPU probe failed on {}: {}", credential.address, e);
                0.0
            }
        };

        let ram_pct = match self.transport.run_command(credential, MEM_PROBE_CMD).await {
            Ok(output) => parse_percent(&output.stdout_text()),
            Err(e) => {
                debug!("Memory probe failed on {}: {}", credential.address, e);
                0.0
            }
        };

        Some(HostFacts {
            engine,
            cpu_pct,
            ram_pct,
        })
    }
}
