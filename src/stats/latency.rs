//! Reachability / latency probing
//!
//! Independent of SSH entirely: a host can answer pings while refusing SSH,
//! and the snapshot must report both facts. Primary method is a single ICMP
//! echo; sandboxed environments without raw-socket privileges fall back to
//! timing a TCP connect against common ports. No signal is not an error —
//! it is a valid measurement of 0.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::debug;

/// Echo timeout — latency probing must stay snappy even against dead hosts
const ICMP_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-port timeout for the TCP fallback
const TCP_TIMEOUT: Duration = Duration::from_secs(2);

/// Ports tried, in order, when ICMP is unavailable
const FALLBACK_PORTS: [u16; 3] = [80, 443, 22];

/// A human label mapped to a reachability target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyTarget {
    pub name: String,
    pub host: String,
}

impl LatencyTarget {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
        }
    }
}

/// Resolve the configured latency targets.
///
/// A structured list wins; otherwise a legacy comma-separated string is
/// split, each entry labelled by itself. An empty result is possible here —
/// the collector falls back to the host's own address in that case.
pub fn resolve_targets(configured: &[LatencyTarget], legacy: Option<&str>) -> Vec<LatencyTarget> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    legacy
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|host| LatencyTarget::new(host, host))
                .collect()
        })
        .unwrap_or_default()
}

/// Measurement seam so the collector can be tested without a network.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    /// Round-trip time to the target in milliseconds, 0 if unreachable.
    async fn measure(&self, target: &LatencyTarget) -> u64;
}

/// ICMP-first probe with TCP-connect fallback
#[derive(Debug, Clone, Default)]
pub struct IcmpLatencyProbe;

#[async_trait]
impl LatencyProbe for IcmpLatencyProbe {
    async fn measure(&self, target: &LatencyTarget) -> u64 {
        let Some(ip) = resolve_ip(&target.host).await else {
            debug!("Latency target '{}' did not resolve", target.name);
            return 0;
        };

        if let Some(ms) = icmp_echo_ms(ip).await {
            return ms;
        }

        // ICMP refused or unavailable (common in sandboxed networks)
        for port in FALLBACK_PORTS {
            if let Some(ms) = tcp_connect_ms(ip, port).await {
                debug!(
                    "Latency target '{}' measured via tcp/{} fallback",
                    target.name, port
                );
                return ms;
            }
        }

        0
    }
}

/// Resolve a hostname or literal IP to one address
async fn resolve_ip(host: &str) -> Option<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }
    // lookup_host wants a port; it is discarded
    tokio::net::lookup_host((host, 0))
        .await
        .ok()?
        .next()
        .map(|addr| addr.ip())
}

/// One ICMP echo, timed end-to-end. None if refused, unreachable, or the
/// process lacks raw-socket privileges.
async fn icmp_echo_ms(ip: IpAddr) -> Option<u64> {
    let payload = [0u8; 8];
    match tokio::time::timeout(ICMP_TIMEOUT, surge_ping::ping(ip, &payload)).await {
        Ok(Ok((_packet, rtt))) => Some(rtt.as_millis().max(1) as u64),
        Ok(Err(e)) => {
            debug!("ICMP echo to {} failed: {}", ip, e);
            None
        }
        Err(_) => None,
    }
}

/// Time a TCP connect against one port
pub(crate) async fn tcp_connect_ms(ip: IpAddr, port: u16) -> Option<u64> {
    let started = Instant::now();
    match tokio::time::timeout(TCP_TIMEOUT, TcpStream::connect((ip, port))).await {
        Ok(Ok(_stream)) => Some(started.elapsed().as_millis().max(1) as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_targets_win_over_legacy() {
        let configured = vec![LatencyTarget::new("dns", "1.1.1.1")];
        let resolved = resolve_targets(&configured, Some("8.8.8.8,9.9.9.9"));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "dns");
    }

    #[test]
    fn legacy_list_is_split_and_self_labelled() {
        let resolved = resolve_targets(&[], Some("8.8.8.8, example.com ,"));
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "8.8.8.8");
        assert_eq!(resolved[1].host, "example.com");
    }

    #[test]
    fn empty_configuration_yields_empty_list() {
        assert!(resolve_targets(&[], None).is_empty());
        assert!(resolve_targets(&[], Some("")).is_empty());
    }

    #[tokio::test]
    async fn unresolvable_target_measures_zero() {
        let probe = IcmpLatencyProbe;
        let target = LatencyTarget::new("nowhere", "host.invalid");
        assert_eq!(probe.measure(&target).await, 0);
    }

    #[tokio::test]
    async fn tcp_fallback_times_a_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let ms = tcp_connect_ms("127.0.0.1".parse().unwrap(), port).await;
        assert!(ms.is_some());
        assert!(ms.unwrap() >= 1);
    }
}
