//! Forwarder orchestration.
//!
//! Loads the blocklist, builds the resolver and binds the UDP transport.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::ResponseCache;
use crate::filter::Blocklist;
use crate::resolver::Resolver;
use crate::transport::udp::{UdpTransport, UdpUpstream};

/// Configuration for the forwarder.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Local address to bind (e.g., 0.0.0.0:53)
    pub bind_addr: SocketAddr,
    /// Upstream recursive resolver
    pub upstream: SocketAddr,
    /// Newline-delimited blocklist; a missing file means nothing is blocked
    pub blocklist_path: PathBuf,
    /// Deadline for each upstream reply
    pub upstream_timeout: Duration,
    /// How often to log stats; zero disables
    pub stats_interval: Duration,
}

/// Run the forwarder with the given configuration.
///
/// Returns only if the listener cannot be set up.
pub async fn run(config: ProxyConfig) -> io::Result<()> {
    let blocklist = Blocklist::load(&config.blocklist_path)?;
    let cache = Arc::new(ResponseCache::new());
    let resolver = Arc::new(Resolver::new(blocklist, cache));
    let upstream = Arc::new(UdpUpstream::new(config.upstream, config.upstream_timeout));

    let udp = UdpTransport::bind(config.bind_addr).await?;
    let bound = udp.local_addr()?;
    info!(
        bind = %bound,
        upstream = %config.upstream,
        blocked = resolver.blocked_count(),
        "DNS forwarder listening"
    );

    let listener = udp.start(upstream, resolver.clone());

    if !config.stats_interval.is_zero() {
        tokio::spawn(report_stats(resolver, config.stats_interval));
    }

    listener.await.map_err(io::Error::other)
}

async fn report_stats(resolver: Arc<Resolver>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await; // Skip first immediate tick
    loop {
        interval.tick().await;
        let stats = resolver.stats_snapshot_and_reset();
        info!(
            uptime_secs = stats.uptime_secs,
            cache = resolver.cache_len(),
            requests = stats.requests,
            forwarded = stats.forwarded,
            cached = stats.cached,
            blocked = stats.blocked,
            refused = stats.refused,
            dropped = stats.dropped,
            failed = stats.failed,
            "[stats] avg_response={:.2}ms",
            stats.avg_response_ms
        );
    }
}
