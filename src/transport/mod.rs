//! Transport layer for the DNS forwarder.
//!
//! The UDP listener hands every datagram to its own task, and the
//! [`Upstream`] trait abstracts the round-trip to the recursive resolver so
//! the resolver can be driven without sockets.

pub mod udp;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::resolver::{Outcome, Resolution};

/// Failures talking to the upstream resolver.
///
/// None of these reach the client: the request is abandoned and the client
/// retries on its own schedule.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to bind upstream socket: {0}")]
    Bind(#[source] io::Error),

    #[error("failed to connect to upstream: {0}")]
    Connect(#[source] io::Error),

    #[error("failed to send to upstream: {0}")]
    Send(#[source] io::Error),

    #[error("failed to receive from upstream: {0}")]
    Recv(#[source] io::Error),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("upstream reply too short ({0} bytes)")]
    ShortResponse(usize),
}

/// A single query/response exchange with an upstream resolver.
pub trait Upstream: Send + Sync {
    /// Send `query` and return the reply datagram.
    fn exchange(&self, query: &[u8]) -> impl Future<Output = Result<Vec<u8>, UpstreamError>> + Send;
}

/// Log the outcome of one client query.
pub fn log_resolution(resolution: &Resolution, client: SocketAddr) {
    let id = resolution.id;
    let domain = resolution.domain.as_str();
    let total_ms = resolution.elapsed.as_secs_f64() * 1000.0;

    match &resolution.outcome {
        Outcome::Dropped(reason) => {
            info!(%client, id, %reason, "DROPPED total={total_ms:.3}ms");
        }
        Outcome::Refused => info!(%client, id, domain, "REFUSED total={total_ms:.3}ms"),
        Outcome::Blocked => info!(%client, id, domain, "BLOCKED total={total_ms:.3}ms"),
        Outcome::Cached => info!(%client, id, domain, "CACHED total={total_ms:.3}ms"),
        Outcome::Forwarded { upstream } => {
            let upstream_ms = upstream.as_secs_f64() * 1000.0;
            info!(
                %client,
                id,
                domain,
                "FORWARDED total={total_ms:.3}ms upstream={upstream_ms:.3}ms"
            );
        }
        Outcome::Failed(e) => {
            warn!(%client, id, domain, error = %e, "FAILED total={total_ms:.3}ms");
        }
    }
}
