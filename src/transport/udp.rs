//! UDP transport for DNS queries.
//!
//! A single accept loop reads datagrams and spawns one task per query. Each
//! task runs the resolver, which may open its own short-lived upstream
//! socket, and writes the reply (if any) back to the client. The accept loop
//! never waits on a query.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::warn;

use super::{Upstream, UpstreamError, log_resolution};
use crate::dns::{HEADER_LEN, MAX_UDP_PAYLOAD};
use crate::resolver::Resolver;

/// UDP listener for client queries.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the accept loop on the current runtime.
    pub fn start<U>(self, upstream: Arc<U>, resolver: Arc<Resolver>) -> JoinHandle<()>
    where
        U: Upstream + 'static,
    {
        tokio::spawn(run(self.socket, upstream, resolver))
    }
}

/// Accept loop: read a datagram, hand it to a new task, repeat.
async fn run<U>(socket: Arc<UdpSocket>, upstream: Arc<U>, resolver: Arc<Resolver>)
where
    U: Upstream + 'static,
{
    let mut buf = [0u8; MAX_UDP_PAYLOAD];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "UDP recv error");
                continue;
            }
        };

        let datagram = buf[..len].to_vec();
        tokio::spawn(handle_datagram(
            socket.clone(),
            src,
            datagram,
            upstream.clone(),
            resolver.clone(),
        ));
    }
}

async fn handle_datagram<U>(
    socket: Arc<UdpSocket>,
    client: SocketAddr,
    datagram: Vec<u8>,
    upstream: Arc<U>,
    resolver: Arc<Resolver>,
) where
    U: Upstream,
{
    let resolution = resolver.resolve(&datagram, upstream.as_ref()).await;

    if let Some(response) = &resolution.response {
        if let Err(e) = socket.send_to(response, client).await {
            warn!(%client, error = %e, "UDP response error");
        }
    }

    log_resolution(&resolution, client);
}

/// Upstream resolver reached over UDP.
///
/// Every exchange uses a fresh connected socket: one send, one receive,
/// bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct UdpUpstream {
    addr: SocketAddr,
    timeout: Duration,
}

impl UdpUpstream {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }
}

impl Upstream for UdpUpstream {
    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, UpstreamError> {
        let local: SocketAddr = if self.addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await.map_err(UpstreamError::Bind)?;
        socket
            .connect(self.addr)
            .await
            .map_err(UpstreamError::Connect)?;
        socket.send(query).await.map_err(UpstreamError::Send)?;

        let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
        let len = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))?
            .map_err(UpstreamError::Recv)?;

        if len < HEADER_LEN {
            return Err(UpstreamError::ShortResponse(len));
        }
        buf.truncate(len);

        Ok(buf)
    }
}
