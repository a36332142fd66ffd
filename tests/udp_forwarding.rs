//! End-to-end tests over loopback sockets: client -> forwarder -> fake upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout};

use waypoint::cache::ResponseCache;
use waypoint::dns::{CLASS_IN, Header, MAX_UDP_PAYLOAD, Message, Question, rcode, rtype};
use waypoint::filter::Blocklist;
use waypoint::resolver::Resolver;
use waypoint::transport::udp::{UdpTransport, UdpUpstream};

fn query(id: u16, name: &str, qtype: u16, flags: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&id.to_be_bytes());
    data.extend_from_slice(&flags.to_be_bytes());
    data.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0]);
    data.extend(Question::new(name, qtype, CLASS_IN).to_bytes());
    data
}

/// Fake upstream answering every query with A 93.184.216.34, TTL 3600.
///
/// Queries mentioning `slow` are swallowed, so they wait out the forwarder's
/// upstream timeout.
async fn spawn_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        let mut buf = [0u8; MAX_UDP_PAYLOAD];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            if buf[..len].windows(4).any(|w| w == b"slow") {
                continue;
            }
            let mut reply = buf[..len].to_vec();
            reply[2] = 0x81;
            reply[3] = 0x80;
            reply[7] = 1;
            reply.extend_from_slice(&[
                0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 93, 184, 216, 34,
            ]);
            let _ = socket.send_to(&reply, src).await;
        }
    });

    (addr, hits)
}

async fn spawn_forwarder(upstream: SocketAddr, blocklist: &str) -> (SocketAddr, Arc<ResponseCache>) {
    let cache = Arc::new(ResponseCache::new());
    let resolver = Arc::new(Resolver::new(Blocklist::from_lines(blocklist), cache.clone()));
    let upstream = Arc::new(UdpUpstream::new(upstream, Duration::from_secs(2)));

    let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = transport.local_addr().unwrap();
    transport.start(upstream, resolver);

    (addr, cache)
}

async fn ask(client: &UdpSocket, forwarder: SocketAddr, datagram: &[u8]) -> Option<Vec<u8>> {
    client.send_to(datagram, forwarder).await.unwrap();
    let mut buf = [0u8; MAX_UDP_PAYLOAD];
    match timeout(Duration::from_millis(500), client.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
        _ => None,
    }
}

#[tokio::test]
async fn forwards_caches_and_replays_with_new_id() {
    let (upstream, hits) = spawn_upstream().await;
    let (forwarder, cache) = spawn_forwarder(upstream, "").await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let first = ask(&client, forwarder, &query(0x1000, "example.com", rtype::A, 0x0100))
        .await
        .expect("forwarded reply");

    let message = Message::parse_response(&first).unwrap();
    assert_eq!(message.header.id, 0x1000);
    assert_eq!(message.header.rcode, rcode::NO_ERROR);
    assert_eq!(message.answers[0].rdata, [93, 184, 216, 34]);
    assert!(cache.get("example.com").is_some());

    let second = ask(&client, forwarder, &query(0x2000, "example.com", rtype::A, 0x0100))
        .await
        .expect("cached reply");

    assert_eq!(Header::parse(&second).unwrap().id, 0x2000);
    assert_eq!(&second[2..], &first[2..]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blocked_and_refused_queries_never_reach_upstream() {
    let (upstream, hits) = spawn_upstream().await;
    let (forwarder, _) = spawn_forwarder(upstream, "ads.example.com\n").await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let blocked = ask(&client, forwarder, &query(1, "ads.example.com", rtype::A, 0x0100))
        .await
        .expect("nxdomain reply");
    let header = Header::parse(&blocked).unwrap();
    assert_eq!(header.rcode, rcode::NX_DOMAIN);
    assert_eq!(header.ancount, 0);

    let refused = ask(&client, forwarder, &query(2, "example.com", rtype::HTTP, 0x0100))
        .await
        .expect("refused reply");
    assert_eq!(Header::parse(&refused).unwrap().rcode, rcode::REFUSED);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_headers_get_no_reply() {
    let (upstream, hits) = spawn_upstream().await;
    let (forwarder, _) = spawn_forwarder(upstream, "").await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // opcode 3
    assert!(ask(&client, forwarder, &query(1, "example.com", rtype::A, 0x1900)).await.is_none());
    // Z = 1
    assert!(ask(&client, forwarder, &query(2, "example.com", rtype::A, 0x0110)).await.is_none());

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}


#[tokio::test]
async fn stalled_upstream_does_not_block_other_queries() {
    let (upstream, hits) = spawn_upstream().await;
    let (forwarder, _) = spawn_forwarder(upstream, "ads.example.com\n").await;
    let warm = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    ask(&warm, forwarder, &query(1, "example.com", rtype::A, 0x0100))
        .await
        .expect("forwarded reply");

    // Stuck waiting on upstream for the forwarder's full 2s timeout.
    let stalled = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    stalled
        .send_to(&query(2, "slow.example.com", rtype::A, 0x0100), forwarder)
        .await
        .unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let started = Instant::now();
    let cached = ask(&client, forwarder, &query(3, "example.com", rtype::A, 0x0100))
        .await
        .expect("cached reply while upstream is stalled");
    let blocked = ask(&client, forwarder, &query(4, "ads.example.com", rtype::A, 0x0100))
        .await
        .expect("blocked reply while upstream is stalled");
    let fresh = ask(&client, forwarder, &query(5, "other.example.com", rtype::A, 0x0100))
        .await
        .expect("forwarded reply while upstream is stalled");

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(Header::parse(&cached).unwrap().id, 3);
    assert_eq!(Header::parse(&blocked).unwrap().rcode, rcode::NX_DOMAIN);
    assert_eq!(Header::parse(&fresh).unwrap().id, 5);
    assert!(hits.load(Ordering::SeqCst) >= 2);

    let mut buf = [0u8; MAX_UDP_PAYLOAD];
    assert!(stalled.try_recv_from(&mut buf).is_err());
}
