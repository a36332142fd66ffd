//! Waypoint - a caching, filtering DNS forwarder.
//!
//! Answers UDP queries from its cache or blocklist, or forwards them to a
//! single upstream resolver and relays the reply.

pub mod cache;
pub mod dns;
pub mod filter;
pub mod proxy;
pub mod resolver;
pub mod stats;
pub mod transport;
