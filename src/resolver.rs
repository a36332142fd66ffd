//! DNS query resolution logic.
//!
//! Handles the per-datagram pipeline:
//! 1. Decode and validate (unsupported opcode or non-zero Z is dropped)
//! 2. Filter (refused query types, blocklisted names)
//! 3. Cache lookup on the first question's name
//! 4. Forward to upstream, cache the answer and relay the upstream bytes
//!
//! Transports handle the actual I/O, the resolver makes the decisions.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{Lookup, ResponseCache};
use crate::dns::{self, DecodeError, Header, Message};
use crate::filter::{Blocklist, Verdict, filter_query, policy_response};
use crate::stats::{Stats, StatsSnapshot};
use crate::transport::{Upstream, UpstreamError};

/// Why a datagram was dropped without a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Malformed(DecodeError),
    UnsupportedOpcode(u8),
    NonZeroZ(u8),
    NoQuestion,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Malformed(e) => write!(f, "malformed query: {e}"),
            DropReason::UnsupportedOpcode(op) => write!(f, "opcode {op} not supported"),
            DropReason::NonZeroZ(z) => write!(f, "Z must be zero but is {z}"),
            DropReason::NoQuestion => f.write_str("query has no question"),
        }
    }
}

/// Action to take for a DNS query.
#[derive(Debug)]
pub enum QueryAction {
    /// Send nothing back.
    Drop { id: u16, reason: DropReason },
    /// Query was refused or blocked, return this response immediately.
    Policy {
        response: Vec<u8>,
        verdict: Verdict,
        id: u16,
    },
    /// Fresh cache entry, return this response immediately.
    Cached {
        response: Vec<u8>,
        domain: String,
        id: u16,
    },
    /// Query should be forwarded to upstream.
    Forward { query: Message },
}

/// How a query ended.
#[derive(Debug)]
pub enum Outcome {
    Dropped(DropReason),
    Refused,
    Blocked,
    Cached,
    Forwarded { upstream: Duration },
    Failed(UpstreamError),
}

/// The result of handling one datagram.
#[derive(Debug)]
pub struct Resolution {
    pub id: u16,
    pub domain: String,
    pub outcome: Outcome,
    /// Bytes to send back to the client, if any.
    pub response: Option<Vec<u8>>,
    pub elapsed: Duration,
}

/// Resolver handles DNS query processing decisions.
///
/// Owns the blocklist and shares the response cache. Everything it holds is
/// safe to use from many query tasks at once.
pub struct Resolver {
    blocklist: Blocklist,
    cache: Arc<ResponseCache>,
    stats: Stats,
}

impl Resolver {
    pub fn new(blocklist: Blocklist, cache: Arc<ResponseCache>) -> Self {
        Self {
            blocklist,
            cache,
            stats: Stats::new(),
        }
    }

    /// Decide what to do with a raw query datagram.
    pub fn process_query(&self, datagram: &[u8]) -> QueryAction {
        let header = match Header::parse(datagram) {
            Ok(h) => h,
            Err(e) => {
                return QueryAction::Drop {
                    id: 0,
                    reason: DropReason::Malformed(e),
                };
            }
        };
        let id = header.id;
        debug!(id, kind = dns::qr_name(header.qr), "received message from client");

        if header.opcode > Header::MAX_SUPPORTED_OPCODE {
            return QueryAction::Drop {
                id,
                reason: DropReason::UnsupportedOpcode(header.opcode),
            };
        }
        if header.z != 0 {
            return QueryAction::Drop {
                id,
                reason: DropReason::NonZeroZ(header.z),
            };
        }

        let query = match Message::parse_query(datagram) {
            Ok(q) => q,
            Err(e) => {
                return QueryAction::Drop {
                    id,
                    reason: DropReason::Malformed(e),
                };
            }
        };
        for q in &query.questions {
            debug!(
                id,
                name = %q.qname,
                qtype = dns::type_name(q.qtype),
                qtype_code = q.qtype,
                class = dns::class_name(q.qclass),
                "handling question"
            );
        }

        // Step 1: Policy
        if let Some(verdict) = filter_query(&self.blocklist, &query) {
            return QueryAction::Policy {
                response: policy_response(&query, verdict.rcode()),
                verdict,
                id,
            };
        }

        let Some(domain) = query.query_name() else {
            return QueryAction::Drop {
                id,
                reason: DropReason::NoQuestion,
            };
        };

        // Step 2: Cache
        match self.cache.lookup(domain, id) {
            Lookup::Hit(response) => {
                return QueryAction::Cached {
                    response,
                    domain: domain.to_string(),
                    id,
                };
            }
            Lookup::Expired => {
                debug!(id, domain, "cache entry expired, forwarding");
            }
            Lookup::Miss => {}
        }

        // Step 3: Forward to upstream
        QueryAction::Forward { query }
    }

    /// Called with the upstream reply to a forwarded query.
    ///
    /// Decodes the records and caches the answer under the first question's
    /// name. Returns whether it was cached. The reply itself is relayed as-is
    /// by the caller whether or not it decodes.
    pub fn process_response(&self, query: &Message, response: &[u8]) -> bool {
        let reply = match Message::parse_response(response) {
            Ok(m) => m,
            Err(e) => {
                warn!(id = query.header.id, error = %e, "could not decode upstream reply, not caching");
                return false;
            }
        };

        let header = reply.header;
        debug!(
            id = header.id,
            rcode = dns::rcode_name(header.rcode),
            kind = dns::qr_name(header.qr),
            qdcount = header.qdcount,
            ancount = header.ancount,
            nscount = header.nscount,
            arcount = header.arcount,
            "received upstream reply"
        );

        let an = usize::from(header.ancount);
        let ns = usize::from(header.nscount);
        for (i, record) in reply.answers.iter().enumerate() {
            let section = if i < an {
                "AN"
            } else if i < an + ns {
                "NS"
            } else {
                "AR"
            };
            debug!(
                id = header.id,
                section,
                name = %record.name,
                rtype = dns::type_name(record.rtype),
                class = dns::class_name(record.class),
                ttl = record.ttl,
                rdlength = record.rdlength(),
                rdata = %record.rdata_text,
                "upstream record"
            );
        }

        let Some(name) = query.query_name() else {
            return false;
        };
        if reply.answers.is_empty() {
            return false;
        }

        let message = Message {
            header,
            questions: query.questions.clone(),
            answers: reply.answers,
        };
        self.cache.store(name, message, response);
        true
    }

    /// Run the whole pipeline for one datagram.
    pub async fn resolve<U: Upstream>(&self, datagram: &[u8], upstream: &U) -> Resolution {
        let start = Instant::now();

        let (id, domain, outcome, response) = match self.process_query(datagram) {
            QueryAction::Drop { id, reason } => {
                self.stats.record_dropped();
                (id, String::from("<unknown>"), Outcome::Dropped(reason), None)
            }
            QueryAction::Policy {
                response,
                verdict,
                id,
            } => {
                let outcome = match verdict {
                    Verdict::Refused { .. } => {
                        self.stats.record_refused(elapsed_ms(start));
                        Outcome::Refused
                    }
                    Verdict::Blocked { .. } => {
                        self.stats.record_blocked(elapsed_ms(start));
                        Outcome::Blocked
                    }
                };
                (id, verdict.qname().to_string(), outcome, Some(response))
            }
            QueryAction::Cached {
                response,
                domain,
                id,
            } => {
                self.stats.record_cached(elapsed_ms(start));
                (id, domain, Outcome::Cached, Some(response))
            }
            QueryAction::Forward { query } => {
                let id = query.header.id;
                let domain = query.query_name().unwrap_or_default().to_string();
                let upstream_start = Instant::now();

                match upstream.exchange(&query.upstream_bytes()).await {
                    Ok(reply) => {
                        let upstream_elapsed = upstream_start.elapsed();
                        self.process_response(&query, &reply);
                        self.stats.record_forwarded(elapsed_ms(start));
                        (
                            id,
                            domain,
                            Outcome::Forwarded {
                                upstream: upstream_elapsed,
                            },
                            Some(reply),
                        )
                    }
                    Err(e) => {
                        self.stats.record_failed();
                        (id, domain, Outcome::Failed(e), None)
                    }
                }
            }
        };

        Resolution {
            id,
            domain,
            outcome,
            response,
            elapsed: start.elapsed(),
        }
    }

    /// Returns the number of domains in the blocklist.
    pub fn blocked_count(&self) -> usize {
        self.blocklist.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
