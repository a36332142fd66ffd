//! DNS query filtering module.
//!
//! Refuses query types we do not serve and answers blocklisted names with
//! NXDOMAIN, before the cache or upstream is consulted.

mod blocklist;

pub use blocklist::Blocklist;

use crate::dns::{Message, rcode, rtype};

/// Why a query was answered locally instead of being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The query type is not served (AAAA, HTTP).
    Refused { qname: String, qtype: u16 },
    /// The name is on the blocklist.
    Blocked { qname: String },
}

impl Verdict {
    pub fn rcode(&self) -> u8 {
        match self {
            Verdict::Refused { .. } => rcode::REFUSED,
            Verdict::Blocked { .. } => rcode::NX_DOMAIN,
        }
    }

    pub fn qname(&self) -> &str {
        match self {
            Verdict::Refused { qname, .. } | Verdict::Blocked { qname } => qname,
        }
    }
}

/// Query types answered with REFUSED.
pub fn is_refused_type(qtype: u16) -> bool {
    matches!(qtype, rtype::AAAA | rtype::HTTP)
}

/// Scan the questions in order and return the first policy hit.
///
/// Returns `None` if the query should go on to the cache and upstream.
pub fn filter_query(blocklist: &Blocklist, query: &Message) -> Option<Verdict> {
    query.questions.iter().find_map(|q| {
        if is_refused_type(q.qtype) {
            Some(Verdict::Refused {
                qname: q.qname.clone(),
                qtype: q.qtype,
            })
        } else if blocklist.is_blocked(&q.qname) {
            Some(Verdict::Blocked {
                qname: q.qname.clone(),
            })
        } else {
            None
        }
    })
}

/// Build the minimal response for a policy verdict.
///
/// Echoes the request header and questions with QR set, `rcode` applied and
/// no records.
pub fn policy_response(query: &Message, rcode: u8) -> Vec<u8> {
    let mut response = Message {
        header: query.header,
        questions: query.questions.clone(),
        answers: Vec::new(),
    };
    response.header.qr = true;
    response.header.rcode = rcode;
    response.header.ancount = 0;
    response.header.nscount = 0;
    response.header.arcount = 0;
    response.to_bytes()
}
