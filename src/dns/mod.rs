//! DNS wire format parsing and construction.
//!
//! Covers the 12-byte header, the question section and resource records,
//! including compressed domain names. Everything here is a pure transform
//! between byte buffers and the structs below.

mod header;
mod message;
mod name;
mod question;
mod record;

pub use header::Header;
pub use message::Message;
pub use name::{encode_name, read_name};
pub use question::Question;
pub use record::ResourceRecord;

use thiserror::Error;

pub const HEADER_LEN: usize = 12;

/// Largest datagram we read or relay (no EDNS0).
pub const MAX_UDP_PAYLOAD: usize = 512;

/// Upper bound on compression pointers followed while decoding one name.
pub const MAX_POINTER_HOPS: usize = 128;

/// Longest label the wire format can carry.
pub const MAX_LABEL_LEN: usize = 63;

pub mod rcode {
    pub const NO_ERROR: u8 = 0;
    pub const NX_DOMAIN: u8 = 3;
    pub const REFUSED: u8 = 5;
}

pub mod rtype {
    pub const A: u16 = 1;
    pub const NS: u16 = 2;
    pub const CNAME: u16 = 5;
    pub const SOA: u16 = 6;
    pub const PTR: u16 = 12;
    pub const MX: u16 = 15;
    pub const TXT: u16 = 16;
    pub const AAAA: u16 = 28;
    pub const HTTP: u16 = 65;
}

pub const CLASS_IN: u16 = 1;

/// Errors raised while decoding a DNS message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("message truncated reading {field} at offset {offset}")]
    Truncated { field: &'static str, offset: usize },

    #[error("compression pointer loop at offset {offset}")]
    PointerLoop { offset: usize },

    #[error("label length {len:#04x} at offset {offset} is not a plain label")]
    LabelTooLong { len: u8, offset: usize },

    #[error("label at offset {offset} is not UTF-8 or contains a dot")]
    InvalidLabel { offset: usize },
}

/// Read a big-endian u16 at `offset`.
pub(crate) fn read_u16(data: &[u8], offset: usize, field: &'static str) -> Result<u16, DecodeError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(DecodeError::Truncated { field, offset })
}

/// Read a big-endian u32 at `offset`.
pub(crate) fn read_u32(data: &[u8], offset: usize, field: &'static str) -> Result<u32, DecodeError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DecodeError::Truncated { field, offset })
}

pub fn rcode_name(rcode: u8) -> &'static str {
    match rcode {
        0 => "NoError",
        1 => "FormErr",
        2 => "ServFail",
        3 => "NXDomain",
        4 => "NotImp",
        5 => "Refused",
        6 => "YXDomain",
        7 => "YXRRSet",
        8 => "NXRRSet",
        9 => "NotAuth",
        10 => "NotZone",
        _ => "Reserved",
    }
}

pub fn type_name(rtype: u16) -> &'static str {
    match rtype {
        1 => "A",
        2 => "NS",
        3 => "MD",
        4 => "MF",
        5 => "CNAME",
        6 => "SOA",
        7 => "MB",
        8 => "MG",
        9 => "MR",
        10 => "NULL",
        11 => "WKS",
        12 => "PTR",
        13 => "HINFO",
        14 => "MINFO",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        65 => "HTTP",
        252 => "AXFR",
        253 => "MAILB",
        254 => "MAILA",
        255 => "ANY",
        _ => "UNKNOWN",
    }
}

pub fn class_name(class: u16) -> &'static str {
    match class {
        1 => "IN",
        2 => "CS",
        3 => "CH",
        4 => "HS",
        255 => "ANY",
        _ => "UNKNOWN",
    }
}

pub fn qr_name(qr: bool) -> &'static str {
    if qr { "Response" } else { "Request" }
}
