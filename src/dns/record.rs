use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};

use super::name::{encode_name, read_name};
use super::{DecodeError, read_u16, read_u32, rtype};

/// A DNS resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    /// Wall-clock time the record was parsed. Not part of the wire format.
    pub creation_date: SystemTime,
    /// Raw RDATA exactly as received.
    pub rdata: Vec<u8>,
    /// Human-readable rendering of `rdata`, used for logging.
    pub rdata_text: String,
}

impl ResourceRecord {
    /// Parse a record at `*offset`, advancing it past the RDATA.
    pub fn parse(data: &[u8], offset: &mut usize) -> Result<Self, DecodeError> {
        let name = read_name(data, offset)?;
        let rtype = read_u16(data, *offset, "type")?;
        let class = read_u16(data, *offset + 2, "class")?;
        let ttl = read_u32(data, *offset + 4, "ttl")?;
        let rdlength = usize::from(read_u16(data, *offset + 8, "rdlength")?);
        *offset += 10;

        let start = *offset;
        let rdata = data
            .get(start..start + rdlength)
            .ok_or(DecodeError::Truncated {
                field: "rdata",
                offset: start,
            })?
            .to_vec();
        let rdata_text = render_rdata(data, start, rtype, &rdata)?;
        *offset = start + rdlength;

        Ok(Self {
            name,
            rtype,
            class,
            ttl,
            creation_date: SystemTime::now(),
            rdata,
            rdata_text,
        })
    }

    pub fn rdlength(&self) -> u16 {
        self.rdata.len() as u16
    }

    /// The instant at which this record stops being fresh.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.creation_date
            .checked_add(Duration::from_secs(u64::from(self.ttl)))
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        encode_name(buf, &self.name);
        buf.extend_from_slice(&self.rtype.to_be_bytes());
        buf.extend_from_slice(&self.class.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&self.rdlength().to_be_bytes());
        buf.extend_from_slice(&self.rdata);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.name.len() + 12 + self.rdata.len());
        self.write_to(&mut buf);
        buf
    }
}

/// Render RDATA for display.
///
/// Names inside RDATA may be compressed against the whole message, so they
/// are decoded from `message` starting at `start`, not from `rdata` alone.
fn render_rdata(
    message: &[u8],
    start: usize,
    record_type: u16,
    rdata: &[u8],
) -> Result<String, DecodeError> {
    let text = match record_type {
        rtype::A if rdata.len() == 4 => {
            Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]).to_string()
        }
        rtype::AAAA if rdata.len() == 16 => rdata
            .chunks_exact(2)
            .map(|pair| format!("{:x}", u16::from_be_bytes([pair[0], pair[1]])))
            .collect::<Vec<_>>()
            .join(":"),
        rtype::CNAME | rtype::NS | rtype::PTR => {
            let mut pos = start;
            read_name(message, &mut pos)?
        }
        rtype::MX => {
            let preference = read_u16(message, start, "mx preference")?;
            let mut pos = start + 2;
            format!("{preference} {}", read_name(message, &mut pos)?)
        }
        rtype::SOA => {
            let mut pos = start;
            let mname = read_name(message, &mut pos)?;
            let rname = read_name(message, &mut pos)?;
            let mut fields = [0u32; 5];
            for (i, field) in fields.iter_mut().enumerate() {
                *field = read_u32(message, pos + i * 4, "soa field")?;
            }
            let [serial, refresh, retry, expire, minimum] = fields;
            format!("{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}")
        }
        rtype::TXT => render_character_strings(rdata),
        _ => to_hex(rdata),
    };

    Ok(text)
}

fn render_character_strings(rdata: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut pos = 0;
    while let Some(&len) = rdata.get(pos) {
        let end = (pos + 1 + usize::from(len)).min(rdata.len());
        parts.push(format!(
            "\"{}\"",
            String::from_utf8_lossy(&rdata[pos + 1..end])
        ));
        pos = end;
    }
    parts.join(" ")
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::CLASS_IN;

    fn record_bytes(name: &[u8], rtype: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
        let mut data = name.to_vec();
        data.extend_from_slice(&rtype.to_be_bytes());
        data.extend_from_slice(&CLASS_IN.to_be_bytes());
        data.extend_from_slice(&ttl.to_be_bytes());
        data.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        data.extend_from_slice(rdata);
        data
    }

    #[test]
    fn parses_a_record() {
        let data = record_bytes(b"\x07example\x03com\x00", rtype::A, 300, &[93, 184, 216, 34]);
        let mut offset = 0;

        let record = ResourceRecord::parse(&data, &mut offset).unwrap();

        assert_eq!(record.name, "example.com");
        assert_eq!(record.rtype, rtype::A);
        assert_eq!(record.class, CLASS_IN);
        assert_eq!(record.ttl, 300);
        assert_eq!(record.rdata, [93, 184, 216, 34]);
        assert_eq!(record.rdata_text, "93.184.216.34");
        assert_eq!(offset, data.len());
        assert_eq!(record.to_bytes(), data);
    }

    #[test]
    fn parses_aaaa_record_as_hex_groups() {
        let rdata = [
            0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x01,
        ];
        let data = record_bytes(b"\x00", rtype::AAAA, 60, &rdata);
        let mut offset = 0;

        let record = ResourceRecord::parse(&data, &mut offset).unwrap();

        assert_eq!(record.rdata_text, "2001:db8:0:0:0:0:0:1");
        assert_eq!(offset, data.len());
    }

    #[test]
    fn cname_rdata_follows_compression_into_message() {
        // offset 0: example.com, offset 13: record named by pointer whose
        // RDATA is "www" + pointer back to offset 0
        let mut data = b"\x07example\x03com\x00".to_vec();
        let record_start = data.len();
        data.extend(record_bytes(
            &[0xC0, 0x00],
            rtype::CNAME,
            120,
            &[3, b'w', b'w', b'w', 0xC0, 0x00],
        ));
        let mut offset = record_start;

        let record = ResourceRecord::parse(&data, &mut offset).unwrap();

        assert_eq!(record.name, "example.com");
        assert_eq!(record.rdata_text, "www.example.com");
        assert_eq!(record.rdata, [3, b'w', b'w', b'w', 0xC0, 0x00]);
        assert_eq!(offset, data.len());
    }

    #[test]
    fn mx_rdata_renders_preference_and_exchange() {
        let data = record_bytes(b"\x00", rtype::MX, 60, b"\x00\x0a\x04mail\x00");
        let mut offset = 0;

        let record = ResourceRecord::parse(&data, &mut offset).unwrap();

        assert_eq!(record.rdata_text, "10 mail");
    }

    #[test]
    fn soa_rdata_renders_all_fields() {
        let mut rdata = b"\x02ns\x00\x05admin\x00".to_vec();
        for v in [1u32, 2, 3, 4, 5] {
            rdata.extend_from_slice(&v.to_be_bytes());
        }
        let data = record_bytes(b"\x00", rtype::SOA, 60, &rdata);
        let mut offset = 0;

        let record = ResourceRecord::parse(&data, &mut offset).unwrap();

        assert_eq!(record.rdata_text, "ns admin 1 2 3 4 5");
        assert_eq!(offset, data.len());
    }

    #[test]
    fn txt_and_unknown_rdata_are_not_read_as_names() {
        let data = record_bytes(b"\x00", rtype::TXT, 60, b"\x05hello\x02hi");
        let mut offset = 0;
        let record = ResourceRecord::parse(&data, &mut offset).unwrap();
        assert_eq!(record.rdata_text, "\"hello\" \"hi\"");

        let data = record_bytes(b"\x00", 99, 60, &[0xde, 0xad]);
        let mut offset = 0;
        let record = ResourceRecord::parse(&data, &mut offset).unwrap();
        assert_eq!(record.rdata_text, "dead");
        assert_eq!(offset, data.len());
    }

    #[test]
    fn rdata_longer_than_buffer_is_truncated() {
        let mut data = record_bytes(b"\x00", rtype::A, 60, &[1, 2, 3, 4]);
        data.truncate(data.len() - 1);
        let mut offset = 0;

        assert!(matches!(
            ResourceRecord::parse(&data, &mut offset),
            Err(DecodeError::Truncated { field: "rdata", .. })
        ));
    }

    #[test]
    fn expires_at_adds_ttl_to_creation() {
        let data = record_bytes(b"\x00", rtype::A, 30, &[1, 2, 3, 4]);
        let mut offset = 0;
        let record = ResourceRecord::parse(&data, &mut offset).unwrap();

        assert_eq!(
            record.expires_at().unwrap(),
            record.creation_date + Duration::from_secs(30)
        );
    }
}
