use super::name::{encode_name, read_name};
use super::{DecodeError, read_u16};

/// A DNS question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Dot-joined name, case preserved as received.
    pub qname: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn new(qname: impl Into<String>, qtype: u16, qclass: u16) -> Self {
        Self {
            qname: qname.into(),
            qtype,
            qclass,
        }
    }

    /// Parse a question at `*offset`, advancing it past QTYPE and QCLASS.
    pub fn parse(data: &[u8], offset: &mut usize) -> Result<Self, DecodeError> {
        let qname = read_name(data, offset)?;
        let qtype = read_u16(data, *offset, "qtype")?;
        let qclass = read_u16(data, *offset + 2, "qclass")?;
        *offset += 4;

        Ok(Self {
            qname,
            qtype,
            qclass,
        })
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        encode_name(buf, &self.qname);
        buf.extend_from_slice(&self.qtype.to_be_bytes());
        buf.extend_from_slice(&self.qclass.to_be_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.qname.len() + 6);
        self.write_to(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{CLASS_IN, rtype};

    #[test]
    fn parse_reads_name_type_and_class() {
        let data = [
            0xAA, 7, b'E', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, 0, 1, 0, 1,
        ];
        let mut offset = 1;

        let question = Question::parse(&data, &mut offset).unwrap();

        assert_eq!(question, Question::new("Example.com", rtype::A, CLASS_IN));
        assert_eq!(offset, data.len());
    }

    #[test]
    fn to_bytes_matches_wire_layout() {
        let question = Question::new("example.com", rtype::AAAA, CLASS_IN);
        let bytes = question.to_bytes();

        assert_eq!(&bytes[..13], b"\x07example\x03com\x00");
        assert_eq!(&bytes[13..], &[0, 28, 0, 1]);

        let mut offset = 0;
        assert_eq!(Question::parse(&bytes, &mut offset).unwrap(), question);
    }

    #[test]
    fn parse_rejects_missing_type() {
        let data = [3, b'c', b'o', b'm', 0, 0];
        let mut offset = 0;

        assert!(matches!(
            Question::parse(&data, &mut offset),
            Err(DecodeError::Truncated { field: "qtype", .. })
        ));
    }
}
