use super::{DecodeError, HEADER_LEN};

/// The fixed 12-byte DNS message header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    /// Reserved, must be zero on any request we process.
    pub z: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    /// Highest opcode we answer (standard, inverse, status).
    pub const MAX_SUPPORTED_OPCODE: u8 = 2;

    /// Parse the header from the first 12 bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let Some(b) = data.get(..HEADER_LEN) else {
            return Err(DecodeError::Truncated {
                field: "header",
                offset: 0,
            });
        };

        let word = |i: usize| u16::from_be_bytes([b[i], b[i + 1]]);
        let flags = word(2);

        Ok(Self {
            id: word(0),
            qr: flags & 0x8000 != 0,
            opcode: ((flags >> 11) & 0x0F) as u8,
            aa: flags & 0x0400 != 0,
            tc: flags & 0x0200 != 0,
            rd: flags & 0x0100 != 0,
            ra: flags & 0x0080 != 0,
            z: ((flags >> 4) & 0x07) as u8,
            rcode: (flags & 0x0F) as u8,
            qdcount: word(4),
            ancount: word(6),
            nscount: word(8),
            arcount: word(10),
        })
    }

    /// Packed flags word: `QR|Opcode|AA|TC|RD|RA|Z|RCODE`.
    pub fn flags(&self) -> u16 {
        let mut flags = 0u16;
        if self.qr {
            flags |= 0x8000;
        }
        flags |= (u16::from(self.opcode) & 0x0F) << 11;
        if self.aa {
            flags |= 0x0400;
        }
        if self.tc {
            flags |= 0x0200;
        }
        if self.rd {
            flags |= 0x0100;
        }
        if self.ra {
            flags |= 0x0080;
        }
        flags |= (u16::from(self.z) & 0x07) << 4;
        flags |= u16::from(self.rcode) & 0x0F;
        flags
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut data = [0u8; HEADER_LEN];
        data[0..2].copy_from_slice(&self.id.to_be_bytes());
        data[2..4].copy_from_slice(&self.flags().to_be_bytes());
        data[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        data[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        data[8..10].copy_from_slice(&self.nscount.to_be_bytes());
        data[10..12].copy_from_slice(&self.arcount.to_be_bytes());
        data
    }

    /// Total records across the answer, authority and additional sections.
    pub fn record_count(&self) -> usize {
        usize::from(self.ancount) + usize::from(self.nscount) + usize::from(self.arcount)
    }
}
