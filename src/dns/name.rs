//! Domain name encoding and decoding, including message compression.

use tracing::warn;

use super::{DecodeError, MAX_LABEL_LEN, MAX_POINTER_HOPS};

const POINTER_MASK: u8 = 0xC0;

/// Read a domain name starting at `*offset`.
///
/// Follows compression pointers into other parts of `data`. On return
/// `*offset` sits just past the name as it appears at the original position:
/// after the zero terminator, or after the 2-byte pointer if one was hit.
/// An offset past the end of the buffer yields whatever labels were read so
/// far (possibly an empty name) instead of an error.
///
/// Labels must be UTF-8 without an embedded `.`, so the returned string maps
/// back to exactly one wire name.
pub fn read_name(data: &[u8], offset: &mut usize) -> Result<String, DecodeError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = *offset;
    let mut jumped = false;
    let mut hops = 0;

    loop {
        let Some(&len) = data.get(pos) else {
            warn!(offset = pos, len = data.len(), "OOPS: name offset past end of message");
            if !jumped {
                *offset = pos;
            }
            break;
        };

        if len & POINTER_MASK == POINTER_MASK {
            let Some(&low) = data.get(pos + 1) else {
                return Err(DecodeError::Truncated {
                    field: "compression pointer",
                    offset: pos,
                });
            };
            hops += 1;
            if hops > MAX_POINTER_HOPS {
                return Err(DecodeError::PointerLoop { offset: pos });
            }
            if !jumped {
                *offset = pos + 2;
                jumped = true;
            }
            pos = usize::from(u16::from_be_bytes([len, low]) & 0x3FFF);
            continue;
        }

        if len == 0 {
            if !jumped {
                *offset = pos + 1;
            }
            break;
        }

        if usize::from(len) > MAX_LABEL_LEN {
            return Err(DecodeError::LabelTooLong { len, offset: pos });
        }

        let start = pos + 1;
        let end = start + usize::from(len);
        let label = data.get(start..end).ok_or(DecodeError::Truncated {
            field: "label",
            offset: pos,
        })?;
        let label = std::str::from_utf8(label)
            .ok()
            .filter(|l| !l.contains('.'))
            .ok_or(DecodeError::InvalidLabel { offset: pos })?;
        labels.push(label.to_string());
        pos = end;
    }

    Ok(labels.join("."))
}

/// Append `name` as uncompressed `[len][bytes]...[0]` labels.
///
/// Empty segments are skipped, so leading, trailing or doubled dots never
/// produce zero-length labels. Labels longer than 63 bytes are cut to 63.
pub fn encode_name(buf: &mut Vec<u8>, name: &str) {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        let bytes = label.as_bytes();
        let bytes = if bytes.len() > MAX_LABEL_LEN {
            warn!(label, "label longer than {MAX_LABEL_LEN} bytes, truncating");
            &bytes[..MAX_LABEL_LEN]
        } else {
            bytes
        };
        // At most MAX_LABEL_LEN, so it fits the length octet.
        buf.push(bytes.len() as u8);
        buf.extend_from_slice(bytes);
    }
    buf.push(0);
}
