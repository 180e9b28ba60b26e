//! Codec for encoding and decoding HTSP frames.
//!
//! Frame format:
//! ```text
//! +----------+----------------------------------+
//! | Length   |            Fields                |
//! | u32 BE   |           (variable)             |
//! +----------+----------------------------------+
//! | 4 bytes  |          Length bytes            |
//! ```
//!
//! Each field is `type:u8, namelen:u8, datalen:u32 BE, name, data`.
//! Integers are stored little-endian with leading zero bytes stripped.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::htsmsg::{HtsMsg, HtsValue};

/// Size of the frame length prefix.
pub const FRAME_LENGTH_SIZE: usize = 4;

/// Maximum frame payload size (16 MB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

const TYPE_MAP: u8 = 1;
const TYPE_S64: u8 = 2;
const TYPE_STR: u8 = 3;
const TYPE_BIN: u8 = 4;
const TYPE_LIST: u8 = 5;

/// Encode a message into a complete frame, length prefix included.
pub fn encode(msg: &HtsMsg) -> Result<Bytes, ProtocolError> {
    let mut body = BytesMut::new();
    for (name, value) in msg.fields() {
        encode_entry(&mut body, name, value);
    }

    let body_len = body.len() as u32;
    if body_len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(body_len, MAX_FRAME_SIZE));
    }

    let mut frame = BytesMut::with_capacity(FRAME_LENGTH_SIZE + body.len());
    frame.put_u32(body_len);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Decode one frame from the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame;
/// the caller appends more bytes and retries. A complete frame is always
/// consumed, even when its fields fail to parse, so one bad frame never
/// desynchronizes the stream. [`ProtocolError::FrameTooLarge`] is the
/// exception: nothing is consumed and the stream must be abandoned.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<HtsMsg>, ProtocolError> {
    if buf.len() < FRAME_LENGTH_SIZE {
        return Ok(None);
    }

    let body_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if body_len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(body_len, MAX_FRAME_SIZE));
    }

    let total = FRAME_LENGTH_SIZE + body_len as usize;
    if buf.len() < total {
        return Ok(None);
    }

    buf.advance(FRAME_LENGTH_SIZE);
    let mut body = buf.split_to(body_len as usize).freeze();
    Ok(Some(parse_map(&mut body)?))
}

fn encode_entry(buf: &mut BytesMut, name: &str, value: &HtsValue) {
    let data = encode_value(value);
    buf.put_u8(value_type(value));
    buf.put_u8(name.len().min(255) as u8);
    buf.put_u32(data.len() as u32);
    buf.put_slice(&name.as_bytes()[..name.len().min(255)]);
    buf.put_slice(&data);
}

fn value_type(value: &HtsValue) -> u8 {
    match value {
        HtsValue::Map(_) => TYPE_MAP,
        HtsValue::S64(_) => TYPE_S64,
        HtsValue::Str(_) => TYPE_STR,
        HtsValue::Bin(_) => TYPE_BIN,
        HtsValue::List(_) => TYPE_LIST,
    }
}

fn encode_value(value: &HtsValue) -> Bytes {
    let mut data = BytesMut::new();
    match value {
        HtsValue::S64(v) => {
            let mut u = *v as u64;
            while u != 0 {
                data.put_u8((u & 0xFF) as u8);
                u >>= 8;
            }
        }
        HtsValue::Str(s) => data.put_slice(s.as_bytes()),
        HtsValue::Bin(b) => data.put_slice(b),
        HtsValue::Map(m) => {
            for (name, v) in m.fields() {
                encode_entry(&mut data, name, v);
            }
        }
        HtsValue::List(items) => {
            for item in items {
                encode_entry(&mut data, "", item);
            }
        }
    }
    data.freeze()
}

fn parse_map(buf: &mut Bytes) -> Result<HtsMsg, ProtocolError> {
    let mut msg = HtsMsg::new();
    for (name, value) in parse_entries(buf)? {
        msg.put(&name, value);
    }
    Ok(msg)
}

fn parse_entries(buf: &mut Bytes) -> Result<Vec<(String, HtsValue)>, ProtocolError> {
    let mut entries = Vec::new();

    while buf.has_remaining() {
        if buf.remaining() < 6 {
            return Err(ProtocolError::TruncatedField {
                expected: 6,
                actual: buf.remaining(),
            });
        }
        let ftype = buf.get_u8();
        let name_len = buf.get_u8() as usize;
        let data_len = buf.get_u32() as usize;

        if buf.remaining() < name_len + data_len {
            return Err(ProtocolError::TruncatedField {
                expected: name_len + data_len,
                actual: buf.remaining(),
            });
        }

        let name_bytes = buf.copy_to_bytes(name_len);
        let name = std::str::from_utf8(&name_bytes)
            .map_err(|_| ProtocolError::InvalidString("name"))?
            .to_string();
        let mut data = buf.copy_to_bytes(data_len);

        let value = match ftype {
            TYPE_MAP => HtsValue::Map(parse_map(&mut data)?),
            TYPE_S64 => HtsValue::S64(parse_s64(&data)?),
            TYPE_STR => HtsValue::Str(
                std::str::from_utf8(&data)
                    .map_err(|_| ProtocolError::InvalidString("string"))?
                    .to_string(),
            ),
            TYPE_BIN => HtsValue::Bin(data),
            TYPE_LIST => {
                let items = parse_entries(&mut data)?
                    .into_iter()
                    .map(|(_, v)| v)
                    .collect();
                HtsValue::List(items)
            }
            // Unknown field types are skipped, not fatal: newer servers
            // may send types this client does not know.
            _ => continue,
        };
        entries.push((name, value));
    }

    Ok(entries)
}

fn parse_s64(data: &[u8]) -> Result<i64, ProtocolError> {
    if data.len() > 8 {
        return Err(ProtocolError::IntegerTooWide(data.len()));
    }
    let mut u: u64 = 0;
    for (i, b) in data.iter().enumerate() {
        u |= (*b as u64) << (8 * i);
    }
    Ok(u as i64)
}
