//! Wire format definitions for the HTSP streaming protocol.
//!
//! HTSP is a binary, message-oriented protocol: every message is a
//! self-describing field map, framed on the wire with a 4-byte big-endian
//! length prefix.
//!
//! # Frame Format
//!
//! ```text
//! +----------+----------------------------------+
//! | Length   |            Fields                |
//! | u32 BE   |           (variable)             |
//! +----------+----------------------------------+
//! | 4 bytes  |          Length bytes            |
//! ```
//!
//! Each field is `type:u8, namelen:u8, datalen:u32 BE, name, data`.
//! List elements carry an empty name.
//!
//! # Example
//!
//! ```rust
//! use htsp_protocol::{HtsMsg, encode, decode_frame};
//! use bytes::BytesMut;
//!
//! let mut msg = HtsMsg::method("hello");
//! msg.put_u32("htspversion", 34);
//! msg.put_str("clientname", "example");
//!
//! let frame = encode(&msg).unwrap();
//!
//! let mut buf = BytesMut::from(&frame[..]);
//! let decoded = decode_frame(&mut buf).unwrap().unwrap();
//! assert_eq!(decoded.get_str("method"), Some("hello"));
//! ```

pub mod codec;
pub mod error;
pub mod htsmsg;
pub mod method;

pub use codec::{decode_frame, encode, FRAME_LENGTH_SIZE, MAX_FRAME_SIZE};
pub use error::ProtocolError;
pub use htsmsg::{HtsMsg, HtsValue};

/// Protocol version this implementation speaks, sent in `hello`.
pub const HTSP_VERSION: u32 = 34;
