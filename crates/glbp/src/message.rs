//! GLBP message format and parsing.
//!
//! A message is a fixed header followed by a list of TLV options. A Hello
//! option carries the sender's gateway role; a Request/Response option
//! carries one virtual forwarder (forwarder number 0 marks a bare request).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Version    |   Reserved    |            Group              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Owner MAC (6 octets)                    |
//! +                               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                               |  Option Type  | Option Length |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Option body ...                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Hello body (19 octets): VG state, priority, hello interval (ms, u32),
//! hold interval (ms, u32), redirect (s, u16), timeout (s, u16), address
//! type, virtual IP.
//!
//! Request/Response body (10 octets): forwarder number, VF state, priority,
//! weight, virtual MAC.

use crate::types::{ForwarderState, GatewayState, MacAddr};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;
use std::time::Duration;

/// GLBP message format version.
pub const GLBP_VERSION: u8 = 1;

const HEADER_LEN: usize = 10;
const OPTION_HEADER_LEN: usize = 2;
const OPTION_HELLO: u8 = 1;
const OPTION_REQRESP: u8 = 2;
const HELLO_BODY_LEN: usize = 19;
const REQRESP_BODY_LEN: usize = 10;
const ADDR_TYPE_IPV4: u8 = 1;

/// Codec failure for an inbound datagram.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("message truncated")]
    Truncated,

    #[error("unsupported version {0}")]
    Version(u8),

    #[error("option type {option} has invalid length {len}")]
    OptionLength { option: u8, len: u8 },

    #[error("invalid gateway state {0}")]
    InvalidGatewayState(u8),

    #[error("invalid forwarder state {0}")]
    InvalidForwarderState(u8),

    #[error("unsupported address type {0}")]
    AddressType(u8),
}

/// Hello option: the sender's gateway role and group parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloOption {
    /// Sender's virtual gateway state.
    pub vg_state: GatewayState,

    /// Sender's gateway election priority.
    pub priority: u8,

    /// Sender's hello interval.
    pub hello_interval: Duration,

    /// Sender's hold interval.
    pub hold_interval: Duration,

    /// Redirect interval in seconds.
    pub redirect: u16,

    /// Timeout interval in seconds.
    pub timeout: u16,

    /// Virtual IP of the group.
    pub virtual_ip: Ipv4Addr,
}

/// Request/Response option: one virtual forwarder being requested,
/// advertised, or assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqRespOption {
    /// 1-based forwarder number; 0 marks a bare request.
    pub forwarder: u8,

    /// Advertised forwarder state; `None` encodes the wire's "unknown".
    pub vf_state: Option<ForwarderState>,

    /// Forwarder priority (167 primary, 135 secondary, 0 unassigned).
    pub priority: u8,

    /// Forwarder weight.
    pub weight: u8,

    /// Virtual MAC of the forwarder (all-zero in bare requests).
    pub mac: MacAddr,
}

impl ReqRespOption {
    /// A bare forwarder request: all fields zeroed.
    pub fn request() -> Self {
        Self {
            forwarder: 0,
            vf_state: None,
            priority: 0,
            weight: 0,
            mac: MacAddr::ZERO,
        }
    }
}

/// A parsed GLBP message: header plus typed options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlbpMessage {
    /// Group number.
    pub group: u16,

    /// Physical MAC of the sending router.
    pub owner: MacAddr,

    /// Hello option, when present.
    pub hello: Option<HelloOption>,

    /// Request/Response options, one per forwarder.
    pub forwarders: Vec<ReqRespOption>,
}

impl GlbpMessage {
    /// Serialize the message to bytes.
    pub fn encode(&self) -> Bytes {
        let mut len = HEADER_LEN;
        if self.hello.is_some() {
            len += OPTION_HEADER_LEN + HELLO_BODY_LEN;
        }
        len += self.forwarders.len() * (OPTION_HEADER_LEN + REQRESP_BODY_LEN);

        let mut buf = BytesMut::with_capacity(len);

        buf.put_u8(GLBP_VERSION);
        buf.put_u8(0);
        buf.put_u16(self.group);
        buf.put_slice(&self.owner.octets());

        if let Some(hello) = &self.hello {
            buf.put_u8(OPTION_HELLO);
            buf.put_u8(HELLO_BODY_LEN as u8);
            buf.put_u8(hello.vg_state.to_wire());
            buf.put_u8(hello.priority);
            buf.put_u32(hello.hello_interval.as_millis() as u32);
            buf.put_u32(hello.hold_interval.as_millis() as u32);
            buf.put_u16(hello.redirect);
            buf.put_u16(hello.timeout);
            buf.put_u8(ADDR_TYPE_IPV4);
            buf.put_slice(&hello.virtual_ip.octets());
        }

        for rr in &self.forwarders {
            buf.put_u8(OPTION_REQRESP);
            buf.put_u8(REQRESP_BODY_LEN as u8);
            buf.put_u8(rr.forwarder);
            buf.put_u8(rr.vf_state.map_or(0, ForwarderState::to_wire));
            buf.put_u8(rr.priority);
            buf.put_u8(rr.weight);
            buf.put_slice(&rr.mac.octets());
        }

        buf.freeze()
    }

    /// Parse a message from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < HEADER_LEN {
            return Err(CodecError::Truncated);
        }

        let version = data[0];
        if version != GLBP_VERSION {
            return Err(CodecError::Version(version));
        }

        let group = u16::from_be_bytes([data[2], data[3]]);
        let mut owner = [0u8; 6];
        owner.copy_from_slice(&data[4..10]);

        let mut hello = None;
        let mut forwarders = Vec::new();
        let mut offset = HEADER_LEN;

        while offset < data.len() {
            if offset + OPTION_HEADER_LEN > data.len() {
                return Err(CodecError::Truncated);
            }
            let option = data[offset];
            let len = data[offset + 1];
            let body = offset + OPTION_HEADER_LEN;
            if body + len as usize > data.len() {
                return Err(CodecError::Truncated);
            }

            match option {
                OPTION_HELLO => {
                    if len as usize != HELLO_BODY_LEN {
                        return Err(CodecError::OptionLength { option, len });
                    }
                    let parsed = Self::parse_hello(&data[body..body + HELLO_BODY_LEN])?;
                    // Keep the first hello; a well-formed message has one.
                    hello.get_or_insert(parsed);
                }
                OPTION_REQRESP => {
                    if len as usize != REQRESP_BODY_LEN {
                        return Err(CodecError::OptionLength { option, len });
                    }
                    forwarders.push(Self::parse_reqresp(&data[body..body + REQRESP_BODY_LEN])?);
                }
                _ => {
                    if len == 0 {
                        return Err(CodecError::OptionLength { option, len });
                    }
                    // Unknown option: skip by declared length.
                }
            }

            offset = body + len as usize;
        }

        Ok(Self {
            group,
            owner: MacAddr::new(owner),
            hello,
            forwarders,
        })
    }

    fn parse_hello(body: &[u8]) -> Result<HelloOption, CodecError> {
        let vg_state =
            GatewayState::from_wire(body[0]).ok_or(CodecError::InvalidGatewayState(body[0]))?;
        let priority = body[1];
        let hello_ms = u32::from_be_bytes([body[2], body[3], body[4], body[5]]);
        let hold_ms = u32::from_be_bytes([body[6], body[7], body[8], body[9]]);
        let redirect = u16::from_be_bytes([body[10], body[11]]);
        let timeout = u16::from_be_bytes([body[12], body[13]]);
        let addr_type = body[14];
        if addr_type != ADDR_TYPE_IPV4 {
            return Err(CodecError::AddressType(addr_type));
        }
        let virtual_ip = Ipv4Addr::new(body[15], body[16], body[17], body[18]);

        Ok(HelloOption {
            vg_state,
            priority,
            hello_interval: Duration::from_millis(hello_ms as u64),
            hold_interval: Duration::from_millis(hold_ms as u64),
            redirect,
            timeout,
            virtual_ip,
        })
    }

    fn parse_reqresp(body: &[u8]) -> Result<ReqRespOption, CodecError> {
        let forwarder = body[0];
        let vf_state = match body[1] {
            0 => None,
            raw => {
                Some(ForwarderState::from_wire(raw).ok_or(CodecError::InvalidForwarderState(raw))?)
            }
        };
        let priority = body[2];
        let weight = body[3];
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&body[4..10]);

        Ok(ReqRespOption {
            forwarder,
            vf_state,
            priority,
            weight,
            mac: MacAddr::new(mac),
        })
    }
}
