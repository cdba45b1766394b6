//! GLBP data types and structures.
//!
//! Gateway Load Balancing Protocol: one Active Virtual Gateway (AVG) is
//! elected per group while host traffic is load-balanced across up to four
//! virtual forwarders, each elected independently of the gateway role.

use serde::Deserialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

/// GLBP multicast group address (link-local scope).
pub const GLBP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 102);

/// GLBP UDP port.
pub const GLBP_UDP_PORT: u16 = 3222;

/// Maximum number of virtual forwarders per group.
pub const VF_MAX: usize = 4;

/// Forwarder priority advertised by a self-elected primary owner.
pub const VF_PRIMARY_PRIORITY: u8 = 167;

/// Forwarder priority advertised by a secondary owner learned from a peer.
pub const VF_SECONDARY_PRIORITY: u8 = 135;

/// Virtual gateway election state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// Group exists but has no virtual IP; inert.
    Disabled,
    /// Starting point and the state entered on interface-down.
    Init,
    /// Tracking peer hellos, not advertising.
    Listen,
    /// Contending for the Standby/Active roles.
    Speak,
    /// Next in line for the Active role.
    Standby,
    /// Active Virtual Gateway for the group.
    Active,
}

impl GatewayState {
    /// Wire encoding of the gateway state in a Hello option.
    pub fn to_wire(self) -> u8 {
        match self {
            GatewayState::Init => 1,
            GatewayState::Listen => 2,
            GatewayState::Speak => 4,
            GatewayState::Standby => 8,
            GatewayState::Active => 16,
            GatewayState::Disabled => 32,
        }
    }

    /// Decode a gateway state from its wire value.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(GatewayState::Init),
            2 => Some(GatewayState::Listen),
            4 => Some(GatewayState::Speak),
            8 => Some(GatewayState::Standby),
            16 => Some(GatewayState::Active),
            32 => Some(GatewayState::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayState::Disabled => write!(f, "DISABLED"),
            GatewayState::Init => write!(f, "INIT"),
            GatewayState::Listen => write!(f, "LISTEN"),
            GatewayState::Speak => write!(f, "SPEAK"),
            GatewayState::Standby => write!(f, "STANDBY"),
            GatewayState::Active => write!(f, "ACTIVE"),
        }
    }
}

/// Virtual forwarder election state (per slot, independent of the gateway).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderState {
    /// Slot is empty or was torn down.
    Disabled,
    /// State entered on interface-down; keeps the assigned number.
    Init,
    /// Waiting out the active timer before claiming the slot.
    Listen,
    /// Forwarding traffic for the slot's virtual MAC.
    Active,
}

impl ForwarderState {
    /// Wire encoding of the forwarder state in a Request/Response option.
    ///
    /// Zero is reserved for "unknown" (bare requests and assignment
    /// responses) and maps to `None` at the codec boundary.
    pub fn to_wire(self) -> u8 {
        match self {
            ForwarderState::Init => 1,
            ForwarderState::Listen => 2,
            ForwarderState::Active => 16,
            ForwarderState::Disabled => 32,
        }
    }

    /// Decode a forwarder state from its wire value.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(ForwarderState::Init),
            2 => Some(ForwarderState::Listen),
            16 => Some(ForwarderState::Active),
            32 => Some(ForwarderState::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for ForwarderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwarderState::Disabled => write!(f, "DISABLED"),
            ForwarderState::Init => write!(f, "INIT"),
            ForwarderState::Listen => write!(f, "LISTEN"),
            ForwarderState::Active => write!(f, "ACTIVE"),
        }
    }
}

/// A 48-bit MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// The all-zero MAC carried in bare forwarder requests.
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("invalid MAC: {s}"))?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| format!("invalid MAC: {s}"))?;
        }
        if parts.next().is_some() {
            return Err(format!("invalid MAC: {s}"));
        }
        Ok(MacAddr(octets))
    }
}

/// Derive the virtual MAC for a forwarder slot.
///
/// Layout is `00:07:b4:0g:gg:ff` where `g` carries the 10-bit group number
/// (two high bits in byte 3, low byte in byte 4) and `ff` is the 1-based
/// forwarder number.
pub fn virtual_mac(group: u16, forwarder: u8) -> MacAddr {
    MacAddr::new([
        0x00,
        0x07,
        0xb4,
        ((group >> 8) & 0x03) as u8,
        (group & 0xff) as u8,
        forwarder,
    ])
}

/// Compare a peer's advertised (priority, source address) against our own.
///
/// Returns true when the local side outranks the peer: a peer advertising a
/// numerically lower priority loses outright, and equal priorities fall back
/// to numeric IPv4 comparison with the greater address winning, evaluated
/// from the local side. The exact comparison direction is load-bearing for
/// interoperability and is pinned by unit tests; do not reorder it.
pub fn local_outranks(
    peer_priority: u8,
    peer_addr: Ipv4Addr,
    local_priority: u8,
    local_addr: Ipv4Addr,
) -> bool {
    if peer_priority < local_priority {
        true
    } else if peer_priority > local_priority {
        false
    } else {
        local_addr > peer_addr
    }
}

/// GLBP group configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlbpConfig {
    /// Group number (0-1023; ten bits of the virtual MAC).
    pub group: u16,

    /// Virtual IP for the group. `None` leaves the group in Disabled state.
    pub virtual_ip: Option<Ipv4Addr>,

    /// Gateway election priority (higher value wins).
    pub priority: u8,

    /// Weight advertised for this router's forwarders.
    pub weight: u8,

    /// Whether a higher-priority router takes over a lower-priority Active peer.
    pub preempt: bool,

    /// Interval between periodic hellos.
    pub hello_interval: Duration,

    /// Peer-liveness timeout; governs the active and standby timers.
    pub hold_interval: Duration,

    /// How long clients keep being redirected to a departed primary forwarder.
    pub redirect_interval: Duration,

    /// How long until a departed primary forwarder's slot is decommissioned.
    pub timeout_interval: Duration,

    /// Add a uniform [0, 1) second jitter to every scheduled timer.
    pub jittered: bool,

    /// Owning network interface name.
    pub interface: String,

    /// Destination for multicast protocol traffic.
    pub multicast_addr: Ipv4Addr,

    /// UDP port for protocol traffic.
    pub udp_port: u16,
}

impl Default for GlbpConfig {
    fn default() -> Self {
        Self {
            group: 1,
            virtual_ip: None,
            priority: 100,
            weight: 100,
            preempt: false,
            hello_interval: Duration::from_secs(3),
            hold_interval: Duration::from_secs(10),
            redirect_interval: Duration::from_secs(600),
            timeout_interval: Duration::from_secs(14400),
            jittered: true,
            interface: String::from("eth0"),
            multicast_addr: GLBP_MULTICAST_ADDR,
            udp_port: GLBP_UDP_PORT,
        }
    }
}

impl GlbpConfig {
    /// Validate configuration.
    pub fn validate(&self) -> common::Result<()> {
        if self.group > 1023 {
            return Err(common::Error::config("group must be between 0 and 1023"));
        }

        if self.priority == 0 {
            return Err(common::Error::config("priority must be between 1 and 255"));
        }

        if self.hello_interval.is_zero() {
            return Err(common::Error::config("hello interval must be non-zero"));
        }

        if self.hold_interval <= self.hello_interval {
            return Err(common::Error::config(
                "hold interval must be greater than the hello interval",
            ));
        }

        // Both travel in 16-bit seconds fields of the hello option.
        if self.redirect_interval.as_secs() > u64::from(u16::MAX) {
            return Err(common::Error::config(
                "redirect interval must be at most 65535 seconds",
            ));
        }

        if self.timeout_interval.as_secs() > u64::from(u16::MAX) {
            return Err(common::Error::config(
                "timeout interval must be at most 65535 seconds",
            ));
        }

        if self.interface.is_empty() {
            return Err(common::Error::config("interface name is required"));
        }

        Ok(())
    }
}

/// GLBP statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlbpStats {
    /// Hello and combined messages sent.
    pub hellos_sent: u64,

    /// Hello options received from peers.
    pub hellos_received: u64,

    /// Bare forwarder requests sent.
    pub requests_sent: u64,

    /// Forwarder responses and advertisements sent.
    pub responses_sent: u64,

    /// Forwarder advertisements received from peers.
    pub adverts_received: u64,

    /// Gateway state transitions.
    pub gateway_transitions: u64,

    /// Forwarder slot state transitions.
    pub vf_transitions: u64,
}
