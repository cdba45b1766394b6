//! Gateway Load Balancing Protocol (GLBP)
//!
//! First-hop redundancy with built-in load balancing: routers in a group
//! elect one Active Virtual Gateway (AVG) that answers ARP for the shared
//! virtual IP, handing out up to four virtual forwarder MAC addresses in
//! round-robin so host traffic spreads across the group members.
//!
//! # Example
//!
//! ```no_run
//! use glbp::{GlbpConfig, GlbpNode, InterfaceInfo};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> common::Result<()> {
//! let mut config = GlbpConfig::default();
//! config.group = 1;
//! config.priority = 150;
//! config.virtual_ip = Some("192.168.1.1".parse().unwrap());
//!
//! let iface = InterfaceInfo {
//!     id: 1,
//!     name: "eth0".to_string(),
//!     mac: "02:00:00:00:00:01".parse().unwrap(),
//!     ip: "192.168.1.10".parse().unwrap(),
//! };
//!
//! let (_iface_tx, iface_rx) = mpsc::channel(16);
//! let mut node = GlbpNode::new(config, iface, iface_rx)?;
//! node.run().await?;
//! # Ok(())
//! # }
//! ```

mod iface;
mod message;
mod node;
mod state_machine;
mod timer;
mod transport;
mod types;

pub use iface::{InterfaceEvent, InterfaceInfo, VfTable, VfTableEntry};
pub use message::{CodecError, GlbpMessage, HelloOption, ReqRespOption, GLBP_VERSION};
pub use node::GlbpNode;
pub use state_machine::{GlbpGroup, JitterSource, VfSlot};
pub use timer::{TimerEvent, TimerSet};
pub use transport::{GlbpSocket, Transport};
pub use types::{
    local_outranks, virtual_mac, ForwarderState, GatewayState, GlbpConfig, GlbpStats, MacAddr,
    GLBP_MULTICAST_ADDR, GLBP_UDP_PORT, VF_MAX, VF_PRIMARY_PRIORITY, VF_SECONDARY_PRIORITY,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_types() {
        let config = GlbpConfig::default();
        assert_eq!(config.group, 1);
        assert_eq!(config.multicast_addr, GLBP_MULTICAST_ADDR);

        let state = GatewayState::Init;
        assert_eq!(state.to_string(), "INIT");
    }
}
