//! Interface identity, liveness notifications, and the per-interface
//! virtual-forwarder table.
//!
//! The forwarder table is the group's produced interface: the IP forwarding
//! path consults it to dispatch packets addressed to a virtual forwarder
//! MAC.

use crate::types::MacAddr;
use std::net::Ipv4Addr;

/// Identity of the physical interface a GLBP group runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Interface table id.
    pub id: u32,

    /// Interface name.
    pub name: String,

    /// Physical MAC address.
    pub mac: MacAddr,

    /// Primary IPv4 address (the protocol source address).
    pub ip: Ipv4Addr,
}

/// Interface up/down notification from the interface table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceEvent {
    /// Which interface changed state.
    pub interface_id: u32,

    /// New carrier state.
    pub up: bool,
}

/// One virtual forwarder published to the interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfTableEntry {
    /// 1-based forwarder number.
    pub forwarder: u8,

    /// Virtual MAC hosts address their traffic to.
    pub mac: MacAddr,

    /// Virtual IP of the owning group.
    pub virtual_ip: Ipv4Addr,

    /// Whether this router currently forwards for the virtual MAC.
    pub enabled: bool,
}

/// Virtual-forwarder table for one interface.
#[derive(Debug, Default)]
pub struct VfTable {
    entries: Vec<VfTableEntry>,
}

impl VfTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a forwarder entry; new entries start disabled.
    pub fn upsert(&mut self, forwarder: u8, mac: MacAddr, virtual_ip: Ipv4Addr) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.forwarder == forwarder) {
            entry.mac = mac;
            entry.virtual_ip = virtual_ip;
        } else {
            self.entries.push(VfTableEntry {
                forwarder,
                mac,
                virtual_ip,
                enabled: false,
            });
        }
    }

    /// Mark a forwarder as forwarding (or not).
    pub fn set_enabled(&mut self, forwarder: u8, enabled: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.forwarder == forwarder) {
            entry.enabled = enabled;
        }
    }

    /// Remove a forwarder entry entirely.
    pub fn remove(&mut self, forwarder: u8) {
        self.entries.retain(|e| e.forwarder != forwarder);
    }

    pub fn get(&self, forwarder: u8) -> Option<&VfTableEntry> {
        self.entries.iter().find(|e| e.forwarder == forwarder)
    }

    /// Look up an entry by virtual MAC (the forwarding-path query).
    pub fn lookup_mac(&self, mac: MacAddr) -> Option<&VfTableEntry> {
        self.entries.iter().find(|e| e.mac == mac)
    }

    /// Entries this router is actively forwarding for.
    pub fn active(&self) -> impl Iterator<Item = &VfTableEntry> {
        self.entries.iter().filter(|e| e.enabled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::virtual_mac;

    #[test]
    fn test_vf_table_lifecycle() {
        let mut table = VfTable::new();
        let vip: Ipv4Addr = "10.0.0.1".parse().unwrap();

        table.upsert(1, virtual_mac(1, 1), vip);
        assert_eq!(table.len(), 1);
        assert!(!table.get(1).unwrap().enabled);

        // Upsert refreshes without duplicating.
        table.upsert(1, virtual_mac(1, 1), vip);
        assert_eq!(table.len(), 1);

        table.set_enabled(1, true);
        assert!(table.get(1).unwrap().enabled);
        assert_eq!(table.active().count(), 1);
        assert_eq!(
            table.lookup_mac(virtual_mac(1, 1)).unwrap().forwarder,
            1
        );

        table.remove(1);
        assert!(table.is_empty());
    }
}
