//! Shared helpers: a recording transport and deterministic group setup.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;
use std::time::Duration;

use glbp::{GlbpConfig, GlbpGroup, GlbpMessage, InterfaceInfo, MacAddr, Transport};

/// Transport double that records every outbound datagram.
pub struct RecordingTransport {
    sent: Rc<RefCell<Vec<(SocketAddrV4, Vec<u8>)>>>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, dest: SocketAddrV4, payload: &[u8]) -> io::Result<()> {
        self.sent.borrow_mut().push((dest, payload.to_vec()));
        Ok(())
    }
}

/// Test-side handle onto a [`RecordingTransport`]'s sent datagrams.
#[derive(Clone)]
pub struct Wire {
    sent: Rc<RefCell<Vec<(SocketAddrV4, Vec<u8>)>>>,
}

impl Wire {
    /// Drain and decode everything sent since the last call.
    pub fn take(&self) -> Vec<(SocketAddrV4, GlbpMessage)> {
        self.sent
            .borrow_mut()
            .drain(..)
            .map(|(dest, payload)| {
                let msg = GlbpMessage::parse(&payload).expect("sent datagram must decode");
                (dest, msg)
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

pub fn recording_pair() -> (RecordingTransport, Wire) {
    let sent = Rc::new(RefCell::new(Vec::new()));
    (
        RecordingTransport { sent: sent.clone() },
        Wire { sent },
    )
}

pub fn test_config(priority: u8, preempt: bool) -> GlbpConfig {
    GlbpConfig {
        group: 1,
        virtual_ip: Some("10.0.0.254".parse().unwrap()),
        priority,
        preempt,
        jittered: false,
        hello_interval: Duration::from_secs(3),
        hold_interval: Duration::from_secs(10),
        ..Default::default()
    }
}

pub fn test_iface(host: u8) -> InterfaceInfo {
    InterfaceInfo {
        id: u32::from(host),
        name: format!("eth{host}"),
        mac: MacAddr::new([0x02, 0, 0, 0, 0, host]),
        ip: Ipv4Addr::new(10, 0, 0, host),
    }
}

/// A started group with the given election priority, plus its wire handle.
pub fn started_group(
    host: u8,
    priority: u8,
    preempt: bool,
) -> (GlbpGroup<RecordingTransport>, Wire) {
    let (transport, wire) = recording_pair();
    let mut group =
        GlbpGroup::with_jitter(test_config(priority, preempt), test_iface(host), transport, Box::new(|| 0.0))
            .unwrap();
    group.start();
    wire.clear();
    (group, wire)
}

/// Deliver each queued datagram from `wire` into `to`, as if received from
/// `src`. Unicast datagrams for other destinations are dropped.
pub fn deliver(wire: &Wire, to: &mut GlbpGroup<RecordingTransport>, src: Ipv4Addr, to_ip: Ipv4Addr) {
    for (dest, msg) in wire.take() {
        if dest.ip().is_multicast() || *dest.ip() == to_ip {
            to.handle_message(&msg, src);
        }
    }
}
