//! Async runner driving one GLBP group over a real socket.
//!
//! The state machine itself is synchronous; [`GlbpNode`] owns it together
//! with the multicast socket and an interface-event channel, and multiplexes
//! timer deadlines, inbound datagrams, and interface notifications onto it
//! from a single task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant as TokioInstant};
use tracing::{debug, info, warn};

use crate::iface::{InterfaceEvent, InterfaceInfo};
use crate::message::GlbpMessage;
use crate::state_machine::GlbpGroup;
use crate::transport::GlbpSocket;
use crate::types::{GlbpConfig, GlbpStats};

/// Receive poll interval while waiting for the next timer deadline.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One GLBP group bound to a live interface.
pub struct GlbpNode {
    group: GlbpGroup<GlbpSocket>,
    iface_events: mpsc::Receiver<InterfaceEvent>,
}

impl GlbpNode {
    /// Create a node: validates the configuration and opens the multicast
    /// socket on the interface.
    pub fn new(
        config: GlbpConfig,
        iface: InterfaceInfo,
        iface_events: mpsc::Receiver<InterfaceEvent>,
    ) -> common::Result<Self> {
        let socket = GlbpSocket::new(iface.ip, config.udp_port, config.multicast_addr)?;
        let group = GlbpGroup::new(config, iface, socket)?;

        Ok(Self {
            group,
            iface_events,
        })
    }

    pub fn stats(&self) -> GlbpStats {
        self.group.stats()
    }

    /// Run the group until the interface-event channel closes.
    pub async fn run(&mut self) -> common::Result<()> {
        self.group.start();

        loop {
            // The socket is nonblocking; poll it on a short tick and sleep
            // no longer than the earliest pending timer deadline.
            let deadline = self
                .group
                .next_deadline()
                .map(TokioInstant::from_std)
                .unwrap_or_else(|| TokioInstant::now() + RECV_POLL_INTERVAL);

            tokio::select! {
                _ = sleep_until(deadline) => {
                    self.group.fire_due_timers(std::time::Instant::now());
                }
                _ = sleep(RECV_POLL_INTERVAL) => {
                    self.drain_socket();
                }
                event = self.iface_events.recv() => {
                    match event {
                        Some(event) => self.group.handle_interface_event(&event),
                        None => {
                            info!("interface event channel closed, stopping group");
                            self.group.stop();
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Process every datagram currently queued on the socket.
    fn drain_socket(&mut self) {
        loop {
            match self.group.transport().try_recv() {
                Ok(Some((data, src))) => match GlbpMessage::parse(&data) {
                    Ok(msg) => self.group.handle_message(&msg, src),
                    Err(e) => {
                        debug!(source = %src, error = %e, "dropping malformed datagram");
                    }
                },
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "socket receive failed");
                    return;
                }
            }
        }
    }
}
