//! GLBP state machine implementation.
//!
//! One [`GlbpGroup`] runs the virtual-gateway election for a group on an
//! interface and owns the group's four virtual-forwarder slots, each with
//! its own election. All transitions happen inside [`GlbpGroup::handle_timer`],
//! [`GlbpGroup::handle_message`], and [`GlbpGroup::handle_interface_event`],
//! which the runner invokes strictly sequentially.
//!
//! Gateway transitions:
//! - Init → Listen (virtual IP configured) or Disabled (not configured)
//! - Listen → Speak on active/standby timer expiry
//! - Speak → Standby / Active on timer expiry, Speak ⇄ Listen on peer hellos
//! - Active → Speak when a better Active peer is heard
//! - any state → Init on interface-down

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::iface::{InterfaceEvent, InterfaceInfo, VfTable};
use crate::message::{GlbpMessage, HelloOption, ReqRespOption};
use crate::timer::{TimerEvent, TimerSet};
use crate::transport::Transport;
use crate::types::{
    ForwarderState, GatewayState, GlbpConfig, GlbpStats, MacAddr, local_outranks, virtual_mac,
    VF_MAX, VF_PRIMARY_PRIORITY, VF_SECONDARY_PRIORITY,
};

/// Source of timer jitter in [0, 1) seconds.
pub type JitterSource = Box<dyn FnMut() -> f64 + Send>;

/// One virtual forwarder slot.
///
/// `forwarder` is the 1-based wire number; 0 means the slot was never
/// assigned. Once assigned the number never changes until the slot is torn
/// down.
#[derive(Debug, Clone, Copy)]
pub struct VfSlot {
    pub state: ForwarderState,
    pub priority: u8,
    pub weight: u8,
    pub forwarder: u8,
    pub mac: MacAddr,
    /// Physical MAC of the router that originated this forwarder.
    pub primary: Option<MacAddr>,
}

impl VfSlot {
    fn unassigned() -> Self {
        Self {
            state: ForwarderState::Disabled,
            priority: 0,
            weight: 0,
            forwarder: 0,
            mac: MacAddr::ZERO,
            primary: None,
        }
    }

    pub fn assigned(&self) -> bool {
        self.forwarder != 0
    }
}

/// GLBP group state machine: gateway election plus forwarder slots.
pub struct GlbpGroup<T: Transport> {
    config: GlbpConfig,
    iface: InterfaceInfo,
    state: GatewayState,
    slots: [VfSlot; VF_MAX],
    /// Round-robin forwarder assignment counter (1-based, capped).
    next_forwarder: u8,
    timers: TimerSet,
    transport: T,
    vf_table: VfTable,
    stats: GlbpStats,
    jitter: JitterSource,
}

impl<T: Transport> GlbpGroup<T> {
    /// Create a group with the default jitter source (`rand`).
    pub fn new(config: GlbpConfig, iface: InterfaceInfo, transport: T) -> common::Result<Self> {
        Self::with_jitter(config, iface, transport, Box::new(rand::random::<f64>))
    }

    /// Create a group with an injected jitter source (deterministic tests).
    pub fn with_jitter(
        config: GlbpConfig,
        iface: InterfaceInfo,
        transport: T,
        jitter: JitterSource,
    ) -> common::Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            iface,
            state: GatewayState::Init,
            slots: [VfSlot::unassigned(); VF_MAX],
            next_forwarder: 1,
            timers: TimerSet::new(),
            transport,
            vf_table: VfTable::new(),
            stats: GlbpStats::default(),
            jitter,
        })
    }

    /// Start the group: Init → Listen, or Disabled without a virtual IP.
    pub fn start(&mut self) {
        info!(
            group = self.config.group,
            interface = %self.iface.name,
            priority = self.config.priority,
            preempt = self.config.preempt,
            "starting GLBP group"
        );
        self.init_state();
    }

    /// Cancel every pending timer and return to Init.
    ///
    /// Called on group teardown; afterwards no timer callback can fire.
    pub fn stop(&mut self) {
        self.stop_vfs();
        self.timers.cancel_all();
        if self.state != GatewayState::Disabled && self.state != GatewayState::Init {
            self.transition(GatewayState::Init);
        }
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub fn stats(&self) -> GlbpStats {
        self.stats
    }

    pub fn config(&self) -> &GlbpConfig {
        &self.config
    }

    pub fn vf_table(&self) -> &VfTable {
        &self.vf_table
    }

    /// Forwarder slot by 1-based number.
    pub fn vf_slot(&self, forwarder: u8) -> Option<&VfSlot> {
        self.slots.get(usize::from(forwarder).checked_sub(1)?)
    }

    /// Round-robin assignment counter.
    pub fn next_forwarder(&self) -> u8 {
        self.next_forwarder
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_timer_scheduled(&self, event: TimerEvent) -> bool {
        self.timers.is_scheduled(event)
    }

    /// Earliest pending timer deadline (for the runner's sleep).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at or before `now`, in deadline order.
    pub fn fire_due_timers(&mut self, now: Instant) {
        while let Some(event) = self.timers.pop_due(now) {
            self.handle_timer(event);
        }
    }

    fn init_state(&mut self) {
        if self.config.virtual_ip.is_some() {
            self.transition(GatewayState::Listen);
            self.schedule_timer(TimerEvent::Hello);
            self.schedule_timer(TimerEvent::ActiveGateway);
            self.schedule_timer(TimerEvent::StandbyGateway);
        } else {
            info!(
                group = self.config.group,
                "no virtual IP configured, group disabled"
            );
            self.transition(GatewayState::Disabled);
        }
    }

    fn transition(&mut self, to: GatewayState) {
        info!(
            group = self.config.group,
            interface = %self.iface.name,
            from = %self.state,
            to = %to,
            "gateway state transition"
        );
        self.state = to;
        self.stats.gateway_transitions += 1;
    }

    fn vf_transition(&mut self, slot: usize, to: ForwarderState) {
        let from = self.slots[slot].state;
        info!(
            group = self.config.group,
            forwarder = slot + 1,
            from = %from,
            to = %to,
            "forwarder state transition"
        );
        self.slots[slot].state = to;
        self.stats.vf_transitions += 1;
    }

    /// Arm (or re-arm) a timer; any pending deadline for the same event is
    /// replaced, never duplicated.
    fn schedule_timer(&mut self, event: TimerEvent) {
        let base = match event {
            TimerEvent::Hello => self.config.hello_interval,
            TimerEvent::ActiveGateway | TimerEvent::StandbyGateway | TimerEvent::VfActive(_) => {
                self.config.hold_interval
            }
            TimerEvent::VfRedirect(_) => self.config.redirect_interval,
            TimerEvent::VfTimeout(_) => self.config.timeout_interval,
        };
        let jitter = if self.config.jittered {
            Duration::from_secs_f64((self.jitter)())
        } else {
            Duration::ZERO
        };
        self.timers.schedule(event, Instant::now() + base + jitter);
    }

    /// Handle a timer expiry event.
    pub fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::VfActive(_) | TimerEvent::VfRedirect(_) | TimerEvent::VfTimeout(_) => {
                self.handle_vf_timer(event)
            }
            _ => self.handle_gateway_timer(event),
        }
    }

    fn handle_gateway_timer(&mut self, event: TimerEvent) {
        match self.state {
            GatewayState::Listen => match event {
                TimerEvent::ActiveGateway => {
                    self.schedule_timer(TimerEvent::ActiveGateway);
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Speak);
                    self.schedule_timer(TimerEvent::Hello);
                    self.send_hello();
                }
                TimerEvent::StandbyGateway => {
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Speak);
                    self.schedule_timer(TimerEvent::Hello);
                    self.send_hello();
                }
                TimerEvent::Hello => {
                    self.schedule_timer(TimerEvent::Hello);
                    self.send_periodic();
                }
                _ => {}
            },
            GatewayState::Speak => match event {
                TimerEvent::StandbyGateway => {
                    self.timers.cancel(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Standby);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                }
                TimerEvent::ActiveGateway => {
                    self.timers.cancel(TimerEvent::ActiveGateway);
                    self.transition(GatewayState::Active);
                    // Becoming AVG with no forwarder: self-elect the next
                    // number and advertise it alongside the hello.
                    let n = self.next_forwarder;
                    self.start_vf(n);
                    self.advance_forwarder();
                    self.send_combined();
                    self.schedule_timer(TimerEvent::Hello);
                }
                TimerEvent::Hello => {
                    self.send_periodic();
                    self.schedule_timer(TimerEvent::Hello);
                }
                _ => {}
            },
            GatewayState::Standby => match event {
                TimerEvent::ActiveGateway => {
                    self.timers.cancel(TimerEvent::StandbyGateway);
                    self.timers.cancel(TimerEvent::ActiveGateway);
                    self.transition(GatewayState::Active);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                }
                TimerEvent::Hello => {
                    self.send_periodic();
                    self.schedule_timer(TimerEvent::Hello);
                }
                _ => {}
            },
            GatewayState::Active => match event {
                TimerEvent::Hello => {
                    self.send_periodic();
                    self.schedule_timer(TimerEvent::Hello);
                }
                TimerEvent::StandbyGateway => {
                    debug!(
                        group = self.config.group,
                        "standby peer lost, standby router unknown"
                    );
                }
                _ => {}
            },
            GatewayState::Init | GatewayState::Disabled => {
                debug!(group = self.config.group, %event, "timer ignored in inert state");
            }
        }
    }

    fn handle_vf_timer(&mut self, event: TimerEvent) {
        let (TimerEvent::VfActive(i)
        | TimerEvent::VfRedirect(i)
        | TimerEvent::VfTimeout(i)) = event
        else {
            return;
        };
        if self.slots.get(i).is_none() {
            debug!(
                group = self.config.group,
                %event,
                "timer for out-of-range forwarder slot ignored"
            );
            return;
        }

        match event {
            TimerEvent::VfActive(i) => {
                // No competing claim arrived in time: take the slot.
                if self.slots[i].state == ForwarderState::Listen {
                    self.vf_transition(i, ForwarderState::Active);
                    let n = self.slots[i].forwarder;
                    self.vf_table.set_enabled(n, true);
                    self.send_forwarder_advert(i);
                    self.schedule_timer(TimerEvent::VfRedirect(i));
                    self.schedule_timer(TimerEvent::VfTimeout(i));
                }
            }
            TimerEvent::VfRedirect(i) => {
                // Grace period for the departed primary is over; hosts are
                // no longer steered to it. Forwarding itself is unaffected.
                if self.slots[i].assigned() && self.slots[i].primary != Some(self.iface.mac) {
                    info!(
                        group = self.config.group,
                        forwarder = i + 1,
                        "redirect period for departed primary ended"
                    );
                }
            }
            TimerEvent::VfTimeout(i) => {
                // A slot held on behalf of a departed primary is
                // decommissioned outright; its virtual MAC is retired.
                if self.slots[i].assigned() && self.slots[i].priority == VF_SECONDARY_PRIORITY {
                    let n = self.slots[i].forwarder;
                    info!(
                        group = self.config.group,
                        forwarder = n,
                        "timeout expired, decommissioning forwarder"
                    );
                    self.timers.cancel(TimerEvent::VfActive(i));
                    self.timers.cancel(TimerEvent::VfRedirect(i));
                    self.vf_table.remove(n);
                    self.slots[i] = VfSlot::unassigned();
                }
            }
            _ => {}
        }
    }

    /// Handle a decoded message received from `src`.
    pub fn handle_message(&mut self, msg: &GlbpMessage, src: Ipv4Addr) {
        if msg.group != self.config.group {
            debug!(
                group = self.config.group,
                their_group = msg.group,
                "ignoring message for another group"
            );
            return;
        }

        if msg.hello.is_some() {
            self.stats.hellos_received += 1;
        }
        if !msg.forwarders.is_empty() {
            self.stats.adverts_received += 1;
        }

        // Forwarder elections run on every advertised claim, independent of
        // the gateway role.
        for rr in msg.forwarders.clone() {
            self.handle_vf_claim(&rr, src);
        }

        if let Some(hello) = msg.hello.clone() {
            match self.state {
                GatewayState::Listen => self.handle_hello_listen(&hello, src),
                GatewayState::Speak => self.handle_hello_speak(&hello, src),
                GatewayState::Standby => self.handle_hello_standby(&hello, src),
                GatewayState::Active => self.handle_hello_active(&hello, src),
                GatewayState::Init | GatewayState::Disabled => {}
            }
        } else if let Some(rr) = msg.forwarders.first().cloned() {
            match self.state {
                GatewayState::Active => {
                    if rr.forwarder == 0 {
                        // Bare request: hand out a forwarder assignment.
                        self.send_assignment(src);
                    } else {
                        self.add_vf(rr.forwarder, msg.owner);
                    }
                }
                GatewayState::Listen | GatewayState::Speak | GatewayState::Standby => {
                    self.add_or_start_vf(&rr, msg.owner);
                }
                GatewayState::Init | GatewayState::Disabled => {}
            }
        }
    }

    /// True when the local router outranks the peer hello.
    fn outranks_hello(&self, hello: &HelloOption, src: Ipv4Addr) -> bool {
        local_outranks(hello.priority, src, self.config.priority, self.iface.ip)
    }

    fn handle_hello_listen(&mut self, hello: &HelloOption, src: Ipv4Addr) {
        match hello.vg_state {
            GatewayState::Speak => {
                if !self.outranks_hello(hello, src) {
                    self.schedule_timer(TimerEvent::StandbyGateway);
                }
            }
            GatewayState::Standby => {
                if self.outranks_hello(hello, src) {
                    self.transition(GatewayState::Speak);
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                }
            }
            GatewayState::Active => {
                if self.outranks_hello(hello, src) && self.config.preempt {
                    self.transition(GatewayState::Speak);
                    self.schedule_timer(TimerEvent::ActiveGateway);
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                } else {
                    if !self.is_vf_active() {
                        self.send_request(src);
                    }
                    self.schedule_timer(TimerEvent::ActiveGateway);
                }
            }
            _ => {}
        }
    }

    fn handle_hello_speak(&mut self, hello: &HelloOption, src: Ipv4Addr) {
        match hello.vg_state {
            GatewayState::Speak => {
                if !self.outranks_hello(hello, src) {
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.schedule_timer(TimerEvent::Hello);
                    self.transition(GatewayState::Listen);
                }
            }
            GatewayState::Standby => {
                if !self.outranks_hello(hello, src) {
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.schedule_timer(TimerEvent::Hello);
                    self.transition(GatewayState::Listen);
                } else {
                    self.timers.cancel(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Standby);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                }
            }
            GatewayState::Active => {
                if self.outranks_hello(hello, src) && self.config.preempt {
                    self.timers.cancel(TimerEvent::ActiveGateway);
                    self.timers.cancel(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Active);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                } else {
                    if !self.is_vf_active() {
                        self.send_request(src);
                    }
                    self.schedule_timer(TimerEvent::ActiveGateway);
                }
            }
            _ => {}
        }
    }

    fn handle_hello_standby(&mut self, hello: &HelloOption, src: Ipv4Addr) {
        match hello.vg_state {
            GatewayState::Speak => {
                if !self.outranks_hello(hello, src) {
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.schedule_timer(TimerEvent::Hello);
                    self.transition(GatewayState::Listen);
                }
            }
            GatewayState::Active => {
                if !self.outranks_hello(hello, src) {
                    if !self.is_vf_active() {
                        self.send_request(src);
                    }
                    self.schedule_timer(TimerEvent::ActiveGateway);
                } else if self.config.preempt {
                    self.timers.cancel(TimerEvent::ActiveGateway);
                    self.timers.cancel(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Active);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                } else {
                    if !self.is_vf_active() {
                        self.send_request(src);
                    }
                    self.schedule_timer(TimerEvent::ActiveGateway);
                }
            }
            _ => {}
        }
    }

    fn handle_hello_active(&mut self, hello: &HelloOption, src: Ipv4Addr) {
        match hello.vg_state {
            GatewayState::Standby => {
                self.schedule_timer(TimerEvent::StandbyGateway);
            }
            GatewayState::Active => {
                if !self.outranks_hello(hello, src) {
                    self.schedule_timer(TimerEvent::ActiveGateway);
                    self.schedule_timer(TimerEvent::StandbyGateway);
                    self.transition(GatewayState::Speak);
                    self.send_hello();
                    self.schedule_timer(TimerEvent::Hello);
                }
            }
            _ => {}
        }
    }

    /// Run the forwarder election for a peer's advertised Active claim.
    fn handle_vf_claim(&mut self, rr: &ReqRespOption, src: Ipv4Addr) {
        if rr.vf_state != Some(ForwarderState::Active) {
            return;
        }
        let Some(i) = usize::from(rr.forwarder)
            .checked_sub(1)
            .filter(|i| *i < VF_MAX)
        else {
            return;
        };

        let local_wins = local_outranks(rr.priority, src, self.slots[i].priority, self.iface.ip);

        match self.slots[i].state {
            ForwarderState::Listen => {
                if !local_wins {
                    // Defer to the claimant; restart the election window.
                    self.schedule_timer(TimerEvent::VfActive(i));
                } else {
                    self.timers.cancel(TimerEvent::VfActive(i));
                    self.vf_transition(i, ForwarderState::Active);
                    let n = self.slots[i].forwarder;
                    self.vf_table.set_enabled(n, true);
                    self.send_forwarder_advert(i);
                }
            }
            ForwarderState::Active => {
                if !local_wins {
                    // Yield the slot to a better claim.
                    self.schedule_timer(TimerEvent::VfActive(i));
                    self.vf_transition(i, ForwarderState::Listen);
                    let n = self.slots[i].forwarder;
                    self.vf_table.set_enabled(n, false);
                }
            }
            _ => {}
        }
    }

    /// Start or adopt a forwarder advertised by a peer while not Active.
    fn add_or_start_vf(&mut self, rr: &ReqRespOption, owner: MacAddr) {
        // Keep the round-robin counter ahead of everything seen on the wire.
        if rr.forwarder <= VF_MAX as u8 && rr.forwarder > self.next_forwarder {
            self.next_forwarder = rr.forwarder;
        }

        if rr.vf_state.is_none() {
            // An assignment from the AVG: become primary for this number.
            if rr.forwarder == 0 {
                return;
            }
            if rr.forwarder > VF_MAX as u8 {
                warn!(
                    group = self.config.group,
                    forwarder = rr.forwarder,
                    "forwarder number exceeds the slot limit, ignoring assignment"
                );
                return;
            }
            self.start_vf(rr.forwarder);
        } else if let Some(slot) = self.vf_slot(rr.forwarder) {
            // A populated advertisement for a slot we know nothing about:
            // adopt it as a secondary owner.
            if slot.state == ForwarderState::Disabled {
                self.add_vf(rr.forwarder, owner);
            }
        }
    }

    /// Populate slot `n` as a self-elected primary and start its election.
    fn start_vf(&mut self, n: u8) {
        let Some(i) = usize::from(n).checked_sub(1).filter(|i| *i < VF_MAX) else {
            warn!(
                group = self.config.group,
                forwarder = n,
                "forwarder number out of range, not started"
            );
            return;
        };
        let Some(virtual_ip) = self.config.virtual_ip else {
            return;
        };

        let mac = virtual_mac(self.config.group, n);
        let slot = &mut self.slots[i];
        slot.forwarder = n;
        slot.mac = mac;
        slot.priority = VF_PRIMARY_PRIORITY;
        slot.weight = self.config.weight;
        slot.primary = Some(self.iface.mac);

        self.vf_table.upsert(n, mac, virtual_ip);
        self.vf_transition(i, ForwarderState::Listen);
        self.schedule_timer(TimerEvent::VfActive(i));

        info!(
            group = self.config.group,
            forwarder = n,
            mac = %mac,
            "started forwarder as primary"
        );
    }

    /// Adopt slot `n` as a secondary owner learned from `owner`.
    fn add_vf(&mut self, n: u8, owner: MacAddr) {
        let Some(i) = usize::from(n).checked_sub(1).filter(|i| *i < VF_MAX) else {
            warn!(
                group = self.config.group,
                forwarder = n,
                "forwarder number out of range, not added"
            );
            return;
        };
        if self.slots[i].assigned() {
            return;
        }
        let Some(virtual_ip) = self.config.virtual_ip else {
            return;
        };

        let mac = virtual_mac(self.config.group, n);
        let slot = &mut self.slots[i];
        slot.forwarder = n;
        slot.mac = mac;
        slot.priority = VF_SECONDARY_PRIORITY;
        slot.weight = self.config.weight;
        slot.primary = Some(owner);

        self.vf_table.upsert(n, mac, virtual_ip);
        self.vf_transition(i, ForwarderState::Listen);
        self.schedule_timer(TimerEvent::VfActive(i));

        info!(
            group = self.config.group,
            forwarder = n,
            primary = %owner,
            "added forwarder as secondary"
        );
    }

    fn advance_forwarder(&mut self) {
        if self.next_forwarder <= VF_MAX as u8 {
            self.next_forwarder += 1;
        }
    }

    /// Whether any slot is held as a self-elected primary.
    pub fn is_vf_active(&self) -> bool {
        self.slots
            .iter()
            .any(|s| s.primary.is_some() && s.priority == VF_PRIMARY_PRIORITY)
    }

    /// Handle an interface up/down notification. Events for other
    /// interfaces are ignored.
    pub fn handle_interface_event(&mut self, event: &InterfaceEvent) {
        if event.interface_id != self.iface.id {
            return;
        }
        if event.up {
            info!(group = self.config.group, interface = %self.iface.name, "interface up");
            self.interface_up();
        } else {
            info!(group = self.config.group, interface = %self.iface.name, "interface down");
            self.interface_down();
        }
    }

    fn interface_down(&mut self) {
        self.timers.cancel(TimerEvent::Hello);
        self.timers.cancel(TimerEvent::ActiveGateway);
        self.timers.cancel(TimerEvent::StandbyGateway);
        self.transition(GatewayState::Init);
        self.stop_vfs();
    }

    fn stop_vfs(&mut self) {
        for i in 0..VF_MAX {
            self.timers.cancel(TimerEvent::VfActive(i));
            self.timers.cancel(TimerEvent::VfRedirect(i));
            self.timers.cancel(TimerEvent::VfTimeout(i));

            if self.slots[i].assigned() {
                self.vf_transition(i, ForwarderState::Init);
                let n = self.slots[i].forwarder;
                self.vf_table.set_enabled(n, false);
            }
        }
    }

    fn interface_up(&mut self) {
        self.init_state();
        // Previously assigned slots re-contest their elections from
        // scratch; prior Active status does not survive a flap.
        for i in 0..VF_MAX {
            if self.slots[i].assigned() {
                self.vf_transition(i, ForwarderState::Listen);
                self.schedule_timer(TimerEvent::VfActive(i));
            }
        }
    }

    fn hello_option(&self) -> HelloOption {
        HelloOption {
            vg_state: self.state,
            priority: self.config.priority,
            hello_interval: self.config.hello_interval,
            hold_interval: self.config.hold_interval,
            redirect: self.config.redirect_interval.as_secs() as u16,
            timeout: self.config.timeout_interval.as_secs() as u16,
            virtual_ip: self.config.virtual_ip.unwrap_or(Ipv4Addr::UNSPECIFIED),
        }
    }

    fn reqresp_option(&self, i: usize) -> ReqRespOption {
        let slot = &self.slots[i];
        ReqRespOption {
            forwarder: slot.forwarder,
            vf_state: Some(slot.state),
            priority: slot.priority,
            weight: slot.weight,
            mac: slot.mac,
        }
    }

    fn multicast_dest(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.config.multicast_addr, self.config.udp_port)
    }

    fn send_to(&mut self, dest: SocketAddrV4, msg: &GlbpMessage) {
        let payload = msg.encode();
        if let Err(e) = self.transport.send(dest, &payload) {
            warn!(
                group = self.config.group,
                error = %e,
                "failed to send message"
            );
        }
    }

    fn send_hello(&mut self) {
        let msg = GlbpMessage {
            group: self.config.group,
            owner: self.iface.mac,
            hello: Some(self.hello_option()),
            forwarders: vec![],
        };
        let dest = self.multicast_dest();
        self.send_to(dest, &msg);
        self.stats.hellos_sent += 1;
        debug!(group = self.config.group, state = %self.state, "sent hello");
    }

    /// Periodic advertisement: combined when we hold a primary forwarder.
    fn send_periodic(&mut self) {
        if self.is_vf_active() {
            self.send_combined();
        } else {
            self.send_hello();
        }
    }

    /// Hello plus one advertisement per self-elected-primary or Active slot.
    fn send_combined(&mut self) {
        let forwarders: Vec<ReqRespOption> = (0..VF_MAX)
            .filter(|&i| {
                self.slots[i].priority == VF_PRIMARY_PRIORITY
                    || self.slots[i].state == ForwarderState::Active
            })
            .map(|i| self.reqresp_option(i))
            .collect();

        let msg = GlbpMessage {
            group: self.config.group,
            owner: self.iface.mac,
            hello: Some(self.hello_option()),
            forwarders,
        };
        let dest = self.multicast_dest();
        self.send_to(dest, &msg);
        self.stats.hellos_sent += 1;
        debug!(group = self.config.group, state = %self.state, "sent combined hello");
    }

    /// Multicast an advertisement for one slot.
    fn send_forwarder_advert(&mut self, i: usize) {
        let msg = GlbpMessage {
            group: self.config.group,
            owner: self.iface.mac,
            hello: None,
            forwarders: vec![self.reqresp_option(i)],
        };
        let dest = self.multicast_dest();
        self.send_to(dest, &msg);
        self.stats.responses_sent += 1;
        debug!(
            group = self.config.group,
            forwarder = i + 1,
            "sent forwarder advertisement"
        );
    }

    /// Unicast a bare forwarder request to the active gateway.
    fn send_request(&mut self, dest: Ipv4Addr) {
        let msg = GlbpMessage {
            group: self.config.group,
            owner: self.iface.mac,
            hello: None,
            forwarders: vec![ReqRespOption::request()],
        };
        let dest = SocketAddrV4::new(dest, self.config.udp_port);
        self.send_to(dest, &msg);
        self.stats.requests_sent += 1;
        debug!(group = self.config.group, "sent forwarder request");
    }

    /// Unicast a forwarder assignment to a requester.
    ///
    /// The response advertises the current counter value and advances it:
    /// sending an assignment always moves the round-robin on, whether or
    /// not the requester takes the number.
    fn send_assignment(&mut self, dest: Ipv4Addr) {
        if self.next_forwarder > VF_MAX as u8 {
            warn!(
                group = self.config.group,
                "forwarder numbers exhausted, re-advertising the highest"
            );
        }
        let n = self.next_forwarder.min(VF_MAX as u8);

        let msg = GlbpMessage {
            group: self.config.group,
            owner: self.iface.mac,
            hello: None,
            forwarders: vec![ReqRespOption {
                forwarder: n,
                vf_state: None,
                priority: 0,
                weight: 0,
                mac: virtual_mac(self.config.group, n),
            }],
        };
        let dest = SocketAddrV4::new(dest, self.config.udp_port);
        self.send_to(dest, &msg);
        self.advance_forwarder();
        self.stats.responses_sent += 1;
        debug!(
            group = self.config.group,
            forwarder = n,
            "sent forwarder assignment"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct NullTransport;

    impl Transport for NullTransport {
        fn send(&mut self, _dest: SocketAddrV4, _payload: &[u8]) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_iface() -> InterfaceInfo {
        InterfaceInfo {
            id: 1,
            name: "eth0".into(),
            mac: MacAddr::new([0x02, 0, 0, 0, 0, 0x01]),
            ip: "10.0.0.1".parse().unwrap(),
        }
    }

    fn test_group(virtual_ip: Option<Ipv4Addr>) -> GlbpGroup<NullTransport> {
        let config = GlbpConfig {
            virtual_ip,
            jittered: false,
            ..Default::default()
        };
        GlbpGroup::with_jitter(config, test_iface(), NullTransport, Box::new(|| 0.0)).unwrap()
    }

    #[test]
    fn test_unconfigured_group_disables() {
        let mut group = test_group(None);
        group.start();
        assert_eq!(group.state(), GatewayState::Disabled);
        assert!(!group.is_timer_scheduled(TimerEvent::Hello));
    }

    #[test]
    fn test_configured_group_listens_with_timers() {
        let mut group = test_group(Some("10.0.0.254".parse().unwrap()));
        group.start();
        assert_eq!(group.state(), GatewayState::Listen);
        assert!(group.is_timer_scheduled(TimerEvent::Hello));
        assert!(group.is_timer_scheduled(TimerEvent::ActiveGateway));
        assert!(group.is_timer_scheduled(TimerEvent::StandbyGateway));
    }

    #[test]
    fn test_round_robin_counter_caps() {
        let mut group = test_group(Some("10.0.0.254".parse().unwrap()));
        assert_eq!(group.next_forwarder(), 1);
        for _ in 0..10 {
            group.advance_forwarder();
        }
        assert_eq!(group.next_forwarder(), VF_MAX as u8 + 1);
    }

    #[test]
    fn test_start_vf_rejects_out_of_range() {
        let mut group = test_group(Some("10.0.0.254".parse().unwrap()));
        group.start_vf(5);
        group.start_vf(0);
        assert!(group.slots.iter().all(|s| !s.assigned()));
        assert!(group.vf_table().is_empty());
    }

    #[test]
    fn test_vf_timer_with_out_of_range_slot_ignored() {
        let mut group = test_group(Some("10.0.0.254".parse().unwrap()));
        group.start();

        group.handle_timer(TimerEvent::VfActive(VF_MAX));
        group.handle_timer(TimerEvent::VfRedirect(9));
        group.handle_timer(TimerEvent::VfTimeout(usize::MAX));

        assert_eq!(group.state(), GatewayState::Listen);
        assert!(group.slots.iter().all(|s| !s.assigned()));
    }

    #[test]
    fn test_stop_cancels_everything() {
        let mut group = test_group(Some("10.0.0.254".parse().unwrap()));
        group.start();
        group.start_vf(1);
        assert!(!group.timers.is_empty());
        group.stop();
        assert!(group.timers.is_empty());
        assert_eq!(group.state(), GatewayState::Init);
    }
}
