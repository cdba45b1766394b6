//! Simple GLBP example
//!
//! Runs one GLBP group on an interface. Start it on two machines (or two
//! netns) with different priorities to watch the election and forwarder
//! assignment happen.
//!
//! Usage:
//!   simple_glbp <interface> <local-ip> <local-mac> [priority]

use std::env;
use std::net::Ipv4Addr;

use anyhow::{anyhow, Context};
use glbp::{GlbpConfig, GlbpNode, InterfaceInfo, MacAddr};
use tokio::signal;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    common::logging::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <interface> <local-ip> <local-mac> [priority]", args[0]);
        std::process::exit(1);
    }

    let interface = args[1].clone();
    let local_ip: Ipv4Addr = args[2].parse().context("invalid local IP")?;
    let local_mac: MacAddr = args[3].parse().map_err(|e| anyhow!("{e}"))?;
    let priority: u8 = args.get(4).map_or(100, |p| p.parse().unwrap_or(100));

    let config = GlbpConfig {
        group: 1,
        virtual_ip: Some("192.168.1.1".parse()?),
        priority,
        preempt: true,
        interface: interface.clone(),
        ..Default::default()
    };
    config.validate()?;

    let iface = InterfaceInfo {
        id: 1,
        name: interface,
        mac: local_mac,
        ip: local_ip,
    };

    let (iface_tx, iface_rx) = mpsc::channel(16);
    let mut node = GlbpNode::new(config, iface, iface_rx)?;

    println!("GLBP group 1 on {} (priority {priority})", args[1]);
    println!("Press Ctrl+C to stop");

    tokio::select! {
        result = node.run() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            println!("shutting down");
            drop(iface_tx);
        }
    }

    let stats = node.stats();
    println!("hellos sent:        {}", stats.hellos_sent);
    println!("hellos received:    {}", stats.hellos_received);
    println!("responses sent:     {}", stats.responses_sent);
    println!("gateway transitions: {}", stats.gateway_transitions);

    Ok(())
}
