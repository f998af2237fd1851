/// ----- RELAY -----
/// Pass-through between a remote coordinator and the local hardware
/// endpoint: one packet in from upstream, forwarded unmodified to the
/// hardware, and whatever comes back (a reading, or the instruction's own
/// echo) is sent upstream again. No state, no retries beyond what the
/// transports already do. A silent upstream peer keeps the relay waiting;
/// that is accepted, not worked around.

use std::process;

use log::{error, warn};

use elevio_rust::elevio::transport::{
    CancelToken, HardwareLink, Node, Transport, TransportError,
};
use shared_resources::config::RelayConfig;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = RelayConfig::get();
    let cancel = CancelToken::new();
    let mut upstream = Node::bind(config.upstream_port, cancel.clone())?;
    let mut hardware = HardwareLink::connect(&config.server_addr, cancel)?;

    println!(
        "Relay is running on port {}, hardware at {}...",
        config.upstream_port, config.server_addr
    );

    loop {
        match forward_one(&mut upstream, &mut hardware) {
            Ok(()) => (),
            Err(TransportError::Cancelled) => return Ok(()),
            Err(TransportError::Disconnected) => {
                error!("hardware endpoint closed the connection, giving up");
                process::exit(1);
            }
            Err(e) => warn!("dropping packet: {}", e),
        }
    }
}

fn forward_one(
    upstream: &mut dyn Transport,
    hardware: &mut dyn Transport,
) -> Result<(), TransportError> {
    let packet = upstream.receive()?;
    let reply = hardware.send_receive(&packet)?;
    upstream.send(&reply)
}
