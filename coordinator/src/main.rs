use std::io;
use std::net::ToSocketAddrs;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use log::{error, info};

use elevio_rust::elevio::transport::{
    CancelToken, HardwareLink, Node, Transport, TransportError,
};
use shared_resources::config::{CarEndpoint, CoordinatorConfig};

pub mod calls;
pub mod debug;
pub mod direction;
pub mod fsm;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = CoordinatorConfig::get();
    let num_elevators = config.endpoints.len();
    let cancel = CancelToken::new();
    let shared_calls = calls::SharedCalls::new();
    let (status_tx, status_rx) = unbounded();

    // INITIALIZE ONE CONTROL LOOP THREAD PER CAR
    let mut handles = Vec::new();
    for (id, endpoint) in config.endpoints.into_iter().enumerate() {
        let shared_calls = shared_calls.clone();
        let cancel = cancel.clone();
        let status_tx = status_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("elevator_{}", id))
            .spawn(move || -> Result<(), TransportError> {
                let mut transport = connect(&endpoint, cancel.clone())?;
                let mut fsm = fsm::ElevatorFsm::new(
                    id,
                    shared_calls,
                    Duration::from_secs_f64(fsm::DOOR_DWELL),
                );
                fsm.run(transport.as_mut(), status_tx, cancel)
            })?;
        handles.push(handle);
    }
    drop(status_tx);

    // INITIALIZE THREAD FOR THE STATUS DISPLAY
    thread::spawn(move || {
        debug::main(num_elevators, status_rx).ok();
    });

    println!("Coordinator running with {} elevator(s)...", num_elevators);

    for (id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(())) => info!("elevator {} stopped", id),
            Ok(Err(e)) => error!("elevator {} gave up: {}", id, e),
            Err(_) => error!("elevator {} thread panicked", id),
        }
    }
    Ok(())
}

fn connect(
    endpoint: &CarEndpoint,
    cancel: CancelToken,
) -> Result<Box<dyn Transport>, TransportError> {
    match endpoint {
        CarEndpoint::Hardware { addr } => {
            Ok(Box::new(HardwareLink::connect(addr, cancel)?))
        }
        CarEndpoint::Node { addr } => {
            let peer = addr.to_socket_addrs()?.next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, format!("cannot resolve {}", addr))
            })?;
            Ok(Box::new(Node::connect(0, peer, cancel)?))
        }
    }
}
