use std::io;
use std::net;

use socket2::{Domain, Protocol, Socket, Type};

pub fn new_udp(port: u16) -> io::Result<net::UdpSocket> {
    let sock = Socket::new(Domain::ipv4(), Type::dgram(), Some(Protocol::udp()))?;
    sock.set_reuse_address(true)?;
    let local_addr = net::SocketAddr::from(([0, 0, 0, 0], port));
    sock.bind(&local_addr.into())?;
    Ok(sock.into_udp_socket())
}
