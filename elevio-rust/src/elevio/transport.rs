use std::error;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::packet::{self, DecodeError, Packet, Shape};
use super::sock;

/// How long one Node retry attempt waits for a matching reply.
const NODE_REPLY_TIMEOUT: Duration = Duration::from_millis(10);
/// Retry budget for Node request/reply exchanges. Exhausting it surfaces as
/// a Timeout error instead of resending forever; callers must expect it.
const NODE_RETRY_ATTEMPTS: u32 = 50;
/// Slice length for blocking receives, so cancellation is checked regularly.
const RECEIVE_POLL_TIMEOUT: Duration = Duration::from_millis(500);
/// Reply deadline for hardware queries. The hardware answers in microseconds;
/// anything this late is treated as a timeout instead of blocking the caller
/// indefinitely.
const HW_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum TransportError {
    Io(io::Error),
    Timeout { command: u8 },
    Disconnected,
    Cancelled,
    Unsupported { command: u8 },
    Decode(DecodeError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "i/o error: {}", e),
            TransportError::Timeout { command } => {
                write!(f, "no matching reply to command {}", command)
            }
            TransportError::Disconnected => write!(f, "peer closed the connection"),
            TransportError::Cancelled => write!(f, "operation cancelled"),
            TransportError::Unsupported { command } => {
                write!(f, "command {} cannot be sent on this endpoint", command)
            }
            TransportError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl From<DecodeError> for TransportError {
    fn from(e: DecodeError) -> Self {
        TransportError::Decode(e)
    }
}

/// Cooperative cancellation flag shared between the endpoints of one process.
/// Cancelling aborts blocking receives and retry loops with
/// `TransportError::Cancelled`.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait Transport {
    fn send(&mut self, packet: &Packet) -> Result<(), TransportError>;
    fn receive(&mut self) -> Result<Packet, TransportError>;
    fn send_receive(&mut self, packet: &Packet) -> Result<Packet, TransportError>;
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Best-effort datagram endpoint towards a peer node. Requests are retried
/// until a reply with the matching command tag arrives or the retry budget
/// runs out.
pub struct Node {
    sock: UdpSocket,
    peer: Option<SocketAddr>,
    cancel: CancelToken,
}

impl Node {
    /// Endpoint towards a known peer, e.g. a coordinator talking to a relay.
    pub fn connect(local_port: u16, peer: SocketAddr, cancel: CancelToken) -> io::Result<Node> {
        Ok(Node {
            sock: sock::new_udp(local_port)?,
            peer: Some(peer),
            cancel,
        })
    }

    /// Endpoint that learns its peer from the first packet it receives,
    /// e.g. a relay waiting for its coordinator.
    pub fn bind(local_port: u16, cancel: CancelToken) -> io::Result<Node> {
        Ok(Node {
            sock: sock::new_udp(local_port)?,
            peer: None,
            cancel,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    fn recv_frame(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        self.sock.set_read_timeout(Some(timeout))?;
        let mut buf = [0; 64];
        match self.sock.recv_from(&mut buf) {
            Ok((n, src)) => {
                self.peer = Some(src);
                Ok(Some(buf[..n].to_vec()))
            }
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Transport for Node {
    fn send(&mut self, packet: &Packet) -> Result<(), TransportError> {
        let peer = self.peer.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no peer to send to")
        })?;
        self.sock.send_to(&packet.encode(), peer)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Packet, TransportError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            if let Some(frame) = self.recv_frame(RECEIVE_POLL_TIMEOUT)? {
                return Ok(Packet::decode(Shape::Instruction, &frame)?);
            }
        }
    }

    fn send_receive(&mut self, packet: &Packet) -> Result<Packet, TransportError> {
        let command = packet.command();
        // instructions come back as echoes, queries as output readings
        let shape = if packet.is_instruction() {
            Shape::Instruction
        } else {
            Shape::Output
        };
        for _ in 0..NODE_RETRY_ATTEMPTS {
            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            self.send(packet)?;
            match self.recv_frame(NODE_REPLY_TIMEOUT)? {
                Some(frame) if frame.first() == Some(&command) => {
                    return Ok(Packet::decode(shape, &frame)?);
                }
                // unrelated tag or nothing at all: resend and try again
                Some(_) | None => continue,
            }
        }
        Err(TransportError::Timeout { command })
    }
}

/// Reliable stream endpoint towards the hardware/simulator. Queries get
/// exactly one reply; output-setting instructions get none and return their
/// own echo. A zero-length read means the endpoint is gone, which surfaces as
/// `Disconnected` -- there is no reconnect path.
pub struct HardwareLink {
    stream: TcpStream,
    cancel: CancelToken,
}

impl HardwareLink {
    pub fn connect(addr: &str, cancel: CancelToken) -> io::Result<HardwareLink> {
        Ok(HardwareLink {
            stream: TcpStream::connect(addr)?,
            cancel,
        })
    }

    fn read_frame(&mut self) -> Result<[u8; packet::FRAME_SIZE], TransportError> {
        self.stream.set_read_timeout(Some(HW_REPLY_TIMEOUT))?;
        let mut buf = [0; packet::FRAME_SIZE];
        let mut read = 0;
        while read < buf.len() {
            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            match self.stream.read(&mut buf[read..]) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => read += n,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(buf)
    }
}

impl Transport for HardwareLink {
    fn send(&mut self, packet: &Packet) -> Result<(), TransportError> {
        let frame = packet.encode();
        if frame.len() != packet::FRAME_SIZE {
            // batch pseudo-commands never cross the hardware wire unexpanded
            return Err(TransportError::Unsupported {
                command: packet.command(),
            });
        }
        self.stream.write_all(&frame)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Packet, TransportError> {
        let frame = self.read_frame()?;
        Ok(Packet::decode(Shape::Output, &frame)?)
    }

    fn send_receive(&mut self, packet: &Packet) -> Result<Packet, TransportError> {
        self.send(packet)?;
        if packet.is_instruction() {
            return Ok(packet.clone());
        }
        let command = packet.command();
        let frame = match self.read_frame() {
            Err(TransportError::Io(e)) if is_timeout(&e) => {
                return Err(TransportError::Timeout { command })
            }
            other => other?,
        };
        if frame[0] != command {
            return Err(DecodeError::CommandMismatch {
                want: command,
                got: frame[0],
            }
            .into());
        }
        Ok(Packet::decode(Shape::Output, &frame)?)
    }
}
