use std::io::{Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::thread;

use elevio_rust::elevio::packet::{self, Packet};
use elevio_rust::elevio::transport::{CancelToken, HardwareLink, Node, Transport, TransportError};

#[test]
fn node_retries_until_the_reply_tag_matches() {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let peer_addr = peer.local_addr().unwrap();

    let responder = thread::spawn(move || {
        let mut buf = [0; 16];
        // answer the first request with an unrelated tag, forcing a resend
        let (_, src) = peer.recv_from(&mut buf).unwrap();
        peer.send_to(&Packet::StopButtonState { pressed: false }.encode(), src)
            .unwrap();
        let (_, src) = peer.recv_from(&mut buf).unwrap();
        peer.send_to(
            &Packet::FloorSensorState { at_floor: true, floor: 2 }.encode(),
            src,
        )
        .unwrap();
    });

    let mut node = Node::connect(0, peer_addr, CancelToken::new()).unwrap();
    let reply = node.send_receive(&Packet::FloorSensor).unwrap();
    assert_eq!(reply, Packet::FloorSensorState { at_floor: true, floor: 2 });
    responder.join().unwrap();
}

#[test]
fn node_retry_budget_surfaces_as_timeout() {
    // a peer that exists but never answers
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let peer_addr = peer.local_addr().unwrap();

    let mut node = Node::connect(0, peer_addr, CancelToken::new()).unwrap();
    match node.send_receive(&Packet::Obstruction) {
        Err(TransportError::Timeout { command }) => {
            assert_eq!(command, packet::CMD_OBSTRUCTION)
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn cancelled_token_aborts_the_exchange() {
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    let peer_addr = peer.local_addr().unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut node = Node::connect(0, peer_addr, cancel).unwrap();
    assert!(matches!(
        node.send_receive(&Packet::FloorSensor),
        Err(TransportError::Cancelled)
    ));
    assert!(matches!(node.receive(), Err(TransportError::Cancelled)));
}

#[test]
fn hardware_queries_get_one_reply_and_instructions_echo() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0; packet::FRAME_SIZE];
        // first frame: a motor instruction, no reply expected
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], packet::CMD_MOTOR_DIRECTION);
        // second frame: a floor sensor query
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], packet::CMD_FLOOR_SENSOR);
        stream
            .write_all(&Packet::FloorSensorState { at_floor: true, floor: 3 }.encode())
            .unwrap();
    });

    let mut link = HardwareLink::connect(&addr.to_string(), CancelToken::new()).unwrap();
    let instruction = Packet::MotorDirection { dirn: packet::DIRN_UP };
    assert_eq!(link.send_receive(&instruction).unwrap(), instruction);
    assert_eq!(
        link.send_receive(&Packet::FloorSensor).unwrap(),
        Packet::FloorSensorState { at_floor: true, floor: 3 }
    );
    server.join().unwrap();
}

#[test]
fn closed_hardware_stream_surfaces_as_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0; packet::FRAME_SIZE];
        stream.read_exact(&mut buf).unwrap();
        // drop the connection instead of answering
    });

    let mut link = HardwareLink::connect(&addr.to_string(), CancelToken::new()).unwrap();
    match link.send_receive(&Packet::FloorSensor) {
        Err(TransportError::Disconnected) => {}
        other => panic!("expected disconnect, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn batch_frames_are_refused_on_the_hardware_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let mut link = HardwareLink::connect(&addr.to_string(), CancelToken::new()).unwrap();
    match link.send(&Packet::AllCallButtonLights { lights: [0; 4] }) {
        Err(TransportError::Unsupported { command }) => {
            assert_eq!(command, packet::CMD_ALL_CALL_BUTTON_LIGHTS)
        }
        other => panic!("expected unsupported, got {:?}", other),
    }
}
