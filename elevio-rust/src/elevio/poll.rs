//! Typed operations over a `Transport` endpoint, one per elevator command.
//! The two batch pseudo-commands are expanded here into per-floor/per-button
//! elementary round trips, since no endpoint in the system answers them
//! natively.

use super::packet::{self, DecodeError, Packet};
use super::transport::{Transport, TransportError};

fn unexpected(want: u8, got: &Packet) -> TransportError {
    DecodeError::CommandMismatch {
        want,
        got: got.command(),
    }
    .into()
}

/// Expansion of the query-all-buttons pseudo-command: one query per floor and
/// button kind, OR-merged into a call bitmask per floor.
pub fn all_call_buttons(
    t: &mut dyn Transport,
) -> Result<[u8; packet::NUM_FLOORS as usize], TransportError> {
    let mut pressed = [0; packet::NUM_FLOORS as usize];
    for floor in 0..packet::NUM_FLOORS {
        for call in 0..packet::NUM_CALLS {
            match t.send_receive(&Packet::CallButton { floor, call })? {
                Packet::CallButtonState { pressed: p } => {
                    if p {
                        pressed[floor as usize] |= 1 << call;
                    }
                }
                other => return Err(unexpected(packet::CMD_CALL_BUTTON, &other)),
            }
        }
    }
    Ok(pressed)
}

/// Expansion of the set-all-button-lights pseudo-command: fans a call bitmask
/// per floor out into elementary light instructions.
pub fn set_all_call_button_lights(
    t: &mut dyn Transport,
    lights: &[u8; packet::NUM_FLOORS as usize],
) -> Result<(), TransportError> {
    for floor in 0..packet::NUM_FLOORS {
        for call in 0..packet::NUM_CALLS {
            let on = lights[floor as usize] & (1 << call) != 0;
            t.send_receive(&Packet::CallButtonLight { floor, call, on })?;
        }
    }
    Ok(())
}

/// `Some(floor)` when the sensor is at a floor, `None` between floors.
pub fn floor_sensor(t: &mut dyn Transport) -> Result<Option<u8>, TransportError> {
    match t.send_receive(&Packet::FloorSensor)? {
        Packet::FloorSensorState { at_floor: true, floor } => Ok(Some(floor)),
        Packet::FloorSensorState { at_floor: false, .. } => Ok(None),
        other => Err(unexpected(packet::CMD_FLOOR_SENSOR, &other)),
    }
}

pub fn stop_button(t: &mut dyn Transport) -> Result<bool, TransportError> {
    match t.send_receive(&Packet::StopButton)? {
        Packet::StopButtonState { pressed } => Ok(pressed),
        other => Err(unexpected(packet::CMD_STOP_BUTTON, &other)),
    }
}

pub fn obstruction(t: &mut dyn Transport) -> Result<bool, TransportError> {
    match t.send_receive(&Packet::Obstruction)? {
        Packet::ObstructionState { active } => Ok(active),
        other => Err(unexpected(packet::CMD_OBSTRUCTION, &other)),
    }
}

pub fn motor_direction(t: &mut dyn Transport, dirn: u8) -> Result<(), TransportError> {
    t.send_receive(&Packet::MotorDirection { dirn })?;
    Ok(())
}

pub fn floor_indicator(t: &mut dyn Transport, floor: u8) -> Result<(), TransportError> {
    t.send_receive(&Packet::FloorIndicator { floor })?;
    Ok(())
}

pub fn door_light(t: &mut dyn Transport, on: bool) -> Result<(), TransportError> {
    t.send_receive(&Packet::DoorLight { on })?;
    Ok(())
}

pub fn stop_light(t: &mut dyn Transport, on: bool) -> Result<(), TransportError> {
    t.send_receive(&Packet::StopLight { on })?;
    Ok(())
}
