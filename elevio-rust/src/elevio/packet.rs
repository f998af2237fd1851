use std::error;
use std::fmt;

pub const NUM_FLOORS: u8 = 4;
pub const NUM_CALLS: u8 = 3;

pub const HALL_UP: u8 = 0;
pub const HALL_DOWN: u8 = 1;
pub const CAB: u8 = 2;

pub const DIRN_DOWN: u8 = u8::MAX;
pub const DIRN_STOP: u8 = 0;
pub const DIRN_UP: u8 = 1;

pub const CMD_RELOAD_CONFIG: u8 = 0;
pub const CMD_MOTOR_DIRECTION: u8 = 1;
pub const CMD_CALL_BUTTON_LIGHT: u8 = 2;
pub const CMD_FLOOR_INDICATOR: u8 = 3;
pub const CMD_DOOR_LIGHT: u8 = 4;
pub const CMD_STOP_LIGHT: u8 = 5;
pub const CMD_CALL_BUTTON: u8 = 6;
pub const CMD_FLOOR_SENSOR: u8 = 7;
pub const CMD_STOP_BUTTON: u8 = 8;
pub const CMD_OBSTRUCTION: u8 = 9;
// coordinator-only pseudo-commands, expanded before they reach the hardware
pub const CMD_ALL_CALL_BUTTONS: u8 = 10;
pub const CMD_ALL_CALL_BUTTON_LIGHTS: u8 = 11;

/// Elementary commands are 4 bytes on the wire: [command, b1, b2, b3].
pub const FRAME_SIZE: usize = 4;
/// Batch commands carry one call bitmask byte per floor.
pub const BATCH_FRAME_SIZE: usize = 1 + NUM_FLOORS as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnknownCommand(u8),
    SizeMismatch { command: u8, len: usize },
    BadPayload { command: u8 },
    CommandMismatch { want: u8, got: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecodeError::UnknownCommand(command) => write!(f, "unknown command tag {}", command),
            DecodeError::SizeMismatch { command, len } => {
                write!(f, "bad frame size {} for command {}", len, command)
            }
            DecodeError::BadPayload { command } => write!(f, "bad payload for command {}", command),
            DecodeError::CommandMismatch { want, got } => {
                write!(f, "expected reply to command {}, got {}", want, got)
            }
        }
    }
}

impl error::Error for DecodeError {}

/// The two sub-shapes a query command tag can carry: the request sent to the
/// endpoint, or the reading it answers with. Output-setting commands look the
/// same from both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Instruction,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    ReloadConfig,
    MotorDirection { dirn: u8 },
    CallButtonLight { floor: u8, call: u8, on: bool },
    FloorIndicator { floor: u8 },
    DoorLight { on: bool },
    StopLight { on: bool },
    CallButton { floor: u8, call: u8 },
    CallButtonState { pressed: bool },
    FloorSensor,
    FloorSensorState { at_floor: bool, floor: u8 },
    StopButton,
    StopButtonState { pressed: bool },
    Obstruction,
    ObstructionState { active: bool },
    AllCallButtons,
    AllCallButtonsState { pressed: [u8; NUM_FLOORS as usize] },
    AllCallButtonLights { lights: [u8; NUM_FLOORS as usize] },
}

/// Commands the endpoint never answers: everything that only sets an output.
pub fn instruction_only(command: u8) -> bool {
    matches!(
        command,
        CMD_RELOAD_CONFIG
            | CMD_MOTOR_DIRECTION
            | CMD_CALL_BUTTON_LIGHT
            | CMD_FLOOR_INDICATOR
            | CMD_DOOR_LIGHT
            | CMD_STOP_LIGHT
            | CMD_ALL_CALL_BUTTON_LIGHTS
    )
}

fn frame_size(command: u8) -> Option<usize> {
    match command {
        CMD_RELOAD_CONFIG..=CMD_OBSTRUCTION => Some(FRAME_SIZE),
        CMD_ALL_CALL_BUTTONS | CMD_ALL_CALL_BUTTON_LIGHTS => Some(BATCH_FRAME_SIZE),
        _ => None,
    }
}

impl Packet {
    pub fn command(&self) -> u8 {
        match *self {
            Packet::ReloadConfig => CMD_RELOAD_CONFIG,
            Packet::MotorDirection { .. } => CMD_MOTOR_DIRECTION,
            Packet::CallButtonLight { .. } => CMD_CALL_BUTTON_LIGHT,
            Packet::FloorIndicator { .. } => CMD_FLOOR_INDICATOR,
            Packet::DoorLight { .. } => CMD_DOOR_LIGHT,
            Packet::StopLight { .. } => CMD_STOP_LIGHT,
            Packet::CallButton { .. } | Packet::CallButtonState { .. } => CMD_CALL_BUTTON,
            Packet::FloorSensor | Packet::FloorSensorState { .. } => CMD_FLOOR_SENSOR,
            Packet::StopButton | Packet::StopButtonState { .. } => CMD_STOP_BUTTON,
            Packet::Obstruction | Packet::ObstructionState { .. } => CMD_OBSTRUCTION,
            Packet::AllCallButtons | Packet::AllCallButtonsState { .. } => CMD_ALL_CALL_BUTTONS,
            Packet::AllCallButtonLights { .. } => CMD_ALL_CALL_BUTTON_LIGHTS,
        }
    }

    pub fn is_instruction(&self) -> bool {
        instruction_only(self.command())
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Packet::ReloadConfig => vec![CMD_RELOAD_CONFIG, 0, 0, 0],
            Packet::MotorDirection { dirn } => vec![CMD_MOTOR_DIRECTION, dirn, 0, 0],
            Packet::CallButtonLight { floor, call, on } => {
                vec![CMD_CALL_BUTTON_LIGHT, call, floor, on as u8]
            }
            Packet::FloorIndicator { floor } => vec![CMD_FLOOR_INDICATOR, floor, 0, 0],
            Packet::DoorLight { on } => vec![CMD_DOOR_LIGHT, on as u8, 0, 0],
            Packet::StopLight { on } => vec![CMD_STOP_LIGHT, on as u8, 0, 0],
            Packet::CallButton { floor, call } => vec![CMD_CALL_BUTTON, call, floor, 0],
            Packet::CallButtonState { pressed } => vec![CMD_CALL_BUTTON, pressed as u8, 0, 0],
            Packet::FloorSensor => vec![CMD_FLOOR_SENSOR, 0, 0, 0],
            Packet::FloorSensorState { at_floor, floor } => {
                vec![CMD_FLOOR_SENSOR, at_floor as u8, floor, 0]
            }
            Packet::StopButton => vec![CMD_STOP_BUTTON, 0, 0, 0],
            Packet::StopButtonState { pressed } => vec![CMD_STOP_BUTTON, pressed as u8, 0, 0],
            Packet::Obstruction => vec![CMD_OBSTRUCTION, 0, 0, 0],
            Packet::ObstructionState { active } => vec![CMD_OBSTRUCTION, active as u8, 0, 0],
            Packet::AllCallButtons => {
                let mut frame = vec![0; BATCH_FRAME_SIZE];
                frame[0] = CMD_ALL_CALL_BUTTONS;
                frame
            }
            Packet::AllCallButtonsState { pressed } => {
                let mut frame = vec![CMD_ALL_CALL_BUTTONS];
                frame.extend_from_slice(&pressed);
                frame
            }
            Packet::AllCallButtonLights { lights } => {
                let mut frame = vec![CMD_ALL_CALL_BUTTON_LIGHTS];
                frame.extend_from_slice(&lights);
                frame
            }
        }
    }

    /// Decodes one frame. The shape picks between the instruction and output
    /// sub-shape of the query commands; it is irrelevant for the rest.
    pub fn decode(shape: Shape, buf: &[u8]) -> Result<Packet, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::SizeMismatch { command: 0, len: 0 });
        }
        let command = buf[0];
        let expected = frame_size(command).ok_or(DecodeError::UnknownCommand(command))?;
        if buf.len() != expected {
            return Err(DecodeError::SizeMismatch { command, len: buf.len() });
        }
        match (command, shape) {
            (CMD_RELOAD_CONFIG, _) => Ok(Packet::ReloadConfig),
            (CMD_MOTOR_DIRECTION, _) => match buf[1] {
                DIRN_DOWN | DIRN_STOP | DIRN_UP => Ok(Packet::MotorDirection { dirn: buf[1] }),
                _ => Err(DecodeError::BadPayload { command }),
            },
            (CMD_CALL_BUTTON_LIGHT, _) => {
                check_call_floor(command, buf[1], buf[2])?;
                Ok(Packet::CallButtonLight {
                    floor: buf[2],
                    call: buf[1],
                    on: buf[3] != 0,
                })
            }
            (CMD_FLOOR_INDICATOR, _) => {
                if buf[1] >= NUM_FLOORS {
                    return Err(DecodeError::BadPayload { command });
                }
                Ok(Packet::FloorIndicator { floor: buf[1] })
            }
            (CMD_DOOR_LIGHT, _) => Ok(Packet::DoorLight { on: buf[1] != 0 }),
            (CMD_STOP_LIGHT, _) => Ok(Packet::StopLight { on: buf[1] != 0 }),
            (CMD_CALL_BUTTON, Shape::Instruction) => {
                check_call_floor(command, buf[1], buf[2])?;
                Ok(Packet::CallButton {
                    floor: buf[2],
                    call: buf[1],
                })
            }
            (CMD_CALL_BUTTON, Shape::Output) => Ok(Packet::CallButtonState {
                pressed: buf[1] != 0,
            }),
            (CMD_FLOOR_SENSOR, Shape::Instruction) => Ok(Packet::FloorSensor),
            (CMD_FLOOR_SENSOR, Shape::Output) => {
                let at_floor = buf[1] != 0;
                if at_floor && buf[2] >= NUM_FLOORS {
                    return Err(DecodeError::BadPayload { command });
                }
                Ok(Packet::FloorSensorState {
                    at_floor,
                    floor: if at_floor { buf[2] } else { 0 },
                })
            }
            (CMD_STOP_BUTTON, Shape::Instruction) => Ok(Packet::StopButton),
            (CMD_STOP_BUTTON, Shape::Output) => Ok(Packet::StopButtonState {
                pressed: buf[1] != 0,
            }),
            (CMD_OBSTRUCTION, Shape::Instruction) => Ok(Packet::Obstruction),
            (CMD_OBSTRUCTION, Shape::Output) => Ok(Packet::ObstructionState {
                active: buf[1] != 0,
            }),
            (CMD_ALL_CALL_BUTTONS, Shape::Instruction) => Ok(Packet::AllCallButtons),
            (CMD_ALL_CALL_BUTTONS, Shape::Output) => Ok(Packet::AllCallButtonsState {
                pressed: decode_masks(command, &buf[1..])?,
            }),
            (CMD_ALL_CALL_BUTTON_LIGHTS, _) => Ok(Packet::AllCallButtonLights {
                lights: decode_masks(command, &buf[1..])?,
            }),
            _ => Err(DecodeError::UnknownCommand(command)),
        }
    }
}

fn check_call_floor(command: u8, call: u8, floor: u8) -> Result<(), DecodeError> {
    if call >= NUM_CALLS || floor >= NUM_FLOORS {
        return Err(DecodeError::BadPayload { command });
    }
    Ok(())
}

fn decode_masks(command: u8, payload: &[u8]) -> Result<[u8; NUM_FLOORS as usize], DecodeError> {
    let mut masks = [0; NUM_FLOORS as usize];
    masks.copy_from_slice(payload);
    if masks.iter().any(|&mask| mask >= 1 << NUM_CALLS) {
        return Err(DecodeError::BadPayload { command });
    }
    Ok(masks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementary_frames_encode_to_four_bytes() {
        let packets = [
            Packet::ReloadConfig,
            Packet::MotorDirection { dirn: DIRN_UP },
            Packet::CallButtonLight { floor: 2, call: HALL_DOWN, on: true },
            Packet::FloorIndicator { floor: 3 },
            Packet::DoorLight { on: true },
            Packet::StopLight { on: false },
            Packet::CallButton { floor: 1, call: CAB },
            Packet::FloorSensor,
            Packet::StopButton,
            Packet::Obstruction,
        ];
        for packet in packets {
            assert_eq!(packet.encode().len(), FRAME_SIZE, "{:?}", packet);
        }
    }

    #[test]
    fn wire_layout_matches_the_hardware_protocol() {
        assert_eq!(Packet::MotorDirection { dirn: DIRN_DOWN }.encode(), [1, 255, 0, 0]);
        assert_eq!(
            Packet::CallButtonLight { floor: 3, call: HALL_UP, on: true }.encode(),
            [2, 0, 3, 1]
        );
        assert_eq!(Packet::CallButton { floor: 2, call: HALL_DOWN }.encode(), [6, 1, 2, 0]);
        assert_eq!(Packet::FloorSensor.encode(), [7, 0, 0, 0]);
    }

    #[test]
    fn instructions_roundtrip() {
        let packets = [
            Packet::ReloadConfig,
            Packet::MotorDirection { dirn: DIRN_DOWN },
            Packet::CallButtonLight { floor: 1, call: CAB, on: false },
            Packet::FloorIndicator { floor: 0 },
            Packet::DoorLight { on: true },
            Packet::StopLight { on: true },
            Packet::CallButton { floor: 3, call: HALL_UP },
            Packet::FloorSensor,
            Packet::StopButton,
            Packet::Obstruction,
            Packet::AllCallButtons,
            Packet::AllCallButtonLights { lights: [0b101, 0, 0b11, 0b10] },
        ];
        for packet in packets {
            let decoded = Packet::decode(Shape::Instruction, &packet.encode()).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn outputs_roundtrip() {
        let packets = [
            Packet::CallButtonState { pressed: true },
            Packet::FloorSensorState { at_floor: true, floor: 2 },
            Packet::FloorSensorState { at_floor: false, floor: 0 },
            Packet::StopButtonState { pressed: false },
            Packet::ObstructionState { active: true },
            Packet::AllCallButtonsState { pressed: [0b1, 0b10, 0, 0b111] },
        ];
        for packet in packets {
            let decoded = Packet::decode(Shape::Output, &packet.encode()).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn shape_selects_the_query_sub_shape() {
        let frame = Packet::CallButton { floor: 2, call: HALL_UP }.encode();
        assert_eq!(
            Packet::decode(Shape::Instruction, &frame).unwrap(),
            Packet::CallButton { floor: 2, call: HALL_UP }
        );
        let frame = Packet::CallButtonState { pressed: true }.encode();
        assert_eq!(
            Packet::decode(Shape::Output, &frame).unwrap(),
            Packet::CallButtonState { pressed: true }
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            Packet::decode(Shape::Instruction, &[42, 0, 0, 0]),
            Err(DecodeError::UnknownCommand(42))
        );
    }

    #[test]
    fn wrong_frame_size_is_rejected() {
        assert_eq!(
            Packet::decode(Shape::Instruction, &[CMD_FLOOR_SENSOR, 0, 0]),
            Err(DecodeError::SizeMismatch { command: CMD_FLOOR_SENSOR, len: 3 })
        );
        // a batch tag inside an elementary frame is a size mismatch too
        assert_eq!(
            Packet::decode(Shape::Instruction, &[CMD_ALL_CALL_BUTTONS, 0, 0, 0]),
            Err(DecodeError::SizeMismatch { command: CMD_ALL_CALL_BUTTONS, len: 4 })
        );
        assert_eq!(
            Packet::decode(Shape::Instruction, &[]),
            Err(DecodeError::SizeMismatch { command: 0, len: 0 })
        );
    }

    #[test]
    fn out_of_range_payloads_are_rejected() {
        assert_eq!(
            Packet::decode(Shape::Instruction, &[CMD_MOTOR_DIRECTION, 2, 0, 0]),
            Err(DecodeError::BadPayload { command: CMD_MOTOR_DIRECTION })
        );
        assert_eq!(
            Packet::decode(Shape::Instruction, &[CMD_CALL_BUTTON, NUM_CALLS, 0, 0]),
            Err(DecodeError::BadPayload { command: CMD_CALL_BUTTON })
        );
        assert_eq!(
            Packet::decode(Shape::Instruction, &[CMD_CALL_BUTTON, 0, NUM_FLOORS, 0]),
            Err(DecodeError::BadPayload { command: CMD_CALL_BUTTON })
        );
        assert_eq!(
            Packet::decode(Shape::Output, &[CMD_FLOOR_SENSOR, 1, NUM_FLOORS, 0]),
            Err(DecodeError::BadPayload { command: CMD_FLOOR_SENSOR })
        );
        let frame = [CMD_ALL_CALL_BUTTON_LIGHTS, 1 << NUM_CALLS, 0, 0, 0];
        assert_eq!(
            Packet::decode(Shape::Instruction, &frame),
            Err(DecodeError::BadPayload { command: CMD_ALL_CALL_BUTTON_LIGHTS })
        );
    }

    #[test]
    fn instruction_only_covers_the_output_setters() {
        for command in [
            CMD_RELOAD_CONFIG,
            CMD_MOTOR_DIRECTION,
            CMD_CALL_BUTTON_LIGHT,
            CMD_FLOOR_INDICATOR,
            CMD_DOOR_LIGHT,
            CMD_STOP_LIGHT,
            CMD_ALL_CALL_BUTTON_LIGHTS,
        ] {
            assert!(instruction_only(command));
        }
        for command in [
            CMD_CALL_BUTTON,
            CMD_FLOOR_SENSOR,
            CMD_STOP_BUTTON,
            CMD_OBSTRUCTION,
            CMD_ALL_CALL_BUTTONS,
        ] {
            assert!(!instruction_only(command));
        }
    }
}
