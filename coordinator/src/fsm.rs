/// ----- FSM MODULE -----
/// One control loop per car. Every iteration polls buttons and sensors over
/// the car's transport, merges hall presses into the shared call table,
/// pushes the combined light output, and advances the idle/moving/door-open
/// state machine. Transport errors are logged and the loop continues with
/// the previous readings; a disconnected endpoint ends the loop.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{info, warn};

use elevio_rust::elevio::packet::{self, NUM_FLOORS};
use elevio_rust::elevio::poll;
use elevio_rust::elevio::transport::{CancelToken, Transport, TransportError};
use shared_resources::call::Call;

use crate::calls::{Pending, SharedCalls};
use crate::direction::Direction;

const POLL_PERIOD: Duration = Duration::from_millis(25);
/// Seconds the doors stay open at a floor; an obstruction re-arms the full
/// dwell every iteration it is asserted.
pub const DOOR_DWELL: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Moving { target: u8 },
    DoorOpen { deadline: Instant },
}

#[derive(Clone, Debug)]
pub struct ElevatorStatus {
    pub id: usize,
    pub state: String,
    pub floor: u8,
    pub direction: Direction,
    pub orders: [[bool; packet::NUM_CALLS as usize]; NUM_FLOORS as usize],
}

pub struct ElevatorFsm {
    id: usize,
    calls: SharedCalls,
    cab_calls: [bool; NUM_FLOORS as usize],
    buttons: [u8; NUM_FLOORS as usize],
    obstruction: bool,
    stop_pressed: bool,
    floor: u8,
    direction: Direction,
    state: State,
    door_dwell: Duration,
}

impl ElevatorFsm {
    pub fn new(id: usize, calls: SharedCalls, door_dwell: Duration) -> Self {
        ElevatorFsm {
            id,
            calls,
            cab_calls: [false; NUM_FLOORS as usize],
            buttons: [0; NUM_FLOORS as usize],
            obstruction: false,
            stop_pressed: false,
            floor: 0,
            direction: Direction::Stop,
            state: State::Idle,
            door_dwell,
        }
    }

    pub fn run(
        &mut self,
        t: &mut dyn Transport,
        status_tx: Sender<ElevatorStatus>,
        cancel: CancelToken,
    ) -> Result<(), TransportError> {
        match self.find_floor(t, &cancel) {
            Err(TransportError::Cancelled) => return Ok(()),
            other => other?,
        }
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.step(t) {
                Ok(()) => (),
                Err(TransportError::Disconnected) => return Err(TransportError::Disconnected),
                Err(TransportError::Cancelled) => return Ok(()),
                Err(e) => warn!("elevator {}: {}, retrying next iteration", self.id, e),
            }
            if self.stop_pressed {
                info!("elevator {}: stop button pressed, stopping...", self.id);
                cancel.cancel();
                return Ok(());
            }
            status_tx.send(self.status()).ok();
            thread::sleep(POLL_PERIOD);
        }
    }

    /// Cars may boot between floors, where the sensor reads nothing. Drive
    /// down until a floor is seen so `floor` starts from a real position.
    fn find_floor(
        &mut self,
        t: &mut dyn Transport,
        cancel: &CancelToken,
    ) -> Result<(), TransportError> {
        match poll::floor_sensor(t)? {
            Some(floor) => self.floor = floor,
            None => {
                poll::motor_direction(t, packet::DIRN_DOWN)?;
                loop {
                    if cancel.is_cancelled() {
                        return Err(TransportError::Cancelled);
                    }
                    if let Some(floor) = poll::floor_sensor(t)? {
                        poll::motor_direction(t, packet::DIRN_STOP)?;
                        self.floor = floor;
                        break;
                    }
                    thread::sleep(POLL_PERIOD);
                }
            }
        }
        poll::floor_indicator(t, self.floor)?;
        Ok(())
    }

    fn step(&mut self, t: &mut dyn Transport) -> Result<(), TransportError> {
        // poll inputs, falling back to the previous reading on failure
        self.buttons = or_stale(self.id, poll::all_call_buttons(t), self.buttons)?;
        let sensor = or_stale(self.id, poll::floor_sensor(t), None)?;
        self.obstruction = or_stale(self.id, poll::obstruction(t), self.obstruction)?;
        self.stop_pressed = or_stale(self.id, poll::stop_button(t), self.stop_pressed)?;

        // hall presses go to the shared table, cab presses stick locally
        for floor in 0..NUM_FLOORS {
            let mask = self.buttons[floor as usize];
            for call in Call::iter() {
                if mask & (1 << call.as_wire()) == 0 {
                    continue;
                }
                match call {
                    Call::Cab => self.cab_calls[floor as usize] = true,
                    hall => self.calls.merge_hall_press(floor, hall),
                }
            }
        }

        // light output is shared hall state OR own cab calls
        poll::set_all_call_button_lights(t, &self.light_masks())?;
        poll::stop_light(t, self.stop_pressed)?;

        // position only changes when the sensor asserts a floor
        if let Some(floor) = sensor {
            if floor != self.floor {
                self.floor = floor;
                poll::floor_indicator(t, floor)?;
            }
        }

        self.advance(t)
    }

    fn advance(&mut self, t: &mut dyn Transport) -> Result<(), TransportError> {
        match self.state {
            State::Moving { target } => {
                if self.floor == target {
                    poll::motor_direction(t, packet::DIRN_STOP)?;
                    self.direction = Direction::Stop;
                    self.open_door(t)?;
                }
            }
            State::DoorOpen { deadline } => {
                if self.obstruction {
                    // an active obstruction re-arms the full dwell
                    self.state = State::DoorOpen {
                        deadline: Instant::now() + self.door_dwell,
                    };
                } else if Instant::now() > deadline {
                    poll::door_light(t, false)?;
                    self.cab_calls[self.floor as usize] = false;
                    self.calls.clear(self.floor);
                    self.state = State::Idle;
                }
            }
            State::Idle => {
                // cab calls first, in ascending floor order
                if let Some(target) = self.next_cab_call() {
                    // a cab destination is taken even when another car holds
                    // the floor lock; the lock only arbitrates hall calls
                    self.calls.try_lock(target);
                    if target == self.floor {
                        self.open_door(t)?;
                    } else {
                        self.start_towards(t, target)?;
                    }
                } else {
                    match self.calls.take_pending(self.floor) {
                        Some(Pending::AtFloor) => (), // served without moving
                        Some(Pending::Claimed(target)) => {
                            if let Err(e) = self.start_towards(t, target) {
                                self.calls.unlock(target);
                                return Err(e);
                            }
                        }
                        None => (),
                    }
                }
            }
        }
        Ok(())
    }

    fn open_door(&mut self, t: &mut dyn Transport) -> Result<(), TransportError> {
        poll::door_light(t, true)?;
        self.state = State::DoorOpen {
            deadline: Instant::now() + self.door_dwell,
        };
        Ok(())
    }

    fn start_towards(
        &mut self,
        t: &mut dyn Transport,
        target: u8,
    ) -> Result<(), TransportError> {
        let direction = Direction::towards(self.floor, target);
        poll::motor_direction(t, direction.as_wire())?;
        self.direction = direction;
        self.state = State::Moving { target };
        Ok(())
    }

    fn next_cab_call(&self) -> Option<u8> {
        (0..NUM_FLOORS).find(|&floor| self.cab_calls[floor as usize])
    }

    fn light_masks(&self) -> [u8; NUM_FLOORS as usize] {
        let hall = self.calls.snapshot_lights();
        let mut lights = [0; NUM_FLOORS as usize];
        for floor in 0..NUM_FLOORS as usize {
            if hall[floor][0] {
                lights[floor] |= 1 << packet::HALL_UP;
            }
            if hall[floor][1] {
                lights[floor] |= 1 << packet::HALL_DOWN;
            }
            if self.cab_calls[floor] {
                lights[floor] |= 1 << packet::CAB;
            }
        }
        lights
    }

    fn status(&self) -> ElevatorStatus {
        let state = match self.state {
            State::Idle => "idle",
            State::Moving { .. } => "moving",
            State::DoorOpen { .. } => "doorOpen",
        };
        let hall = self.calls.snapshot_lights();
        let mut orders = [[false; packet::NUM_CALLS as usize]; NUM_FLOORS as usize];
        for floor in 0..NUM_FLOORS as usize {
            orders[floor] = [hall[floor][0], hall[floor][1], self.cab_calls[floor]];
        }
        ElevatorStatus {
            id: self.id,
            state: String::from(state),
            floor: self.floor,
            direction: self.direction,
            orders,
        }
    }
}

fn or_stale<T>(
    id: usize,
    result: Result<T, TransportError>,
    stale: T,
) -> Result<T, TransportError> {
    match result {
        Ok(value) => Ok(value),
        Err(e @ TransportError::Disconnected) | Err(e @ TransportError::Cancelled) => Err(e),
        Err(e) => {
            warn!("elevator {}: input read failed ({}), keeping previous value", id, e);
            Ok(stale)
        }
    }
}
