/// ----- SHARED CALLS MODULE -----
/// The hall-call table shared by every car's control loop: per floor, the
/// pending hall bits and a lock bit marking a call already claimed by a car
/// en route. Everything runs under one table-wide mutex, held only for the
/// table access itself.

use std::sync::Arc;

use parking_lot::Mutex;

use elevio_rust::elevio::packet::NUM_FLOORS;
use shared_resources::call::Call;

#[derive(Debug, Clone, Copy, Default)]
struct FloorEntry {
    hall_up: bool,
    hall_down: bool,
    locked: bool,
}

impl FloorEntry {
    fn has_hall_call(&self) -> bool {
        self.hall_up || self.hall_down
    }
}

#[derive(Debug, PartialEq)]
pub enum Pending {
    /// A hall call at the caller's own floor, already cleared from the table.
    AtFloor,
    /// A hall call elsewhere, now locked for the caller.
    Claimed(u8),
}

#[derive(Clone, Default)]
pub struct SharedCalls {
    floors: Arc<Mutex<[FloorEntry; NUM_FLOORS as usize]>>,
}

impl SharedCalls {
    pub fn new() -> Self {
        SharedCalls::default()
    }

    /// ORs a hall press into the table. Idempotent; cab presses are not
    /// shared and are ignored here.
    pub fn merge_hall_press(&self, floor: u8, call: Call) {
        let mut floors = self.floors.lock();
        match call {
            Call::HallUp => floors[floor as usize].hall_up = true,
            Call::HallDown => floors[floor as usize].hall_down = true,
            Call::Cab => (),
        }
    }

    /// Claims a floor. Check and set happen under the same lock, so two cars
    /// can never both see it unlocked.
    pub fn try_lock(&self, floor: u8) -> bool {
        let mut floors = self.floors.lock();
        if floors[floor as usize].locked {
            return false;
        }
        floors[floor as usize].locked = true;
        true
    }

    /// Releases a claim without touching the hall bits.
    pub fn unlock(&self, floor: u8) {
        self.floors.lock()[floor as usize].locked = false;
    }

    /// Drops the hall bits and the lock bit, after the door cycle at that
    /// floor finished.
    pub fn clear(&self, floor: u8) {
        self.floors.lock()[floor as usize] = FloorEntry::default();
    }

    pub fn snapshot_lights(&self) -> [[bool; 2]; NUM_FLOORS as usize] {
        let floors = self.floors.lock();
        let mut lights = [[false; 2]; NUM_FLOORS as usize];
        for (floor, entry) in floors.iter().enumerate() {
            lights[floor] = [entry.hall_up, entry.hall_down];
        }
        lights
    }

    /// Scans floors in ascending order for an unlocked pending hall call.
    /// A call at `at_floor` is served on the spot: it is cleared inside this
    /// critical section and no lock is taken. Any other floor is locked
    /// before it is handed out.
    pub fn take_pending(&self, at_floor: u8) -> Option<Pending> {
        let mut floors = self.floors.lock();
        for floor in 0..NUM_FLOORS {
            let entry = &mut floors[floor as usize];
            if entry.locked || !entry.has_hall_call() {
                continue;
            }
            if floor == at_floor {
                *entry = FloorEntry::default();
                return Some(Pending::AtFloor);
            }
            entry.locked = true;
            return Some(Pending::Claimed(floor));
        }
        None
    }
}
