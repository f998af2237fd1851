use elevio_rust::elevio::packet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Down,
    Stop,
    Up,
}

impl Direction {
    pub fn towards(from: u8, to: u8) -> Direction {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Stop
        }
    }

    pub fn as_wire(self) -> u8 {
        match self {
            Direction::Down => packet::DIRN_DOWN,
            Direction::Stop => packet::DIRN_STOP,
            Direction::Up => packet::DIRN_UP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Stop => "none",
            Direction::Up => "up",
        }
    }
}
