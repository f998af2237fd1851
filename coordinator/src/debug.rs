/// ----- DEBUG MODULE -----
/// Renders an order table and state summary per car, redrawn in place every
/// time a control loop reports its status.

use std::io::{stdout, Stdout, Write};

use crossbeam_channel::{select, Receiver};
use crossterm::{cursor, terminal, ExecutableCommand, Result};

use elevio_rust::elevio::packet::NUM_FLOORS;

use crate::direction::Direction;
use crate::fsm::ElevatorStatus;

const STATUS_SIZE: u16 = 25; // lines per elevator block

pub fn main(num_elevators: usize, status_rx: Receiver<ElevatorStatus>) -> Result<()> {
    let mut stdout = stdout();

    let mut statuses: Vec<ElevatorStatus> = (0..num_elevators)
        .map(|id| ElevatorStatus {
            id,
            state: String::from("-"),
            floor: 0,
            direction: Direction::Stop,
            orders: Default::default(),
        })
        .collect();

    for _ in 0..STATUS_SIZE * num_elevators as u16 {
        writeln!(stdout)?;
    }

    loop {
        select! {
            recv(status_rx) -> msg => {
                let status = match msg {
                    Ok(status) => status,
                    Err(_) => return Ok(()), // every control loop is gone
                };
                if status.id < statuses.len() {
                    let id = status.id;
                    statuses[id] = status;
                }
                printstatus(&mut stdout, &statuses)?;
            },
        }
    }
}

fn printstatus(stdout: &mut Stdout, statuses: &[ElevatorStatus]) -> Result<()> {
    stdout.execute(cursor::MoveUp(STATUS_SIZE * statuses.len() as u16))?;
    stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;

    for status in statuses {
        writeln!(stdout, "+---------------------------------------------------+")?;
        writeln!(stdout, "| ORDERS FOR ELEVATOR {:<30}|", status.id)?;
        writeln!(stdout, "+------------+------------+------------+------------+")?;
        writeln!(stdout, "| {0:<10} | {1:<10} | {2:<10} | {3:<10} |", "FLOOR", "HALL UP", "HALL DOWN", "CAB")?;
        for floor in (0..NUM_FLOORS).rev() {
            let orders = status.orders[floor as usize];
            writeln!(stdout, "+------------+------------+------------+------------+")?;
            writeln!(stdout, "| {0:<10} | {1:<10} | {2:<10} | {3:<10} |", floor, orders[0], orders[1], orders[2])?;
        }
        writeln!(stdout, "+------------+------------+------------+------------+\n\n")?;

        writeln!(stdout, "+-------------------------+")?;
        writeln!(stdout, "| STATE MACHINE           |")?;
        writeln!(stdout, "+------------+------------+")?;
        writeln!(stdout, "| {0:<10} | {1:<10} |", "STATE", status.state)?;
        writeln!(stdout, "+------------+------------+")?;
        writeln!(stdout, "| {0:<10} | {1:<10} |", "FLOOR", status.floor)?;
        writeln!(stdout, "+------------+------------+")?;
        writeln!(stdout, "| {0:<10} | {1:<10} |", "DIRECTION", status.direction.as_str())?;
        writeln!(stdout, "+------------+------------+")?;
        writeln!(stdout)?;
    }

    Ok(())
}
