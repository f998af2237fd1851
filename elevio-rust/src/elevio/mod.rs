pub mod packet;
pub mod poll;
pub mod transport;

mod sock;
