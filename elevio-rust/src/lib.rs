pub mod elevio;
