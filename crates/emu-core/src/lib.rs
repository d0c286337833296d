//! Core traits and types shared by the simulator's components.
//!
//! Everything that advances with the instruction cycle implements
//! [`Tickable`]; everything whose state the front end or a test wants to
//! peek at implements [`Observable`]. `Bus` is the execution thread's single
//! interface to addressable storage, whatever backs it.

mod bus;
mod observable;
mod tickable;
mod ticks;

pub use bus::Bus;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
