//! Core traits and types shared by the microtick CPU.
//!
//! A tick is the unit of time: one bus transaction or one internal
//! operation. Everything that advances the machine counts in ticks.

mod device;
mod observable;
mod ticks;

pub use device::IoDevice;
pub use observable::{Observable, Value};
pub use ticks::Ticks;
