//! Core traits and types shared by the emulated components.
//!
//! Time is measured in half-cycles of the processor clock. A bus step on a
//! 68000 lasts a whole number of half-cycles, so this is the smallest unit
//! any component needs to agree on.

mod half_cycles;
mod observable;

pub use half_cycles::HalfCycles;
pub use observable::{Observable, Value};
