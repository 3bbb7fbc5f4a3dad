//! Instruction execution for both encodings.

pub mod flags;

mod arm;
mod thumb;

pub use flags::{add_carry, add_carry_with, add_overflow, sub_overflow};
