//! Flag-calculation helpers shared by both executors.

#![allow(clippy::cast_lossless)]

/// Signed overflow of a 32-bit addition.
#[must_use]
pub const fn add_overflow(operand1: u32, operand2: u32, result: u32) -> bool {
    (operand1 >> 31 == operand2 >> 31) && (result >> 31 != operand2 >> 31)
}

/// Signed overflow of a 32-bit subtraction.
#[must_use]
pub const fn sub_overflow(operand1: u32, operand2: u32, result: u32) -> bool {
    (operand1 >> 31 != operand2 >> 31) && (result >> 31 == operand2 >> 31)
}

/// Carry out of bit 31 for a 32-bit addition.
#[must_use]
pub const fn add_carry(operand1: u32, operand2: u32) -> bool {
    (operand1 as u64 + operand2 as u64) & 0x1_0000_0000 != 0
}

/// Carry out of bit 31 for a 32-bit addition with carry-in.
#[must_use]
pub const fn add_carry_with(operand1: u32, operand2: u32, carry: u32) -> bool {
    (operand1 as u64 + operand2 as u64 + carry as u64) & 0x1_0000_0000 != 0
}
