//! Barrel shifter.
//!
//! All four shift kinds take the shift amount exactly as the instruction
//! supplied it, including register-specified amounts far above 32, and
//! report the carry that a bit-serial shifter would leave behind.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

/// Shift kinds selected by the two shift-type bits of an operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right.
    Ror,
}

impl ShiftKind {
    /// Decodes the two shift-type bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

/// Result of one pass through the shifter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOutput {
    /// The shifted operand.
    pub value: u32,
    /// The carry left in the shifter, fed to the C flag by logical
    /// operations.
    pub carry: bool,
}

/// Applies the selected shift kind.
///
/// `immediate` marks an immediate-specified amount, which changes the
/// meaning of amount 0 for LSR, ASR and ROR.
#[must_use]
pub const fn shift(
    kind: ShiftKind,
    value: u32,
    amount: u32,
    carry_in: bool,
    immediate: bool,
) -> ShiftOutput {
    match kind {
        ShiftKind::Lsl => lsl(value, amount, carry_in),
        ShiftKind::Lsr => lsr(value, amount, carry_in, immediate),
        ShiftKind::Asr => asr(value, amount, carry_in, immediate),
        ShiftKind::Ror => ror(value, amount, carry_in, immediate),
    }
}

/// Logical shift left. Amount 0 passes the operand and carry through.
#[must_use]
pub const fn lsl(value: u32, amount: u32, carry_in: bool) -> ShiftOutput {
    if amount == 0 {
        ShiftOutput {
            value,
            carry: carry_in,
        }
    } else if amount < 32 {
        ShiftOutput {
            value: value << amount,
            carry: value >> (32 - amount) & 1 != 0,
        }
    } else if amount == 32 {
        ShiftOutput {
            value: 0,
            carry: value & 1 != 0,
        }
    } else {
        ShiftOutput {
            value: 0,
            carry: false,
        }
    }
}

/// Logical shift right. An immediate amount of 0 encodes a shift by 32.
#[must_use]
pub const fn lsr(value: u32, amount: u32, carry_in: bool, immediate: bool) -> ShiftOutput {
    let amount = if immediate && amount == 0 { 32 } else { amount };
    if amount == 0 {
        ShiftOutput {
            value,
            carry: carry_in,
        }
    } else if amount < 32 {
        ShiftOutput {
            value: value >> amount,
            carry: value >> (amount - 1) & 1 != 0,
        }
    } else if amount == 32 {
        ShiftOutput {
            value: 0,
            carry: value >> 31 != 0,
        }
    } else {
        ShiftOutput {
            value: 0,
            carry: false,
        }
    }
}

/// Arithmetic shift right. An immediate amount of 0 encodes a shift by 32;
/// amounts of 32 or more fill the result with the sign bit.
#[must_use]
pub const fn asr(value: u32, amount: u32, carry_in: bool, immediate: bool) -> ShiftOutput {
    let negative = value & 0x8000_0000 != 0;
    let amount = if immediate && amount == 0 { 32 } else { amount };
    if amount == 0 {
        ShiftOutput {
            value,
            carry: carry_in,
        }
    } else if amount < 32 {
        ShiftOutput {
            value: ((value as i32) >> amount) as u32,
            carry: value >> (amount - 1) & 1 != 0,
        }
    } else {
        ShiftOutput {
            value: if negative { 0xFFFF_FFFF } else { 0 },
            carry: negative,
        }
    }
}

/// Rotate right. An immediate amount of 0 encodes a rotate-through-carry
/// by one bit; a register-specified amount of 0 passes the operand through.
#[must_use]
pub const fn ror(value: u32, amount: u32, carry_in: bool, immediate: bool) -> ShiftOutput {
    if amount == 0 {
        if immediate {
            let carry_bit = if carry_in { 0x8000_0000 } else { 0 };
            ShiftOutput {
                value: value >> 1 | carry_bit,
                carry: value & 1 != 0,
            }
        } else {
            ShiftOutput {
                value,
                carry: carry_in,
            }
        }
    } else {
        let rotated = value.rotate_right(amount % 32);
        ShiftOutput {
            value: rotated,
            // A full multiple of 32 rotations still drags bit 31 through
            // the carry on its last step.
            carry: if amount % 32 == 0 {
                value >> 31 != 0
            } else {
                rotated >> 31 != 0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{asr, lsl, lsr, ror, ShiftOutput};
    use rstest::rstest;

    #[rstest]
    #[case(0x8000_0001, 0, false, 0x8000_0001, false)]
    #[case(0x8000_0001, 1, false, 0x0000_0002, true)]
    #[case(0x0000_0001, 31, false, 0x8000_0000, false)]
    #[case(0x0000_0003, 31, false, 0x8000_0000, true)]
    #[case(0x0000_0001, 32, false, 0, true)]
    #[case(0x0000_0001, 33, true, 0, false)]
    #[case(0xFFFF_FFFF, 255, true, 0, false)]
    fn lsl_amounts(
        #[case] value: u32,
        #[case] amount: u32,
        #[case] carry_in: bool,
        #[case] result: u32,
        #[case] carry: bool,
    ) {
        assert_eq!(
            lsl(value, amount, carry_in),
            ShiftOutput {
                value: result,
                carry
            }
        );
    }

    #[rstest]
    #[case(0x8000_0001, 1, false, 0x4000_0000, true)]
    #[case(0x8000_0000, 31, false, 0x0000_0001, false)]
    #[case(0x8000_0000, 32, false, 0, true)]
    #[case(0x8000_0000, 33, false, 0, false)]
    #[case(0xFFFF_FFFF, 255, false, 0, false)]
    fn lsr_register_amounts(
        #[case] value: u32,
        #[case] amount: u32,
        #[case] carry_in: bool,
        #[case] result: u32,
        #[case] carry: bool,
    ) {
        assert_eq!(
            lsr(value, amount, carry_in, false),
            ShiftOutput {
                value: result,
                carry
            }
        );
    }

    #[test]
    fn lsr_immediate_zero_means_thirty_two() {
        assert_eq!(
            lsr(0x8000_0000, 0, false, true),
            ShiftOutput {
                value: 0,
                carry: true
            }
        );
        // Register-specified zero leaves the operand alone.
        assert_eq!(
            lsr(0x8000_0000, 0, true, false),
            ShiftOutput {
                value: 0x8000_0000,
                carry: true
            }
        );
    }

    #[rstest]
    #[case(0x8000_0000, 1, 0xC000_0000, false)]
    #[case(0x8000_0001, 1, 0xC000_0000, true)]
    #[case(0x8000_0000, 31, 0xFFFF_FFFF, false)]
    #[case(0x8000_0000, 32, 0xFFFF_FFFF, true)]
    #[case(0x8000_0000, 255, 0xFFFF_FFFF, true)]
    #[case(0x7FFF_FFFF, 32, 0, false)]
    #[case(0x7FFF_FFFF, 255, 0, false)]
    fn asr_register_amounts(
        #[case] value: u32,
        #[case] amount: u32,
        #[case] result: u32,
        #[case] carry: bool,
    ) {
        assert_eq!(
            asr(value, amount, false, false),
            ShiftOutput {
                value: result,
                carry
            }
        );
    }

    #[test]
    fn asr_immediate_zero_means_thirty_two() {
        assert_eq!(
            asr(0x8000_0000, 0, false, true),
            ShiftOutput {
                value: 0xFFFF_FFFF,
                carry: true
            }
        );
    }

    #[rstest]
    #[case(0x0000_00F1, 4, 0x1000_000F, true)]
    #[case(0x0000_00F0, 4, 0x0000_000F, false)]
    #[case(0x8000_0000, 32, 0x8000_0000, true)]
    #[case(0x8000_0000, 64, 0x8000_0000, true)]
    #[case(0x7FFF_FFFF, 32, 0x7FFF_FFFF, false)]
    #[case(0x0000_0001, 33, 0x8000_0000, true)]
    fn ror_register_amounts(
        #[case] value: u32,
        #[case] amount: u32,
        #[case] result: u32,
        #[case] carry: bool,
    ) {
        assert_eq!(
            ror(value, amount, false, false),
            ShiftOutput {
                value: result,
                carry
            }
        );
    }

    #[test]
    fn ror_immediate_zero_is_rotate_through_carry() {
        assert_eq!(
            ror(0x0000_0003, 0, false, true),
            ShiftOutput {
                value: 0x0000_0001,
                carry: true
            }
        );
        assert_eq!(
            ror(0x0000_0002, 0, true, true),
            ShiftOutput {
                value: 0x8000_0001,
                carry: false
            }
        );
    }

    #[test]
    fn ror_register_zero_passes_through() {
        assert_eq!(
            ror(0x1234_5678, 0, true, false),
            ShiftOutput {
                value: 0x1234_5678,
                carry: true
            }
        );
    }
}
