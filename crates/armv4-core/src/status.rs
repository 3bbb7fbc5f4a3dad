//! Program status word, processor modes and condition evaluation.

use crate::error::CoreError;

/// Operating modes encoded in the low five bits of the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum Mode {
    /// Unprivileged user mode.
    User = 0x10,
    /// Fast interrupt mode, banks r8 through r14.
    Fiq = 0x11,
    /// Interrupt mode, banks r13 and r14.
    Irq = 0x12,
    /// Supervisor mode, entered by software interrupt.
    Supervisor = 0x13,
    /// Abort mode.
    Abort = 0x17,
    /// Undefined instruction mode.
    Undefined = 0x1B,
    /// Privileged system mode sharing the user register bank.
    System = 0x1F,
}

impl Mode {
    /// Returns the five mode bits for this mode.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decodes five mode bits, returning `None` for non-architectural values.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & ProgramStatus::MODE_MASK {
            0x10 => Some(Self::User),
            0x11 => Some(Self::Fiq),
            0x12 => Some(Self::Irq),
            0x13 => Some(Self::Supervisor),
            0x17 => Some(Self::Abort),
            0x1B => Some(Self::Undefined),
            0x1F => Some(Self::System),
            _ => None,
        }
    }

    /// Whether this mode carries a saved status register of its own.
    #[must_use]
    pub const fn has_saved_status(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }
}

/// Current program status word.
///
/// A thin wrapper over the raw 32-bit register; all accessors operate on
/// the architectural bit positions so unrelated bits survive round trips
/// through status-transfer instructions untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProgramStatus(pub u32);

impl ProgramStatus {
    /// Mask covering the five mode bits.
    pub const MODE_MASK: u32 = 0x1F;
    /// Compressed (16-bit) instruction set selector.
    pub const THUMB: u32 = 0x20;
    /// Fast interrupt disable.
    pub const FIQ_DISABLE: u32 = 0x40;
    /// Interrupt disable.
    pub const IRQ_DISABLE: u32 = 0x80;
    /// Sticky overflow flag.
    pub const STICKY: u32 = 0x0800_0000;
    /// Overflow flag.
    pub const OVERFLOW: u32 = 0x1000_0000;
    /// Carry flag.
    pub const CARRY: u32 = 0x2000_0000;
    /// Zero flag.
    pub const ZERO: u32 = 0x4000_0000;
    /// Sign flag.
    pub const SIGN: u32 = 0x8000_0000;

    /// Builds a status word for the given mode with all other bits clear.
    #[must_use]
    pub const fn for_mode(mode: Mode) -> Self {
        Self(mode.bits())
    }

    /// Returns the raw five mode bits.
    #[must_use]
    pub const fn mode_bits(self) -> u32 {
        self.0 & Self::MODE_MASK
    }

    /// Returns the current mode, or `None` when the bits are invalid.
    #[must_use]
    pub const fn mode(self) -> Option<Mode> {
        Mode::from_bits(self.0)
    }

    /// Returns the current mode, rejecting invalid bit patterns.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidMode`] when the five mode bits do not
    /// name an architectural mode.
    pub const fn checked_mode(self) -> Result<Mode, CoreError> {
        match self.mode() {
            Some(mode) => Ok(mode),
            None => Err(CoreError::InvalidMode {
                bits: self.mode_bits(),
            }),
        }
    }

    /// Replaces the mode bits.
    pub fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !Self::MODE_MASK) | mode.bits();
    }

    /// Whether the compressed instruction set is selected.
    #[must_use]
    pub const fn thumb(self) -> bool {
        self.0 & Self::THUMB != 0
    }

    /// Selects or deselects the compressed instruction set.
    pub fn set_thumb(&mut self, thumb: bool) {
        self.set_bit(Self::THUMB, thumb);
    }

    /// Whether normal interrupts are masked.
    #[must_use]
    pub const fn irq_disabled(self) -> bool {
        self.0 & Self::IRQ_DISABLE != 0
    }

    /// Whether fast interrupts are masked.
    #[must_use]
    pub const fn fiq_disabled(self) -> bool {
        self.0 & Self::FIQ_DISABLE != 0
    }

    /// Sign flag.
    #[must_use]
    pub const fn sign(self) -> bool {
        self.0 & Self::SIGN != 0
    }

    /// Zero flag.
    #[must_use]
    pub const fn zero(self) -> bool {
        self.0 & Self::ZERO != 0
    }

    /// Carry flag.
    #[must_use]
    pub const fn carry(self) -> bool {
        self.0 & Self::CARRY != 0
    }

    /// Overflow flag.
    #[must_use]
    pub const fn overflow(self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    /// Sets the sign and zero flags from a 32-bit result.
    pub fn set_sign_zero(&mut self, result: u32) {
        self.set_bit(Self::SIGN, result & 0x8000_0000 != 0);
        self.set_bit(Self::ZERO, result == 0);
    }

    /// Sets the zero flag from a 64-bit result, and the sign flag from its
    /// upper half.
    pub fn set_sign_zero_long(&mut self, result: u64) {
        self.set_bit(Self::SIGN, result & 0x8000_0000_0000_0000 != 0);
        self.set_bit(Self::ZERO, result == 0);
    }

    /// Sets the carry flag.
    pub fn set_carry(&mut self, carry: bool) {
        self.set_bit(Self::CARRY, carry);
    }

    /// Sets the overflow flag.
    pub fn set_overflow(&mut self, overflow: bool) {
        self.set_bit(Self::OVERFLOW, overflow);
    }

    fn set_bit(&mut self, mask: u32, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

/// Condition field of a full-word instruction, or of a compressed
/// conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum Condition {
    /// Z set.
    Equal = 0x0,
    /// Z clear.
    NotEqual = 0x1,
    /// C set.
    CarrySet = 0x2,
    /// C clear.
    CarryClear = 0x3,
    /// N set.
    Minus = 0x4,
    /// N clear.
    Plus = 0x5,
    /// V set.
    OverflowSet = 0x6,
    /// V clear.
    OverflowClear = 0x7,
    /// C set and Z clear.
    UnsignedHigher = 0x8,
    /// C clear or Z set.
    UnsignedLowerOrSame = 0x9,
    /// N equals V.
    GreaterOrEqual = 0xA,
    /// N differs from V.
    Less = 0xB,
    /// Z clear and N equals V.
    Greater = 0xC,
    /// Z set or N differs from V.
    LessOrEqual = 0xD,
    /// Unconditional.
    Always = 0xE,
    /// Never satisfied.
    Never = 0xF,
}

impl Condition {
    /// Decodes a 4-bit condition field.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidCondition`] for values above 0xF.
    pub const fn from_bits(bits: u32) -> Result<Self, CoreError> {
        match bits {
            0x0 => Ok(Self::Equal),
            0x1 => Ok(Self::NotEqual),
            0x2 => Ok(Self::CarrySet),
            0x3 => Ok(Self::CarryClear),
            0x4 => Ok(Self::Minus),
            0x5 => Ok(Self::Plus),
            0x6 => Ok(Self::OverflowSet),
            0x7 => Ok(Self::OverflowClear),
            0x8 => Ok(Self::UnsignedHigher),
            0x9 => Ok(Self::UnsignedLowerOrSame),
            0xA => Ok(Self::GreaterOrEqual),
            0xB => Ok(Self::Less),
            0xC => Ok(Self::Greater),
            0xD => Ok(Self::LessOrEqual),
            0xE => Ok(Self::Always),
            0xF => Ok(Self::Never),
            _ => Err(CoreError::InvalidCondition { bits }),
        }
    }

    /// Decodes the low four bits of a value, which always succeeds.
    #[must_use]
    pub const fn from_field(value: u32) -> Self {
        match Self::from_bits(value & 0xF) {
            Ok(condition) => condition,
            // Unreachable after masking to four bits.
            Err(_) => Self::Never,
        }
    }

    /// Evaluates this condition against the current flags.
    #[must_use]
    pub const fn passes(self, status: ProgramStatus) -> bool {
        let n = status.sign();
        let z = status.zero();
        let c = status.carry();
        let v = status.overflow();
        match self {
            Self::Equal => z,
            Self::NotEqual => !z,
            Self::CarrySet => c,
            Self::CarryClear => !c,
            Self::Minus => n,
            Self::Plus => !n,
            Self::OverflowSet => v,
            Self::OverflowClear => !v,
            Self::UnsignedHigher => c && !z,
            Self::UnsignedLowerOrSame => !c || z,
            Self::GreaterOrEqual => n == v,
            Self::Less => n != v,
            Self::Greater => !z && (n == v),
            Self::LessOrEqual => z || (n != v),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Condition, Mode, ProgramStatus};
    use crate::error::CoreError;

    fn status_with_flags(n: bool, z: bool, c: bool, v: bool) -> ProgramStatus {
        let mut bits = Mode::System.bits();
        if n {
            bits |= ProgramStatus::SIGN;
        }
        if z {
            bits |= ProgramStatus::ZERO;
        }
        if c {
            bits |= ProgramStatus::CARRY;
        }
        if v {
            bits |= ProgramStatus::OVERFLOW;
        }
        ProgramStatus(bits)
    }

    #[test]
    fn every_condition_against_every_flag_combination() {
        for bits in 0u32..16 {
            let n = bits & 8 != 0;
            let z = bits & 4 != 0;
            let c = bits & 2 != 0;
            let v = bits & 1 != 0;
            let status = status_with_flags(n, z, c, v);
            let expected = [
                z,
                !z,
                c,
                !c,
                n,
                !n,
                v,
                !v,
                c && !z,
                !c || z,
                n == v,
                n != v,
                !z && (n == v),
                z || (n != v),
                true,
                false,
            ];
            for (code, want) in expected.iter().enumerate() {
                let condition = Condition::from_field(code as u32);
                assert_eq!(
                    condition.passes(status),
                    *want,
                    "condition {code:#x} with N={n} Z={z} C={c} V={v}"
                );
            }
        }
    }

    #[test]
    fn mode_bits_round_trip() {
        for mode in [
            Mode::User,
            Mode::Fiq,
            Mode::Irq,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Undefined,
            Mode::System,
        ] {
            assert_eq!(Mode::from_bits(mode.bits()), Some(mode));
        }
    }

    #[test]
    fn invalid_mode_bits_are_rejected() {
        let status = ProgramStatus(0x00);
        assert_eq!(
            status.checked_mode(),
            Err(CoreError::InvalidMode { bits: 0x00 })
        );
        assert!(Mode::from_bits(0x16).is_none());
    }

    #[test]
    fn status_transfer_preserves_unrelated_bits() {
        let mut status = ProgramStatus(0x0800_0000 | Mode::Supervisor.bits());
        status.set_thumb(true);
        status.set_mode(Mode::User);
        assert_eq!(status.0 & ProgramStatus::STICKY, ProgramStatus::STICKY);
        assert!(status.thumb());
        assert_eq!(status.mode(), Some(Mode::User));
    }

    #[test]
    fn saved_status_presence_follows_the_mode() {
        assert!(!Mode::User.has_saved_status());
        assert!(!Mode::System.has_saved_status());
        assert!(Mode::Fiq.has_saved_status());
        assert!(Mode::Supervisor.has_saved_status());
    }
}
