//! Exception vectors and their architectural offsets.

/// Exception sources recognized by the core.
///
/// The discriminant of each variant is the offset of its entry in the
/// vector table, relative to the configured base vector address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum Exception {
    /// Power-on or hard reset.
    Reset = 0,
    /// Undefined instruction trap.
    Undefined = 4,
    /// Software interrupt instruction.
    Software = 8,
    /// Instruction prefetch abort.
    PrefetchAbort = 12,
    /// Data access abort.
    DataAbort = 16,
    /// Normal interrupt request.
    Irq = 24,
    /// Fast interrupt request.
    Fiq = 28,
}

impl Exception {
    /// Returns the vector table offset for this exception.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self as u32
    }

    /// Returns the absolute handler address relative to `base_vector`.
    #[must_use]
    pub const fn vector(self, base_vector: u32) -> u32 {
        base_vector.wrapping_add(self.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::Exception;

    #[test]
    fn vector_offsets_match_the_architectural_table() {
        assert_eq!(Exception::Reset.offset(), 0);
        assert_eq!(Exception::Undefined.offset(), 4);
        assert_eq!(Exception::Software.offset(), 8);
        assert_eq!(Exception::PrefetchAbort.offset(), 12);
        assert_eq!(Exception::DataAbort.offset(), 16);
        assert_eq!(Exception::Irq.offset(), 24);
        assert_eq!(Exception::Fiq.offset(), 28);
    }

    #[test]
    fn vector_is_relative_to_the_configured_base() {
        assert_eq!(Exception::Software.vector(0), 8);
        assert_eq!(Exception::Irq.vector(0xFFFF_0000), 0xFFFF_0018);
    }
}
