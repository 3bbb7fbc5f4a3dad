//! Memory and timing port between the core and the host system.

/// Width of a single bus access in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum AccessWidth {
    /// 8-bit access.
    Byte = 1,
    /// 16-bit access.
    Halfword = 2,
    /// 32-bit access.
    Word = 4,
}

impl AccessWidth {
    /// Returns the access width in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        self as u32
    }
}

/// Bus cycle classification used for wait-state accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CycleKind {
    /// Non-sequential access.
    NonSequential,
    /// Sequential access following the previous address.
    Sequential,
    /// Internal cycle with no bus activity.
    Internal,
    /// Coprocessor transfer cycle.
    Coprocessor,
}

/// Host-provided memory system the core fetches from and loads/stores to.
///
/// Accesses take the address exactly as the executing instruction computed
/// it; the bus decides how (or whether) to honor misaligned addresses. The
/// core performs its own rotation of misaligned word loads before the value
/// reaches a register.
pub trait MemoryBus {
    /// Reads an 8-bit value.
    fn read_byte(&mut self, address: u32) -> u8;
    /// Reads a 16-bit value.
    fn read_halfword(&mut self, address: u32) -> u16;
    /// Reads a 32-bit value.
    fn read_word(&mut self, address: u32) -> u32;
    /// Writes an 8-bit value.
    fn write_byte(&mut self, address: u32, value: u8);
    /// Writes a 16-bit value.
    fn write_halfword(&mut self, address: u32, value: u16);
    /// Writes a 32-bit value.
    fn write_word(&mut self, address: u32, value: u32);

    /// Returns the wait states for one access, on top of the base cycle.
    ///
    /// The default implementation models a zero-wait-state system.
    fn cycle_cost(
        &mut self,
        _address: u32,
        _width: AccessWidth,
        _write: bool,
        _kind: CycleKind,
    ) -> u32 {
        0
    }
}
