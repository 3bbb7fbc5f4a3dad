//! Register bank with per-mode banking.
//!
//! Logical register numbers resolve through an explicit slot table that is
//! rebuilt whenever the mode changes. r0 through r7 and the program counter
//! are shared by every mode; FIQ banks r8 through r14 and the remaining
//! exception modes bank r13 and r14.

use crate::status::Mode;

/// Storage location behind one logical register number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterSlot {
    /// Shared register file, r0 through r14.
    Main(u8),
    /// FIQ bank of r8 through r14.
    Fiq(u8),
    /// Supervisor bank of r13 and r14.
    Svc(u8),
    /// Abort bank of r13 and r14.
    Abt(u8),
    /// Interrupt bank of r13 and r14.
    Irq(u8),
    /// Undefined-mode bank of r13 and r14.
    Und(u8),
    /// The program counter.
    Pc,
}

/// Saved status register selected by the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
enum SavedStatusSlot {
    Fiq,
    Svc,
    Abt,
    Irq,
    Und,
    /// Scratch slot so status-transfer instructions in user and system
    /// mode have somewhere harmless to read and write.
    Scratch,
}

/// The full register file of the core with its banking table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterBank {
    main: [u32; 15],
    fiq: [u32; 7],
    svc: [u32; 2],
    abt: [u32; 2],
    irq: [u32; 2],
    und: [u32; 2],
    pc: u32,
    slots: [RegisterSlot; 16],
    spsr_fiq: u32,
    spsr_svc: u32,
    spsr_abt: u32,
    spsr_irq: u32,
    spsr_und: u32,
    spsr_scratch: u32,
    spsr_slot: SavedStatusSlot,
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank {
    /// Returns a zeroed bank mapped for system mode.
    #[must_use]
    pub fn new() -> Self {
        let mut bank = Self {
            main: [0; 15],
            fiq: [0; 7],
            svc: [0; 2],
            abt: [0; 2],
            irq: [0; 2],
            und: [0; 2],
            pc: 0,
            slots: [RegisterSlot::Pc; 16],
            spsr_fiq: 0,
            spsr_svc: 0,
            spsr_abt: 0,
            spsr_irq: 0,
            spsr_und: 0,
            spsr_scratch: 0,
            spsr_slot: SavedStatusSlot::Scratch,
        };
        bank.remap(Mode::System);
        bank
    }

    /// Rebuilds the slot table for the given mode.
    pub fn remap(&mut self, mode: Mode) {
        let mut slots = [RegisterSlot::Pc; 16];
        for index in 0..13u8 {
            slots[usize::from(index)] = RegisterSlot::Main(index);
        }
        match mode {
            Mode::User | Mode::System => {
                slots[13] = RegisterSlot::Main(13);
                slots[14] = RegisterSlot::Main(14);
                self.spsr_slot = SavedStatusSlot::Scratch;
            }
            Mode::Fiq => {
                for offset in 0..7u8 {
                    slots[8 + offset as usize] = RegisterSlot::Fiq(offset);
                }
                self.spsr_slot = SavedStatusSlot::Fiq;
            }
            Mode::Irq => {
                slots[13] = RegisterSlot::Irq(0);
                slots[14] = RegisterSlot::Irq(1);
                self.spsr_slot = SavedStatusSlot::Irq;
            }
            Mode::Supervisor => {
                slots[13] = RegisterSlot::Svc(0);
                slots[14] = RegisterSlot::Svc(1);
                self.spsr_slot = SavedStatusSlot::Svc;
            }
            Mode::Abort => {
                slots[13] = RegisterSlot::Abt(0);
                slots[14] = RegisterSlot::Abt(1);
                self.spsr_slot = SavedStatusSlot::Abt;
            }
            Mode::Undefined => {
                slots[13] = RegisterSlot::Und(0);
                slots[14] = RegisterSlot::Und(1);
                self.spsr_slot = SavedStatusSlot::Und;
            }
        }
        self.slots = slots;
    }

    /// Reads the register behind a logical register number.
    #[must_use]
    pub fn get(&self, index: usize) -> u32 {
        match self.slots[index & 0xF] {
            RegisterSlot::Main(slot) => self.main[slot as usize],
            RegisterSlot::Fiq(slot) => self.fiq[slot as usize],
            RegisterSlot::Svc(slot) => self.svc[slot as usize],
            RegisterSlot::Abt(slot) => self.abt[slot as usize],
            RegisterSlot::Irq(slot) => self.irq[slot as usize],
            RegisterSlot::Und(slot) => self.und[slot as usize],
            RegisterSlot::Pc => self.pc,
        }
    }

    /// Writes the register behind a logical register number.
    pub fn set(&mut self, index: usize, value: u32) {
        match self.slots[index & 0xF] {
            RegisterSlot::Main(slot) => self.main[slot as usize] = value,
            RegisterSlot::Fiq(slot) => self.fiq[slot as usize] = value,
            RegisterSlot::Svc(slot) => self.svc[slot as usize] = value,
            RegisterSlot::Abt(slot) => self.abt[slot as usize] = value,
            RegisterSlot::Irq(slot) => self.irq[slot as usize] = value,
            RegisterSlot::Und(slot) => self.und[slot as usize] = value,
            RegisterSlot::Pc => self.pc = value,
        }
    }

    /// The program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Replaces the program counter.
    pub fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Adds a displacement to the program counter.
    pub fn advance_pc(&mut self, amount: u32) {
        self.pc = self.pc.wrapping_add(amount);
    }

    /// Writes the link register of a specific mode's bank, regardless of
    /// the current mapping. Exception entry stores the return address here
    /// before switching modes.
    pub fn set_link_for(&mut self, mode: Mode, value: u32) {
        match mode {
            Mode::User | Mode::System => self.main[14] = value,
            Mode::Fiq => self.fiq[6] = value,
            Mode::Irq => self.irq[1] = value,
            Mode::Supervisor => self.svc[1] = value,
            Mode::Abort => self.abt[1] = value,
            Mode::Undefined => self.und[1] = value,
        }
    }

    /// Reads the saved status register of the current mode.
    #[must_use]
    pub const fn spsr(&self) -> u32 {
        match self.spsr_slot {
            SavedStatusSlot::Fiq => self.spsr_fiq,
            SavedStatusSlot::Svc => self.spsr_svc,
            SavedStatusSlot::Abt => self.spsr_abt,
            SavedStatusSlot::Irq => self.spsr_irq,
            SavedStatusSlot::Und => self.spsr_und,
            SavedStatusSlot::Scratch => self.spsr_scratch,
        }
    }

    /// Writes the saved status register of the current mode.
    pub fn set_spsr(&mut self, value: u32) {
        match self.spsr_slot {
            SavedStatusSlot::Fiq => self.spsr_fiq = value,
            SavedStatusSlot::Svc => self.spsr_svc = value,
            SavedStatusSlot::Abt => self.spsr_abt = value,
            SavedStatusSlot::Irq => self.spsr_irq = value,
            SavedStatusSlot::Und => self.spsr_und = value,
            SavedStatusSlot::Scratch => self.spsr_scratch = value,
        }
    }

    /// Writes the saved status register of a specific mode, regardless of
    /// the current mapping.
    pub fn set_spsr_for(&mut self, mode: Mode, value: u32) {
        match mode {
            Mode::User | Mode::System => self.spsr_scratch = value,
            Mode::Fiq => self.spsr_fiq = value,
            Mode::Irq => self.spsr_irq = value,
            Mode::Supervisor => self.spsr_svc = value,
            Mode::Abort => self.spsr_abt = value,
            Mode::Undefined => self.spsr_und = value,
        }
    }

    /// The slot currently mapped for a logical register number.
    #[must_use]
    pub const fn slot(&self, index: usize) -> RegisterSlot {
        self.slots[index & 0xF]
    }
}

#[cfg(test)]
mod tests {
    use super::{RegisterBank, RegisterSlot};
    use crate::status::Mode;
    use proptest::prelude::*;

    const ALL_MODES: [Mode; 7] = [
        Mode::User,
        Mode::Fiq,
        Mode::Irq,
        Mode::Supervisor,
        Mode::Abort,
        Mode::Undefined,
        Mode::System,
    ];

    #[test]
    fn low_registers_and_pc_are_shared_by_every_mode() {
        let mut bank = RegisterBank::new();
        bank.set(3, 0xDEAD_BEEF);
        bank.set(15, 0x0800_0000);
        for mode in ALL_MODES {
            bank.remap(mode);
            assert_eq!(bank.get(3), 0xDEAD_BEEF);
            assert_eq!(bank.get(15), 0x0800_0000);
            assert_eq!(bank.slot(15), RegisterSlot::Pc);
        }
    }

    #[test]
    fn fiq_banks_r8_through_r14() {
        let mut bank = RegisterBank::new();
        bank.remap(Mode::System);
        for index in 8..=14 {
            bank.set(index, index as u32);
        }
        bank.remap(Mode::Fiq);
        for index in 8..=14 {
            assert_eq!(bank.get(index), 0, "r{index} must come from the FIQ bank");
            bank.set(index, 0x100 + index as u32);
        }
        bank.remap(Mode::System);
        for index in 8..=14 {
            assert_eq!(bank.get(index), index as u32);
        }
    }

    #[test]
    fn exception_modes_bank_only_r13_and_r14() {
        let mut bank = RegisterBank::new();
        bank.remap(Mode::User);
        bank.set(12, 12);
        bank.set(13, 13);
        bank.set(14, 14);
        for mode in [Mode::Irq, Mode::Supervisor, Mode::Abort, Mode::Undefined] {
            bank.remap(mode);
            assert_eq!(bank.get(12), 12);
            assert_eq!(bank.get(13), 0);
            assert_eq!(bank.get(14), 0);
        }
    }

    #[test]
    fn link_writes_for_unmapped_modes_land_in_their_bank() {
        let mut bank = RegisterBank::new();
        bank.remap(Mode::System);
        bank.set_link_for(Mode::Irq, 0x1234);
        assert_eq!(bank.get(14), 0, "system r14 must be untouched");
        bank.remap(Mode::Irq);
        assert_eq!(bank.get(14), 0x1234);
    }

    #[test]
    fn saved_status_is_per_mode() {
        let mut bank = RegisterBank::new();
        bank.set_spsr_for(Mode::Irq, 0x11);
        bank.set_spsr_for(Mode::Supervisor, 0x22);
        bank.remap(Mode::Irq);
        assert_eq!(bank.spsr(), 0x11);
        bank.remap(Mode::Supervisor);
        assert_eq!(bank.spsr(), 0x22);
        bank.remap(Mode::User);
        bank.set_spsr(0x33);
        bank.remap(Mode::Irq);
        assert_eq!(bank.spsr(), 0x11, "scratch writes must not leak");
    }

    proptest! {
        #[test]
        fn remap_round_trip_preserves_every_bank(
            values in proptest::collection::vec(any::<u32>(), 16),
            visit in proptest::collection::vec(0usize..7, 0..12),
        ) {
            let mut bank = RegisterBank::new();
            bank.remap(Mode::System);
            for (index, value) in values.iter().enumerate() {
                bank.set(index, *value);
            }
            for mode_index in visit {
                bank.remap(ALL_MODES[mode_index]);
            }
            bank.remap(Mode::System);
            for (index, value) in values.iter().enumerate() {
                prop_assert_eq!(bank.get(index), *value);
            }
        }
    }
}
