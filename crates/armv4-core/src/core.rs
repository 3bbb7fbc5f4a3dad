//! Core construction, the cycle-step driver and exception entry.

use log::{trace, warn};

use crate::error::CoreError;
use crate::exception::Exception;
use crate::memory::{AccessWidth, CycleKind, MemoryBus};
use crate::state::{Pipeline, RegisterBank};
use crate::status::{Mode, ProgramStatus};

/// Architecture revision selector.
///
/// Both revisions share the behavior implemented here; the knob is carried
/// so hosts can declare which family member they are wiring up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ArchVersion {
    /// ARMv4T behavior.
    #[default]
    V4,
    /// ARMv5 family member driven with v4 semantics.
    V5,
}

/// Construction-time configuration of a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Architecture revision.
    pub version: ArchVersion,
    /// Base address of the exception vector table.
    pub base_vector: u32,
}

/// Host override for software interrupt instructions.
///
/// When installed, both encodings of the software interrupt call the hook
/// instead of taking the architectural vectored path. High-level BIOS
/// replacements hang off this trait.
pub trait SwiHook {
    /// Called in place of vectored software interrupt entry. The executing
    /// instruction is still in the pipeline, so the hook can recover the
    /// comment field if it needs one.
    fn on_software_interrupt(&mut self, cpu: &mut Cpu);
}

/// Serializable image of a core's architectural state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreSnapshot {
    /// Register file and banking state.
    pub bank: RegisterBank,
    /// Current program status word.
    pub status: ProgramStatus,
    /// Prefetch pipeline contents and driver state.
    pub pipeline: Pipeline,
    /// Accumulated cycle count.
    pub cycles: u64,
}

/// One interpreter core.
pub struct Cpu {
    pub(crate) bank: RegisterBank,
    pub(crate) status: ProgramStatus,
    pub(crate) pipeline: Pipeline,
    pub(crate) cycles: u64,
    config: CoreConfig,
    swi_hook: Option<Box<dyn SwiHook>>,
}

impl Cpu {
    /// Builds a core in the reset state: system mode, empty pipeline.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            bank: RegisterBank::new(),
            status: ProgramStatus::for_mode(Mode::System),
            pipeline: Pipeline::new(),
            cycles: 0,
            config,
            swi_hook: None,
        }
    }

    /// Builds a core with a software interrupt hook installed.
    #[must_use]
    pub fn with_swi_hook(config: CoreConfig, hook: Box<dyn SwiHook>) -> Self {
        let mut cpu = Self::new(config);
        cpu.swi_hook = Some(hook);
        cpu
    }

    /// Returns the core to the reset state. The hook and configuration
    /// survive.
    pub fn reset(&mut self) {
        self.bank = RegisterBank::new();
        self.status = ProgramStatus::for_mode(Mode::System);
        self.pipeline = Pipeline::new();
        self.cycles = 0;
    }

    /// The configuration the core was built with.
    #[must_use]
    pub const fn config(&self) -> CoreConfig {
        self.config
    }

    /// Reads a register as currently banked.
    #[must_use]
    pub fn reg(&self, index: usize) -> u32 {
        self.bank.get(index)
    }

    /// Writes a register as currently banked.
    pub fn set_reg(&mut self, index: usize, value: u32) {
        self.bank.set(index, value);
    }

    /// The program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.bank.pc()
    }

    /// Moves the program counter and discards the prefetched opcodes.
    pub fn jump(&mut self, address: u32) {
        self.bank.set_pc(address);
        self.pipeline.reset();
    }

    /// Current program status word.
    #[must_use]
    pub const fn status(&self) -> ProgramStatus {
        self.status
    }

    /// Replaces the status word, rebuilding the bank mapping when the mode
    /// bits change to a valid mode.
    pub fn set_status(&mut self, status: ProgramStatus) {
        self.write_status(status.0);
    }

    /// Cycles consumed so far.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Captures a serializable image of the architectural state.
    #[must_use]
    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            bank: self.bank.clone(),
            status: self.status,
            pipeline: self.pipeline,
            cycles: self.cycles,
        }
    }

    /// Restores a previously captured snapshot.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidMode`] when the snapshot's status word
    /// does not carry a valid mode.
    pub fn restore(&mut self, snapshot: &CoreSnapshot) -> Result<(), CoreError> {
        let mode = snapshot.status.checked_mode()?;
        self.bank = snapshot.bank.clone();
        self.status = snapshot.status;
        self.pipeline = snapshot.pipeline;
        self.cycles = snapshot.cycles;
        self.bank.remap(mode);
        Ok(())
    }

    /// Advances the core by one step: one fetch, plus one execute once the
    /// pipeline is full.
    #[allow(clippy::cast_possible_truncation)]
    pub fn step<B: MemoryBus>(&mut self, bus: &mut B) {
        let thumb = self.status.thumb();
        if thumb {
            self.bank.set_pc(self.bank.pc() & !1);
            let opcode = u32::from(bus.read_halfword(self.bank.pc()));
            self.pipeline.store_fetch(opcode);
            if let Some(executing) = self.pipeline.executing_opcode() {
                self.execute_thumb(executing as u16, bus);
            }
        } else {
            self.bank.set_pc(self.bank.pc() & !3);
            let opcode = bus.read_word(self.bank.pc());
            self.pipeline.store_fetch(opcode);
            if let Some(executing) = self.pipeline.executing_opcode() {
                self.execute_arm(executing, bus);
            }
        }
        if self.pipeline.flush_pending() {
            self.pipeline.reset();
            return;
        }
        self.bank.advance_pc(if thumb { 2 } else { 4 });
        self.pipeline.advance();
    }

    /// Takes the normal interrupt entry path, unless interrupts are masked.
    pub fn trigger_irq(&mut self) {
        if self.status.irq_disabled() {
            return;
        }
        let pipeline_depth = if self.status.thumb() { 4 } else { 8 };
        let return_address = self.bank.pc().wrapping_sub(pipeline_depth).wrapping_add(4);
        trace!(
            "irq entry, return address {return_address:#010x}, from mode bits {:#04x}",
            self.status.mode_bits()
        );
        self.bank.set_link_for(Mode::Irq, return_address);
        self.bank
            .set_pc(Exception::Irq.vector(self.config.base_vector));
        self.bank.set_spsr_for(Mode::Irq, self.status.0);
        self.status.set_mode(Mode::Irq);
        self.status.set_thumb(false);
        self.status.0 |= ProgramStatus::IRQ_DISABLE;
        self.bank.remap(Mode::Irq);
        self.pipeline.reset();
    }

    /// Architectural software interrupt entry, used when no hook is
    /// installed. `return_address` is the address of the instruction after
    /// the trap.
    pub(crate) fn vectored_software_interrupt(&mut self, return_address: u32) {
        trace!("software interrupt, return address {return_address:#010x}");
        self.bank.set_link_for(Mode::Supervisor, return_address);
        self.bank
            .set_pc(Exception::Software.vector(self.config.base_vector));
        self.bank.set_spsr_for(Mode::Supervisor, self.status.0);
        self.status.set_mode(Mode::Supervisor);
        self.status.set_thumb(false);
        self.status.0 |= ProgramStatus::IRQ_DISABLE;
        self.bank.remap(Mode::Supervisor);
        self.pipeline.request_flush();
    }

    /// Dispatches a software interrupt to the hook if one is installed,
    /// otherwise takes the vectored path.
    pub(crate) fn software_interrupt(&mut self, return_address: u32) {
        if let Some(mut hook) = self.swi_hook.take() {
            hook.on_software_interrupt(self);
            if self.swi_hook.is_none() {
                self.swi_hook = Some(hook);
            }
        } else {
            self.vectored_software_interrupt(return_address);
        }
    }

    /// Writes a raw status word, remapping the bank when the mode bits are
    /// valid. Invalid mode bits keep the previous mapping, as the banking
    /// table has no entry for them.
    pub(crate) fn write_status(&mut self, value: u32) {
        self.status = ProgramStatus(value);
        match self.status.mode() {
            Some(mode) => self.bank.remap(mode),
            None => warn!(
                "status write with invalid mode bits {:#04x}, bank mapping unchanged",
                self.status.mode_bits()
            ),
        }
    }

    /// Charges one bus cycle plus the bus-reported wait states.
    pub(crate) fn sync<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        address: u32,
        width: AccessWidth,
        write: bool,
        kind: CycleKind,
    ) {
        self.cycles += 1 + u64::from(bus.cycle_cost(address, width, write, kind));
    }

    /// Charges one internal cycle.
    pub(crate) fn sync_internal(&mut self) {
        self.cycles += 1;
    }
}
