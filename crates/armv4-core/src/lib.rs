//! Cycle-stepped interpreter core for the ARMv4T processor family.
//!
//! The core executes both the full-word and the compressed instruction
//! encodings through a three-slot prefetch pipeline, driven one fetch at a
//! time by [`Cpu::step`]. Memory is abstracted behind the [`MemoryBus`]
//! trait, so the host owns the address map and the wait-state model.

/// Core construction, the cycle-step driver and exception entry.
pub mod core;
pub use self::core::{ArchVersion, CoreConfig, CoreSnapshot, Cpu, SwiHook};

/// Instruction format classification for both encodings.
pub mod decode;
pub use decode::{decode_arm, decode_thumb, ArmFormat, ThumbFormat};

/// Error taxonomy for fallible host-facing operations.
pub mod error;
pub use error::CoreError;

/// Exception vectors.
pub mod exception;
pub use exception::Exception;

/// Instruction execution for both encodings.
pub mod execute;
pub use execute::{add_carry, add_carry_with, add_overflow, sub_overflow};

/// Memory bus abstraction and access classification.
pub mod memory;
pub use memory::{AccessWidth, CycleKind, MemoryBus};

/// Barrel shifter operations.
pub mod shifter;
pub use shifter::{asr, lsl, lsr, ror, shift, ShiftKind, ShiftOutput};

/// Register banking and the prefetch pipeline.
pub mod state;
pub use state::{Pipeline, PipelineStage, RegisterBank, RegisterSlot};

/// Program status word, processor modes and condition codes.
pub mod status;
pub use status::{Condition, Mode, ProgramStatus};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
