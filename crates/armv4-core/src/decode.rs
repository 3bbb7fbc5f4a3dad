//! Instruction format classification for both encodings.
//!
//! Classification is an ordered mask cascade: the first pattern that
//! matches wins, so overlapping encodings (multiply vs. data processing,
//! swap vs. halfword transfer) resolve the way the hardware prioritizes
//! them. Field extraction happens later, in the executors.

/// The sixteen full-word (32-bit) instruction format categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmFormat {
    /// Multiply and multiply-accumulate.
    Multiply,
    /// Long multiply and multiply-accumulate.
    MultiplyLong,
    /// Branch and exchange instruction set.
    BranchExchange,
    /// Atomic single data swap.
    SingleSwap,
    /// Halfword transfer with register offset.
    HalfwordRegOffset,
    /// Halfword transfer with immediate offset.
    HalfwordImmOffset,
    /// Signed byte and halfword loads.
    SignedTransfer,
    /// Data processing and status register transfer.
    DataProcessing,
    /// Single word or unsigned byte transfer.
    SingleTransfer,
    /// Architecturally undefined space.
    Undefined,
    /// Block transfer of a register list.
    BlockTransfer,
    /// Branch with optional link.
    Branch,
    /// Coprocessor data transfer.
    CoprocessorTransfer,
    /// Coprocessor data operation.
    CoprocessorOperation,
    /// Coprocessor register transfer.
    CoprocessorRegister,
    /// Software interrupt.
    SoftwareInterrupt,
}

/// The nineteen compressed (16-bit) instruction format categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbFormat {
    /// Shift a register by a 5-bit immediate.
    MoveShifted,
    /// Add or subtract a register or 3-bit immediate.
    AddSubtract,
    /// Move, compare, add or subtract an 8-bit immediate.
    MoveCompareImm,
    /// Register-to-register ALU operations.
    Alu,
    /// High-register operations and branch exchange.
    HiRegisterOps,
    /// PC-relative word load.
    PcRelativeLoad,
    /// Load or store with register offset.
    LoadStoreRegOffset,
    /// Load or store sign-extended byte or halfword.
    LoadStoreSignExtended,
    /// Load or store with immediate offset.
    LoadStoreImmOffset,
    /// Load or store a halfword with immediate offset.
    LoadStoreHalfword,
    /// Stack-pointer-relative word load or store.
    SpRelativeLoadStore,
    /// Compute an address from PC or SP.
    LoadAddress,
    /// Adjust the stack pointer by a signed immediate.
    AdjustStackPointer,
    /// Push onto or pop from the stack.
    PushPop,
    /// Multiple load or store with post-increment.
    MultipleLoadStore,
    /// Conditional branch with 8-bit offset.
    ConditionalBranch,
    /// Software interrupt.
    SoftwareInterrupt,
    /// Unconditional branch with 11-bit offset.
    UnconditionalBranch,
    /// Two-instruction long branch with link.
    LongBranchLink,
}

/// Classifies a full-word instruction. Total: every 32-bit pattern maps to
/// a format, with unassigned load/store space landing in `Undefined`.
#[must_use]
pub const fn decode_arm(instruction: u32) -> ArmFormat {
    let opcode = instruction & 0x0FFF_FFFF;
    match opcode >> 26 {
        0b00 => {
            if opcode & (1 << 25) != 0 {
                ArmFormat::DataProcessing
            } else if opcode & 0x0FF0_0FF0 == 0x0120_0F10 {
                ArmFormat::BranchExchange
            } else if opcode & 0x0100_00F0 == 0x90 {
                if opcode & (1 << 23) != 0 {
                    ArmFormat::MultiplyLong
                } else {
                    ArmFormat::Multiply
                }
            } else if opcode & 0x0100_00F0 == 0x0100_0090 {
                ArmFormat::SingleSwap
            } else if opcode & 0x0040_00F0 == 0xB0 {
                ArmFormat::HalfwordRegOffset
            } else if opcode & 0x0040_00F0 == 0x0040_00B0 {
                ArmFormat::HalfwordImmOffset
            } else if opcode & 0xD0 == 0xD0 {
                ArmFormat::SignedTransfer
            } else {
                ArmFormat::DataProcessing
            }
        }
        0b01 => {
            if opcode & 0x0200_0010 == 0x0200_0010 {
                ArmFormat::Undefined
            } else {
                ArmFormat::SingleTransfer
            }
        }
        0b10 => {
            if opcode & (1 << 25) != 0 {
                ArmFormat::Branch
            } else {
                ArmFormat::BlockTransfer
            }
        }
        _ => {
            if opcode & (1 << 25) != 0 {
                if opcode & (1 << 24) != 0 {
                    ArmFormat::SoftwareInterrupt
                } else if opcode & 0x10 != 0 {
                    ArmFormat::CoprocessorRegister
                } else {
                    ArmFormat::CoprocessorOperation
                }
            } else {
                ArmFormat::CoprocessorTransfer
            }
        }
    }
}

/// Classifies a compressed instruction, or `None` for the hole in the
/// encoding space between the unconditional branch and the long branch
/// prefix.
#[must_use]
pub const fn decode_thumb(instruction: u16) -> Option<ThumbFormat> {
    if instruction & 0xF800 < 0x1800 {
        Some(ThumbFormat::MoveShifted)
    } else if instruction & 0xF800 == 0x1800 {
        Some(ThumbFormat::AddSubtract)
    } else if instruction & 0xE000 == 0x2000 {
        Some(ThumbFormat::MoveCompareImm)
    } else if instruction & 0xFC00 == 0x4000 {
        Some(ThumbFormat::Alu)
    } else if instruction & 0xFC00 == 0x4400 {
        Some(ThumbFormat::HiRegisterOps)
    } else if instruction & 0xF800 == 0x4800 {
        Some(ThumbFormat::PcRelativeLoad)
    } else if instruction & 0xF200 == 0x5000 {
        Some(ThumbFormat::LoadStoreRegOffset)
    } else if instruction & 0xF200 == 0x5200 {
        Some(ThumbFormat::LoadStoreSignExtended)
    } else if instruction & 0xE000 == 0x6000 {
        Some(ThumbFormat::LoadStoreImmOffset)
    } else if instruction & 0xF000 == 0x8000 {
        Some(ThumbFormat::LoadStoreHalfword)
    } else if instruction & 0xF000 == 0x9000 {
        Some(ThumbFormat::SpRelativeLoadStore)
    } else if instruction & 0xF000 == 0xA000 {
        Some(ThumbFormat::LoadAddress)
    } else if instruction & 0xFF00 == 0xB000 {
        Some(ThumbFormat::AdjustStackPointer)
    } else if instruction & 0xF600 == 0xB400 {
        Some(ThumbFormat::PushPop)
    } else if instruction & 0xF000 == 0xC000 {
        Some(ThumbFormat::MultipleLoadStore)
    } else if instruction & 0xFF00 < 0xDF00 {
        Some(ThumbFormat::ConditionalBranch)
    } else if instruction & 0xFF00 == 0xDF00 {
        Some(ThumbFormat::SoftwareInterrupt)
    } else if instruction & 0xF800 == 0xE000 {
        Some(ThumbFormat::UnconditionalBranch)
    } else if instruction & 0xF000 == 0xF000 {
        Some(ThumbFormat::LongBranchLink)
    } else {
        None
    }
}
