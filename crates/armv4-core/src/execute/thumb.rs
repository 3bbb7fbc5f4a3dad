//! Compressed-word instruction executor.
//!
//! Unlike the full-word executor, this path charges bus and internal
//! cycles as it goes, so compressed code is the timing-accurate half of
//! the core.

#![allow(
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::similar_names
)]

use log::warn;

use crate::core::Cpu;
use crate::decode::{decode_thumb, ThumbFormat};
use crate::execute::flags::{add_carry, add_carry_with, add_overflow, sub_overflow};
use crate::memory::{AccessWidth, CycleKind, MemoryBus};
use crate::shifter::{self, ShiftKind};
use crate::status::Condition;

impl Cpu {
    /// Executes one compressed instruction from the pipeline.
    pub(crate) fn execute_thumb<B: MemoryBus>(&mut self, instruction: u16, bus: &mut B) {
        let Some(format) = decode_thumb(instruction) else {
            warn!(
                "unassigned compressed encoding {instruction:#06x}, pc={:#010x}",
                self.bank.pc()
            );
            return;
        };
        let instruction = u32::from(instruction);
        match format {
            ThumbFormat::MoveShifted => self.thumb_move_shifted(instruction, bus),
            ThumbFormat::AddSubtract => self.thumb_add_subtract(instruction, bus),
            ThumbFormat::MoveCompareImm => self.thumb_move_compare_imm(instruction, bus),
            ThumbFormat::Alu => self.thumb_alu(instruction, bus),
            ThumbFormat::HiRegisterOps => self.thumb_hi_register_ops(instruction, bus),
            ThumbFormat::PcRelativeLoad => self.thumb_pc_relative_load(instruction, bus),
            ThumbFormat::LoadStoreRegOffset => self.thumb_load_store_reg_offset(instruction, bus),
            ThumbFormat::LoadStoreSignExtended => {
                self.thumb_load_store_sign_extended(instruction, bus);
            }
            ThumbFormat::LoadStoreImmOffset => self.thumb_load_store_imm_offset(instruction, bus),
            ThumbFormat::LoadStoreHalfword => self.thumb_load_store_halfword(instruction, bus),
            ThumbFormat::SpRelativeLoadStore => self.thumb_sp_relative(instruction, bus),
            ThumbFormat::LoadAddress => self.thumb_load_address(instruction),
            ThumbFormat::AdjustStackPointer => self.thumb_adjust_stack_pointer(instruction),
            ThumbFormat::PushPop => self.thumb_push_pop(instruction, bus),
            ThumbFormat::MultipleLoadStore => self.thumb_multiple_load_store(instruction, bus),
            ThumbFormat::ConditionalBranch => self.thumb_conditional_branch(instruction, bus),
            ThumbFormat::SoftwareInterrupt => {
                self.software_interrupt(self.bank.pc().wrapping_sub(2));
            }
            ThumbFormat::UnconditionalBranch => self.thumb_unconditional_branch(instruction, bus),
            ThumbFormat::LongBranchLink => self.thumb_long_branch_link(instruction),
        }
    }

    fn thumb_move_shifted<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_source = (instruction >> 3 & 7) as usize;
        let amount = instruction >> 6 & 0x1F;
        let opcode = instruction >> 11 & 3;

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );

        let value = self.bank.get(reg_source);
        let result = if opcode < 3 {
            let kind = match opcode {
                0 => ShiftKind::Lsl,
                1 => ShiftKind::Lsr,
                _ => ShiftKind::Asr,
            };
            let output = shifter::shift(kind, value, amount, self.status.carry(), true);
            self.status.set_carry(output.carry);
            output.value
        } else {
            value
        };
        self.bank.set(reg_dest, result);
        self.status.set_sign_zero(result);
    }

    fn thumb_add_subtract<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_source = (instruction >> 3 & 7) as usize;

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );

        let operand = if instruction & (1 << 10) != 0 {
            instruction >> 6 & 7
        } else {
            self.bank.get((instruction >> 6 & 7) as usize)
        };
        let source = self.bank.get(reg_source);

        let result = if instruction & (1 << 9) != 0 {
            let result = source.wrapping_sub(operand);
            self.status.set_carry(source >= operand);
            self.status.set_overflow(sub_overflow(source, operand, result));
            result
        } else {
            let result = source.wrapping_add(operand);
            self.status.set_carry(add_carry(source, operand));
            self.status.set_overflow(add_overflow(source, operand, result));
            result
        };
        self.status.set_sign_zero(result);
        self.bank.set(reg_dest, result);
    }

    fn thumb_move_compare_imm<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let immediate = instruction & 0xFF;
        let reg_dest = (instruction >> 8 & 7) as usize;

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );

        let current = self.bank.get(reg_dest);
        match instruction >> 11 & 3 {
            0b00 => {
                self.status.set_sign_zero(immediate);
                self.bank.set(reg_dest, immediate);
            }
            0b01 => {
                let result = current.wrapping_sub(immediate);
                self.status.set_carry(current >= immediate);
                self.status
                    .set_overflow(sub_overflow(current, immediate, result));
                self.status.set_sign_zero(result);
            }
            0b10 => {
                let result = current.wrapping_add(immediate);
                self.status.set_carry(add_carry(current, immediate));
                self.status
                    .set_overflow(add_overflow(current, immediate, result));
                self.status.set_sign_zero(result);
                self.bank.set(reg_dest, result);
            }
            _ => {
                let result = current.wrapping_sub(immediate);
                self.status.set_carry(current >= immediate);
                self.status
                    .set_overflow(sub_overflow(current, immediate, result));
                self.status.set_sign_zero(result);
                self.bank.set(reg_dest, result);
            }
        }
    }

    fn thumb_alu<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_source = (instruction >> 3 & 7) as usize;

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );

        let dest = self.bank.get(reg_dest);
        let source = self.bank.get(reg_source);
        match instruction >> 6 & 0xF {
            0b0000 => {
                let result = dest & source;
                self.bank.set(reg_dest, result);
                self.status.set_sign_zero(result);
            }
            0b0001 => {
                let result = dest ^ source;
                self.bank.set(reg_dest, result);
                self.status.set_sign_zero(result);
            }
            0b0010 => {
                let output = shifter::lsl(dest, source, self.status.carry());
                self.status.set_carry(output.carry);
                self.status.set_sign_zero(output.value);
                self.bank.set(reg_dest, output.value);
                self.sync_internal();
            }
            0b0011 => {
                let output = shifter::lsr(dest, source, self.status.carry(), false);
                self.status.set_carry(output.carry);
                self.status.set_sign_zero(output.value);
                self.bank.set(reg_dest, output.value);
                self.sync_internal();
            }
            0b0100 => {
                let output = shifter::asr(dest, source, self.status.carry(), false);
                self.status.set_carry(output.carry);
                self.status.set_sign_zero(output.value);
                self.bank.set(reg_dest, output.value);
                self.sync_internal();
            }
            0b0101 => {
                let carry = u32::from(self.status.carry());
                let result = dest.wrapping_add(source).wrapping_add(carry);
                self.status.set_carry(add_carry_with(dest, source, carry));
                self.status
                    .set_overflow(add_overflow(dest, source.wrapping_add(carry), result));
                self.status.set_sign_zero(result);
                self.bank.set(reg_dest, result);
            }
            0b0110 => {
                let carry = u32::from(self.status.carry());
                let result = dest.wrapping_sub(source).wrapping_add(carry).wrapping_sub(1);
                let adjusted = source.wrapping_add(carry).wrapping_sub(1);
                self.status.set_carry(dest >= adjusted);
                self.status.set_overflow(sub_overflow(dest, adjusted, result));
                self.status.set_sign_zero(result);
                self.bank.set(reg_dest, result);
            }
            0b0111 => {
                let output = shifter::ror(dest, source, self.status.carry(), false);
                self.status.set_carry(output.carry);
                self.status.set_sign_zero(output.value);
                self.bank.set(reg_dest, output.value);
                self.sync_internal();
            }
            0b1000 => {
                let result = dest & source;
                self.status.set_sign_zero(result);
            }
            0b1001 => {
                let result = 0u32.wrapping_sub(source);
                self.status.set_carry(0 >= source);
                self.status.set_overflow(sub_overflow(0, source, result));
                self.status.set_sign_zero(result);
                self.bank.set(reg_dest, result);
            }
            0b1010 => {
                let result = dest.wrapping_sub(source);
                self.status.set_carry(dest >= source);
                self.status.set_overflow(sub_overflow(dest, source, result));
                self.status.set_sign_zero(result);
            }
            0b1011 => {
                let result = dest.wrapping_add(source);
                self.status.set_carry(add_carry(dest, source));
                self.status.set_overflow(add_overflow(dest, source, result));
                self.status.set_sign_zero(result);
            }
            0b1100 => {
                let result = dest | source;
                self.bank.set(reg_dest, result);
                self.status.set_sign_zero(result);
            }
            0b1101 => {
                let result = dest.wrapping_mul(source);
                self.bank.set(reg_dest, result);
                self.status.set_sign_zero(result);
                self.status.set_carry(false);
            }
            0b1110 => {
                let result = dest & !source;
                self.bank.set(reg_dest, result);
                self.status.set_sign_zero(result);
            }
            _ => {
                let result = !source;
                self.bank.set(reg_dest, result);
                self.status.set_sign_zero(result);
            }
        }
    }

    fn thumb_hi_register_ops<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let mut reg_dest = (instruction & 7) as usize;
        let mut reg_source = (instruction >> 3 & 7) as usize;
        let mut compare = false;

        match instruction >> 6 & 3 {
            0b01 => reg_source += 8,
            0b10 => reg_dest += 8,
            0b11 => {
                reg_dest += 8;
                reg_source += 8;
            }
            _ => {}
        }

        let mut operand = self.bank.get(reg_source);
        if reg_source == 15 {
            operand &= !1;
        }

        match instruction >> 8 & 3 {
            0b00 => {
                let result = self.bank.get(reg_dest).wrapping_add(operand);
                self.bank.set(reg_dest, result);
            }
            0b01 => {
                let dest = self.bank.get(reg_dest);
                let result = dest.wrapping_sub(operand);
                self.status.set_carry(dest >= operand);
                self.status.set_overflow(sub_overflow(dest, operand, result));
                self.status.set_sign_zero(result);
                compare = true;
            }
            0b10 => {
                self.bank.set(reg_dest, operand);
            }
            _ => {
                // Prefetch cycle, even though the fetched word is discarded.
                self.sync(
                    bus,
                    self.bank.pc(),
                    AccessWidth::Halfword,
                    false,
                    CycleKind::NonSequential,
                );
                if operand & 1 != 0 {
                    self.bank.set_pc(operand & !1);
                    self.sync(
                        bus,
                        self.bank.pc(),
                        AccessWidth::Halfword,
                        false,
                        CycleKind::Sequential,
                    );
                    self.sync(
                        bus,
                        self.bank.pc().wrapping_add(2),
                        AccessWidth::Halfword,
                        false,
                        CycleKind::Sequential,
                    );
                } else {
                    self.status.set_thumb(false);
                    self.bank.set_pc(operand & !3);
                    self.sync(
                        bus,
                        self.bank.pc(),
                        AccessWidth::Word,
                        false,
                        CycleKind::Sequential,
                    );
                    self.sync(
                        bus,
                        self.bank.pc().wrapping_add(4),
                        AccessWidth::Word,
                        false,
                        CycleKind::Sequential,
                    );
                }
                self.pipeline.request_flush();
            }
        }

        if reg_dest == 15 && !compare {
            self.bank.set_pc(self.bank.pc() & !1);
            self.pipeline.request_flush();
        }
    }

    fn thumb_pc_relative_load<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let immediate = instruction & 0xFF;
        let reg_dest = (instruction >> 8 & 7) as usize;
        let address = (self.bank.pc() & !2).wrapping_add(immediate << 2);

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::NonSequential,
        );
        self.sync(bus, address, AccessWidth::Word, false, CycleKind::NonSequential);
        let value = bus.read_word(address);
        self.sync(
            bus,
            self.bank.pc().wrapping_add(2),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );
        self.bank.set(reg_dest, value);
    }

    fn thumb_load_store_reg_offset<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_base = (instruction >> 3 & 7) as usize;
        let reg_offset = (instruction >> 6 & 7) as usize;
        let address = self.bank.get(reg_base).wrapping_add(self.bank.get(reg_offset));

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::NonSequential,
        );

        match instruction >> 10 & 3 {
            0b00 => {
                self.sync(bus, address, AccessWidth::Word, true, CycleKind::NonSequential);
                bus.write_word(address, self.bank.get(reg_dest));
            }
            0b01 => {
                self.sync(bus, address, AccessWidth::Byte, true, CycleKind::NonSequential);
                bus.write_byte(address, self.bank.get(reg_dest) as u8);
            }
            0b10 => {
                let value = bus.read_word(address & !3).rotate_right((address & 3) * 8);
                self.sync(bus, address, AccessWidth::Word, false, CycleKind::NonSequential);
                self.sync(
                    bus,
                    self.bank.pc().wrapping_add(2),
                    AccessWidth::Halfword,
                    false,
                    CycleKind::Sequential,
                );
                self.bank.set(reg_dest, value);
            }
            _ => {
                let value = u32::from(bus.read_byte(address));
                self.sync(bus, address, AccessWidth::Byte, false, CycleKind::NonSequential);
                self.sync(
                    bus,
                    self.bank.pc().wrapping_add(2),
                    AccessWidth::Halfword,
                    false,
                    CycleKind::Sequential,
                );
                self.bank.set(reg_dest, value);
            }
        }
    }

    fn thumb_load_store_sign_extended<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_base = (instruction >> 3 & 7) as usize;
        let reg_offset = (instruction >> 6 & 7) as usize;
        let address = self.bank.get(reg_base).wrapping_add(self.bank.get(reg_offset));

        match instruction >> 10 & 3 {
            0b00 => {
                bus.write_halfword(address, self.bank.get(reg_dest) as u16);
            }
            0b01 => {
                let value = i32::from(bus.read_byte(address) as i8) as u32;
                self.bank.set(reg_dest, value);
            }
            0b10 => {
                self.bank.set(reg_dest, u32::from(bus.read_halfword(address)));
            }
            _ => {
                let value = if address & 1 != 0 {
                    i32::from(bus.read_byte(address & !1) as i8) as u32
                } else {
                    i32::from(bus.read_halfword(address) as i16) as u32
                };
                self.bank.set(reg_dest, value);
            }
        }
    }

    fn thumb_load_store_imm_offset<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_base = (instruction >> 3 & 7) as usize;
        let immediate = instruction >> 6 & 0x1F;

        match instruction >> 11 & 3 {
            0b00 => {
                let address = self.bank.get(reg_base).wrapping_add(immediate << 2);
                bus.write_word(address, self.bank.get(reg_dest));
            }
            0b01 => {
                let address = self.bank.get(reg_base).wrapping_add(immediate << 2);
                let value = bus.read_word(address & !3).rotate_right((address & 3) * 8);
                self.bank.set(reg_dest, value);
            }
            0b10 => {
                let address = self.bank.get(reg_base).wrapping_add(immediate);
                bus.write_byte(address, self.bank.get(reg_dest) as u8);
            }
            _ => {
                let address = self.bank.get(reg_base).wrapping_add(immediate);
                self.bank.set(reg_dest, u32::from(bus.read_byte(address)));
            }
        }
    }

    fn thumb_load_store_halfword<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = (instruction & 7) as usize;
        let reg_base = (instruction >> 3 & 7) as usize;
        let immediate = instruction >> 6 & 0x1F;
        let address = self.bank.get(reg_base).wrapping_add(immediate << 1);

        if instruction & (1 << 11) != 0 {
            self.bank.set(reg_dest, u32::from(bus.read_halfword(address)));
        } else {
            bus.write_halfword(address, self.bank.get(reg_dest) as u16);
        }
    }

    fn thumb_sp_relative<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let immediate = instruction & 0xFF;
        let reg_dest = (instruction >> 8 & 7) as usize;
        let address = self.bank.get(13).wrapping_add(immediate << 2);

        if instruction & (1 << 11) != 0 {
            let value = bus.read_word(address & !3).rotate_right((address & 3) * 8);
            self.bank.set(reg_dest, value);
        } else {
            bus.write_word(address, self.bank.get(reg_dest));
        }
    }

    fn thumb_load_address(&mut self, instruction: u32) {
        let immediate = instruction & 0xFF;
        let reg_dest = (instruction >> 8 & 7) as usize;

        let base = if instruction & (1 << 11) != 0 {
            self.bank.get(13)
        } else {
            self.bank.pc() & !2
        };
        self.bank.set(reg_dest, base.wrapping_add(immediate << 2));
    }

    fn thumb_adjust_stack_pointer(&mut self, instruction: u32) {
        let immediate = (instruction & 0x7F) << 2;
        let sp = self.bank.get(13);
        if instruction & 0x80 != 0 {
            self.bank.set(13, sp.wrapping_sub(immediate));
        } else {
            self.bank.set(13, sp.wrapping_add(immediate));
        }
    }

    fn thumb_push_pop<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        if instruction & (1 << 11) != 0 {
            for i in 0..8 {
                if instruction & (1 << i) != 0 {
                    let sp = self.bank.get(13);
                    let value = bus.read_word(sp);
                    self.bank.set(i, value);
                    self.bank.set(13, sp.wrapping_add(4));
                }
            }
            if instruction & (1 << 8) != 0 {
                let sp = self.bank.get(13);
                self.bank.set_pc(bus.read_word(sp) & !1);
                self.bank.set(13, sp.wrapping_add(4));
                self.pipeline.request_flush();
            }
        } else {
            if instruction & (1 << 8) != 0 {
                let sp = self.bank.get(13).wrapping_sub(4);
                self.bank.set(13, sp);
                bus.write_word(sp, self.bank.get(14));
            }
            for i in (0..8).rev() {
                if instruction & (1 << i) != 0 {
                    let sp = self.bank.get(13).wrapping_sub(4);
                    self.bank.set(13, sp);
                    bus.write_word(sp, self.bank.get(i));
                }
            }
        }
    }

    fn thumb_multiple_load_store<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_base = (instruction >> 8 & 7) as usize;
        let mut write_back = true;
        let mut address = self.bank.get(reg_base);
        let first_register = (0..8).find(|i| instruction & (1 << i) != 0).unwrap_or(0);

        if instruction & (1 << 11) != 0 {
            for i in 0..8 {
                if instruction & (1 << i) != 0 {
                    if i == reg_base {
                        write_back = false;
                    }
                    let value = bus.read_word(address);
                    self.bank.set(i, value);
                    address = address.wrapping_add(4);
                    if write_back {
                        self.bank.set(reg_base, address);
                    }
                }
            }
        } else {
            for i in 0..8 {
                if instruction & (1 << i) != 0 {
                    let value = if i == reg_base && i == first_register {
                        address
                    } else {
                        self.bank.get(i)
                    };
                    let base = self.bank.get(reg_base);
                    bus.write_word(base, value);
                    self.bank.set(reg_base, base.wrapping_add(4));
                }
            }
        }
    }

    fn thumb_conditional_branch<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::NonSequential,
        );

        if !Condition::from_field(instruction >> 8).passes(self.status) {
            return;
        }

        let mut offset = instruction & 0xFF;
        if offset & 0x80 != 0 {
            offset |= 0xFFFF_FF00;
        }
        self.bank
            .set_pc(self.bank.pc().wrapping_add(offset.wrapping_shl(1)));
        self.pipeline.request_flush();

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );
        self.sync(
            bus,
            self.bank.pc().wrapping_add(2),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );
    }

    fn thumb_unconditional_branch<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let mut offset = (instruction & 0x3FF) << 1;

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::NonSequential,
        );

        if instruction & 0x400 != 0 {
            offset |= 0xFFFF_F800;
        }
        self.bank.set_pc(self.bank.pc().wrapping_add(offset));
        self.pipeline.request_flush();

        self.sync(
            bus,
            self.bank.pc(),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );
        self.sync(
            bus,
            self.bank.pc().wrapping_add(2),
            AccessWidth::Halfword,
            false,
            CycleKind::Sequential,
        );
    }

    fn thumb_long_branch_link(&mut self, instruction: u32) {
        let immediate = instruction & 0x7FF;
        if instruction & (1 << 11) != 0 {
            // Second half: combine with the partial target in r14 inside a
            // 23-bit window, and leave the return address with the
            // compressed-mode marker bit.
            let return_address = self.bank.pc().wrapping_sub(2);
            let target = self.bank.get(14).wrapping_add(immediate << 1) & 0x007F_FFFF;
            let pc = (self.bank.pc() & !0x007F_FFFF) | (target & !1);
            self.bank.set_pc(pc);
            self.bank.set(14, return_address | 1);
            self.pipeline.request_flush();
        } else {
            // First half: stage the upper part of the offset in r14.
            self.bank
                .set(14, self.bank.pc().wrapping_add(immediate << 12));
        }
    }
}
