//! Full-word instruction executor.

#![allow(
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::similar_names
)]

use log::warn;

use crate::core::Cpu;
use crate::decode::{decode_arm, ArmFormat};
use crate::execute::flags::{add_carry, add_carry_with, add_overflow, sub_overflow};
use crate::memory::MemoryBus;
use crate::shifter::{self, ShiftKind};
use crate::status::{Condition, Mode, ProgramStatus};

impl Cpu {
    /// Executes one full-word instruction from the pipeline.
    pub(crate) fn execute_arm<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        if !Condition::from_field(instruction >> 28).passes(self.status) {
            return;
        }
        let format = decode_arm(instruction);
        match format {
            ArmFormat::Multiply => self.arm_multiply(instruction),
            ArmFormat::MultiplyLong => self.arm_multiply_long(instruction),
            ArmFormat::BranchExchange => self.arm_branch_exchange(instruction),
            ArmFormat::SingleSwap => self.arm_single_swap(instruction, bus),
            ArmFormat::HalfwordRegOffset | ArmFormat::HalfwordImmOffset => {
                self.arm_halfword_transfer(instruction, false, bus);
            }
            ArmFormat::SignedTransfer => self.arm_halfword_transfer(instruction, true, bus),
            ArmFormat::DataProcessing => self.arm_data_processing(instruction),
            ArmFormat::SingleTransfer => self.arm_single_transfer(instruction, bus),
            ArmFormat::Undefined => {
                warn!(
                    "undefined instruction {instruction:#010x}, pc={:#010x}",
                    self.bank.pc()
                );
            }
            ArmFormat::BlockTransfer => self.arm_block_transfer(instruction, bus),
            ArmFormat::Branch => self.arm_branch(instruction),
            ArmFormat::CoprocessorTransfer
            | ArmFormat::CoprocessorOperation
            | ArmFormat::CoprocessorRegister => {
                warn!(
                    "unimplemented coprocessor instruction {instruction:#010x}, pc={:#010x}",
                    self.bank.pc()
                );
            }
            ArmFormat::SoftwareInterrupt => {
                self.software_interrupt(self.bank.pc().wrapping_sub(4));
            }
        }
    }

    fn arm_multiply(&mut self, instruction: u32) {
        let reg_operand1 = (instruction & 0xF) as usize;
        let reg_operand2 = ((instruction >> 8) & 0xF) as usize;
        let reg_accumulate = ((instruction >> 12) & 0xF) as usize;
        let reg_dest = ((instruction >> 16) & 0xF) as usize;
        let set_flags = instruction & (1 << 20) != 0;
        let accumulate = instruction & (1 << 21) != 0;

        let mut result = self
            .bank
            .get(reg_operand1)
            .wrapping_mul(self.bank.get(reg_operand2));
        if accumulate {
            result = result.wrapping_add(self.bank.get(reg_accumulate));
        }
        self.bank.set(reg_dest, result);
        if set_flags {
            self.status.set_sign_zero(result);
        }
    }

    fn arm_multiply_long(&mut self, instruction: u32) {
        let reg_operand1 = (instruction & 0xF) as usize;
        let reg_operand2 = ((instruction >> 8) & 0xF) as usize;
        let reg_dest_low = ((instruction >> 12) & 0xF) as usize;
        let reg_dest_high = ((instruction >> 16) & 0xF) as usize;
        let set_flags = instruction & (1 << 20) != 0;
        let accumulate = instruction & (1 << 21) != 0;
        let signed = instruction & (1 << 22) != 0;

        let operand1 = self.bank.get(reg_operand1);
        let operand2 = self.bank.get(reg_operand2);
        let mut result = if signed {
            i64::from(operand1 as i32).wrapping_mul(i64::from(operand2 as i32)) as u64
        } else {
            u64::from(operand1).wrapping_mul(u64::from(operand2))
        };
        if accumulate {
            let value = u64::from(self.bank.get(reg_dest_high)) << 32
                | u64::from(self.bank.get(reg_dest_low));
            result = result.wrapping_add(value);
        }
        self.bank.set(reg_dest_low, result as u32);
        self.bank.set(reg_dest_high, (result >> 32) as u32);
        if set_flags {
            self.status.set_sign_zero_long(result);
        }
    }

    fn arm_branch_exchange(&mut self, instruction: u32) {
        let address = self.bank.get((instruction & 0xF) as usize);
        if address & 1 != 0 {
            self.bank.set_pc(address & !1);
            self.status.set_thumb(true);
        } else {
            self.bank.set_pc(address & !3);
        }
        self.pipeline.request_flush();
    }

    fn arm_single_swap<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_source = (instruction & 0xF) as usize;
        let reg_dest = ((instruction >> 12) & 0xF) as usize;
        let reg_base = ((instruction >> 16) & 0xF) as usize;
        let swap_byte = instruction & (1 << 22) != 0;

        if reg_source == 15 || reg_dest == 15 || reg_base == 15 {
            warn!("swap must not use r15, pc={:#010x}", self.bank.pc());
        }

        let address = self.bank.get(reg_base);
        if swap_byte {
            let old = u32::from(bus.read_byte(address));
            bus.write_byte(address, self.bank.get(reg_source) as u8);
            self.bank.set(reg_dest, old);
        } else {
            let old = bus.read_word(address).rotate_right((address & 3) * 8);
            bus.write_word(address, self.bank.get(reg_source));
            self.bank.set(reg_dest, old);
        }
    }

    fn arm_halfword_transfer<B: MemoryBus>(&mut self, instruction: u32, signed: bool, bus: &mut B) {
        let reg_dest = ((instruction >> 12) & 0xF) as usize;
        let reg_base = ((instruction >> 16) & 0xF) as usize;
        let load = instruction & (1 << 20) != 0;
        let write_back = instruction & (1 << 21) != 0;
        let immediate = instruction & (1 << 22) != 0;
        let add_to_base = instruction & (1 << 23) != 0;
        let pre_indexed = instruction & (1 << 24) != 0;
        let mut address = self.bank.get(reg_base);

        if reg_base == 15 && write_back {
            warn!(
                "halfword transfer write-back to r15, pc={:#010x}",
                self.bank.pc()
            );
        }
        if write_back && !pre_indexed {
            warn!(
                "halfword transfer has the write-back bit while post-indexed, pc={:#010x}",
                self.bank.pc()
            );
        }
        if signed && !load {
            warn!("signed transfer used as a store, pc={:#010x}", self.bank.pc());
        }

        let offset = if immediate {
            (instruction & 0xF) | (instruction >> 4 & 0xF0)
        } else {
            let reg_offset = (instruction & 0xF) as usize;
            if reg_offset == 15 {
                warn!(
                    "halfword transfer takes r15 as offset, pc={:#010x}",
                    self.bank.pc()
                );
            }
            self.bank.get(reg_offset)
        };

        if pre_indexed {
            address = if add_to_base {
                address.wrapping_add(offset)
            } else {
                address.wrapping_sub(offset)
            };
        }

        if load {
            let value = if signed {
                let halfword = instruction & (1 << 5) != 0;
                if halfword {
                    if address & 1 != 0 {
                        // Misaligned signed halfword loads degrade to a
                        // sign-extended byte from the aligned address.
                        i32::from(bus.read_byte(address & !1) as i8) as u32
                    } else {
                        i32::from(bus.read_halfword(address) as i16) as u32
                    }
                } else {
                    i32::from(bus.read_byte(address) as i8) as u32
                }
            } else {
                u32::from(bus.read_halfword(address))
            };
            self.bank.set(reg_dest, value);
        } else {
            let value = if reg_dest == 15 {
                self.bank.pc().wrapping_add(4)
            } else {
                self.bank.get(reg_dest)
            };
            bus.write_halfword(address, value as u16);
        }

        if (write_back || !pre_indexed) && reg_base != reg_dest {
            if !pre_indexed {
                address = if add_to_base {
                    address.wrapping_add(offset)
                } else {
                    address.wrapping_sub(offset)
                };
            }
            self.bank.set(reg_base, address);
        }
    }

    fn arm_data_processing(&mut self, instruction: u32) {
        let mut set_flags = instruction & (1 << 20) != 0;
        let opcode = instruction >> 21 & 0xF;

        // Without the S bit, the compare opcode space encodes status
        // register transfers instead.
        if !set_flags && (0b1000..=0b1011).contains(&opcode) {
            self.arm_status_transfer(instruction);
            return;
        }

        let reg_dest = ((instruction >> 12) & 0xF) as usize;
        let reg_operand1 = ((instruction >> 16) & 0xF) as usize;
        let immediate = instruction & (1 << 25) != 0;
        let mut operand1 = self.bank.get(reg_operand1);
        let mut operand2;
        let mut shifter_carry = self.status.carry();

        if immediate {
            let value = instruction & 0xFF;
            let amount = (instruction >> 8 & 0xF) << 1;
            operand2 = value.rotate_right(amount);
            if amount != 0 {
                shifter_carry = value >> (amount - 1) & 1 != 0;
            }
        } else {
            let shift_immediate = instruction & (1 << 4) == 0;
            let reg_operand2 = (instruction & 0xF) as usize;
            operand2 = self.bank.get(reg_operand2);
            let amount = if shift_immediate {
                instruction >> 7 & 0x1F
            } else {
                let amount = self.bank.get((instruction >> 8 & 0xF) as usize);
                // With a register-specified amount the prefetch has moved
                // r15 one more word ahead.
                if reg_operand1 == 15 {
                    operand1 = operand1.wrapping_add(4);
                }
                if reg_operand2 == 15 {
                    operand2 = operand2.wrapping_add(4);
                }
                amount
            };
            let output = shifter::shift(
                ShiftKind::from_bits(instruction >> 5),
                operand2,
                amount,
                shifter_carry,
                shift_immediate,
            );
            operand2 = output.value;
            shifter_carry = output.carry;
        }

        // Writing r15 with the S bit restores the saved status instead of
        // updating flags, so a handler can return and unmask in one step.
        if reg_dest == 15 && set_flags {
            set_flags = false;
            self.write_status(self.bank.spsr());
        }

        match opcode {
            0b0000 => {
                let result = operand1 & operand2;
                if set_flags {
                    self.status.set_sign_zero(result);
                    self.status.set_carry(shifter_carry);
                }
                self.bank.set(reg_dest, result);
            }
            0b0001 => {
                let result = operand1 ^ operand2;
                if set_flags {
                    self.status.set_sign_zero(result);
                    self.status.set_carry(shifter_carry);
                }
                self.bank.set(reg_dest, result);
            }
            0b0010 => {
                let result = operand1.wrapping_sub(operand2);
                if set_flags {
                    self.status.set_carry(operand1 >= operand2);
                    self.status
                        .set_overflow(sub_overflow(operand1, operand2, result));
                    self.status.set_sign_zero(result);
                }
                self.bank.set(reg_dest, result);
            }
            0b0011 => {
                let result = operand2.wrapping_sub(operand1);
                if set_flags {
                    self.status.set_carry(operand2 >= operand1);
                    self.status
                        .set_overflow(sub_overflow(operand2, operand1, result));
                    self.status.set_sign_zero(result);
                }
                self.bank.set(reg_dest, result);
            }
            0b0100 => {
                let result = operand1.wrapping_add(operand2);
                if set_flags {
                    self.status.set_carry(add_carry(operand1, operand2));
                    self.status
                        .set_overflow(add_overflow(operand1, operand2, result));
                    self.status.set_sign_zero(result);
                }
                self.bank.set(reg_dest, result);
            }
            0b0101 => {
                let carry = u32::from(self.status.carry());
                let result = operand1.wrapping_add(operand2).wrapping_add(carry);
                if set_flags {
                    self.status
                        .set_carry(add_carry_with(operand1, operand2, carry));
                    self.status.set_overflow(add_overflow(
                        operand1,
                        operand2.wrapping_add(carry),
                        result,
                    ));
                    self.status.set_sign_zero(result);
                }
                self.bank.set(reg_dest, result);
            }
            0b0110 => {
                let carry = u32::from(self.status.carry());
                let result = operand1
                    .wrapping_sub(operand2)
                    .wrapping_add(carry)
                    .wrapping_sub(1);
                let adjusted = operand2.wrapping_add(carry).wrapping_sub(1);
                if set_flags {
                    self.status.set_carry(operand1 >= adjusted);
                    self.status
                        .set_overflow(sub_overflow(operand1, adjusted, result));
                    self.status.set_sign_zero(result);
                }
                self.bank.set(reg_dest, result);
            }
            0b0111 => {
                let carry = u32::from(self.status.carry());
                let result = operand2
                    .wrapping_sub(operand1)
                    .wrapping_add(carry)
                    .wrapping_sub(1);
                let adjusted = operand1.wrapping_add(carry).wrapping_sub(1);
                if set_flags {
                    self.status.set_carry(operand2 >= adjusted);
                    self.status
                        .set_overflow(sub_overflow(operand2, adjusted, result));
                    self.status.set_sign_zero(result);
                }
                self.bank.set(reg_dest, result);
            }
            0b1000 => {
                let result = operand1 & operand2;
                self.status.set_sign_zero(result);
                self.status.set_carry(shifter_carry);
            }
            0b1001 => {
                let result = operand1 ^ operand2;
                self.status.set_sign_zero(result);
                self.status.set_carry(shifter_carry);
            }
            0b1010 => {
                let result = operand1.wrapping_sub(operand2);
                self.status.set_carry(operand1 >= operand2);
                self.status
                    .set_overflow(sub_overflow(operand1, operand2, result));
                self.status.set_sign_zero(result);
            }
            0b1011 => {
                let result = operand1.wrapping_add(operand2);
                self.status.set_carry(add_carry(operand1, operand2));
                self.status
                    .set_overflow(add_overflow(operand1, operand2, result));
                self.status.set_sign_zero(result);
            }
            0b1100 => {
                let result = operand1 | operand2;
                if set_flags {
                    self.status.set_sign_zero(result);
                    self.status.set_carry(shifter_carry);
                }
                self.bank.set(reg_dest, result);
            }
            0b1101 => {
                if set_flags {
                    self.status.set_sign_zero(operand2);
                    self.status.set_carry(shifter_carry);
                }
                self.bank.set(reg_dest, operand2);
            }
            0b1110 => {
                let result = operand1 & !operand2;
                if set_flags {
                    self.status.set_sign_zero(result);
                    self.status.set_carry(shifter_carry);
                }
                self.bank.set(reg_dest, result);
            }
            _ => {
                let result = !operand2;
                if set_flags {
                    self.status.set_sign_zero(result);
                    self.status.set_carry(shifter_carry);
                }
                self.bank.set(reg_dest, result);
            }
        }

        if reg_dest == 15 {
            self.pipeline.request_flush();
        }
    }

    fn arm_status_transfer(&mut self, instruction: u32) {
        let immediate = instruction & (1 << 25) != 0;
        let use_spsr = instruction & (1 << 22) != 0;
        let to_status = instruction & (1 << 21) != 0;

        if to_status {
            let mut mask = 0u32;
            if instruction & (1 << 16) != 0 {
                mask |= 0x0000_00FF;
            }
            if instruction & (1 << 17) != 0 {
                mask |= 0x0000_FF00;
            }
            if instruction & (1 << 18) != 0 {
                mask |= 0x00FF_0000;
            }
            if instruction & (1 << 19) != 0 {
                mask |= 0xFF00_0000;
            }

            let operand = if immediate {
                let value = instruction & 0xFF;
                let amount = (instruction >> 8 & 0xF) << 1;
                value.rotate_right(amount)
            } else {
                self.bank.get((instruction & 0xF) as usize)
            };

            if use_spsr {
                let value = (self.bank.spsr() & !mask) | (operand & mask);
                self.bank.set_spsr(value);
            } else {
                let value = (self.status.0 & !mask) | (operand & mask);
                self.write_status(value);
            }
        } else {
            let reg_dest = ((instruction >> 12) & 0xF) as usize;
            let value = if use_spsr {
                self.bank.spsr()
            } else {
                self.status.0
            };
            self.bank.set(reg_dest, value);
        }
    }

    fn arm_single_transfer<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let reg_dest = ((instruction >> 12) & 0xF) as usize;
        let reg_base = ((instruction >> 16) & 0xF) as usize;
        let load = instruction & (1 << 20) != 0;
        let write_back = instruction & (1 << 21) != 0;
        let transfer_byte = instruction & (1 << 22) != 0;
        let add_to_base = instruction & (1 << 23) != 0;
        let pre_indexed = instruction & (1 << 24) != 0;
        let immediate = instruction & (1 << 25) == 0;
        let mut address = self.bank.get(reg_base);

        if reg_base == 15 && write_back {
            warn!(
                "single transfer write-back to r15, pc={:#010x}",
                self.bank.pc()
            );
        }
        if write_back && !pre_indexed {
            warn!(
                "single transfer has the write-back bit while post-indexed, pc={:#010x}",
                self.bank.pc()
            );
        }

        let offset = if immediate {
            instruction & 0xFFF
        } else {
            let reg_offset = (instruction & 0xF) as usize;
            if reg_offset == 15 {
                warn!(
                    "single transfer takes r15 as offset, pc={:#010x}",
                    self.bank.pc()
                );
            }
            let amount = instruction >> 7 & 0x1F;
            shifter::shift(
                ShiftKind::from_bits(instruction >> 5),
                self.bank.get(reg_offset),
                amount,
                self.status.carry(),
                true,
            )
            .value
        };

        if pre_indexed {
            address = if add_to_base {
                address.wrapping_add(offset)
            } else {
                address.wrapping_sub(offset)
            };
        }

        if load {
            let value = if transfer_byte {
                u32::from(bus.read_byte(address))
            } else {
                bus.read_word(address & !3).rotate_right((address & 3) * 8)
            };
            self.bank.set(reg_dest, value);
            if reg_dest == 15 {
                self.pipeline.request_flush();
            }
        } else {
            let mut value = self.bank.get(reg_dest);
            if reg_dest == 15 {
                value = value.wrapping_add(4);
            }
            if transfer_byte {
                bus.write_byte(address, value as u8);
            } else {
                bus.write_word(address, value);
            }
        }

        if reg_base != reg_dest {
            if pre_indexed {
                if write_back {
                    self.bank.set(reg_base, address);
                }
            } else {
                let base = self.bank.get(reg_base);
                let updated = if add_to_base {
                    base.wrapping_add(offset)
                } else {
                    base.wrapping_sub(offset)
                };
                self.bank.set(reg_base, updated);
            }
        }
    }

    fn arm_block_transfer<B: MemoryBus>(&mut self, instruction: u32, bus: &mut B) {
        let pc_in_list = instruction & (1 << 15) != 0;
        let reg_base = ((instruction >> 16) & 0xF) as usize;
        let load = instruction & (1 << 20) != 0;
        let mut write_back = instruction & (1 << 21) != 0;
        let user_bank = instruction & (1 << 22) != 0;
        let add_to_base = instruction & (1 << 23) != 0;
        let pre_indexed = instruction & (1 << 24) != 0;
        let mut address = self.bank.get(reg_base);
        let old_address = address;

        if reg_base == 15 {
            warn!(
                "block transfer takes r15 as base register, pc={:#010x}",
                self.bank.pc()
            );
        }

        // The S bit on a store, or on a load without r15 in the list,
        // transfers the user bank regardless of the current mode.
        let mut saved_mode_bits = None;
        if user_bank && (!load || !pc_in_list) {
            if write_back {
                warn!(
                    "user-bank block transfer with write-back, pc={:#010x}",
                    self.bank.pc()
                );
            }
            saved_mode_bits = Some(self.status.mode_bits());
            let value = (self.status.0 & !ProgramStatus::MODE_MASK) | Mode::User.bits();
            self.write_status(value);
        }

        let first_register = (0..16).find(|i| instruction & (1 << i) != 0).unwrap_or(0);
        let order: Vec<usize> = if add_to_base {
            (first_register..16).collect()
        } else {
            (first_register..16).rev().collect()
        };

        for i in order {
            if instruction & (1 << i) == 0 {
                continue;
            }
            if pre_indexed {
                address = if add_to_base {
                    address.wrapping_add(4)
                } else {
                    address.wrapping_sub(4)
                };
            }
            if load {
                // Loading over the base cancels write-back.
                if i == reg_base {
                    write_back = false;
                }
                let value = bus.read_word(address);
                self.bank.set(i, value);
                if i == 15 {
                    if user_bank {
                        if self.status.mode() == Some(Mode::User) {
                            warn!(
                                "block transfer restores saved status in user mode, pc={:#010x}",
                                self.bank.pc()
                            );
                        }
                        self.write_status(self.bank.spsr());
                    }
                    self.pipeline.request_flush();
                }
            } else if i == first_register && i == reg_base {
                // The base stores its pre-transfer value when it is the
                // first register in the list.
                bus.write_word(address, old_address);
            } else {
                bus.write_word(address, self.bank.get(i));
            }
            if !pre_indexed {
                address = if add_to_base {
                    address.wrapping_add(4)
                } else {
                    address.wrapping_sub(4)
                };
            }
            if write_back {
                self.bank.set(reg_base, address);
            }
        }

        if let Some(mode_bits) = saved_mode_bits {
            let value = (self.status.0 & !ProgramStatus::MODE_MASK) | mode_bits;
            self.write_status(value);
        }
    }

    fn arm_branch(&mut self, instruction: u32) {
        let link = instruction & (1 << 24) != 0;
        let mut offset = instruction & 0x00FF_FFFF;
        if offset & 0x0080_0000 != 0 {
            offset |= 0xFF00_0000;
        }
        if link {
            self.bank.set(14, self.bank.pc().wrapping_sub(4));
        }
        self.bank
            .set_pc(self.bank.pc().wrapping_add(offset.wrapping_shl(2)));
        self.pipeline.request_flush();
    }
}
