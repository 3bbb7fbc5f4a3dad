//! Interrupt and software interrupt entry paths, including mode banking.

#![allow(clippy::cast_possible_truncation)]

use armv4_core::{CoreConfig, Cpu, MemoryBus, Mode, SwiHook};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

struct RamBus {
    mem: Vec<u8>,
}

impl RamBus {
    fn new(size: usize) -> Self {
        Self { mem: vec![0; size] }
    }

    fn load_words(&mut self, mut address: u32, words: &[u32]) {
        for word in words {
            self.write_word(address, *word);
            address += 4;
        }
    }
}

impl MemoryBus for RamBus {
    fn read_byte(&mut self, address: u32) -> u8 {
        self.mem[address as usize]
    }

    fn read_halfword(&mut self, address: u32) -> u16 {
        let index = address as usize;
        u16::from_le_bytes([self.mem[index], self.mem[index + 1]])
    }

    fn read_word(&mut self, address: u32) -> u32 {
        let index = address as usize;
        u32::from_le_bytes([
            self.mem[index],
            self.mem[index + 1],
            self.mem[index + 2],
            self.mem[index + 3],
        ])
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        self.mem[address as usize] = value;
    }

    fn write_halfword(&mut self, address: u32, value: u16) {
        let index = address as usize;
        self.mem[index..index + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn write_word(&mut self, address: u32, value: u32) {
        let index = address as usize;
        self.mem[index..index + 4].copy_from_slice(&value.to_le_bytes());
    }
}

#[test]
fn irq_round_trip_restores_mode_and_resumes() {
    let mut bus = RamBus::new(0x200);
    bus.load_words(
        0,
        &[
            0xE3A0_0001, // MOV r0, #1
            0xE280_0001, // ADD r0, r0, #1
        ],
    );
    bus.load_words(
        0x18,
        &[
            0xE3A0_1007, // MOV r1, #7
            0xE25E_F004, // SUBS pc, lr, #4
        ],
    );
    let mut cpu = Cpu::new(CoreConfig::default());
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.reg(0), 1);

    cpu.trigger_irq();
    assert_eq!(cpu.status().mode(), Some(Mode::Irq));
    assert_eq!(cpu.pc(), 0x18);
    // The banked link points one word past the interrupted instruction.
    assert_eq!(cpu.reg(14), 0x8);

    // Refill, run the handler body, then return with SUBS.
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.reg(1), 7);
    assert_eq!(cpu.status().mode(), Some(Mode::System));
    assert_eq!(cpu.pc(), 0x4);

    // The interrupted instruction runs on resume.
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.reg(0), 2);
}

#[test]
fn vectored_software_interrupt_enters_supervisor_mode() {
    let mut bus = RamBus::new(0x100);
    bus.load_words(
        0,
        &[
            0xE3A0_0001, // MOV r0, #1
            0xEF12_3456, // SWI 0x123456
        ],
    );
    let mut cpu = Cpu::new(CoreConfig::default());
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.status().mode(), Some(Mode::Supervisor));
    assert!(cpu.status().irq_disabled());
    assert_eq!(cpu.pc(), 0x8);
    assert_eq!(cpu.reg(14), 0x8);
}

struct SetRegisterHook;

impl SwiHook for SetRegisterHook {
    fn on_software_interrupt(&mut self, cpu: &mut Cpu) {
        cpu.set_reg(0, 99);
    }
}

#[test]
fn software_interrupt_hook_bypasses_the_vector() {
    let mut bus = RamBus::new(0x100);
    bus.load_words(
        0,
        &[
            0xEF00_0000, // SWI 0
            0xE3A0_1005, // MOV r1, #5
        ],
    );
    let mut cpu = Cpu::with_swi_hook(CoreConfig::default(), Box::new(SetRegisterHook));
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.reg(0), 99);
    assert_eq!(cpu.reg(1), 5);
    assert_eq!(cpu.status().mode(), Some(Mode::System));
}

#[test]
fn status_read_reports_the_current_mode() {
    let mut bus = RamBus::new(0x100);
    bus.load_words(0, &[0xE10F_0000]); // MRS r0, cpsr
    let mut cpu = Cpu::new(CoreConfig::default());
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.reg(0) & 0x1F, Mode::System.bits());
}

#[test]
fn status_write_switches_the_register_bank() {
    let mut bus = RamBus::new(0x100);
    bus.load_words(0, &[0xE121_F001]); // MSR cpsr_c, r1
    let mut cpu = Cpu::new(CoreConfig::default());
    cpu.set_reg(1, 0xD1); // FIQ mode, interrupts masked
    cpu.set_reg(8, 0x88);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.status().mode(), Some(Mode::Fiq));
    assert!(cpu.status().irq_disabled());
    assert!(cpu.status().fiq_disabled());
    // r8 now reads from the shadow bank.
    assert_eq!(cpu.reg(8), 0);
}

#[test]
fn masked_irq_does_not_preempt() {
    let mut bus = RamBus::new(0x100);
    bus.load_words(0, &[0xE3A0_0001]); // MOV r0, #1
    let mut cpu = Cpu::new(CoreConfig::default());
    let mut status = cpu.status();
    status.0 |= armv4_core::ProgramStatus::IRQ_DISABLE;
    cpu.set_status(status);
    cpu.trigger_irq();
    assert_eq!(cpu.pc(), 0);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.reg(0), 1);
}
