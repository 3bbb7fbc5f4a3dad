//! Runs a short program on the core and prints a per-step trace.

use armv4_core::{CoreConfig, Cpu, MemoryBus};
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

fn main() {
    let mut bus = RamBus::new(0x400);
    bus.load_words(
        0,
        &[
            0xE3A0_0005, // MOV r0, #5
            0xE3A0_1007, // MOV r1, #7
            0xE090_2001, // ADDS r2, r0, r1
            0xE3A0_D0F0, // MOV r13, #0xF0
            0xE92D_0007, // STMDB r13!, {r0, r1, r2}
            0xEA00_0000, // B 0x20
        ],
    );

    let mut cpu = Cpu::new(CoreConfig::default());
    for step in 0..12 {
        cpu.step(&mut bus);
        println!(
            "step {step:2}: pc={:#010x} r0={:#x} r1={:#x} r2={:#x} sp={:#x} cycles={}",
            cpu.pc(),
            cpu.reg(0),
            cpu.reg(1),
            cpu.reg(2),
            cpu.reg(13),
            cpu.cycles(),
        );
    }
    println!(
        "stack: {:#010x} {:#010x} {:#010x}",
        bus.read_word(0xE4),
        bus.read_word(0xE8),
        bus.read_word(0xEC),
    );
}
