//! Decoded instruction table entries.

use crate::addressing::AddrMode;
use crate::operation::{Operation, Size};

/// Where an operand lives while the operation is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operand {
    #[default]
    None,
    DataRegister(u8),
    AddressRegister(u8),
    /// Source bus-data latch, filled by `nR`/`nr` or an immediate assembly.
    SourceLatch,
    /// Destination bus-data latch; read by `nRd`/`nrd`, written by `nW`/`nw`.
    DestinationLatch,
    /// The word at the head of the prefetch queue.
    Prefetch,
    /// Effective-address latch 0 or 1.
    EffectiveAddress(u8),
    /// Three bits of opcode, 9-11, with 0 standing for 8.
    Quick,
}

/// Everything the runtime needs to know about one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub operation: Operation,
    pub size: Size,
    pub source: Operand,
    pub destination: Operand,
    /// Address register used by source-side address actions.
    pub source_register: u8,
    /// Address register used by destination-side address actions.
    pub destination_register: u8,
    pub requires_supervisor: bool,
    /// Index of the first micro-op.
    pub micro_ops: usize,
}

impl Instruction {
    #[must_use]
    pub const fn new(operation: Operation, size: Size) -> Self {
        Self {
            operation,
            size,
            source: Operand::None,
            destination: Operand::None,
            source_register: 0,
            destination_register: 0,
            requires_supervisor: false,
            micro_ops: 0,
        }
    }

    /// Registers stay registers; any memory mode goes through the source latch.
    pub fn set_source(&mut self, mode: AddrMode, reg: u8) {
        self.source = side_operand(mode, reg, Operand::SourceLatch);
        self.source_register = reg;
    }

    /// Registers stay registers; any memory mode goes through the
    /// destination latch.
    pub fn set_destination(&mut self, mode: AddrMode, reg: u8) {
        self.destination = side_operand(mode, reg, Operand::DestinationLatch);
        self.destination_register = reg;
    }
}

const fn side_operand(mode: AddrMode, reg: u8, latch: Operand) -> Operand {
    match mode {
        AddrMode::DataReg => Operand::DataRegister(reg),
        AddrMode::AddrReg => Operand::AddressRegister(reg),
        _ => latch,
    }
}
