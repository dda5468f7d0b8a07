//! Decoders for the shifts and rotates.

use super::operands::{Writeback, is_memory_alterable};
use super::{Builder, Decoded, lower_register, seq, size_field, upper_register};
use crate::addressing::AddrMode;
use crate::instruction::{Instruction, Operand};
use crate::operation::{Operation, Size};

impl Builder {
    /// Register form: 1110 ccc d ss i tt rrr
    ///   i=0: count is ccc (0 means 8), i=1: count is Dc modulo 64.
    /// The run-time length covers two cycles per bit shifted.
    pub(super) fn decode_shift_register(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let mut instruction = Instruction::new(operation, size);
        if opcode & 0x0020 != 0 {
            instruction.set_source(AddrMode::DataReg, upper_register(opcode));
        } else {
            instruction.source = Operand::Quick;
        }
        instruction.set_destination(AddrMode::DataReg, lower_register(opcode));

        self.bus(seq(if size == Size::Long { "np nn" } else { "np n" }))?;
        self.perform(seq("r"))?;
        Ok(Some(instruction))
    }

    /// Memory form: 1110 0tt d 11 mmm xxx, a single-bit shift of a word.
    pub(super) fn decode_shift_memory(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        if !is_memory_alterable(mode) {
            return Ok(None);
        }
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, Size::Word);
        instruction.set_destination(mode, ea_register);
        self.read_modify_write(mode, ea_register, Size::Word, Writeback::Write)?;
        Ok(Some(instruction))
    }
}
