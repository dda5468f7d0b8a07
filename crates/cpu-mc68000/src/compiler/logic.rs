//! Decoders for the logical family, the single-operand instructions and the
//! bit operations.

use super::operands::{Writeback, is_memory_alterable, register_tail};
use super::{Builder, Decoded, SRC, lower_register, seq, size_field, upper_register};
use crate::addressing::AddrMode;
use crate::instruction::{Instruction, Operand};
use crate::operation::{Operation, Size};

impl Builder {
    // ========================================================================
    // AND / OR / EOR
    //
    // Encoding: cccc rrr d ss mmm xxx
    //   d=0: <ea> op Dn -> Dn (not EOR)
    //   d=1: Dn op <ea> -> <ea>
    // ========================================================================

    pub(super) fn decode_and_or_eor(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let data_register = upper_register(opcode);
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, size);

        if opcode & 0x0100 != 0 {
            instruction.set_source(AddrMode::DataReg, data_register);
            instruction.set_destination(mode, ea_register);
            match mode {
                // AND and OR here are ABCD, SBCD and EXG.
                AddrMode::DataReg if operation == Operation::Eor => {
                    self.perform(seq(register_tail(mode, size)))?;
                }
                _ if is_memory_alterable(mode) => {
                    self.read_modify_write(mode, ea_register, size, Writeback::Write)?;
                }
                _ => return Ok(None),
            }
        } else {
            // EOR <ea>,Dn does not exist; that space is CMP.
            if operation == Operation::Eor || mode == AddrMode::AddrReg {
                return Ok(None);
            }
            instruction.set_source(mode, ea_register);
            instruction.set_destination(AddrMode::DataReg, data_register);
            self.fetch_source(mode, ea_register, size)?;
            self.perform(seq(register_tail(mode, size)))?;
            self.post_increment(mode, ea_register, size, SRC);
        }
        Ok(Some(instruction))
    }

    // ========================================================================
    // ANDI / ORI / EORI to CCR and SR
    //
    // The immediate is consumed from the high word of the prefetch queue.
    // ========================================================================

    pub(super) fn decode_immediate_to_status(
        &mut self,
        opcode: u16,
        operation: Operation,
    ) -> Decoded {
        let mut instruction = Instruction::new(operation, Size::Word);
        instruction.requires_supervisor = opcode & 0x0040 != 0;
        // The immediate reaches the head of the queue with the first fetch.
        instruction.source = Operand::Prefetch;
        self.bus(seq("np nn nn"))?;
        self.perform(seq("np np"))?;
        Ok(Some(instruction))
    }

    // ========================================================================
    // CLR / NEG / NEGX / NOT
    //
    // Encoding: 0100 oooo ss mmm xxx
    // ========================================================================

    pub(super) fn decode_single_operand(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, size);
        instruction.set_destination(mode, ea_register);

        if mode == AddrMode::DataReg {
            self.perform(seq(if size == Size::Long { "np n" } else { "np" }))?;
        } else if is_memory_alterable(mode) {
            // The 68000 reads the operand even for CLR.
            self.read_modify_write(mode, ea_register, size, Writeback::Write)?;
        } else {
            return Ok(None);
        }
        Ok(Some(instruction))
    }

    /// TST <ea>: 0100 1010 ss mmm xxx
    pub(super) fn decode_tst(&mut self, opcode: u16) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Tst, size);
        instruction.set_destination(mode, ea_register);

        if mode == AddrMode::DataReg {
            self.perform(seq("np"))?;
        } else if is_memory_alterable(mode) {
            self.read_modify_write(mode, ea_register, size, Writeback::Discard)?;
        } else {
            return Ok(None);
        }
        Ok(Some(instruction))
    }

    /// TAS <ea>: 0100 1010 11 mmm xxx
    pub(super) fn decode_tas(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Tas, Size::Byte);
        instruction.set_destination(mode, ea_register);

        if mode == AddrMode::DataReg {
            self.perform(seq("np"))?;
        } else if is_memory_alterable(mode) {
            self.read_modify_write(mode, ea_register, Size::Byte, Writeback::TestAndSet)?;
        } else {
            return Ok(None);
        }
        Ok(Some(instruction))
    }

    // ========================================================================
    // BTST / BCHG / BCLR / BSET
    //
    // Dynamic: 0000 rrr1 oo mmm xxx, bit number in Dr.
    // Static:  0000 1000 oo mmm xxx, bit number in the next word.
    // Registers are tested as longs, memory as bytes.
    // ========================================================================

    pub(super) fn decode_bit(
        &mut self,
        opcode: u16,
        operation: Operation,
        is_static: bool,
    ) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let is_test = operation == Operation::Btst;
        let allowed = match mode {
            AddrMode::DataReg => true,
            AddrMode::PcDisp | AddrMode::PcIndex => is_test,
            _ => is_memory_alterable(mode),
        };
        if !allowed {
            return Ok(None);
        }

        let ea_register = lower_register(opcode);
        let size = if mode == AddrMode::DataReg {
            Size::Long
        } else {
            Size::Byte
        };
        let mut instruction = Instruction::new(operation, size);
        if is_static {
            instruction.source = Operand::SourceLatch;
            self.fetch_immediate(Size::Word)?;
        } else {
            instruction.set_source(AddrMode::DataReg, upper_register(opcode));
        }
        instruction.set_destination(mode, ea_register);

        if mode == AddrMode::DataReg {
            if is_test {
                self.perform(seq("np n"))?;
            } else {
                self.bus(seq("np"))?;
                self.perform(seq("r"))?;
            }
        } else {
            let writeback = if is_test {
                Writeback::Discard
            } else {
                Writeback::Write
            };
            self.read_modify_write(mode, ea_register, size, writeback)?;
        }
        Ok(Some(instruction))
    }
}
