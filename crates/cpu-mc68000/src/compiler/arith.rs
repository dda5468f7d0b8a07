//! Decoders for the arithmetic family: ADD, SUB, their A/Q/I forms, the
//! compares, BCD arithmetic and the multiplies.

use super::operands::{Writeback, is_memory_alterable, register_tail};
use super::{
    Builder, DST, Decoded, EA0, EA1, NONE, SRC, a, lower_register, seq, size_field, upper_register,
};
use crate::addressing::{AddrMode, decrement_action, increment_action};
use crate::instruction::{Instruction, Operand};
use crate::microcode::Action;
use crate::operation::{Operation, Size};

impl Builder {
    // ========================================================================
    // ADD / SUB (0xD / 0x9)
    //
    // Encoding: 1101 rrr d ss mmm xxx
    //   d=0: <ea> + Dn -> Dn
    //   d=1: Dn + <ea> -> <ea>
    // ========================================================================

    pub(super) fn decode_add_sub(&mut self, opcode: u16, operation: Operation) -> Decoded {
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
            // Register destinations here are ADDX/SUBX.
            if !is_memory_alterable(mode) {
                return Ok(None);
            }
            instruction.set_source(AddrMode::DataReg, data_register);
            instruction.set_destination(mode, ea_register);
            self.read_modify_write(mode, ea_register, size, Writeback::Write)?;
        } else {
            if mode == AddrMode::AddrReg && size == Size::Byte {
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
    // ADDA / SUBA
    //
    // Encoding: 1101 rrr s11 mmm xxx, s=0 word (sign-extended), s=1 long.
    // ========================================================================

    pub(super) fn decode_adda_suba(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let size = if opcode & 0x0100 != 0 {
            Size::Long
        } else {
            Size::Word
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, size);
        instruction.set_source(mode, ea_register);
        instruction.set_destination(AddrMode::AddrReg, upper_register(opcode));

        self.fetch_source(mode, ea_register, size)?;
        let tail = match size {
            Size::Long => register_tail(mode, size),
            _ => "np nn",
        };
        self.perform(seq(tail))?;
        self.post_increment(mode, ea_register, size, SRC);
        Ok(Some(instruction))
    }

    // ========================================================================
    // ADDQ / SUBQ (0x5)
    //
    // Encoding: 0101 ddd o ss mmm xxx, ddd = 1-8 (0 means 8).
    // ========================================================================

    pub(super) fn decode_addq_subq(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, size);
        instruction.source = Operand::Quick;
        instruction.set_destination(mode, ea_register);

        match mode {
            AddrMode::DataReg => {
                self.perform(seq(register_tail(mode, size)))?;
            }
            AddrMode::AddrReg => {
                // Always the whole register, and no flags.
                if size == Size::Byte {
                    return Ok(None);
                }
                instruction.operation = match operation {
                    Operation::Add => Operation::Adda,
                    _ => Operation::Suba,
                };
                instruction.size = Size::Long;
                self.perform(seq("np nn"))?;
            }
            _ if is_memory_alterable(mode) => {
                self.read_modify_write(mode, ea_register, size, Writeback::Write)?;
            }
            _ => return Ok(None),
        }
        Ok(Some(instruction))
    }

    // ========================================================================
    // ADDI / SUBI / ANDI / ORI / EORI
    //
    // Encoding: 0000 ooo0 ss mmm xxx, then the immediate.
    // ========================================================================

    pub(super) fn decode_immediate(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        if mode != AddrMode::DataReg && !is_memory_alterable(mode) {
            return Ok(None);
        }
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, size);
        instruction.source = Operand::SourceLatch;
        instruction.set_destination(mode, ea_register);

        self.fetch_immediate(size)?;
        if mode == AddrMode::DataReg {
            let tail = match (operation, size) {
                (Operation::And, Size::Long) => "np n",
                _ => register_tail(AddrMode::Immediate, size),
            };
            self.perform(seq(tail))?;
        } else {
            self.read_modify_write(mode, ea_register, size, Writeback::Write)?;
        }
        Ok(Some(instruction))
    }

    // ========================================================================
    // CMP / CMPA / CMPI / CMPM
    // ========================================================================

    /// CMP <ea>,Dn: 1011 rrr 0ss mmm xxx
    pub(super) fn decode_cmp(&mut self, opcode: u16) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        if mode == AddrMode::AddrReg && size == Size::Byte {
            return Ok(None);
        }
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Cmp, size);
        instruction.set_source(mode, ea_register);
        instruction.set_destination(AddrMode::DataReg, upper_register(opcode));

        self.fetch_source(mode, ea_register, size)?;
        self.perform(seq(if size == Size::Long { "np n" } else { "np" }))?;
        self.post_increment(mode, ea_register, size, SRC);
        Ok(Some(instruction))
    }

    /// CMPA <ea>,An: 1011 rrr s11 mmm xxx
    pub(super) fn decode_cmpa(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let size = if opcode & 0x0100 != 0 {
            Size::Long
        } else {
            Size::Word
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Cmpa, size);
        instruction.set_source(mode, ea_register);
        instruction.set_destination(AddrMode::AddrReg, upper_register(opcode));

        self.fetch_source(mode, ea_register, size)?;
        self.perform(seq("np n"))?;
        self.post_increment(mode, ea_register, size, SRC);
        Ok(Some(instruction))
    }

    /// CMPI #,<ea>: 0000 1100 ss mmm xxx
    pub(super) fn decode_cmpi(&mut self, opcode: u16) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        if mode != AddrMode::DataReg && !is_memory_alterable(mode) {
            return Ok(None);
        }
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Cmp, size);
        instruction.source = Operand::SourceLatch;
        instruction.set_destination(mode, ea_register);

        self.fetch_immediate(size)?;
        if mode == AddrMode::DataReg {
            self.perform(seq(if size == Size::Long { "np n" } else { "np" }))?;
        } else {
            self.read_modify_write(mode, ea_register, size, Writeback::Discard)?;
        }
        Ok(Some(instruction))
    }

    /// CMPM (Ay)+,(Ax)+: 1011 xxx1 ss00 1yyy
    pub(super) fn decode_cmpm(&mut self, opcode: u16) -> Decoded {
        let Some(size) = size_field(opcode) else {
            return Ok(None);
        };
        let source = lower_register(opcode);
        let destination = upper_register(opcode);
        let mut instruction = Instruction::new(Operation::Cmp, size);
        instruction.set_source(AddrMode::AddrIndPostInc, source);
        instruction.set_destination(AddrMode::AddrIndPostInc, destination);

        // The source register steps before the destination read, so
        // CMPM (An)+,(An)+ compares neighbouring operands.
        let increment = increment_action(size, source);
        if size == Size::Long {
            self.op(Action::CopyToEffectiveAddress, SRC, seq("nR+ nr").at(&[EA0, EA0]))?;
            self.action(increment, SRC);
            self.op(
                Action::CopyToEffectiveAddress,
                DST,
                seq("nRd+ nrd np").at(&[EA1, EA1]),
            )?;
        } else {
            self.bus(seq("nr").at(&[a(source)]).sized(size))?;
            self.op(increment, SRC, seq("nrd np").at(&[a(destination)]).sized(size))?;
        }
        self.action(Action::PerformOperation, NONE);
        self.action(increment_action(size, destination), DST);
        Ok(Some(instruction))
    }

    // ========================================================================
    // ABCD / SBCD
    //
    // Encoding: 1c00 xxx1 0000 myyy, m=0 Dy,Dx; m=1 -(Ay),-(Ax)
    // ========================================================================

    pub(super) fn decode_abcd_sbcd(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let source = lower_register(opcode);
        let destination = upper_register(opcode);
        let mut instruction = Instruction::new(operation, Size::Byte);

        if opcode & 0x0008 == 0 {
            instruction.set_source(AddrMode::DataReg, source);
            instruction.set_destination(AddrMode::DataReg, destination);
            self.perform(seq("np n"))?;
            return Ok(Some(instruction));
        }

        instruction.set_source(AddrMode::AddrIndPreDec, source);
        instruction.set_destination(AddrMode::AddrIndPreDec, destination);
        self.op(
            decrement_action(Size::Byte, source),
            SRC,
            seq("n nr").at(&[a(source)]).sized(Size::Byte),
        )?;
        self.op(
            decrement_action(Size::Byte, destination),
            DST,
            seq("nrd np").at(&[a(destination)]).sized(Size::Byte),
        )?;
        self.perform(seq("nw").at(&[a(destination)]).sized(Size::Byte))?;
        Ok(Some(instruction))
    }

    // ========================================================================
    // MULU / MULS
    //
    // Encoding: 1100 rrr s11 mmm xxx. Duration depends on the source bits.
    // ========================================================================

    pub(super) fn decode_mulu_muls(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        if mode == AddrMode::AddrReg {
            return Ok(None);
        }
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, Size::Word);
        instruction.set_source(mode, ea_register);
        instruction.set_destination(AddrMode::DataReg, upper_register(opcode));

        // DEVIATION: for #imm Yacht lists one more np than the two here.
        // The total stays 38+2n cycles plus the four of the immediate.
        self.fetch_source(mode, ea_register, Size::Word)?;
        self.bus(seq("np"))?;
        self.perform(seq("r"))?;
        self.post_increment(mode, ea_register, Size::Word, SRC);
        Ok(Some(instruction))
    }
}
