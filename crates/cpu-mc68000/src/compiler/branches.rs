//! Decoders for program control: branches, jumps, returns, traps and the
//! odd system instructions.

use super::operands::{Writeback, is_memory_alterable};
use super::{Builder, Decoded, EA1, NONE, SRC, lower_register, seq};
use crate::addressing::AddrMode;
use crate::instruction::{Instruction, Operand};
use crate::microcode::Action;
use crate::operation::{Operation, Size};

impl Builder {
    // ========================================================================
    // Bcc / BRA / BSR
    //
    // Encoding: 0110 cccc dddd dddd; d8 = 0 means a word displacement follows.
    // The displacement, and whether the branch is taken, are settled at run
    // time.
    // ========================================================================

    pub(super) fn decode_bcc(&mut self, opcode: u16) -> Decoded {
        if (opcode >> 8) & 0xF == 1 {
            let mut instruction = Instruction::new(Operation::Bsr, Size::Long);
            instruction.source = Operand::EffectiveAddress(0);
            self.op(Action::PrepareBsr, NONE, seq("n nW+ nw").at(&[EA1, EA1]))?;
            self.action(Action::PerformOperation, NONE);
            return Ok(Some(instruction));
        }

        self.action(Action::PerformOperation, NONE);
        Ok(Some(Instruction::new(Operation::Bcc, Size::Word)))
    }

    // ========================================================================
    // Scc / DBcc
    //
    // Encoding: 0101 cccc 11 mmm xxx; mode 1 is DBcc Dn,d16.
    // ========================================================================

    pub(super) fn decode_scc_dbcc(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);

        if mode == AddrMode::AddrReg {
            let mut instruction = Instruction::new(Operation::Dbcc, Size::Word);
            instruction.set_destination(AddrMode::DataReg, ea_register);
            self.action(Action::PerformOperation, NONE);
            return Ok(Some(instruction));
        }

        let mut instruction = Instruction::new(Operation::Scc, Size::Byte);
        instruction.set_destination(mode, ea_register);
        if mode == AddrMode::DataReg {
            // Two extra cycles when the condition holds.
            self.perform(seq("np r"))?;
        } else if is_memory_alterable(mode) {
            self.read_modify_write(mode, ea_register, Size::Byte, Writeback::Write)?;
        } else {
            return Ok(None);
        }
        Ok(Some(instruction))
    }

    // ========================================================================
    // JMP / JSR
    //
    // JMP: 0100 1110 11 mmm xxx, JSR: 0100 1110 10 mmm xxx; control modes
    // only. The target lands in effective address 0; JSR stacks the return
    // address through effective address 1.
    // ========================================================================

    pub(super) fn decode_jmp(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Jmp, Size::Long);
        instruction.source = Operand::EffectiveAddress(0);
        instruction.source_register = ea_register;

        let tail = match mode {
            AddrMode::AddrInd => {
                instruction.source = Operand::AddressRegister(ea_register);
                "np np"
            }
            AddrMode::AddrIndDisp | AddrMode::PcDisp | AddrMode::AbsShort => {
                self.action(mode.address_action(), SRC);
                "n np np"
            }
            AddrMode::AddrIndIndex | AddrMode::PcIndex => {
                self.action(mode.address_action(), SRC);
                "n nn np np"
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                self.action(mode.address_action(), SRC);
                "np np"
            }
            _ => return Ok(None),
        };
        self.perform(seq(tail))?;
        Ok(Some(instruction))
    }

    pub(super) fn decode_jsr(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Jsr, Size::Long);
        instruction.source = Operand::EffectiveAddress(0);
        instruction.source_register = ea_register;

        // The target is resolved before A7 drops, so A7-relative targets
        // see the caller's stack pointer.
        let tail = match mode {
            AddrMode::AddrInd => {
                self.action(Action::CopyToEffectiveAddress, SRC);
                "np nW+ nw np"
            }
            AddrMode::AddrIndDisp | AddrMode::PcDisp | AddrMode::AbsShort => {
                self.action(mode.address_action(), SRC);
                "n np nW+ nw np"
            }
            AddrMode::AddrIndIndex | AddrMode::PcIndex => {
                self.action(mode.address_action(), SRC);
                "n nn np nW+ nw np"
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                self.action(mode.address_action(), SRC);
                "np nW+ nw np"
            }
            _ => return Ok(None),
        };
        self.action(Action::PrepareJsr, NONE);
        self.perform(seq(tail).at(&[EA1, EA1]))?;
        Ok(Some(instruction))
    }

    // ========================================================================
    // RTS / RTE / RTR
    // ========================================================================

    pub(super) fn decode_rts(&mut self) -> Decoded {
        let mut instruction = Instruction::new(Operation::Rts, Size::Long);
        instruction.source = Operand::SourceLatch;
        self.op(Action::PrepareRts, NONE, seq("nU nu"))?;
        self.perform(seq("np np"))?;
        Ok(Some(instruction))
    }

    /// RTE pops SR and PC; RTR pops CCR and PC.
    pub(super) fn decode_rte_rtr(&mut self, operation: Operation) -> Decoded {
        let mut instruction = Instruction::new(operation, Size::Word);
        instruction.requires_supervisor = operation == Operation::Rte;
        instruction.source = Operand::SourceLatch;
        let pop = self.programs.return_from_exception;
        self.op_program(Action::PrepareRteRtr, NONE, pop);
        self.perform(seq("np np"))?;
        Ok(Some(instruction))
    }

    // ========================================================================
    // TRAP / NOP / RESET
    // ========================================================================

    /// TRAP #n: 0100 1110 0100 vvvv. The exception sequence takes over.
    pub(super) fn decode_trap(&mut self) -> Decoded {
        self.action(Action::PerformOperation, NONE);
        Ok(Some(Instruction::new(Operation::Trap, Size::Word)))
    }

    pub(super) fn decode_nop(&mut self) -> Decoded {
        self.perform(seq("np"))?;
        Ok(Some(Instruction::new(Operation::Nop, Size::Word)))
    }

    /// Asserts RESET for 124 cycles; the processor itself is untouched.
    pub(super) fn decode_reset(&mut self) -> Decoded {
        let mut instruction = Instruction::new(Operation::Reset, Size::Word);
        instruction.requires_supervisor = true;
        self.perform(seq("nn _ np"))?;
        Ok(Some(instruction))
    }
}
