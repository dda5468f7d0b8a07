//! Decoders for the data movement instructions.

use super::operands::{Writeback, is_memory_alterable};
use super::{
    Builder, CompileError, DST, Decoded, EA1, NONE, SRC, a, lower_register, seq, upper_register,
};
use crate::addressing::{AddrMode, decrement_action, increment_action};
use crate::instruction::{Instruction, Operand};
use crate::microcode::{Action, Target};
use crate::operation::{Operation, Size};

impl Builder {
    // ========================================================================
    // MOVE / MOVEA
    //
    // Encoding: 00ss RRR MMM mmm rrr, destination field reversed.
    //   ss: 01=.b, 11=.w, 10=.l
    // ========================================================================

    pub(super) fn decode_move(&mut self, opcode: u16) -> Decoded {
        let size = match (opcode >> 12) & 3 {
            1 => Size::Byte,
            3 => Size::Word,
            _ => Size::Long,
        };
        let Some(source_mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let Some(destination_mode) = AddrMode::decode(opcode >> 6, opcode >> 9) else {
            return Ok(None);
        };
        if destination_mode.is_pc_relative() || destination_mode == AddrMode::Immediate {
            return Ok(None);
        }
        if size == Size::Byte
            && (source_mode == AddrMode::AddrReg || destination_mode == AddrMode::AddrReg)
        {
            return Ok(None);
        }

        let source_register = lower_register(opcode);
        let destination_register = upper_register(opcode);
        let operation = if destination_mode == AddrMode::AddrReg {
            Operation::Movea
        } else {
            Operation::Move
        };
        let mut instruction = Instruction::new(operation, size);
        instruction.set_source(source_mode, source_register);
        instruction.set_destination(destination_mode, destination_register);

        // Two distinct registers stepping by the same amount share one
        // increment at the end. Otherwise the source register steps before
        // the destination is addressed.
        let coalesced = source_mode == AddrMode::AddrIndPostInc
            && destination_mode == AddrMode::AddrIndPostInc
            && source_register != destination_register
            && increment_action(size, source_register)
                == increment_action(size, destination_register);

        self.fetch_source(source_mode, source_register, size)?;
        if !coalesced {
            self.post_increment(source_mode, source_register, size, SRC);
        }

        if destination_mode.is_register() {
            self.perform(seq("np"))?;
        } else {
            self.action(Action::PerformOperation, NONE);
            let increment = if coalesced { SRC | DST } else { DST };
            self.store(destination_mode, destination_register, size, increment)?;
        }
        Ok(Some(instruction))
    }

    /// Write the destination latch to a memory operand, fetching ahead as
    /// MOVE does. A post-increment applies to each side in `increment`.
    fn store(
        &mut self,
        mode: AddrMode,
        reg: u8,
        size: Size,
        increment: Target,
    ) -> Result<(), CompileError> {
        let long = size == Size::Long;
        let latch = [EA1, EA1];

        match mode {
            AddrMode::AddrInd | AddrMode::AddrIndPostInc => {
                if long {
                    self.op(Action::CopyToEffectiveAddress, DST, seq("nW+ nw np").at(&latch))?;
                } else {
                    self.bus(seq("nw np").at(&[a(reg)]).sized(size))?;
                }
                self.post_increment(mode, reg, size, increment);
            }
            AddrMode::AddrIndPreDec => {
                if long {
                    // Low word first, at the higher address.
                    self.op(Action::Decrement2, DST, seq("np"))?;
                    self.op(Action::CopyToEffectiveAddress, DST, seq("nw- nW").at(&latch))?;
                    self.action(Action::Decrement2, DST);
                } else {
                    let decrement = decrement_action(size, reg);
                    self.op(decrement, DST, seq("np nw").at(&[a(reg)]).sized(size))?;
                }
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                let pattern = if long { "np nW+ nw np" } else { "np nw np" };
                self.op(mode.address_action(), DST, seq(pattern).at(&latch).sized(size))?;
            }
            _ => {
                let pattern = if long { "np nW+ nw np" } else { "np nw np" };
                self.op(
                    mode.address_action(),
                    DST,
                    seq(pattern).at(&latch).sized(size).indexed(mode),
                )?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // MOVE to SR / CCR, MOVE from SR
    // ========================================================================

    /// MOVE <ea>,SR: 0100 0110 11 mmm xxx; MOVE <ea>,CCR: 0100 0100 11 mmm xxx
    pub(super) fn decode_move_to_status(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        if mode == AddrMode::AddrReg {
            return Ok(None);
        }
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, Size::Word);
        instruction.requires_supervisor = operation == Operation::MoveToSr;
        instruction.set_source(mode, ea_register);

        self.fetch_source(mode, ea_register, Size::Word)?;
        self.post_increment(mode, ea_register, Size::Word, SRC);
        // DEVIATION: Yacht lists a second program fetch here. Idle time
        // stands in for it, giving 12 cycles plus the operand fetch.
        self.perform(seq("nn nn np"))?;
        Ok(Some(instruction))
    }

    /// MOVE SR,<ea>: 0100 0000 11 mmm xxx. Not privileged on the 68000.
    pub(super) fn decode_move_from_sr(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::MoveFromSr, Size::Word);
        instruction.set_destination(mode, ea_register);

        if mode == AddrMode::DataReg {
            self.perform(seq("np n"))?;
        } else if is_memory_alterable(mode) {
            self.read_modify_write(mode, ea_register, Size::Word, Writeback::Write)?;
        } else {
            return Ok(None);
        }
        Ok(Some(instruction))
    }

    // ========================================================================
    // MOVEQ / MOVE USP / EXG / EXT / SWAP
    // ========================================================================

    /// MOVEQ #d8,Dn: 0111 rrr0 dddd dddd
    pub(super) fn decode_moveq(&mut self, opcode: u16) -> Decoded {
        let mut instruction = Instruction::new(Operation::Moveq, Size::Long);
        instruction.set_destination(AddrMode::DataReg, upper_register(opcode));
        self.perform(seq("np"))?;
        Ok(Some(instruction))
    }

    /// MOVE An,USP: 0100 1110 0110 0rrr; MOVE USP,An: 0100 1110 0110 1rrr
    pub(super) fn decode_move_usp(&mut self, opcode: u16) -> Decoded {
        let reg = lower_register(opcode);
        let operation = if opcode & 0x0008 != 0 {
            Operation::MoveFromUsp
        } else {
            Operation::MoveToUsp
        };
        let mut instruction = Instruction::new(operation, Size::Long);
        instruction.requires_supervisor = true;
        if operation == Operation::MoveToUsp {
            instruction.set_source(AddrMode::AddrReg, reg);
        } else {
            instruction.set_destination(AddrMode::AddrReg, reg);
        }
        self.perform(seq("np"))?;
        Ok(Some(instruction))
    }

    /// EXG: 1100 xxx1 oooo oyyy
    pub(super) fn decode_exg(&mut self, opcode: u16) -> Decoded {
        let (x_mode, y_mode) = match (opcode >> 3) & 0x1F {
            0x08 => (AddrMode::DataReg, AddrMode::DataReg),
            0x09 => (AddrMode::AddrReg, AddrMode::AddrReg),
            0x11 => (AddrMode::DataReg, AddrMode::AddrReg),
            _ => return Ok(None),
        };
        let mut instruction = Instruction::new(Operation::Exg, Size::Long);
        instruction.set_source(x_mode, upper_register(opcode));
        instruction.set_destination(y_mode, lower_register(opcode));
        self.perform(seq("np n"))?;
        Ok(Some(instruction))
    }

    /// EXT.W: 0100 1000 1000 0rrr; EXT.L: 0100 1000 1100 0rrr;
    /// SWAP: 0100 1000 0100 0rrr
    pub(super) fn decode_ext_swap(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let size = match operation {
            Operation::Ext if opcode & 0x0040 == 0 => Size::Word,
            _ => Size::Long,
        };
        let mut instruction = Instruction::new(operation, size);
        instruction.set_destination(AddrMode::DataReg, lower_register(opcode));
        self.perform(seq("np"))?;
        Ok(Some(instruction))
    }

    // ========================================================================
    // LEA
    //
    // Encoding: 0100 rrr1 11 mmm xxx, control modes only.
    // ========================================================================

    pub(super) fn decode_lea(&mut self, opcode: u16) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(Operation::Lea, Size::Long);
        instruction.set_destination(AddrMode::AddrReg, upper_register(opcode));
        instruction.source = Operand::EffectiveAddress(0);
        instruction.source_register = ea_register;

        match mode {
            AddrMode::AddrInd => {
                instruction.source = Operand::AddressRegister(ea_register);
                self.perform(seq("np"))?;
                return Ok(Some(instruction));
            }
            AddrMode::AddrIndDisp | AddrMode::PcDisp | AddrMode::AbsShort => {
                self.op(mode.address_action(), SRC, seq("np np"))?;
            }
            AddrMode::AddrIndIndex | AddrMode::PcIndex => {
                self.op(mode.address_action(), SRC, seq("n np n np"))?;
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                self.op(mode.address_action(), SRC, seq("np np"))?;
            }
            _ => return Ok(None),
        }
        self.action(Action::PerformOperation, NONE);
        Ok(Some(instruction))
    }

    // ========================================================================
    // MOVEM
    //
    // Encoding: 0100 1d00 1s mmm xxx, then the register mask.
    //   d=0: registers to memory, d=1: memory to registers
    //   s=0: .w, s=1: .l
    // ========================================================================

    pub(super) fn decode_movem(&mut self, opcode: u16, operation: Operation) -> Decoded {
        let Some(mode) = AddrMode::from_ea_field(opcode) else {
            return Ok(None);
        };
        let to_memory = operation == Operation::MovemToMemory;
        let legal = match mode {
            AddrMode::DataReg | AddrMode::AddrReg | AddrMode::Immediate => false,
            AddrMode::AddrIndPostInc | AddrMode::PcDisp | AddrMode::PcIndex => !to_memory,
            AddrMode::AddrIndPreDec => to_memory,
            _ => true,
        };
        if !legal {
            return Ok(None);
        }

        let size = if opcode & 0x0040 != 0 {
            Size::Long
        } else {
            Size::Word
        };
        let ea_register = lower_register(opcode);
        let mut instruction = Instruction::new(operation, size);
        instruction.source = Operand::SourceLatch;
        instruction.set_destination(mode, ea_register);

        self.op(Action::CopyNextWord, SRC, seq("np"))?;
        match mode {
            AddrMode::AddrInd | AddrMode::AddrIndPostInc | AddrMode::AddrIndPreDec => {
                self.action(Action::CopyToEffectiveAddress, DST);
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                self.op(mode.address_action(), DST, seq("np"))?;
            }
            _ => self.op(mode.address_action(), DST, seq("np").indexed(mode))?,
        }
        // Switches to the transfer program for the mask at run time.
        self.action(Action::PerformOperation, NONE);
        let complete = if to_memory {
            Action::MovemToMemoryComplete
        } else {
            Action::MovemToRegistersComplete
        };
        self.op(complete, DST, seq("np"))?;
        Ok(Some(instruction))
    }
}

