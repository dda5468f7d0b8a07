//! The perform point of each operation.
//!
//! By the time an operation runs, its operands sit in registers or in the
//! bus-data latches. Results for memory destinations go back into the
//! destination latch, ready for the write steps that follow.

use crate::alu;
use crate::compiler::SpecialPrograms;
use crate::flags::{self, C, N, V, Z};
use crate::instruction::Operand;
use crate::movem::MovemCursor;
use crate::operation::{Operation, Size};
use crate::processor::Processor;

impl Processor {
    /// Carry out the current instruction's operation. Returns a program to
    /// run in place of the perform op's own.
    pub(crate) fn perform_operation(&mut self) -> Option<usize> {
        let instruction = self.instruction;
        let size = instruction.size;
        let sr = self.registers.status();

        match instruction.operation {
            Operation::Abcd | Operation::Sbcd => {
                let src = self.read_operand(instruction.source);
                let dst = self.read_operand(instruction.destination);
                let (result, sr) = if instruction.operation == Operation::Abcd {
                    alu::abcd(src, dst, sr)
                } else {
                    alu::sbcd(src, dst, sr)
                };
                self.registers.set_status(sr);
                self.write_operand(instruction.destination, Size::Byte, result);
            }
            Operation::Add | Operation::Sub => {
                let src = self.read_operand(instruction.source);
                let dst = self.read_operand(instruction.destination);
                let (result, sr) = if instruction.operation == Operation::Add {
                    alu::add(src, dst, size, sr)
                } else {
                    alu::sub(src, dst, size, sr)
                };
                self.registers.set_status(sr);
                self.write_operand(instruction.destination, size, result);
            }
            Operation::Adda | Operation::Suba => {
                let src = size.sign_extend(self.read_operand(instruction.source));
                let dst = self.read_operand(instruction.destination);
                let result = if instruction.operation == Operation::Adda {
                    dst.wrapping_add(src)
                } else {
                    dst.wrapping_sub(src)
                };
                self.write_operand(instruction.destination, Size::Long, result);
            }
            Operation::And | Operation::Or | Operation::Eor => {
                let src = self.read_operand(instruction.source);
                let dst = self.read_operand(instruction.destination);
                let result = match instruction.operation {
                    Operation::And => src & dst,
                    Operation::Or => src | dst,
                    _ => src ^ dst,
                };
                self.registers.set_status(flags::logical(sr, result, size));
                self.write_operand(instruction.destination, size, result);
            }
            Operation::AndiToCcr
            | Operation::AndiToSr
            | Operation::OriToCcr
            | Operation::OriToSr
            | Operation::EoriToCcr
            | Operation::EoriToSr => self.immediate_to_status(instruction.operation),
            Operation::Cmp => {
                let src = self.read_operand(instruction.source);
                let dst = self.read_operand(instruction.destination);
                let (_, sr) = alu::compare(src, dst, size, sr);
                self.registers.set_status(sr);
            }
            Operation::Cmpa => {
                let src = size.sign_extend(self.read_operand(instruction.source));
                let dst = self.read_operand(instruction.destination);
                let (_, sr) = alu::compare(src, dst, Size::Long, sr);
                self.registers.set_status(sr);
            }

            Operation::Move => {
                let value = self.read_operand(instruction.source);
                self.registers.set_status(flags::logical(sr, value, size));
                self.write_operand(instruction.destination, size, value);
            }
            Operation::Movea => {
                let value = size.sign_extend(self.read_operand(instruction.source));
                self.write_operand(instruction.destination, Size::Long, value);
            }
            Operation::Moveq => {
                let value = Size::Byte.sign_extend(u32::from(self.opcode));
                self.registers.set_status(flags::logical(sr, value, Size::Long));
                self.write_operand(instruction.destination, Size::Long, value);
            }
            Operation::MoveToSr => {
                let value = self.read_operand(instruction.source);
                self.registers.set_status(value as u16);
            }
            Operation::MoveToCcr => {
                let value = self.read_operand(instruction.source);
                self.registers.set_ccr(value as u8);
            }
            Operation::MoveFromSr => {
                self.write_operand(instruction.destination, Size::Word, u32::from(sr));
            }
            Operation::MoveToUsp => {
                let value = self.read_operand(instruction.source);
                self.registers.set_usp(value);
            }
            Operation::MoveFromUsp => {
                let value = self.registers.usp();
                self.write_operand(instruction.destination, Size::Long, value);
            }
            Operation::MovemToMemory | Operation::MovemToRegisters => {
                return Some(self.begin_movem(instruction.operation, size));
            }

            Operation::Bcc => return Some(self.branch()),
            Operation::Bsr => {
                self.registers.pc = self.branch_target();
                return Some(self.tables.programs().bsr);
            }
            Operation::Dbcc => return Some(self.decrement_and_branch()),
            Operation::Scc => {
                let holds = flags::condition(sr, self.condition_field());
                if matches!(instruction.destination, Operand::DataRegister(_)) && holds {
                    self.flexible_length = 4;
                }
                let value = if holds { 0xFF } else { 0 };
                self.write_operand(instruction.destination, Size::Byte, value);
            }
            Operation::Jmp | Operation::Jsr => {
                self.registers.pc = self.read_operand(instruction.source);
            }
            Operation::Rts => {
                self.registers.pc = self.read_operand(instruction.source);
            }
            Operation::Rte => {
                let value = self.read_operand(instruction.source);
                self.registers.set_status(value as u16);
            }
            Operation::Rtr => {
                let value = self.read_operand(instruction.source);
                self.registers.set_ccr(value as u8);
            }
            Operation::Trap => {
                let vector = 32 + (self.opcode & 0x000F) as u8;
                self.begin_trap(vector, self.registers.pc.wrapping_sub(2));
            }
            Operation::Lea => {
                let address = self.read_operand(instruction.source);
                self.write_operand(instruction.destination, Size::Long, address);
            }

            Operation::Btst | Operation::Bchg | Operation::Bclr | Operation::Bset => {
                self.bit_operation(instruction.operation, size);
            }

            Operation::Clr => {
                let sr = (sr & !(N | V | C)) | Z;
                self.registers.set_status(sr);
                self.write_operand(instruction.destination, size, 0);
            }
            Operation::Neg | Operation::Negx => {
                let dst = self.read_operand(instruction.destination);
                let (result, sr) = if instruction.operation == Operation::Neg {
                    alu::neg(dst, size, sr)
                } else {
                    alu::negx(dst, size, sr)
                };
                self.registers.set_status(sr);
                self.write_operand(instruction.destination, size, result);
            }
            Operation::Not => {
                let result = !self.read_operand(instruction.destination);
                self.registers.set_status(flags::logical(sr, result, size));
                self.write_operand(instruction.destination, size, result);
            }
            Operation::Tst => {
                let value = self.read_operand(instruction.destination);
                self.registers.set_status(flags::logical(sr, value, size));
            }
            Operation::Tas => {
                let value = self.read_operand(instruction.destination);
                self.registers.set_status(flags::logical(sr, value, Size::Byte));
                self.write_operand(instruction.destination, Size::Byte, value | 0x80);
            }
            Operation::Swap => {
                let value = self.read_operand(instruction.destination).rotate_left(16);
                self.registers.set_status(flags::logical(sr, value, Size::Long));
                self.write_operand(instruction.destination, Size::Long, value);
            }
            Operation::Ext => {
                let value = self.read_operand(instruction.destination);
                let value = match size {
                    Size::Word => Size::Byte.sign_extend(value),
                    _ => Size::Word.sign_extend(value),
                };
                self.registers.set_status(flags::logical(sr, value, size));
                self.write_operand(instruction.destination, size, value);
            }
            Operation::Exg => {
                let x = self.read_operand(instruction.source);
                let y = self.read_operand(instruction.destination);
                self.write_operand(instruction.source, Size::Long, y);
                self.write_operand(instruction.destination, Size::Long, x);
            }

            Operation::Asl
            | Operation::Asr
            | Operation::Lsl
            | Operation::Lsr
            | Operation::Rol
            | Operation::Ror
            | Operation::Roxl
            | Operation::Roxr => self.shift(instruction.operation, size),

            Operation::Mulu | Operation::Muls => {
                let src = self.read_operand(instruction.source) as u16;
                let dst = self.read_operand(instruction.destination) as u16;
                let (result, cycles) = if instruction.operation == Operation::Mulu {
                    (u32::from(src) * u32::from(dst), alu::mulu_cycles(src))
                } else {
                    let product = i32::from(src as i16) * i32::from(dst as i16);
                    (product as u32, alu::muls_cycles(src))
                };
                self.registers.set_status(flags::logical(sr, result, Size::Long));
                self.write_operand(instruction.destination, Size::Long, result);
                // The np already accounts for four of the cycles.
                self.flexible_length = (cycles - 4) * 2;
            }

            Operation::Nop | Operation::Reset => {}
        }
        None
    }

    fn read_operand(&self, operand: Operand) -> u32 {
        match operand {
            Operand::None => 0,
            Operand::DataRegister(reg) => self.registers.d[usize::from(reg)],
            Operand::AddressRegister(reg) => self.registers.a[usize::from(reg)],
            Operand::SourceLatch => self.bus_data[0],
            Operand::DestinationLatch => self.bus_data[1],
            Operand::Prefetch => self.prefetch >> 16,
            Operand::EffectiveAddress(side) => self.effective_address[usize::from(side)],
            Operand::Quick => match (self.opcode >> 9) & 7 {
                0 => 8,
                n => u32::from(n),
            },
        }
    }

    /// Data registers keep the bits above `size`; address registers and
    /// latches take the whole value.
    fn write_operand(&mut self, operand: Operand, size: Size, value: u32) {
        match operand {
            Operand::DataRegister(reg) => {
                let d = &mut self.registers.d[usize::from(reg)];
                *d = size.merge(*d, value);
            }
            Operand::AddressRegister(reg) => self.registers.a[usize::from(reg)] = value,
            Operand::SourceLatch => self.bus_data[0] = value,
            Operand::DestinationLatch => self.bus_data[1] = value,
            Operand::None | Operand::Prefetch | Operand::EffectiveAddress(_) | Operand::Quick => {}
        }
    }

    /// ANDI/ORI/EORI to CCR or SR. The immediate word has reached the high
    /// half of the prefetch queue; PC steps back so the closing fetches
    /// pick up the next instruction.
    fn immediate_to_status(&mut self, operation: Operation) {
        let immediate = self.read_operand(self.instruction.source) as u16;
        self.registers.pc = self.registers.pc.wrapping_sub(2);
        let apply = |value: u16| match operation {
            Operation::AndiToCcr | Operation::AndiToSr => value & immediate,
            Operation::OriToCcr | Operation::OriToSr => value | immediate,
            _ => value ^ immediate,
        };
        if matches!(
            operation,
            Operation::AndiToSr | Operation::OriToSr | Operation::EoriToSr
        ) {
            self.registers.set_status(apply(self.registers.status()));
        } else {
            let ccr = apply(u16::from(self.registers.ccr()));
            self.registers.set_ccr(ccr as u8);
        }
    }

    const fn condition_field(&self) -> u8 {
        ((self.opcode >> 8) & 0x0F) as u8
    }

    /// Bcc/BRA/BSR target: the byte displacement in the opcode, or the word
    /// in the low prefetch half. Both are relative to the opcode plus 2.
    fn branch_target(&self) -> u32 {
        match self.opcode & 0xFF {
            0 => self.word_branch_target(),
            d8 => {
                let base = self.registers.pc.wrapping_sub(2);
                base.wrapping_add(Size::Byte.sign_extend(u32::from(d8)))
            }
        }
    }

    /// DBcc and word-sized Bcc: the displacement is the extension word.
    fn word_branch_target(&self) -> u32 {
        let base = self.registers.pc.wrapping_sub(2);
        base.wrapping_add(Size::Word.sign_extend(self.prefetch))
    }

    fn branch(&mut self) -> usize {
        let programs = *self.tables.programs();
        if flags::condition(self.registers.status(), self.condition_field()) {
            self.registers.pc = self.branch_target();
            programs.branch_taken
        } else if self.opcode & 0xFF == 0 {
            programs.branch_word_not_taken
        } else {
            programs.branch_byte_not_taken
        }
    }

    fn decrement_and_branch(&mut self) -> usize {
        let programs = *self.tables.programs();
        if flags::condition(self.registers.status(), self.condition_field()) {
            return programs.dbcc_condition_true;
        }
        let reg = usize::from(self.instruction.destination_register);
        let counter = (self.registers.d[reg] as u16).wrapping_sub(1);
        self.registers.d[reg] = Size::Word.merge(self.registers.d[reg], u32::from(counter));
        let target = self.word_branch_target();
        if counter == 0xFFFF {
            self.dbcc_false_address = target;
            programs.dbcc_false_no_branch
        } else {
            self.registers.pc = target;
            programs.dbcc_false_branch
        }
    }

    fn begin_movem(&mut self, operation: Operation, size: Size) -> usize {
        let mask = self.bus_data[0] as u16;
        let predecrement = (self.opcode >> 3) & 7 == 4;
        let start = self.effective_address[1];
        self.movem = MovemCursor::new(mask, start, size == Size::Long, predecrement);

        let programs = self.tables.programs();
        let program = if operation == Operation::MovemToMemory {
            programs.movem_write
        } else {
            programs.movem_read
        };
        SpecialPrograms::movem_entry(program, self.movem.words())
    }

    /// Registers use the bit number modulo 32, memory bytes modulo 8.
    fn bit_operation(&mut self, operation: Operation, size: Size) {
        let instruction = self.instruction;
        let bit = self.read_operand(instruction.source) % size.bits();
        let mask = 1u32 << bit;
        let value = self.read_operand(instruction.destination);
        let sr = flags::set_if(self.registers.status(), Z, value & mask == 0);
        self.registers.set_status(sr);

        let result = match operation {
            Operation::Btst => return,
            Operation::Bchg => value ^ mask,
            Operation::Bclr => value & !mask,
            _ => value | mask,
        };
        if matches!(instruction.destination, Operand::DataRegister(_)) {
            let high = bit >= 16;
            self.flexible_length = match (operation, high) {
                (Operation::Bclr, true) => 12,
                (Operation::Bclr, false) => 8,
                (_, true) => 8,
                (_, false) => 4,
            };
        }
        self.write_operand(instruction.destination, size, result);
    }

    fn shift(&mut self, operation: Operation, size: Size) {
        let instruction = self.instruction;
        let register_form = matches!(instruction.destination, Operand::DataRegister(_));
        let count = if !register_form {
            1
        } else if matches!(instruction.source, Operand::DataRegister(_)) {
            self.read_operand(instruction.source) % 64
        } else {
            self.read_operand(Operand::Quick)
        };
        let value = self.read_operand(instruction.destination);
        let (result, sr) = alu::shift(operation, value, count, size, self.registers.status());
        self.registers.set_status(sr);
        self.write_operand(instruction.destination, size, result);
        if register_form {
            self.flexible_length = (count * 4) as u16;
        }
    }
}
