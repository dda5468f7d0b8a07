//! The instruction table compiler.
//!
//! Every one of the 65536 opcode words is offered to an ordered table of
//! `(mask, value, operation, decoder)` patterns. The first decoder that
//! accepts an opcode emits its micro-op chain; an opcode nobody accepts stays
//! unmapped and raises an illegal-instruction trap when executed.
//!
//! Decoders work in the manner of a disassembler: they pull register, mode
//! and size fields out of the opcode, reject combinations the 68000 does not
//! have, and describe the bus activity of each legal one in the mini-language
//! of [`crate::program`].

mod arith;
mod branches;
mod logic;
mod moves;
mod operands;
mod shifts;
mod special;

use log::debug;
use thiserror::Error;

use crate::addressing::AddrMode;
use crate::config::Config;
use crate::instruction::Instruction;
use crate::microcode::{Action, MicroOp, Target};
use crate::operation::{Operation, Size};
use crate::program::{AddressSource, BusStep, BusStepArena, ProgramError, Width, program_at};

pub use special::{MOVEM_MAX_WORDS, SpecialPrograms};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("opcode {opcode:#06X} decodes as both {first:?} and {second:?}")]
    OverlappingPatterns {
        opcode: u16,
        first: Operation,
        second: Operation,
    },
}

/// The immutable output of a build: bus steps, micro-ops and the per-opcode
/// instruction table.
#[derive(Debug, Clone)]
pub struct CompiledTables {
    steps: Vec<BusStep>,
    micro_ops: Vec<MicroOp>,
    instructions: Box<[Option<Instruction>]>,
    programs: SpecialPrograms,
}

impl CompiledTables {
    pub fn build(config: &Config) -> Result<Self, CompileError> {
        let mut arena = BusStepArena::new();
        let programs = SpecialPrograms::build(&mut arena)?;
        let mut builder = Builder {
            arena,
            micro_ops: Vec::new(),
            programs,
        };
        let instructions = builder.install_instructions(config)?;

        let tables = Self {
            steps: builder.arena.into_steps(),
            micro_ops: builder.micro_ops,
            instructions,
            programs,
        };
        debug!(
            "68000 tables: {} opcodes mapped, {} micro-ops, {} bus steps",
            tables.mapped_opcodes(),
            tables.micro_ops.len(),
            tables.steps.len()
        );
        Ok(tables)
    }

    /// The table entry for `opcode`, or `None` if it is illegal.
    #[must_use]
    pub fn instruction(&self, opcode: u16) -> Option<&Instruction> {
        self.instructions[usize::from(opcode)].as_ref()
    }

    #[must_use]
    pub fn mapped_opcodes(&self) -> usize {
        self.instructions.iter().flatten().count()
    }

    #[must_use]
    pub fn steps(&self) -> &[BusStep] {
        &self.steps
    }

    /// The program at `offset`, up to and including its sentinel.
    #[must_use]
    pub fn program(&self, offset: usize) -> &[BusStep] {
        program_at(&self.steps, offset)
    }

    #[must_use]
    pub fn micro_ops(&self) -> &[MicroOp] {
        &self.micro_ops
    }

    /// The micro-op chain of an instruction, up to and including its
    /// terminal op.
    #[must_use]
    pub fn chain(&self, instruction: &Instruction) -> &[MicroOp] {
        let tail = &self.micro_ops[instruction.micro_ops..];
        let end = tail
            .iter()
            .position(MicroOp::is_terminal)
            .map_or(tail.len(), |i| i + 1);
        &tail[..end]
    }

    #[must_use]
    pub const fn programs(&self) -> &SpecialPrograms {
        &self.programs
    }
}

// ============================================================================
// Pattern table
// ============================================================================

/// Decode strategy: how to pull operands and bus activity out of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    AbcdSbcd,
    AddSub,
    AddaSuba,
    AddqSubq,
    AndOrEor,
    Bcc,
    BitDynamic,
    BitStatic,
    ClrNegNegxNot,
    Cmp,
    Cmpa,
    Cmpi,
    Cmpm,
    Immediate,
    ImmediateToStatus,
    Jmp,
    Jsr,
    Lea,
    Move,
    MoveToStatus,
    MoveFromSr,
    Moveq,
    MoveUsp,
    Movem,
    MuluMuls,
    Nop,
    Reset,
    RteRtr,
    Rts,
    SccDbcc,
    ShiftMemory,
    ShiftRegister,
    Tas,
    Trap,
    Tst,
    Exg,
    ExtSwap,
}

struct Pattern {
    mask: u16,
    value: u16,
    operation: Operation,
    decoder: Decoder,
}

const fn p(mask: u16, value: u16, operation: Operation, decoder: Decoder) -> Pattern {
    Pattern {
        mask,
        value,
        operation,
        decoder,
    }
}

use Decoder as D;
use Operation as O;

/// Section references are to the M68000 Programmer's Reference Manual.
#[rustfmt::skip]
const PATTERNS: &[Pattern] = &[
    p(0xF1F0, 0xC100, O::Abcd, D::AbcdSbcd),                // 4-3
    p(0xF1F0, 0x8100, O::Sbcd, D::AbcdSbcd),                // 4-171

    p(0xF0C0, 0xC000, O::And, D::AndOrEor),                 // 4-15
    p(0xF0C0, 0xC040, O::And, D::AndOrEor),
    p(0xF0C0, 0xC080, O::And, D::AndOrEor),
    p(0xF0C0, 0x8000, O::Or, D::AndOrEor),                  // 4-150
    p(0xF0C0, 0x8040, O::Or, D::AndOrEor),
    p(0xF0C0, 0x8080, O::Or, D::AndOrEor),
    p(0xF0C0, 0xB000, O::Eor, D::AndOrEor),                 // 4-100
    p(0xF0C0, 0xB040, O::Eor, D::AndOrEor),
    p(0xF0C0, 0xB080, O::Eor, D::AndOrEor),

    p(0xFFC0, 0x0600, O::Add, D::Immediate),                // 4-9
    p(0xFFC0, 0x0640, O::Add, D::Immediate),
    p(0xFFC0, 0x0680, O::Add, D::Immediate),
    p(0xFFC0, 0x0200, O::And, D::Immediate),                // 4-18
    p(0xFFC0, 0x0240, O::And, D::Immediate),
    p(0xFFC0, 0x0280, O::And, D::Immediate),
    p(0xFFC0, 0x0000, O::Or, D::Immediate),                 // 4-153
    p(0xFFC0, 0x0040, O::Or, D::Immediate),
    p(0xFFC0, 0x0080, O::Or, D::Immediate),
    p(0xFFC0, 0x0A00, O::Eor, D::Immediate),                // 4-102
    p(0xFFC0, 0x0A40, O::Eor, D::Immediate),
    p(0xFFC0, 0x0A80, O::Eor, D::Immediate),
    p(0xFFC0, 0x0400, O::Sub, D::Immediate),                // 4-179
    p(0xFFC0, 0x0440, O::Sub, D::Immediate),
    p(0xFFC0, 0x0480, O::Sub, D::Immediate),
    p(0xFFC0, 0x0C00, O::Cmp, D::Cmpi),                     // 4-79
    p(0xFFC0, 0x0C40, O::Cmp, D::Cmpi),
    p(0xFFC0, 0x0C80, O::Cmp, D::Cmpi),

    p(0xFFFF, 0x027C, O::AndiToSr, D::ImmediateToStatus),   // 6-2
    p(0xFFFF, 0x023C, O::AndiToCcr, D::ImmediateToStatus),  // 4-20
    p(0xFFFF, 0x0A7C, O::EoriToSr, D::ImmediateToStatus),   // 6-10
    p(0xFFFF, 0x0A3C, O::EoriToCcr, D::ImmediateToStatus),  // 4-104
    p(0xFFFF, 0x007C, O::OriToSr, D::ImmediateToStatus),    // 6-27
    p(0xFFFF, 0x003C, O::OriToCcr, D::ImmediateToStatus),   // 4-155

    p(0xF000, 0x1000, O::Move, D::Move),                    // 4-116 (.b)
    p(0xF000, 0x3000, O::Move, D::Move),                    // (.w)
    p(0xF000, 0x2000, O::Move, D::Move),                    // (.l)
    p(0xFFC0, 0x46C0, O::MoveToSr, D::MoveToStatus),        // 6-19
    p(0xFFC0, 0x44C0, O::MoveToCcr, D::MoveToStatus),       // 4-123
    p(0xFFC0, 0x40C0, O::MoveFromSr, D::MoveFromSr),        // 6-17
    p(0xF100, 0x7000, O::Moveq, D::Moveq),                  // 4-134
    p(0xFFF0, 0x4E60, O::MoveToUsp, D::MoveUsp),            // 6-21
    p(0xFF80, 0x4880, O::MovemToMemory, D::Movem),          // 4-128
    p(0xFF80, 0x4C80, O::MovemToRegisters, D::Movem),

    p(0xF1C0, 0xB000, O::Cmp, D::Cmp),                      // 4-75
    p(0xF1C0, 0xB040, O::Cmp, D::Cmp),
    p(0xF1C0, 0xB080, O::Cmp, D::Cmp),
    p(0xF0C0, 0xB0C0, O::Cmpa, D::Cmpa),                    // 4-77
    p(0xF138, 0xB108, O::Cmp, D::Cmpm),                     // 4-81

    p(0xF000, 0x6000, O::Bcc, D::Bcc),                      // 4-25, 4-55, 4-59
    p(0xF0C0, 0x50C0, O::Scc, D::SccDbcc),                  // 4-173, 4-91
    p(0xFFC0, 0x4EC0, O::Jmp, D::Jmp),                      // 4-108
    p(0xFFC0, 0x4E80, O::Jsr, D::Jsr),                      // 4-109
    p(0xFFFF, 0x4E75, O::Rts, D::Rts),                      // 4-169
    p(0xFFFF, 0x4E73, O::Rte, D::RteRtr),                   // 6-84
    p(0xFFFF, 0x4E77, O::Rtr, D::RteRtr),                   // 4-168
    p(0xFFF0, 0x4E40, O::Trap, D::Trap),                    // 4-188
    p(0xFFFF, 0x4E71, O::Nop, D::Nop),                      // 4-147
    p(0xFFFF, 0x4E70, O::Reset, D::Reset),                  // 6-83

    p(0xF1C0, 0x41C0, O::Lea, D::Lea),                      // 4-110

    p(0xF0C0, 0x9000, O::Sub, D::AddSub),                   // 4-174
    p(0xF0C0, 0x9040, O::Sub, D::AddSub),
    p(0xF0C0, 0x9080, O::Sub, D::AddSub),
    p(0xF0C0, 0xD000, O::Add, D::AddSub),                   // 4-4
    p(0xF0C0, 0xD040, O::Add, D::AddSub),
    p(0xF0C0, 0xD080, O::Add, D::AddSub),
    p(0xF0C0, 0xD0C0, O::Adda, D::AddaSuba),                // 4-7
    p(0xF0C0, 0x90C0, O::Suba, D::AddaSuba),                // 4-177
    p(0xF1C0, 0x5000, O::Add, D::AddqSubq),                 // 4-11
    p(0xF1C0, 0x5040, O::Add, D::AddqSubq),
    p(0xF1C0, 0x5080, O::Add, D::AddqSubq),
    p(0xF1C0, 0x5100, O::Sub, D::AddqSubq),                 // 4-181
    p(0xF1C0, 0x5140, O::Sub, D::AddqSubq),
    p(0xF1C0, 0x5180, O::Sub, D::AddqSubq),

    p(0xF1C0, 0x0100, O::Btst, D::BitDynamic),              // 4-62
    p(0xFFC0, 0x0800, O::Btst, D::BitStatic),
    p(0xF1C0, 0x0180, O::Bclr, D::BitDynamic),              // 4-31
    p(0xFFC0, 0x0880, O::Bclr, D::BitStatic),
    p(0xF1C0, 0x0140, O::Bchg, D::BitDynamic),              // 4-28
    p(0xFFC0, 0x0840, O::Bchg, D::BitStatic),
    p(0xF1C0, 0x01C0, O::Bset, D::BitDynamic),              // 4-57
    p(0xFFC0, 0x08C0, O::Bset, D::BitStatic),

    p(0xFF00, 0x4200, O::Clr, D::ClrNegNegxNot),            // 4-73
    p(0xFF00, 0x4400, O::Neg, D::ClrNegNegxNot),            // 4-144
    p(0xFF00, 0x4000, O::Negx, D::ClrNegNegxNot),           // 4-146
    p(0xFF00, 0x4600, O::Not, D::ClrNegNegxNot),            // 4-148
    p(0xFF00, 0x4A00, O::Tst, D::Tst),                      // 4-192
    p(0xFFC0, 0x4AC0, O::Tas, D::Tas),                      // 4-186

    p(0xF118, 0xE100, O::Asl, D::ShiftRegister),            // 4-22
    p(0xF118, 0xE000, O::Asr, D::ShiftRegister),
    p(0xF118, 0xE108, O::Lsl, D::ShiftRegister),            // 4-113
    p(0xF118, 0xE008, O::Lsr, D::ShiftRegister),
    p(0xF118, 0xE118, O::Rol, D::ShiftRegister),            // 4-160
    p(0xF118, 0xE018, O::Ror, D::ShiftRegister),
    p(0xF118, 0xE110, O::Roxl, D::ShiftRegister),           // 4-163
    p(0xF118, 0xE010, O::Roxr, D::ShiftRegister),
    p(0xFFC0, 0xE1C0, O::Asl, D::ShiftMemory),
    p(0xFFC0, 0xE0C0, O::Asr, D::ShiftMemory),
    p(0xFFC0, 0xE3C0, O::Lsl, D::ShiftMemory),
    p(0xFFC0, 0xE2C0, O::Lsr, D::ShiftMemory),
    p(0xFFC0, 0xE7C0, O::Rol, D::ShiftMemory),
    p(0xFFC0, 0xE6C0, O::Ror, D::ShiftMemory),
    p(0xFFC0, 0xE5C0, O::Roxl, D::ShiftMemory),
    p(0xFFC0, 0xE4C0, O::Roxr, D::ShiftMemory),

    p(0xF1C0, 0xC0C0, O::Mulu, D::MuluMuls),                // 4-139
    p(0xF1C0, 0xC1C0, O::Muls, D::MuluMuls),                // 4-136

    p(0xF1F8, 0xC140, O::Exg, D::Exg),                      // 4-105
    p(0xF1F8, 0xC148, O::Exg, D::Exg),
    p(0xF1F8, 0xC188, O::Exg, D::Exg),
    p(0xFFF8, 0x4840, O::Swap, D::ExtSwap),                 // 4-185
    p(0xFFB8, 0x4880, O::Ext, D::ExtSwap),                  // 4-106
];

// ============================================================================
// Builder
// ============================================================================

/// A decoder's verdict: the table entry, or `None` to let the scan continue.
type Decoded = Result<Option<Instruction>, CompileError>;

/// One bus program, ready to assemble.
#[derive(Debug, Clone, Copy)]
pub(super) struct Seq<'a> {
    pattern: &'a str,
    addresses: &'a [AddressSource],
    width: Width,
    idle_prefix: bool,
}

pub(super) const fn seq(pattern: &str) -> Seq<'_> {
    Seq {
        pattern,
        addresses: &[],
        width: Width::Word,
        idle_prefix: false,
    }
}

impl<'a> Seq<'a> {
    /// Bind addresses, in order, to the tokens that take one.
    pub(super) const fn at(mut self, addresses: &'a [AddressSource]) -> Self {
        self.addresses = addresses;
        self
    }

    /// Byte-select the data tokens if `size` is a byte.
    pub(super) const fn sized(mut self, size: Size) -> Self {
        if matches!(size, Size::Byte) {
            self.width = Width::Byte;
        }
        self
    }

    /// Prefix an idle step for the modes that add an index register.
    pub(super) const fn indexed(mut self, mode: AddrMode) -> Self {
        self.idle_prefix = mode.is_indexed();
        self
    }
}

pub(super) const EA0: AddressSource = AddressSource::EffectiveAddress(0);
pub(super) const EA1: AddressSource = AddressSource::EffectiveAddress(1);

/// Address register `reg` as a bus address.
pub(super) const fn a(reg: u8) -> AddressSource {
    AddressSource::AddressRegister(reg)
}

pub(super) const SRC: Target = Target::SOURCE;
pub(super) const DST: Target = Target::DESTINATION;
pub(super) const NONE: Target = Target::empty();

struct Builder {
    arena: BusStepArena,
    micro_ops: Vec<MicroOp>,
    programs: SpecialPrograms,
}

impl Builder {
    fn install_instructions(
        &mut self,
        config: &Config,
    ) -> Result<Box<[Option<Instruction>]>, CompileError> {
        let mut instructions = vec![None; 0x1_0000].into_boxed_slice();

        for opcode in 0..=u16::MAX {
            let mut installed: Option<Operation> = None;
            for pattern in PATTERNS {
                if opcode & pattern.mask != pattern.value {
                    continue;
                }

                let start = self.micro_ops.len();
                let Some(mut instruction) = self.decode(pattern, opcode)? else {
                    self.micro_ops.truncate(start);
                    continue;
                };

                if let Some(first) = installed {
                    return Err(CompileError::OverlappingPatterns {
                        opcode,
                        first,
                        second: instruction.operation,
                    });
                }

                self.finish_chain(start);
                instruction.micro_ops = start;
                instructions[usize::from(opcode)] = Some(instruction);
                installed = Some(instruction.operation);

                if !config.check_pattern_overlaps {
                    break;
                }
            }
        }

        Ok(instructions)
    }

    fn decode(&mut self, pattern: &Pattern, opcode: u16) -> Decoded {
        let operation = pattern.operation;
        match pattern.decoder {
            Decoder::AbcdSbcd => self.decode_abcd_sbcd(opcode, operation),
            Decoder::AddSub => self.decode_add_sub(opcode, operation),
            Decoder::AddaSuba => self.decode_adda_suba(opcode, operation),
            Decoder::AddqSubq => self.decode_addq_subq(opcode, operation),
            Decoder::AndOrEor => self.decode_and_or_eor(opcode, operation),
            Decoder::Bcc => self.decode_bcc(opcode),
            Decoder::BitDynamic => self.decode_bit(opcode, operation, false),
            Decoder::BitStatic => self.decode_bit(opcode, operation, true),
            Decoder::ClrNegNegxNot => self.decode_single_operand(opcode, operation),
            Decoder::Cmp => self.decode_cmp(opcode),
            Decoder::Cmpa => self.decode_cmpa(opcode),
            Decoder::Cmpi => self.decode_cmpi(opcode),
            Decoder::Cmpm => self.decode_cmpm(opcode),
            Decoder::Immediate => self.decode_immediate(opcode, operation),
            Decoder::ImmediateToStatus => self.decode_immediate_to_status(opcode, operation),
            Decoder::Jmp => self.decode_jmp(opcode),
            Decoder::Jsr => self.decode_jsr(opcode),
            Decoder::Lea => self.decode_lea(opcode),
            Decoder::Move => self.decode_move(opcode),
            Decoder::MoveToStatus => self.decode_move_to_status(opcode, operation),
            Decoder::MoveFromSr => self.decode_move_from_sr(opcode),
            Decoder::Moveq => self.decode_moveq(opcode),
            Decoder::MoveUsp => self.decode_move_usp(opcode),
            Decoder::Movem => self.decode_movem(opcode, operation),
            Decoder::MuluMuls => self.decode_mulu_muls(opcode, operation),
            Decoder::Nop => self.decode_nop(),
            Decoder::Reset => self.decode_reset(),
            Decoder::RteRtr => self.decode_rte_rtr(operation),
            Decoder::Rts => self.decode_rts(),
            Decoder::SccDbcc => self.decode_scc_dbcc(opcode),
            Decoder::ShiftMemory => self.decode_shift_memory(opcode, operation),
            Decoder::ShiftRegister => self.decode_shift_register(opcode, operation),
            Decoder::Tas => self.decode_tas(opcode),
            Decoder::Trap => self.decode_trap(),
            Decoder::Tst => self.decode_tst(opcode),
            Decoder::Exg => self.decode_exg(opcode),
            Decoder::ExtSwap => self.decode_ext_swap(opcode, operation),
        }
    }

    /// Give every internal micro-op a program and close the chain with a
    /// bare terminal op.
    fn finish_chain(&mut self, start: usize) {
        let empty = self.programs.empty;
        for op in &mut self.micro_ops[start..] {
            if op.bus_program.is_none() {
                op.bus_program = Some(empty);
            }
        }
        self.action(Action::None, NONE);
    }

    fn assemble(&mut self, seq: Seq<'_>) -> Result<usize, CompileError> {
        let offset = if seq.idle_prefix {
            let pattern = format!("n {}", seq.pattern);
            self.arena.assemble(&pattern, seq.addresses, seq.width)?
        } else {
            self.arena.assemble(seq.pattern, seq.addresses, seq.width)?
        };
        Ok(offset)
    }

    /// Append a micro-op that fires `action` on `target` and then runs `seq`.
    fn op(&mut self, action: Action, target: Target, seq: Seq<'_>) -> Result<(), CompileError> {
        let program = self.assemble(seq)?;
        self.micro_ops.push(MicroOp {
            action,
            target,
            bus_program: Some(program),
        });
        Ok(())
    }

    /// Append a micro-op that runs an already assembled program.
    fn op_program(&mut self, action: Action, target: Target, program: usize) {
        self.micro_ops.push(MicroOp {
            action,
            target,
            bus_program: Some(program),
        });
    }

    /// Append a micro-op with bus activity but no action.
    fn bus(&mut self, seq: Seq<'_>) -> Result<(), CompileError> {
        self.op(Action::None, NONE, seq)
    }

    /// Append the operation's perform point, followed by `seq`.
    fn perform(&mut self, seq: Seq<'_>) -> Result<(), CompileError> {
        self.op(Action::PerformOperation, NONE, seq)
    }

    /// Append a micro-op with no bus activity of its own.
    fn action(&mut self, action: Action, target: Target) {
        self.micro_ops.push(MicroOp {
            action,
            target,
            bus_program: None,
        });
    }
}

/// Register field in bits 9-11.
pub(super) const fn upper_register(opcode: u16) -> u8 {
    ((opcode >> 9) & 7) as u8
}

/// Register field in bits 0-2.
pub(super) const fn lower_register(opcode: u16) -> u8 {
    (opcode & 7) as u8
}

/// The usual two-bit size field in bits 6-7.
pub(super) const fn size_field(opcode: u16) -> Option<Size> {
    Size::from_bits(opcode >> 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_chains_end_in_exactly_one_terminal() {
        let mut arena = BusStepArena::new();
        let programs = SpecialPrograms::build(&mut arena).unwrap();
        let mut builder = Builder {
            arena,
            micro_ops: Vec::new(),
            programs,
        };
        builder.action(Action::CopyToEffectiveAddress, SRC);
        builder.perform(seq("np")).unwrap();
        builder.finish_chain(0);

        let ops = &builder.micro_ops;
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].bus_program, Some(programs.empty));
        assert!(!ops[1].is_terminal());
        assert!(ops[2].is_terminal());
    }

    #[test]
    fn indexed_sequences_gain_an_idle_step() {
        let mut arena = BusStepArena::new();
        let programs = SpecialPrograms::build(&mut arena).unwrap();
        let mut builder = Builder {
            arena,
            micro_ops: Vec::new(),
            programs,
        };
        let plain = builder.assemble(seq("np nr").at(&[EA0])).unwrap();
        let indexed = builder
            .assemble(seq("np nr").at(&[EA0]).indexed(AddrMode::PcIndex))
            .unwrap();
        assert_eq!(builder.arena.program(plain).len() + 1, builder.arena.program(indexed).len());
    }
}
