//! The processor: register file, scratch latches and the position in the
//! compiled tables.

use std::sync::Arc;

use emu_core::{HalfCycles, Observable, Value};
use log::debug;

use crate::compiler::{CompileError, CompiledTables};
use crate::config::Config;
use crate::flags::{C, N, V, X, Z};
use crate::instruction::Instruction;
use crate::movem::MovemCursor;
use crate::operation::{Operation, Size};
use crate::registers::Registers;

/// What the runtime does when the current program ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Running the reset sequence.
    Reset,
    /// Running an instruction's micro-op chain.
    Normal,
    /// Running an exception sequence.
    TrapPending,
}

impl ExecutionState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ExecutionState::Reset => "reset",
            ExecutionState::Normal => "normal",
            ExecutionState::TrapPending => "trap_pending",
        }
    }
}

/// A Motorola 68000.
///
/// Execution is driven by [`Processor::run_for`], which runs whole bus
/// steps against a [`crate::BusHandler`]. A new processor starts in the
/// reset sequence, so the first steps fetch the initial SSP and PC.
#[derive(Debug, Clone)]
pub struct Processor {
    pub(crate) tables: Arc<CompiledTables>,
    pub(crate) config: Config,

    // === Register file ===
    pub(crate) registers: Registers,
    /// Two-word prefetch queue; the high word is the next word to consume.
    pub(crate) prefetch: u32,

    // === Scratch latches ===
    pub(crate) effective_address: [u32; 2],
    pub(crate) bus_data: [u32; 2],
    /// Exception frame addresses: PC low, SR, PC high.
    pub(crate) precomputed: [u32; 3],
    pub(crate) dbcc_false_address: u32,
    pub(crate) movem: MovemCursor,

    // === Interrupts ===
    pub(crate) interrupt_level: u8,
    /// Set when the level rises to 7, so the NMI is taken even at mask 7.
    pub(crate) nmi_edge: bool,
    /// Level being acknowledged.
    pub(crate) acknowledged_level: u8,
    /// Vector number latched by the acknowledge cycle.
    pub(crate) interrupt_vector: u16,

    // === Position ===
    pub(crate) state: ExecutionState,
    pub(crate) opcode: u16,
    pub(crate) instruction: Instruction,
    pub(crate) micro_op: usize,
    pub(crate) step: usize,
    /// Length of the next flexible step, set by the operation.
    pub(crate) flexible_length: u16,

    // === Timing ===
    pub(crate) cycles: HalfCycles,
    /// Time already run past the end of the previous `run_for`.
    pub(crate) debt: HalfCycles,
}

impl Processor {
    /// Build the tables with the default configuration.
    ///
    /// # Panics
    ///
    /// If the table build fails. It cannot for the shipped pattern table.
    #[must_use]
    pub fn new() -> Self {
        match Self::try_new(Config::default()) {
            Ok(processor) => processor,
            Err(error) => panic!("68000 table build failed: {error}"),
        }
    }

    pub fn try_new(config: Config) -> Result<Self, CompileError> {
        let tables = CompiledTables::build(&config)?;
        Ok(Self::with_tables(Arc::new(tables), config))
    }

    /// A processor that shares already built tables.
    #[must_use]
    pub fn with_tables(tables: Arc<CompiledTables>, config: Config) -> Self {
        let mut processor = Self {
            tables,
            config,
            registers: Registers::new(),
            prefetch: 0,
            effective_address: [0; 2],
            bus_data: [0; 2],
            precomputed: [0; 3],
            dbcc_false_address: 0,
            movem: MovemCursor::default(),
            interrupt_level: 0,
            nmi_edge: false,
            acknowledged_level: 0,
            interrupt_vector: 0,
            state: ExecutionState::Reset,
            opcode: 0,
            instruction: Instruction::new(Operation::Nop, Size::Word),
            micro_op: 0,
            step: 0,
            flexible_length: 0,
            cycles: HalfCycles::ZERO,
            debt: HalfCycles::ZERO,
        };
        processor.reset();
        processor
    }

    #[must_use]
    pub fn tables(&self) -> &Arc<CompiledTables> {
        &self.tables
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Drive the interrupt priority lines (0-7, 0 for none).
    pub fn set_interrupt_level(&mut self, level: u8) {
        let level = level & 7;
        if level == 7 && self.interrupt_level != 7 {
            self.nmi_edge = true;
        }
        if level != self.interrupt_level {
            debug!("68000 interrupt level {level}");
        }
        self.interrupt_level = level;
    }

    #[must_use]
    pub const fn interrupt_level(&self) -> u8 {
        self.interrupt_level
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Registers may be changed between calls to `run_for`.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// The prefetch queue, high word first.
    #[must_use]
    pub const fn prefetch(&self) -> u32 {
        self.prefetch
    }

    #[must_use]
    pub const fn effective_address(&self) -> [u32; 2] {
        self.effective_address
    }

    #[must_use]
    pub const fn bus_data(&self) -> [u32; 2] {
        self.bus_data
    }

    #[must_use]
    pub const fn precomputed_addresses(&self) -> [u32; 3] {
        self.precomputed
    }

    #[must_use]
    pub const fn state(&self) -> ExecutionState {
        self.state
    }

    /// The opcode of the instruction in progress.
    #[must_use]
    pub const fn opcode(&self) -> u16 {
        self.opcode
    }

    /// Index of the current micro-op in the compiled tables.
    #[must_use]
    pub const fn micro_op_cursor(&self) -> usize {
        self.micro_op
    }

    /// Index of the next bus step in the compiled tables.
    #[must_use]
    pub const fn bus_step_cursor(&self) -> usize {
        self.step
    }

    /// Half-cycles run since construction, wait states included.
    #[must_use]
    pub const fn cycles(&self) -> HalfCycles {
        self.cycles
    }

    /// True at the boundary between two instructions.
    #[must_use]
    pub fn at_instruction_boundary(&self) -> bool {
        if !self.tables.steps()[self.step].is_terminal() {
            return false;
        }
        match self.state {
            ExecutionState::Reset | ExecutionState::TrapPending => true,
            ExecutionState::Normal => self.tables.micro_ops()[self.micro_op].is_terminal(),
        }
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

/// Every path [`Processor`] answers.
#[rustfmt::skip]
pub const MC68000_QUERY_PATHS: &[&str] = &[
    "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7",
    "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7",
    "usp", "ssp",
    "pc",
    "sr", "ccr",
    "flags.x", "flags.n", "flags.z", "flags.v", "flags.c",
    "flags.s", "flags.t",
    "int_mask",
    "state", "opcode", "cycles",
    "prefetch", "micro_op", "bus_step",
];

impl Observable for Processor {
    fn query(&self, path: &str) -> Option<Value> {
        let regs = &self.registers;
        let sr = regs.status();
        if let Some(index) = path.strip_prefix('d').and_then(register_index) {
            return Some(regs.d[index].into());
        }
        if let Some(index) = path.strip_prefix('a').and_then(register_index) {
            return Some(regs.a[index].into());
        }
        match path {
            "usp" => Some(regs.usp().into()),
            "ssp" => Some(regs.ssp().into()),
            "pc" => Some(regs.pc.into()),
            "sr" => Some(sr.into()),
            "ccr" => Some(regs.ccr().into()),
            "flags.x" => Some((sr & X != 0).into()),
            "flags.n" => Some((sr & N != 0).into()),
            "flags.z" => Some((sr & Z != 0).into()),
            "flags.v" => Some((sr & V != 0).into()),
            "flags.c" => Some((sr & C != 0).into()),
            "flags.s" => Some(regs.is_supervisor().into()),
            "flags.t" => Some(regs.is_trace().into()),
            "int_mask" => Some(regs.interrupt_mask().into()),
            "state" => Some(self.state.name().into()),
            "opcode" => Some(self.opcode.into()),
            "cycles" => Some(self.cycles.get().into()),
            "prefetch" => Some(self.prefetch.into()),
            "micro_op" => Some((self.micro_op as u64).into()),
            "bus_step" => Some((self.step as u64).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        MC68000_QUERY_PATHS
    }
}

fn register_index(digit: &str) -> Option<usize> {
    match digit.as_bytes() {
        [d @ b'0'..=b'7'] => Some(usize::from(d - b'0')),
        _ => None,
    }
}
