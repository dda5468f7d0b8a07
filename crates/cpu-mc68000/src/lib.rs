//! Motorola 68000 core driven by precompiled bus-step programs.
//!
//! At construction every one of the 65536 opcode words is compiled into a
//! chain of micro-ops, each naming a short program of bus steps. Running the
//! processor is then a walk over those tables: every step is handed to a
//! [`BusHandler`] with its exact length in half-cycles, so a machine can
//! keep its chipset in lockstep with the CPU and insert wait states where
//! the real bus would.
//!
//! Tables are immutable once built and can be shared between processors
//! with [`Processor::with_tables`].

pub mod addressing;
pub mod alu;
pub mod bus;
pub mod compiler;
pub mod config;
mod exceptions;
mod execute;
pub mod flags;
pub mod instruction;
pub mod microcode;
mod movem;
pub mod operation;
pub mod processor;
pub mod program;
pub mod registers;
mod runtime;

pub use addressing::AddrMode;
pub use bus::{BusHandler, BusOperation};
pub use compiler::{CompileError, CompiledTables};
pub use config::Config;
pub use emu_core::{HalfCycles, Observable, Value};
pub use flags::{C, N, V, X, Z};
pub use instruction::{Instruction, Operand};
pub use operation::{Operation, Size};
pub use processor::{ExecutionState, MC68000_QUERY_PATHS, Processor};
pub use registers::Registers;
