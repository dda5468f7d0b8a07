//! Operand fetch and write-back stages shared by most decoders.
//!
//! The 68000 moves through an operand in a fixed order: extension words and
//! address calculation, the read, the operation, then (for memory
//! destinations) the write. These helpers emit those stages for every
//! addressing mode so that each decoder only has to describe what is
//! particular to its instruction.

use super::{Builder, CompileError, DST, EA0, EA1, SRC, a, seq};
use crate::addressing::{AddrMode, decrement_action, increment_action};
use crate::microcode::{Action, Target};
use crate::operation::Size;

/// What follows the read of a memory destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Writeback {
    /// Perform, then write the result back.
    Write,
    /// Perform only; the operation just inspects its operand.
    Discard,
    /// TAS: hold the bus and write the byte back.
    TestAndSet,
}

/// Memory modes a result can be written back to.
pub(super) const fn is_memory_alterable(mode: AddrMode) -> bool {
    !mode.is_register() && !mode.is_pc_relative() && !matches!(mode, AddrMode::Immediate)
}

/// Closing program for an operation whose result lands in a data register.
pub(super) const fn register_tail(mode: AddrMode, size: Size) -> &'static str {
    match size {
        Size::Long if mode.is_register() || matches!(mode, AddrMode::Immediate) => "np nn",
        Size::Long => "np n",
        _ => "np",
    }
}

impl Builder {
    /// Load a memory or immediate source operand into the source latch.
    /// Register operands need no bus activity.
    pub(super) fn fetch_source(
        &mut self,
        mode: AddrMode,
        reg: u8,
        size: Size,
    ) -> Result<(), CompileError> {
        let long = size == Size::Long;
        let read = if long { "nR+ nr" } else { "nr" };
        let register = [a(reg)];
        let latch = [EA0, EA0];

        match mode {
            AddrMode::DataReg | AddrMode::AddrReg => {}
            AddrMode::AddrInd | AddrMode::AddrIndPostInc => {
                if long {
                    self.op(Action::CopyToEffectiveAddress, SRC, seq(read).at(&latch))?;
                } else {
                    self.bus(seq(read).at(&register).sized(size))?;
                }
            }
            AddrMode::AddrIndPreDec => {
                if long {
                    self.action(Action::Decrement4, SRC);
                    self.op(Action::CopyToEffectiveAddress, SRC, seq("n nR+ nr").at(&latch))?;
                } else {
                    let decrement = decrement_action(size, reg);
                    self.op(decrement, SRC, seq("n nr").at(&register).sized(size))?;
                }
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                let pattern = if long { "np nR+ nr" } else { "np nr" };
                self.op(mode.address_action(), SRC, seq(pattern).at(&latch).sized(size))?;
            }
            AddrMode::Immediate => self.fetch_immediate(size)?,
            AddrMode::AddrIndDisp | AddrMode::AddrIndIndex | AddrMode::AbsShort
            | AddrMode::PcDisp | AddrMode::PcIndex => {
                let pattern = if long { "np nR+ nr" } else { "np nr" };
                self.op(
                    mode.address_action(),
                    SRC,
                    seq(pattern).at(&latch).sized(size).indexed(mode),
                )?;
            }
        }
        Ok(())
    }

    /// Assemble an immediate operand from the instruction stream into the
    /// source latch.
    pub(super) fn fetch_immediate(&mut self, size: Size) -> Result<(), CompileError> {
        if size == Size::Long {
            self.bus(seq("np"))?;
            self.op(Action::AssembleLongWordDataFromPrefetch, SRC, seq("np"))
        } else {
            self.op(Action::AssembleWordDataFromPrefetch, SRC, seq("np"))
        }
    }

    /// Read a memory destination into the destination latch, perform the
    /// operation and finish according to `writeback`.
    pub(super) fn read_modify_write(
        &mut self,
        mode: AddrMode,
        reg: u8,
        size: Size,
        writeback: Writeback,
    ) -> Result<(), CompileError> {
        debug_assert!(!mode.is_register() && mode != AddrMode::Immediate);

        let long = size == Size::Long;
        let read = if long { "nRd+ nrd" } else { "nrd" };
        let register = [a(reg)];
        let latch = [EA1, EA1];
        let through_register = matches!(
            mode,
            AddrMode::AddrInd | AddrMode::AddrIndPostInc | AddrMode::AddrIndPreDec
        );

        match mode {
            AddrMode::AddrInd | AddrMode::AddrIndPostInc => {
                if long {
                    self.op(Action::CopyToEffectiveAddress, DST, seq(read).at(&latch))?;
                } else {
                    self.bus(seq(read).at(&register).sized(size))?;
                }
            }
            AddrMode::AddrIndPreDec => {
                if long {
                    self.action(Action::Decrement4, DST);
                    self.op(Action::CopyToEffectiveAddress, DST, seq("n nRd+ nrd").at(&latch))?;
                } else {
                    let decrement = decrement_action(size, reg);
                    self.op(decrement, DST, seq("n nrd").at(&register).sized(size))?;
                }
            }
            AddrMode::AbsLong => {
                self.bus(seq("np"))?;
                let pattern = if long { "np nRd+ nrd" } else { "np nrd" };
                self.op(mode.address_action(), DST, seq(pattern).at(&latch).sized(size))?;
            }
            _ => {
                let pattern = if long { "np nRd+ nrd" } else { "np nrd" };
                self.op(
                    mode.address_action(),
                    DST,
                    seq(pattern).at(&latch).sized(size).indexed(mode),
                )?;
            }
        }

        let write_at: &[_] = if through_register && !long {
            &register
        } else {
            &latch
        };
        match writeback {
            Writeback::Write if long => self.perform(seq("np nw- nW").at(&latch))?,
            Writeback::Write => self.perform(seq("np nw").at(write_at).sized(size))?,
            Writeback::Discard => self.perform(seq("np"))?,
            Writeback::TestAndSet => self.perform(seq("tas np").at(write_at).sized(Size::Byte))?,
        }

        self.post_increment(mode, reg, size, DST);
        Ok(())
    }

    /// Append the trailing (An)+ adjustment, if the mode has one.
    pub(super) fn post_increment(&mut self, mode: AddrMode, reg: u8, size: Size, target: Target) {
        if mode == AddrMode::AddrIndPostInc {
            self.action(increment_action(size, reg), target);
        }
    }
}
