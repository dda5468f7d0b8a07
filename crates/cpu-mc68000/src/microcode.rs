//! Micro-operations: the coarse steps an instruction is compiled into.
//!
//! A micro-op pairs an [`Action`] with an optional bus-step program. When
//! the processor enters a micro-op the action fires first, then the program
//! runs. A micro-op without a program ends the instruction.

use bitflags::bitflags;

bitflags! {
    /// Which side(s) of the instruction an action applies to.
    ///
    /// Each side owns an effective-address latch, a bus-data latch and an
    /// address register number, so the two never alias.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Target: u8 {
        const SOURCE = 1 << 0;
        const DESTINATION = 1 << 1;
    }
}

impl Target {
    /// Latch index (0 or 1) of each selected side.
    pub fn sides(self) -> impl Iterator<Item = usize> {
        [Target::SOURCE, Target::DESTINATION]
            .into_iter()
            .enumerate()
            .filter(move |(_, side)| self.contains(*side))
            .map(|(index, _)| index)
    }
}

/// What a micro-op does when it is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    #[default]
    None,
    /// Carry out the instruction's operation.
    PerformOperation,

    // === Effective address calculation ===
    /// (d16,PC): base is the address of the extension word.
    CalcD16Pc,
    /// (d8,PC,Xn)
    CalcD8PcXn,
    /// (d16,An)
    CalcD16An,
    /// (d8,An,Xn)
    CalcD8AnXn,
    /// (xxx).W from the low prefetch word, sign-extended.
    AssembleWordAddressFromPrefetch,
    /// (xxx).L from both prefetch words.
    AssembleLongWordAddressFromPrefetch,
    /// #imm.W (or .B) from the low prefetch word into the bus-data latch.
    AssembleWordDataFromPrefetch,
    /// #imm.L from both prefetch words into the bus-data latch.
    AssembleLongWordDataFromPrefetch,
    /// Copy An into the effective-address latch.
    CopyToEffectiveAddress,

    // === Address register adjustment ===
    Increment1,
    Increment2,
    Increment4,
    Decrement1,
    Decrement2,
    Decrement4,

    // === Control flow ===
    /// Stack the return address of a JSR.
    PrepareJsr,
    /// Stack the return address of a BSR.
    PrepareBsr,
    /// Point effective address 0 at the return address and pop it.
    PrepareRts,
    /// Work out the frame addresses for RTE and RTR.
    PrepareRteRtr,

    // === MOVEM ===
    /// Latch the register mask from the prefetch queue.
    CopyNextWord,
    /// Write back the address register after a transfer to memory.
    MovemToMemoryComplete,
    /// Write back the address register after a transfer to registers.
    MovemToRegistersComplete,
}

/// One compiled step of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MicroOp {
    pub action: Action,
    pub target: Target,
    /// Offset of a program in the bus-step arena.
    pub bus_program: Option<usize>,
}

impl MicroOp {
    /// A micro-op with no bus program ends the instruction.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.bus_program.is_none()
    }
}
