//! Addressing modes and the micro-op actions that resolve them.

use crate::microcode::Action;
use crate::operation::Size;

/// The twelve 68000 addressing modes.
///
/// Mode 7 is split by its register field. Register values 5-7 of mode 7
/// have no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    /// Dn
    DataReg,
    /// An
    AddrReg,
    /// (An)
    AddrInd,
    /// (An)+
    AddrIndPostInc,
    /// -(An)
    AddrIndPreDec,
    /// (d16,An)
    AddrIndDisp,
    /// (d8,An,Xn)
    AddrIndIndex,
    /// (xxx).W
    AbsShort,
    /// (xxx).L
    AbsLong,
    /// (d16,PC)
    PcDisp,
    /// (d8,PC,Xn)
    PcIndex,
    /// #imm
    Immediate,
}

impl AddrMode {
    /// Decode a mode/register field pair.
    #[must_use]
    pub const fn decode(mode: u16, reg: u16) -> Option<Self> {
        Some(match (mode & 7, reg & 7) {
            (0, _) => Self::DataReg,
            (1, _) => Self::AddrReg,
            (2, _) => Self::AddrInd,
            (3, _) => Self::AddrIndPostInc,
            (4, _) => Self::AddrIndPreDec,
            (5, _) => Self::AddrIndDisp,
            (6, _) => Self::AddrIndIndex,
            (7, 0) => Self::AbsShort,
            (7, 1) => Self::AbsLong,
            (7, 2) => Self::PcDisp,
            (7, 3) => Self::PcIndex,
            (7, 4) => Self::Immediate,
            _ => return None,
        })
    }

    /// Decode the six-bit effective-address field in the low bits of an
    /// opcode.
    #[must_use]
    pub const fn from_ea_field(opcode: u16) -> Option<Self> {
        Self::decode(opcode >> 3, opcode)
    }

    #[must_use]
    pub const fn is_register(self) -> bool {
        matches!(self, Self::DataReg | Self::AddrReg)
    }

    #[must_use]
    pub const fn is_pc_relative(self) -> bool {
        matches!(self, Self::PcDisp | Self::PcIndex)
    }

    /// The indexed modes spend one extra idle step adding the index.
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::AddrIndIndex | Self::PcIndex)
    }

    /// The action that computes this mode's effective address from a
    /// displacement, an index or an absolute address in the prefetch queue.
    #[must_use]
    pub const fn address_action(self) -> Action {
        match self {
            Self::AddrIndDisp => Action::CalcD16An,
            Self::AddrIndIndex => Action::CalcD8AnXn,
            Self::PcDisp => Action::CalcD16Pc,
            Self::PcIndex => Action::CalcD8PcXn,
            Self::AbsShort => Action::AssembleWordAddressFromPrefetch,
            Self::AbsLong => Action::AssembleLongWordAddressFromPrefetch,
            _ => Action::None,
        }
    }
}

/// Post-increment for an operand of `size` through A`reg`.
///
/// Byte accesses through A7 step by two to keep the stack word-aligned.
#[must_use]
pub const fn increment_action(size: Size, reg: u8) -> Action {
    match size {
        Size::Long => Action::Increment4,
        Size::Word => Action::Increment2,
        Size::Byte if reg == 7 => Action::Increment2,
        Size::Byte => Action::Increment1,
    }
}

/// Pre-decrement for an operand of `size` through A`reg`.
#[must_use]
pub const fn decrement_action(size: Size, reg: u8) -> Action {
    match size {
        Size::Long => Action::Decrement4,
        Size::Word => Action::Decrement2,
        Size::Byte if reg == 7 => Action::Decrement2,
        Size::Byte => Action::Decrement1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_seven_splits_on_register() {
        assert_eq!(AddrMode::decode(7, 1), Some(AddrMode::AbsLong));
        assert_eq!(AddrMode::decode(7, 4), Some(AddrMode::Immediate));
        assert_eq!(AddrMode::decode(7, 5), None);
        assert_eq!(AddrMode::from_ea_field(0x003A), Some(AddrMode::PcDisp));
    }

    #[test]
    fn stack_pointer_bytes_step_by_two() {
        assert_eq!(increment_action(Size::Byte, 7), Action::Increment2);
        assert_eq!(decrement_action(Size::Byte, 7), Action::Decrement2);
        assert_eq!(increment_action(Size::Byte, 6), Action::Increment1);
        assert_eq!(decrement_action(Size::Long, 7), Action::Decrement4);
    }
}
