//! Operation tags and operand sizes.

/// Operand size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Size {
    Byte,
    #[default]
    Word,
    Long,
}

impl Size {
    /// Decode the common two-bit size field (00 = .b, 01 = .w, 10 = .l).
    #[must_use]
    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits & 3 {
            0 => Some(Size::Byte),
            1 => Some(Size::Word),
            2 => Some(Size::Long),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Long => 4,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Size::Byte => 0xFF,
            Size::Word => 0xFFFF,
            Size::Long => 0xFFFF_FFFF,
        }
    }

    #[must_use]
    pub const fn msb(self) -> u32 {
        match self {
            Size::Byte => 0x80,
            Size::Word => 0x8000,
            Size::Long => 0x8000_0000,
        }
    }

    /// Sign-extend the low bits of `value` to 32 bits.
    #[must_use]
    pub const fn sign_extend(self, value: u32) -> u32 {
        match self {
            Size::Byte => value as u8 as i8 as i32 as u32,
            Size::Word => value as u16 as i16 as i32 as u32,
            Size::Long => value,
        }
    }

    /// Replace the low `self` bits of `target` with those of `value`.
    #[must_use]
    pub const fn merge(self, target: u32, value: u32) -> u32 {
        (target & !self.mask()) | (value & self.mask())
    }
}

/// The semantic effect of an instruction, independent of addressing mode
/// and operand size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Abcd,
    Sbcd,
    Add,
    /// ADDA, and ADDQ to an address register.
    Adda,
    Sub,
    Suba,
    And,
    Or,
    Eor,
    AndiToCcr,
    AndiToSr,
    OriToCcr,
    OriToSr,
    EoriToCcr,
    EoriToSr,
    Cmp,
    Cmpa,
    Move,
    Movea,
    Moveq,
    MoveToSr,
    MoveToCcr,
    MoveFromSr,
    MoveToUsp,
    MoveFromUsp,
    MovemToMemory,
    MovemToRegisters,
    Bcc,
    Bsr,
    Dbcc,
    Scc,
    Jmp,
    Jsr,
    Rts,
    Rte,
    Rtr,
    Trap,
    Lea,
    Btst,
    Bchg,
    Bclr,
    Bset,
    Clr,
    Neg,
    Negx,
    Not,
    Tst,
    Tas,
    Swap,
    Ext,
    Exg,
    Asl,
    Asr,
    Lsl,
    Lsr,
    Rol,
    Ror,
    Roxl,
    Roxr,
    Mulu,
    Muls,
    Nop,
    Reset,
}

impl Operation {
    /// True for the shift and rotate family.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(
            self,
            Operation::Asl
                | Operation::Asr
                | Operation::Lsl
                | Operation::Lsr
                | Operation::Rol
                | Operation::Ror
                | Operation::Roxl
                | Operation::Roxr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Size;

    #[test]
    fn sign_extension() {
        assert_eq!(Size::Byte.sign_extend(0x80), 0xFFFF_FF80);
        assert_eq!(Size::Word.sign_extend(0x1_7FFF), 0x7FFF);
        assert_eq!(Size::Long.sign_extend(0x8000_0000), 0x8000_0000);
    }

    #[test]
    fn merge_keeps_upper_bits() {
        assert_eq!(Size::Byte.merge(0x1234_5678, 0xAB), 0x1234_56AB);
        assert_eq!(Size::Word.merge(0x1234_5678, 0xFFFF_0001), 0x1234_0001);
    }
}
