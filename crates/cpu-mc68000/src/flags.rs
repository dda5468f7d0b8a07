//! Status register layout and condition-code helpers.
//!
//! - Bits 0-4: condition codes C, V, Z, N, X
//! - Bits 8-10: interrupt mask
//! - Bit 13: supervisor
//! - Bit 15: trace

use crate::operation::Size;

/// Carry flag.
pub const C: u16 = 0x0001;
/// Overflow flag.
pub const V: u16 = 0x0002;
/// Zero flag.
pub const Z: u16 = 0x0004;
/// Negative flag.
pub const N: u16 = 0x0008;
/// Extend flag.
pub const X: u16 = 0x0010;

/// Interrupt mask, bits 8-10.
pub const INTERRUPT_MASK: u16 = 0x0700;
/// Supervisor mode flag.
pub const S: u16 = 0x2000;
/// Trace mode flag.
pub const T: u16 = 0x8000;

/// Condition codes only.
pub const CCR_MASK: u16 = 0x001F;
/// Every implemented SR bit.
pub const SR_MASK: u16 = 0xA71F;

/// Set `flag` if `condition` holds, clear it otherwise.
#[must_use]
pub const fn set_if(sr: u16, flag: u16, condition: bool) -> u16 {
    if condition { sr | flag } else { sr & !flag }
}

/// Replace N and Z to describe `value` at `size`.
#[must_use]
pub const fn set_nz(sr: u16, value: u32, size: Size) -> u16 {
    let sr = set_if(sr, Z, value & size.mask() == 0);
    set_if(sr, N, value & size.msb() != 0)
}

/// N and Z from `value`, V and C cleared, X untouched. The flag result of
/// MOVE and the logical operations.
#[must_use]
pub const fn logical(sr: u16, value: u32, size: Size) -> u16 {
    set_nz(sr & !(V | C), value, size)
}

/// Evaluate condition code `cc` (0-15) against `sr`.
#[must_use]
pub const fn condition(sr: u16, cc: u8) -> bool {
    let c = sr & C != 0;
    let v = sr & V != 0;
    let z = sr & Z != 0;
    let n = sr & N != 0;
    match cc & 0x0F {
        0x0 => true,       // T
        0x1 => false,      // F
        0x2 => !c && !z,   // HI
        0x3 => c || z,     // LS
        0x4 => !c,         // CC
        0x5 => c,          // CS
        0x6 => !z,         // NE
        0x7 => z,          // EQ
        0x8 => !v,         // VC
        0x9 => v,          // VS
        0xA => !n,         // PL
        0xB => n,          // MI
        0xC => n == v,     // GE
        0xD => n != v,     // LT
        0xE => !z && n == v, // GT
        _ => z || n != v,  // LE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nz_follows_operand_size() {
        assert_eq!(set_nz(0, 0x0100, Size::Byte), Z);
        assert_eq!(set_nz(0, 0x8000, Size::Word), N);
        assert_eq!(set_nz(Z | N, 1, Size::Long), 0);
    }

    #[test]
    fn logical_keeps_extend() {
        assert_eq!(logical(X | V | C, 0, Size::Word), X | Z);
    }

    #[test]
    fn signed_conditions() {
        assert!(condition(N | V, 0xC));
        assert!(condition(N, 0xD));
        assert!(!condition(Z, 0xE));
        assert!(condition(Z, 0xF));
        assert!(condition(0, 0x2));
        assert!(!condition(C, 0x2));
    }
}
