//! Arithmetic with flag computation.
//!
//! Every function takes the operands and the current SR and returns the
//! result together with the updated SR. Operands are masked to `size`.

use crate::flags::{C, N, V, X, Z, set_if, set_nz};
use crate::operation::{Operation, Size};

/// dst + src (ADD, ADDI, ADDQ).
#[must_use]
pub fn add(src: u32, dst: u32, size: Size, sr: u16) -> (u32, u16) {
    let msb = size.msb();
    let s = src & size.mask();
    let d = dst & size.mask();
    let result = s.wrapping_add(d) & size.mask();

    let carry = (s & d) | ((s | d) & !result);
    let overflow = (s ^ result) & (d ^ result);
    let sr = set_nz(sr, result, size);
    let sr = set_if(sr, C | X, carry & msb != 0);
    (result, set_if(sr, V, overflow & msb != 0))
}

/// dst - src (SUB, SUBI, SUBQ).
#[must_use]
pub fn sub(src: u32, dst: u32, size: Size, sr: u16) -> (u32, u16) {
    let (result, flags) = compare(src, dst, size, sr);
    (result, set_if(flags, X, flags & C != 0))
}

/// dst - src with X untouched (CMP, CMPI, CMPM).
#[must_use]
pub fn compare(src: u32, dst: u32, size: Size, sr: u16) -> (u32, u16) {
    let msb = size.msb();
    let s = src & size.mask();
    let d = dst & size.mask();
    let result = d.wrapping_sub(s) & size.mask();

    let borrow = (!d & s) | ((!d | s) & result);
    let overflow = (s ^ d) & (result ^ d);
    let sr = set_nz(sr, result, size);
    let sr = set_if(sr, C, borrow & msb != 0);
    (result, set_if(sr, V, overflow & msb != 0))
}

/// dst - src - X. Z is only ever cleared, so multi-precision chains test
/// the whole value.
#[must_use]
pub fn subx(src: u32, dst: u32, size: Size, sr: u16) -> (u32, u16) {
    let msb = size.msb();
    let x_in = u32::from(sr & X != 0);
    let s = src & size.mask();
    let d = dst & size.mask();
    let result = d.wrapping_sub(s).wrapping_sub(x_in) & size.mask();

    let borrow = (!d & s) | ((!d | s) & result);
    let overflow = (s ^ d) & (result ^ d);
    let mut sr = set_if(sr, N, result & msb != 0);
    if result != 0 {
        sr &= !Z;
    }
    let sr = set_if(sr, C | X, borrow & msb != 0);
    (result, set_if(sr, V, overflow & msb != 0))
}

/// 0 - dst.
#[must_use]
pub fn neg(dst: u32, size: Size, sr: u16) -> (u32, u16) {
    sub(dst, 0, size, sr)
}

/// 0 - dst - X.
#[must_use]
pub fn negx(dst: u32, size: Size, sr: u16) -> (u32, u16) {
    subx(dst, 0, size, sr)
}

/// Packed BCD dst + src + X.
///
/// V and N follow the silicon: V is set when the decimal correction turns
/// bit 7 on, N is bit 7 of the result.
#[must_use]
pub fn abcd(src: u32, dst: u32, sr: u16) -> (u32, u16) {
    let x_in = u32::from(sr & X != 0);
    let binary = (src & 0x0F) + (dst & 0x0F) + x_in;
    let mut result = binary;
    if result > 9 {
        result += 6;
    }
    result += (src & 0xF0) + (dst & 0xF0);
    let carry = result > 0x99;
    if carry {
        result -= 0xA0;
    }
    finish_bcd(binary, result, carry, sr)
}

/// Packed BCD dst - src - X.
#[must_use]
pub fn sbcd(src: u32, dst: u32, sr: u16) -> (u32, u16) {
    let x_in = u32::from(sr & X != 0);
    let binary = (dst & 0x0F).wrapping_sub(src & 0x0F).wrapping_sub(x_in);
    let mut result = binary;
    if result > 9 {
        result = result.wrapping_sub(6);
    }
    result = result.wrapping_add(dst & 0xF0).wrapping_sub(src & 0xF0);
    let carry = result > 0x99;
    if carry {
        result = result.wrapping_add(0xA0);
    }
    finish_bcd(binary, result, carry, sr)
}

fn finish_bcd(binary: u32, result: u32, carry: bool, sr: u16) -> (u32, u16) {
    let overflow = !binary & result & 0x80 != 0;
    let result = result & 0xFF;
    let mut sr = set_if(sr, C | X, carry);
    sr = set_if(sr, V, overflow);
    sr = set_if(sr, N, result & 0x80 != 0);
    if result != 0 {
        sr &= !Z;
    }
    (result, sr)
}

/// Shift or rotate `value` by `count` bits.
///
/// A count of zero clears C (or copies X into it for ROXd) and leaves the
/// operand alone. X follows C for every kind but ROd. V is only ever set by
/// ASL, when the sign bit changes at any point during the shift.
#[must_use]
pub fn shift(operation: Operation, value: u32, count: u32, size: Size, sr: u16) -> (u32, u16) {
    let bits = size.bits();
    let mask = size.mask();
    let value = value & mask;
    let x_set = sr & X != 0;

    if count == 0 {
        let carry = matches!(operation, Operation::Roxl | Operation::Roxr) && x_set;
        let sr = set_if(set_nz(sr, value, size) & !V, C, carry);
        return (value, sr);
    }

    let (result, carry) = match operation {
        Operation::Asl | Operation::Lsl => {
            let wide = u64::from(value) << count.min(bits + 1);
            let carry = count <= bits && (wide >> bits) & 1 != 0;
            ((wide as u32) & mask, carry)
        }
        Operation::Lsr => {
            let carry = count <= bits && (value >> (count - 1)) & 1 != 0;
            let result = if count >= bits { 0 } else { value >> count };
            (result, carry)
        }
        Operation::Asr => {
            let signed = i64::from(size.sign_extend(value) as i32);
            let shift = count.min(bits);
            let carry = (signed >> (shift - 1)) & 1 != 0;
            (((signed >> shift) as u32) & mask, carry)
        }
        Operation::Rol => {
            let turn = count % bits;
            let result = if turn == 0 {
                value
            } else {
                ((value << turn) | (value >> (bits - turn))) & mask
            };
            (result, result & 1 != 0)
        }
        Operation::Ror => {
            let turn = count % bits;
            let result = if turn == 0 {
                value
            } else {
                ((value >> turn) | (value << (bits - turn))) & mask
            };
            (result, result & size.msb() != 0)
        }
        Operation::Roxl | Operation::Roxr => {
            let width = bits + 1;
            let turn = count % width;
            let extended = (u64::from(x_set) << bits) | u64::from(value);
            let all = (1u64 << width) - 1;
            let rotated = match (turn, operation) {
                (0, _) => extended,
                (_, Operation::Roxl) => ((extended << turn) | (extended >> (width - turn))) & all,
                _ => ((extended >> turn) | (extended << (width - turn))) & all,
            };
            ((rotated as u32) & mask, (rotated >> bits) & 1 != 0)
        }
        _ => (value, false),
    };

    let overflow = operation == Operation::Asl && sign_changes(value, count, size);
    let mut sr = set_nz(sr, result, size);
    sr = set_if(sr, C, carry);
    sr = set_if(sr, V, overflow);
    if !matches!(operation, Operation::Rol | Operation::Ror) {
        sr = set_if(sr, X, carry);
    }
    (result, sr)
}

/// True if the top `count + 1` bits of `value` are not all equal.
fn sign_changes(value: u32, count: u32, size: Size) -> bool {
    let bits = size.bits();
    if count >= bits - 1 {
        return value & size.mask() != 0 && value & size.mask() != size.mask();
    }
    let top = (size.mask() << (bits - count - 1)) & size.mask();
    let masked = value & top;
    masked != 0 && masked != top
}

/// MULU: 38 + 2n cycles, n the number of set bits in the source.
#[must_use]
pub const fn mulu_cycles(source: u16) -> u16 {
    38 + 2 * source.count_ones() as u16
}

/// MULS: 38 + 2n cycles, n the number of 01 or 10 pairs in the source
/// with a zero appended below it.
#[must_use]
pub const fn muls_cycles(source: u16) -> u16 {
    let pattern = (source as u32) << 1;
    let transitions = (pattern ^ (pattern >> 1)) & 0xFFFF;
    38 + 2 * transitions.count_ones() as u16
}
