//! Register-list walk for MOVEM.

use crate::registers::Registers;

/// Position within a MOVEM transfer, one bus word at a time.
///
/// Registers are numbered 0-15 for D0-D7 then A0-A7. In predecrement mode
/// the mask is bit-reversed and the list is walked from A7 down to D0, low
/// word first, towards lower addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MovemCursor {
    order: [u8; 16],
    count: usize,
    long: bool,
    predecrement: bool,
    start: u32,
    position: usize,
    pub(crate) address: u32,
}

impl MovemCursor {
    pub(crate) fn new(mask: u16, start: u32, long: bool, predecrement: bool) -> Self {
        let mut order = [0; 16];
        let mut count = 0;
        for bit in 0..16u8 {
            if mask & (1 << bit) != 0 {
                order[count] = if predecrement { 15 - bit } else { bit };
                count += 1;
            }
        }
        Self {
            order,
            count,
            long,
            predecrement,
            start,
            position: 0,
            address: if predecrement {
                start.wrapping_sub(2)
            } else {
                start
            },
        }
    }

    /// Bus words to transfer, not counting the extra read.
    pub(crate) const fn words(&self) -> usize {
        if self.long { self.count * 2 } else { self.count }
    }

    /// Address register value once every word has moved.
    pub(crate) const fn final_address(&self) -> u32 {
        let span = (self.words() * 2) as u32;
        if self.predecrement {
            self.start.wrapping_sub(span)
        } else {
            self.start.wrapping_add(span)
        }
    }

    /// Register number and whether the current word is its high half.
    fn current(&self) -> Option<(usize, bool)> {
        if self.position >= self.words() {
            return None;
        }
        if !self.long {
            return Some((usize::from(self.order[self.position]), false));
        }
        let register = usize::from(self.order[self.position / 2]);
        let first = self.position % 2 == 0;
        Some((register, first != self.predecrement))
    }

    /// Word to write for the current position.
    pub(crate) fn value(&self, registers: &Registers) -> u16 {
        let Some((register, high)) = self.current() else {
            return 0;
        };
        let value = read(registers, register);
        if high { (value >> 16) as u16 } else { value as u16 }
    }

    /// Store a word read for the current position. Word loads are
    /// sign-extended to the whole register; the trailing extra read is
    /// dropped.
    pub(crate) fn store(&self, registers: &mut Registers, value: u16) {
        let Some((register, high)) = self.current() else {
            return;
        };
        let old = read(registers, register);
        let new = match (self.long, high) {
            (false, _) => value as i16 as i32 as u32,
            (true, true) => (old & 0x0000_FFFF) | (u32::from(value) << 16),
            (true, false) => (old & 0xFFFF_0000) | u32::from(value),
        };
        write(registers, register, new);
    }

    pub(crate) fn advance(&mut self) {
        self.position += 1;
        self.address = if self.predecrement {
            self.address.wrapping_sub(2)
        } else {
            self.address.wrapping_add(2)
        };
    }
}

fn read(registers: &Registers, index: usize) -> u32 {
    if index < 8 {
        registers.d[index]
    } else {
        registers.a[index - 8]
    }
}

fn write(registers: &mut Registers, index: usize, value: u32) {
    if index < 8 {
        registers.d[index] = value;
    } else {
        registers.a[index - 8] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predecrement_walks_a7_to_d0_low_word_first() {
        let mut regs = Registers::new();
        regs.d[0] = 0x1111_2222;
        regs.a[7] = 0x3333_4444;
        // Reversed mask: bit 0 is A7, bit 15 is D0.
        let mut cursor = MovemCursor::new(0x8001, 0x1000, true, true);
        assert_eq!(cursor.words(), 4);

        let mut written = Vec::new();
        for _ in 0..cursor.words() {
            written.push((cursor.address, cursor.value(&regs)));
            cursor.advance();
        }
        assert_eq!(
            written,
            [(0x0FFE, 0x4444), (0x0FFC, 0x3333), (0x0FFA, 0x2222), (0x0FF8, 0x1111)]
        );
        assert_eq!(cursor.final_address(), 0x0FF8);
    }

    #[test]
    fn word_loads_sign_extend_and_overflow_read_is_dropped() {
        let mut regs = Registers::new();
        let mut cursor = MovemCursor::new(0x0102, 0x2000, false, false);
        cursor.store(&mut regs, 0x8000);
        cursor.advance();
        cursor.store(&mut regs, 0x0005);
        cursor.advance();
        cursor.store(&mut regs, 0xFFFF);
        assert_eq!(regs.d[1], 0xFFFF_8000);
        assert_eq!(regs.a[0], 5);
        assert_eq!(cursor.final_address(), 0x2004);
    }
}
