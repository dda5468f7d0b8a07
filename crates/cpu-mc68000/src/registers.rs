//! The programmer-visible register file.
//!
//! - D0-D7: data registers
//! - A0-A7: address registers, A7 being the active stack pointer
//! - USP / SSP: the two stack-pointer banks behind A7
//! - PC, SR
//!
//! A7 always holds the live stack pointer. The bank for the current mode is
//! only written back when the mode changes, so read the banks through
//! [`Registers::usp`] and [`Registers::ssp`].

use crate::flags::{CCR_MASK, INTERRUPT_MASK, S, SR_MASK, T};

const USER: usize = 0;
const SUPERVISOR: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub d: [u32; 8],
    pub a: [u32; 8],
    pub pc: u32,
    stack_pointers: [u32; 2],
    sr: u16,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on state: supervisor mode, interrupt mask 7.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            d: [0; 8],
            a: [0; 8],
            pc: 0,
            stack_pointers: [0; 2],
            sr: S | INTERRUPT_MASK,
        }
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.sr
    }

    /// Load the whole SR, switching stack banks if S changes.
    pub fn set_status(&mut self, value: u16) {
        let value = value & SR_MASK;
        self.set_supervisor(value & S != 0);
        self.sr = value;
    }

    #[must_use]
    pub const fn ccr(&self) -> u8 {
        (self.sr & CCR_MASK) as u8
    }

    pub fn set_ccr(&mut self, value: u8) {
        self.sr = (self.sr & !CCR_MASK) | (u16::from(value) & CCR_MASK);
    }

    #[must_use]
    pub const fn is_supervisor(&self) -> bool {
        self.sr & S != 0
    }

    #[must_use]
    pub const fn is_trace(&self) -> bool {
        self.sr & T != 0
    }

    /// Enter or leave supervisor mode. A7 is written back to the outgoing
    /// bank and reloaded from the incoming one.
    pub fn set_supervisor(&mut self, supervisor: bool) {
        if supervisor == self.is_supervisor() {
            return;
        }
        self.write_back_stack_pointer();
        if supervisor {
            self.sr |= S;
        } else {
            self.sr &= !S;
        }
        self.a[7] = self.stack_pointers[self.bank()];
    }

    /// Copy A7 into the bank for the current mode.
    pub fn write_back_stack_pointer(&mut self) {
        self.stack_pointers[self.bank()] = self.a[7];
    }

    #[must_use]
    pub const fn interrupt_mask(&self) -> u8 {
        ((self.sr & INTERRUPT_MASK) >> 8) as u8
    }

    pub fn set_interrupt_mask(&mut self, level: u8) {
        self.sr = (self.sr & !INTERRUPT_MASK) | (u16::from(level & 7) << 8);
    }

    /// The user stack pointer, live or banked.
    #[must_use]
    pub const fn usp(&self) -> u32 {
        if self.is_supervisor() {
            self.stack_pointers[USER]
        } else {
            self.a[7]
        }
    }

    pub fn set_usp(&mut self, value: u32) {
        if self.is_supervisor() {
            self.stack_pointers[USER] = value;
        } else {
            self.a[7] = value;
        }
    }

    /// The supervisor stack pointer, live or banked.
    #[must_use]
    pub const fn ssp(&self) -> u32 {
        if self.is_supervisor() {
            self.a[7]
        } else {
            self.stack_pointers[SUPERVISOR]
        }
    }

    pub fn set_ssp(&mut self, value: u32) {
        if self.is_supervisor() {
            self.a[7] = value;
        } else {
            self.stack_pointers[SUPERVISOR] = value;
        }
    }

    const fn bank(&self) -> usize {
        if self.is_supervisor() { SUPERVISOR } else { USER }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trip_preserves_both_banks() {
        let mut regs = Registers::new();
        regs.a[7] = 0x1000;
        regs.set_usp(0x2000);

        regs.set_supervisor(false);
        assert_eq!(regs.a[7], 0x2000);
        regs.a[7] = 0x1FFC;

        regs.set_supervisor(true);
        assert_eq!(regs.a[7], 0x1000);
        assert_eq!(regs.usp(), 0x1FFC);
        assert_eq!(regs.ssp(), 0x1000);
    }

    #[test]
    fn banked_supervisor_stack_can_be_set_from_user_mode() {
        let mut regs = Registers::new();
        regs.set_supervisor(false);
        regs.a[7] = 0x2000;
        regs.set_ssp(0x8000);
        assert_eq!(regs.a[7], 0x2000);

        regs.set_supervisor(true);
        assert_eq!(regs.a[7], 0x8000);
        regs.set_ssp(0x7FF0);
        assert_eq!(regs.a[7], 0x7FF0);
        assert_eq!(regs.usp(), 0x2000);
    }

    #[test]
    fn status_load_masks_reserved_bits_and_switches_bank() {
        let mut regs = Registers::new();
        regs.a[7] = 0x400;
        regs.set_status(0x00FF);
        assert_eq!(regs.status(), 0x001F);
        assert!(!regs.is_supervisor());
        assert_eq!(regs.ssp(), 0x400);
    }

    #[test]
    fn ccr_leaves_system_byte_alone() {
        let mut regs = Registers::new();
        regs.set_ccr(0xFF);
        assert_eq!(regs.status(), 0x271F);
        assert_eq!(regs.interrupt_mask(), 7);
    }
}
