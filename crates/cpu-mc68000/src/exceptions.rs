//! Reset, trap and interrupt entry.
//!
//! Every exception pushes the same three-word frame: PC low at SP-2, SR at
//! SP-6 and PC high at SP-4, written in that order. The addresses are worked
//! out here and the shared programs do the bus work.

use log::debug;

use crate::flags::{INTERRUPT_MASK, S, T};
use crate::processor::{ExecutionState, Processor};

impl Processor {
    /// Abandon whatever is in progress and start the reset sequence: SSP from
    /// address 0, PC from address 4, then two prefetches.
    pub fn reset(&mut self) {
        debug!("68000 reset");
        self.registers.set_status(S | INTERRUPT_MASK);
        self.effective_address[0] = 0;
        self.flexible_length = 0;
        self.nmi_edge = false;
        self.state = ExecutionState::Reset;
        self.step = self.tables.programs().reset;
    }

    /// Level to take at this instruction boundary, if any.
    pub(crate) fn pending_interrupt(&self) -> Option<u8> {
        let level = self.interrupt_level;
        let nmi = level == 7 && self.nmi_edge;
        (level > self.registers.interrupt_mask() || nmi).then_some(level)
    }

    /// Enter supervisor mode and lay out the exception frame for a push of
    /// `return_address` and the current SR.
    fn enter_exception(&mut self, return_address: u32) {
        self.bus_data[1] = u32::from(self.registers.status());
        self.registers.set_supervisor(true);
        self.registers.set_status(self.registers.status() & !T);
        self.registers.pc = return_address;

        let sp = self.registers.a[7];
        self.precomputed = [sp.wrapping_sub(2), sp.wrapping_sub(6), sp.wrapping_sub(4)];
        self.registers.a[7] = sp.wrapping_sub(6);
        self.state = ExecutionState::TrapPending;
    }

    /// Start the sequence for exception `vector`, stacking `return_address`.
    pub(crate) fn begin_trap(&mut self, vector: u8, return_address: u32) {
        debug!(
            "68000 exception vector {vector} at {:06X} (opcode {:04X})",
            return_address, self.opcode
        );
        self.enter_exception(return_address);
        self.effective_address[0] = u32::from(vector) << 2;
        self.step = self.tables.programs().trap;
    }

    /// Start an interrupt acknowledge sequence for `level`. The vector is
    /// the autovector unless the bus supplies another during acknowledge.
    pub(crate) fn begin_interrupt(&mut self, level: u8) {
        debug!("68000 interrupt level {level} at {:06X}", self.registers.pc.wrapping_sub(4));
        if level == 7 {
            self.nmi_edge = false;
        }
        self.enter_exception(self.registers.pc.wrapping_sub(4));
        self.registers.set_interrupt_mask(level);
        self.acknowledged_level = level;
        self.interrupt_vector = 24 + u16::from(level);
        self.step = self.tables.programs().interrupt;
    }
}
