//! 68000 bus interface.
//!
//! The processor talks to the outside world one bus step at a time. Every
//! step is offered to the [`BusHandler`], including idle steps that move no
//! data, so that a machine can keep its own clocks in lockstep with the CPU.

use bitflags::bitflags;
use emu_core::HalfCycles;

bitflags! {
    /// Signals asserted during one bus step.
    ///
    /// A step with neither `SELECT_BYTE` nor `SELECT_WORD` transfers no data.
    /// `READ` clear on a selecting step means a write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BusOperation: u8 {
        /// Address strobe for a new address.
        const NEW_ADDRESS = 1 << 0;
        /// Address held over from the previous step.
        const SAME_ADDRESS = 1 << 1;
        /// Read when set, write when clear.
        const READ = 1 << 2;
        /// Byte transfer; the byte travels in bits 0-7 of the value.
        const SELECT_BYTE = 1 << 3;
        /// Word transfer.
        const SELECT_WORD = 1 << 4;
        /// Program space (instruction stream and vectors).
        const IS_PROGRAM = 1 << 5;
        /// RESET output asserted.
        const RESET = 1 << 6;
        /// Interrupt acknowledge cycle; the address carries the level.
        const INTERRUPT_ACKNOWLEDGE = 1 << 7;
    }
}

impl BusOperation {
    /// True if this step moves data in either direction.
    #[must_use]
    pub const fn transfers_data(self) -> bool {
        self.intersects(Self::SELECT_BYTE.union(Self::SELECT_WORD))
    }

    #[must_use]
    pub const fn is_read(self) -> bool {
        self.transfers_data() && self.contains(Self::READ)
    }

    #[must_use]
    pub const fn is_write(self) -> bool {
        self.transfers_data() && !self.contains(Self::READ)
    }
}

/// The machine side of the bus.
pub trait BusHandler {
    /// Carry out one bus step.
    ///
    /// For reads, store the fetched word (or byte, in bits 0-7) into `value`.
    /// For writes, `value` holds the outgoing data. During an interrupt
    /// acknowledge, `value` arrives holding the autovector number; replace it
    /// to supply a vector.
    ///
    /// Returns the number of wait half-cycles to insert after the step.
    fn perform_bus_operation(
        &mut self,
        operation: BusOperation,
        address: u32,
        value: &mut u16,
    ) -> HalfCycles;
}

#[cfg(test)]
mod tests {
    use super::BusOperation;

    #[test]
    fn selecting_step_without_read_is_a_write() {
        let op = BusOperation::SAME_ADDRESS | BusOperation::SELECT_WORD;
        assert!(op.is_write());
        assert!(!op.is_read());
    }

    #[test]
    fn address_phase_moves_no_data() {
        let op = BusOperation::NEW_ADDRESS | BusOperation::READ;
        assert!(!op.transfers_data());
        assert!(!op.is_read());
    }
}
