//! The step interpreter.
//!
//! `run_for` walks the compiled tables one bus step at a time. Each step is
//! offered to the bus, its data slot is loaded or stored, and its side
//! effect applied. Reaching a program's sentinel moves on to the next
//! micro-op, or to the next instruction once the chain is done.

use emu_core::HalfCycles;
use log::trace;

use crate::bus::{BusHandler, BusOperation};
use crate::microcode::{Action, Target};
use crate::operation::Size;
use crate::processor::{ExecutionState, Processor};
use crate::program::{AddressSource, BusStep, DataSlot, Half, StepAction, StepLength};

impl Processor {
    /// Run for at least `duration`.
    ///
    /// Steps are never split, so a call may overrun. The overrun is carried
    /// and taken off the next call.
    pub fn run_for<B: BusHandler>(&mut self, bus: &mut B, duration: HalfCycles) {
        if duration <= self.debt {
            self.debt = self.debt - duration;
            return;
        }
        let target = duration - self.debt;
        let mut spent = HalfCycles::ZERO;
        while spent < target {
            spent += self.run_step(bus);
        }
        self.debt = spent - target;
    }

    /// Run to the start of the next instruction and return the half-cycles
    /// that took. Anything left over from `run_for` is dropped.
    pub fn run_instruction<B: BusHandler>(&mut self, bus: &mut B) -> HalfCycles {
        self.debt = HalfCycles::ZERO;
        let mut spent = self.run_step(bus);
        while !self.at_instruction_boundary() {
            spent += self.run_step(bus);
        }
        spent
    }

    /// Run the next non-sentinel step, following sentinels as needed.
    fn run_step<B: BusHandler>(&mut self, bus: &mut B) -> HalfCycles {
        loop {
            let step = self.tables.steps()[self.step];
            if step.is_terminal() {
                self.schedule_next_program();
                continue;
            }
            let spent = self.perform_step(bus, step);
            self.step += 1;
            self.cycles += spent;
            self.run_bus_free_micro_ops();
            return spent;
        }
    }

    /// Once a program has ended, fire the micro-ops that follow it without
    /// bus activity of their own. Stops on the chain's terminal op, so the
    /// next instruction is only decoded by the next step.
    fn run_bus_free_micro_ops(&mut self) {
        while self.state == ExecutionState::Normal
            && self.tables.steps()[self.step].is_terminal()
        {
            let ops = self.tables.micro_ops();
            if ops[self.micro_op].is_terminal() {
                return;
            }
            let next = ops[self.micro_op + 1];
            let bus_free = next
                .bus_program
                .is_none_or(|program| self.tables.steps()[program].is_terminal());
            if !bus_free {
                return;
            }
            self.micro_op += 1;
            self.enter_micro_op();
        }
    }

    fn perform_step<B: BusHandler>(&mut self, bus: &mut B, step: BusStep) -> HalfCycles {
        let length = match step.length {
            StepLength::Fixed(length) => length,
            StepLength::Flexible => std::mem::take(&mut self.flexible_length),
        };

        let address = self.resolve_address(step.address);
        let mut value = self.load_slot(step.value);
        let wait = bus.perform_bus_operation(step.operation, address, &mut value);

        if step.operation.transfers_data() {
            if self.config.trace_bus {
                let direction = if step.operation.is_read() { "read" } else { "write" };
                trace!("68000 {direction} {address:06X} {value:04X} ({:?})", step.operation);
            }
            if step.operation.is_read() {
                let byte = step.operation.contains(BusOperation::SELECT_BYTE);
                self.store_slot(step.value, value, byte);
            }
        }
        self.apply_step_action(step.action);

        HalfCycles::new(u64::from(length)) + wait
    }

    fn resolve_address(&self, source: AddressSource) -> u32 {
        match source {
            AddressSource::None => 0,
            AddressSource::ProgramCounter => self.registers.pc,
            AddressSource::EffectiveAddress(side) => self.effective_address[usize::from(side)],
            AddressSource::AddressRegister(reg) => self.registers.a[usize::from(reg)],
            AddressSource::Precomputed(index) => self.precomputed[usize::from(index)],
            AddressSource::DbccFalseAddress => self.dbcc_false_address,
            AddressSource::Movem => self.movem.address,
            AddressSource::InterruptLevel => 0x00FF_FFF0 | (u32::from(self.acknowledged_level) << 1),
        }
    }

    fn load_slot(&self, slot: DataSlot) -> u16 {
        match slot {
            DataSlot::None => 0,
            DataSlot::SourceBusData(half) => word(self.bus_data[0], half),
            DataSlot::DestinationBusData(half) => word(self.bus_data[1], half),
            DataSlot::PrefetchLow => self.prefetch as u16,
            DataSlot::StackPointer(half) => word(self.registers.a[7], half),
            DataSlot::ProgramCounter(half) => word(self.registers.pc, half),
            DataSlot::Movem => self.movem.value(&self.registers),
            DataSlot::InterruptVector => self.interrupt_vector,
        }
    }

    /// Byte reads only replace the low byte of the slot.
    fn store_slot(&mut self, slot: DataSlot, value: u16, byte: bool) {
        let merge = |old: u16| {
            if byte {
                (old & 0xFF00) | (value & 0x00FF)
            } else {
                value
            }
        };
        match slot {
            DataSlot::None => {}
            DataSlot::SourceBusData(half) => {
                let latch = &mut self.bus_data[0];
                *latch = with_word(*latch, half, merge(word(*latch, half)));
            }
            DataSlot::DestinationBusData(half) => {
                let latch = &mut self.bus_data[1];
                *latch = with_word(*latch, half, merge(word(*latch, half)));
            }
            DataSlot::PrefetchLow => {
                let low = merge(self.prefetch as u16);
                self.prefetch = with_word(self.prefetch, Half::Low, low);
            }
            DataSlot::StackPointer(half) => {
                let sp = self.registers.a[7];
                self.registers.a[7] = with_word(sp, half, merge(word(sp, half)));
            }
            DataSlot::ProgramCounter(half) => {
                let pc = self.registers.pc;
                self.registers.pc = with_word(pc, half, merge(word(pc, half)));
            }
            DataSlot::Movem => self.movem.store(&mut self.registers, value),
            DataSlot::InterruptVector => self.interrupt_vector = merge(self.interrupt_vector),
        }
    }

    fn apply_step_action(&mut self, action: StepAction) {
        match action {
            StepAction::None | StepAction::ScheduleNextProgram => {}
            StepAction::AdvancePrefetch => {
                self.prefetch = (self.prefetch << 16) | (self.prefetch & 0xFFFF);
            }
            StepAction::IncrementProgramCounter => {
                self.registers.pc = self.registers.pc.wrapping_add(2);
            }
            StepAction::IncrementEffectiveAddress(side) => {
                let ea = &mut self.effective_address[usize::from(side)];
                *ea = ea.wrapping_add(2);
            }
            StepAction::DecrementEffectiveAddress(side) => {
                let ea = &mut self.effective_address[usize::from(side)];
                *ea = ea.wrapping_sub(2);
            }
            StepAction::AdvanceMovem => self.movem.advance(),
            StepAction::VectorFromAcknowledge => {
                self.effective_address[0] = u32::from(self.interrupt_vector & 0xFF) << 2;
            }
        }
    }

    /// The current program has ended.
    fn schedule_next_program(&mut self) {
        match self.state {
            ExecutionState::Reset | ExecutionState::TrapPending => {
                self.state = ExecutionState::Normal;
                self.begin_instruction();
            }
            ExecutionState::Normal => {
                if self.tables.micro_ops()[self.micro_op].is_terminal() {
                    self.begin_instruction();
                    return;
                }
                self.micro_op += 1;
                self.enter_micro_op();
            }
        }
    }

    /// Fire the current micro-op's action and start its program. A terminal
    /// op ends the instruction instead.
    pub(crate) fn enter_micro_op(&mut self) {
        let op = self.tables.micro_ops()[self.micro_op];
        let Some(program) = op.bus_program else {
            self.step = self.tables.programs().empty;
            return;
        };
        let substitute = self.perform_action(op.action, op.target);
        // TRAP has already pointed `step` at the exception sequence.
        if self.state == ExecutionState::Normal {
            self.step = substitute.unwrap_or(program);
        }
    }

    /// Decode the opcode in the high prefetch word and enter its chain, or
    /// take a pending interrupt or an illegal-instruction trap instead.
    pub(crate) fn begin_instruction(&mut self) {
        if let Some(level) = self.pending_interrupt() {
            self.begin_interrupt(level);
            return;
        }

        let opcode = (self.prefetch >> 16) as u16;
        self.opcode = opcode;
        let return_address = self.registers.pc.wrapping_sub(4);

        let Some(&instruction) = self.tables.instruction(opcode) else {
            let vector = match opcode >> 12 {
                0xA => 10,
                0xF => 11,
                _ => 4,
            };
            self.begin_trap(vector, return_address);
            return;
        };
        if instruction.requires_supervisor && !self.registers.is_supervisor() {
            self.begin_trap(8, return_address);
            return;
        }

        self.instruction = instruction;
        self.micro_op = instruction.micro_ops;
        self.enter_micro_op();
    }

    /// Carry out a micro-op action. Returns a program to run in place of the
    /// op's own.
    fn perform_action(&mut self, action: Action, target: Target) -> Option<usize> {
        match action {
            Action::None => {}
            Action::PerformOperation => return self.perform_operation(),

            Action::CalcD16Pc => {
                let base = self.registers.pc.wrapping_sub(2);
                let displacement = Size::Word.sign_extend(self.prefetch);
                self.set_effective_address(target, |_| base.wrapping_add(displacement));
            }
            Action::CalcD8PcXn => {
                let base = self.registers.pc.wrapping_sub(2);
                let offset = self.brief_extension_offset();
                self.set_effective_address(target, |_| base.wrapping_add(offset));
            }
            Action::CalcD16An => {
                let displacement = Size::Word.sign_extend(self.prefetch);
                self.set_effective_address(target, |base| base.wrapping_add(displacement));
            }
            Action::CalcD8AnXn => {
                let offset = self.brief_extension_offset();
                self.set_effective_address(target, |base| base.wrapping_add(offset));
            }
            Action::AssembleWordAddressFromPrefetch => {
                let address = Size::Word.sign_extend(self.prefetch);
                self.set_effective_address(target, |_| address);
            }
            Action::AssembleLongWordAddressFromPrefetch => {
                let address = self.prefetch;
                self.set_effective_address(target, |_| address);
            }
            Action::AssembleWordDataFromPrefetch => {
                for side in target.sides() {
                    self.bus_data[side] = self.prefetch & 0xFFFF;
                }
            }
            Action::AssembleLongWordDataFromPrefetch => {
                for side in target.sides() {
                    self.bus_data[side] = self.prefetch;
                }
            }
            Action::CopyToEffectiveAddress => self.set_effective_address(target, |base| base),

            Action::Increment1 => self.adjust_address_registers(target, 1),
            Action::Increment2 => self.adjust_address_registers(target, 2),
            Action::Increment4 => self.adjust_address_registers(target, 4),
            Action::Decrement1 => self.adjust_address_registers(target, -1),
            Action::Decrement2 => self.adjust_address_registers(target, -2),
            Action::Decrement4 => self.adjust_address_registers(target, -4),

            Action::PrepareJsr => {
                // (An) has fetched one word fewer than the other modes.
                let mode = (self.opcode >> 3) & 7;
                let pc = self.registers.pc;
                let return_address = if mode == 2 { pc.wrapping_sub(2) } else { pc };
                self.push_return_address(return_address);
            }
            Action::PrepareBsr => {
                let pc = self.registers.pc;
                let return_address = if self.opcode & 0xFF == 0 {
                    pc
                } else {
                    pc.wrapping_sub(2)
                };
                self.push_return_address(return_address);
            }
            Action::PrepareRts => {
                self.effective_address[0] = self.registers.a[7];
                self.registers.a[7] = self.registers.a[7].wrapping_add(4);
            }
            Action::PrepareRteRtr => {
                let sp = self.registers.a[7];
                self.precomputed = [sp.wrapping_add(2), sp, sp.wrapping_add(4)];
                self.registers.a[7] = sp.wrapping_add(6);
            }

            Action::CopyNextWord => {
                for side in target.sides() {
                    self.bus_data[side] = self.prefetch & 0xFFFF;
                }
            }
            Action::MovemToMemoryComplete | Action::MovemToRegistersComplete => {
                let predecrement = action == Action::MovemToMemoryComplete;
                let mode = (self.opcode >> 3) & 7;
                if (predecrement && mode == 4) || (!predecrement && mode == 3) {
                    let reg = usize::from(self.instruction.destination_register);
                    self.registers.a[reg] = self.movem.final_address();
                }
            }
        }
        None
    }

    /// Set the effective-address latch of each selected side from that
    /// side's address register.
    fn set_effective_address(&mut self, target: Target, address: impl Fn(u32) -> u32) {
        for side in target.sides() {
            let base = self.registers.a[self.side_register(side)];
            self.effective_address[side] = address(base);
        }
    }

    fn adjust_address_registers(&mut self, target: Target, delta: i32) {
        for side in target.sides() {
            let reg = self.side_register(side);
            self.registers.a[reg] = self.registers.a[reg].wrapping_add_signed(delta);
        }
    }

    fn side_register(&self, side: usize) -> usize {
        let reg = if side == 0 {
            self.instruction.source_register
        } else {
            self.instruction.destination_register
        };
        usize::from(reg & 7)
    }

    /// Index plus displacement from a brief extension word in the low
    /// prefetch word.
    fn brief_extension_offset(&self) -> u32 {
        let extension = self.prefetch as u16;
        let reg = usize::from((extension >> 12) & 7);
        let index = if extension & 0x8000 != 0 {
            self.registers.a[reg]
        } else {
            self.registers.d[reg]
        };
        let index = if extension & 0x0800 != 0 {
            index
        } else {
            Size::Word.sign_extend(index)
        };
        index.wrapping_add(Size::Byte.sign_extend(u32::from(extension)))
    }

    fn push_return_address(&mut self, return_address: u32) {
        self.bus_data[1] = return_address;
        self.registers.a[7] = self.registers.a[7].wrapping_sub(4);
        self.effective_address[1] = self.registers.a[7];
    }
}

const fn word(value: u32, half: Half) -> u16 {
    (value >> half.shift()) as u16
}

const fn with_word(value: u32, half: Half, word: u16) -> u32 {
    let shift = half.shift();
    (value & !(0xFFFF << shift)) | ((word as u32) << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_replace_only_their_word() {
        assert_eq!(word(0x1234_5678, Half::High), 0x1234);
        assert_eq!(with_word(0x1234_5678, Half::Low, 0xABCD), 0x1234_ABCD);
        assert_eq!(with_word(0x1234_5678, Half::High, 0xABCD), 0xABCD_5678);
    }
}
