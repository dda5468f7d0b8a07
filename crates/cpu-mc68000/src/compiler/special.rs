//! Programs that instructions switch to at run time, and the exception
//! sequences.

use crate::bus::BusOperation;
use crate::program::{AddressSource, BusStepArena, DataSlot, Half, ProgramError, StepAction, Width};

/// Arena offsets of the programs substituted at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialPrograms {
    pub reset: usize,
    pub branch_taken: usize,
    pub branch_byte_not_taken: usize,
    pub branch_word_not_taken: usize,
    pub bsr: usize,
    pub dbcc_condition_true: usize,
    pub dbcc_false_no_branch: usize,
    pub dbcc_false_branch: usize,
    /// 64 word reads plus the overflow read; entered part-way along.
    pub movem_read: usize,
    /// 64 word writes; entered part-way along.
    pub movem_write: usize,
    pub trap: usize,
    pub interrupt: usize,
    /// Pops the RTE/RTR frame.
    pub return_from_exception: usize,
    /// Just a sentinel.
    pub empty: usize,
}

/// The longest MOVEM: sixteen long registers.
pub const MOVEM_MAX_WORDS: usize = 64;

const PC_HIGH: DataSlot = DataSlot::ProgramCounter(Half::High);
const PC_LOW: DataSlot = DataSlot::ProgramCounter(Half::Low);
const STATUS: DataSlot = DataSlot::DestinationBusData(Half::Low);

impl SpecialPrograms {
    pub(super) fn build(arena: &mut BusStepArena) -> Result<Self, ProgramError> {
        let empty = arena.assemble("", &[], Width::Word)?;
        let reset = arena.assemble("n n n n n nn nF nf nV nv np np", &[], Width::Word)?;

        let branch_taken = arena.assemble("n np np", &[], Width::Word)?;
        let branch_byte_not_taken = arena.assemble("nn np", &[], Width::Word)?;
        let branch_word_not_taken = arena.assemble("nn np np", &[], Width::Word)?;
        let bsr = arena.assemble("np np", &[], Width::Word)?;

        let dbcc_condition_true = arena.assemble("nn np np", &[], Width::Word)?;
        // The read looks like a program fetch from the branch target.
        let dbcc_false_no_branch = arena.assemble_unshared(
            "n nr np np",
            &[AddressSource::DbccFalseAddress],
            Width::Word,
        )?;
        for index in [1, 2] {
            arena.step_mut(dbcc_false_no_branch + index).operation |= BusOperation::IS_PROGRAM;
        }
        let dbcc_false_branch = arena.assemble("n np np", &[], Width::Word)?;

        let movem_read = movem_program(arena, "nr", MOVEM_MAX_WORDS + 1)?;
        let movem_write = movem_program(arena, "nw", MOVEM_MAX_WORDS)?;

        // Frame order on the bus: PC low, SR, PC high, then the vector.
        let frame = [
            AddressSource::Precomputed(0),
            AddressSource::Precomputed(1),
            AddressSource::Precomputed(2),
        ];
        let trap = arena.assemble_unshared("nn nw nw nW nV nv np n np", &frame, Width::Word)?;
        patch_values(arena, trap, &[(1, PC_LOW), (3, STATUS), (5, PC_HIGH)]);

        let interrupt =
            arena.assemble_unshared("nn n nw i n nw nW nV nv np n np", &frame, Width::Word)?;
        patch_values(arena, interrupt, &[(2, PC_LOW), (7, STATUS), (9, PC_HIGH)]);

        // Pops PC high, SR, PC low from the precomputed frame addresses.
        let return_from_exception = arena.assemble_unshared("nR nr nr", &frame, Width::Word)?;
        patch_values(arena, return_from_exception, &[(0, PC_HIGH), (4, PC_LOW)]);

        Ok(Self {
            reset,
            branch_taken,
            branch_byte_not_taken,
            branch_word_not_taken,
            bsr,
            dbcc_condition_true,
            dbcc_false_no_branch,
            dbcc_false_branch,
            movem_read,
            movem_write,
            trap,
            interrupt,
            return_from_exception,
            empty,
        })
    }

    /// Entry point into a MOVEM program that transfers `words` words.
    #[must_use]
    pub const fn movem_entry(program: usize, words: usize) -> usize {
        program + (MOVEM_MAX_WORDS - words) * 2
    }
}

/// A run of `count` identical transfers that take their address and data
/// from the MOVEM cursor.
fn movem_program(
    arena: &mut BusStepArena,
    token: &str,
    count: usize,
) -> Result<usize, ProgramError> {
    let pattern = vec![token; count].join(" ");
    let addresses = vec![AddressSource::Movem; count];
    let start = arena.assemble_unshared(&pattern, &addresses, Width::Word)?;
    for transfer in 0..count {
        let first = start + transfer * 2;
        arena.step_mut(first).value = DataSlot::Movem;
        let second = arena.step_mut(first + 1);
        second.value = DataSlot::Movem;
        second.action = StepAction::AdvanceMovem;
    }
    Ok(start)
}

/// Rebind both steps of the transfer starting at each listed step.
fn patch_values(arena: &mut BusStepArena, start: usize, patches: &[(usize, DataSlot)]) {
    for &(step, value) in patches {
        arena.step_mut(start + step).value = value;
        arena.step_mut(start + step + 1).value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::StepLength;

    fn duration(arena: &BusStepArena, offset: usize) -> u16 {
        arena
            .program(offset)
            .iter()
            .map(|step| match step.length {
                StepLength::Fixed(n) => n,
                StepLength::Flexible => 0,
            })
            .sum()
    }

    #[test]
    fn exception_programs_take_documented_time() {
        let mut arena = BusStepArena::new();
        let programs = SpecialPrograms::build(&mut arena).unwrap();
        assert_eq!(duration(&arena, programs.reset), 76);
        assert_eq!(duration(&arena, programs.trap), 68);
        assert_eq!(duration(&arena, programs.interrupt), 84);
        assert_eq!(duration(&arena, programs.return_from_exception), 24);
    }

    #[test]
    fn trap_frame_writes_pc_low_then_status_then_pc_high() {
        let mut arena = BusStepArena::new();
        let programs = SpecialPrograms::build(&mut arena).unwrap();
        let writes: Vec<_> = arena
            .program(programs.trap)
            .iter()
            .filter(|step| step.operation.is_write())
            .map(|step| (step.address, step.value))
            .collect();
        assert_eq!(
            writes,
            [
                (AddressSource::Precomputed(0), PC_LOW),
                (AddressSource::Precomputed(1), STATUS),
                (AddressSource::Precomputed(2), PC_HIGH),
            ]
        );
    }

    #[test]
    fn movem_entry_leaves_room_for_the_requested_words() {
        let mut arena = BusStepArena::new();
        let programs = SpecialPrograms::build(&mut arena).unwrap();
        let entry = SpecialPrograms::movem_entry(programs.movem_write, 3);
        let transfers = arena
            .program(entry)
            .iter()
            .filter(|step| step.operation.is_write())
            .count();
        assert_eq!(transfers, 3);
        let entry = SpecialPrograms::movem_entry(programs.movem_read, 3);
        let reads = arena
            .program(entry)
            .iter()
            .filter(|step| step.operation.is_read())
            .count();
        assert_eq!(reads, 4);
    }
}
