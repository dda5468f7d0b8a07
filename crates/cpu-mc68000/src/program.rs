//! Bus-step programs and the mini-language that describes them.
//!
//! Each instruction's bus activity is written as a short string of tokens
//! such as `"n np nr nW+ nw"`. [`BusStepArena::assemble`] turns a string into
//! concrete [`BusStep`]s and appends them to a single arena, reusing any
//! identical run of steps that is already there.
//!
//! Token reference (durations in half-cycles):
//!
//! | token        | steps                                                        |
//! |--------------|--------------------------------------------------------------|
//! | `n`, `nn`    | idle for 4 / 8                                               |
//! | `r`          | idle for a length chosen at run time                         |
//! | `np`         | program fetch into the prefetch queue, PC += 2               |
//! | `nF`, `nf`   | program read of SSP high / low from effective address 0      |
//! | `nV`, `nv`   | program read of PC high / low from effective address 0       |
//! | `nR`, `nr`   | read source latch high / low from the next bound address     |
//! | `nRd`, `nrd` | read destination latch high / low                            |
//! | `nW`, `nw`   | write destination latch high / low                           |
//! | `nS`, `ns`   | write destination latch to effective address 1, which drops by 2 |
//! | `nU`, `nu`   | read source latch from effective address 0, which rises by 2 |
//! | `_`          | hold RESET for 248                                           |
//! | `tas`        | hold for 9, then write the destination byte back             |
//! | `i`          | interrupt acknowledge, then vector through the answer        |
//!
//! A trailing `+` or `-` on a read or write adjusts effective address 0
//! (source-latch reads) or 1 (everything else) by 2 after the transfer.

use std::collections::HashMap;

use thiserror::Error;

use crate::bus::BusOperation;

/// Which half of a 32-bit latch a word transfer touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    High,
    Low,
}

impl Half {
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Half::High => 16,
            Half::Low => 0,
        }
    }
}

/// Where a bus step takes its address from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressSource {
    #[default]
    None,
    ProgramCounter,
    /// Effective-address latch 0 (source side) or 1 (destination side).
    EffectiveAddress(u8),
    /// A0-A7, with A7 the active stack pointer.
    AddressRegister(u8),
    /// One of the three exception frame addresses worked out at trap entry.
    Precomputed(u8),
    /// Branch target of a DBcc whose counter has expired.
    DbccFalseAddress,
    /// The MOVEM cursor's current word.
    Movem,
    /// Interrupt-acknowledge address for the pending level.
    InterruptLevel,
}

/// Where a bus step's data comes from (writes) or goes to (reads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataSlot {
    #[default]
    None,
    SourceBusData(Half),
    DestinationBusData(Half),
    /// The low word of the prefetch queue.
    PrefetchLow,
    /// A7 of the active bank.
    StackPointer(Half),
    ProgramCounter(Half),
    /// The register word selected by the MOVEM cursor.
    Movem,
    InterruptVector,
}

/// Side effect applied once a step's bus activity is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepAction {
    #[default]
    None,
    /// Move the prefetch queue's low word into the high word.
    AdvancePrefetch,
    IncrementProgramCounter,
    /// Add 2 to effective-address latch 0 or 1.
    IncrementEffectiveAddress(u8),
    /// Subtract 2 from effective-address latch 0 or 1.
    DecrementEffectiveAddress(u8),
    /// Step the MOVEM cursor to its next word.
    AdvanceMovem,
    /// Point effective address 0 at the vector just acknowledged.
    VectorFromAcknowledge,
    /// End of program.
    ScheduleNextProgram,
}

/// Duration of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepLength {
    Fixed(u16),
    /// Set by the operation just before the step runs.
    Flexible,
}

/// One bus step: a duration, the signals it drives, and its bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusStep {
    pub length: StepLength,
    pub operation: BusOperation,
    pub address: AddressSource,
    pub value: DataSlot,
    pub action: StepAction,
}

impl BusStep {
    /// The end-of-program marker.
    pub const SENTINEL: Self = Self {
        length: StepLength::Fixed(0),
        operation: BusOperation::empty(),
        address: AddressSource::None,
        value: DataSlot::None,
        action: StepAction::ScheduleNextProgram,
    };

    const fn idle(length: StepLength) -> Self {
        Self {
            length,
            operation: BusOperation::empty(),
            address: AddressSource::None,
            value: DataSlot::None,
            action: StepAction::None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.action == StepAction::ScheduleNextProgram
    }
}

/// Transfer width applied to the data tokens of one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Width {
    #[default]
    Word,
    Byte,
}

impl Width {
    const fn select(self) -> BusOperation {
        match self {
            Width::Word => BusOperation::SELECT_WORD,
            Width::Byte => BusOperation::SELECT_BYTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("unknown bus-step token `{0}`")]
    UnknownToken(String),
    #[error("bus-step token `{0}` does not take an address adjustment")]
    UnexpectedAdjustment(String),
    #[error("bus-step token `{0}` needs an address but none are left to bind")]
    MissingAddress(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Source,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Idle(u16),
    Flexible,
    ProgramFetch,
    StackPointerFetch(Half),
    VectorFetch(Half),
    Read(Latch, Half),
    Write(Half),
    StackWrite(Half),
    StackRead(Half),
    ResetHold,
    TestAndSet,
    InterruptAcknowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Increment,
    Decrement,
}

fn tokenize(word: &str) -> Result<(Token, Option<Adjustment>), ProgramError> {
    let (base, adjustment) = if let Some(base) = word.strip_suffix('+') {
        (base, Some(Adjustment::Increment))
    } else if let Some(base) = word.strip_suffix('-') {
        (base, Some(Adjustment::Decrement))
    } else {
        (word, None)
    };

    let token = match base {
        "n" => Token::Idle(4),
        "nn" => Token::Idle(8),
        "r" => Token::Flexible,
        "np" => Token::ProgramFetch,
        "nF" => Token::StackPointerFetch(Half::High),
        "nf" => Token::StackPointerFetch(Half::Low),
        "nV" => Token::VectorFetch(Half::High),
        "nv" => Token::VectorFetch(Half::Low),
        "nR" => Token::Read(Latch::Source, Half::High),
        "nr" => Token::Read(Latch::Source, Half::Low),
        "nRd" => Token::Read(Latch::Destination, Half::High),
        "nrd" => Token::Read(Latch::Destination, Half::Low),
        "nW" => Token::Write(Half::High),
        "nw" => Token::Write(Half::Low),
        "nS" => Token::StackWrite(Half::High),
        "ns" => Token::StackWrite(Half::Low),
        "nU" => Token::StackRead(Half::High),
        "nu" => Token::StackRead(Half::Low),
        "_" => Token::ResetHold,
        "tas" => Token::TestAndSet,
        "i" => Token::InterruptAcknowledge,
        _ => return Err(ProgramError::UnknownToken(word.to_owned())),
    };

    if adjustment.is_some() && !matches!(token, Token::Read(..) | Token::Write(_)) {
        return Err(ProgramError::UnexpectedAdjustment(word.to_owned()));
    }
    Ok((token, adjustment))
}

/// The two halves of a data transfer: 5 half-cycles with the address
/// strobed, then 3 with the data selected.
fn transfer(
    read: bool,
    program: bool,
    select: BusOperation,
    address: AddressSource,
    value: DataSlot,
    action: StepAction,
) -> [BusStep; 2] {
    let mut common = BusOperation::empty();
    common.set(BusOperation::READ, read);
    common.set(BusOperation::IS_PROGRAM, program);
    [
        BusStep {
            length: StepLength::Fixed(5),
            operation: BusOperation::NEW_ADDRESS | common,
            address,
            value,
            action: StepAction::None,
        },
        BusStep {
            length: StepLength::Fixed(3),
            operation: BusOperation::SAME_ADDRESS | common | select,
            address,
            value,
            action,
        },
    ]
}

/// Parse a pattern into steps, ending with [`BusStep::SENTINEL`].
///
/// Addresses are bound in order to the tokens that take one: `nR`, `nr`,
/// `nRd`, `nrd`, `nW`, `nw` and `tas`.
pub fn parse(
    pattern: &str,
    addresses: &[AddressSource],
    width: Width,
) -> Result<Vec<BusStep>, ProgramError> {
    let mut steps = Vec::new();
    let mut bindings = addresses.iter().copied();

    for word in pattern.split_whitespace() {
        let (token, adjustment) = tokenize(word)?;
        let mut bind = || {
            bindings
                .next()
                .ok_or_else(|| ProgramError::MissingAddress(word.to_owned()))
        };

        match token {
            Token::Idle(length) => steps.push(BusStep::idle(StepLength::Fixed(length))),
            Token::Flexible => steps.push(BusStep::idle(StepLength::Flexible)),
            Token::ProgramFetch => {
                let [mut first, second] = transfer(
                    true,
                    true,
                    BusOperation::SELECT_WORD,
                    AddressSource::ProgramCounter,
                    DataSlot::PrefetchLow,
                    StepAction::IncrementProgramCounter,
                );
                first.action = StepAction::AdvancePrefetch;
                steps.extend([first, second]);
            }
            Token::StackPointerFetch(half) => steps.extend(transfer(
                true,
                true,
                BusOperation::SELECT_WORD,
                AddressSource::EffectiveAddress(0),
                DataSlot::StackPointer(half),
                StepAction::IncrementEffectiveAddress(0),
            )),
            Token::VectorFetch(half) => steps.extend(transfer(
                true,
                true,
                BusOperation::SELECT_WORD,
                AddressSource::EffectiveAddress(0),
                DataSlot::ProgramCounter(half),
                StepAction::IncrementEffectiveAddress(0),
            )),
            Token::Read(latch, half) => {
                let (value, latch_index) = match latch {
                    Latch::Source => (DataSlot::SourceBusData(half), 0),
                    Latch::Destination => (DataSlot::DestinationBusData(half), 1),
                };
                let action = adjust(adjustment, latch_index);
                steps.extend(transfer(true, false, width.select(), bind()?, value, action));
            }
            Token::Write(half) => {
                let action = adjust(adjustment, 1);
                steps.extend(transfer(
                    false,
                    false,
                    width.select(),
                    bind()?,
                    DataSlot::DestinationBusData(half),
                    action,
                ));
            }
            Token::StackWrite(half) => steps.extend(transfer(
                false,
                false,
                BusOperation::SELECT_WORD,
                AddressSource::EffectiveAddress(1),
                DataSlot::DestinationBusData(half),
                StepAction::DecrementEffectiveAddress(1),
            )),
            Token::StackRead(half) => steps.extend(transfer(
                true,
                false,
                BusOperation::SELECT_WORD,
                AddressSource::EffectiveAddress(0),
                DataSlot::SourceBusData(half),
                StepAction::IncrementEffectiveAddress(0),
            )),
            Token::ResetHold => steps.push(BusStep {
                operation: BusOperation::RESET,
                ..BusStep::idle(StepLength::Fixed(248))
            }),
            Token::TestAndSet => {
                let address = bind()?;
                let value = DataSlot::DestinationBusData(Half::Low);
                steps.push(BusStep {
                    length: StepLength::Fixed(9),
                    operation: BusOperation::SAME_ADDRESS,
                    address,
                    value,
                    action: StepAction::None,
                });
                steps.push(BusStep {
                    length: StepLength::Fixed(3),
                    operation: BusOperation::SAME_ADDRESS | BusOperation::SELECT_BYTE,
                    address,
                    value,
                    action: StepAction::None,
                });
            }
            Token::InterruptAcknowledge => {
                let [mut first, mut second] = transfer(
                    true,
                    false,
                    BusOperation::SELECT_BYTE,
                    AddressSource::InterruptLevel,
                    DataSlot::InterruptVector,
                    StepAction::VectorFromAcknowledge,
                );
                first.operation |= BusOperation::INTERRUPT_ACKNOWLEDGE;
                second.operation |= BusOperation::INTERRUPT_ACKNOWLEDGE;
                steps.extend([first, second]);
            }
        }
    }

    steps.push(BusStep::SENTINEL);
    Ok(steps)
}

fn adjust(adjustment: Option<Adjustment>, latch: u8) -> StepAction {
    match adjustment {
        None => StepAction::None,
        Some(Adjustment::Increment) => StepAction::IncrementEffectiveAddress(latch),
        Some(Adjustment::Decrement) => StepAction::DecrementEffectiveAddress(latch),
    }
}

type ProgramKey = (String, Vec<AddressSource>, Width);

/// Every bus-step program, stored end to end.
///
/// Programs are referred to by the index of their first step. The arena only
/// grows while the tables are being built.
#[derive(Debug, Clone, Default)]
pub struct BusStepArena {
    steps: Vec<BusStep>,
    /// Offsets of patterns already assembled, so repeats skip the search.
    assembled: HashMap<ProgramKey, usize>,
}

impl BusStepArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble `pattern`, returning the offset of an identical run of steps
    /// if one is already stored.
    pub fn assemble(
        &mut self,
        pattern: &str,
        addresses: &[AddressSource],
        width: Width,
    ) -> Result<usize, ProgramError> {
        let key = (pattern.to_owned(), addresses.to_vec(), width);
        if let Some(&offset) = self.assembled.get(&key) {
            return Ok(offset);
        }
        let program = parse(pattern, addresses, width)?;
        let offset = match self.find(&program) {
            Some(offset) => offset,
            None => self.push(&program),
        };
        self.assembled.insert(key, offset);
        Ok(offset)
    }

    /// Assemble `pattern` into fresh storage, even if an identical run of
    /// steps is already stored. Used for programs that get patched afterwards.
    pub fn assemble_unshared(
        &mut self,
        pattern: &str,
        addresses: &[AddressSource],
        width: Width,
    ) -> Result<usize, ProgramError> {
        let program = parse(pattern, addresses, width)?;
        Ok(self.push(&program))
    }

    fn push(&mut self, program: &[BusStep]) -> usize {
        let offset = self.steps.len();
        self.steps.extend_from_slice(program);
        offset
    }

    fn find(&self, program: &[BusStep]) -> Option<usize> {
        self.steps
            .windows(program.len())
            .position(|window| window == program)
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> &mut BusStep {
        &mut self.steps[index]
    }

    #[must_use]
    pub fn steps(&self) -> &[BusStep] {
        &self.steps
    }

    /// The program at `offset`, up to and including its sentinel.
    #[must_use]
    pub fn program(&self, offset: usize) -> &[BusStep] {
        program_at(&self.steps, offset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn into_steps(self) -> Vec<BusStep> {
        self.steps
    }
}

/// The program starting at `offset`, up to and including its sentinel.
pub(crate) fn program_at(steps: &[BusStep], offset: usize) -> &[BusStep] {
    let tail = &steps[offset..];
    let end = tail
        .iter()
        .position(BusStep::is_terminal)
        .map_or(tail.len(), |i| i + 1);
    &tail[..end]
}
