//! Shared test harness: a flat 16 MB bus that records every transfer, and a
//! processor booted through its own reset sequence.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use cpu_mc68000::{
    BusHandler, BusOperation, CompiledTables, Config, HalfCycles, Observable, Processor,
};

/// Initial SSP in the reset vector.
pub const STACK: u32 = 0x8000;
/// Initial PC in the reset vector; programs load here.
pub const ORIGIN: u32 = 0x1000;

/// One data transfer as seen by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub operation: BusOperation,
    pub address: u32,
    pub value: u16,
}

impl Transaction {
    pub fn is_program_read(&self) -> bool {
        self.operation.is_read() && self.operation.contains(BusOperation::IS_PROGRAM)
    }
}

/// Full 16MB address space for 68000 (24-bit addresses).
pub struct TestBus {
    pub data: Vec<u8>,
    pub log: Vec<Transaction>,
    /// Wait half-cycles added to every data transfer.
    pub wait: u64,
    /// Vector to answer interrupt acknowledges with, instead of autovectoring.
    pub vector: Option<u8>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            data: vec![0; 0x100_0000],
            log: Vec::new(),
            wait: 0,
            vector: None,
        }
    }

    pub fn load(&mut self, address: u32, words: &[u16]) {
        for (i, &word) in words.iter().enumerate() {
            self.write_word(address + 2 * i as u32, word);
        }
    }

    pub fn write_word(&mut self, address: u32, value: u16) {
        let addr = (address & 0xFF_FFFE) as usize;
        self.data[addr] = (value >> 8) as u8;
        self.data[addr + 1] = value as u8;
    }

    pub fn write_long(&mut self, address: u32, value: u32) {
        self.write_word(address, (value >> 16) as u16);
        self.write_word(address + 2, value as u16);
    }

    pub fn read_word(&self, address: u32) -> u16 {
        let addr = (address & 0xFF_FFFE) as usize;
        u16::from(self.data[addr]) << 8 | u16::from(self.data[addr + 1])
    }

    pub fn read_long(&self, address: u32) -> u32 {
        u32::from(self.read_word(address)) << 16 | u32::from(self.read_word(address + 2))
    }

    pub fn peek(&self, address: u32) -> u8 {
        self.data[(address & 0xFF_FFFF) as usize]
    }

    /// Point exception `vector` at `handler`.
    pub fn set_vector(&mut self, vector: u32, handler: u32) {
        self.write_long(vector * 4, handler);
    }

    pub fn reads(&self) -> impl Iterator<Item = &Transaction> {
        self.log.iter().filter(|t| t.operation.is_read())
    }

    pub fn writes(&self) -> impl Iterator<Item = &Transaction> {
        self.log.iter().filter(|t| t.operation.is_write())
    }
}

impl BusHandler for TestBus {
    fn perform_bus_operation(
        &mut self,
        operation: BusOperation,
        address: u32,
        value: &mut u16,
    ) -> HalfCycles {
        if !operation.transfers_data() {
            return HalfCycles::ZERO;
        }

        let byte = operation.contains(BusOperation::SELECT_BYTE);
        if operation.contains(BusOperation::INTERRUPT_ACKNOWLEDGE) {
            if let Some(vector) = self.vector {
                *value = u16::from(vector);
            }
        } else if operation.is_read() {
            *value = if byte {
                u16::from(self.peek(address))
            } else {
                self.read_word(address)
            };
        } else if byte {
            self.data[(address & 0xFF_FFFF) as usize] = *value as u8;
        } else {
            self.write_word(address, *value);
        }

        self.log.push(Transaction {
            operation,
            address: address & 0xFF_FFFF,
            value: *value,
        });
        HalfCycles::new(self.wait)
    }
}

/// Tables are built once per test binary.
pub fn tables() -> Arc<CompiledTables> {
    static TABLES: OnceLock<Arc<CompiledTables>> = OnceLock::new();
    TABLES
        .get_or_init(|| {
            let config = Config {
                check_pattern_overlaps: false,
                ..Config::default()
            };
            Arc::new(CompiledTables::build(&config).expect("tables build"))
        })
        .clone()
}

/// A bus holding the reset vector and `program` at [`ORIGIN`].
pub fn bus_with(program: &[u16]) -> TestBus {
    let mut bus = TestBus::new();
    bus.write_long(0, STACK);
    bus.write_long(4, ORIGIN);
    bus.load(ORIGIN, program);
    bus
}

/// Run the reset sequence, leaving the processor at the first instruction
/// with an empty transaction log.
pub fn boot(bus: &mut TestBus) -> Processor {
    let mut cpu = Processor::with_tables(tables(), Config::default());
    cpu.run_instruction(bus);
    bus.log.clear();
    cpu
}

/// Run `count` instructions and return the half-cycles they took.
pub fn run(cpu: &mut Processor, bus: &mut TestBus, count: usize) -> u64 {
    (0..count).map(|_| cpu.run_instruction(bus).get()).sum()
}

/// Run one instruction and return its length in whole cycles.
pub fn cycles(cpu: &mut Processor, bus: &mut TestBus) -> u64 {
    cpu.run_instruction(bus).cycles()
}

pub fn query(cpu: &Processor, path: &str) -> u64 {
    cpu.query(path)
        .and_then(|value| value.as_u64())
        .unwrap_or_else(|| panic!("no numeric value at {path}"))
}

pub fn flag(cpu: &Processor, name: &str) -> bool {
    match cpu.query(&format!("flags.{name}")) {
        Some(cpu_mc68000::Value::Bool(set)) => set,
        other => panic!("flags.{name}: {other:?}"),
    }
}
