//! Bus-level timing fixtures.
//!
//! Each JSON file under `tests/fixtures/` names one instruction, the machine
//! state it starts from, and every data transfer it must make, in order,
//! along with its length in cycles. Idle steps are not listed; the cycle
//! count covers them.

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use common::Transaction;
use cpu_mc68000::{Observable, Processor};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Fixture {
    name: String,
    program: Vec<String>,
    #[serde(default)]
    registers: BTreeMap<String, String>,
    #[serde(default)]
    memory: Vec<Block>,
    cycles: u64,
    transactions: Vec<Expected>,
    #[serde(default)]
    expect: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Block {
    address: String,
    words: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Kind {
    ProgramRead,
    Read,
    Write,
}

#[derive(Debug, Deserialize)]
struct Expected {
    kind: Kind,
    address: String,
    value: Option<String>,
}

fn hex(text: &str) -> u32 {
    u32::from_str_radix(text, 16).unwrap_or_else(|_| panic!("bad hex `{text}`"))
}

fn words(texts: &[String]) -> Vec<u16> {
    texts.iter().map(|w| hex(w) as u16).collect()
}

fn set_register(cpu: &mut Processor, name: &str, value: u32) {
    let registers = cpu.registers_mut();
    let index = |digits: &str| digits.parse::<usize>().expect("register number");
    if let Some(n) = name.strip_prefix('d') {
        registers.d[index(n)] = value;
    } else if let Some(n) = name.strip_prefix('a') {
        registers.a[index(n)] = value;
    } else {
        panic!("cannot preset `{name}`");
    }
}

fn kind_of(transaction: &Transaction) -> Kind {
    if transaction.is_program_read() {
        Kind::ProgramRead
    } else if transaction.operation.is_read() {
        Kind::Read
    } else {
        Kind::Write
    }
}

/// Run one fixture and describe every way it went wrong.
fn check(path: &Path) -> Vec<String> {
    let text = fs::read_to_string(path).expect("fixture readable");
    let fixture: Fixture = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("{}: {e}", path.display()));

    let mut bus = common::bus_with(&words(&fixture.program));
    for block in &fixture.memory {
        bus.load(hex(&block.address), &words(&block.words));
    }
    let mut cpu = common::boot(&mut bus);
    for (name, value) in &fixture.registers {
        set_register(&mut cpu, name, hex(value));
    }

    let cycles = common::cycles(&mut cpu, &mut bus);

    let mut failures = Vec::new();
    let name = &fixture.name;
    if cycles != fixture.cycles {
        failures.push(format!("{name}: {cycles} cycles, expected {}", fixture.cycles));
    }

    let seen: Vec<_> = bus.log.iter().map(|t| (kind_of(t), t.address, t.value)).collect();
    if seen.len() != fixture.transactions.len() {
        failures.push(format!(
            "{name}: {} transfers, expected {}: {seen:04X?}",
            seen.len(),
            fixture.transactions.len()
        ));
    }
    for (i, (expected, &(kind, address, value))) in
        fixture.transactions.iter().zip(&seen).enumerate()
    {
        let address_ok = hex(&expected.address) == address;
        let value_ok = expected.value.as_deref().is_none_or(|v| hex(v) == u32::from(value));
        if expected.kind != kind || !address_ok || !value_ok {
            failures.push(format!(
                "{name}: transfer {i} was {kind:?} {address:06X} = {value:04X}, expected {expected:?}"
            ));
        }
    }

    for (path, value) in &fixture.expect {
        let actual = cpu.query(path).and_then(|v| v.as_u64());
        if actual != Some(u64::from(hex(value))) {
            failures.push(format!("{name}: {path} = {actual:X?}, expected {value}"));
        }
    }
    failures
}

#[test]
fn fixtures_match_bus_activity_and_timing() {
    let pattern = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/*.json");
    let paths: Vec<_> = glob::glob(pattern)
        .expect("valid glob")
        .map(|entry| entry.expect("readable fixture path"))
        .collect();
    assert!(!paths.is_empty(), "no fixtures found");

    let failures: Vec<_> = paths.iter().flat_map(|path| check(path)).collect();
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn wait_states_stretch_every_transfer() {
    // MOVE.L (A0)+,(A1)+: five transfers.
    let mut bus = common::bus_with(&[0x22D8, 0x4E71, 0x4E71]);
    let mut cpu = common::boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;
    cpu.registers_mut().a[1] = 0x4000;
    bus.wait = 4;

    assert_eq!(cpu.run_instruction(&mut bus).get(), 40 + 5 * 4);
}
