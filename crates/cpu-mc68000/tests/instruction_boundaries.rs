//! `run_instruction` stops exactly at the next opcode, including after
//! chains that end in register updates with no bus activity.

mod common;

use common::{ORIGIN, STACK, boot, bus_with, cycles, query};
use cpu_mc68000::Processor;

fn next_instruction(cpu: &Processor) -> u32 {
    cpu.registers().pc.wrapping_sub(4)
}

#[test]
fn trailing_register_updates_end_with_their_instruction() {
    let mut bus = bus_with(&[
        0x32D8, // MOVE.W (A0)+,(A1)+
        0xB348, // CMPM.W (A0)+,(A1)+
        0x43E8, 0x0010, // LEA $10(A0),A1
        0x41FB, 0x0002, // LEA (2,PC,D0.W),A0
        0x4E71, // NOP
    ]);
    bus.load(0x3000, &[0x1111, 0x0007]);
    bus.load(0x4000, &[0x0000, 0x0007]);
    let mut cpu = boot(&mut bus);
    {
        let registers = cpu.registers_mut();
        registers.a[0] = 0x3000;
        registers.a[1] = 0x4000;
        registers.d[0] = 0x10;
    }

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert!(cpu.at_instruction_boundary());
    assert!(cpu.tables().micro_ops()[cpu.micro_op_cursor()].is_terminal());
    assert!(cpu.tables().steps()[cpu.bus_step_cursor()].is_terminal());
    assert_eq!(query(&cpu, "micro_op"), cpu.micro_op_cursor() as u64);
    assert_eq!(query(&cpu, "opcode"), 0x32D8);
    assert_eq!(next_instruction(&cpu), ORIGIN + 2);
    assert_eq!((cpu.registers().a[0], cpu.registers().a[1]), (0x3002, 0x4002));
    assert_eq!(bus.read_word(0x4000), 0x1111);

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(query(&cpu, "opcode"), 0xB348);
    assert_eq!(next_instruction(&cpu), ORIGIN + 4);
    assert_eq!((cpu.registers().a[0], cpu.registers().a[1]), (0x3004, 0x4004));
    assert!(common::flag(&cpu, "z"));

    assert_eq!(cycles(&mut cpu, &mut bus), 8);
    assert_eq!(next_instruction(&cpu), ORIGIN + 8);
    assert_eq!(cpu.registers().a[1], 0x3014);

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(next_instruction(&cpu), ORIGIN + 12);
    assert_eq!(cpu.registers().a[0], ORIGIN + 10 + 2 + 0x10);

    assert_eq!(cycles(&mut cpu, &mut bus), 4);
    assert_eq!(next_instruction(&cpu), ORIGIN + 14);
}

#[test]
fn only_the_next_opcode_is_fetched_ahead() {
    // MOVE.L (A0)+,(A1)+; NOP; NOP
    let mut bus = bus_with(&[0x22D8, 0x4E71, 0x4E71]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;
    cpu.registers_mut().a[1] = 0x4000;

    cpu.run_instruction(&mut bus);
    let fetches: Vec<_> = bus
        .reads()
        .filter(|t| t.is_program_read())
        .map(|t| t.address)
        .collect();
    assert_eq!(fetches, [ORIGIN + 4]);
    assert_eq!(query(&cpu, "opcode"), 0x22D8);
}

#[test]
fn movem_completion_is_part_of_the_instruction() {
    let mut bus = bus_with(&[
        0x4CDF, 0x0003, // MOVEM.L (A7)+,D0-D1
        0x7005, // MOVEQ #5,D0
    ]);
    bus.load(STACK, &[0x0000, 0x0001, 0x0000, 0x0002]);
    let mut cpu = boot(&mut bus);

    assert_eq!(cycles(&mut cpu, &mut bus), 28);
    assert_eq!(cpu.registers().d[0], 1);
    assert_eq!(cpu.registers().d[1], 2);
    assert_eq!(cpu.registers().a[7], STACK + 8);
    assert_eq!(next_instruction(&cpu), ORIGIN + 4);

    assert_eq!(cycles(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.registers().d[0], 5);
}
