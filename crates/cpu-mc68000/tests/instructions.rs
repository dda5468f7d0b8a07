//! Instruction behaviour through the public interface: registers, memory and
//! cycle counts after whole instructions.

mod common;

use common::{ORIGIN, STACK, TestBus, boot, bus_with, cycles, flag, query};
use cpu_mc68000::{
    ExecutionState, HalfCycles, MC68000_QUERY_PATHS, Observable, Processor, Value,
};

/// Address of the instruction about to run; PC is two words ahead of it.
fn next_instruction(cpu: &Processor) -> u32 {
    cpu.registers().pc.wrapping_sub(4)
}

#[test]
fn reset_loads_stack_pointer_and_program_counter() {
    let mut bus = bus_with(&[0x4E71, 0x4E71]);
    let mut cpu = Processor::with_tables(common::tables(), Default::default());
    assert_eq!(cpu.state(), ExecutionState::Reset);

    let spent = cpu.run_instruction(&mut bus);

    assert_eq!(spent, HalfCycles::new(76));
    assert_eq!(query(&cpu, "a7"), u64::from(STACK));
    assert_eq!(query(&cpu, "ssp"), u64::from(STACK));
    assert_eq!(next_instruction(&cpu), ORIGIN);
    assert_eq!(query(&cpu, "sr"), 0x2700);
    assert_eq!(cpu.prefetch(), 0x4E71_4E71);

    let addresses: Vec<_> = bus.reads().map(|t| t.address).collect();
    assert_eq!(addresses, [0, 2, 4, 6, ORIGIN, ORIGIN + 2]);
    assert!(bus.reads().all(|t| t.is_program_read()));
}

#[test]
fn reset_during_execution_starts_over() {
    let mut bus = bus_with(&[0x7001, 0x7002, 0x7003]);
    let mut cpu = boot(&mut bus);
    common::run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.registers().d[0], 2);

    cpu.reset();
    cpu.run_instruction(&mut bus);
    assert_eq!(next_instruction(&cpu), ORIGIN);
    assert_eq!(cpu.state(), ExecutionState::Reset);
    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.state(), ExecutionState::Normal);
    assert_eq!(cpu.registers().d[0], 1);
}

#[test]
fn every_listed_query_path_answers() {
    let mut bus = bus_with(&[0x4E71]);
    let cpu = boot(&mut bus);
    for path in MC68000_QUERY_PATHS {
        assert!(cpu.query(path).is_some(), "{path} has no value");
    }
    assert_eq!(cpu.query("d8"), None);
    assert_eq!(cpu.query("state"), Some(Value::String("reset".into())));
}

#[test]
fn run_for_carries_overrun_into_the_next_call() {
    let mut bus = bus_with(&[0x4E71, 0x4E71]);
    let mut cpu = boot(&mut bus);
    let start = cpu.cycles().get();

    // The first step of NOP's fetch is five half-cycles long.
    cpu.run_for(&mut bus, HalfCycles::new(1));
    assert_eq!(cpu.cycles().get(), start + 5);
    cpu.run_for(&mut bus, HalfCycles::new(4));
    assert_eq!(cpu.cycles().get(), start + 5);
    cpu.run_for(&mut bus, HalfCycles::new(3));
    assert_eq!(cpu.cycles().get(), start + 8);
}

#[test]
fn moveq_sign_extends() {
    let mut bus = bus_with(&[0x70FF]);
    let mut cpu = boot(&mut bus);
    assert_eq!(cycles(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.registers().d[0], 0xFFFF_FFFF);
    assert!(flag(&cpu, "n"));
    assert!(!flag(&cpu, "z"));
}

#[test]
fn byte_postincrement_steps_by_one_except_on_a7() {
    // MOVE.B (A0)+,D0; MOVE.B (A7)+,D1
    let mut bus = bus_with(&[0x1018, 0x121F]);
    bus.data[0x3000] = 0x5A;
    bus.data[STACK as usize] = 0xA5;
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;

    common::run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.registers().a[0], 0x3001);
    assert_eq!(cpu.registers().a[7], STACK + 2);
    assert_eq!(cpu.registers().d[0] & 0xFF, 0x5A);
    assert_eq!(cpu.registers().d[1] & 0xFF, 0xA5);
}

#[test]
fn byte_predecrement_on_a7_keeps_the_stack_aligned() {
    // MOVE.B D0,-(A7)
    let mut bus = bus_with(&[0x1F00]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().d[0] = 0x77;

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().a[7], STACK - 2);
    assert_eq!(bus.peek(STACK - 2), 0x77);
}

#[test]
fn byte_reads_leave_the_rest_of_the_register() {
    // MOVE.B (A0),D0
    let mut bus = bus_with(&[0x1010]);
    bus.data[0x3001] = 0x42;
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3001;
    cpu.registers_mut().d[0] = 0x1234_5678;

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().d[0], 0x1234_5642);
}

#[test]
fn supervisor_and_user_stacks_swap_through_trap_and_rte() {
    let mut bus = bus_with(&[
        0x4E60, // MOVE A0,USP
        0x46FC, 0x0000, // MOVE #0,SR
        0x4E40, // TRAP #0
        0x4E71, // NOP
    ]);
    bus.set_vector(32, 0x2000);
    bus.load(0x2000, &[0x4E73]); // RTE
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x6000;

    common::run(&mut cpu, &mut bus, 2);
    assert!(!flag(&cpu, "s"));
    assert_eq!(cpu.registers().a[7], 0x6000);
    assert_eq!(query(&cpu, "ssp"), u64::from(STACK));

    assert_eq!(cycles(&mut cpu, &mut bus), 34);
    assert!(flag(&cpu, "s"));
    assert_eq!(next_instruction(&cpu), 0x2000);
    assert_eq!(cpu.registers().a[7], STACK - 6);
    assert_eq!(query(&cpu, "usp"), 0x6000);
    assert_eq!(bus.read_word(STACK - 6), 0x0000);
    assert_eq!(bus.read_long(STACK - 4), ORIGIN + 8);

    assert_eq!(cycles(&mut cpu, &mut bus), 20);
    assert!(!flag(&cpu, "s"));
    assert_eq!(cpu.registers().a[7], 0x6000);
    assert_eq!(query(&cpu, "ssp"), u64::from(STACK));
    assert_eq!(next_instruction(&cpu), ORIGIN + 8);
}

#[test]
fn movem_round_trip_restores_registers_and_stack() {
    let mut bus = bus_with(&[
        0x48E7, 0xC080, // MOVEM.L D0-D1/A0,-(A7)
        0x4CDF, 0x020C, // MOVEM.L (A7)+,D2-D3/A1
    ]);
    let mut cpu = boot(&mut bus);
    {
        let registers = cpu.registers_mut();
        registers.d[0] = 0x1111_1111;
        registers.d[1] = 0x2222_2222;
        registers.a[0] = 0x3333_3333;
    }

    assert_eq!(cycles(&mut cpu, &mut bus), 32);
    assert_eq!(cpu.registers().a[7], STACK - 12);
    assert_eq!(bus.read_long(STACK - 12), 0x1111_1111);
    assert_eq!(bus.read_long(STACK - 8), 0x2222_2222);
    assert_eq!(bus.read_long(STACK - 4), 0x3333_3333);

    assert_eq!(cycles(&mut cpu, &mut bus), 36);
    assert_eq!(cpu.registers().a[7], STACK);
    assert_eq!(cpu.registers().d[2], 0x1111_1111);
    assert_eq!(cpu.registers().d[3], 0x2222_2222);
    assert_eq!(cpu.registers().a[1], 0x3333_3333);
}

#[test]
fn movem_word_load_sign_extends() {
    // MOVEM.W (A0),D0/A1
    let mut bus = bus_with(&[0x4C90, 0x0201]);
    bus.load(0x3000, &[0x8001, 0x0002]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().d[0], 0xFFFF_8001);
    assert_eq!(cpu.registers().a[1], 2);
    assert_eq!(cpu.registers().a[0], 0x3000);
}

#[test]
fn move_postincrements_on_one_or_two_registers() {
    let mut bus = bus_with(&[
        0x30D8, // MOVE.W (A0)+,(A0)+
        0x32D8, // MOVE.W (A0)+,(A1)+
        0x1ED8, // MOVE.B (A0)+,(A7)+
    ]);
    bus.load(0x3000, &[0xBEEF, 0x0000, 0xCAFE, 0x5A00]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;
    cpu.registers_mut().a[1] = 0x4000;

    // The source steps before the destination is addressed.
    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.registers().a[0], 0x3004);
    assert_eq!(bus.read_word(0x3002), 0xBEEF);

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.registers().a[0], 0x3006);
    assert_eq!(cpu.registers().a[1], 0x4002);
    assert_eq!(bus.read_word(0x4000), 0xCAFE);

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.registers().a[0], 0x3007);
    assert_eq!(cpu.registers().a[7], STACK + 2);
    assert_eq!(bus.peek(STACK), 0x5A);
}

#[test]
fn status_loads_and_immediate_multiply_keep_their_documented_length() {
    let mut bus = bus_with(&[
        0x46C0, // MOVE D0,SR
        0x46FC, 0x2700, // MOVE #$2700,SR
        0x44C0, // MOVE D0,CCR
        0xC2FC, 0x0003, // MULU #3,D1
    ]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().d[0] = 0x2704;
    cpu.registers_mut().d[1] = 7;

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(query(&cpu, "sr"), 0x2704);
    assert_eq!(cycles(&mut cpu, &mut bus), 16);
    assert_eq!(query(&cpu, "sr"), 0x2700);
    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(query(&cpu, "ccr"), 0x04);

    // 38 + 2n, n = 2, plus the immediate fetch.
    assert_eq!(cycles(&mut cpu, &mut bus), 46);
    assert_eq!(cpu.registers().d[1], 21);
}

#[test]
fn register_shifts_take_two_cycles_per_bit() {
    // LSL.L D1,D0 three times, then LSR.W #8,D0
    let mut bus = bus_with(&[0xE3A8, 0xE3A8, 0xE3A8, 0xE048]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().d[0] = 1;

    cpu.registers_mut().d[1] = 10;
    assert_eq!(cycles(&mut cpu, &mut bus), 28);
    assert_eq!(cpu.registers().d[0], 1 << 10);

    cpu.registers_mut().d[1] = 0;
    assert_eq!(cycles(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.registers().d[0], 1 << 10);
    assert!(!flag(&cpu, "c"));

    // Counts are taken modulo 64.
    cpu.registers_mut().d[1] = 65;
    assert_eq!(cycles(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.registers().d[0], 1 << 11);

    assert_eq!(cycles(&mut cpu, &mut bus), 22);
    assert_eq!(cpu.registers().d[0], (1 << 11) >> 8);
}

#[test]
fn branches_not_taken_cost_by_displacement_size() {
    // BEQ.S, then BEQ.W, both with Z clear
    let mut bus = bus_with(&[0x6702, 0x6700, 0x0010, 0x4E71]);
    let mut cpu = boot(&mut bus);

    assert_eq!(cycles(&mut cpu, &mut bus), 8);
    assert_eq!(next_instruction(&cpu), ORIGIN + 2);
    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(next_instruction(&cpu), ORIGIN + 6);
}

#[test]
fn branch_word_displacement_is_relative_to_the_extension() {
    // BRA.W *+$20
    let mut bus = bus_with(&[0x6000, 0x001E]);
    let mut cpu = boot(&mut bus);
    assert_eq!(cycles(&mut cpu, &mut bus), 10);
    assert_eq!(next_instruction(&cpu), ORIGIN + 0x20);
}

#[test]
fn scc_on_a_register_costs_more_when_true() {
    // ST D0; SF D1
    let mut bus = bus_with(&[0x50C0, 0x51C1]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().d[1] = 0xFFFF_FFFF;

    assert_eq!(cycles(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.registers().d[0], 0xFF);
    assert_eq!(cycles(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.registers().d[1], 0xFFFF_FF00);
}

#[test]
fn cmpm_on_one_register_compares_neighbours() {
    // CMPM.W (A0)+,(A0)+
    let mut bus = bus_with(&[0xB148]);
    bus.load(0x3000, &[5, 3]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;

    assert_eq!(cycles(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.registers().a[0], 0x3004);
    let reads: Vec<_> = bus.reads().filter(|t| !t.is_program_read()).map(|t| t.address).collect();
    assert_eq!(reads, [0x3000, 0x3002]);
    // 3 - 5 borrows.
    assert!(flag(&cpu, "n"));
    assert!(flag(&cpu, "c"));
    assert!(!flag(&cpu, "z"));
}

#[test]
fn muls_is_signed_and_timed_by_bit_pairs() {
    // MULS D1,D0
    let mut bus = bus_with(&[0xC1C1]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().d[0] = 3;
    cpu.registers_mut().d[1] = 0xFFFE;

    assert_eq!(cycles(&mut cpu, &mut bus), 40);
    assert_eq!(cpu.registers().d[0], (-6i32) as u32);
    assert!(flag(&cpu, "n"));
}

#[test]
fn register_shuffles() {
    let mut bus = bus_with(&[
        0xC189, // EXG D0,A1
        0x4840, // SWAP D0
        0x4880, // EXT.W D0
        0x48C0, // EXT.L D0
    ]);
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().d[0] = 0x1234_5678;
    cpu.registers_mut().a[1] = 0x00AB_0080;

    assert_eq!(cycles(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.registers().d[0], 0x00AB_0080);
    assert_eq!(cpu.registers().a[1], 0x1234_5678);

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().d[0], 0x0080_00AB);

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().d[0], 0x0080_FFAB);
    assert!(flag(&cpu, "n"));

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().d[0], 0xFFFF_FFAB);
}

#[test]
fn bsr_and_rts_pair_up() {
    let mut bus = bus_with(&[
        0x6104, // BSR.S to ORIGIN + 6
        0x4E71, // NOP
        0x4E71, // NOP
        0x4E75, // RTS
    ]);
    let mut cpu = boot(&mut bus);

    assert_eq!(cycles(&mut cpu, &mut bus), 18);
    assert_eq!(next_instruction(&cpu), ORIGIN + 6);
    assert_eq!(cpu.registers().a[7], STACK - 4);
    assert_eq!(bus.read_long(STACK - 4), ORIGIN + 2);

    assert_eq!(cycles(&mut cpu, &mut bus), 16);
    assert_eq!(next_instruction(&cpu), ORIGIN + 2);
    assert_eq!(cpu.registers().a[7], STACK);
}

#[test]
fn immediate_to_ccr_resumes_after_the_extension_word() {
    // ORI #$1F,CCR; ANDI #$04,CCR; MOVEQ #1,D0
    let mut bus = bus_with(&[0x003C, 0x001F, 0x023C, 0x0004, 0x7001]);
    let mut cpu = boot(&mut bus);

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(query(&cpu, "ccr"), 0x1F);
    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(query(&cpu, "ccr"), 0x04);
    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.registers().d[0], 1);
}

#[test]
fn tas_sets_the_top_bit_in_memory() {
    // TAS (A0)
    let mut bus = bus_with(&[0x4AD0]);
    bus.data[0x3000] = 0x01;
    let mut cpu = boot(&mut bus);
    cpu.registers_mut().a[0] = 0x3000;

    common::run(&mut cpu, &mut bus, 1);
    assert_eq!(bus.peek(0x3000), 0x81);
    assert!(!flag(&cpu, "n"));
    assert!(!flag(&cpu, "z"));
}

#[test]
fn shared_tables_serve_independent_processors() {
    let mut first_bus = bus_with(&[0x7005]);
    let mut second_bus: TestBus = bus_with(&[0x70FB]);
    let mut first = boot(&mut first_bus);
    let mut second = boot(&mut second_bus);

    common::run(&mut first, &mut first_bus, 1);
    common::run(&mut second, &mut second_bus, 1);
    assert_eq!(first.registers().d[0], 5);
    assert_eq!(second.registers().d[0], (-5i32) as u32);
    assert!(std::sync::Arc::ptr_eq(first.tables(), second.tables()));
}
