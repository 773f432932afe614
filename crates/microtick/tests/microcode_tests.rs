//! Phase-sequence tests: which micro-phase each tick runs.

use microtick::opcodes::{self, Family};
use microtick::{Bits8, Cpu, CpuConfig, MicroPhase, MicrocodeTickResult, Mnemonic};

use MicroPhase::*;

fn cpu(program: &[u8]) -> Cpu<Bits8> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cpu = Cpu::new(CpuConfig::default()).expect("valid config");
    cpu.load_program(program).expect("program fits");
    cpu
}

fn executed(results: &[MicrocodeTickResult]) -> Vec<MicroPhase> {
    results.iter().map(|r| r.executed_phase).collect()
}

#[test]
fn none_operand_opcodes_never_touch_the_bus_after_fetch() {
    for byte in 0..=u8::MAX {
        let Some(meta) = opcodes::decode(byte) else {
            continue;
        };
        if !matches!(
            meta.family,
            Family::Nop | Family::Flag(_) | Family::Unary(_) | Family::RegisterPair(_)
        ) {
            continue;
        }

        let mut cpu = cpu(&[byte]);
        let results = cpu.step().unwrap();
        assert_eq!(results[0].executed_phase, FetchOpcode, "{byte:#04X}");
        assert!(
            results[1..].iter().all(|r| !r.executed_phase.is_bus()),
            "{byte:#04X} {:?}",
            executed(&results)
        );
        assert_eq!(results.last().map(|r| r.next_phase), Some(Done));
        assert!(results.len() <= 2, "{byte:#04X}");
    }
}

#[test]
fn nop_completes_in_its_fetch_tick() {
    let mut cpu = cpu(&[0x00]);
    let result = cpu.tick().unwrap();
    assert_eq!(result.executed_phase, FetchOpcode);
    assert_eq!(result.next_phase, Done);
    assert!(result.instruction_complete);
    assert_eq!(result.opcode, Some(Mnemonic::Nop));
}

#[test]
fn instruction_complete_tracks_next_phase() {
    // LDI R0, #1; CAL $07; NOP; NOP; NOP; RET
    let mut cpu = cpu(&[0x34, 0x01, 0x0D, 0x07, 0x00, 0x00, 0x00, 0x0E]);
    // Up to, not including, the second RET's pop from an empty stack.
    for _ in 0..14 {
        let result = cpu.tick().unwrap();
        assert_eq!(result.instruction_complete, result.next_phase == Done);
        assert_eq!(result.instruction_complete, cpu.at_instruction_boundary());
    }
}

#[test]
fn tick_counter_counts_successful_ticks() {
    let mut cpu = cpu(&[0x34, 0x01, 0x01]);
    let results = cpu.step().unwrap();
    let ticks: Vec<u64> = results.iter().map(|r| r.tick.get()).collect();
    assert_eq!(ticks, [1, 2, 3]);
    assert!(cpu.tick().is_err());
    assert_eq!(cpu.cycles().get(), 3);
}

#[test]
fn immediate_sequence() {
    let mut cpu = cpu(&[0x38, 0x01]); // ADI R0, #1
    assert_eq!(executed(&cpu.step().unwrap()), [FetchOpcode, FetchOperand, AluOp]);
}

#[test]
fn jump_sequence() {
    let mut cpu = cpu(&[0x08, 0x05]); // JMP $05
    let results = cpu.step().unwrap();
    assert_eq!(executed(&results), [FetchOpcode, FetchOperand, ValueComposition]);
    assert_eq!(cpu.pc(), 0x05);
}

#[test]
fn load_store_sequences() {
    let mut cpu = cpu(&[0x50, 0x10, 0x54, 0x10]); // LDA R0, $10; STA R0, $10
    assert_eq!(executed(&cpu.step().unwrap()), [FetchOpcode, FetchOperand, MemoryRead]);
    assert_eq!(executed(&cpu.step().unwrap()), [FetchOpcode, FetchOperand, MemoryWrite]);
}

#[test]
fn indexed_sequences() {
    let mut cpu = cpu(&[0x58, 0x10, 0x5C, 0x10]); // LDX R0, [R0+$10]; STX ...
    assert_eq!(
        executed(&cpu.step().unwrap()),
        [FetchOpcode, FetchOperand, EffectiveAddrComputation, MemoryRead]
    );
    assert_eq!(
        executed(&cpu.step().unwrap()),
        [FetchOpcode, FetchOperand, EffectiveAddrComputation, MemoryWrite]
    );
}

#[test]
fn memory_alu_sequence() {
    let mut cpu = cpu(&[0xD4, 0x10]); // ADA R0, $10
    assert_eq!(
        executed(&cpu.step().unwrap()),
        [FetchOpcode, FetchOperand, MemoryRead, AluOp]
    );
}

#[test]
fn stack_sequences() {
    // PSH R0; PEK R1; POP R2; CAL $06; ... RET at $06
    let mut cpu = cpu(&[0x28, 0x31, 0x2E, 0x0D, 0x06, 0x00, 0x0E]);
    assert_eq!(executed(&cpu.step().unwrap()), [FetchOpcode, MemoryWrite]);
    assert_eq!(executed(&cpu.step().unwrap()), [FetchOpcode, MemoryRead]);
    assert_eq!(executed(&cpu.step().unwrap()), [FetchOpcode, MemoryRead]);
    assert_eq!(
        executed(&cpu.step().unwrap()),
        [FetchOpcode, FetchOperand, MemoryWrite, ValueComposition]
    );
    assert_eq!(
        executed(&cpu.step().unwrap()),
        [FetchOpcode, MemoryRead, ValueComposition]
    );
    assert_eq!(cpu.pc(), 0x05);
}

#[test]
fn step_mid_instruction_finishes_it() {
    let mut cpu = cpu(&[0x5C, 0x10, 0x00]); // STX R0, [R0+$10]; NOP
    cpu.tick().unwrap();
    assert!(!cpu.at_instruction_boundary());
    assert_eq!(cpu.next_phase(), FetchOperand);
    let rest = cpu.step().unwrap();
    assert_eq!(
        executed(&rest),
        [FetchOperand, EffectiveAddrComputation, MemoryWrite]
    );
    assert!(cpu.at_instruction_boundary());
}

#[test]
fn failed_fetch_is_retried_from_the_same_state() {
    let mut cpu = cpu(&[0xFF]);
    for _ in 0..3 {
        assert!(cpu.tick().is_err());
    }
    assert_eq!(cpu.cycles().get(), 0);
    assert_eq!(cpu.pc(), 0x00);
    assert!(cpu.at_instruction_boundary());
    assert_eq!(cpu.current_instruction().map(|i| i.mnemonic()), None);
}
