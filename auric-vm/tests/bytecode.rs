use auric_asm::{Instruction, Opcode};
use auric_vm::prelude::*;

mod common;
use common::run;

fn decode(program: &Program) -> Vec<Instruction> {
    auric_asm::instructions(&program.main.bc)
        .collect::<Result<_, _>>()
        .expect("emitted bytecode decodes")
}

#[test]
fn small_integers_are_inline_immediates() {
    let program = parse("x = 32768;").unwrap();
    let first = decode(&program)[0];
    assert_eq!(first.op(), Opcode::MovU16);
    assert_eq!(first.imm16(), 0x8000);
}

#[test]
fn the_first_integer_past_the_inline_range_is_interned() {
    let program = parse("x = 32769;").unwrap();
    let first = decode(&program)[0];
    assert_eq!(first.op(), Opcode::LoadConst);
}

#[test]
fn empty_array_literals_allocate_capacity_zero() {
    let program = parse("a = [];").unwrap();
    let ops = decode(&program);
    assert_eq!(ops[0].op(), Opcode::ArrayNew);
    assert_eq!(ops[0].imm16(), 0);
    assert!(ops.iter().all(|i| i.op() != Opcode::ArrayPush));
}

#[test]
fn array_literals_record_their_length_as_capacity() {
    let program = parse("a = [1, 2, 3];").unwrap();
    let ops = decode(&program);
    assert_eq!(ops[0].op(), Opcode::ArrayNew);
    assert_eq!(ops[0].imm16(), 3);
    assert_eq!(
        ops.iter().filter(|i| i.op() == Opcode::ArrayPush).count(),
        3
    );
}

#[test]
fn every_instruction_is_four_bytes_and_decodes() {
    let program = parse(
        r#"
        def f(n) { if n <= 1 { return n } return f(n-1)+f(n-2) }
        print f(10);
    "#,
    )
    .unwrap();
    assert_eq!(program.main.bc.len() % Instruction::SIZE, 0);
    decode(&program);
}

#[test]
fn registers_stay_within_the_declared_count() {
    let program = parse("print ((1+2)*(3+4))+((5+6)*(7+8));").unwrap();
    let num_registers = program.main.num_registers;
    assert!(num_registers <= 256);
    for instr in decode(&program) {
        match instr.op() {
            Opcode::Add | Opcode::Mul => {
                assert!(usize::from(instr.a()) < num_registers);
                assert!(usize::from(instr.b()) < num_registers);
                assert!(usize::from(instr.c()) < num_registers);
            }
            _ => {}
        }
    }
}

#[test]
fn oversized_jump_displacements_are_rejected() {
    // A conditional body of >65535 instruction words cannot encode its
    // forward displacement.
    let mut src = String::from("if true {\n");
    for _ in 0..33000 {
        src.push_str("x = 1;\n");
    }
    src.push('}');
    let err = parse(&src).unwrap_err();
    assert!(matches!(err, ParseError::BytecodeGen { .. }));
}

#[test]
fn register_exhaustion_is_a_parse_error() {
    // Right-nested additions keep every left operand live.
    let mut src = String::from("print ");
    for _ in 0..300 {
        src.push_str("(1+");
    }
    src.push('1');
    for _ in 0..300 {
        src.push(')');
    }
    src.push(';');
    let err = parse(&src).unwrap_err();
    assert!(matches!(err, ParseError::BytecodeGen { .. }));
}

#[test]
fn deep_but_bounded_nesting_still_runs() {
    let mut src = String::from("print ");
    for _ in 0..100 {
        src.push_str("(1+");
    }
    src.push('0');
    for _ in 0..100 {
        src.push(')');
    }
    src.push(';');
    assert_eq!(run(&src), "100");
}
