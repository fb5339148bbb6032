use auric_asm::{op, Instruction, InvalidOpcode, Opcode};
use rstest::rstest;

#[rstest]
#[case(op::add(0, 1, 2), Opcode::Add, 0, 1, 2)]
#[case(op::idx_set(7, 8, 9), Opcode::IdxSet, 7, 8, 9)]
#[case(op::not(4, 5), Opcode::Not, 4, 5, 0)]
#[case(op::push_arg(200), Opcode::PushArg, 200, 0, 0)]
fn operand_bytes_land_in_place(
    #[case] instr: Instruction,
    #[case] op: Opcode,
    #[case] a: u8,
    #[case] b: u8,
    #[case] c: u8,
) {
    assert_eq!(instr.op(), op);
    assert_eq!((instr.a(), instr.b(), instr.c()), (a, b, c));
    assert_eq!(Instruction::try_from(instr.to_bytes()), Ok(instr));
}

#[rstest]
#[case(op::mov_u16(1, 0x8000))]
#[case(op::call(0, 0xffff))]
#[case(op::jnif(3, 0x00ff))]
#[case(op::ret_local(12))]
fn imm16_survives_encoding(#[case] instr: Instruction) {
    let decoded = Instruction::try_from(instr.to_bytes()).unwrap();
    assert_eq!(decoded.imm16(), instr.imm16());
}

#[test]
fn decoding_a_stream() {
    let program = [op::mov_u16(0, 1), op::mov_u16(1, 2), op::add(0, 1, 2), op::ret(2)];
    let bytes: Vec<u8> = program.iter().flat_map(|i| i.to_bytes()).collect();

    let decoded: Result<Vec<_>, _> = auric_asm::instructions(&bytes).collect();
    assert_eq!(decoded.unwrap(), program);
}

#[test]
fn partial_instruction_is_an_error() {
    let mut bytes = op::nop().to_bytes().to_vec();
    bytes.push(Opcode::Ret as u8);

    let decoded: Result<Vec<_>, _> = auric_asm::instructions(&bytes).collect();
    assert_eq!(decoded, Err(InvalidOpcode));
}
