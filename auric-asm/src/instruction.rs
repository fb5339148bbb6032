use crate::opcode::{InvalidOpcode, Opcode};

/// A single decoded instruction.
///
/// The opcode decides how the three operand bytes are read: as register
/// indices, as small immediates, or — for `b` and `c` — as the halves of
/// a little-endian 16-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    op: Opcode,
    a: u8,
    b: u8,
    c: u8,
}

impl Instruction {
    /// Size of an encoded instruction in bytes.
    pub const SIZE: usize = 4;

    /// Construct from the opcode and raw operand bytes.
    pub const fn new(op: Opcode, a: u8, b: u8, c: u8) -> Self {
        Self { op, a, b, c }
    }

    /// Construct with the `b`/`c` pair holding a 16-bit immediate.
    pub const fn with_imm16(op: Opcode, a: u8, imm: u16) -> Self {
        let [b, c] = imm.to_le_bytes();
        Self { op, a, b, c }
    }

    /// Opcode.
    pub const fn op(&self) -> Opcode {
        self.op
    }

    /// First operand byte.
    pub const fn a(&self) -> u8 {
        self.a
    }

    /// Second operand byte.
    pub const fn b(&self) -> u8 {
        self.b
    }

    /// Third operand byte.
    pub const fn c(&self) -> u8 {
        self.c
    }

    /// The `b`/`c` pair as a 16-bit immediate.
    ///
    /// Stored little-endian in the bytecode stream regardless of host
    /// endianness.
    pub const fn imm16(&self) -> u16 {
        u16::from_le_bytes([self.b, self.c])
    }

    /// Encode into the four-byte wire form.
    pub const fn to_bytes(self) -> [u8; Self::SIZE] {
        [self.op as u8, self.a, self.b, self.c]
    }
}

impl From<Instruction> for [u8; Instruction::SIZE] {
    fn from(instr: Instruction) -> Self {
        instr.to_bytes()
    }
}

impl TryFrom<[u8; Instruction::SIZE]> for Instruction {
    type Error = InvalidOpcode;

    fn try_from(bytes: [u8; Instruction::SIZE]) -> Result<Self, Self::Error> {
        let [op, a, b, c] = bytes;
        Ok(Self {
            op: Opcode::try_from(op)?,
            a,
            b,
            c,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imm16_is_little_endian() {
        let instr = Instruction::with_imm16(Opcode::MovU16, 3, 0x1234);
        assert_eq!(instr.to_bytes(), [0x02, 3, 0x34, 0x12]);
        assert_eq!(instr.imm16(), 0x1234);
    }

    #[test]
    fn byte_round_trip() {
        let instr = Instruction::new(Opcode::Add, 1, 2, 3);
        let decoded = Instruction::try_from(instr.to_bytes()).unwrap();
        assert_eq!(instr, decoded);
    }
}
