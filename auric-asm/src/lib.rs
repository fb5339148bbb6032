//! Atomic types of the auric virtual machine.
//!
//! Every auric instruction occupies exactly four bytes:
//!
//! ```text
//! [ opcode (8) ] [ a (8) ] [ b (8) | imm16 lo ] [ c (8) | imm16 hi ]
//! ```
//!
//! The `a`, `b` and `c` fields address one of the 256 frame registers (or
//! a small immediate, depending on the opcode); `b` and `c` together may
//! form a 16-bit little-endian immediate used for constant indices,
//! function indices, local slots and jump displacements. Displacements
//! are counted in 4-byte instruction words.

#![warn(missing_docs)]

mod instruction;
mod opcode;

pub mod op;

pub use instruction::Instruction;
pub use opcode::{InvalidOpcode, Opcode};

/// Register count addressable by one instruction field.
pub const REG_COUNT: usize = 256;

/// Decode a bytecode buffer into instructions.
///
/// Returns `Err` on a trailing partial instruction or an unknown opcode
/// byte, carrying the byte offset of the offending instruction.
pub fn instructions(bc: &[u8]) -> impl Iterator<Item = Result<Instruction, InvalidOpcode>> + '_ {
    bc.chunks(Instruction::SIZE).map(|raw| {
        let bytes: [u8; Instruction::SIZE] = raw.try_into().map_err(|_| InvalidOpcode)?;
        Instruction::try_from(bytes)
    })
}
