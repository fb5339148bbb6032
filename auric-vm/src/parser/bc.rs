//! Bytecode emission helpers.

use auric_asm::{Instruction, Opcode};

use crate::error::ParseError;

use super::Parser;

impl<'src, 'pd> Parser<'src, 'pd> {
    /// Append one instruction.
    pub(crate) fn emit(&mut self, instr: Instruction) {
        self.bc.extend_from_slice(&instr.to_bytes());
    }

    /// Append an instruction whose 16-bit immediate is patched later;
    /// returns the byte offset of the immediate.
    pub(crate) fn emit_placeholder_imm16(&mut self, op: Opcode, a: u8) -> usize {
        self.emit(Instruction::with_imm16(op, a, 0));
        self.bc.len() - 2
    }

    /// Overwrite a previously emitted 16-bit immediate.
    pub(crate) fn patch16(&mut self, imm_offset: usize, value: u16) {
        self.bc[imm_offset..imm_offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Patch a forward jump to land on `target`; the displacement is
    /// counted in instruction words from the jump itself.
    pub(crate) fn patch_jump(&mut self, imm_offset: usize, target: usize) -> Result<(), ParseError> {
        let instr_start = imm_offset - 2;
        let words = (target - instr_start) / Instruction::SIZE;
        let disp = u16::try_from(words).map_err(|_| self.bytecode_gen_error())?;
        self.patch16(imm_offset, disp);
        Ok(())
    }

    /// Patch a backward jump to land on `target`.
    pub(crate) fn patch_jump_back(
        &mut self,
        imm_offset: usize,
        target: usize,
    ) -> Result<(), ParseError> {
        let instr_start = imm_offset - 2;
        let words = (instr_start - target) / Instruction::SIZE;
        let disp = u16::try_from(words).map_err(|_| self.bytecode_gen_error())?;
        self.patch16(imm_offset, disp);
        Ok(())
    }

    /// Pop both operands of a binary expression, allocate the result
    /// register and emit the operation.
    pub(crate) fn emit_binary(&mut self, op: Opcode) -> Result<(), ParseError> {
        let rhs = self.pop_reg();
        let lhs = self.pop_reg();
        let res = self.new_reg()?;
        self.emit(Instruction::new(op, lhs, rhs, res));
        Ok(())
    }

    /// The opcode of the most recently emitted instruction, if any.
    pub(crate) fn last_emitted_op(&self) -> Option<Opcode> {
        let start = self.bc.len().checked_sub(Instruction::SIZE)?;
        Opcode::try_from(self.bc[start]).ok()
    }
}
