//! Limits baked into the bytecode encoding.

/// Registers available to one frame; register operands are single bytes.
pub const NUM_REGS: usize = auric_asm::REG_COUNT;

/// Local slots addressable by a 16-bit operand.
pub const MAX_LOCALS: usize = u16::MAX as usize + 1;

/// Function indices must fit the 16-bit `CALL` operand.
pub const MAX_FUNC_ID: usize = u16::MAX as usize;

/// Static tuple indices are single bytes.
pub const MAX_STATIC_IDX: usize = u8::MAX as usize + 1;

/// Integer literals up to this value are encoded inline as `MOV_U16`;
/// anything larger is interned in the constant pool.
pub const SMALL_INT_MAX: i32 = 0x8000;

/// Arguments one call site may push.
pub const MAX_ARGS: usize = u8::MAX as usize;
