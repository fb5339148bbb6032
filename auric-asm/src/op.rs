//! Shorthand constructors, one per operation.
//!
//! These make hand-written bytecode in tests and tooling readable:
//!
//! ```
//! use auric_asm::op;
//!
//! let bc: Vec<u8> = [op::mov_u16(0, 40), op::mov_u16(1, 2), op::add(0, 1, 2), op::ret(2)]
//!     .iter()
//!     .flat_map(|i| i.to_bytes())
//!     .collect();
//! assert_eq!(bc.len(), 16);
//! ```

use crate::{Instruction, Opcode};

macro_rules! op_reg3 {
    ($($doc:literal $name:ident $variant:ident;)*) => {
        $(
            #[doc = $doc]
            pub const fn $name(a: u8, b: u8, c: u8) -> Instruction {
                Instruction::new(Opcode::$variant, a, b, c)
            }
        )*
    };
}

macro_rules! op_reg2 {
    ($($doc:literal $name:ident $variant:ident;)*) => {
        $(
            #[doc = $doc]
            pub const fn $name(a: u8, b: u8) -> Instruction {
                Instruction::new(Opcode::$variant, a, b, 0)
            }
        )*
    };
}

macro_rules! op_reg_imm {
    ($($doc:literal $name:ident $variant:ident;)*) => {
        $(
            #[doc = $doc]
            pub const fn $name(a: u8, imm: u16) -> Instruction {
                Instruction::with_imm16(Opcode::$variant, a, imm)
            }
        )*
    };
}

op_reg3! {
    "Add two registers." add Add;
    "Subtract two registers." sub Sub;
    "Multiply two registers." mul Mul;
    "Divide two registers." div Div;
    "Remainder of two registers." mod_ Mod;
    "Equality comparison." eq Eq;
    "Inequality comparison." neq Neq;
    "Less-than comparison." lt Lt;
    "Greater-than comparison." gt Gt;
    "Less-or-equal comparison." leq Leq;
    "Greater-or-equal comparison." geq Geq;
    "Bitwise and." band Band;
    "Bitwise or." bor Bor;
    "Bitwise xor." bxor Bxor;
    "Bitwise shift left." bshl Bshl;
    "Bitwise shift right." bshr Bshr;
    "Indexed read through the collection vtable." idx_get IdxGet;
    "Indexed write through the collection vtable." idx_set IdxSet;
    "Indexed write with a static element index." idx_set_static IdxSetStatic;
    "Call the function value in `a` with `b` stacked arguments." call_func_value CallFuncValue;
}

op_reg2! {
    "Logical negation." not Not;
    "Bitwise complement." bnot Bnot;
    "Arithmetic negation." neg Neg;
    "Boolean move: `b ← bool(a)`." mov_bool MovBool;
    "Append an element to an array." array_push ArrayPush;
    "Append a bound argument to a function value." bind_arg_to_func BindArgToFunc;
}

op_reg_imm! {
    "Load a small integer immediate." mov_u16 MovU16;
    "Load a constant-pool slot." load_const LoadConst;
    "Load a function value." load_func LoadFunc;
    "Store into a constant-pool slot." set_const SetConst;
    "Store a register into a local slot." mov_reg_local MovRegLocal;
    "Load a local slot into a register." mov_local_reg MovLocalReg;
    "Conditional forward jump on truthy." jif Jif;
    "Conditional forward jump on falsy." jnif Jnif;
    "Call a function by table index." call Call;
    "Allocate an array with a capacity hint." array_new ArrayNew;
    "Allocate a fixed-length tuple." tuple_new TupleNew;
    "Allocate a dictionary with a capacity hint." dict_new DictNew;
    "Allocate a class instance." class_new ClassNew;
    "Allocate a class instance pending field initialisation." class_new_initialized ClassNewInitialized;
    "Read a receiver field by slot." class_get_inner ClassGetInner;
    "Write a receiver field by slot." class_set_inner ClassSetInner;
}

/// Terminate the main function.
pub const fn exit() -> Instruction {
    Instruction::new(Opcode::Exit, 0, 0, 0)
}

/// No operation.
pub const fn nop() -> Instruction {
    Instruction::new(Opcode::Nop, 0, 0, 0)
}

/// Load `nil` into a register.
pub const fn load_nil(a: u8) -> Instruction {
    Instruction::new(Opcode::LoadNil, a, 0, 0)
}

/// Load the method receiver at method entry.
pub const fn load_self() -> Instruction {
    Instruction::new(Opcode::LoadSelf, 0, 0, 0)
}

/// Unconditional forward jump.
pub const fn jrel(imm: u16) -> Instruction {
    Instruction::with_imm16(Opcode::Jrel, 0, imm)
}

/// Unconditional backward jump.
pub const fn jrelb(imm: u16) -> Instruction {
    Instruction::with_imm16(Opcode::Jrelb, 0, imm)
}

/// Push a register onto the argument stack.
pub const fn push_arg(a: u8) -> Instruction {
    Instruction::new(Opcode::PushArg, a, 0, 0)
}

/// Return a register to the caller.
pub const fn ret(a: u8) -> Instruction {
    Instruction::new(Opcode::Ret, a, 0, 0)
}

/// Return a local slot to the caller.
pub const fn ret_local(local: u16) -> Instruction {
    Instruction::with_imm16(Opcode::RetLocal, 0, local)
}

/// Return `nil` to the caller.
pub const fn ret_null() -> Instruction {
    Instruction::new(Opcode::RetNull, 0, 0, 0)
}

/// Load an import table entry.
pub const fn import(idx: u16) -> Instruction {
    Instruction::with_imm16(Opcode::Import, 0, idx)
}

/// Raise a failure value.
pub const fn raise(a: u8) -> Instruction {
    Instruction::new(Opcode::Raise, a, 0, 0)
}

/// Print a register through the interpreter's print hook.
pub const fn print(a: u8) -> Instruction {
    Instruction::new(Opcode::Print, a, 0, 0)
}
