//! Per-call activation state.

use crate::function::BytecodeStorage;
use crate::value::Value;

/// One activation of a bytecode function.
///
/// Registers and locals start out as `nil`; the first `num_args` locals
/// take ownership of the caller-supplied arguments.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) regs: Vec<Value>,
    pub(crate) locals: Vec<Value>,
    pub(crate) arg_stack: Vec<Value>,
    /// The method receiver, set by `LOAD_SELF`.
    pub(crate) self_value: Value,
    /// Instance opened by `CLASS_NEW_INITIALIZED`, target of the
    /// following `CLASS_SET_INNER` run.
    pub(crate) pending_instance: Value,
}

impl Frame {
    pub(crate) fn new(bcs: &BytecodeStorage, args: Vec<Value>) -> Self {
        let mut locals = vec![Value::None; bcs.num_locals];
        for (slot, arg) in args.into_iter().take(bcs.num_locals).enumerate() {
            locals[slot] = arg;
        }
        Self {
            regs: vec![Value::None; bcs.num_registers],
            locals,
            arg_stack: Vec::new(),
            self_value: Value::None,
            pending_instance: Value::None,
        }
    }
}
