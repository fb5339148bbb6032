//! Function-table entries.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{RuntimeError, Span};
use crate::interpreter::Vm;
use crate::runtime::class::ClassInterface;
use crate::value::Value;

bitflags::bitflags! {
    /// Function declaration flags.
    pub struct FnFlags: u32 {
        /// Declared with `export`; callable across modules.
        const EXPORTED = 0x1;
        /// Declared with a class receiver.
        const HAS_CLASS = 0x2;
        /// Contains a `raise`; failures propagate as the call result.
        const MAY_FAIL = 0x4;
    }
}

/// A compiled function's immutable code plus its metadata.
#[derive(Debug)]
pub struct BytecodeStorage {
    /// Emitted bytecode, a multiple of 4 bytes.
    pub bc: Vec<u8>,
    /// Declared parameter count (including the receiver for methods).
    pub num_args: usize,
    /// Local slots, parameters first.
    pub num_locals: usize,
    /// Registers the code addresses; at most 256.
    pub num_registers: usize,
    /// Receiver interface for class methods.
    pub class_interface: Option<Rc<ClassInterface>>,
    /// First source-map entry belonging to this function.
    pub source_map_start: usize,
    /// Own index in the function table.
    pub func_idx: usize,
}

/// Calling contract for native builtins.
pub type NativeFnPtr = fn(&mut Vm, &[Value]) -> Result<Value, RuntimeError>;

/// A function provided by the host.
#[derive(Debug, Clone, Copy)]
pub struct NativeFn {
    /// Entry point.
    pub func: NativeFnPtr,
    /// Declared parameter count.
    pub num_args: usize,
    /// Name used in diagnostics.
    pub name: &'static str,
}

/// Resolved target of an importer entry.
#[derive(Debug, Clone, Copy)]
pub struct ImportTarget {
    /// Index into the interpreter's loaded-module table.
    pub module: usize,
    /// Function index within that module.
    pub fn_idx: usize,
}

/// A stub that forwards calls into another module.
///
/// Resolution is by indices filled in when the import executes, not by
/// pointers into the foreign module.
#[derive(Debug)]
pub struct ImportFn {
    /// Parameter count expected by the call sites.
    pub num_args: usize,
    /// Index of the module alias within the importing module.
    pub module_idx: usize,
    /// Name to resolve in the target module.
    pub name: String,
    /// Filled on first resolution.
    pub target: Cell<Option<ImportTarget>>,
}

/// One receiver-specific implementation of a dispatch function.
#[derive(Debug)]
pub struct DispatchInstance {
    /// Implementation's function index.
    pub fn_idx: usize,
    /// Receiver interface selecting this implementation.
    pub interface: Rc<ClassInterface>,
}

/// A function that selects its implementation from the first argument's
/// class interface.
#[derive(Debug)]
pub struct DispatchFn {
    /// Parameter count shared by every implementation.
    pub num_args: usize,
    /// Receiver-specific implementations.
    pub instances: Vec<DispatchInstance>,
    /// Class-free implementation, if any.
    pub fallback: Option<usize>,
}

/// The ways a function-table entry can be implemented.
#[derive(Debug)]
pub enum FunctionKind {
    /// Compiled bytecode.
    Bytecode(BytecodeStorage),
    /// Host-provided builtin.
    Native(NativeFn),
    /// Cross-module forwarding stub.
    Import(ImportFn),
    /// Receiver-class dispatch table.
    Dispatch(DispatchFn),
    /// Forward declaration; must be replaced before execution ends the
    /// parse, and calling one at runtime is an error.
    None {
        /// Arity implied by the forward call.
        num_args: usize,
        /// Location of the forward call, for diagnostics.
        span: Span,
    },
}

/// A function-table entry.
#[derive(Debug)]
pub struct Function {
    /// Declaration flags.
    pub flags: FnFlags,
    /// Implementation.
    pub kind: FunctionKind,
}

impl Function {
    /// A forward-declaration placeholder.
    pub fn forward(num_args: usize, span: Span) -> Self {
        Self {
            flags: FnFlags::empty(),
            kind: FunctionKind::None { num_args, span },
        }
    }

    /// Declared parameter count.
    pub fn num_args(&self) -> usize {
        match &self.kind {
            FunctionKind::Bytecode(bcs) => bcs.num_args,
            FunctionKind::Native(native) => native.num_args,
            FunctionKind::Import(import) => import.num_args,
            FunctionKind::Dispatch(dispatch) => dispatch.num_args,
            FunctionKind::None { num_args, .. } => *num_args,
        }
    }

    /// Whether the entry is still a forward declaration.
    pub fn is_forward(&self) -> bool {
        matches!(self.kind, FunctionKind::None { .. })
    }
}
