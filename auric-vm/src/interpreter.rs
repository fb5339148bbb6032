//! The register virtual machine.

use std::path::PathBuf;
use std::rc::Rc;

use hashbrown::HashMap;

use auric_asm::{Instruction, Opcode};

use crate::error::{source_excerpt, RuntimeError, Span};
use crate::function::{BytecodeStorage, FnFlags};
use crate::program::{Program, ProgramData};
use crate::runtime::{Array, ClassInstance, Dict, StructObj, Tuple};
use crate::value::Value;

mod call;
mod frame;
mod imports;

use frame::Frame;

/// Where a module path stands in the load process.
#[derive(Debug, Clone, Copy)]
enum ModuleState {
    /// Reserved by an import currently executing the module's top level.
    Reserved,
    /// Loaded; the index points into the interpreter's module table.
    Loaded(usize),
}

/// The interpreter context: constant cache, loaded modules and output
/// hooks. One per interpreter instance, threaded explicitly through
/// every call — never global.
pub struct Vm {
    /// Lazily materialised constants, one slot per constant-pool entry
    /// of every registered module (offset by `tl_constant_start`).
    consts: Vec<Option<Value>>,
    /// Loaded modules; index 0 is the main program once running.
    modules: Vec<Rc<ProgramData>>,
    modules_by_path: HashMap<PathBuf, ModuleState>,
    print_hook: Box<dyn FnMut(&Value)>,
    error_hook: Box<dyn FnMut(&str)>,
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("consts", &self.consts.len())
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// An interpreter printing to stdout and reporting to stderr.
    ///
    /// `print` emits no trailing newline; programs print `"\n"`
    /// themselves.
    pub fn new() -> Self {
        Self::with_print_hook(Box::new(|value| print!("{value}")))
    }

    /// An interpreter with a custom `print` sink.
    pub fn with_print_hook(print_hook: Box<dyn FnMut(&Value)>) -> Self {
        Self {
            consts: Vec::new(),
            modules: Vec::new(),
            modules_by_path: HashMap::new(),
            print_hook,
            error_hook: Box::new(|msg| eprintln!("{msg}")),
        }
    }

    /// Replace the sink for recoverable runtime error reports.
    pub fn set_error_hook(&mut self, hook: Box<dyn FnMut(&str)>) {
        self.error_hook = hook;
    }

    /// Execute a program's top level and return its result.
    pub fn run_main(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let module_idx = self.register_module(Rc::clone(&program.data));
        if let Some(file) = &program.data.file {
            let key = file.canonicalize().unwrap_or_else(|_| file.clone());
            self.modules_by_path
                .insert(key, ModuleState::Loaded(module_idx));
        }
        self.exec(&program.main, FnFlags::empty(), &program.data, Vec::new())
    }

    /// Track a module and give it a constant-cache window.
    fn register_module(&mut self, data: Rc<ProgramData>) -> usize {
        data.tl_constant_start.set(self.consts.len());
        self.consts
            .extend(std::iter::repeat_with(|| None).take(data.data_vals.len()));
        self.modules.push(data);
        self.modules.len() - 1
    }

    /// Materialise a constant through the cache; a string slot allocates
    /// its heap form at most once per interpreter.
    fn load_const(&mut self, p_data: &ProgramData, idx: usize) -> Value {
        let cache_idx = p_data.tl_constant_start.get() + idx;
        if let Some(value) = &self.consts[cache_idx] {
            return value.clone();
        }
        let data_val = &p_data.data_vals[idx];
        match &data_val.backing {
            Some(range) => {
                let text = String::from_utf8_lossy(&p_data.data_buf[range.clone()]).into_owned();
                let value = Value::str(text);
                self.consts[cache_idx] = Some(value.clone());
                value
            }
            None => data_val.value.clone(),
        }
    }

    /// Report a recoverable error with its source attribution, or turn
    /// it into a failure result inside a `may_fail` function.
    fn recover(
        &mut self,
        error: RuntimeError,
        flags: FnFlags,
        p_data: &ProgramData,
    ) -> Result<(), RuntimeError> {
        if flags.contains(FnFlags::MAY_FAIL) {
            return Err(error);
        }
        let pos = match &error {
            RuntimeError::IncompatibleBinOp { pos, .. }
            | RuntimeError::IncompatibleUnaryOp { pos, .. }
            | RuntimeError::NotIndexable { pos, .. } => *pos,
            _ => None,
        };
        let path = p_data
            .file
            .as_deref()
            .map_or_else(|| "(source)".to_owned(), |p| p.display().to_string());
        let mut msg = format!("interpreter error in {path}: {error}");
        if let Some(pos) = pos {
            msg.push('\n');
            msg.push_str(&source_excerpt(&p_data.source, Span::at(pos)));
        }
        (self.error_hook)(&msg);
        Ok(())
    }

    /// Execute one bytecode function.
    ///
    /// `args` are moved into the first locals; the caller keeps the
    /// `p_data` the function belongs to so cross-module calls resolve
    /// against the right tables.
    pub(crate) fn exec(
        &mut self,
        bcs: &BytecodeStorage,
        flags: FnFlags,
        p_data: &Rc<ProgramData>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let mut frame = Frame::new(bcs, args);
        let bc = &bcs.bc;
        let mut pc = 0usize;

        loop {
            if pc + Instruction::SIZE > bc.len() {
                return Err(RuntimeError::MalformedBytecode);
            }
            let op = Opcode::try_from(bc[pc]).map_err(|_| RuntimeError::MalformedBytecode)?;
            let a = bc[pc + 1];
            let b = bc[pc + 2];
            let c = bc[pc + 3];
            let imm = u16::from_le_bytes([b, c]);
            tracing::trace!(pc, ?op, a, b, c, imm, "dispatch");

            if !matches!(op, Opcode::ClassSetInner | Opcode::ClassNewInitialized) {
                frame.pending_instance = Value::None;
            }

            match op {
                Opcode::Exit => return Ok(Value::None),
                Opcode::Nop => {}
                Opcode::MovU16 => frame.regs[usize::from(a)] = Value::Int(i32::from(imm)),
                Opcode::MovBool => frame.regs[usize::from(b)] = Value::Bool(a != 0),
                Opcode::LoadConst => {
                    frame.regs[usize::from(a)] = self.load_const(p_data, usize::from(imm));
                }
                Opcode::LoadNil => frame.regs[usize::from(a)] = Value::None,
                Opcode::LoadFunc => {
                    frame.regs[usize::from(a)] = Value::Fn(Rc::new(
                        crate::runtime::fn_value::FnValue::new(u32::from(imm)),
                    ));
                }
                Opcode::LoadSelf => frame.self_value = frame.locals[0].clone(),
                Opcode::SetConst => {
                    let cache_idx = p_data.tl_constant_start.get() + usize::from(imm);
                    self.consts[cache_idx] = Some(frame.regs[usize::from(a)].clone());
                }
                Opcode::MovRegLocal => {
                    frame.locals[usize::from(imm)] = frame.regs[usize::from(a)].clone();
                }
                Opcode::MovLocalReg => {
                    frame.regs[usize::from(a)] = frame.locals[usize::from(imm)].clone();
                }

                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Eq
                | Opcode::Neq
                | Opcode::Lt
                | Opcode::Gt
                | Opcode::Leq
                | Opcode::Geq
                | Opcode::Band
                | Opcode::Bor
                | Opcode::Bxor
                | Opcode::Bshl
                | Opcode::Bshr => {
                    let lhs = &frame.regs[usize::from(a)];
                    let rhs = &frame.regs[usize::from(b)];
                    let result = match op {
                        Opcode::Add => lhs.add(rhs),
                        Opcode::Sub => lhs.sub(rhs),
                        Opcode::Mul => lhs.mul(rhs),
                        Opcode::Div => lhs.div(rhs),
                        Opcode::Mod => lhs.rem(rhs),
                        Opcode::Eq => Some(Value::Bool(lhs.equals(rhs))),
                        Opcode::Neq => Some(Value::Bool(!lhs.equals(rhs))),
                        Opcode::Lt => lhs.lt(rhs),
                        Opcode::Gt => lhs.gt(rhs),
                        Opcode::Leq => lhs.leq(rhs),
                        Opcode::Geq => lhs.geq(rhs),
                        Opcode::Band => lhs.bitand(rhs),
                        Opcode::Bor => lhs.bitor(rhs),
                        Opcode::Bxor => lhs.bitxor(rhs),
                        Opcode::Bshl => lhs.shl(rhs),
                        Opcode::Bshr => lhs.shr(rhs),
                        _ => unreachable!(),
                    };
                    match result {
                        Some(value) => frame.regs[usize::from(c)] = value,
                        None => {
                            let error = RuntimeError::IncompatibleBinOp {
                                left: lhs.clone(),
                                right: rhs.clone(),
                                pos: p_data.source_pos(bcs.func_idx, pc),
                            };
                            self.recover(error, flags, p_data)?;
                            frame.regs[usize::from(c)] = Value::None;
                        }
                    }
                }

                Opcode::Not => {
                    frame.regs[usize::from(b)] =
                        Value::Bool(!frame.regs[usize::from(a)].is_truthy());
                }
                Opcode::Bnot | Opcode::Neg => {
                    let src = &frame.regs[usize::from(a)];
                    let result = match op {
                        Opcode::Bnot => src.bitnot(),
                        _ => src.neg(),
                    };
                    match result {
                        Some(value) => frame.regs[usize::from(b)] = value,
                        None => {
                            let error = RuntimeError::IncompatibleUnaryOp {
                                value: src.clone(),
                                pos: p_data.source_pos(bcs.func_idx, pc),
                            };
                            self.recover(error, flags, p_data)?;
                            frame.regs[usize::from(b)] = Value::None;
                        }
                    }
                }

                Opcode::Jif | Opcode::Jnif => {
                    let truthy = frame.regs[usize::from(a)].is_truthy();
                    if truthy == (op == Opcode::Jif) {
                        pc += usize::from(imm) * Instruction::SIZE;
                        continue;
                    }
                }
                Opcode::Jrel => {
                    pc += usize::from(imm) * Instruction::SIZE;
                    continue;
                }
                Opcode::Jrelb => {
                    pc -= usize::from(imm) * Instruction::SIZE;
                    continue;
                }

                Opcode::PushArg => frame.arg_stack.push(frame.regs[usize::from(a)].clone()),
                Opcode::Call => {
                    let idx = usize::from(imm);
                    let num_args = p_data
                        .fns
                        .get(idx)
                        .ok_or(RuntimeError::MalformedBytecode)?
                        .num_args();
                    let start = frame
                        .arg_stack
                        .len()
                        .checked_sub(num_args)
                        .ok_or(RuntimeError::MalformedBytecode)?;
                    let args: Vec<Value> = frame.arg_stack.drain(start..).collect();
                    let ret = self.call_function(p_data, idx, args)?;
                    frame.regs[usize::from(a)] = ret;
                }
                Opcode::CallFuncValue => {
                    let Value::Fn(fn_value) = frame.regs[usize::from(a)].clone() else {
                        return Err(RuntimeError::NotCallable);
                    };
                    let start = frame
                        .arg_stack
                        .len()
                        .checked_sub(usize::from(b))
                        .ok_or(RuntimeError::MalformedBytecode)?;
                    let stacked: Vec<Value> = frame.arg_stack.drain(start..).collect();
                    let args = fn_value.args_with_bound(&stacked);
                    let ret = self.call_fn_value(p_data, &fn_value, args)?;
                    frame.regs[usize::from(c)] = ret;
                }
                Opcode::BindArgToFunc => {
                    let Value::Fn(fn_value) = &frame.regs[usize::from(a)] else {
                        return Err(RuntimeError::NotCallable);
                    };
                    fn_value.bind(frame.regs[usize::from(b)].clone());
                }

                Opcode::Ret => {
                    return Ok(std::mem::take(&mut frame.regs[usize::from(a)]));
                }
                Opcode::RetLocal => {
                    return Ok(std::mem::take(&mut frame.locals[usize::from(imm)]));
                }
                Opcode::RetNull => return Ok(Value::None),

                Opcode::Import => self.exec_import(p_data, usize::from(imm))?,

                Opcode::ArrayNew => {
                    frame.regs[usize::from(a)] =
                        Value::Struct(Rc::new(Array::with_capacity(usize::from(imm))));
                }
                Opcode::ArrayPush => {
                    let value = frame.regs[usize::from(b)].clone();
                    if let Value::Struct(obj) = &frame.regs[usize::from(a)] {
                        if let Some(array) = obj.as_array() {
                            array.push(value);
                        }
                    }
                }
                Opcode::TupleNew => {
                    frame.regs[usize::from(a)] =
                        Value::Struct(Rc::new(Tuple::new(usize::from(imm))));
                }
                Opcode::DictNew => {
                    frame.regs[usize::from(a)] =
                        Value::Struct(Rc::new(Dict::with_capacity(usize::from(imm))));
                }

                Opcode::IdxGet => {
                    let result = match &frame.regs[usize::from(a)] {
                        Value::Struct(obj) => obj.idx_get(&frame.regs[usize::from(b)]),
                        other => {
                            let error = RuntimeError::NotIndexable {
                                kind: other.kind_name(),
                                pos: p_data.source_pos(bcs.func_idx, pc),
                            };
                            self.recover(error, flags, p_data)?;
                            None
                        }
                    };
                    frame.regs[usize::from(c)] = result.unwrap_or(Value::None);
                }
                Opcode::IdxSet => {
                    let value = frame.regs[usize::from(c)].clone();
                    if let Value::Struct(obj) = &frame.regs[usize::from(a)] {
                        obj.idx_set(&frame.regs[usize::from(b)], value);
                    }
                }
                Opcode::IdxSetStatic => {
                    let value = frame.regs[usize::from(c)].clone();
                    if let Value::Struct(obj) = &frame.regs[usize::from(a)] {
                        obj.idx_set(&Value::Int(i32::from(b)), value);
                    }
                }

                Opcode::ClassNew | Opcode::ClassNewInitialized => {
                    let interface = p_data
                        .classes
                        .get(usize::from(imm))
                        .ok_or(RuntimeError::MalformedBytecode)?;
                    let instance: Rc<dyn StructObj> =
                        Rc::new(ClassInstance::new(Rc::clone(interface)));
                    let value = Value::Struct(instance);
                    if op == Opcode::ClassNewInitialized {
                        frame.pending_instance = value.clone();
                    }
                    frame.regs[usize::from(a)] = value;
                }
                Opcode::ClassGetInner => {
                    let Some(instance) = as_instance(&frame.self_value) else {
                        return Err(RuntimeError::ReceiverMismatch);
                    };
                    frame.regs[usize::from(a)] = instance.field(usize::from(imm));
                }
                Opcode::ClassSetInner => {
                    let target = if matches!(frame.pending_instance, Value::Struct(_)) {
                        &frame.pending_instance
                    } else {
                        &frame.self_value
                    };
                    let Some(instance) = as_instance(target) else {
                        return Err(RuntimeError::ReceiverMismatch);
                    };
                    instance.set_field(usize::from(imm), frame.regs[usize::from(a)].clone());
                }

                Opcode::Raise => {
                    return Err(RuntimeError::Raised {
                        value: frame.regs[usize::from(a)].clone(),
                        pos: p_data.source_pos(bcs.func_idx, pc),
                    });
                }
                Opcode::Print => (self.print_hook)(&frame.regs[usize::from(a)]),
            }
            pc += Instruction::SIZE;
        }
    }
}

fn as_instance(value: &Value) -> Option<&ClassInstance> {
    match value {
        Value::Struct(obj) => obj.as_class_instance(),
        _ => None,
    }
}
