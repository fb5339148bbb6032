//! Call sequencing across the function-table variants.

use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::{FnFlags, FunctionKind};
use crate::program::ProgramData;
use crate::runtime::fn_value::FnValue;
use crate::value::Value;

use super::Vm;

/// One resolution step while chasing importer and dispatch entries.
enum Step {
    Next(usize),
    NextInModule(Rc<ProgramData>, usize),
}

impl Vm {
    /// Invoke function `idx` of `p_data` with `args`.
    ///
    /// Importer entries hop into their resolved module; dispatch entries
    /// select the implementation matching the receiver's interface. The
    /// chain always terminates: importer targets are concrete exports
    /// and dispatch arms are bytecode functions.
    pub(crate) fn call_function(
        &mut self,
        p_data: &Rc<ProgramData>,
        idx: usize,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let mut cur = Rc::clone(p_data);
        let mut idx = idx;
        loop {
            let step = {
                let func = cur.fns.get(idx).ok_or(RuntimeError::MalformedBytecode)?;
                match &func.kind {
                    FunctionKind::Bytecode(bcs) => {
                        if func.flags.contains(FnFlags::HAS_CLASS)
                            && !receiver_matches(bcs.class_interface.as_ref(), args.first())
                        {
                            return Err(RuntimeError::ReceiverMismatch);
                        }
                        return self.exec(bcs, func.flags, &cur, args);
                    }
                    FunctionKind::Native(native) => {
                        let entry = native.func;
                        return entry(self, &args);
                    }
                    FunctionKind::Import(import) => match import.target.get() {
                        Some(target) => Step::NextInModule(
                            Rc::clone(&self.modules[target.module]),
                            target.fn_idx,
                        ),
                        None => {
                            return Err(RuntimeError::UndefinedFunction {
                                name: import.name.clone(),
                            })
                        }
                    },
                    FunctionKind::Dispatch(dispatch) => {
                        let receiver = args.first().and_then(|value| match value {
                            Value::Struct(obj) => obj.as_class_instance(),
                            _ => None,
                        });
                        let arm = receiver.and_then(|instance| {
                            dispatch.instances.iter().find(|inst| {
                                Rc::ptr_eq(&inst.interface, instance.interface())
                            })
                        });
                        match arm.map(|inst| inst.fn_idx).or(dispatch.fallback) {
                            Some(next) => Step::Next(next),
                            None => {
                                return Err(RuntimeError::DispatchMiss {
                                    name: cur.fn_name(idx).to_owned(),
                                })
                            }
                        }
                    }
                    FunctionKind::None { .. } => {
                        return Err(RuntimeError::UndefinedFunction {
                            name: cur.fn_name(idx).to_owned(),
                        })
                    }
                }
            };
            match step {
                Step::Next(next) => idx = next,
                Step::NextInModule(module, next) => {
                    cur = module;
                    idx = next;
                }
            }
        }
    }

    /// Invoke a first-class function value, bound arguments included.
    pub(crate) fn call_fn_value(
        &mut self,
        p_data: &Rc<ProgramData>,
        fn_value: &FnValue,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let idx = fn_value.fn_idx() as usize;
        let func = p_data
            .fns
            .get(idx)
            .ok_or(RuntimeError::MalformedBytecode)?;
        if matches!(func.kind, FunctionKind::Dispatch(_)) && fn_value.num_bound() > 0 {
            return Err(RuntimeError::BindDispatch);
        }
        let expected = func.num_args();
        if expected != args.len() {
            return Err(RuntimeError::CallArity {
                name: p_data.fn_name(idx).to_owned(),
                got: args.len(),
                expected,
            });
        }
        self.call_function(p_data, idx, args)
    }
}

fn receiver_matches(
    interface: Option<&Rc<crate::runtime::class::ClassInterface>>,
    receiver: Option<&Value>,
) -> bool {
    let Some(interface) = interface else {
        return false;
    };
    match receiver {
        Some(Value::Struct(obj)) => obj
            .as_class_instance()
            .is_some_and(|instance| Rc::ptr_eq(instance.interface(), interface)),
        _ => false,
    }
}
