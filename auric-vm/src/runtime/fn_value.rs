//! Callable function values with bound arguments.

use std::cell::RefCell;

use crate::value::Value;

/// A first-class reference to a function-table entry, optionally
/// carrying a prefix of bound arguments.
///
/// `expr.f` binds `expr` as the first argument; a later call through the
/// value prepends the bound prefix to the stacked arguments.
#[derive(Debug)]
pub struct FnValue {
    fn_idx: u32,
    bound: RefCell<Vec<Value>>,
}

impl FnValue {
    /// A bare reference to function `fn_idx`.
    pub fn new(fn_idx: u32) -> Self {
        Self {
            fn_idx,
            bound: RefCell::new(Vec::new()),
        }
    }

    /// Index into the owning module's function table.
    pub fn fn_idx(&self) -> u32 {
        self.fn_idx
    }

    /// Append a bound argument.
    pub fn bind(&self, value: Value) {
        self.bound.borrow_mut().push(value);
    }

    /// Number of bound arguments.
    pub fn num_bound(&self) -> usize {
        self.bound.borrow().len()
    }

    /// The bound prefix followed by `args`.
    pub fn args_with_bound(&self, args: &[Value]) -> Vec<Value> {
        let bound = self.bound.borrow();
        let mut all = Vec::with_capacity(bound.len() + args.len());
        all.extend(bound.iter().cloned());
        all.extend(args.iter().cloned());
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_arguments_prefix_the_call() {
        let fv = FnValue::new(3);
        fv.bind(Value::Int(1));
        let all = fv.args_with_bound(&[Value::Int(2), Value::Int(3)]);
        assert_eq!(all, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }
}
