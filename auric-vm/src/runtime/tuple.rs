//! Fixed-length collection.

use std::cell::RefCell;
use std::fmt;

use itertools::Itertools;

use crate::value::Value;

use super::StructObj;

/// A fixed-length vector of values; the length is set at allocation.
#[derive(Debug)]
pub struct Tuple {
    items: RefCell<Vec<Value>>,
}

impl Tuple {
    /// Create a tuple of `len` `nil` slots.
    pub fn new(len: usize) -> Self {
        Self {
            items: RefCell::new(vec![Value::None; len]),
        }
    }

    /// Write a slot by static index; out-of-range writes are dropped.
    pub fn set_static(&self, idx: usize, value: Value) -> bool {
        let mut items = self.items.borrow_mut();
        match items.get_mut(idx) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl StructObj for Tuple {
    fn kind_name(&self) -> &'static str {
        "tuple"
    }

    fn idx_get(&self, key: &Value) -> Option<Value> {
        let Value::Int(idx) = key else { return None };
        let idx = usize::try_from(*idx).ok()?;
        self.items.borrow().get(idx).cloned()
    }

    fn idx_set(&self, key: &Value, value: Value) -> bool {
        let Value::Int(idx) = key else { return false };
        match usize::try_from(*idx) {
            Ok(idx) => self.set_static(idx, value),
            Err(_) => false,
        }
    }

    fn len(&self) -> i32 {
        self.items.borrow().len() as i32
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#[{}]", self.items.borrow().iter().format(", "))
    }

    fn as_tuple(&self) -> Option<&Tuple> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_fixed() {
        let t = Tuple::new(2);
        assert!(t.set_static(0, Value::Int(1)));
        assert!(t.set_static(1, Value::Int(2)));
        assert!(!t.set_static(2, Value::Int(3)));
        assert_eq!(t.len(), 2);
        assert_eq!(t.idx_get(&Value::Int(0)), Some(Value::Int(1)));
    }
}
