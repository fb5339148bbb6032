//! Growable ordered collection.

use std::cell::RefCell;
use std::fmt;

use itertools::Itertools;

use crate::value::Value;

use super::StructObj;

/// A dynamic vector of values.
#[derive(Debug, Default)]
pub struct Array {
    items: RefCell<Vec<Value>>,
}

impl Array {
    /// Create an empty array with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: RefCell::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append a value.
    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

impl StructObj for Array {
    fn kind_name(&self) -> &'static str {
        "array"
    }

    fn idx_get(&self, key: &Value) -> Option<Value> {
        let Value::Int(idx) = key else { return None };
        let idx = usize::try_from(*idx).ok()?;
        self.items.borrow().get(idx).cloned()
    }

    fn idx_set(&self, key: &Value, value: Value) -> bool {
        let Value::Int(idx) = key else { return false };
        let Ok(idx) = usize::try_from(*idx) else {
            return false;
        };
        let mut items = self.items.borrow_mut();
        match items.get_mut(idx) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn len(&self) -> i32 {
        self.items.borrow().len() as i32
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.items.borrow().iter().format(", "))
    }

    fn as_array(&self) -> Option<&Array> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_access() {
        let arr = Array::with_capacity(2);
        arr.push(Value::Int(10));
        arr.push(Value::Int(20));

        assert_eq!(arr.idx_get(&Value::Int(1)), Some(Value::Int(20)));
        assert_eq!(arr.idx_get(&Value::Int(2)), None);
        assert_eq!(arr.idx_get(&Value::str("x")), None);
        assert!(arr.idx_set(&Value::Int(0), Value::Int(1)));
        assert!(!arr.idx_set(&Value::Int(5), Value::Int(1)));
        assert_eq!(arr.len(), 2);
    }
}
