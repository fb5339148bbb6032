//! Class interfaces and instances.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::value::Value;

use super::StructObj;

bitflags::bitflags! {
    /// Class declaration flags.
    pub struct ClassFlags: u32 {
        /// Declared with `export`.
        const EXPORTED = 0x1;
    }
}

/// The shared per-class record: field layout and flags.
///
/// Two instances share behaviour iff they hold the same interface
/// (`Rc::ptr_eq`); dispatch and method entry both compare identity, not
/// structure.
#[derive(Debug)]
pub struct ClassInterface {
    name: String,
    fields: HashMap<String, u32>,
    /// Declaration flags.
    pub flags: ClassFlags,
}

impl ClassInterface {
    /// Create an interface with no fields.
    pub fn new(name: impl Into<String>, flags: ClassFlags) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
            flags,
        }
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a field, returning its slot; `None` if already declared.
    pub fn add_field(&mut self, name: &str) -> Option<u32> {
        let slot = self.fields.len() as u32;
        match self.fields.entry(name.to_owned()) {
            hashbrown::hash_map::Entry::Occupied(_) => None,
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(slot);
                Some(slot)
            }
        }
    }

    /// Slot of a declared field.
    pub fn field(&self, name: &str) -> Option<u32> {
        self.fields.get(name).copied()
    }

    /// Number of field slots.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

/// One object: an interface plus a value per field slot.
#[derive(Debug)]
pub struct ClassInstance {
    interface: Rc<ClassInterface>,
    fields: RefCell<Vec<Value>>,
}

impl ClassInstance {
    /// Allocate an instance with all fields `nil`.
    pub fn new(interface: Rc<ClassInterface>) -> Self {
        let fields = RefCell::new(vec![Value::None; interface.num_fields()]);
        Self { interface, fields }
    }

    /// The instance's interface.
    pub fn interface(&self) -> &Rc<ClassInterface> {
        &self.interface
    }

    /// Read a field slot.
    pub fn field(&self, slot: usize) -> Value {
        self.fields
            .borrow()
            .get(slot)
            .cloned()
            .unwrap_or(Value::None)
    }

    /// Write a field slot.
    pub fn set_field(&self, slot: usize, value: Value) {
        if let Some(dest) = self.fields.borrow_mut().get_mut(slot) {
            *dest = value;
        }
    }
}

impl StructObj for ClassInstance {
    fn kind_name(&self) -> &'static str {
        "instance"
    }

    fn idx_get(&self, _key: &Value) -> Option<Value> {
        None
    }

    fn idx_set(&self, _key: &Value, _value: Value) -> bool {
        false
    }

    fn len(&self) -> i32 {
        self.interface.num_fields() as i32
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.interface.name)
    }

    fn as_class_instance(&self) -> Option<&ClassInstance> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_slotted_in_declaration_order() {
        let mut iface = ClassInterface::new("Point", ClassFlags::empty());
        assert_eq!(iface.add_field("x"), Some(0));
        assert_eq!(iface.add_field("y"), Some(1));
        assert_eq!(iface.add_field("x"), None);
        assert_eq!(iface.field("y"), Some(1));
    }

    #[test]
    fn instances_compare_interfaces_by_identity() {
        let a = Rc::new(ClassInterface::new("A", ClassFlags::empty()));
        let b = Rc::new(ClassInterface::new("A", ClassFlags::empty()));
        let inst = ClassInstance::new(Rc::clone(&a));
        assert!(Rc::ptr_eq(inst.interface(), &a));
        assert!(!Rc::ptr_eq(inst.interface(), &b));
    }
}
