//! Reference-counted heap collections behind the dynamic value layer.

use std::fmt;

use crate::value::Value;

pub mod array;
pub mod class;
pub mod dict;
pub mod fn_value;
pub mod tuple;

pub use array::Array;
pub use class::ClassInstance;
pub use dict::Dict;
pub use tuple::Tuple;

/// The polymorphic collection interface.
///
/// One implementation per concrete heap shape; the indexed accessors are
/// how `IDX_GET`/`IDX_SET` reach any collection, and the coercion hooks
/// stand in for the original's vtable-pointer comparisons.
pub trait StructObj: fmt::Debug {
    /// Short type name, surfaced by `type_of` and error messages.
    fn kind_name(&self) -> &'static str;

    /// Indexed read; `None` means the key is absent or unsupported.
    fn idx_get(&self, key: &Value) -> Option<Value>;

    /// Indexed write; `false` means the key is absent or unsupported.
    fn idx_set(&self, key: &Value, value: Value) -> bool;

    /// Element count.
    fn len(&self) -> i32;

    /// Printed representation, used by the `print` hook.
    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Downcast to a class instance.
    fn as_class_instance(&self) -> Option<&ClassInstance> {
        None
    }

    /// Downcast to an array.
    fn as_array(&self) -> Option<&Array> {
        None
    }

    /// Downcast to a tuple.
    fn as_tuple(&self) -> Option<&Tuple> {
        None
    }

    /// Downcast to a dictionary.
    fn as_dict(&self) -> Option<&Dict> {
        None
    }
}
