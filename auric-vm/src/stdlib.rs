//! Builtin functions and the contract they are called through.
//!
//! Builtins are ordinary function-table entries installed before
//! parsing, so the parser resolves them like any user function. The set
//! here is deliberately small; a host embedding the interpreter extends
//! it the same way.

use crate::error::RuntimeError;
use crate::function::{FnFlags, Function, FunctionKind, NativeFn, NativeFnPtr};
use crate::interpreter::Vm;
use crate::program::ProgramData;
use crate::value::Value;

/// Register the builtin set into a module under construction.
pub fn install(p_data: &mut ProgramData) {
    let builtins: &[(&'static str, usize, NativeFnPtr)] = &[
        ("str", 1, native_str),
        ("int", 1, native_int),
        ("bool", 1, native_bool),
        ("len", 1, native_len),
        ("type_of", 1, native_type_of),
    ];
    for &(name, num_args, func) in builtins {
        let idx = p_data.fns.len();
        p_data.fns.push(Function {
            flags: FnFlags::empty(),
            kind: FunctionKind::Native(NativeFn {
                func,
                num_args,
                name,
            }),
        });
        p_data.fn_map.insert(name.to_owned(), idx);
        p_data.fn_names.push(name.to_owned());
    }
}

fn native_str(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(match &args[0] {
        Value::Str(s) => Value::Str(s.clone()),
        Value::Bool(b) => Value::str(if *b { "(true)" } else { "(false)" }),
        Value::Int(n) => Value::str(n.to_string()),
        _ => Value::str(""),
    })
}

fn native_int(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(match &args[0] {
        Value::Int(n) => *n,
        Value::Str(s) => parse_int_prefix(s),
        _ => 0,
    }))
}

fn native_bool(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args[0].is_truthy()))
}

fn native_len(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Int(match &args[0] {
        Value::Str(s) => s.len() as i32,
        Value::Struct(obj) => obj.len(),
        _ => 0,
    }))
}

fn native_type_of(_vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::str(args[0].kind_name()))
}

fn parse_int_prefix(s: &str) -> i32 {
    let mut num: i32 = 0;
    for ch in s.chars() {
        let Some(digit) = ch.to_digit(10) else { break };
        num = num.wrapping_mul(10).wrapping_add(digit as i32);
    }
    num
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parses_a_decimal_prefix() {
        assert_eq!(parse_int_prefix("123"), 123);
        assert_eq!(parse_int_prefix("42x"), 42);
        // Any non-digit stops the scan, a leading sign included.
        assert_eq!(parse_int_prefix("-42"), 0);
        assert_eq!(parse_int_prefix("x"), 0);
    }

    #[test]
    fn conversions_outside_int_and_str_collapse() {
        let mut vm = Vm::new();
        assert_eq!(
            native_int(&mut vm, &[Value::Bool(true)]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            native_int(&mut vm, &[Value::Double(3.7)]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            native_str(&mut vm, &[Value::Double(3.7)]).unwrap(),
            Value::str("")
        );
        assert_eq!(
            native_str(&mut vm, &[Value::Bool(false)]).unwrap(),
            Value::str("(false)")
        );
    }
}
