#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use auric_vm::prelude::*;

/// Run a program, capturing everything `print` emits.
pub fn run_program(program: &Program) -> Result<(String, Value), RuntimeError> {
    let out = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&out);
    let mut vm = Vm::with_print_hook(Box::new(move |value| {
        sink.borrow_mut().push_str(&value.to_string());
    }));
    let result = vm.run_main(program)?;
    let printed = out.borrow().clone();
    Ok((printed, result))
}

/// Parse and run, returning the captured output and the main result.
pub fn eval(src: &str) -> Result<(String, Value), RuntimeError> {
    let program = parse(src).expect("program should parse");
    run_program(&program)
}

/// Parse and run a program that is expected to succeed.
pub fn run(src: &str) -> String {
    eval(src).expect("program should run").0
}
