use std::cell::RefCell;
use std::rc::Rc;

use auric_vm::prelude::*;

mod common;
use common::{eval, run, run_program};

#[test]
fn hello_world() {
    assert_eq!(run(r#"print "hi";"#), "hi");
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("print 2 + 3 * 4;"), "14");
    assert_eq!(run("print (2 + 3) * 4;"), "20");
    assert_eq!(run("print 7 % 4 + 10 / 2;"), "8");
}

#[test]
fn doubles() {
    assert_eq!(run("print 1.5 + 2.25;"), "3.75");
    assert_eq!(run("print 2.5;"), "2.5");
}

#[test]
fn hex_and_char_literals() {
    assert_eq!(run("print 0x10;"), "16");
    assert_eq!(run("print 'A';"), "65");
    assert_eq!(run(r"print '\n';"), "10");
}

#[test]
fn recursion() {
    let src = "def f(n) { if n <= 1 { return n } return f(n-1)+f(n-2) } print f(10);";
    assert_eq!(run(src), "55");
}

#[test]
fn string_concat() {
    assert_eq!(run(r#"print "a"+"b";"#), "ab");
    assert_eq!(run("print \"x\\ny\";"), "x\ny");
}

#[test]
fn comparisons() {
    assert_eq!(run("print 1 < 2;"), "(true)");
    assert_eq!(run(r#"print "abc" < "abd";"#), "(true)");
    assert_eq!(run("print 3 == 3, 3 != 3;"), "(true)(false)");
}

#[test]
fn logical_and_short_circuits() {
    let src = r#"def side() { print "x"; return true } false && side();"#;
    assert_eq!(run(src), "");
}

#[test]
fn logical_or_short_circuits() {
    let src = r#"def side() { print "x"; return true } true || side();"#;
    assert_eq!(run(src), "");
}

#[test]
fn logical_results_are_booleans() {
    assert_eq!(run("print true && false;"), "(false)");
    assert_eq!(run("print false || true;"), "(true)");
}

#[test]
fn while_loops() {
    let src = "i = 0; while i < 3 { print i; i = i + 1; }";
    assert_eq!(run(src), "012");
}

#[test]
fn if_else_chains() {
    let src = r#"
        def grade(n) {
            if n >= 90 { return "a" } else if n >= 80 { return "b" } else { return "c" }
        }
        print grade(95), grade(85), grade(10);
    "#;
    assert_eq!(run(src), "abc");
}

#[test]
fn compound_assignment() {
    assert_eq!(run("x = 1; x += 4; print x;"), "5");
    assert_eq!(run("x = 10; x -= 1; x *= 3; print x;"), "27");
}

#[test]
fn unary_operators() {
    assert_eq!(run("print !true;"), "(false)");
    assert_eq!(run("print ~0;"), "-1");
    assert_eq!(run("print (-5) + 6;"), "1");
}

#[test]
fn bitwise_operators() {
    assert_eq!(run("print 6 & 3, 6 | 3, 6 ^ 3;"), "275");
    assert_eq!(run("print 1 << 4, 32 >> 2;"), "168");
}

#[test]
fn arrays() {
    assert_eq!(run("a = [1, 2, 3]; print a[0] + a[2];"), "4");
    assert_eq!(run("a = [1, 2, 3]; a[1] = 5; print a[1];"), "5");
    assert_eq!(run("a = [1, 2]; a[0] += 9; print a[0];"), "10");
    assert_eq!(run("print [1, 2, 3];"), "[1, 2, 3]");
    assert_eq!(run("print len([1, 2, 3]);"), "3");
}

#[test]
fn tuples() {
    assert_eq!(run(r#"t = #[1, "two", 3]; print t[1];"#), "two");
    assert_eq!(run("print len(#[1, 2]);"), "2");
}

#[test]
fn dicts() {
    assert_eq!(run(r#"d = {}; d["k"] = 42; print d["k"];"#), "42");
    assert_eq!(run(r#"d = {}; d[1] = "a"; d[true] = "b"; print len(d);"#), "2");
    assert_eq!(run(r#"d = {}; print d["missing"];"#), "(nil)");
}

#[test]
fn forward_declared_functions_resolve() {
    let src = "def a() { return b() } def b() { return 7 } print a();";
    assert_eq!(run(src), "7");
}

#[test]
fn constants() {
    assert_eq!(run(r#"const GREETING = "yo"; print GREETING;"#), "yo");
    assert_eq!(run("const K = 2; def f() { return K } print f();"), "2");
}

#[test]
fn function_values() {
    let src = "def double(x) { return x * 2 } f = .double; print f.(21);";
    assert_eq!(run(src), "42");
}

#[test]
fn bound_arguments_prefix_calls() {
    let src = "def add(a, b) { return a + b } f = 10.add; print f.(5);";
    assert_eq!(run(src), "15");
}

#[test]
fn function_value_arity_is_checked() {
    let src = "def add(a, b) { return a + b } f = .add; f.(1);";
    let err = eval(src).unwrap_err();
    assert!(matches!(err, RuntimeError::CallArity { expected: 2, got: 1, .. }));
}

#[test]
fn print_lists() {
    assert_eq!(run("print 1, 2, 3;"), "123");
}

#[test]
fn builtin_conversions_round_trip() {
    assert_eq!(run(r#"print str(int("123"));"#), "123");
    assert_eq!(run(r#"print int("42") + 1;"#), "43");
    assert_eq!(run("print type_of(1), type_of(1.0), type_of(\"s\");"), "intdoublestr");
    assert_eq!(run("print bool(3);"), "(true)");
}

#[test]
fn nil_prints_as_nil() {
    assert_eq!(run("print nil;"), "(nil)");
}

#[test]
fn raise_propagates_to_the_embedder() {
    let err = eval(r#"def f() { raise "boom" } f();"#).unwrap_err();
    let RuntimeError::Raised { value, .. } = err else {
        panic!("expected a raise, got {err:?}");
    };
    assert_eq!(value, Value::str("boom"));
}

#[test]
fn binop_type_error_reports_and_continues() {
    let program = parse(r#"print 1 + "a"; print 9;"#).unwrap();
    let out = Rc::new(RefCell::new(String::new()));
    let errors = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&out);
    let mut vm = Vm::with_print_hook(Box::new(move |value| {
        sink.borrow_mut().push_str(&value.to_string());
    }));
    let error_sink = Rc::clone(&errors);
    vm.set_error_hook(Box::new(move |msg| error_sink.borrow_mut().push(msg.to_owned())));

    vm.run_main(&program).unwrap();
    // The failed addition leaves nil behind and execution continues.
    assert_eq!(out.borrow().as_str(), "(nil)9");
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("incompatible values for binary operation"));
    assert!(errors[0].contains("1 | print 1 + \"a\";"));
}

#[test]
fn undefined_variable_is_a_parse_error() {
    assert!(matches!(
        parse("print zzz;"),
        Err(ParseError::UnknownVariable { .. })
    ));
}

#[test]
fn output_is_deterministic_across_runs() {
    let src = "def f(n) { if n <= 1 { return n } return f(n-1)+f(n-2) } print f(12);";
    let program = parse(src).unwrap();
    let first = run_program(&program).unwrap().0;
    let second = run_program(&program).unwrap().0;
    assert_eq!(first, second);
    assert_eq!(first, "144");
}

#[test]
fn register_choice_does_not_leak_into_results() {
    // The same computation phrased with and without temporaries.
    let flat = run("print ((1+2)*(3+4))+((5+6)*(7+8));");
    let with_locals = run("a = (1+2)*(3+4); b = (5+6)*(7+8); print a + b;");
    assert_eq!(flat, with_locals);
    assert_eq!(flat, "186");
}
