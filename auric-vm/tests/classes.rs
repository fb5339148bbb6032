use auric_vm::prelude::*;

mod common;
use common::{eval, run};

#[test]
fn methods_dispatch_on_the_receiver_class() {
    let src = r#"
        class A { }
        class B { }
        def (x: A) f() { return 1 }
        def (x: B) f() { return 2 }
        a = new A;
        b = new B;
        print a.f();
        print b.f();
    "#;
    assert_eq!(run(src), "12");
}

#[test]
fn dispatch_on_a_foreign_value_is_a_runtime_error() {
    let src = r#"
        class A { }
        class B { }
        def (x: A) f() { return 1 }
        def (x: B) f() { return 2 }
        f(3);
    "#;
    let err = eval(src).unwrap_err();
    assert!(matches!(err, RuntimeError::DispatchMiss { .. }));
}

#[test]
fn class_free_definition_becomes_the_fallback() {
    let src = r#"
        class A { }
        def (x: A) g() { return 1 }
        def g(x) { return 0 }
        print g(new A);
        print g(5);
    "#;
    assert_eq!(run(src), "10");
}

#[test]
fn fields_and_methods() {
    let src = r#"
        class Point { var x; var y; }
        def (self: Point) sum() { return @x + @y }
        def (self: Point) scale(k) { @x *= k; @y *= k; }
        p = new Point { x: 3, y: 4, };
        print p.sum();
        p.scale(10);
        print p.sum();
    "#;
    assert_eq!(run(src), "770");
}

#[test]
fn methods_are_plain_functions_over_their_receiver() {
    let src = r#"
        class Point { var x; var y; }
        def (self: Point) sum() { return @x + @y }
        p = new Point { x: 1, y: 2 };
        print sum(p);
    "#;
    assert_eq!(run(src), "3");
}

#[test]
fn method_on_the_wrong_receiver_is_rejected() {
    let src = r#"
        class Point { var x; }
        def (self: Point) get() { return @x }
        get(3);
    "#;
    let err = eval(src).unwrap_err();
    assert!(matches!(err, RuntimeError::ReceiverMismatch));
}

#[test]
fn uninitialised_fields_are_nil() {
    let src = r#"
        class Box { var item; }
        b = new Box;
        def (self: Box) item() { return @item }
        print b.item();
    "#;
    assert_eq!(run(src), "(nil)");
}

#[test]
fn instances_print_their_class_name() {
    let src = "class Point { var x; } p = new Point; print p, type_of(p);";
    assert_eq!(run(src), "(Point)instance");
}

#[test]
fn initialisers_may_nest() {
    let src = r#"
        class Inner { var v; }
        class Outer { var inner; }
        def (self: Outer) value() { return @inner }
        def (self: Inner) value() { return @v }
        o = new Outer { inner: new Inner { v: 9 } };
        print o.value().value();
    "#;
    assert_eq!(run(src), "9");
}
