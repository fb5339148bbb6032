use auric_vm::prelude::*;

fn parse_err(src: &str) -> ParseError {
    parse(src).expect_err("source should be rejected")
}

#[test]
fn unexpected_tokens_carry_the_expectation() {
    let err = parse_err("def f( {");
    let ParseError::UnexpectedToken { token, expected, .. } = &err else {
        panic!("wrong error: {err:?}");
    };
    assert_eq!(token, "{");
    assert_eq!(*expected, Some("arguments"));
}

#[test]
fn missing_semicolons_are_unexpected_tokens() {
    assert!(matches!(
        parse_err("print 1 print 2;"),
        ParseError::UnexpectedToken { .. }
    ));
}

#[test]
fn unknown_names() {
    assert!(matches!(
        parse_err("print zzz;"),
        ParseError::UnknownVariable { .. }
    ));
    assert!(matches!(
        parse_err("x = new Foo;"),
        ParseError::UnknownClass { .. }
    ));
    assert!(matches!(
        parse_err("foo::bar();"),
        ParseError::UnknownModule { .. }
    ));
}

#[test]
fn calls_without_a_definition_fail_at_end_of_parse() {
    let err = parse_err("f(1);");
    let ParseError::UnknownFunction { name, .. } = &err else {
        panic!("wrong error: {err:?}");
    };
    assert_eq!(name, "f");
}

#[test]
fn duplicate_declarations() {
    assert!(matches!(
        parse_err("def f(a, a) { }"),
        ParseError::DuplicateArgument { .. }
    ));
    assert!(matches!(
        parse_err(r#"import "./a.au" as m; import "./b.au" as m;"#),
        ParseError::DuplicateModule { .. }
    ));
    assert!(matches!(
        parse_err("class C { } class C { }"),
        ParseError::DuplicateClass { .. }
    ));
    assert!(matches!(
        parse_err("class C { var x; var x; }"),
        ParseError::DuplicateProperty { .. }
    ));
    assert!(matches!(
        parse_err("const K = 1; const K = 2;"),
        ParseError::DuplicateConstant { .. }
    ));
}

#[test]
fn arity_mismatches_point_at_the_call() {
    let err = parse_err("def f(a) { } f(1, 2);");
    assert!(matches!(
        err,
        ParseError::WrongArgumentCount {
            got: 2,
            expected: 1,
            ..
        }
    ));
}

#[test]
fn forward_calls_fix_the_arity() {
    let err = parse_err("def g() { return f(1) } def f(a, b) { return a + b }");
    assert!(matches!(err, ParseError::WrongArgumentCount { .. }));
}

#[test]
fn field_access_needs_a_class_method() {
    assert!(matches!(
        parse_err("print @x;"),
        ParseError::ClassScopeOnly { .. }
    ));
    assert!(matches!(
        parse_err("def f() { return @x }"),
        ParseError::ClassScopeOnly { .. }
    ));
}

#[test]
fn declarations_are_top_level_only() {
    assert!(matches!(
        parse_err("if true { def f() { } }"),
        ParseError::ExpectedGlobalScope { .. }
    ));
    assert!(matches!(
        parse_err(r#"if true { import "./x.au"; }"#),
        ParseError::ExpectedGlobalScope { .. }
    ));
    assert!(matches!(
        parse_err("def f() { const K = 1; return K }"),
        ParseError::ExpectedGlobalScope { .. }
    ));
}

#[test]
fn rendered_errors_excerpt_the_offending_line() {
    let src = "x = 1;\nprint oops;\n";
    let rendered = parse_err(src).render(src, Some("demo.au"));
    assert!(rendered.contains("parser error in demo.au"));
    assert!(rendered.contains("unknown variable 'oops'"));
    assert!(rendered.contains("2 | print oops;"));
    assert!(rendered.contains("^^^^"));
}

#[test]
fn unknown_bytes_surface_as_unexpected_tokens() {
    assert!(matches!(
        parse_err("print 1 ` 2;"),
        ParseError::UnexpectedToken { .. }
    ));
}
