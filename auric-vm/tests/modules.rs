use std::fs;
use std::path::PathBuf;

use auric_vm::parser::parse_source;
use auric_vm::prelude::*;
use tempfile::TempDir;

mod common;
use common::run_program;

fn module(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn run_in(dir: &TempDir, src: &str) -> Result<(String, Value), RuntimeError> {
    let program = parse_source(src, None, dir.path().to_path_buf()).expect("driver should parse");
    run_program(&program)
}

#[test]
fn imported_functions_are_called_through_their_alias() {
    let dir = TempDir::new().unwrap();
    module(&dir, "a.au", r#"export def greet() { return "ok" }"#);

    let (out, _) = run_in(&dir, r#"import "./a.au" as a; print a::greet();"#).unwrap();
    assert_eq!(out, "ok");
}

#[test]
fn a_module_top_level_runs_exactly_once() {
    let dir = TempDir::new().unwrap();
    module(
        &dir,
        "a.au",
        r#"print "loaded"; export def greet() { return "ok" }"#,
    );

    let src = r#"
        import "./a.au" as a;
        import "./a.au";
        print a::greet();
    "#;
    let (out, _) = run_in(&dir, src).unwrap();
    assert_eq!(out, "loadedok");
}

#[test]
fn exported_constants_cross_modules() {
    let dir = TempDir::new().unwrap();
    module(&dir, "b.au", r#"export const VERSION = "1.0";"#);

    let (out, _) = run_in(&dir, r#"import "./b.au" as b; print b::VERSION;"#).unwrap();
    assert_eq!(out, "1.0");
}

#[test]
fn private_functions_stay_private() {
    let dir = TempDir::new().unwrap();
    module(&dir, "c.au", "def secret() { return 1 }");

    let err = run_in(&dir, r#"import "./c.au" as c; print c::secret();"#).unwrap_err();
    assert!(matches!(err, RuntimeError::ImportResolution { .. }));
}

#[test]
fn import_arity_must_match_the_export() {
    let dir = TempDir::new().unwrap();
    module(&dir, "d.au", "export def f(a, b) { return a + b }");

    let err = run_in(&dir, r#"import "./d.au" as d; print d::f(1);"#).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::ImportArity {
            got: 1,
            expected: 2,
            ..
        }
    ));
}

#[test]
fn missing_modules_fail_with_the_resolved_path() {
    let dir = TempDir::new().unwrap();
    let err = run_in(&dir, r#"import "./nope.au";"#).unwrap_err();
    assert!(matches!(err, RuntimeError::ModuleRead { .. }));
}

#[test]
fn bare_import_paths_are_rejected() {
    let dir = TempDir::new().unwrap();
    let err = run_in(&dir, r#"import "nope.au";"#).unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidImportPath { .. }));
}

#[test]
fn imports_chain_across_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    module(
        &dir,
        "lib/inner.au",
        "export def base() { return 20 }",
    );
    module(
        &dir,
        "outer.au",
        r#"
            import "./lib/inner.au" as inner;
            export def doubled() { return inner::base() + inner::base() }
        "#,
    );

    let (out, _) = run_in(&dir, r#"import "./outer.au" as o; print o::doubled();"#).unwrap();
    assert_eq!(out, "40");
}

#[test]
fn diamond_imports_share_one_instance() {
    let dir = TempDir::new().unwrap();
    module(&dir, "base.au", r#"print "base"; export def one() { return 1 }"#);
    module(
        &dir,
        "left.au",
        r#"import "./base.au" as base; export def l() { return base::one() }"#,
    );
    module(
        &dir,
        "right.au",
        r#"import "./base.au" as base; export def r() { return base::one() }"#,
    );

    let src = r#"
        import "./left.au" as left;
        import "./right.au" as right;
        print left::l() + right::r();
    "#;
    let (out, _) = run_in(&dir, src).unwrap();
    assert_eq!(out, "base2");
}

#[test]
fn circular_imports_are_detected() {
    let dir = TempDir::new().unwrap();
    module(&dir, "x.au", r#"import "./y.au";"#);
    module(&dir, "y.au", r#"import "./x.au";"#);

    let err = run_in(&dir, r#"import "./x.au";"#).unwrap_err();
    assert!(matches!(err, RuntimeError::CircularImport { .. }));
}

#[test]
fn parse_file_resolves_imports_against_the_file() {
    let dir = TempDir::new().unwrap();
    module(&dir, "util.au", "export def three() { return 3 }");
    let main = module(
        &dir,
        "main.au",
        r#"import "./util.au" as util; print util::three();"#,
    );

    let program = parse_file(&main).unwrap();
    let (out, _) = run_program(&program).unwrap();
    assert_eq!(out, "3");
}
