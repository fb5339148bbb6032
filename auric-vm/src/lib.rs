//! Parser and interpreter for the auric scripting language.
//!
//! Source text is compiled in a single pass to a fixed-width register
//! bytecode (see [`auric_asm`]) and executed by a recursive register
//! machine. The pipeline:
//!
//! 1. [`lexer`] — bytes to tokens with two-token lookahead.
//! 2. [`parser`] — tokens straight to bytecode; no syntax tree.
//! 3. [`program`] — the compiled artifact: functions, classes, constants,
//!    imports and the source map.
//! 4. [`value`] / [`runtime`] — the dynamic value representation and the
//!    reference-counted heap collections.
//! 5. [`interpreter`] — the dispatch loop, call sequencing and the module
//!    loader.
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use auric_vm::prelude::*;
//!
//! let program = parse("print 2 + 3;").unwrap();
//! let out = Rc::new(RefCell::new(String::new()));
//! let sink = Rc::clone(&out);
//! let mut vm = Vm::with_print_hook(Box::new(move |v| {
//!     sink.borrow_mut().push_str(&v.to_string());
//! }));
//! vm.run_main(&program).unwrap();
//! assert_eq!(out.borrow().as_str(), "5");
//! ```

#![warn(missing_docs)]

pub mod consts;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod program;
pub mod runtime;
pub mod stdlib;
pub mod value;

/// Commonly used items.
pub mod prelude {
    pub use crate::error::{ParseError, RuntimeError, Span};
    pub use crate::interpreter::Vm;
    pub use crate::parser::{parse, parse_file};
    pub use crate::program::{Program, ProgramData};
    pub use crate::value::Value;
}
