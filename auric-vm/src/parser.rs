//! Single-pass recursive-descent parser.
//!
//! There is no syntax tree: every grammar production emits bytecode as
//! it is recognised, leaving its result in the top-of-stack register.
//! Statement boundaries release all temporaries; control-flow joins
//! additionally invalidate the local→register cache.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use hashbrown::HashMap;

use auric_asm::op;

use crate::error::{LoadError, ParseError, Span};
use crate::function::{BytecodeStorage, FnFlags, FunctionKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::program::{Program, ProgramData};
use crate::runtime::class::ClassInterface;
use crate::stdlib;

mod bc;
mod expr;
mod regs;
mod resolve;
mod stmt;

use regs::RegBitmap;
pub(crate) use stmt::StmtFlow;

/// Source-map function index of the top-level function.
pub(crate) const MAIN_FUNC_IDX: usize = usize::MAX;

/// Parse a source string rooted in the current directory.
pub fn parse(src: &str) -> Result<Program, ParseError> {
    parse_source(src, None, PathBuf::from("."))
}

/// Read and parse a source file; `./` imports resolve against its
/// directory.
pub fn parse_file(path: &Path) -> Result<Program, LoadError> {
    let src = std::fs::read_to_string(path)?;
    let cwd = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok(parse_source(&src, Some(path.to_path_buf()), cwd)?)
}

/// Parse a source string with explicit provenance.
pub fn parse_source(
    src: &str,
    file: Option<PathBuf>,
    cwd: PathBuf,
) -> Result<Program, ParseError> {
    let mut p_data = ProgramData::new(cwd);
    p_data.file = file;
    p_data.source = src.to_owned();
    stdlib::install(&mut p_data);

    let mut lexer = Lexer::new(src);
    let mut parser = Parser::new(&mut p_data, MAIN_FUNC_IDX);
    loop {
        match parser.exec_statement(&mut lexer)? {
            StmtFlow::Parsed => parser.flush_free_regs(),
            StmtFlow::Eof => break,
        }
    }
    parser.emit(op::exit());
    let main = parser.finish();

    // Every forward declaration must have met its definition.
    for (idx, func) in p_data.fns.iter().enumerate() {
        if let FunctionKind::None { span, .. } = func.kind {
            return Err(ParseError::UnknownFunction {
                name: p_data.fn_name(idx).to_owned(),
                span,
            });
        }
    }

    Ok(Program {
        main,
        data: Rc::new(p_data),
    })
}

/// Parser state for one function body.
pub(crate) struct Parser<'src, 'pd> {
    /// Bytecode being emitted.
    pub(crate) bc: Vec<u8>,
    /// Stack of registers holding live expression results.
    rstack: Vec<u8>,
    used_regs: RegBitmap,
    pinned_regs: RegBitmap,
    /// Local name → slot.
    vars: HashMap<String, u16>,
    /// Local slot → caching register.
    local_to_reg: Vec<Option<u8>>,
    /// `const` name → constant-pool slot (top level only).
    consts: HashMap<String, usize>,
    p_data: &'pd mut ProgramData,
    num_locals: usize,
    max_register: Option<u8>,
    block_level: u32,
    /// Name of the function being parsed, for self-recursion.
    self_name: Option<&'src str>,
    /// Offsets of `CALL` immediates awaiting the final self index.
    self_fill_call: Vec<usize>,
    self_num_args: usize,
    self_flags: FnFlags,
    /// Receiver interface when parsing a class method.
    class_interface: Option<Rc<ClassInterface>>,
    func_idx: usize,
    /// The top-level `const` table, visible from function bodies.
    top_level_consts: Option<&'pd HashMap<String, usize>>,
    /// Position of the statement being parsed, for limit errors.
    current_span: Span,
}

impl<'src, 'pd> Parser<'src, 'pd> {
    pub(crate) fn new(p_data: &'pd mut ProgramData, func_idx: usize) -> Self {
        Self {
            bc: Vec::new(),
            rstack: Vec::new(),
            used_regs: RegBitmap::default(),
            pinned_regs: RegBitmap::default(),
            vars: HashMap::new(),
            local_to_reg: Vec::new(),
            consts: HashMap::new(),
            p_data,
            num_locals: 0,
            max_register: None,
            block_level: 0,
            self_name: None,
            self_fill_call: Vec::new(),
            self_num_args: 0,
            self_flags: FnFlags::empty(),
            class_interface: None,
            func_idx,
            top_level_consts: None,
            current_span: Span::default(),
        }
    }

    /// Seal the parsed function into its bytecode storage.
    pub(crate) fn finish(self) -> BytecodeStorage {
        BytecodeStorage {
            bc: self.bc,
            num_args: self.self_num_args,
            num_locals: self.num_locals,
            num_registers: self.max_register.map_or(0, |max| usize::from(max) + 1),
            class_interface: self.class_interface,
            source_map_start: 0,
            func_idx: self.func_idx,
        }
    }

    pub(crate) fn bytecode_gen_error(&self) -> ParseError {
        ParseError::BytecodeGen {
            span: self.current_span,
        }
    }

    pub(crate) fn unexpected(&self, t: &Token<'_>, expected: Option<&'static str>) -> ParseError {
        ParseError::UnexpectedToken {
            token: t.text.to_owned(),
            expected,
            span: Span::of(t),
        }
    }

    /// Fail unless `t` is the operator `op`.
    pub(crate) fn expect_op(
        &self,
        t: &Token<'_>,
        op: &str,
        expected: &'static str,
    ) -> Result<(), ParseError> {
        if t.is_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(t, Some(expected)))
        }
    }

    /// Fail unless `t` is an identifier.
    pub(crate) fn expect_identifier(&self, t: &Token<'_>) -> Result<(), ParseError> {
        if t.kind == TokenKind::Identifier {
            Ok(())
        } else {
            Err(self.unexpected(t, Some("identifier")))
        }
    }

    /// Fail unless we are at block level 0 of the top-level function.
    pub(crate) fn expect_global_scope(&self, t: &Token<'_>) -> Result<(), ParseError> {
        if self.block_level == 0 && self.func_idx == MAIN_FUNC_IDX {
            Ok(())
        } else {
            Err(ParseError::ExpectedGlobalScope { span: Span::of(t) })
        }
    }
}
