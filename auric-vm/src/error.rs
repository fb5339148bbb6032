//! Parser and runtime error types, plus source-excerpt rendering.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::Token;
use crate::value::Value;

/// A byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first covered byte.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Span {
    /// The range covered by a token.
    pub fn of(token: &Token<'_>) -> Self {
        Self {
            start: token.start,
            len: token.text.len(),
        }
    }

    /// A zero-length span at an offset.
    pub fn at(start: usize) -> Self {
        Self { start, len: 0 }
    }
}

/// Everything the parser can reject.
///
/// The parser reports by returning; it never panics and emits no partial
/// program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token that doesn't fit the grammar at this position.
    #[error("unexpected token '{token}'")]
    UnexpectedToken {
        /// Offending source text.
        token: String,
        /// What the grammar wanted here, if the parser knows.
        expected: Option<&'static str>,
        /// Location of the token.
        span: Span,
    },
    /// An emitted quantity no longer fits its bytecode field (register
    /// exhaustion, >16-bit jump displacement, too many locals…).
    #[error("bytecode generation failure")]
    BytecodeGen {
        /// Position of the construct being compiled.
        span: Span,
    },
    /// A function that was called but never defined.
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// Function name.
        name: String,
        /// Location of the (first) call.
        span: Span,
    },
    /// An identifier that names no local, argument or constant.
    #[error("unknown variable '{name}'")]
    UnknownVariable {
        /// Variable name.
        name: String,
        /// Location of the use.
        span: Span,
    },
    /// A class name that was never declared.
    #[error("unknown class '{name}'")]
    UnknownClass {
        /// Class name.
        name: String,
        /// Location of the use.
        span: Span,
    },
    /// A module alias that no import introduced.
    #[error("unknown module '{name}'")]
    UnknownModule {
        /// Module alias.
        name: String,
        /// Location of the use.
        span: Span,
    },
    /// Two function arguments share a name.
    #[error("duplicate argument '{name}'")]
    DuplicateArgument {
        /// Argument name.
        name: String,
        /// Location of the second binding.
        span: Span,
    },
    /// Two imports share a module alias.
    #[error("duplicate module alias '{name}'")]
    DuplicateModule {
        /// Alias name.
        name: String,
        /// Location of the second alias.
        span: Span,
    },
    /// Two classes share a name.
    #[error("duplicate class '{name}'")]
    DuplicateClass {
        /// Class name.
        name: String,
        /// Location of the second declaration.
        span: Span,
    },
    /// A class declares the same field twice.
    #[error("duplicate property '{name}'")]
    DuplicateProperty {
        /// Field name.
        name: String,
        /// Location of the second declaration.
        span: Span,
    },
    /// A constant is bound twice.
    #[error("duplicate constant '{name}'")]
    DuplicateConstant {
        /// Constant name.
        name: String,
        /// Location of the second binding.
        span: Span,
    },
    /// A call or definition disagrees with the known argument count.
    #[error("wrong number of arguments (expected {expected}, got {got})")]
    WrongArgumentCount {
        /// Arguments at the offending site.
        got: usize,
        /// Arguments the function declares.
        expected: usize,
        /// Location of the call or definition.
        span: Span,
    },
    /// `@field` syntax outside a class method.
    #[error("'@' fields are only available inside class methods")]
    ClassScopeOnly {
        /// Location of the field access.
        span: Span,
    },
    /// A declaration that is only legal at the top level of a module.
    #[error("declaration is only allowed at the top level")]
    ExpectedGlobalScope {
        /// Location of the declaration.
        span: Span,
    },
}

impl ParseError {
    /// The source range the error points at.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::BytecodeGen { span }
            | Self::UnknownFunction { span, .. }
            | Self::UnknownVariable { span, .. }
            | Self::UnknownClass { span, .. }
            | Self::UnknownModule { span, .. }
            | Self::DuplicateArgument { span, .. }
            | Self::DuplicateModule { span, .. }
            | Self::DuplicateClass { span, .. }
            | Self::DuplicateProperty { span, .. }
            | Self::DuplicateConstant { span, .. }
            | Self::WrongArgumentCount { span, .. }
            | Self::ClassScopeOnly { span }
            | Self::ExpectedGlobalScope { span } => *span,
        }
    }

    /// Render the error with a source excerpt and caret underline.
    pub fn render(&self, src: &str, path: Option<&str>) -> String {
        let mut out = format!("parser error in {}: {self}", path.unwrap_or("(source)"));
        if let Self::UnexpectedToken {
            expected: Some(expected),
            ..
        } = self
        {
            let _ = write!(out, ", expected {expected}");
        }
        out.push('\n');
        out.push_str(&source_excerpt(src, self.span()));
        out
    }
}

/// Failure to load a source file: the read or the parse.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The contents failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Everything that can go wrong while executing bytecode.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Operand types don't fit an arithmetic or comparison opcode inside
    /// a fallible function.
    #[error("incompatible values for binary operation: {left} and {right}")]
    IncompatibleBinOp {
        /// Left operand snapshot.
        left: Value,
        /// Right operand snapshot.
        right: Value,
        /// Source byte offset attributed through the source map.
        pos: Option<usize>,
    },
    /// A `raise` reached the embedder without being handled.
    #[error("uncaught raise: {value}")]
    Raised {
        /// The raised value.
        value: Value,
        /// Source byte offset attributed through the source map.
        pos: Option<usize>,
    },
    /// A forward-declared function was never defined but got called.
    #[error("call to undefined function '{name}'")]
    UndefinedFunction {
        /// Function name.
        name: String,
    },
    /// No dispatch arm accepts the receiver's class, and there is no
    /// fallback.
    #[error("'{name}' accepts no receiver of this class")]
    DispatchMiss {
        /// Function name.
        name: String,
    },
    /// A method was invoked on a value of a foreign class.
    #[error("method receiver has the wrong class")]
    ReceiverMismatch,
    /// Argument binding onto a multi-dispatch function value.
    #[error("cannot bind arguments to a multi-dispatch function")]
    BindDispatch,
    /// A value that is not callable was called.
    #[error("value is not callable")]
    NotCallable,
    /// Operand type that doesn't fit a unary opcode inside a fallible
    /// function.
    #[error("incompatible value for unary operation: {value}")]
    IncompatibleUnaryOp {
        /// Operand snapshot.
        value: Value,
        /// Source byte offset attributed through the source map.
        pos: Option<usize>,
    },
    /// Indexing into a value that is not a collection.
    #[error("value of type {kind} is not indexable")]
    NotIndexable {
        /// Type name of the indexed value.
        kind: &'static str,
        /// Source byte offset attributed through the source map.
        pos: Option<usize>,
    },
    /// A function-value call with the wrong number of arguments.
    #[error("'{name}' takes {expected} arguments, got {got}")]
    CallArity {
        /// Function name.
        name: String,
        /// Arguments supplied.
        got: usize,
        /// Arguments declared.
        expected: usize,
    },
    /// The bytecode stream is not well-formed; parsers never emit this,
    /// hand-assembled programs can.
    #[error("bytecode is malformed")]
    MalformedBytecode,
    /// Two modules import each other's top level.
    #[error("circular import of '{}'", path.display())]
    CircularImport {
        /// Module path.
        path: PathBuf,
    },
    /// Import path pointing outside the supported `./`-relative scheme.
    #[error("unsupported import path '{path}'")]
    InvalidImportPath {
        /// The literal path.
        path: String,
    },
    /// The imported module could not be read.
    #[error("cannot import '{}': {source}", path.display())]
    ModuleRead {
        /// Resolved path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The imported module failed to parse.
    #[error("cannot parse '{}': {source}", path.display())]
    ModuleParse {
        /// Resolved path.
        path: PathBuf,
        /// The parse failure, already rendered with its excerpt.
        #[source]
        source: Box<ParseError>,
    },
    /// An imported name is missing from the module or not exported.
    #[error("module '{}' does not export '{name}'", path.display())]
    ImportResolution {
        /// Module path.
        path: PathBuf,
        /// Looked-up name.
        name: String,
    },
    /// An imported function's arity disagrees with the call sites.
    #[error("imported function '{name}' takes {expected} arguments, call sites pass {got}")]
    ImportArity {
        /// Function name.
        name: String,
        /// Arity at the importing call sites.
        got: usize,
        /// Arity declared by the exporting module.
        expected: usize,
    },
}

/// Render a `line | source` excerpt with a caret underline.
///
/// Line and column are recomputed by scanning the source, the same way
/// the bytecode side attributes positions through the source map.
pub fn source_excerpt(src: &str, span: Span) -> String {
    let pos = span.start.min(src.len());
    let mut line = 1usize;
    let mut line_begin = 0usize;
    for (i, b) in src.as_bytes()[..pos].iter().enumerate() {
        if *b == b'\n' {
            line += 1;
            line_begin = i + 1;
        }
    }
    let col = pos - line_begin;
    let line_end = src[line_begin..]
        .find('\n')
        .map_or(src.len(), |i| line_begin + i);

    let header = format!("{line} | ");
    let mut out = format!("{header}{}\n", &src[line_begin..line_end]);
    if span.len > 0 {
        let caret_len = span.len.min(line_end.saturating_sub(pos)).max(1);
        out.push_str(&" ".repeat(header.len() + col));
        out.push_str(&"^".repeat(caret_len));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_points_at_the_span() {
        let src = "print 1;\nprint oops;\n";
        let span = Span {
            start: src.find("oops").unwrap(),
            len: 4,
        };
        let rendered = source_excerpt(src, span);
        assert_eq!(rendered, "2 | print oops;\n          ^^^^\n");
    }

    #[test]
    fn render_includes_expectation() {
        let src = "def f( {";
        let err = ParseError::UnexpectedToken {
            token: "{".into(),
            expected: Some("arguments"),
            span: Span {
                start: src.find('{').unwrap(),
                len: 1,
            },
        };
        let rendered = err.render(src, None);
        assert!(rendered.contains("unexpected token '{'"));
        assert!(rendered.contains("expected arguments"));
        assert!(rendered.contains("1 | def f( {"));
    }
}
