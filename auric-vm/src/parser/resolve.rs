//! Identifier resolution: functions, modules, forward declarations.

use std::cell::Cell;

use crate::error::{ParseError, Span};
use crate::function::{FnFlags, Function, FunctionKind, ImportFn};
use crate::lexer::Token;

use super::Parser;

/// Outcome of resolving a callable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FnRef {
    /// An entry in the function table.
    Index(usize),
    /// The function currently being parsed; the call site is patched
    /// with the final index when the body closes.
    SelfRef,
}

impl<'src, 'pd> Parser<'src, 'pd> {
    /// Slot of an imported-module alias.
    pub(crate) fn resolve_module(&self, alias: &str) -> Option<usize> {
        self.p_data.imported_module_map.get(alias).copied()
    }

    /// Resolve `module_tok::id_tok` (or a plain `id_tok`) to a callable.
    ///
    /// Unknown plain names become forward declarations; unknown names
    /// under a module alias become importer stubs wired when the import
    /// executes. Both record `num_args_in` as the expected arity.
    pub(crate) fn resolve_fn(
        &mut self,
        module_tok: Option<&Token<'src>>,
        id_tok: &Token<'src>,
        num_args_in: usize,
    ) -> Result<FnRef, ParseError> {
        if let Some(module_tok) = module_tok {
            let module_idx =
                self.resolve_module(module_tok.text)
                    .ok_or_else(|| ParseError::UnknownModule {
                        name: module_tok.text.to_owned(),
                        span: Span::of(module_tok),
                    })?;
            if let Some(idx) = self.p_data.imported_modules[module_idx]
                .fn_map
                .get(id_tok.text)
            {
                return Ok(FnRef::Index(*idx));
            }
            let idx = self.p_data.fns.len();
            self.p_data.fns.push(Function {
                flags: FnFlags::empty(),
                kind: FunctionKind::Import(ImportFn {
                    num_args: num_args_in,
                    module_idx,
                    name: id_tok.text.to_owned(),
                    target: Cell::new(None),
                }),
            });
            self.p_data.fn_names.push(id_tok.text.to_owned());
            self.p_data.imported_modules[module_idx]
                .fn_map
                .insert(id_tok.text.to_owned(), idx);
            return Ok(FnRef::Index(idx));
        }

        if self.self_name == Some(id_tok.text) {
            return Ok(FnRef::SelfRef);
        }

        if let Some(idx) = self.p_data.fn_map.get(id_tok.text) {
            return Ok(FnRef::Index(*idx));
        }

        // Forward declaration: reserve an entry the later definition
        // fills in.
        let idx = self.p_data.fns.len();
        self.p_data
            .fn_map
            .insert(id_tok.text.to_owned(), idx);
        self.p_data
            .fns
            .push(Function::forward(num_args_in, Span::of(id_tok)));
        self.p_data.fn_names.push(id_tok.text.to_owned());
        Ok(FnRef::Index(idx))
    }
}
