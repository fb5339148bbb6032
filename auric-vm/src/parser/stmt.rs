//! Statement-level parsing.

use std::rc::Rc;

use auric_asm::{op, Opcode};

use crate::consts::MAX_LOCALS;
use crate::error::{ParseError, Span};
use crate::function::{DispatchFn, DispatchInstance, FnFlags, Function, FunctionKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::program::{Import, ImportedModule, SourceMapEntry};
use crate::runtime::class::{ClassFlags, ClassInterface};
use crate::value::Value;

use super::{Parser, MAIN_FUNC_IDX};

/// What a statement parse step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StmtFlow {
    /// One statement was compiled.
    Parsed,
    /// The token stream ended.
    Eof,
}

impl<'src, 'pd> Parser<'src, 'pd> {
    pub(crate) fn exec_statement(&mut self, l: &mut Lexer<'src>) -> Result<StmtFlow, ParseError> {
        let t = l.peek(0);
        if t.kind == TokenKind::Eof {
            return Ok(StmtFlow::Eof);
        }
        self.current_span = Span::of(&t);
        let bc_from = self.bc.len();

        if t.kind == TokenKind::Identifier {
            match t.text {
                "class" => {
                    self.expect_global_scope(&t)?;
                    l.next_token();
                    self.exec_class(l, ClassFlags::empty())?;
                }
                "def" => {
                    self.expect_global_scope(&t)?;
                    l.next_token();
                    self.exec_def(l, FnFlags::empty())?;
                }
                "const" => {
                    l.next_token();
                    self.with_semicolon(l, |p, l| p.exec_const(l, false))?;
                }
                "if" => {
                    l.next_token();
                    self.exec_if(l)?;
                }
                "while" => {
                    l.next_token();
                    self.exec_while(l)?;
                }
                "print" => {
                    l.next_token();
                    self.with_semicolon(l, Self::exec_print)?;
                }
                "return" => {
                    l.next_token();
                    self.with_semicolon(l, Self::exec_return)?;
                }
                "import" => {
                    self.expect_global_scope(&t)?;
                    l.next_token();
                    self.with_semicolon(l, Self::exec_import)?;
                }
                "export" => {
                    self.expect_global_scope(&t)?;
                    l.next_token();
                    self.exec_export(l)?;
                }
                "raise" => {
                    l.next_token();
                    self.with_semicolon(l, Self::exec_raise)?;
                }
                _ => self.with_semicolon(l, |p, l| Self::exec_expr(p, l))?,
            }
        } else {
            self.with_semicolon(l, |p, l| Self::exec_expr(p, l))?;
        }

        let bc_to = self.bc.len();
        if bc_from != bc_to {
            self.p_data.source_map.push(SourceMapEntry {
                bc_from,
                bc_to,
                source_start: t.start,
                func_idx: self.func_idx,
            });
        }
        Ok(StmtFlow::Parsed)
    }

    fn with_semicolon(
        &mut self,
        l: &mut Lexer<'src>,
        body: impl FnOnce(&mut Self, &mut Lexer<'src>) -> Result<(), ParseError>,
    ) -> Result<(), ParseError> {
        body(self, l)?;
        let t = l.next_token();
        if t.kind == TokenKind::Eof {
            return Ok(());
        }
        self.expect_op(&t, ";", "';'")
    }

    pub(crate) fn exec_block(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.block_level += 1;
        let t = l.next_token();
        self.expect_op(&t, "{", "'{'")?;
        loop {
            let t = l.peek(0);
            if t.is_op("}") {
                l.next_token();
                break;
            }
            match self.exec_statement(l)? {
                StmtFlow::Parsed => self.flush_free_regs(),
                StmtFlow::Eof => break,
            }
        }
        self.block_level -= 1;
        Ok(())
    }

    fn exec_export(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let t = l.next_token();
        if t.is_keyword("def") {
            self.exec_def(l, FnFlags::EXPORTED)
        } else if t.is_keyword("class") {
            self.exec_class(l, ClassFlags::EXPORTED)
        } else if t.is_keyword("const") {
            self.with_semicolon(l, |p, l| p.exec_const(l, true))
        } else {
            Err(self.unexpected(&t, Some("'class', 'def' or 'const'")))
        }
    }

    fn exec_import(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let path_tok = l.next_token();
        if path_tok.kind != TokenKind::String {
            return Err(self.unexpected(&path_tok, Some("string")));
        }

        let idx = self.p_data.imports.len();
        let module_idx = if l.peek(0).is_keyword("as") {
            l.next_token();
            let module_tok = l.next_token();
            self.expect_identifier(&module_tok)?;
            if self.p_data.imported_module_map.contains_key(module_tok.text) {
                return Err(ParseError::DuplicateModule {
                    name: module_tok.text.to_owned(),
                    span: Span::of(&module_tok),
                });
            }
            let module_idx = self.p_data.imported_modules.len();
            self.p_data
                .imported_module_map
                .insert(module_tok.text.to_owned(), module_idx);
            self.p_data.imported_modules.push(ImportedModule::default());
            Some(module_idx)
        } else {
            None
        };
        self.p_data.imports.push(Import {
            path: path_tok.text.to_owned(),
            module_idx,
        });

        let idx = u16::try_from(idx).map_err(|_| self.bytecode_gen_error())?;
        self.emit(op::import(idx));
        Ok(())
    }

    fn exec_class(&mut self, l: &mut Lexer<'src>, flags: ClassFlags) -> Result<(), ParseError> {
        let id_tok = l.next_token();
        self.expect_identifier(&id_tok)?;
        if self.p_data.class_map.contains_key(id_tok.text) {
            return Err(ParseError::DuplicateClass {
                name: id_tok.text.to_owned(),
                span: Span::of(&id_tok),
            });
        }
        let mut interface = ClassInterface::new(id_tok.text, flags);

        let t = l.next_token();
        if t.is_op("{") {
            loop {
                let t = l.next_token();
                if t.is_keyword("var") {
                    let name_tok = l.next_token();
                    self.expect_identifier(&name_tok)?;
                    if interface.add_field(name_tok.text).is_none() {
                        return Err(ParseError::DuplicateProperty {
                            name: name_tok.text.to_owned(),
                            span: Span::of(&name_tok),
                        });
                    }
                    let semi = l.next_token();
                    if semi.is_op(";") {
                        continue;
                    } else if semi.is_op("}") {
                        break;
                    }
                    return Err(self.unexpected(&semi, Some("';' or '}'")));
                } else if t.is_op("}") {
                    break;
                }
                return Err(self.unexpected(&t, Some("'var' or '}'")));
            }
        } else if !t.is_op(";") {
            return Err(self.unexpected(&t, Some("'{' or ';'")));
        }

        self.p_data
            .class_map
            .insert(id_tok.text.to_owned(), self.p_data.classes.len());
        self.p_data.classes.push(Rc::new(interface));
        Ok(())
    }

    fn exec_const(&mut self, l: &mut Lexer<'src>, exported: bool) -> Result<(), ParseError> {
        let id_tok = l.next_token();
        self.expect_identifier(&id_tok)?;
        let eq_tok = l.next_token();
        self.expect_op(&eq_tok, "=", "'='")?;

        self.exec_expr(l)?;
        let right_reg = self.pop_reg();

        if self.func_idx != MAIN_FUNC_IDX {
            return Err(ParseError::ExpectedGlobalScope {
                span: Span::of(&id_tok),
            });
        }
        if self.consts.contains_key(id_tok.text) {
            return Err(ParseError::DuplicateConstant {
                name: id_tok.text.to_owned(),
                span: Span::of(&id_tok),
            });
        }
        let slot = self.p_data.add_data(Value::None);
        self.consts.insert(id_tok.text.to_owned(), slot);
        let slot16 = u16::try_from(slot).map_err(|_| self.bytecode_gen_error())?;
        self.emit(op::set_const(right_reg, slot16));
        if exported {
            self.p_data
                .exported_consts
                .insert(id_tok.text.to_owned(), slot);
        }
        Ok(())
    }

    fn exec_if(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.flush_cached_regs();

        self.exec_expr(l)?;
        self.flush_cached_regs();
        let cond_reg = self.pop_reg();
        let cond_imm = self.emit_placeholder_imm16(Opcode::Jnif, cond_reg);

        self.exec_block(l)?;
        self.flush_cached_regs();

        let mut body_imm = None;
        if !self.last_emitted_op().is_some_and(Opcode::is_return) {
            body_imm = Some(self.emit_placeholder_imm16(Opcode::Jrel, 0));
        }

        let mut has_else = false;
        if l.peek(0).is_keyword("else") {
            l.next_token();
            let else_start = self.bc.len();
            if l.peek(0).is_keyword("if") {
                l.next_token();
                self.exec_if(l)?;
            } else {
                self.exec_block(l)?;
            }
            self.flush_cached_regs();
            has_else = true;

            let mut else_imm = None;
            if !self.last_emitted_op().is_some_and(Opcode::is_return) {
                else_imm = Some(self.emit_placeholder_imm16(Opcode::Jrel, 0));
            }
            let end = self.bc.len();
            if let Some(imm) = else_imm {
                self.patch_jump(imm, end)?;
            }
            self.patch_jump(cond_imm, else_start)?;
        }

        let end = self.bc.len();
        if !has_else {
            self.patch_jump(cond_imm, end)?;
        }
        if let Some(imm) = body_imm {
            self.patch_jump(imm, end)?;
        }
        Ok(())
    }

    fn exec_while(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.flush_cached_regs();

        let cond_start = self.bc.len();
        self.exec_expr(l)?;
        self.flush_cached_regs();
        let cond_reg = self.pop_reg();
        let cond_imm = self.emit_placeholder_imm16(Opcode::Jnif, cond_reg);

        self.exec_block(l)?;
        self.flush_cached_regs();

        let back_imm = self.emit_placeholder_imm16(Opcode::Jrelb, 0);
        let end = self.bc.len();
        self.patch_jump(cond_imm, end)?;
        self.patch_jump_back(back_imm, cond_start)?;
        Ok(())
    }

    fn exec_print(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.exec_expr(l)?;
        let reg = self.pop_reg();
        self.emit(op::print(reg));
        while l.peek(0).is_op(",") {
            l.next_token();
            self.exec_expr(l)?;
            let reg = self.pop_reg();
            self.emit(op::print(reg));
        }
        Ok(())
    }

    fn exec_return(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.exec_expr(l)?;
        let reg = self.pop_reg();
        // Returning a freshly loaded local collapses to RET_LOCAL.
        let rewrite = self.bc.len().checked_sub(4).filter(|start| {
            self.bc[*start] == Opcode::MovLocalReg as u8 && self.bc[start + 1] == reg
        });
        match rewrite {
            Some(start) => self.bc[start] = Opcode::RetLocal as u8,
            None => self.emit(op::ret(reg)),
        }
        Ok(())
    }

    fn exec_raise(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.exec_expr(l)?;
        let reg = self.pop_reg();
        self.emit(op::raise(reg));
        self.self_flags |= FnFlags::MAY_FAIL;
        Ok(())
    }

    fn exec_def(&mut self, l: &mut Lexer<'src>, mut fn_flags: FnFlags) -> Result<(), ParseError> {
        let mut receiver_tok: Option<Token<'src>> = None;
        let mut class_interface: Option<Rc<ClassInterface>> = None;

        if l.peek(0).is_op("(") {
            l.next_token();
            fn_flags |= FnFlags::HAS_CLASS;

            let self_tok = l.next_token();
            self.expect_identifier(&self_tok)?;
            receiver_tok = Some(self_tok);

            let colon = l.next_token();
            self.expect_op(&colon, ":", "':'")?;

            let name_tok = l.next_token();
            self.expect_identifier(&name_tok)?;
            if l.peek(0).is_op("::") {
                // Methods may only hang off classes of this module.
                l.next_token();
                let member = l.next_token();
                return Err(ParseError::UnknownClass {
                    name: format!("{}::{}", name_tok.text, member.text),
                    span: Span::of(&name_tok),
                });
            }
            let class_idx = self.p_data.class_map.get(name_tok.text).copied().ok_or(
                ParseError::UnknownClass {
                    name: name_tok.text.to_owned(),
                    span: Span::of(&name_tok),
                },
            )?;
            class_interface = Some(Rc::clone(&self.p_data.classes[class_idx]));

            let close = l.next_token();
            self.expect_op(&close, ")", "')'")?;
        }

        let id_tok = l.next_token();
        self.expect_identifier(&id_tok)?;

        let mut expected_num_args = None;
        let mut forward_decl_span = None;

        let mut func_value = self.p_data.fns.len();
        if let Some(&old_idx) = self.p_data.fn_map.get(id_tok.text) {
            let old = &self.p_data.fns[old_idx];
            expected_num_args = Some(old.num_args());
            let same_visibility =
                (old.flags & FnFlags::EXPORTED) == (fn_flags & FnFlags::EXPORTED);

            if let FunctionKind::None { span, .. } = old.kind {
                // A forward call reserved this slot.
                func_value = old_idx;
                forward_decl_span = Some(span);
            } else if same_visibility
                && (old.flags.contains(FnFlags::HAS_CLASS) || fn_flags.contains(FnFlags::HAS_CLASS))
            {
                // Same name over different receivers: merge into a
                // dispatch entry.
                if matches!(old.kind, FunctionKind::Dispatch(_)) {
                    let FunctionKind::Dispatch(dispatch) = &mut self.p_data.fns[old_idx].kind
                    else {
                        unreachable!()
                    };
                    match &class_interface {
                        Some(iface) => dispatch.instances.push(DispatchInstance {
                            fn_idx: func_value,
                            interface: Rc::clone(iface),
                        }),
                        None => dispatch.fallback = Some(func_value),
                    }
                    self.p_data
                        .fns
                        .push(Function::forward(0, Span::of(&id_tok)));
                    self.p_data.fn_names.push(id_tok.text.to_owned());
                } else {
                    let fallback_idx = self.p_data.fns.len();
                    let new_fn_idx = fallback_idx + 1;
                    let old_fn = std::mem::replace(
                        &mut self.p_data.fns[old_idx],
                        Function::forward(0, Span::of(&id_tok)),
                    );

                    let mut dispatch = DispatchFn {
                        num_args: old_fn.num_args(),
                        instances: Vec::new(),
                        fallback: None,
                    };
                    let old_iface = match &old_fn.kind {
                        FunctionKind::Bytecode(bcs) => bcs.class_interface.clone(),
                        _ => None,
                    };
                    match old_iface {
                        Some(iface) if old_fn.flags.contains(FnFlags::HAS_CLASS) => {
                            dispatch.instances.push(DispatchInstance {
                                fn_idx: fallback_idx,
                                interface: iface,
                            });
                        }
                        _ => dispatch.fallback = Some(fallback_idx),
                    }
                    match &class_interface {
                        Some(iface) => dispatch.instances.push(DispatchInstance {
                            fn_idx: new_fn_idx,
                            interface: Rc::clone(iface),
                        }),
                        None => dispatch.fallback = Some(new_fn_idx),
                    }

                    let dispatch_flags = old_fn.flags | FnFlags::HAS_CLASS;
                    self.p_data.fns[old_idx] = Function {
                        flags: dispatch_flags,
                        kind: FunctionKind::Dispatch(dispatch),
                    };
                    self.p_data.fns.push(old_fn);
                    self.p_data.fn_names.push(id_tok.text.to_owned());

                    func_value = new_fn_idx;
                    self.p_data
                        .fns
                        .push(Function::forward(0, Span::of(&id_tok)));
                    self.p_data.fn_names.push(id_tok.text.to_owned());
                }
            } else {
                // Plain redefinition replaces the old body.
                func_value = old_idx;
                self.p_data.fns[old_idx] = Function::forward(0, Span::of(&id_tok));
            }
        } else {
            self.p_data.fn_map.insert(id_tok.text.to_owned(), func_value);
            self.p_data
                .fns
                .push(Function::forward(0, Span::of(&id_tok)));
            self.p_data.fn_names.push(id_tok.text.to_owned());
        }

        let mut sub = Parser::new(&mut *self.p_data, func_value);
        sub.top_level_consts = Some(&self.consts);
        sub.self_name = Some(id_tok.text);
        sub.class_interface = class_interface;
        sub.current_span = Span::of(&id_tok);

        let mut num_args = 0usize;
        if let Some(recv) = receiver_tok {
            if recv.text != "_" {
                sub.vars.insert(recv.text.to_owned(), 0);
            }
            num_args += 1;
            sub.num_locals += 1;
        }

        let open = l.next_token();
        sub.expect_op(&open, "(", "'('")?;
        let t = l.peek(0);
        if t.kind == TokenKind::Identifier {
            l.next_token();
            if sub.vars.insert(t.text.to_owned(), num_args as u16).is_some() {
                return Err(ParseError::DuplicateArgument {
                    name: t.text.to_owned(),
                    span: Span::of(&t),
                });
            }
            sub.num_locals += 1;
            num_args += 1;
            loop {
                let t = l.peek(0);
                if t.is_op(")") {
                    l.next_token();
                    break;
                } else if t.is_op(",") {
                    l.next_token();
                    let arg = l.next_token();
                    sub.expect_identifier(&arg)?;
                    if sub
                        .vars
                        .insert(arg.text.to_owned(), num_args as u16)
                        .is_some()
                    {
                        return Err(ParseError::DuplicateArgument {
                            name: arg.text.to_owned(),
                            span: Span::of(&arg),
                        });
                    }
                    sub.num_locals += 1;
                    if sub.num_locals > MAX_LOCALS {
                        return Err(sub.bytecode_gen_error());
                    }
                    num_args += 1;
                } else {
                    return Err(sub.unexpected(&t, Some("arguments")));
                }
            }
        } else if t.is_op(")") {
            l.next_token();
        } else {
            return Err(sub.unexpected(&t, Some("arguments")));
        }

        if let Some(expected) = expected_num_args {
            if expected != num_args {
                // A forward call fixed the arity first; point at it.
                return Err(match forward_decl_span {
                    Some(span) => ParseError::WrongArgumentCount {
                        got: expected,
                        expected: num_args,
                        span,
                    },
                    None => ParseError::WrongArgumentCount {
                        got: num_args,
                        expected,
                        span: Span::of(&id_tok),
                    },
                });
            }
        }
        sub.self_num_args = num_args;

        if fn_flags.contains(FnFlags::HAS_CLASS) {
            sub.emit(op::load_self());
        }
        sub.self_flags = fn_flags;

        let source_map_start = sub.p_data.source_map.len();
        sub.exec_block(l)?;
        sub.emit(op::ret_null());

        let func_value16 = u16::try_from(func_value).map_err(|_| sub.bytecode_gen_error())?;
        let fill_offsets = std::mem::take(&mut sub.self_fill_call);
        for offset in fill_offsets {
            sub.patch16(offset, func_value16);
        }

        let final_flags = sub.self_flags;
        let mut bcs = sub.finish();
        bcs.source_map_start = source_map_start;
        self.p_data.fns[func_value] = Function {
            flags: final_flags,
            kind: FunctionKind::Bytecode(bcs),
        };
        Ok(())
    }
}
