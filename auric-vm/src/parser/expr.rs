//! Expression parsing and emission.
//!
//! Each precedence level is a left-associative loop over the next-higher
//! level. An expression leaves its result in the top-of-stack register;
//! binary operators pop two operands and push the result.

use auric_asm::{op, Instruction, Opcode};

use crate::consts::{MAX_ARGS, MAX_FUNC_ID, MAX_LOCALS, MAX_STATIC_IDX, SMALL_INT_MAX};
use crate::error::{ParseError, Span};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;

use super::regs::OwnedReg;
use super::resolve::FnRef;
use super::Parser;

/// Assignment operator classification: plain `=`, or the binary opcode
/// of a compound form.
fn assign_op(t: &Token<'_>) -> Option<Option<Opcode>> {
    if t.kind != TokenKind::Operator {
        return None;
    }
    match t.text {
        "=" => Some(None),
        "+=" => Some(Some(Opcode::Add)),
        "-=" => Some(Some(Opcode::Sub)),
        "*=" => Some(Some(Opcode::Mul)),
        "/=" => Some(Some(Opcode::Div)),
        "%=" => Some(Some(Opcode::Mod)),
        _ => None,
    }
}

type Level<'src, 'pd> = fn(&mut Parser<'src, 'pd>, &mut Lexer<'src>) -> Result<(), ParseError>;

impl<'src, 'pd> Parser<'src, 'pd> {
    pub(crate) fn exec_expr(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.exec_assign(l)
    }

    fn exec_assign(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let t = l.peek(0);
        if t.kind == TokenKind::Identifier || t.kind == TokenKind::AtIdentifier {
            if let Some(compound) = assign_op(&l.peek(1)) {
                l.next_token();
                l.next_token();
                self.exec_expr(l)?;

                if t.kind == TokenKind::AtIdentifier {
                    return self.assign_field(&t, compound);
                }
                return self.assign_local(&t, compound);
            }
        }
        self.exec_logical(l)
    }

    fn assign_field(
        &mut self,
        t: &Token<'src>,
        compound: Option<Opcode>,
    ) -> Result<(), ParseError> {
        let interface = self
            .class_interface
            .clone()
            .ok_or(ParseError::ClassScopeOnly { span: Span::of(t) })?;
        let slot = interface
            .field(&t.text[1..])
            .ok_or_else(|| ParseError::UnknownVariable {
                name: t.text.to_owned(),
                span: Span::of(t),
            })?;
        let slot = slot as u16;

        if let Some(binop) = compound {
            let get_reg = self.new_reg()?;
            self.emit(op::class_get_inner(get_reg, slot));
            // Stack is [rhs, field]; reorder so the field is the left
            // operand.
            self.swap_top_regs();
            self.emit_binary(binop)?;
        }
        self.emit(op::class_set_inner(self.last_reg(), slot));
        Ok(())
    }

    fn assign_local(
        &mut self,
        t: &Token<'src>,
        compound: Option<Opcode>,
    ) -> Result<(), ParseError> {
        if let Some(binop) = compound {
            let local = *self
                .vars
                .get(t.text)
                .ok_or_else(|| ParseError::UnknownVariable {
                    name: t.text.to_owned(),
                    span: Span::of(t),
                })?;
            let modifier_reg = self.last_reg();
            let slot = usize::from(local);
            if self.local_to_reg.len() <= slot {
                self.local_to_reg.resize(slot + 1, None);
            }
            let result_reg = match self.local_to_reg[slot] {
                Some(cached) => cached,
                None => {
                    let reg = self.new_reg()?;
                    self.local_to_reg[slot] = Some(reg);
                    self.pinned_regs.set(reg);
                    reg
                }
            };
            self.emit(op::mov_local_reg(result_reg, local));
            self.emit(Instruction::new(binop, result_reg, modifier_reg, result_reg));
            self.emit(op::mov_reg_local(result_reg, local));
            return Ok(());
        }

        let value_reg = self.last_reg();
        let slot = match self.vars.get(t.text) {
            Some(&existing) => {
                let idx = usize::from(existing);
                if idx < self.local_to_reg.len() {
                    if let Some(old_reg) = self.local_to_reg[idx] {
                        self.pinned_regs.reset(old_reg);
                    }
                    self.local_to_reg[idx] = Some(value_reg);
                    self.pinned_regs.set(value_reg);
                }
                existing
            }
            None => {
                if self.num_locals + 1 > MAX_LOCALS {
                    return Err(self.bytecode_gen_error());
                }
                let slot = self.num_locals as u16;
                self.vars.insert(t.text.to_owned(), slot);
                self.num_locals += 1;
                slot
            }
        };
        self.emit(op::mov_reg_local(value_reg, slot));
        Ok(())
    }

    fn exec_logical(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.exec_eq(l)?;

        let save = l.save();
        let t = l.next_token();
        if t.is_op("&&") {
            self.flush_cached_regs();

            let result_reg = self.new_reg()?;
            self.swap_top_regs();
            self.emit(op::mov_bool(0, result_reg));

            let lhs_reg = self.pop_reg();
            let left_imm = self.emit_placeholder_imm16(Opcode::Jnif, lhs_reg);

            self.exec_expr(l)?;
            self.flush_cached_regs();

            let rhs_reg = self.pop_reg();
            let right_imm = self.emit_placeholder_imm16(Opcode::Jnif, rhs_reg);

            self.emit(op::mov_bool(1, result_reg));

            let end = self.bc.len();
            self.patch_jump(left_imm, end)?;
            self.patch_jump(right_imm, end)?;
        } else if t.is_op("||") {
            self.flush_cached_regs();

            let result_reg = self.new_reg()?;
            self.swap_top_regs();

            let lhs_reg = self.pop_reg();
            let left_imm = self.emit_placeholder_imm16(Opcode::Jif, lhs_reg);

            self.exec_expr(l)?;
            self.flush_cached_regs();

            let rhs_reg = self.pop_reg();
            let right_imm = self.emit_placeholder_imm16(Opcode::Jif, rhs_reg);

            self.emit(op::mov_bool(0, result_reg));
            let skip_imm = self.emit_placeholder_imm16(Opcode::Jrel, 0);

            let truthy = self.bc.len();
            self.emit(op::mov_bool(1, result_reg));

            let end = self.bc.len();
            self.patch_jump(skip_imm, end)?;
            self.patch_jump(left_imm, truthy)?;
            self.patch_jump(right_imm, truthy)?;
        } else {
            l.restore(save);
        }
        Ok(())
    }

    fn binary_level(
        &mut self,
        l: &mut Lexer<'src>,
        lower: Level<'src, 'pd>,
        match_op: fn(&Token<'_>) -> Option<Opcode>,
    ) -> Result<(), ParseError> {
        lower(self, l)?;
        loop {
            let save = l.save();
            let t = l.next_token();
            if t.kind == TokenKind::Operator {
                if let Some(binop) = match_op(&t) {
                    lower(self, l)?;
                    self.emit_binary(binop)?;
                    continue;
                }
            }
            l.restore(save);
            return Ok(());
        }
    }

    fn exec_eq(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.binary_level(l, Self::exec_cmp, |t| match t.text {
            "==" => Some(Opcode::Eq),
            "!=" => Some(Opcode::Neq),
            _ => None,
        })
    }

    fn exec_cmp(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.binary_level(l, Self::exec_addsub, |t| match t.text {
            "<" => Some(Opcode::Lt),
            ">" => Some(Opcode::Gt),
            "<=" => Some(Opcode::Leq),
            ">=" => Some(Opcode::Geq),
            _ => None,
        })
    }

    fn exec_addsub(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.binary_level(l, Self::exec_muldiv, |t| match t.text {
            "+" => Some(Opcode::Add),
            "-" => Some(Opcode::Sub),
            _ => None,
        })
    }

    fn exec_muldiv(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.binary_level(l, Self::exec_bitwise_logic, |t| match t.text {
            "*" => Some(Opcode::Mul),
            "/" => Some(Opcode::Div),
            "%" => Some(Opcode::Mod),
            _ => None,
        })
    }

    fn exec_bitwise_logic(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.binary_level(l, Self::exec_bitwise_shift, |t| match t.text {
            "&" => Some(Opcode::Band),
            "|" => Some(Opcode::Bor),
            "^" => Some(Opcode::Bxor),
            _ => None,
        })
    }

    fn exec_bitwise_shift(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.binary_level(l, Self::exec_unary, |t| match t.text {
            "<<" => Some(Opcode::Bshl),
            ">>" => Some(Opcode::Bshr),
            _ => None,
        })
    }

    fn exec_unary(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let t = l.peek(0);
        let unary = if t.is_op("!") {
            Some(Opcode::Not)
        } else if t.is_op("~") {
            Some(Opcode::Bnot)
        } else {
            None
        };
        let Some(unary) = unary else {
            return self.exec_index(l);
        };

        l.next_token();
        self.exec_expr(l)?;
        let src = self.pop_reg();
        let dst = self.new_reg()?;
        self.emit(Instruction::new(unary, src, dst, 0));
        Ok(())
    }

    /// Collapse `[base, key, result]` stack tops to `[result]`.
    fn collapse_index_regs(&mut self) {
        let len = self.rstack.len();
        self.set_reg_unused(self.rstack[len - 3]);
        self.set_reg_unused(self.rstack[len - 2]);
        self.rstack[len - 3] = self.rstack[len - 1];
        self.rstack.truncate(len - 2);
    }

    fn exec_index(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        self.exec_value(l)?;
        loop {
            let left_reg = self.last_reg();
            let t = l.peek(0);
            if t.is_op("[") {
                l.next_token();
                self.exec_expr(l)?;
                let idx_reg = self.last_reg();

                let close = l.next_token();
                self.expect_op(&close, "]", "']'")?;

                let t = l.peek(0);
                if let Some(compound) = assign_op(&t) {
                    l.next_token();
                    self.exec_expr(l)?;
                    let right_reg = self.last_reg();

                    if let Some(binop) = compound {
                        let result_reg = self.new_reg()?;
                        self.emit(op::idx_get(left_reg, idx_reg, result_reg));
                        self.emit(Instruction::new(binop, result_reg, right_reg, result_reg));
                        self.emit(op::idx_set(left_reg, idx_reg, result_reg));
                        // [base, key, rhs, result] → [base, key, result]
                        self.swap_top_regs();
                        self.pop_reg();
                    } else {
                        self.emit(op::idx_set(left_reg, idx_reg, right_reg));
                    }
                    self.collapse_index_regs();
                    return Ok(());
                }

                let result_reg = self.new_reg()?;
                self.emit(op::idx_get(left_reg, idx_reg, result_reg));
                self.collapse_index_regs();
            } else if t.is_op(".") {
                l.next_token();
                let id_tok = l.next_token();
                if id_tok.is_op("(") {
                    // Calling the value itself: `expr.(args)`.
                    let mut params = Vec::new();
                    self.exec_call_args(l, &mut params)?;
                    if params.len() > MAX_ARGS {
                        return Err(self.bytecode_gen_error());
                    }
                    for param in &params {
                        self.emit(op::push_arg(param.reg));
                    }
                    let fn_reg = self.pop_reg();
                    let ret_reg = self.new_reg()?;
                    self.emit(op::call_func_value(fn_reg, params.len() as u8, ret_reg));
                    for param in params {
                        self.release_owned_reg(param);
                    }
                } else {
                    if id_tok.kind != TokenKind::Identifier {
                        return Err(self.unexpected(&id_tok, Some("identifier or arguments")));
                    }
                    let (module_tok, id_tok) = self.split_module_path(l, id_tok)?;

                    if l.peek(0).is_op("(") {
                        // Method-call sugar: the receiver becomes the
                        // first argument.
                        l.next_token();
                        self.exec_call(l, module_tok, id_tok, true)?;
                    } else {
                        let fn_ref = self.resolve_fn(module_tok.as_ref(), &id_tok, 1)?;
                        let func_reg = self.new_reg()?;
                        self.load_func(fn_ref, func_reg)?;
                        self.emit(op::bind_arg_to_func(func_reg, left_reg));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Emit `LOAD_FUNC`, deferring the index for self-references.
    fn load_func(&mut self, fn_ref: FnRef, func_reg: u8) -> Result<(), ParseError> {
        match fn_ref {
            FnRef::SelfRef => {
                let imm = self.emit_placeholder_imm16(Opcode::LoadFunc, func_reg);
                self.self_fill_call.push(imm);
            }
            FnRef::Index(idx) => {
                if idx > MAX_FUNC_ID {
                    return Err(self.bytecode_gen_error());
                }
                self.emit(op::load_func(func_reg, idx as u16));
            }
        }
        Ok(())
    }

    /// Peel an optional `module::` prefix off an identifier path.
    fn split_module_path(
        &mut self,
        l: &mut Lexer<'src>,
        id_tok: Token<'src>,
    ) -> Result<(Option<Token<'src>>, Token<'src>), ParseError> {
        if l.peek(0).is_op("::") {
            l.next_token();
            let member = l.next_token();
            self.expect_identifier(&member)?;
            Ok((Some(id_tok), member))
        } else {
            Ok((None, id_tok))
        }
    }

    fn exec_call_args(
        &mut self,
        l: &mut Lexer<'src>,
        params: &mut Vec<OwnedReg>,
    ) -> Result<(), ParseError> {
        if l.peek(0).is_op(")") {
            l.next_token();
            return Ok(());
        }
        loop {
            self.exec_expr(l)?;
            params.push(self.pop_reg_take_ownership());
            let t = l.next_token();
            if t.is_op(")") {
                return Ok(());
            }
            self.expect_op(&t, ",", "',' or ')'")?;
        }
    }

    pub(crate) fn exec_call(
        &mut self,
        l: &mut Lexer<'src>,
        module_tok: Option<Token<'src>>,
        id_tok: Token<'src>,
        has_self_argument: bool,
    ) -> Result<(), ParseError> {
        let mut params = Vec::new();
        if has_self_argument {
            let receiver = self.pop_reg_take_ownership();
            params.push(receiver);
        }
        self.exec_call_args(l, &mut params)?;

        let fn_ref = self.resolve_fn(module_tok.as_ref(), &id_tok, params.len())?;
        let expected = match fn_ref {
            FnRef::SelfRef => self.self_num_args,
            FnRef::Index(idx) => self.p_data.fns[idx].num_args(),
        };
        if expected != params.len() {
            return Err(ParseError::WrongArgumentCount {
                got: params.len(),
                expected,
                span: Span::of(&id_tok),
            });
        }

        for param in &params {
            self.emit(op::push_arg(param.reg));
        }
        let result_reg = self.new_reg()?;
        let call_imm = self.emit_placeholder_imm16(Opcode::Call, result_reg);
        match fn_ref {
            FnRef::SelfRef => self.self_fill_call.push(call_imm),
            FnRef::Index(idx) => {
                if idx > MAX_FUNC_ID {
                    return Err(self.bytecode_gen_error());
                }
                self.patch16(call_imm, idx as u16);
            }
        }
        for param in params {
            self.release_owned_reg(param);
        }
        Ok(())
    }

    fn exec_value(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let t = l.next_token();
        match t.kind {
            TokenKind::Int => {
                let num = parse_int(t.text);
                let reg = self.new_reg()?;
                if num <= SMALL_INT_MAX {
                    self.emit(op::mov_u16(reg, num as u16));
                } else {
                    let idx = self.p_data.add_data(Value::Int(num));
                    self.emit_load_const(reg, idx)?;
                }
            }
            TokenKind::Double => {
                let value: f64 = t
                    .text
                    .parse()
                    .map_err(|_| self.unexpected(&t, Some("number")))?;
                let reg = self.new_reg()?;
                let idx = self.p_data.add_data(Value::Double(value));
                self.emit_load_const(reg, idx)?;
            }
            TokenKind::String | TokenKind::CharString => {
                let unescaped = unescape(t.text);
                let idx = if t.kind == TokenKind::CharString {
                    let text = unescaped.as_deref().unwrap_or(t.text);
                    let codepoint = text
                        .chars()
                        .next()
                        .ok_or_else(|| self.unexpected(&t, Some("character")))?;
                    self.p_data.add_data(Value::Int(codepoint as i32))
                } else {
                    match &unescaped {
                        Some(s) => self.p_data.add_string_data(s.as_bytes()),
                        None => self.p_data.add_string_data(t.text.as_bytes()),
                    }
                };
                let reg = self.new_reg()?;
                self.emit_load_const(reg, idx)?;
            }
            TokenKind::AtIdentifier => {
                let interface = self
                    .class_interface
                    .clone()
                    .ok_or(ParseError::ClassScopeOnly { span: Span::of(&t) })?;
                let slot =
                    interface
                        .field(&t.text[1..])
                        .ok_or_else(|| ParseError::UnknownVariable {
                            name: t.text.to_owned(),
                            span: Span::of(&t),
                        })?;
                let reg = self.new_reg()?;
                self.emit(op::class_get_inner(reg, slot as u16));
            }
            TokenKind::Operator => return self.exec_value_operator(l, t),
            TokenKind::Identifier => return self.exec_value_identifier(l, t),
            _ => return Err(self.unexpected(&t, Some("value"))),
        }
        Ok(())
    }

    fn exec_value_operator(
        &mut self,
        l: &mut Lexer<'src>,
        t: Token<'src>,
    ) -> Result<(), ParseError> {
        if t.is_op("(") {
            if l.peek(0).is_op("-") {
                l.next_token();
                self.exec_expr(l)?;
                let src = self.pop_reg();
                let dst = self.new_reg()?;
                self.emit(op::neg(src, dst));
            } else {
                self.exec_expr(l)?;
            }
            let close = l.next_token();
            self.expect_op(&close, ")", "')'")?;
            Ok(())
        } else if t.is_op("[") {
            self.exec_array_or_tuple(l, false)
        } else if t.is_op("#[") {
            self.exec_array_or_tuple(l, true)
        } else if t.is_op("{") {
            self.exec_dict(l)
        } else if t.is_op(".") {
            // Function literal: `.name` or `.module::name`.
            let id_tok = l.next_token();
            self.expect_identifier(&id_tok)?;
            let (module_tok, id_tok) = self.split_module_path(l, id_tok)?;
            let fn_ref = self.resolve_fn(module_tok.as_ref(), &id_tok, 1)?;
            let func_reg = self.new_reg()?;
            self.load_func(fn_ref, func_reg)
        } else {
            Err(self.unexpected(&t, None))
        }
    }

    fn exec_value_identifier(
        &mut self,
        l: &mut Lexer<'src>,
        t: Token<'src>,
    ) -> Result<(), ParseError> {
        match t.text {
            "true" | "false" => {
                let reg = self.new_reg()?;
                self.emit(op::mov_bool(u8::from(t.text == "true"), reg));
                return Ok(());
            }
            "nil" => {
                let reg = self.new_reg()?;
                self.emit(op::load_nil(reg));
                return Ok(());
            }
            "new" if !l.peek(0).is_op("(") => return self.exec_new(l),
            _ => {}
        }

        let (module_tok, t) = self.split_module_path(l, t)?;

        if l.peek(0).is_op("(") {
            l.next_token();
            return self.exec_call(l, module_tok, t, false);
        }

        if let Some(module_tok) = module_tok {
            // `alias::NAME` names an exported constant; reserve a pool
            // slot the import fills in.
            let module_idx =
                self.resolve_module(module_tok.text)
                    .ok_or_else(|| ParseError::UnknownModule {
                        name: module_tok.text.to_owned(),
                        span: Span::of(&module_tok),
                    })?;
            let slot = match self.p_data.imported_modules[module_idx].const_map.get(t.text) {
                Some(&slot) => slot,
                None => {
                    let slot = self.p_data.data_vals.len();
                    self.p_data.imported_modules[module_idx]
                        .const_map
                        .insert(t.text.to_owned(), slot);
                    self.p_data.add_data(Value::None);
                    slot
                }
            };
            let reg = self.new_reg()?;
            return self.emit_load_const(reg, slot);
        }

        match self.vars.get(t.text) {
            None => {
                let slot = self
                    .consts
                    .get(t.text)
                    .or_else(|| self.top_level_consts.and_then(|consts| consts.get(t.text)))
                    .copied()
                    .ok_or_else(|| ParseError::UnknownVariable {
                        name: t.text.to_owned(),
                        span: Span::of(&t),
                    })?;
                let reg = self.new_reg()?;
                self.emit_load_const(reg, slot)?;
            }
            Some(&local) => {
                let slot = usize::from(local);
                if self.local_to_reg.len() <= slot {
                    self.local_to_reg.resize(slot + 1, None);
                }
                match self.local_to_reg[slot] {
                    None => {
                        let reg = self.new_reg()?;
                        self.emit(op::mov_local_reg(reg, local));
                        self.local_to_reg[slot] = Some(reg);
                        self.pinned_regs.set(reg);
                    }
                    Some(cached) => {
                        self.push_reg(cached);
                        self.pinned_regs.set(cached);
                    }
                }
            }
        }
        Ok(())
    }

    fn exec_array_or_tuple(
        &mut self,
        l: &mut Lexer<'src>,
        is_tuple: bool,
    ) -> Result<(), ParseError> {
        let array_reg = self.new_reg()?;
        let new_op = if is_tuple {
            Opcode::TupleNew
        } else {
            Opcode::ArrayNew
        };
        let cap_imm = self.emit_placeholder_imm16(new_op, array_reg);

        if l.peek(0).is_op("]") {
            l.next_token();
            return Ok(());
        }

        let mut count: u16 = 0;
        loop {
            self.exec_expr(l)?;
            let value_reg = self.pop_reg();
            if is_tuple {
                if usize::from(count) + 1 > MAX_STATIC_IDX {
                    return Err(self.bytecode_gen_error());
                }
                self.emit(op::idx_set_static(array_reg, count as u8, value_reg));
            } else {
                self.emit(op::array_push(array_reg, value_reg));
            }
            count = count.saturating_add(1);

            let t = l.peek(0);
            if t.is_op("]") {
                l.next_token();
                break;
            } else if t.is_op(",") {
                l.next_token();
                // Trailing comma.
                if l.peek(0).is_op("]") {
                    l.next_token();
                    break;
                }
            } else {
                return Err(self.unexpected(&t, Some("',' or ']'")));
            }
        }

        self.patch16(cap_imm, count);
        Ok(())
    }

    fn exec_dict(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let dict_reg = self.new_reg()?;
        self.emit(op::dict_new(dict_reg, 0));
        let t = l.next_token();
        self.expect_op(&t, "}", "'}'")
    }

    fn exec_new(&mut self, l: &mut Lexer<'src>) -> Result<(), ParseError> {
        let id_tok = l.next_token();
        self.expect_identifier(&id_tok)?;
        let class_idx = self.p_data.class_map.get(id_tok.text).copied().ok_or_else(|| {
            ParseError::UnknownClass {
                name: id_tok.text.to_owned(),
                span: Span::of(&id_tok),
            }
        })?;
        let class_idx16 = u16::try_from(class_idx).map_err(|_| self.bytecode_gen_error())?;

        if !l.peek(0).is_op("{") {
            let reg = self.new_reg()?;
            self.emit(op::class_new(reg, class_idx16));
            return Ok(());
        }
        l.next_token();

        let interface = std::rc::Rc::clone(&self.p_data.classes[class_idx]);
        let mut initializers: Vec<(OwnedReg, u16)> = Vec::new();
        loop {
            let tok = l.next_token();
            if tok.is_op("}") {
                break;
            }
            self.expect_identifier(&tok)?;
            let slot = interface
                .field(tok.text)
                .ok_or_else(|| ParseError::UnknownVariable {
                    name: tok.text.to_owned(),
                    span: Span::of(&tok),
                })?;
            let colon = l.next_token();
            self.expect_op(&colon, ":", "':'")?;
            self.exec_expr(l)?;
            initializers.push((self.pop_reg_take_ownership(), slot as u16));

            let comma = l.next_token();
            if comma.is_op("}") {
                break;
            }
            self.expect_op(&comma, ",", "','")?;
        }

        let result_reg = self.new_reg()?;
        if initializers.is_empty() {
            self.emit(op::class_new(result_reg, class_idx16));
            return Ok(());
        }
        self.emit(op::class_new_initialized(result_reg, class_idx16));
        for (owned, slot) in &initializers {
            self.emit(op::class_set_inner(owned.reg, *slot));
            self.set_reg_unused(owned.reg);
        }
        for (owned, _) in initializers {
            self.release_owned_reg(owned);
        }
        // Closes the initialisation window of CLASS_NEW_INITIALIZED.
        self.emit(op::nop());
        Ok(())
    }

    fn emit_load_const(&mut self, reg: u8, idx: usize) -> Result<(), ParseError> {
        let idx = u16::try_from(idx).map_err(|_| self.bytecode_gen_error())?;
        self.emit(op::load_const(reg, idx));
        Ok(())
    }
}

fn parse_int(text: &str) -> i32 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let mut num: i32 = 0;
        for ch in hex.chars() {
            let digit = ch.to_digit(16).unwrap_or(0) as i32;
            num = num.wrapping_mul(16).wrapping_add(digit);
        }
        num
    } else {
        let mut num: i32 = 0;
        for ch in text.chars() {
            let digit = ch.to_digit(10).unwrap_or(0) as i32;
            num = num.wrapping_mul(10).wrapping_add(digit);
        }
        num
    }
}

fn unescape(text: &str) -> Option<String> {
    if !text.contains('\\') {
        return None;
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}
