//! Expression assembly.
//!
//! Expressions are split at the weakest binary operator found outside
//! any parenthesised group or call, recursing into both halves; with no
//! operator left the slice is dispatched to the unary / cast / call /
//! literal / variable builders. Types of both operand sides must agree;
//! the only inference performed is literal-to-declared retyping within
//! the same literal class.

use std::sync::Arc;

use crate::ast::expressions::{
    BinaryOpNode, CallNode, CallTarget, Expression, GroupNode, InterpolationNode,
    InterpolationPart, LiteralNode, LiteralValue, TupleAccessNode, TypeCastNode, UnaryOpNode,
    VariableNode,
};
use crate::ast::scope::ScopeArena;
use crate::diagnostics::{Diagnostic, ErrKind};
use crate::lexer::token::{PositionedToken, TokenKind};
use crate::lexer::{self, Lexer};
use crate::parser::builtins;
use crate::signature::{self, patterns, tok};
use crate::types::{Primitive, Type};

use super::{levenshtein, Parser};

impl<'ctx> Parser<'ctx> {
    /// Build an expression from a raw statement slice. Layout tokens
    /// and trailing semicolons are discarded first.
    pub(crate) fn create_expression(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        tokens: &[PositionedToken],
    ) -> Result<Expression, ()> {
        let mut clean: Vec<PositionedToken> = tokens
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Eof
                )
            })
            .cloned()
            .collect();
        while clean.last().map(|tok| tok.kind) == Some(TokenKind::Semicolon) {
            clean.pop();
        }
        if clean.is_empty() {
            let (line, column) = super::definition_position(tokens);
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                line,
                column,
                1,
                ErrKind::ValUnknownLiteral {
                    lexeme: String::new(),
                },
            ));
            return Err(());
        }
        self.expression_from_clean(scopes, scope_id, &clean)
    }

    fn expression_from_clean(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        clean: &[PositionedToken],
    ) -> Result<Expression, ()> {
        // A slice fully wrapped in parentheses is a group.
        if clean[0].kind == TokenKind::LeftParen {
            if let Some((start, end)) = signature::balanced_range_extraction(
                clean,
                &[tok(TokenKind::LeftParen)],
                &[tok(TokenKind::RightParen)],
            ) {
                if start == 0 && end == clean.len() {
                    return self.create_group(scopes, scope_id, clean);
                }
            }
        }

        if let Some(op_idx) = find_split_operator(clean) {
            return self.create_binary_op(scopes, scope_id, clean, op_idx);
        }

        // Unary prefix operator.
        if patterns::is_unary_operator(clean[0].kind) && clean.len() > 1 {
            let operand = self.expression_from_clean(scopes, scope_id, &clean[1..])?;
            let ty = match clean[0].kind {
                TokenKind::Not => self.ctx().types.primitive_of(Primitive::Bool),
                _ => operand.result_type(),
            };
            return Ok(Expression::Unary(UnaryOpNode {
                op: clean[0].kind,
                operand: Box::new(operand),
                ty,
            }));
        }

        // `$"…{expr}…"` interpolation template.
        if clean.len() == 2
            && clean[0].kind == TokenKind::Dollar
            && clean[1].kind == TokenKind::StrValue
        {
            return self.create_interpolation(scopes, scope_id, &clean[1]);
        }

        // `i32(expr)` style cast.
        if clean.len() >= 4
            && clean[0].kind == TokenKind::Type
            && clean[1].kind == TokenKind::LeftParen
            && clean[clean.len() - 1].kind == TokenKind::RightParen
        {
            let target = clean[0].ty().cloned().ok_or(())?;
            let operand =
                self.expression_from_clean(scopes, scope_id, &clean[2..clean.len() - 1])?;
            return Ok(Expression::TypeCast(TypeCastNode {
                target,
                operand: Box::new(operand),
            }));
        }

        // Function call.
        if signature::tokens_contain(clean, &patterns::FUNCTION_CALL)
            && clean[0].kind == TokenKind::Identifier
            && clean[1].kind == TokenKind::LeftParen
        {
            return self.create_call(scopes, scope_id, clean);
        }

        // `tuple.N` access.
        if clean.len() == 3
            && clean[0].kind == TokenKind::Identifier
            && clean[1].kind == TokenKind::Dot
            && clean[2].kind == TokenKind::IntValue
        {
            return self.create_tuple_access(scopes, scope_id, clean);
        }

        if clean.len() == 1 && patterns::is_literal(clean[0].kind) {
            return self.create_literal(&clean[0]);
        }

        if clean.len() == 1 && clean[0].kind == TokenKind::Identifier {
            return self.create_variable(scopes, scope_id, &clean[0]);
        }

        self.ctx().emit(Diagnostic::new(
            self.file().clone(),
            clean[0].line,
            clean[0].column,
            clean.iter().map(PositionedToken::width).sum::<u32>(),
            ErrKind::ValUnknownLiteral {
                lexeme: lexer::to_string(clean),
            },
        ));
        Err(())
    }

    fn create_binary_op(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        clean: &[PositionedToken],
        op_idx: usize,
    ) -> Result<Expression, ()> {
        let op_tok = &clean[op_idx];
        if op_idx == 0 || op_idx + 1 >= clean.len() {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                op_tok.line,
                op_tok.column,
                op_tok.width(),
                ErrKind::ExprBinopCreationFailed,
            ));
            return Err(());
        }
        let lhs = self.expression_from_clean(scopes, scope_id, &clean[..op_idx])?;
        let rhs = self.expression_from_clean(scopes, scope_id, &clean[op_idx + 1..])?;

        let lhs_ty = lhs.result_type();
        let rhs_ty = rhs.result_type();
        let (lhs, rhs) = if lhs_ty == rhs_ty {
            (lhs, rhs)
        } else if let Some(rhs) = coerce_literal(self, rhs.clone(), &lhs_ty) {
            (lhs, rhs)
        } else if let Some(lhs) = coerce_literal(self, lhs.clone(), &rhs_ty) {
            (lhs, rhs)
        } else {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                op_tok.line,
                op_tok.column,
                op_tok.width(),
                ErrKind::ExprBinopTypeMismatch {
                    op: op_tok.kind,
                    lhs: lhs_ty,
                    rhs: rhs_ty,
                },
            ));
            return Err(());
        };

        let ty = match op_tok.kind {
            TokenKind::EqualEqual
            | TokenKind::NotEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::And
            | TokenKind::Or => self.ctx().types.primitive_of(Primitive::Bool),
            _ => lhs.result_type(),
        };
        Ok(Expression::Binary(BinaryOpNode {
            op: op_tok.kind,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }))
    }

    /// Parse `( … )`: a single parenthesised expression or a tuple
    /// value when top-level commas are present.
    fn create_group(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        clean: &[PositionedToken],
    ) -> Result<Expression, ()> {
        let inner = &clean[1..clean.len() - 1];
        if inner.is_empty() {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                clean[0].line,
                clean[0].column,
                2,
                ErrKind::ValUnknownLiteral {
                    lexeme: "()".to_string(),
                },
            ));
            return Err(());
        }
        let elements = split_top_level(inner, TokenKind::Comma);
        if elements.len() <= 1 {
            let expr = self.expression_from_clean(scopes, scope_id, inner)?;
            let ty = expr.result_type();
            return Ok(Expression::Group(GroupNode {
                expressions: vec![expr],
                ty,
            }));
        }

        let mut expressions = Vec::with_capacity(elements.len());
        for element in &elements {
            // A tuple element that is itself a comma group is a nested
            // group, which the language forbids.
            if element.first().map(|tok| tok.kind) == Some(TokenKind::LeftParen)
                && element.last().map(|tok| tok.kind) == Some(TokenKind::RightParen)
                && split_top_level(&element[1..element.len() - 1], TokenKind::Comma).len() > 1
            {
                let pos = &element[0];
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    pos.line,
                    pos.column,
                    1,
                    ErrKind::ExprNestedGroup,
                ));
                return Err(());
            }
            expressions.push(self.expression_from_clean(scopes, scope_id, element)?);
        }
        let ty = self.ctx().types.intern(Type::Tuple {
            elements: expressions.iter().map(Expression::result_type).collect(),
        });
        Ok(Expression::Group(GroupNode { expressions, ty }))
    }

    fn create_call(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        clean: &[PositionedToken],
    ) -> Result<Expression, ()> {
        let name_tok = &clean[0];
        let name = name_tok.lexeme().to_string();
        let range = match signature::balanced_range_extraction(
            clean,
            &[tok(TokenKind::LeftParen)],
            &[tok(TokenKind::RightParen)],
        ) {
            Some(range) => range,
            None => {
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    name_tok.line,
                    name_tok.column,
                    name_tok.width(),
                    ErrKind::UnclosedParen,
                ));
                return Err(());
            }
        };

        let inner = &clean[range.0 + 1..range.1 - 1];
        let mut args = Vec::new();
        for segment in split_top_level(inner, TokenKind::Comma) {
            if segment.is_empty() {
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    name_tok.line,
                    name_tok.column,
                    name_tok.width(),
                    ErrKind::ExprCallCreationFailed,
                ));
                return Err(());
            }
            args.push(self.expression_from_clean(scopes, scope_id, &segment)?);
        }
        let arg_types: Vec<Arc<Type>> = args.iter().map(Expression::result_type).collect();

        // Builtins first, imported core modules second, user functions
        // last.
        if let Some(fixed) = builtins::builtin(&name) {
            self.check_fixed_args(name_tok, fixed, &arg_types)?;
            let ty = self.rendered_type(fixed.return_type);
            return Ok(Expression::Call(CallNode {
                name,
                args,
                target: CallTarget::Builtin,
                ty,
            }));
        }

        if let Some((module, fixed)) = builtins::core_function(self.core_imports(), &name) {
            self.check_fixed_args(name_tok, &fixed, &arg_types)?;
            let ty = self.rendered_type(fixed.return_type);
            return Ok(Expression::Call(CallNode {
                name,
                args,
                target: CallTarget::Core {
                    module: module.to_string(),
                },
                ty,
            }));
        }

        let visible = {
            let table = self.ctx().functions_by_name.lock().unwrap();
            table
                .get(&name)
                .map(|functions| {
                    functions
                        .iter()
                        .filter(|function| {
                            function.file == *self.file()
                                || self.imported_files().contains(&function.file)
                        })
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };

        if !visible.is_empty() {
            for candidate in &visible {
                if candidate.param_types.len() != arg_types.len() {
                    continue;
                }
                let matches = candidate
                    .param_types
                    .iter()
                    .zip(&arg_types)
                    .all(|(param, arg)| param == arg);
                if matches {
                    let ty = candidate
                        .return_types
                        .first()
                        .cloned()
                        .unwrap_or_else(|| self.ctx().types.primitive_of(Primitive::Void));
                    return Ok(Expression::Call(CallNode {
                        name,
                        args,
                        target: CallTarget::User {
                            file: candidate.file.clone(),
                        },
                        ty,
                    }));
                }
            }
            // The name exists, so the failure is either a wrong count
            // or no matching overload.
            let same_count = visible
                .iter()
                .any(|candidate| candidate.param_types.len() == arg_types.len());
            let kind = if same_count {
                ErrKind::ExprCallOfUndefinedFunction {
                    name,
                    candidates: visible
                        .iter()
                        .map(crate::context::RegisteredFunction::signature)
                        .collect(),
                }
            } else {
                ErrKind::ExprCallWrongArgCount {
                    name,
                    expected: visible[0].param_types.len(),
                    found: arg_types.len(),
                }
            };
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                name_tok.line,
                name_tok.column,
                name_tok.width(),
                kind,
            ));
            return Err(());
        }

        // Nothing matched: actively search for near misses.
        let candidates = self.near_matches(&name);
        self.ctx().emit(Diagnostic::new(
            self.file().clone(),
            name_tok.line,
            name_tok.column,
            name_tok.width(),
            ErrKind::ExprCallOfUndefinedFunction { name, candidates },
        ));
        Err(())
    }

    fn check_fixed_args(
        &self,
        name_tok: &PositionedToken,
        fixed: &builtins::FixedFn,
        arg_types: &[Arc<Type>],
    ) -> Result<(), ()> {
        if fixed.params.len() != arg_types.len() {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                name_tok.line,
                name_tok.column,
                name_tok.width(),
                ErrKind::ExprCallWrongArgCount {
                    name: fixed.name.to_string(),
                    expected: fixed.params.len(),
                    found: arg_types.len(),
                },
            ));
            return Err(());
        }
        let ok = fixed
            .params
            .iter()
            .zip(arg_types)
            .all(|(param, arg)| *param == "any" || *param == arg.to_string());
        if !ok {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                name_tok.line,
                name_tok.column,
                name_tok.width(),
                ErrKind::ExprCallWrongArgsBuiltin {
                    name: fixed.name.to_string(),
                    expected: format!("({})", fixed.params.join(", ")),
                    found: arg_types.to_vec(),
                },
            ));
            return Err(());
        }
        Ok(())
    }

    /// Rendered signatures of functions whose name is close to the
    /// unresolved one.
    fn near_matches(&self, name: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        for fixed in builtins::BUILTIN_FUNCTIONS {
            if levenshtein(name, fixed.name) <= 2 {
                candidates.push(format!("{}({})", fixed.name, fixed.params.join(", ")));
            }
        }
        for module in builtins::CORE_MODULES {
            if !self
                .core_imports()
                .iter()
                .any(|imported| imported == module.name)
            {
                continue;
            }
            for fixed in module.functions {
                if levenshtein(name, fixed.name) <= 2 {
                    candidates.push(format!(
                        "Core.{}: {}({})",
                        module.name,
                        fixed.name,
                        fixed.params.join(", ")
                    ));
                }
            }
        }
        {
            let table = self.ctx().functions_by_name.lock().unwrap();
            for (known, functions) in table.iter() {
                if levenshtein(name, known) <= 2 {
                    for function in functions {
                        candidates.push(function.signature());
                    }
                }
            }
        }
        candidates.sort();
        candidates.dedup();
        candidates
    }

    fn create_tuple_access(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        clean: &[PositionedToken],
    ) -> Result<Expression, ()> {
        let base = self.create_variable(scopes, scope_id, &clean[0])?;
        let index: usize = clean[2].lexeme().parse().map_err(|_| ())?;
        let elements = match &*base.result_type() {
            Type::Tuple { elements } => elements.clone(),
            _ => Vec::new(),
        };
        if index >= elements.len() {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                clean[2].line,
                clean[2].column,
                clean[2].width(),
                ErrKind::ExprTupleAccessOob {
                    index,
                    size: elements.len(),
                },
            ));
            return Err(());
        }
        let ty = Arc::clone(&elements[index]);
        Ok(Expression::TupleAccess(TupleAccessNode {
            base: Box::new(base),
            index,
            ty,
        }))
    }

    fn create_literal(&self, token: &PositionedToken) -> Result<Expression, ()> {
        let types = &self.ctx().types;
        let (value, ty) = match token.kind {
            TokenKind::IntValue => match token.lexeme().parse::<i64>() {
                Ok(value) => (LiteralValue::Int(value), types.primitive_of(Primitive::I32)),
                Err(_) => {
                    self.emit_unknown_literal(token);
                    return Err(());
                }
            },
            TokenKind::FloatValue => match token.lexeme().parse::<f64>() {
                Ok(value) => (
                    LiteralValue::Float(value),
                    types.primitive_of(Primitive::F64),
                ),
                Err(_) => {
                    self.emit_unknown_literal(token);
                    return Err(());
                }
            },
            TokenKind::StrValue => (
                LiteralValue::Str(token.lexeme().to_string()),
                types.primitive_of(Primitive::Str),
            ),
            TokenKind::CharValue => match token.lexeme().chars().next() {
                Some(value) => (
                    LiteralValue::Char(value),
                    types.primitive_of(Primitive::Char),
                ),
                None => {
                    self.emit_unknown_literal(token);
                    return Err(());
                }
            },
            TokenKind::True => (LiteralValue::Bool(true), types.primitive_of(Primitive::Bool)),
            TokenKind::False => (
                LiteralValue::Bool(false),
                types.primitive_of(Primitive::Bool),
            ),
            TokenKind::None => (LiteralValue::None, types.primitive_of(Primitive::Void)),
            _ => {
                self.emit_unknown_literal(token);
                return Err(());
            }
        };
        Ok(Expression::Literal(LiteralNode { value, ty }))
    }

    fn emit_unknown_literal(&self, token: &PositionedToken) {
        self.ctx().emit(Diagnostic::new(
            self.file().clone(),
            token.line,
            token.column,
            token.width(),
            ErrKind::ValUnknownLiteral {
                lexeme: token.lexeme().to_string(),
            },
        ));
    }

    fn create_variable(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        token: &PositionedToken,
    ) -> Result<Expression, ()> {
        let name = token.lexeme().to_string();
        match scopes.resolve(scope_id, &name) {
            Some((decl_scope, info)) => Ok(Expression::Variable(VariableNode {
                name,
                ty: Arc::clone(&info.ty),
                decl_scope,
            })),
            None => {
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    token.line,
                    token.column,
                    token.width(),
                    ErrKind::VarNotDeclared { name },
                ));
                Err(())
            }
        }
    }

    /// Parse `$"…"`: split the template on top-level `{…}` groups,
    /// sub-lex every embedded expression, and reassemble.
    fn create_interpolation(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        template_tok: &PositionedToken,
    ) -> Result<Expression, ()> {
        let template = template_tok.lexeme();
        let mut parts: Vec<InterpolationPart> = Vec::new();
        let mut text = String::new();
        let mut expr_src = String::new();
        let mut depth = 0usize;
        for c in template.chars() {
            match c {
                '{' => {
                    if depth == 0 {
                        if !text.is_empty() {
                            parts.push(InterpolationPart::Text(std::mem::take(&mut text)));
                        }
                    } else {
                        expr_src.push(c);
                    }
                    depth += 1;
                }
                '}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        let expr = self.parse_embedded_expression(
                            scopes,
                            scope_id,
                            &std::mem::take(&mut expr_src),
                            template_tok,
                        )?;
                        parts.push(InterpolationPart::Expr(expr));
                    } else {
                        expr_src.push(c);
                    }
                }
                _ => {
                    if depth == 0 {
                        text.push(c);
                    } else {
                        expr_src.push(c);
                    }
                }
            }
        }
        if !text.is_empty() {
            parts.push(InterpolationPart::Text(text));
        }

        // A template that is exactly one interpolated expression should
        // be written as a plain conversion instead.
        if parts.len() == 1 {
            if let InterpolationPart::Expr(_) = parts[0] {
                let inner = template
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .to_string();
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    template_tok.line,
                    template_tok.column,
                    template_tok.width(),
                    ErrKind::ExprInterpolationOnlyOneExpr { expression: inner },
                ));
                return Err(());
            }
        }

        Ok(Expression::Interpolation(InterpolationNode {
            parts,
            ty: self.ctx().types.primitive_of(Primitive::Str),
        }))
    }

    fn parse_embedded_expression(
        &self,
        scopes: &ScopeArena,
        scope_id: usize,
        source: &str,
        template_tok: &PositionedToken,
    ) -> Result<Expression, ()> {
        let sub_tokens = Lexer::new(self.ctx(), self.file().clone(), source).scan();
        let clean: Vec<PositionedToken> = sub_tokens
            .into_iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Eof | TokenKind::Eol | TokenKind::Indent
                )
            })
            .collect();
        if clean.is_empty() {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                template_tok.line,
                template_tok.column,
                template_tok.width(),
                ErrKind::ValUnknownLiteral {
                    lexeme: source.to_string(),
                },
            ));
            return Err(());
        }
        self.expression_from_clean(scopes, scope_id, &clean)
    }

    fn rendered_type(&self, rendered: &str) -> Arc<Type> {
        self.ctx()
            .types
            .lookup(rendered)
            .unwrap_or_else(|| self.ctx().types.primitive_of(Primitive::Void))
    }
}

/// Retype a literal to the declared side, within the same literal
/// class: integer literals to integer primitives, float literals to
/// float primitives.
pub(crate) fn coerce_literal(
    parser: &Parser<'_>,
    expr: Expression,
    target: &Arc<Type>,
) -> Option<Expression> {
    let Expression::Literal(literal) = &expr else {
        return None;
    };
    let target_prim = match &**target {
        Type::Primitive(prim) => *prim,
        _ => return None,
    };
    let compatible = match literal.value {
        LiteralValue::Int(_) => matches!(
            target_prim,
            Primitive::I32 | Primitive::U32 | Primitive::I64 | Primitive::U64 | Primitive::U8
        ),
        LiteralValue::Float(_) => matches!(target_prim, Primitive::F32 | Primitive::F64),
        _ => false,
    };
    if !compatible {
        return None;
    }
    Some(Expression::Literal(LiteralNode {
        value: literal.value.clone(),
        ty: parser.ctx().types.primitive_of(target_prim),
    }))
}

/// Index of the binary operator the slice should split at: the weakest
/// operator outside any bracket, the rightmost among equals.
fn find_split_operator(clean: &[PositionedToken]) -> Option<usize> {
    let mut depth = 0usize;
    let mut best: Option<(usize, u8)> = None;
    let mut prev_operand = false;
    for (idx, tok) in clean.iter().enumerate() {
        match tok.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                depth += 1;
                prev_operand = false;
                continue;
            }
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                depth = depth.saturating_sub(1);
                prev_operand = true;
                continue;
            }
            _ => {}
        }
        if depth > 0 {
            continue;
        }
        if patterns::is_binary_operator(tok.kind) && prev_operand {
            let prec = patterns::precedence(tok.kind).unwrap_or(u8::MAX);
            match best {
                Some((_, best_prec)) if prec > best_prec => {}
                _ => best = Some((idx, prec)),
            }
            prev_operand = false;
        } else if patterns::is_binary_operator(tok.kind) || patterns::is_unary_operator(tok.kind) {
            prev_operand = false;
        } else {
            prev_operand = is_operand_like(tok.kind);
        }
    }
    best.map(|(idx, _)| idx)
}

fn is_operand_like(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::IntValue
            | TokenKind::FloatValue
            | TokenKind::StrValue
            | TokenKind::CharValue
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None
            | TokenKind::Type
    )
}

/// Split a slice at top-level occurrences of `separator`, ignoring
/// separators nested in any bracket pair. An empty slice yields no
/// segments.
pub(crate) fn split_top_level(
    tokens: &[PositionedToken],
    separator: TokenKind,
) -> Vec<Vec<PositionedToken>> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    for tok in tokens {
        match tok.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        if tok.kind == separator && depth == 0 {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(tok.clone());
        }
    }
    segments.push(current);
    segments
}
