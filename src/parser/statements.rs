//! Statement parsing.
//!
//! A body is consumed one terminator at a time: the statement signature
//! matches everything up to the first `;` or `:`. A `;`-terminated
//! slice is a simple statement; a `:`-terminated slice opens a scoped
//! statement whose body is extracted by indent. `else` arms are
//! accumulated into the preceding if-chain, `catch` attaches to the
//! preceding call statement.

use std::sync::Arc;

use crate::ast::expressions::{
    BinaryOpNode, Expression, LiteralNode, LiteralValue,
};
use crate::ast::scope::{ScopeArena, VariableInfo};
use crate::ast::statements::{
    AssignmentNode, CatchNode, DeclarationNode, EnhancedForNode, ExpressionStatement, ForNode,
    IfBranch, IfNode, ReturnNode, Statement, ThrowNode, WhileNode,
};
use crate::diagnostics::{Diagnostic, ErrKind};
use crate::lexer::{self, token::{PositionedToken, TokenKind, TokenList}};
use crate::signature::{self, combine, match_until_signature, patterns, raw, tok};
use crate::types::{Primitive, Type};

use super::expressions::{coerce_literal, split_top_level};
use super::{definition_position, leading_indents, Parser};

impl<'ctx> Parser<'ctx> {
    /// Parse a whole body of statements; failed productions are
    /// reported and skipped, so parsing continues at the next
    /// terminator.
    pub(crate) fn create_body(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        body: &mut TokenList,
    ) -> Vec<Statement> {
        let terminator = combine(&[
            &[raw("(?:")],
            &[tok(TokenKind::Semicolon)],
            &[raw("|")],
            &[tok(TokenKind::Colon)],
            &[raw(")")],
        ]);
        let statement_signature = match_until_signature(&terminator);

        let mut statements = Vec::new();
        loop {
            while body.first().map(|t| t.kind) == Some(TokenKind::Eol) {
                body.remove(0);
            }
            if body.iter().all(|tok| {
                matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Eof
                )
            }) {
                break;
            }

            let range = match signature::get_next_match_range(body, &statement_signature) {
                Some(range) => range,
                None => {
                    let (line, column) = definition_position(body);
                    self.ctx().emit(Diagnostic::new(
                        self.file().clone(),
                        line,
                        column,
                        1,
                        ErrKind::UndefinedStatement {
                            statement: lexer::to_string(body).trim().to_string(),
                        },
                    ));
                    body.clear();
                    break;
                }
            };

            let mut slice = Self::extract_from_to(0, range.1, body);
            // A classic for-loop header contains two semicolons before
            // its colon; keep extending the slice until the colon.
            let head = slice
                .iter()
                .find(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
                .map(|tok| tok.kind);
            if matches!(head, Some(TokenKind::For) | Some(TokenKind::Parallel))
                && !signature::tokens_contain(&slice, &[tok(TokenKind::In)])
            {
                while slice.last().map(|t| t.kind) == Some(TokenKind::Semicolon) {
                    let Some(next) = signature::get_next_match_range(body, &statement_signature)
                    else {
                        break;
                    };
                    slice.extend(Self::extract_from_to(0, next.1, body));
                }
            }
            let is_scoped = slice.last().map(|t| t.kind) == Some(TokenKind::Colon);

            let result = if is_scoped {
                self.create_scoped_statement(scopes, scope_id, &slice, body, &statements)
            } else if signature::tokens_contain(&slice, &patterns::FUNCTION_CALL)
                && !signature::tokens_contain(&slice, &patterns::DECLARATION_EXPLICIT)
                && !signature::tokens_contain(&slice, &patterns::DECLARATION_INFERRED)
                && !signature::tokens_contain(&slice, &patterns::ASSIGNMENT)
            {
                self.create_expression(scopes, scope_id, &slice)
                    .map(|expr| {
                        Statement::Expression(ExpressionStatement {
                            expr,
                            scope_id,
                        })
                    })
            } else {
                self.create_statement(scopes, scope_id, &slice)
            };

            if let Ok(statement) = result {
                statements.push(statement);
            }
        }
        statements
    }

    /// A `;`-terminated simple statement.
    pub(crate) fn create_statement(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        slice: &[PositionedToken],
    ) -> Result<Statement, ()> {
        let first = slice
            .iter()
            .find(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol));
        let Some(first) = first else {
            return Err(());
        };
        if first.kind == TokenKind::Equal {
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                first.line,
                first.column,
                1,
                ErrKind::StmtDanglingEqualSign,
            ));
            return Err(());
        }

        if first.kind == TokenKind::Return {
            return self.create_return(scopes, scope_id, slice);
        }
        if first.kind == TokenKind::Throw {
            return self.create_throw(scopes, scope_id, slice);
        }
        if signature::tokens_contain(slice, &patterns::DECLARATION_EXPLICIT) {
            return self.create_declaration(scopes, scope_id, slice, false);
        }
        if signature::tokens_contain(slice, &patterns::DECLARATION_INFERRED) {
            return self.create_declaration(scopes, scope_id, slice, true);
        }
        if let Some(statement) = self.try_compound_assignment(scopes, scope_id, slice)? {
            return Ok(statement);
        }
        if signature::tokens_contain(slice, &patterns::ASSIGNMENT) {
            return self.create_assignment(scopes, scope_id, slice);
        }

        self.ctx().emit(Diagnostic::new(
            self.file().clone(),
            first.line,
            first.column,
            first.width(),
            ErrKind::UndefinedStatement {
                statement: lexer::to_string(slice).trim().to_string(),
            },
        ));
        Err(())
    }

    fn create_declaration(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        slice: &[PositionedToken],
        inferred: bool,
    ) -> Result<Statement, ()> {
        let clean: Vec<PositionedToken> = slice
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();

        let (name_tok, declared_ty, value_tokens, is_const) = if inferred {
            let eq = clean
                .iter()
                .position(|tok| tok.kind == TokenKind::ColonEqual)
                .ok_or(())?;
            if eq == 0 || clean[eq - 1].kind != TokenKind::Identifier {
                self.emit_at(&clean[eq], ErrKind::StmtDeclarationCreationFailed);
                return Err(());
            }
            (clean[eq - 1].clone(), None, clean[eq + 1..].to_vec(), false)
        } else {
            let eq = top_level_position(&clean, TokenKind::Equal).ok_or(())?;
            let mut lhs = &clean[..eq];
            let mut is_const = false;
            if lhs.first().map(|tok| tok.kind) == Some(TokenKind::Const) {
                is_const = true;
                lhs = &lhs[1..];
            }
            if lhs.first().map(|tok| tok.kind) == Some(TokenKind::Mut) {
                lhs = &lhs[1..];
            }
            if lhs.len() < 2 || lhs[lhs.len() - 1].kind != TokenKind::Identifier {
                self.emit_at(&clean[eq], ErrKind::StmtDeclarationCreationFailed);
                return Err(());
            }
            let name_tok = lhs[lhs.len() - 1].clone();
            let ty = match self.parse_type(&lhs[..lhs.len() - 1], false) {
                Ok(ty) => ty,
                Err(()) => {
                    self.emit_at(&name_tok, ErrKind::StmtDeclarationCreationFailed);
                    return Err(());
                }
            };
            (name_tok, Some(ty), clean[eq + 1..].to_vec(), is_const)
        };

        let name = name_tok.lexeme().to_string();
        if let Some((_, info)) = scopes.resolve(scope_id, &name) {
            if info.from_requires {
                self.emit_at(&name_tok, ErrKind::VarFromRequiresList { name });
                return Err(());
            }
        }
        if scopes.scope(scope_id).get(&name).is_some() {
            self.emit_at(&name_tok, ErrKind::VarRedefinition { name });
            return Err(());
        }

        let value = self.create_expression(scopes, scope_id, &value_tokens)?;
        let (ty, value) = match declared_ty {
            Some(declared) => {
                let value_ty = value.result_type();
                if value_ty == declared {
                    (declared, value)
                } else if let Some(coerced) = coerce_literal(self, value.clone(), &declared) {
                    (declared, coerced)
                } else {
                    self.emit_at(
                        &name_tok,
                        ErrKind::ExprTypeMismatch {
                            expected: declared,
                            found: value_ty,
                        },
                    );
                    return Err(());
                }
            }
            None => (value.result_type(), value),
        };

        if !scopes.scope_mut(scope_id).add_variable(
            &name,
            VariableInfo {
                ty: Arc::clone(&ty),
                decl_scope: scope_id,
                is_mutable: !is_const,
                is_mutated: false,
                from_requires: false,
            },
        ) {
            self.emit_at(&name_tok, ErrKind::VarRedefinition { name });
            return Err(());
        }

        Ok(Statement::Declaration(DeclarationNode {
            ty,
            name,
            value,
            inferred,
            scope_id,
        }))
    }

    fn create_assignment(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        slice: &[PositionedToken],
    ) -> Result<Statement, ()> {
        let clean: Vec<PositionedToken> = slice
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();
        let name_tok = clean.first().cloned().ok_or(())?;
        if name_tok.kind != TokenKind::Identifier
            || clean.get(1).map(|tok| tok.kind) != Some(TokenKind::Equal)
        {
            self.emit_at(&name_tok, ErrKind::StmtAssignmentCreationFailed);
            return Err(());
        }
        let name = name_tok.lexeme().to_string();

        let declared = match scopes.resolve(scope_id, &name) {
            Some((_, info)) => {
                if !info.is_mutable {
                    self.emit_at(&name_tok, ErrKind::VarMutatingConst { name });
                    return Err(());
                }
                Arc::clone(&info.ty)
            }
            None => {
                self.emit_at(&name_tok, ErrKind::VarNotDeclared { name });
                return Err(());
            }
        };

        let value = self.create_expression(scopes, scope_id, &clean[2..])?;
        let value_ty = value.result_type();
        let value = if value_ty == declared {
            value
        } else if let Some(coerced) = coerce_literal(self, value.clone(), &declared) {
            coerced
        } else {
            self.emit_at(
                &name_tok,
                ErrKind::ExprTypeMismatch {
                    expected: declared,
                    found: value_ty,
                },
            );
            return Err(());
        };

        scopes.mark_mutated(scope_id, &name);
        Ok(Statement::Assignment(AssignmentNode {
            name,
            value,
            scope_id,
        }))
    }

    /// `x += e;`, `x++;` and friends desugar into plain assignments.
    fn try_compound_assignment(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        slice: &[PositionedToken],
    ) -> Result<Option<Statement>, ()> {
        let clean: Vec<PositionedToken> = slice
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Semicolon
                )
            })
            .cloned()
            .collect();
        if clean.len() < 2 || clean[0].kind != TokenKind::Identifier {
            return Ok(None);
        }
        let base_op = match clean[1].kind {
            TokenKind::PlusEquals | TokenKind::Increment => TokenKind::Plus,
            TokenKind::MinusEquals | TokenKind::Decrement => TokenKind::Minus,
            TokenKind::MultEquals => TokenKind::Mult,
            TokenKind::DivEquals => TokenKind::Div,
            _ => return Ok(None),
        };
        let name_tok = clean[0].clone();
        let name = name_tok.lexeme().to_string();

        let (decl_scope, declared, mutable) = match scopes.resolve(scope_id, &name) {
            Some((decl_scope, info)) => (decl_scope, Arc::clone(&info.ty), info.is_mutable),
            None => {
                self.emit_at(&name_tok, ErrKind::VarNotDeclared { name });
                return Err(());
            }
        };
        if !mutable {
            self.emit_at(&name_tok, ErrKind::VarMutatingConst { name });
            return Err(());
        }

        let variable = Expression::Variable(crate::ast::expressions::VariableNode {
            name: name.clone(),
            ty: Arc::clone(&declared),
            decl_scope,
        });
        let rhs = if matches!(clean[1].kind, TokenKind::Increment | TokenKind::Decrement) {
            Expression::Literal(LiteralNode {
                value: LiteralValue::Int(1),
                ty: Arc::clone(&declared),
            })
        } else {
            let value = self.create_expression(scopes, scope_id, &clean[2..])?;
            let value_ty = value.result_type();
            if value_ty == declared {
                value
            } else if let Some(coerced) = coerce_literal(self, value.clone(), &declared) {
                coerced
            } else {
                self.emit_at(
                    &name_tok,
                    ErrKind::ExprTypeMismatch {
                        expected: Arc::clone(&declared),
                        found: value_ty,
                    },
                );
                return Err(());
            }
        };

        scopes.mark_mutated(scope_id, &name);
        let value = Expression::Binary(BinaryOpNode {
            op: base_op,
            lhs: Box::new(variable),
            rhs: Box::new(rhs),
            ty: declared,
        });
        Ok(Some(Statement::Assignment(AssignmentNode {
            name,
            value,
            scope_id,
        })))
    }

    fn create_return(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        slice: &[PositionedToken],
    ) -> Result<Statement, ()> {
        let ret_idx = slice
            .iter()
            .position(|tok| tok.kind == TokenKind::Return)
            .ok_or(())?;
        let rest: Vec<PositionedToken> = slice[ret_idx + 1..]
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Semicolon
                )
            })
            .cloned()
            .collect();
        let value = if rest.is_empty() {
            None
        } else {
            Some(self.create_expression(scopes, scope_id, &rest)?)
        };
        Ok(Statement::Return(ReturnNode { value, scope_id }))
    }

    fn create_throw(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        slice: &[PositionedToken],
    ) -> Result<Statement, ()> {
        let throw_idx = slice
            .iter()
            .position(|tok| tok.kind == TokenKind::Throw)
            .ok_or(())?;
        let rest: Vec<PositionedToken> = slice[throw_idx + 1..]
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Semicolon
                )
            })
            .cloned()
            .collect();
        if rest.is_empty() {
            let tok = &slice[throw_idx];
            self.emit_at(tok, ErrKind::StmtThrowCreationFailed);
            return Err(());
        }
        let value = self.create_expression(scopes, scope_id, &rest)?;
        Ok(Statement::Throw(ThrowNode { value, scope_id }))
    }

    /// A `:`-terminated statement: if-chains, loops and catch blocks.
    fn create_scoped_statement(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        definition: &[PositionedToken],
        body: &mut TokenList,
        prior: &[Statement],
    ) -> Result<Statement, ()> {
        let indent = leading_indents(definition);
        // The header line's end-of-line token is still at the front.
        while body.first().map(|t| t.kind) == Some(TokenKind::Eol) {
            body.remove(0);
        }
        let scoped_body = Self::get_body_tokens(indent, body);
        if scoped_body.iter().all(|tok| {
            matches!(
                tok.kind,
                TokenKind::Indent | TokenKind::Eol | TokenKind::Eof
            )
        }) {
            let (line, column) = definition_position(definition);
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                line,
                column,
                1,
                ErrKind::MissingBody,
            ));
            return Err(());
        }

        let first = definition
            .iter()
            .find(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .ok_or(())?;

        match first.kind {
            TokenKind::If => {
                self.create_if_chain(scopes, scope_id, definition, scoped_body, body, indent)
            }
            TokenKind::Else => {
                // An `else` reaching this point was not consumed by an
                // if-chain, so there is no preceding `if`.
                let kind = if signature::tokens_contain(definition, &patterns::ELSE_IF_STATEMENT) {
                    ErrKind::StmtIfChainMissingIf
                } else {
                    ErrKind::StmtDanglingElse
                };
                self.emit_at(first, kind);
                Err(())
            }
            TokenKind::While => {
                self.create_while(scopes, scope_id, definition, scoped_body, first)
            }
            TokenKind::For | TokenKind::Parallel => {
                self.create_for(scopes, scope_id, definition, scoped_body, first)
            }
            TokenKind::Catch => {
                self.create_catch(scopes, scope_id, definition, scoped_body, prior, first)
            }
            _ => {
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    first.line,
                    first.column,
                    first.width(),
                    ErrKind::UndefinedStatement {
                        statement: lexer::to_string(definition).trim().to_string(),
                    },
                ));
                Err(())
            }
        }
    }

    fn create_if_chain(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        first_def: &[PositionedToken],
        first_body: TokenList,
        body: &mut TokenList,
        indent: u32,
    ) -> Result<Statement, ()> {
        let mut arms: Vec<(Option<Vec<PositionedToken>>, TokenList)> = Vec::new();
        arms.push((
            Some(condition_tokens(first_def, TokenKind::If)),
            first_body,
        ));

        // Accumulate successive `else [if]` headers at the same indent.
        loop {
            while body.first().map(|t| t.kind) == Some(TokenKind::Eol) {
                body.remove(0);
            }
            let Some(first_tok) = body.first() else { break };
            if first_tok.kind == TokenKind::Eof {
                break;
            }
            let Some(line_range) = signature::get_tokens_line_range(body, first_tok.line) else {
                break;
            };
            let header = &body[line_range.0..line_range.1];
            if leading_indents(header) != indent {
                break;
            }
            if !header.iter().any(|tok| tok.kind == TokenKind::Else) {
                break;
            }
            let header: TokenList = Self::extract_from_to(line_range.0, line_range.1, body);
            let arm_body = Self::get_body_tokens(indent, body);
            let is_else_if = signature::tokens_contain(&header, &patterns::ELSE_IF_STATEMENT);
            if is_else_if {
                arms.push((Some(condition_tokens(&header, TokenKind::If)), arm_body));
            } else {
                arms.push((None, arm_body));
                break;
            }
        }

        let mut branches = Vec::new();
        let mut else_body = None;
        let mut else_scope = None;
        let mut failed = false;
        for (condition, mut arm_body) in arms {
            let body_scope = scopes.push_scope(scope_id);
            let parsed_body = self.create_body(scopes, body_scope, &mut arm_body);
            match condition {
                Some(cond_tokens) => {
                    match self.create_expression(scopes, scope_id, &cond_tokens) {
                        Ok(condition) => branches.push(IfBranch {
                            condition,
                            body: parsed_body,
                            body_scope,
                        }),
                        Err(()) => failed = true,
                    }
                }
                None => {
                    else_body = Some(parsed_body);
                    else_scope = Some(body_scope);
                }
            }
        }
        if failed {
            return Err(());
        }
        if branches.is_empty() {
            let (line, column) = definition_position(first_def);
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                line,
                column,
                1,
                ErrKind::StmtIfCreationFailed,
            ));
            return Err(());
        }
        Ok(Statement::If(IfNode {
            branches,
            else_body,
            else_scope,
            scope_id,
        }))
    }

    fn create_while(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        definition: &[PositionedToken],
        mut scoped_body: TokenList,
        first: &PositionedToken,
    ) -> Result<Statement, ()> {
        let cond_tokens = condition_tokens(definition, TokenKind::While);
        if cond_tokens.is_empty() {
            self.emit_at(first, ErrKind::StmtWhileCreationFailed);
            return Err(());
        }
        let condition = self.create_expression(scopes, scope_id, &cond_tokens)?;
        let body_scope = scopes.push_scope(scope_id);
        let parsed = self.create_body(scopes, body_scope, &mut scoped_body);
        Ok(Statement::While(WhileNode {
            condition,
            body: parsed,
            body_scope,
            scope_id,
        }))
    }

    fn create_for(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        definition: &[PositionedToken],
        mut scoped_body: TokenList,
        first: &PositionedToken,
    ) -> Result<Statement, ()> {
        let parallel = first.kind == TokenKind::Parallel;
        let enhanced = signature::tokens_contain(definition, &patterns::ENHANCED_FOR_LOOP)
            || signature::tokens_contain(definition, &patterns::PAR_FOR_LOOP);

        if enhanced || parallel {
            return self.create_enhanced_for(
                scopes,
                scope_id,
                definition,
                scoped_body,
                parallel,
                first,
            );
        }

        // `for INIT; COND; STEP:`
        let for_idx = definition
            .iter()
            .position(|tok| tok.kind == TokenKind::For)
            .ok_or(())?;
        let header: Vec<PositionedToken> = definition[for_idx + 1..]
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();
        let header = strip_trailing(&header, TokenKind::Colon);
        let mut sections = split_top_level(&header, TokenKind::Semicolon);
        if sections.len() != 3 {
            self.emit_at(first, ErrKind::StmtForCreationFailed);
            return Err(());
        }
        let step_tokens = sections.pop().unwrap_or_default();
        let cond_tokens = sections.pop().unwrap_or_default();
        let mut init_tokens = sections.pop().unwrap_or_default();
        init_tokens.push(PositionedToken::new(
            TokenKind::Semicolon,
            first.line,
            first.column,
            ";",
        ));
        let mut step_tokens = step_tokens;
        step_tokens.push(PositionedToken::new(
            TokenKind::Semicolon,
            first.line,
            first.column,
            ";",
        ));

        let loop_scope = scopes.push_scope(scope_id);
        let init = self.create_statement(scopes, loop_scope, &init_tokens)?;
        let condition = self.create_expression(scopes, loop_scope, &cond_tokens)?;
        let step = self.create_statement(scopes, loop_scope, &step_tokens)?;
        let body_scope = scopes.push_scope(loop_scope);
        let parsed = self.create_body(scopes, body_scope, &mut scoped_body);
        Ok(Statement::For(ForNode {
            init: Box::new(init),
            condition,
            step: Box::new(step),
            body: parsed,
            body_scope,
            scope_id,
        }))
    }

    fn create_enhanced_for(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        definition: &[PositionedToken],
        mut scoped_body: TokenList,
        parallel: bool,
        first: &PositionedToken,
    ) -> Result<Statement, ()> {
        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Parallel | TokenKind::For
                )
            })
            .cloned()
            .collect();
        // IDX , ELEM in EXPR :
        let in_idx = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::In)
            .ok_or_else(|| self.emit_at(first, ErrKind::StmtForCreationFailed))?;
        let bindings = &clean[..in_idx];
        if bindings.len() != 3 || bindings[1].kind != TokenKind::Comma {
            self.emit_at(first, ErrKind::StmtForCreationFailed);
            return Err(());
        }
        let binding_of = |tok: &PositionedToken| -> Option<String> {
            match tok.kind {
                TokenKind::Identifier => Some(tok.lexeme().to_string()),
                _ => None,
            }
        };
        let index_binding = binding_of(&bindings[0]);
        let element_binding = binding_of(&bindings[2]);

        let iterable_tokens = strip_trailing(&clean[in_idx + 1..], TokenKind::Colon);
        let iterable = self.create_expression(scopes, scope_id, &iterable_tokens)?;

        let body_scope = scopes.push_scope(scope_id);
        let element_ty = match &*iterable.result_type() {
            Type::Array { element } => Arc::clone(element),
            Type::Primitive(Primitive::Str) => self.ctx().types.primitive_of(Primitive::Char),
            _ => iterable.result_type(),
        };
        if let Some(name) = &index_binding {
            scopes.scope_mut(body_scope).add_variable(
                name,
                VariableInfo {
                    ty: self.ctx().types.primitive_of(Primitive::U64),
                    decl_scope: body_scope,
                    is_mutable: false,
                    is_mutated: false,
                    from_requires: false,
                },
            );
        }
        if let Some(name) = &element_binding {
            scopes.scope_mut(body_scope).add_variable(
                name,
                VariableInfo {
                    ty: element_ty,
                    decl_scope: body_scope,
                    is_mutable: false,
                    is_mutated: false,
                    from_requires: false,
                },
            );
        }
        let parsed = self.create_body(scopes, body_scope, &mut scoped_body);
        Ok(Statement::EnhancedFor(EnhancedForNode {
            index_binding,
            element_binding,
            iterable,
            parallel,
            body: parsed,
            body_scope,
            scope_id,
        }))
    }

    fn create_catch(
        &self,
        scopes: &mut ScopeArena,
        scope_id: usize,
        definition: &[PositionedToken],
        mut scoped_body: TokenList,
        prior: &[Statement],
        first: &PositionedToken,
    ) -> Result<Statement, ()> {
        let follows_call = matches!(
            prior.last(),
            Some(Statement::Expression(ExpressionStatement {
                expr: Expression::Call(_),
                ..
            })) | Some(Statement::Declaration(_))
        );
        if !follows_call {
            self.emit_at(first, ErrKind::StmtDanglingCatch);
            return Err(());
        }
        let error_binding = definition
            .iter()
            .skip_while(|tok| tok.kind != TokenKind::Catch)
            .nth(1)
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .map(|tok| tok.lexeme().to_string());

        let body_scope = scopes.push_scope(scope_id);
        if let Some(name) = &error_binding {
            scopes.scope_mut(body_scope).add_variable(
                name,
                VariableInfo {
                    ty: self
                        .ctx()
                        .types
                        .intern(Type::ErrorSet {
                            name: "anyerror".to_string(),
                        }),
                    decl_scope: body_scope,
                    is_mutable: false,
                    is_mutated: false,
                    from_requires: false,
                },
            );
        }
        let parsed = self.create_body(scopes, body_scope, &mut scoped_body);
        Ok(Statement::Catch(CatchNode {
            error_binding,
            body: parsed,
            body_scope,
            scope_id,
        }))
    }

    pub(crate) fn emit_at(&self, token: &PositionedToken, kind: ErrKind) {
        self.ctx().emit(Diagnostic::new(
            self.file().clone(),
            token.line,
            token.column,
            token.width(),
            kind,
        ));
    }
}

/// Condition slice of a header: everything after the keyword up to the
/// trailing colon.
fn condition_tokens(definition: &[PositionedToken], keyword: TokenKind) -> Vec<PositionedToken> {
    let start = definition
        .iter()
        .position(|tok| tok.kind == keyword)
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let tokens: Vec<PositionedToken> = definition[start..]
        .iter()
        .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
        .cloned()
        .collect();
    strip_trailing(&tokens, TokenKind::Colon)
}

fn strip_trailing(tokens: &[PositionedToken], kind: TokenKind) -> Vec<PositionedToken> {
    let mut tokens = tokens.to_vec();
    while tokens.last().map(|tok| tok.kind) == Some(kind) {
        tokens.pop();
    }
    tokens
}

/// First occurrence of `kind` outside any bracket pair.
fn top_level_position(tokens: &[PositionedToken], kind: TokenKind) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        if tok.kind == kind && depth == 0 {
            return Some(idx);
        }
    }
    None
}
