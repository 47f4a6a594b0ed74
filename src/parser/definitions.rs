//! Top-level definition builders: imports, functions, data / func /
//! entity modules, enums, error sets, variants and tests.

use std::sync::Arc;

use crate::ast::definitions::{
    DataField, DataNode, Definition, EntityNode, EnumNode, ErrorNode, FuncNode, FunctionNode,
    ImportNode, ImportPath, LinkNode, Parameter, TestNode, VariantNode,
};
use crate::ast::file_node::FileNode;
use crate::ast::scope::{ScopeArena, VariableInfo};
use crate::context::{normalize_path, FileHash};
use crate::diagnostics::{Diagnostic, ErrKind};
use crate::lexer::tables::is_reserved_function_name;
use crate::lexer::token::{PositionedToken, TokenKind, TokenList};
use crate::parser::builtins;
use crate::signature::{self, patterns, tok};
use crate::types::Type;

use super::expressions::split_top_level;
use super::{definition_position, leading_indents, Parser};

impl<'ctx> Parser<'ctx> {
    /// Parse a `use` statement and record the import.
    pub(crate) fn create_import(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        indentation: u32,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        if indentation > 0 {
            let (line, column) = definition_position(definition);
            self.ctx().emit(Diagnostic::new(
                self.file().clone(),
                line,
                column,
                3,
                ErrKind::UseStatementNotAtTopLevel,
            ));
            return Err(());
        }

        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Semicolon | TokenKind::Eof
                )
            })
            .cloned()
            .collect();
        let use_idx = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::Use)
            .ok_or(())?;
        let after = &clean[use_idx + 1..];
        if after.is_empty() {
            return Err(());
        }

        let alias = after
            .iter()
            .position(|tok| tok.kind == TokenKind::As)
            .and_then(|idx| after.get(idx + 1))
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .map(|tok| tok.lexeme().to_string());

        match after[0].kind {
            TokenKind::StrValue => {
                let relative = after[0].lexeme().to_string();
                let full = normalize_path(&self.directory().join(&relative));
                if !full.starts_with(&self.ctx().cwd) {
                    self.emit_at(&after[0], ErrKind::ImportExitedCwd { path: relative });
                    return Err(());
                }
                let target = FileHash::new(&full);
                if !file_node.add_import(target.clone()) {
                    self.emit_at(&after[0], ErrKind::ImportSameFileTwice { path: relative });
                    return Err(());
                }
                self.imported_files.push(target.clone());
                if let Some(alias) = &alias {
                    file_node.aliases.push((alias.clone(), target.clone()));
                }

                // Imports trigger nested parses so the imported file's
                // functions are indexed before this file's bodies are
                // built. Files already seen (including files currently
                // on the parse stack) are left alone.
                if !self.ctx().parse_attempted(&target) {
                    let _guard =
                        crate::resolver::ResourceLock::acquire(&target.path().display().to_string());
                    if !self.ctx().parse_attempted(&target) {
                        if let Some(parsed) = Parser::parse_file(self.ctx(), target.path()) {
                            self.ctx().register_file(parsed);
                        }
                    }
                }
                file_node.add_definition(Definition::Import(ImportNode {
                    info,
                    path: ImportPath::File(relative),
                    alias,
                    target: Some(target),
                }));
                Ok(())
            }
            TokenKind::Identifier => {
                let mut segments = Vec::new();
                for tok in after {
                    match tok.kind {
                        TokenKind::Identifier => segments.push(tok.lexeme().to_string()),
                        TokenKind::Dot => {}
                        TokenKind::As => break,
                        _ => break,
                    }
                }
                if segments.first().map(String::as_str) == Some("Core") {
                    let module = segments.get(1).cloned().unwrap_or_default();
                    if segments.len() != 2 || !builtins::is_core_module(&module) {
                        self.emit_at(&after[0], ErrKind::CoreModuleNotFound { module });
                        return Err(());
                    }
                    if !file_node.add_core_import(&module) {
                        self.emit_at(
                            &after[0],
                            ErrKind::ImportSameFileTwice {
                                path: format!("Core.{}", module),
                            },
                        );
                        return Err(());
                    }
                    self.core_imports.push(module);
                }
                file_node.add_definition(Definition::Import(ImportNode {
                    info,
                    path: ImportPath::Lib(segments),
                    alias,
                    target: None,
                }));
                Ok(())
            }
            _ => Err(()),
        }
    }

    /// Parse a function header and body. `requires` carries the data
    /// bindings injected by an enclosing func module.
    pub(crate) fn create_function(
        &mut self,
        file_node: &FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
        requires: &[(String, String)],
    ) -> Result<FunctionNode, ()> {
        let info = self.node_info(definition);
        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();

        let mut cursor = 0;
        let mut is_aligned = false;
        let mut is_const = false;
        while cursor < clean.len() && clean[cursor].kind != TokenKind::Def {
            match clean[cursor].kind {
                TokenKind::Aligned => is_aligned = true,
                TokenKind::Const => is_const = true,
                _ => {}
            }
            cursor += 1;
        }
        let name_tok = match clean.get(cursor + 1) {
            Some(tok) if tok.kind == TokenKind::Identifier => tok.clone(),
            _ => return Err(()),
        };
        let name = name_tok.lexeme().to_string();

        if is_reserved_function_name(&name) {
            self.emit_at(&name_tok, ErrKind::FnReservedName { name });
            return Err(());
        }

        if file_node.function(&name).is_some() {
            let kind = if name == "main" {
                ErrKind::FnMainRedefinition
            } else {
                ErrKind::FunctionRedefinition { name: name.clone() }
            };
            self.emit_at(&name_tok, kind);
            return Err(());
        }
        if name == "main" {
            let foreign_main = {
                let table = self.ctx().functions_by_name.lock().unwrap();
                table
                    .get("main")
                    .map(|mains| mains.iter().any(|main| main.file != *self.file()))
                    .unwrap_or(false)
            };
            if foreign_main {
                self.emit_at(&name_tok, ErrKind::FnMainRedefinition);
                return Err(());
            }
        }

        // Parameters.
        let open = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::LeftParen)
            .ok_or(())?;
        let param_range = signature::balanced_range_extraction(
            &clean,
            &[tok(TokenKind::LeftParen)],
            &[tok(TokenKind::RightParen)],
        )
        .ok_or_else(|| self.emit_at(&clean[open], ErrKind::UnclosedParen))?;
        let mut parameters = Vec::new();
        for segment in split_top_level(&clean[param_range.0 + 1..param_range.1 - 1], TokenKind::Comma)
        {
            if segment.is_empty() {
                continue;
            }
            let is_mut = segment.iter().any(|tok| tok.kind == TokenKind::Mut);
            let Some(param_name) = segment.last().filter(|tok| tok.kind == TokenKind::Identifier)
            else {
                self.emit_at(&name_tok, ErrKind::StmtDeclarationCreationFailed);
                return Err(());
            };
            let ty = self
                .parse_type(&segment[..segment.len() - 1], false)
                .map_err(|()| {
                    self.emit_at(param_name, ErrKind::StmtDeclarationCreationFailed);
                })?;
            parameters.push(Parameter {
                ty,
                name: param_name.lexeme().to_string(),
                is_mut,
            });
        }

        // Return types and error set.
        let rest = &clean[param_range.1..];
        let mut return_types: Vec<Arc<Type>> = Vec::new();
        let mut error_set = None;
        let mut idx = 0;
        if rest.first().map(|tok| tok.kind) == Some(TokenKind::Arrow) {
            idx = 1;
            if rest.get(1).map(|tok| tok.kind) == Some(TokenKind::LeftParen) {
                let group_range = signature::balanced_range_extraction(
                    rest,
                    &[tok(TokenKind::LeftParen)],
                    &[tok(TokenKind::RightParen)],
                )
                .ok_or_else(|| self.emit_at(&rest[1], ErrKind::UnclosedParen))?;
                for segment in
                    split_top_level(&rest[group_range.0 + 1..group_range.1 - 1], TokenKind::Comma)
                {
                    let ty = self.parse_type(&segment, false).map_err(|()| {
                        self.emit_at(&name_tok, ErrKind::StmtDeclarationCreationFailed);
                    })?;
                    return_types.push(ty);
                }
                idx = group_range.1;
            } else {
                let mut single = Vec::new();
                while idx < rest.len()
                    && !matches!(
                        rest[idx].kind,
                        TokenKind::Colon | TokenKind::LeftBrace | TokenKind::Comma
                    )
                {
                    single.push(rest[idx].clone());
                    idx += 1;
                }
                // `-> i32, i32:` is a bare tuple, which must be grouped.
                if rest.get(idx).map(|tok| tok.kind) == Some(TokenKind::Comma) {
                    self.emit_at(
                        &rest[idx],
                        ErrKind::FnCannotReturnTuple {
                            function: name.clone(),
                        },
                    );
                    return Err(());
                }
                let ty = self.parse_type(&single, false).map_err(|()| {
                    self.emit_at(&name_tok, ErrKind::StmtDeclarationCreationFailed);
                })?;
                return_types.push(ty);
            }
        }
        if rest.get(idx).map(|tok| tok.kind) == Some(TokenKind::LeftBrace) {
            error_set = rest
                .get(idx + 1)
                .filter(|tok| tok.kind == TokenKind::Identifier)
                .map(|tok| tok.lexeme().to_string());
        }

        // Dedicated rules for `main`.
        if name == "main" {
            if error_set.is_some() {
                self.emit_at(&name_tok, ErrKind::FnMainErrSet);
                return Err(());
            }
            if !return_types.is_empty() {
                self.emit_at(&name_tok, ErrKind::FnMainReturnType);
                return Err(());
            }
            if parameters.len() > 1 {
                self.emit_at(
                    &name_tok,
                    ErrKind::FnMainTooManyArgs {
                        count: parameters.len(),
                    },
                );
                return Err(());
            }
            if let Some(param) = parameters.first() {
                if param.ty.to_string() != "str[]" || param.name != "args" {
                    self.emit_at(
                        &name_tok,
                        ErrKind::FnMainWrongArgType {
                            found: format!("{} {}", param.ty, param.name),
                        },
                    );
                    return Err(());
                }
            }
        }

        // Body: fresh scope arena, requires bindings and parameters
        // first, then the statements.
        let mut scopes = ScopeArena::new();
        let body_scope = scopes.push_scope(0);
        for (data_name, binding) in requires {
            scopes.scope_mut(body_scope).add_variable(
                binding,
                VariableInfo {
                    ty: self.ctx().types.intern(Type::Data {
                        name: data_name.clone(),
                    }),
                    decl_scope: body_scope,
                    is_mutable: true,
                    is_mutated: false,
                    from_requires: true,
                },
            );
        }
        for param in &parameters {
            scopes.scope_mut(body_scope).add_variable(
                &param.name,
                VariableInfo {
                    ty: Arc::clone(&param.ty),
                    decl_scope: body_scope,
                    is_mutable: param.is_mut,
                    is_mutated: false,
                    from_requires: false,
                },
            );
        }
        let statements = self.create_body(&mut scopes, body_scope, body);

        Ok(FunctionNode {
            info,
            name,
            is_aligned,
            is_const,
            parameters,
            return_types,
            error_set,
            scopes,
            body: statements,
        })
    }

    /// Parse a `data` module definition.
    pub(crate) fn create_data(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();
        let is_shared = clean.iter().any(|tok| tok.kind == TokenKind::Shared);
        let is_immutable = clean.iter().any(|tok| tok.kind == TokenKind::Immutable);
        let is_aligned = clean.iter().any(|tok| tok.kind == TokenKind::Aligned);
        let data_idx = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::Data)
            .ok_or(())?;
        let name_tok = clean
            .get(data_idx + 1)
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        if file_node.data_module(&name).is_some() {
            self.emit_at(&name_tok, ErrKind::DefDataRedefinition { name });
            return Err(());
        }

        let (fields, constructor_order) = self.parse_data_fields(&name, body)?;
        file_node.add_definition(Definition::Data(DataNode {
            info,
            name,
            is_shared,
            is_immutable,
            is_aligned,
            fields,
            constructor_order,
        }));
        Ok(())
    }

    /// Field lines of a data body: `TYPE NAME;`, `TYPE NAME = EXPR;`
    /// and the optional `Name(field, …);` constructor line.
    fn parse_data_fields(
        &mut self,
        data_name: &str,
        body: &mut TokenList,
    ) -> Result<(Vec<DataField>, Vec<String>), ()> {
        let mut fields: Vec<DataField> = Vec::new();
        let mut constructor_order = Vec::new();
        let scopes = ScopeArena::new();

        while !body.is_empty() && body[0].kind != TokenKind::Eof {
            let line = Self::get_definition_tokens(body);
            let clean: Vec<PositionedToken> = line
                .iter()
                .filter(|tok| {
                    !matches!(
                        tok.kind,
                        TokenKind::Indent
                            | TokenKind::Eol
                            | TokenKind::Semicolon
                            | TokenKind::Eof
                    )
                })
                .cloned()
                .collect();
            if clean.is_empty() {
                continue;
            }

            // Constructor line.
            if clean.len() >= 3
                && clean[0].kind == TokenKind::Identifier
                && clean[1].kind == TokenKind::LeftParen
                && clean.last().map(|tok| tok.kind) == Some(TokenKind::RightParen)
            {
                for segment in split_top_level(&clean[2..clean.len() - 1], TokenKind::Comma) {
                    if let Some(arg) = segment.first() {
                        constructor_order.push(arg.lexeme().to_string());
                    }
                }
                continue;
            }

            let equal = clean.iter().position(|tok| tok.kind == TokenKind::Equal);
            let header_end = equal.unwrap_or(clean.len());
            if header_end < 2 || clean[header_end - 1].kind != TokenKind::Identifier {
                let (line_no, column) = definition_position(&line);
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    line_no,
                    column,
                    1,
                    ErrKind::StmtDeclarationCreationFailed,
                ));
                continue;
            }
            let field_name_tok = clean[header_end - 1].clone();
            let field_name = field_name_tok.lexeme().to_string();
            if fields.iter().any(|field| field.name == field_name) {
                self.emit_at(
                    &field_name_tok,
                    ErrKind::DefDataDuplicateFieldName {
                        data: data_name.to_string(),
                        field: field_name,
                    },
                );
                continue;
            }
            let Ok(ty) = self.parse_type(&clean[..header_end - 1], false) else {
                self.emit_at(&field_name_tok, ErrKind::StmtDeclarationCreationFailed);
                continue;
            };
            let default = match equal {
                Some(eq) => Some(self.create_expression(&scopes, 0, &clean[eq + 1..])?),
                None => None,
            };
            fields.push(DataField {
                name: field_name,
                ty,
                default,
            });
        }

        if constructor_order.is_empty() {
            constructor_order = fields.iter().map(|field| field.name.clone()).collect();
        }
        Ok((fields, constructor_order))
    }

    /// Parse a `func` module: a requires clause plus member functions.
    pub(crate) fn create_func(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();
        let func_idx = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::Func)
            .ok_or(())?;
        let name_tok = clean
            .get(func_idx + 1)
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        if file_node.func_module(&name).is_some() {
            self.emit_at(&name_tok, ErrKind::DefFuncRedefinition { name });
            return Err(());
        }

        let mut required_data: Vec<(String, String)> = Vec::new();
        if let Some(req_idx) = clean.iter().position(|tok| tok.kind == TokenKind::Requires) {
            if clean.get(req_idx + 1).map(|tok| tok.kind) == Some(TokenKind::LeftParen) {
                let range = signature::balanced_range_extraction(
                    &clean[req_idx..],
                    &[tok(TokenKind::LeftParen)],
                    &[tok(TokenKind::RightParen)],
                )
                .ok_or_else(|| self.emit_at(&clean[req_idx], ErrKind::UnclosedParen))?;
                let inner = &clean[req_idx + range.0 + 1..req_idx + range.1 - 1];
                for segment in split_top_level(inner, TokenKind::Comma) {
                    if segment.len() != 2
                        || segment[0].kind != TokenKind::Identifier
                        || segment[1].kind != TokenKind::Identifier
                    {
                        continue;
                    }
                    let data = segment[0].lexeme().to_string();
                    if required_data.iter().any(|(existing, _)| *existing == data) {
                        self.emit_at(
                            &segment[0],
                            ErrKind::DefFuncRequiringSameDataTwice {
                                func: name.clone(),
                                data,
                            },
                        );
                        continue;
                    }
                    required_data.push((data, segment[1].lexeme().to_string()));
                }
            }
        }

        let mut functions = Vec::new();
        while !body.is_empty() && body[0].kind != TokenKind::Eof {
            let line = Self::get_definition_tokens(body);
            if line.iter().all(|tok| {
                matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Eof
                )
            }) {
                continue;
            }
            if signature::tokens_contain(&line, &patterns::FUNCTION_DEFINITION) {
                let indent = leading_indents(&line);
                let mut fn_body = Self::get_body_tokens(indent, body);
                if let Ok(function) =
                    self.create_function(file_node, &line, &mut fn_body, &required_data)
                {
                    functions.push(function);
                }
            } else {
                let (line_no, column) = definition_position(&line);
                self.ctx().emit(Diagnostic::new(
                    self.file().clone(),
                    line_no,
                    column,
                    1,
                    ErrKind::UnexpectedDefinition {
                        line_text: crate::lexer::to_string(&line).trim_end().to_string(),
                    },
                ));
            }
        }

        file_node.add_definition(Definition::Func(FuncNode {
            info,
            name,
            required_data,
            functions,
        }));
        Ok(())
    }

    /// Parse an entity, modular or monolithic.
    pub(crate) fn create_entity(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();
        let entity_idx = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::Entity)
            .ok_or(())?;
        let name_tok = clean
            .get(entity_idx + 1)
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        let mut extends = Vec::new();
        if let Some(ext_idx) = clean.iter().position(|tok| tok.kind == TokenKind::Extends) {
            if clean.get(ext_idx + 1).map(|tok| tok.kind) == Some(TokenKind::LeftParen) {
                if let Some(range) = signature::balanced_range_extraction(
                    &clean[ext_idx..],
                    &[tok(TokenKind::LeftParen)],
                    &[tok(TokenKind::RightParen)],
                ) {
                    let inner = &clean[ext_idx + range.0 + 1..ext_idx + range.1 - 1];
                    for segment in split_top_level(inner, TokenKind::Comma) {
                        if segment.len() == 2 {
                            extends.push((
                                segment[0].lexeme().to_string(),
                                segment[1].lexeme().to_string(),
                            ));
                        }
                    }
                }
            }
        }

        let mut data_modules: Vec<String> = Vec::new();
        let mut func_modules: Vec<String> = Vec::new();
        let mut links = Vec::new();
        let mut constructor_args = Vec::new();
        let mut is_monolithic = false;

        while !body.is_empty() && body[0].kind != TokenKind::Eof {
            let line = Self::get_definition_tokens(body);
            if line.iter().all(|tok| {
                matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Eof
                )
            }) {
                continue;
            }
            let indent = leading_indents(&line);

            if signature::tokens_contain(&line, &patterns::ENTITY_BODY_DATA) {
                // `data: A, B;` — modular module list.
                for module in module_list(&line, TokenKind::Data) {
                    if data_modules.contains(&module.lexeme().to_string()) {
                        self.emit_at(
                            &module,
                            ErrKind::DefEntityDuplicateData {
                                entity: name.clone(),
                                data: module.lexeme().to_string(),
                            },
                        );
                        continue;
                    }
                    data_modules.push(module.lexeme().to_string());
                }
            } else if signature::tokens_contain(&line, &patterns::ENTITY_BODY_FUNC) {
                for module in module_list(&line, TokenKind::Func) {
                    if func_modules.contains(&module.lexeme().to_string()) {
                        self.emit_at(
                            &module,
                            ErrKind::DefEntityDuplicateFunc {
                                entity: name.clone(),
                                func: module.lexeme().to_string(),
                            },
                        );
                        continue;
                    }
                    func_modules.push(module.lexeme().to_string());
                }
            } else if is_block_header(&line, TokenKind::Data) {
                // Monolithic form: inline fields become `<Name>__D`.
                is_monolithic = true;
                let mut block = Self::get_body_tokens(indent, body);
                let synthetic = format!("{}__D", name);
                let (fields, constructor_order) =
                    self.parse_data_fields(&synthetic, &mut block)?;
                data_modules.push(synthetic.clone());
                file_node.add_definition(Definition::Data(DataNode {
                    info: self.node_info(&line),
                    name: synthetic,
                    is_shared: false,
                    is_immutable: false,
                    is_aligned: false,
                    fields,
                    constructor_order,
                }));
            } else if is_block_header(&line, TokenKind::Func) {
                // Monolithic form: inline functions become `<Name>__F`.
                is_monolithic = true;
                let mut block = Self::get_body_tokens(indent, body);
                let synthetic = format!("{}__F", name);
                let requires = vec![(format!("{}__D", name), "data".to_string())];
                let mut functions = Vec::new();
                while !block.is_empty() && block[0].kind != TokenKind::Eof {
                    let fn_line = Self::get_definition_tokens(&mut block);
                    if !signature::tokens_contain(&fn_line, &patterns::FUNCTION_DEFINITION) {
                        continue;
                    }
                    let fn_indent = leading_indents(&fn_line);
                    let mut fn_body = Self::get_body_tokens(fn_indent, &mut block);
                    if let Ok(function) =
                        self.create_function(file_node, &fn_line, &mut fn_body, &requires)
                    {
                        functions.push(function);
                    }
                }
                func_modules.push(synthetic.clone());
                file_node.add_definition(Definition::Func(FuncNode {
                    info: self.node_info(&line),
                    name: synthetic,
                    required_data: requires,
                    functions,
                }));
            } else if signature::tokens_contain(&line, &patterns::ENTITY_BODY_LINK_HEADER) {
                let mut block = Self::get_body_tokens(indent, body);
                links.extend(self.parse_links(
                    &name,
                    &data_modules,
                    &func_modules,
                    &mut block,
                ));
            } else if signature::tokens_contain(&line, &patterns::ENTITY_BODY_CONSTRUCTOR) {
                let ctor_tok = line
                    .iter()
                    .find(|tok| tok.kind == TokenKind::Identifier)
                    .cloned()
                    .ok_or(())?;
                if ctor_tok.lexeme() != name {
                    self.emit_at(
                        &ctor_tok,
                        ErrKind::EntityWrongConstructorName {
                            entity: name.clone(),
                            found: ctor_tok.lexeme().to_string(),
                        },
                    );
                    continue;
                }
                let clean_line: Vec<PositionedToken> = line
                    .iter()
                    .filter(|tok| {
                        !matches!(
                            tok.kind,
                            TokenKind::Indent | TokenKind::Eol | TokenKind::Semicolon
                        )
                    })
                    .cloned()
                    .collect();
                if clean_line.len() >= 3 {
                    for segment in
                        split_top_level(&clean_line[2..clean_line.len() - 1], TokenKind::Comma)
                    {
                        if let Some(arg) = segment.first() {
                            constructor_args.push(arg.lexeme().to_string());
                        }
                    }
                }
            }
        }

        if !is_monolithic && data_modules.is_empty() {
            self.emit_at(
                &name_tok,
                ErrKind::DefEntityMissingData {
                    entity: name.clone(),
                    data: String::from("<none>"),
                },
            );
            return Err(());
        }

        file_node.add_definition(Definition::Entity(EntityNode {
            info,
            name,
            is_monolithic,
            data_modules,
            func_modules,
            links,
            extends,
            constructor_args,
        }));
        Ok(())
    }

    /// `a::b -> c::d;` lines of an entity link section.
    fn parse_links(
        &mut self,
        entity: &str,
        data_modules: &[String],
        func_modules: &[String],
        block: &mut TokenList,
    ) -> Vec<LinkNode> {
        let mut links = Vec::new();
        while !block.is_empty() && block[0].kind != TokenKind::Eof {
            let line = Self::get_definition_tokens(block);
            let clean: Vec<PositionedToken> = line
                .iter()
                .filter(|tok| {
                    !matches!(
                        tok.kind,
                        TokenKind::Indent
                            | TokenKind::Eol
                            | TokenKind::Semicolon
                            | TokenKind::Eof
                    )
                })
                .cloned()
                .collect();
            if clean.is_empty() {
                continue;
            }
            let Some(arrow) = clean.iter().position(|tok| tok.kind == TokenKind::Arrow) else {
                continue;
            };
            let from: Vec<String> = clean[..arrow]
                .iter()
                .filter(|tok| tok.kind == TokenKind::Identifier)
                .map(|tok| tok.lexeme().to_string())
                .collect();
            let to: Vec<String> = clean[arrow + 1..]
                .iter()
                .filter(|tok| tok.kind == TokenKind::Identifier)
                .map(|tok| tok.lexeme().to_string())
                .collect();
            for endpoint in [&from, &to] {
                if let Some(head) = endpoint.first() {
                    if !data_modules.contains(head) && !func_modules.contains(head) {
                        self.emit_at(
                            &clean[0],
                            ErrKind::DefEntityMissingData {
                                entity: entity.to_string(),
                                data: head.clone(),
                            },
                        );
                    }
                }
            }
            links.push(LinkNode {
                info: self.node_info(&line),
                from,
                to,
            });
        }
        links
    }

    pub(crate) fn create_enum(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let name_tok = definition
            .iter()
            .find(|tok| tok.kind == TokenKind::Identifier)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        let values = body
            .iter()
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .map(|tok| tok.lexeme().to_string())
            .collect();
        body.clear();
        file_node.add_definition(Definition::Enum(EnumNode { info, name, values }));
        Ok(())
    }

    pub(crate) fn create_error(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let clean: Vec<PositionedToken> = definition
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .cloned()
            .collect();
        let err_idx = clean
            .iter()
            .position(|tok| tok.kind == TokenKind::Error)
            .ok_or(())?;
        let name_tok = clean
            .get(err_idx + 1)
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        let mut parent = None;
        if clean.get(err_idx + 2).map(|tok| tok.kind) == Some(TokenKind::LeftParen) {
            let parents: Vec<&PositionedToken> = clean[err_idx + 2..]
                .iter()
                .take_while(|tok| tok.kind != TokenKind::RightParen)
                .filter(|tok| tok.kind == TokenKind::Identifier)
                .collect();
            if parents.len() > 1 {
                self.emit_at(
                    &name_tok,
                    ErrKind::DefErrOnlyOneParent {
                        error_set: name.clone(),
                    },
                );
                return Err(());
            }
            parent = parents.first().map(|tok| tok.lexeme().to_string());
        }

        let values = body
            .iter()
            .filter(|tok| tok.kind == TokenKind::Identifier)
            .map(|tok| tok.lexeme().to_string())
            .collect();
        body.clear();
        file_node.add_definition(Definition::Error(ErrorNode {
            info,
            name,
            parent,
            values,
        }));
        Ok(())
    }

    pub(crate) fn create_variant(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let name_tok = definition
            .iter()
            .find(|tok| tok.kind == TokenKind::Identifier)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        let mut types = Vec::new();
        while !body.is_empty() && body[0].kind != TokenKind::Eof {
            let line = Self::get_definition_tokens(body);
            let clean: Vec<PositionedToken> = line
                .iter()
                .filter(|tok| {
                    !matches!(
                        tok.kind,
                        TokenKind::Indent
                            | TokenKind::Eol
                            | TokenKind::Semicolon
                            | TokenKind::Comma
                            | TokenKind::Eof
                    )
                })
                .cloned()
                .collect();
            if clean.is_empty() {
                continue;
            }
            if let Ok(ty) = self.parse_type(&clean, true) {
                types.push(ty);
            }
        }
        file_node.add_definition(Definition::Variant(VariantNode { info, name, types }));
        Ok(())
    }

    pub(crate) fn create_test(
        &mut self,
        file_node: &mut FileNode,
        definition: &[PositionedToken],
        body: &mut TokenList,
    ) -> Result<(), ()> {
        let info = self.node_info(definition);
        let name_tok = definition
            .iter()
            .find(|tok| tok.kind == TokenKind::StrValue)
            .cloned()
            .ok_or(())?;
        let name = name_tok.lexeme().to_string();

        if file_node.test(&name).is_some() {
            self.emit_at(&name_tok, ErrKind::TestRedefinition { name });
            return Err(());
        }

        let mut scopes = ScopeArena::new();
        let body_scope = scopes.push_scope(0);
        let statements = self.create_body(&mut scopes, body_scope, body);
        file_node.add_definition(Definition::Test(TestNode {
            info,
            name,
            scopes,
            body: statements,
        }));
        Ok(())
    }

}

/// `data: A, B;` / `func: F;` — the identifiers after the colon.
fn module_list(line: &[PositionedToken], keyword: TokenKind) -> Vec<PositionedToken> {
    let Some(key_idx) = line.iter().position(|tok| tok.kind == keyword) else {
        return Vec::new();
    };
    line[key_idx + 1..]
        .iter()
        .filter(|tok| tok.kind == TokenKind::Identifier)
        .cloned()
        .collect()
}

/// `data:` / `func:` / `link:` with nothing after the colon opens an
/// indented block.
fn is_block_header(line: &[PositionedToken], keyword: TokenKind) -> bool {
    let clean: Vec<&PositionedToken> = line
        .iter()
        .filter(|tok| {
            !matches!(
                tok.kind,
                TokenKind::Indent | TokenKind::Eol | TokenKind::Eof
            )
        })
        .collect();
    clean.len() == 2 && clean[0].kind == keyword && clean[1].kind == TokenKind::Colon
}
