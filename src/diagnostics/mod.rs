//! Diagnostics engine: one closed sum type for every error the front-end
//! can report, plus terminal and structured renderers.
//!
//! Errors are values, not an open hierarchy. Each variant owns exactly
//! the context its message needs; rendering dispatches by pattern match.
//! The only reporting entry point is [`crate::context::CompilerContext::emit`].

pub mod record;
pub mod render;

use std::panic::Location;
use std::sync::Arc;

use crate::context::FileHash;
use crate::lexer::token::TokenKind;
use crate::types::Type;

/// Compilation stage an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cli,
    Lexing,
    Parsing,
    Resolving,
    Scoping,
    Generating,
    Linking,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Cli => "Cli Error",
            Stage::Lexing => "Lexing Error",
            Stage::Parsing => "Parsing Error",
            Stage::Resolving => "Resolving Error",
            Stage::Scoping => "Scope Error",
            Stage::Generating => "Generation Error",
            Stage::Linking => "Linking Error",
        }
    }
}

/// Every error kind the front-end can produce, with its context.
#[derive(Debug, Clone)]
pub enum ErrKind {
    // --- lexing ---
    CommentUnterminatedMultiline,
    LitUnterminatedString,
    LitExpectedCharValue,
    LitCharLongerThanSingleCharacter { literal: String },
    InvalidIdentifier { identifier: String },
    UnexpectedChar { character: char },
    UnexpectedCharNumber { character: char },
    UnexpectedPipe,

    // --- parsing: definitions ---
    UnexpectedDefinition { line_text: String },
    DefDataRedefinition { name: String },
    DefDataDuplicateFieldName { data: String, field: String },
    DefEntityMissingData { entity: String, data: String },
    DefEntityDuplicateData { entity: String, data: String },
    DefEntityDuplicateFunc { entity: String, func: String },
    EntityWrongConstructorName { entity: String, found: String },
    DefFuncRedefinition { name: String },
    DefFuncRequiringSameDataTwice { func: String, data: String },
    FunctionRedefinition { name: String },
    FnCannotReturnTuple { function: String },
    FnMainRedefinition,
    FnMainReturnType,
    FnMainTooManyArgs { count: usize },
    FnMainWrongArgType { found: String },
    FnMainErrSet,
    FnReservedName { name: String },
    DefNoMainFunction { file: String },
    TestRedefinition { name: String },
    DefErrOnlyOneParent { error_set: String },
    AliasNotFound { alias: String },
    NotFoundInAliasedFile { name: String, alias: String },
    CoreModuleNotFound { module: String },
    ImportSameFileTwice { path: String },
    ImportNonexistentFile { path: String },
    ImportExitedCwd { path: String },
    UseStatementNotAtTopLevel,

    // --- parsing: expressions ---
    ExprBinopCreationFailed,
    ExprBinopTypeMismatch {
        op: TokenKind,
        lhs: Arc<Type>,
        rhs: Arc<Type>,
    },
    ExprCallCreationFailed,
    ExprCallOfUndefinedFunction {
        name: String,
        candidates: Vec<String>,
    },
    ExprCallWrongArgCount {
        name: String,
        expected: usize,
        found: usize,
    },
    ExprCallWrongArgsBuiltin {
        name: String,
        expected: String,
        found: Vec<Arc<Type>>,
    },
    ExprNestedGroup,
    ExprTupleAccessOob { index: usize, size: usize },
    ExprInterpolationOnlyOneExpr { expression: String },
    ExprTypeMismatch {
        expected: Arc<Type>,
        found: Arc<Type>,
    },
    ExprUnopCreationFailed,
    ExprVariableCreationFailed { name: String },
    ValUnknownLiteral { lexeme: String },

    // --- parsing: statements and scopes ---
    StmtCreationFailed,
    StmtAssignmentCreationFailed,
    StmtCatchCreationFailed,
    StmtDeclarationCreationFailed,
    StmtForCreationFailed,
    StmtIfCreationFailed,
    StmtReturnCreationFailed,
    StmtThrowCreationFailed,
    StmtWhileCreationFailed,
    StmtDanglingElse,
    StmtDanglingCatch,
    StmtDanglingEqualSign,
    StmtIfChainMissingIf,
    MissingBody,
    BodyCreationFailed,
    UnclosedParen,
    UndefinedStatement { statement: String },

    // --- parsing: variables ---
    VarNotDeclared { name: String },
    VarMutatingConst { name: String },
    VarRedefinition { name: String },
    VarFromRequiresList { name: String },

    // --- parsing: types ---
    TupleMultiTypeOverlap,

    // --- parsing: foreign interop ---
    NoFipDirectoryFound,
    AmbiguousModuleTag { tag: String },
    ExternDuplicateFunction { name: String },
    ExternFnNotFound { name: String },
    ExternWithoutFip { name: String },

    // --- analysis ---
    PtrNotAllowedInNonExternContext,
    PtrNotAllowedInVariantDefinition,

    // --- driver ---
    CliParsing { message: String },
}

impl ErrKind {
    /// Render the user-facing message for this error.
    pub fn message(&self) -> String {
        use ErrKind::*;
        match self {
            CommentUnterminatedMultiline => "unterminated multiline comment".to_string(),
            LitUnterminatedString => "unterminated string literal".to_string(),
            LitExpectedCharValue => "expected a character value inside the char literal".to_string(),
            LitCharLongerThanSingleCharacter { literal } => {
                format!("char literal '{}' is longer than a single character", literal)
            }
            InvalidIdentifier { identifier } => format!(
                "identifier '{}' uses a reserved prefix and is not permitted",
                identifier
            ),
            UnexpectedChar { character } => format!("unexpected character '{}'", character),
            UnexpectedCharNumber { character } => format!(
                "expected a digit after '.' in a number literal, found '{}'",
                character
            ),
            UnexpectedPipe => "unexpected '|', logical or is written 'or'".to_string(),

            UnexpectedDefinition { line_text } => {
                format!("'{}' is not a recognized top-level definition", line_text)
            }
            DefDataRedefinition { name } => format!("redefinition of data module '{}'", name),
            DefDataDuplicateFieldName { data, field } => {
                format!("duplicate field '{}' in data module '{}'", field, data)
            }
            DefEntityMissingData { entity, data } => format!(
                "entity '{}' references data module '{}' which it does not declare",
                entity, data
            ),
            DefEntityDuplicateData { entity, data } => {
                format!("entity '{}' lists data module '{}' twice", entity, data)
            }
            DefEntityDuplicateFunc { entity, func } => {
                format!("entity '{}' lists func module '{}' twice", entity, func)
            }
            EntityWrongConstructorName { entity, found } => format!(
                "constructor of entity '{}' must be named '{}', found '{}'",
                entity, entity, found
            ),
            DefFuncRedefinition { name } => format!("redefinition of func module '{}'", name),
            DefFuncRequiringSameDataTwice { func, data } => format!(
                "func module '{}' requires data module '{}' twice",
                func, data
            ),
            FunctionRedefinition { name } => format!("redefinition of function '{}'", name),
            FnCannotReturnTuple { function } => format!(
                "function '{}' cannot return a tuple directly, wrap the types in a group instead",
                function
            ),
            FnMainRedefinition => "the 'main' function is defined more than once".to_string(),
            FnMainReturnType => "the 'main' function cannot declare return types".to_string(),
            FnMainTooManyArgs { count } => format!(
                "the 'main' function takes at most one argument, found {}",
                count
            ),
            FnMainWrongArgType { found } => format!(
                "the argument of 'main' must be 'str[] args', found '{}'",
                found
            ),
            FnMainErrSet => "the 'main' function cannot declare an error set".to_string(),
            FnReservedName { name } => format!("'{}' is a reserved function name", name),
            DefNoMainFunction { file } => {
                format!("no 'main' function defined in root file '{}'", file)
            }
            TestRedefinition { name } => format!("redefinition of test \"{}\"", name),
            DefErrOnlyOneParent { error_set } => format!(
                "error set '{}' can only extend a single parent set",
                error_set
            ),
            AliasNotFound { alias } => format!("alias '{}' does not name an import", alias),
            NotFoundInAliasedFile { name, alias } => format!(
                "'{}' was not found in the file imported as '{}'",
                name, alias
            ),
            CoreModuleNotFound { module } => {
                format!("'Core.{}' is not a known core module", module)
            }
            ImportSameFileTwice { path } => format!("file '{}' is imported twice", path),
            ImportNonexistentFile { path } => format!("imported file '{}' does not exist", path),
            ImportExitedCwd { path } => {
                format!("import '{}' escapes the compiler working directory", path)
            }
            UseStatementNotAtTopLevel => {
                "use statements must be at the top level of the file".to_string()
            }

            ExprBinopCreationFailed => "failed to parse binary expression".to_string(),
            ExprBinopTypeMismatch { op, lhs, rhs } => format!(
                "type mismatch in binary '{}' expression: left side is '{}', right side is '{}'",
                op.as_str(),
                lhs,
                rhs
            ),
            ExprCallCreationFailed => "failed to parse call expression".to_string(),
            ExprCallOfUndefinedFunction { name, candidates } => {
                let mut message = format!("call of undefined function '{}'", name);
                if !candidates.is_empty() {
                    message.push_str("\npossible functions you meant:");
                    for candidate in candidates {
                        message.push_str("\n  ");
                        message.push_str(candidate);
                    }
                }
                message
            }
            ExprCallWrongArgCount {
                name,
                expected,
                found,
            } => format!(
                "function '{}' expects {} argument(s), found {}",
                name, expected, found
            ),
            ExprCallWrongArgsBuiltin {
                name,
                expected,
                found,
            } => {
                let found_types: Vec<String> = found.iter().map(|ty| ty.to_string()).collect();
                format!(
                    "builtin '{}' expects {}, found ({})",
                    name,
                    expected,
                    found_types.join(", ")
                )
            }
            ExprNestedGroup => "groups cannot be nested directly".to_string(),
            ExprTupleAccessOob { index, size } => format!(
                "tuple access '.{}' is out of bounds for a tuple of {} elements",
                index, size
            ),
            ExprInterpolationOnlyOneExpr { expression } => format!(
                "interpolation string contains only the single expression '{}', use 'str({})' instead",
                expression, expression
            ),
            ExprTypeMismatch { expected, found } => {
                format!("expected type '{}', found '{}'", expected, found)
            }
            ExprUnopCreationFailed => "failed to parse unary expression".to_string(),
            ExprVariableCreationFailed { name } => {
                format!("failed to parse variable expression '{}'", name)
            }
            ValUnknownLiteral { lexeme } => format!("unknown literal '{}'", lexeme),

            StmtCreationFailed => "failed to parse statement".to_string(),
            StmtAssignmentCreationFailed => "failed to parse assignment".to_string(),
            StmtCatchCreationFailed => "failed to parse catch block".to_string(),
            StmtDeclarationCreationFailed => "failed to parse declaration".to_string(),
            StmtForCreationFailed => "failed to parse for loop".to_string(),
            StmtIfCreationFailed => "failed to parse if statement".to_string(),
            StmtReturnCreationFailed => "failed to parse return statement".to_string(),
            StmtThrowCreationFailed => "failed to parse throw statement".to_string(),
            StmtWhileCreationFailed => "failed to parse while loop".to_string(),
            StmtDanglingElse => "'else' without a preceding 'if'".to_string(),
            StmtDanglingCatch => "'catch' without a preceding throwing call".to_string(),
            StmtDanglingEqualSign => "'=' without a left-hand side".to_string(),
            StmtIfChainMissingIf => "if-chain does not start with an 'if'".to_string(),
            MissingBody => "definition requires an indented body".to_string(),
            BodyCreationFailed => "failed to parse body".to_string(),
            UnclosedParen => "unclosed parenthesis".to_string(),
            UndefinedStatement { statement } => {
                format!("'{}' is not a recognized statement", statement)
            }

            VarNotDeclared { name } => format!("variable '{}' has not been declared", name),
            VarMutatingConst { name } => format!("cannot assign to constant variable '{}'", name),
            VarRedefinition { name } => {
                format!("variable '{}' is already declared in this scope", name)
            }
            VarFromRequiresList { name } => format!(
                "variable '{}' is already introduced by the requires clause",
                name
            ),

            TupleMultiTypeOverlap => {
                "tuple and multi-type return declarations cannot overlap".to_string()
            }

            NoFipDirectoryFound => "no '.fip' directory found for extern definitions".to_string(),
            AmbiguousModuleTag { tag } => format!("module tag '{}' is ambiguous", tag),
            ExternDuplicateFunction { name } => {
                format!("extern function '{}' is declared twice", name)
            }
            ExternFnNotFound { name } => format!("extern function '{}' was not found", name),
            ExternWithoutFip { name } => format!(
                "extern function '{}' declared without a foreign interop module",
                name
            ),

            PtrNotAllowedInNonExternContext => {
                "pointer types are only allowed in extern contexts".to_string()
            }
            PtrNotAllowedInVariantDefinition => {
                "pointer types are not allowed in variant definitions".to_string()
            }

            CliParsing { message } => message.clone(),
        }
    }

    /// The stage this kind belongs to.
    pub fn stage(&self) -> Stage {
        use ErrKind::*;
        match self {
            CommentUnterminatedMultiline
            | LitUnterminatedString
            | LitExpectedCharValue
            | LitCharLongerThanSingleCharacter { .. }
            | InvalidIdentifier { .. }
            | UnexpectedChar { .. }
            | UnexpectedCharNumber { .. }
            | UnexpectedPipe => Stage::Lexing,
            ImportNonexistentFile { .. } | ImportExitedCwd { .. } => Stage::Resolving,
            VarNotDeclared { .. }
            | VarMutatingConst { .. }
            | VarRedefinition { .. }
            | VarFromRequiresList { .. } => Stage::Scoping,
            CliParsing { .. } => Stage::Cli,
            _ => Stage::Parsing,
        }
    }
}

/// A reported error: kind-specific payload plus the position it points at.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub stage: Stage,
    pub file: FileHash,
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub kind: ErrKind,
    /// Compiler-internal call site, rendered in debug mode only.
    pub origin: &'static Location<'static>,
}

impl Diagnostic {
    #[track_caller]
    pub fn new(file: FileHash, line: u32, column: u32, length: u32, kind: ErrKind) -> Self {
        Self {
            stage: kind.stage(),
            file,
            line,
            column,
            length,
            kind,
            origin: Location::caller(),
        }
    }

    /// Synthetic errors that cannot point at a file location.
    #[track_caller]
    pub fn unpositioned(kind: ErrKind) -> Self {
        Self::new(FileHash::empty(), 0, 0, 0, kind)
    }

    /// Sort key used when flushing diagnostics on exit.
    pub fn sort_key(&self) -> (String, u32, u32) {
        (
            self.file.path().display().to_string(),
            self.line,
            self.column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_derived_from_kinds() {
        assert_eq!(ErrKind::LitUnterminatedString.stage(), Stage::Lexing);
        assert_eq!(ErrKind::MissingBody.stage(), Stage::Parsing);
        assert_eq!(
            ErrKind::VarNotDeclared {
                name: "x".to_string()
            }
            .stage(),
            Stage::Scoping
        );
    }

    #[test]
    fn undefined_function_message_lists_candidates() {
        let kind = ErrKind::ExprCallOfUndefinedFunction {
            name: "pritn".to_string(),
            candidates: vec!["print(str)".to_string()],
        };
        let message = kind.message();
        assert!(message.contains("undefined function 'pritn'"));
        assert!(message.contains("print(str)"));
    }
}
