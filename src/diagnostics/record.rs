//! Structured diagnostic records for tool consumption.
//!
//! The record's character offset is a plain character position: the
//! rendered column counts a tab as `TAB_SIZE` columns, so the offset
//! subtracts `indent × (TAB_SIZE − 1)` to land on the character an
//! editor sees.

use serde::Serialize;

use crate::context::CompilerContext;
use crate::diagnostics::Diagnostic;
use crate::lexer::token::TAB_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    Error,
}

/// `{ range: [line0, character0, length], severity, message, file }`
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRecord {
    pub range: (u32, u32, u32),
    pub severity: DiagnosticLevel,
    pub message: String,
    pub file: String,
}

pub fn to_record(ctx: &CompilerContext, diagnostic: &Diagnostic) -> DiagnosticRecord {
    if diagnostic.file.is_empty() {
        return DiagnosticRecord {
            range: (0, 0, 0),
            severity: DiagnosticLevel::Error,
            message: diagnostic.kind.message(),
            file: String::new(),
        };
    }

    let indent = ctx
        .source_lines
        .lock()
        .unwrap()
        .get(&diagnostic.file)
        .and_then(|lines| lines.get(diagnostic.line.saturating_sub(1) as usize))
        .map(|line| line.indent)
        .unwrap_or(0);
    let character = diagnostic
        .column
        .saturating_sub(1)
        .saturating_sub(indent * (TAB_SIZE - 1));

    DiagnosticRecord {
        range: (
            diagnostic.line.saturating_sub(1),
            character,
            diagnostic.length,
        ),
        severity: DiagnosticLevel::Error,
        message: diagnostic.kind.message(),
        file: diagnostic.file.path().display().to_string(),
    }
}

pub fn to_json(ctx: &CompilerContext, diagnostic: &Diagnostic) -> String {
    serde_json::to_string(&to_record(ctx, diagnostic)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FileHash, SourceLine};
    use crate::diagnostics::ErrKind;
    use std::path::{Path, PathBuf};

    #[test]
    fn character_offset_corrects_for_tab_expansion() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp"));
        let file = FileHash::new(Path::new("/tmp/main.ft"));
        ctx.register_source_lines(
            file.clone(),
            vec![
                SourceLine {
                    indent: 0,
                    text: "def main():".to_string(),
                },
                SourceLine {
                    indent: 1,
                    text: "\tx := 1;".to_string(),
                },
            ],
        );
        // Column 5 is the first character after one expanded tab; the
        // editor-visible character offset is 1.
        let diagnostic = Diagnostic::new(file, 2, 5, 1, ErrKind::StmtCreationFailed);
        let record = to_record(&ctx, &diagnostic);
        assert_eq!(record.range, (1, 1, 1));
        assert_eq!(record.severity, DiagnosticLevel::Error);
    }

    #[test]
    fn json_shape() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp"));
        let diagnostic = Diagnostic::unpositioned(ErrKind::CliParsing {
            message: "bad flag".to_string(),
        });
        let json = to_json(&ctx, &diagnostic);
        assert!(json.contains("\"range\""));
        assert!(json.contains("\"severity\":\"Error\""));
        assert!(json.contains("bad flag"));
    }
}
