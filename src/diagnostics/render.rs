//! Terminal rendering of diagnostics.
//!
//! Each error prints a header, the message, and a box-drawing frame
//! with the error line plus the chain of enclosing lines above it
//! (every line whose indent is one step shallower, up to indent 0).
//! Indent runs render as a faint `»` per tab stop; the error span is
//! underlined in red.

use std::io::{self, Write};

use atty::Stream;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use terminal_size::{terminal_size, Width};

use crate::context::{CompilerContext, SourceLine};
use crate::diagnostics::{Diagnostic, Stage};
use crate::lexer::token::TAB_SIZE;

/// Stderr stream with color only when stderr is a terminal.
pub fn stderr_stream() -> StandardStream {
    let choice = if atty::is(Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stderr(choice)
}

/// Render every accumulated diagnostic, sorted by (file, line, column).
pub fn render_all(ctx: &CompilerContext, out: &mut impl WriteColor) -> io::Result<()> {
    for diagnostic in ctx.sorted_diagnostics() {
        render_terminal(ctx, &diagnostic, out)?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn render_terminal(
    ctx: &CompilerContext,
    diagnostic: &Diagnostic,
    out: &mut impl WriteColor,
) -> io::Result<()> {
    let mut red = ColorSpec::new();
    red.set_fg(Some(Color::Red)).set_bold(true);
    let mut green = ColorSpec::new();
    green.set_fg(Some(Color::Green));

    out.set_color(&red)?;
    write!(out, "{}", diagnostic.stage.name())?;
    out.reset()?;
    write!(out, " at ")?;
    out.set_color(&green)?;
    if diagnostic.file.is_empty() {
        write!(out, "unknown file")?;
    } else {
        let shown = diagnostic
            .file
            .path()
            .strip_prefix(&ctx.cwd)
            .unwrap_or(diagnostic.file.path());
        write!(
            out,
            "{}:{}:{}",
            shown.display(),
            diagnostic.line,
            diagnostic.column
        )?;
    }
    out.reset()?;
    writeln!(out)?;

    for message_line in diagnostic.kind.message().lines() {
        writeln!(out, "  {}", message_line)?;
    }
    if ctx.debug_mode {
        let mut dim = ColorSpec::new();
        dim.set_dimmed(true);
        out.set_color(&dim)?;
        writeln!(out, "  at compiler {}", diagnostic.origin)?;
        out.reset()?;
    }

    // Lexing errors happen before the source-line table is usable for
    // framing; synthetic errors have no file at all.
    let lines = ctx
        .source_lines
        .lock()
        .unwrap()
        .get(&diagnostic.file)
        .cloned();
    let lines = match (diagnostic.stage, lines) {
        (Stage::Lexing, _) | (_, None) => {
            writeln!(out, "├┤E0000│")?;
            return Ok(());
        }
        (_, Some(lines)) => lines,
    };
    if diagnostic.line == 0 || diagnostic.line as usize > lines.len() {
        writeln!(out, "├┤E0000│")?;
        return Ok(());
    }

    // Error line first, then walk back through the enclosing lines,
    // one indent step shallower each, until indent 0.
    let err_line = &lines[diagnostic.line as usize - 1];
    let mut to_print: Vec<(u32, &SourceLine)> = vec![(diagnostic.line, err_line)];
    let mut current_indent = err_line.indent;
    for line_no in (1..diagnostic.line).rev() {
        if current_indent == 0 {
            break;
        }
        let candidate = &lines[line_no as usize - 1];
        if is_blank(&candidate.text) {
            continue;
        }
        if candidate.indent < current_indent {
            to_print.push((line_no, candidate));
            current_indent = candidate.indent;
        }
    }
    to_print.reverse();

    let gutter = diagnostic.line.to_string().len();
    let width_limit = terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(120)
        .saturating_sub(gutter + 3);

    write!(out, "└")?;
    for _ in 0..gutter {
        write!(out, "─")?;
    }
    writeln!(out, "┬┤E0000│")?;

    for (line_no, source_line) in &to_print {
        render_source_line(
            out,
            *line_no,
            source_line,
            gutter,
            width_limit,
            if *line_no == diagnostic.line {
                Some((diagnostic.column, diagnostic.length))
            } else {
                None
            },
        )?;
    }

    write!(out, "┌")?;
    for _ in 0..gutter {
        write!(out, "─")?;
    }
    write!(out, "┴─")?;
    for _ in 1..diagnostic.column.max(1) {
        write!(out, "─")?;
    }
    writeln!(out, "┘")?;
    Ok(())
}

fn render_source_line(
    out: &mut impl WriteColor,
    line_no: u32,
    source_line: &SourceLine,
    gutter: usize,
    width_limit: usize,
    underline: Option<(u32, u32)>,
) -> io::Result<()> {
    write!(out, "{:<width$} │ ", line_no, width = gutter)?;

    let mut dim = ColorSpec::new();
    dim.set_dimmed(true);
    out.set_color(&dim)?;
    for _ in 0..source_line.indent {
        write!(out, "{:<width$}", "»", width = TAB_SIZE as usize)?;
    }
    out.reset()?;

    let stripped: String = strip_indentation(&source_line.text, source_line.indent);
    let visible: String = stripped.chars().take(width_limit).collect();

    match underline {
        None => writeln!(out, "{}", visible),
        Some((column, length)) => {
            let offset = (column.saturating_sub(1))
                .saturating_sub(source_line.indent * TAB_SIZE) as usize;
            let chars: Vec<char> = visible.chars().collect();
            let offset = offset.min(chars.len());
            let end = (offset + length.max(1) as usize).min(chars.len());
            let before: String = chars[..offset].iter().collect();
            let span: String = chars[offset..end].iter().collect();
            let after: String = chars[end..].iter().collect();
            write!(out, "{}", before)?;
            let mut marked = ColorSpec::new();
            marked.set_fg(Some(Color::Red)).set_underline(true);
            out.set_color(&marked)?;
            write!(out, "{}", span)?;
            out.reset()?;
            writeln!(out, "{}", after)
        }
    }
}

/// Drop the leading whitespace that the indent markers replace.
fn strip_indentation(text: &str, indent: u32) -> String {
    let mut remaining = indent * TAB_SIZE;
    let mut chars = text.chars().peekable();
    while remaining > 0 {
        match chars.peek() {
            Some('\t') => {
                chars.next();
                remaining = remaining.saturating_sub(TAB_SIZE);
            }
            Some(' ') => {
                chars.next();
                remaining -= 1;
            }
            _ => break,
        }
    }
    chars.collect()
}

fn is_blank(text: &str) -> bool {
    let code = match text.find("//") {
        Some(pos) => &text[..pos],
        None => text,
    };
    code.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FileHash;
    use crate::diagnostics::ErrKind;
    use crate::parser::Parser;
    use std::path::{Path, PathBuf};
    use termcolor::Buffer;

    #[test]
    fn frame_contains_the_error_line_and_enclosing_header() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp/project"));
        let file = FileHash::new(Path::new("/tmp/project/main.ft"));
        let source = "def main():\n\tx := 1 + 2.0;\n";
        let _ = Parser::parse_source(&ctx, file.clone(), PathBuf::from("/tmp/project"), source);

        let diagnostic = Diagnostic::new(
            file,
            2,
            10,
            5,
            ErrKind::StmtCreationFailed,
        );
        let mut buffer = Buffer::no_color();
        render_terminal(&ctx, &diagnostic, &mut buffer).unwrap();
        let rendered = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(rendered.contains("Parsing Error"));
        assert!(rendered.contains("main.ft:2:10"));
        assert!(rendered.contains("def main():"));
        assert!(rendered.contains("»"));
        assert!(rendered.contains("┬┤E0000│"));
    }

    #[test]
    fn lexing_errors_render_the_minimal_frame() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp/project"));
        let diagnostic = Diagnostic::new(
            FileHash::new(Path::new("/tmp/project/main.ft")),
            1,
            1,
            1,
            ErrKind::LitUnterminatedString,
        );
        let mut buffer = Buffer::no_color();
        render_terminal(&ctx, &diagnostic, &mut buffer).unwrap();
        let rendered = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(rendered.contains("├┤E0000│"));
    }

    #[test]
    fn unknown_file_renders_without_position() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp/project"));
        let diagnostic = Diagnostic::unpositioned(ErrKind::CliParsing {
            message: "flags must be quoted".to_string(),
        });
        let mut buffer = Buffer::no_color();
        render_terminal(&ctx, &diagnostic, &mut buffer).unwrap();
        let rendered = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(rendered.contains("unknown file"));
        assert!(rendered.contains("flags must be quoted"));
    }
}
