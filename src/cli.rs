//! Command-line surface of the `flintc` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::diagnostics::ErrKind;
use crate::driver::CompileOptions;

#[derive(Debug, Parser)]
#[command(
    name = "flintc",
    about = "Compiler for the Flint programming language",
    disable_version_flag = true
)]
pub struct Cli {
    /// The file to compile
    #[arg(long, short)]
    pub file: PathBuf,

    /// The name and path of the built output file
    #[arg(long, short, default_value = "main")]
    pub out: PathBuf,

    /// The clang flags used to build the executable; the whole
    /// argument must be quoted
    #[arg(long)]
    pub flags: Option<String>,

    /// Also write the compiled IR to this file
    #[arg(long = "output-ll-file")]
    pub output_ll_file: Option<PathBuf>,

    /// Print structured JSON diagnostics to stdout
    #[arg(long)]
    pub json: bool,

    /// Append compiler-internal call sites to diagnostics
    #[arg(long)]
    pub debug: bool,

    /// Abort the process after the first diagnostic
    #[arg(long = "hard-crash")]
    pub hard_crash: bool,
}

impl Cli {
    /// Validate and convert into driver options. The `--flags` value
    /// must keep its surrounding quotes through the shell.
    pub fn into_options(self) -> Result<CompileOptions, ErrKind> {
        let link_flags = match self.flags {
            None => String::new(),
            Some(flags) if flags.is_empty() => String::new(),
            Some(flags) => {
                if !flags.starts_with('"') || !flags.ends_with('"') || flags.len() < 2 {
                    return Err(ErrKind::CliParsing {
                        message: format!(
                            "the --flags argument must be quoted, got {}",
                            flags
                        ),
                    });
                }
                flags[1..flags.len() - 1].to_string()
            }
        };
        Ok(CompileOptions {
            file: self.file,
            out_file: self.out,
            link_flags,
            ll_file: self.output_ll_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    #[test]
    fn minimal_invocation() {
        let cli = Cli::try_parse_from(["flintc", "--file", "main.ft"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("main.ft"));
        assert_eq!(cli.out, PathBuf::from("main"));
        let options = cli.into_options().unwrap();
        assert!(options.link_flags.is_empty());
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from(["flintc", "-f", "a.ft", "-o", "prog"]).unwrap();
        assert_eq!(cli.out, PathBuf::from("prog"));
    }

    #[test]
    fn unquoted_flags_are_rejected() {
        let cli = Cli::try_parse_from(["flintc", "-f", "a.ft", "--flags", "-lm"]).unwrap();
        assert!(matches!(
            cli.into_options(),
            Err(ErrKind::CliParsing { .. })
        ));
    }

    #[test]
    fn quoted_flags_are_stripped() {
        let cli =
            Cli::try_parse_from(["flintc", "-f", "a.ft", "--flags", "\"-lm -O2\""]).unwrap();
        let options = cli.into_options().unwrap();
        assert_eq!(options.link_flags, "-lm -O2");
    }

    #[test]
    fn unknown_argument_fails() {
        assert!(Cli::try_parse_from(["flintc", "--frobnicate"]).is_err());
    }
}
