//! `flintc` — compile a Flint source tree to an executable.

use std::process::ExitCode;

use clap::Parser as _;

use flintc::cli::Cli;
use flintc::context::CompilerContext;
use flintc::diagnostics::{record, render, Diagnostic};
use flintc::driver;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and parse failures both leave with a non-zero code.
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("cannot determine the working directory: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = CompilerContext::new(cwd);
    ctx.debug_mode = cli.debug;
    ctx.hard_crash = cli.hard_crash;
    let json = cli.json;

    let options = match cli.into_options() {
        Ok(options) => options,
        Err(kind) => {
            ctx.emit(Diagnostic::unpositioned(kind));
            flush_diagnostics(&ctx, json);
            return ExitCode::FAILURE;
        }
    };

    let result = driver::compile(&ctx, &options);
    flush_diagnostics(&ctx, json);

    match result {
        Ok(request) => {
            // Hand-off point for the LLVM backend; out of scope here.
            println!(
                "{} file(s) ready for code generation into {}",
                request.emission_order.len(),
                request.out_file.display()
            );
            ExitCode::SUCCESS
        }
        Err(()) => ExitCode::FAILURE,
    }
}

fn flush_diagnostics(ctx: &CompilerContext, json: bool) {
    let mut stderr = render::stderr_stream();
    let _ = render::render_all(ctx, &mut stderr);
    if json {
        for diagnostic in ctx.sorted_diagnostics() {
            println!("{}", record::to_json(ctx, &diagnostic));
        }
    }
}
