//! faxc-drv — the `faxc` binary: wires the lexer, parser, semantic
//! analyzer, and MIR lowerer into the single-pass pipeline described by
//! the external interface in spec §6.1/§6.2.
//!
//! The pipeline stops at the first error-producing phase (§6.3, §7): a
//! lexer/parser error aborts before semantic analysis ever runs, and a
//! semantic error aborts before MIR lowering runs. Every phase's errors go
//! through the same [`Handler`]-backed rendering path in [`report`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use faxc_util::diagnostic::DiagnosticCode;
use faxc_util::{Diagnostic, Handler};
use tracing::{debug, info};

pub mod cli;
pub mod report;

pub use cli::{Cli, EmitKind};

/// Runs the full pipeline for one input file, per `cli`'s flags.
///
/// Returns `Ok(())` having already written the emitted output (or having
/// printed `--dump-hir`/`--dump-mir` output) on success. On any compile
/// error this returns `Ok(())` too — the diagnostics have been printed and
/// the caller is expected to read [`ExitCode`] — reserving `Err` for
/// infrastructure failures (bad path, unreadable file) per §1.1.
pub fn run(cli: &Cli) -> Result<ExitCode> {
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    info!(path = %cli.input.display(), bytes = source.len(), "read source file");

    let mut handler = Handler::new();

    let tokens = lex(&source, &mut handler);
    if handler.has_errors() {
        report::print_all(&handler, &cli.input, &source);
        return Ok(ExitCode::CompileError);
    }
    debug!(token_count = tokens.len(), "lexed source");

    let ast = faxc_par::Parser::new(tokens, &mut handler).parse();
    if handler.has_errors() {
        report::print_all(&handler, &cli.input, &source);
        return Ok(ExitCode::CompileError);
    }
    debug!(item_count = ast.len(), "parsed AST");

    let (program, mut ctx) = match faxc_sem::analyze(ast, "main") {
        Ok(checked) => checked,
        Err(err) => {
            report::print_one(&semantic_diagnostic(&err), &cli.input, &source);
            return Ok(ExitCode::CompileError);
        }
    };
    info!("semantic analysis passed");

    if cli.dump_hir {
        println!("{}", faxc_sem::print_program(&program));
    }

    let mut mir_module = match faxc_mir::lower_program(&program, &mut ctx) {
        Ok(module) => module,
        Err(err) => {
            report::print_one(&semantic_diagnostic(&err), &cli.input, &source);
            return Ok(ExitCode::CompileError);
        }
    };
    faxc_mir::optimize_module(&mut mir_module);
    info!(
        functions = mir_module.functions.len(),
        externs = mir_module.external_functions.len(),
        "lowered and optimized MIR"
    );

    let text = faxc_mir::print_module(&mir_module, &ctx);
    if cli.dump_mir {
        println!("{text}");
    }

    match cli.emit {
        EmitKind::Mir | EmitKind::Text => {
            let output = output_path(cli);
            fs::write(&output, &text)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), "wrote output");
        }
    }

    Ok(ExitCode::Success)
}

/// Process exit status, per §6.2: 0 on success, 1 on any compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    CompileError,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::CompileError => 1,
        }
    }
}

/// Runs the lexer to completion, collecting every token including the
/// trailing `Eof` the parser expects to see.
fn lex(source: &str, handler: &mut Handler) -> Vec<faxc_lex::Token> {
    let mut lexer = faxc_lex::Lexer::new(source, handler);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let is_eof = token == faxc_lex::Token::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

/// Wraps a [`faxc_sem::SemanticError`] in a [`Diagnostic`] the same way
/// every other phase's errors are rendered.
fn semantic_diagnostic(err: &faxc_sem::SemanticError) -> Diagnostic {
    Diagnostic::error(err.message.clone(), err.span)
        .with_code(DiagnosticCode::new("E", 3000))
}

/// Default output path: the input's extension replaced with `.ll`, per
/// §6.2 — a name inherited unchanged from when this crate emitted LLVM IR.
fn output_path(cli: &Cli) -> PathBuf {
    if let Some(explicit) = &cli.output {
        return explicit.clone();
    }
    let mut path = cli.input.clone();
    path.set_extension("ll");
    path
}

/// Exposed for tests that want the default-output-path rule without
/// spinning up a full `Cli`.
pub fn default_output_for(input: &Path) -> PathBuf {
    let mut path = input.to_path_buf();
    path.set_extension("ll");
    path
}
