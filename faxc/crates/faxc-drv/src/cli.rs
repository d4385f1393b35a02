//! Command-line surface, per spec §6.2: `faxc <input_file> [output.ll]`
//! plus the debugging flags SPEC_FULL.md §1.3 adds on top.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// A small, single-pass compiler front end: lexes, parses, checks, lowers
/// to MIR, and emits a textual MIR file.
#[derive(Parser, Debug)]
#[command(name = "faxc", version, about)]
pub struct Cli {
    /// Source file to compile.
    pub input: PathBuf,

    /// Output path. Defaults to the input's extension replaced with `.ll`.
    pub output: Option<PathBuf>,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the checked HIR as S-expression text before lowering.
    #[arg(long)]
    pub dump_hir: bool,

    /// Print the lowered, optimized MIR as text.
    #[arg(long)]
    pub dump_mir: bool,

    /// What to write to the output path.
    #[arg(long, value_enum, default_value_t = EmitKind::Mir)]
    pub emit: EmitKind,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitKind {
    /// Textual MIR (the only artifact this pipeline currently produces).
    #[default]
    Mir,
    /// Alias for `mir` — same textual form, kept for readability in scripts.
    Text,
}
