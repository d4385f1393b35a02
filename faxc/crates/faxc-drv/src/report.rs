//! Renders [`Diagnostic`]s to stderr, per §6.3: "rendering [...] is the
//! driver's job."
//!
//! Lexer spans carry a real line/column (the lexer tracks both as it
//! scans). Parser and semantic spans don't: `faxc_par::Parser` measures
//! spans in token indices (`Span::new(start, end, 0, 0)`, see
//! `faxc-par`'s entry in DESIGN.md), so an AST- or HIR-level diagnostic
//! has no source line to underline. This module renders a real caret
//! snippet when a line number is available and falls back to a plain
//! token-range note otherwise, rather than fabricate a line/column.

use std::path::Path;

use faxc_util::diagnostic::SourceSnippet;
use faxc_util::{Diagnostic, Handler};

pub fn print_all(handler: &Handler, input: &Path, source: &str) {
    for diag in handler.diagnostics() {
        print_one(&diag, input, source);
    }
}

pub fn print_one(diag: &Diagnostic, input: &Path, source: &str) {
    let code = diag
        .code
        .map(|c| format!("[{}] ", c.as_str()))
        .unwrap_or_default();
    eprintln!("{}: {}{}", diag.level, code, diag.message);
    eprintln!("  --> {}", input.display());

    if diag.span.line > 0 {
        if let Some(line) = source.lines().nth(diag.span.line as usize - 1) {
            let snippet = SourceSnippet::point(line, diag.span.line as usize, diag.span.column as usize);
            eprintln!("{}", indent(&snippet.format()));
        }
    } else if diag.span.start != diag.span.end || diag.span.start != 0 {
        eprintln!("  (token range {}..{}, no source position recorded at this stage)", diag.span.start, diag.span.end);
    }

    for note in &diag.notes {
        eprintln!("  note: {note}");
    }
    for help in &diag.helps {
        eprintln!("  help: {help}");
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("  {l}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use faxc_util::Span;
    use std::path::PathBuf;

    #[test]
    fn line_zero_span_falls_back_to_token_range() {
        let diag = Diagnostic::error("undefined name", Span::new(3, 4, 0, 0));
        print_one(&diag, &PathBuf::from("x.fax"), "fn main() {}");
    }

    #[test]
    fn real_line_span_renders_a_snippet() {
        let diag = Diagnostic::error("bad char", Span::new(0, 1, 1, 5));
        print_one(&diag, &PathBuf::from("x.fax"), "let 1x = 0;");
    }
}
