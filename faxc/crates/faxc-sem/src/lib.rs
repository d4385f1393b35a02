//! faxc-sem - semantic analysis.
//!
//! Turns the parser's AST into checked HIR: conversion (C2), name
//! resolution (C3), context construction (C4), expression checking (C5,
//! folding in constant evaluation as C10), trait-impl checking (C6),
//! control-flow linking (C7), and `exit()`-placement checking (C8).
//!
//! [`analyze`] runs the whole pipeline; each phase is also reachable on its
//! own for callers (tests, tooling) that want to stop partway through.

pub mod check;
pub mod const_eval;
pub mod context;
pub mod control_flow;
pub mod convert;
pub mod error;
pub mod exit_check;
pub mod hir;
pub mod impl_table;
pub mod pretty;
pub mod resolve;
pub mod scope;
pub mod trait_check;
pub mod types;

pub use context::Context;
pub use error::{SemanticError, SemanticResult};
pub use hir::{Item, Program};
pub use impl_table::ImplTable;
pub use pretty::print_program;
pub use types::{Type, TypeContext, TypeId};

use faxc_par::ast;

/// Runs the full pipeline over a parsed source file and returns the checked
/// HIR together with the context that resolved its types.
///
/// `main_name` is the identifier `exit()` placement is checked against
/// (§4.7) — only that function's body may call it.
pub fn analyze(items: ast::Ast, main_name: &str) -> SemanticResult<(Program, Context)> {
    let mut program = convert::Converter::new().convert_program(items)?;
    let mut ctx = Context::new(&mut program)?;
    resolve::resolve_program(&mut program, &mut ctx)?;
    check::check_program(&mut program, &mut ctx)?;
    trait_check::check_program(&program, &ctx)?;
    control_flow::link_program(&mut program)?;

    for func in &program.functions {
        let is_main = func.name.as_str() == main_name;
        exit_check::check_function_body(&func.body, is_main)?;
    }
    for method in &program.methods {
        exit_check::check_function_body(&method.body, false)?;
    }

    Ok((program, ctx))
}
