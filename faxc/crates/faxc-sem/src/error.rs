//! Semantic errors (§7). Every fault this crate can raise — resolution,
//! type, mutability, const-evaluation, control-flow, trait-check, exit-check,
//! or an internal consistency failure — is reported as one of these: a
//! message plus a span, with no partial recovery. The first one raised
//! aborts the compilation unit.

use faxc_util::Span;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

impl SemanticError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        SemanticError {
            message: message.into(),
            span,
        }
    }
}

pub type SemanticResult<T> = Result<T, SemanticError>;
