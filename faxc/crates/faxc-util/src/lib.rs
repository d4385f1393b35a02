//! faxc-util - Core Utilities and Foundation Types
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! This module provides fundamental utilities and types that form the foundation
//! of the entire faxc compiler infrastructure. These utilities are designed to be
//! zero-cost abstractions that improve code clarity, type safety, and performance
//! without runtime overhead.
//!
//! - [`symbol`] - interned identifiers (`Symbol`)
//! - [`span`] - source locations (`Span`, `FileId`, `SourceMap`)
//! - [`diagnostic`] - error/warning reporting (`Diagnostic`, `Handler`, `DiagnosticBuilder`)
//! - [`def_id`] - stable per-definition identifiers (`DefId`)
//! - [`index_vec`] - typed-index vectors (`IndexVec`, `Idx`)
//! - [`error`] - `thiserror`-derived error types shared across crates
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. ZERO-COST ABSTRACTIONS
//!    All utilities compile down to efficient code with no runtime penalty
//!    compared to hand-written implementations.
//!
//! 2. TYPE SAFETY
//!    Leverage Rust's type system to prevent bugs at compile time.
//!    Examples: Typed indices prevent mixing different ID spaces.
//!
//! 3. PERFORMANCE
//!    Optimize for the common case while maintaining correctness.
//!    Examples: Efficient string interning, lock-free data structures.
//!
//! 4. ERGONOMICS
//!    APIs should be intuitive and easy to use correctly.
//!    Examples: Builder patterns, type inference-friendly interfaces.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, Handler, Level};
pub use error::{DiagnosticError, IndexVecError, SourceMapError, SymbolError};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, Span};
pub use symbol::Symbol;

/// Macro to define index types easily
///
/// Mirrors the hand-written `Idx` impls in [`index_vec`] for callers that
/// just need a fresh newtype-over-`u32` index (e.g. `LocalId`, `BlockId`).
#[macro_export]
macro_rules! define_idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

// Re-export commonly used hashing types so downstream crates don't need a
// direct `rustc-hash` dependency just to name `FxHashMap`/`FxHashSet`.
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
