//! C9: lowers a checked HIR [`faxc_sem::Program`] into the MIR module
//! described by §3.7, plus the CFG/liveness analyses and the dead-code
//! cleanup pass the driver runs before textual emission.

pub mod analysis;
pub mod builder;
pub mod lower;
pub mod mir;
pub mod opt;
pub mod pretty;

pub use analysis::*;
pub use lower::lower_program;
pub use mir::*;
pub use opt::*;
pub use pretty::print_module;
