//! Post-lowering cleanup run by the driver before textual emission.

pub mod optimize;

pub use optimize::optimize_module;
