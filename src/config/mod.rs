//! # Configuration
//!
//! Wire constants live in [`constants`]; per-buffer tunables live in
//! [`RowOptions`]. There is no file or environment based configuration: the
//! caller builds a `RowOptions` value and hands it to every buffer it creates.
//!
//! ## Module Organization
//!
//! - [`constants`]: sizes and limits of the encoding with compile-time checks
//! - [`options`]: `RowOptions` builder

pub mod constants;
pub mod options;

pub use constants::*;
pub use options::RowOptions;
