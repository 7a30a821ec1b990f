//! # cs-core
//!
//! Core types for CrabStat: the shared error/result types, the fixed
//! categorical model dimensions (sex, maturity state, shell condition), the
//! size-bin grid and model year range, and the index-range/index-block
//! machinery that maps configuration labels onto model indices.
//!
//! Everything here is built once from configuration and immutable thereafter.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dims;
pub mod error;
pub mod index;
pub mod types;

pub use dims::{ModelDims, SizeGrid};
pub use error::{Error, Result};
pub use index::{IndexBlock, IndexRange};
pub use types::FitResult;
