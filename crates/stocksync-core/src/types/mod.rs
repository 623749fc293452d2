//! Shared domain types.

pub mod market;
pub mod num;
pub mod records;

pub use market::*;
pub use num::*;
pub use records::*;
