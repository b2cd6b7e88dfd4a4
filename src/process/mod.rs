// src/process/mod.rs
pub mod normalize;
pub mod table;
pub mod utils;

pub use normalize::{normalize, NormalizeError};
pub use table::{Delimiter, Table};
