pub mod catalog;
pub mod types;

pub use catalog::{AliasFile, Catalog};
pub use types::{ColumnDef, ColumnKind, HeaderPolicy, SeriesKind, SeriesSchema};
