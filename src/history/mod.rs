// src/history/mod.rs
pub mod hash;
pub mod record;

pub use hash::{content_hash, hash_dir, read_tree};
pub use record::{ChangeRecord, RecordError};
