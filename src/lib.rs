//! Pin the connectome tables published on the WormWiring series index.
//!
//! A run scrapes the index, downloads every edge, contact, synapse and
//! adjacency table, normalizes them into a canonical CSV shape, writes them
//! under a data directory and records an MD5 content hash plus timestamp
//! whenever the data actually changed.

pub mod config;
pub mod fetch;
pub mod history;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod schema;

pub use config::Config;
pub use pipeline::{run, RunSummary};
