pub mod snapshot;
pub mod write;

pub use snapshot::DatasetSnapshot;
pub use write::{commit, CommitOutcome};
