pub mod loaders;
pub mod snapshot;
pub mod stats;

pub use loaders::load_urls_from_csv;
pub use snapshot::ProgressSnapshot;
pub use stats::{FailureRecord, ItemOutcome, RunStats};
