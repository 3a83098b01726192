//! Feed parsing and aggregation.
//!
//! `header` → `record` → `normalize` → `flatten` → `summary`, wired together
//! by `pipeline`.

pub mod arrow;
pub mod flatten;
pub mod header;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod summary;

pub use flatten::flatten;
pub use header::{FeedMetadata, FeedText, HeaderExtractor};
pub use normalize::{Descriptor, FieldNormalizer, NormalizedTable};
pub use pipeline::{analyze, run_once, FeedReport, RunOutcome, RunStats, Summary};
pub use record::{Record, RecordParser};
pub use summary::{summarize, FrequencyTable, TokenCount};
