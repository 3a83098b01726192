//! Parse the Bambenek C2 master feed and summarize it into frequency charts.
//!
//! ```rust,no_run
//! use c2feed::{config::FeedConfig, process::analyze};
//!
//! let bytes = std::fs::read("c2-masterlist.txt")?;
//! let report = analyze(&bytes, &FeedConfig::default())?;
//! for s in &report.summaries {
//!     println!("{}: {} tokens above {}", s.spec.title, s.table.len(), s.spec.threshold);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod process;
pub mod render;
pub mod schema;

pub use error::{FeedError, Result};
