//! CustJob - customer export batch job
//!
//! A single-pass ETL pipeline over the customer store:
//!
//! ```text
//! customer table ──cursor──▶ transformer ──▶ dual sink ──▶ new_customer table
//!                               │                      └──▶ delimited file
//!                               └── exclusion lookup (per record)
//! ```
//!
//! The pipeline driver owns the loop and processes the source in fixed-size
//! chunks. Each chunk's store write is one transaction; the file sink is
//! appended after the store sink succeeds. A run either exhausts the source
//! or fails as a whole: partial sink delivery is never reported as success.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod sink;
pub mod transform;

pub use pipeline::{RunSummary, run, run_with_writer};
pub use sink::{CsvFileSink, DualSink, Sink, SinkError, StoreSink};
pub use transform::Transformer;

/// Default number of records per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Header line of the delimited output file
pub const CSV_HEADER: &str = "FullName,Birthday,Nation,PhoneNumber,Email";
