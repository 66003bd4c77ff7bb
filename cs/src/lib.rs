//! CustStore - SQLite-backed customer store
//!
//! Owns the three relational surfaces of the export job plus its run
//! bookkeeping:
//!
//! ```text
//! custjob.db
//! ├── customer          # source rows, read by a single-pass cursor
//! ├── excluded_country  # countries whose customers are dropped
//! ├── new_customer      # export target, create-only writes
//! └── job_run           # one row per pipeline run, monotonic run ids
//! ```
//!
//! # Example
//!
//! ```ignore
//! use custstore::CustomerStore;
//!
//! let store = CustomerStore::open("custjob.db")?;
//! store.add_excluded("KR")?;
//! let excluded = store.excluded_countries()?;
//! ```

mod record;
mod store;

pub use record::{Customer, JobRun, NewCustomer, RunStatus};
pub use store::{CustomerCursor, CustomerStore, SELECT_CUSTOMERS};
