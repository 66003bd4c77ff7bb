//! Chunked pipeline driver
//!
//! Owns the run loop: read a chunk from the source cursor, transform each
//! record, write the accepted set to the dual sink, repeat until the
//! source is exhausted. Every run is bracketed by a `job_run` row so
//! repeated invocations stay distinguishable.

use std::path::Path;

use custstore::{CustomerCursor, CustomerStore, RunStatus, SELECT_CUSTOMERS};
use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::sink::{CsvFileSink, DualSink, Sink, StoreSink};
use crate::transform::Transformer;

/// Counts reported by a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Monotonic run identifier
    pub run_id: i64,

    /// Source rows read
    pub read: u64,

    /// Rows dropped by the exclusion filter
    pub excluded: u64,

    /// Records delivered to both sinks
    pub written: u64,

    /// Chunks processed
    pub chunks: u64,
}

#[derive(Debug, Default)]
struct Progress {
    read: u64,
    excluded: u64,
    written: u64,
    chunks: u64,
}

/// Execute one export run with the standard dual sink: the durable store
/// first, then the delimited file at `output_path`. The file is
/// created/truncated at the start of the run.
pub fn run(store: &CustomerStore, output_path: &Path, chunk_size: usize) -> Result<RunSummary> {
    let run_id = store.begin_run()?;
    let mut progress = Progress::default();

    let result = CsvFileSink::create(output_path)
        .context(format!("Failed to create output file {}", output_path.display()))
        .and_then(|csv| {
            let mut writer = DualSink::new(StoreSink::new(store), csv);
            drive(store, &mut writer, chunk_size, &mut progress)
        });

    conclude(store, run_id, progress, result)
}

/// Execute one export run against a caller-supplied writer. The seam the
/// tests use to observe batch boundaries and force sink failures.
pub fn run_with_writer<W: Sink>(store: &CustomerStore, writer: &mut W, chunk_size: usize) -> Result<RunSummary> {
    let run_id = store.begin_run()?;
    let mut progress = Progress::default();
    let result = drive(store, writer, chunk_size, &mut progress);
    conclude(store, run_id, progress, result)
}

fn drive<W: Sink>(
    store: &CustomerStore,
    writer: &mut W,
    chunk_size: usize,
    progress: &mut Progress,
) -> Result<()> {
    let conn = store.read_connection().context("Failed to open source reader")?;
    let mut stmt = conn.prepare(SELECT_CUSTOMERS).context("Failed to prepare source query")?;
    let mut cursor = CustomerCursor::new(stmt.query([]).context("Failed to execute source query")?);
    let transformer = Transformer::new(store);

    loop {
        let chunk = cursor.next_chunk(chunk_size).context("Failed to read source chunk")?;
        if chunk.is_empty() {
            break;
        }
        progress.read += chunk.len() as u64;

        let mut accepted = Vec::with_capacity(chunk.len());
        for customer in &chunk {
            match transformer.process(customer)? {
                Some(record) => accepted.push(record),
                None => progress.excluded += 1,
            }
        }

        if !accepted.is_empty() {
            writer.write(&accepted).context("Failed to write chunk to sinks")?;
            progress.written += accepted.len() as u64;
        }
        progress.chunks += 1;
        debug!(chunk = progress.chunks, read = chunk.len(), accepted = accepted.len(), "Processed chunk");
    }

    writer.finish().context("Failed to finalize sinks")?;
    Ok(())
}

fn conclude(store: &CustomerStore, run_id: i64, progress: Progress, result: Result<()>) -> Result<RunSummary> {
    match result {
        Ok(()) => {
            store.finish_run(run_id, RunStatus::Complete, progress.read, progress.written, None)?;
            info!(
                run_id,
                read = progress.read,
                excluded = progress.excluded,
                written = progress.written,
                "Run complete"
            );
            Ok(RunSummary {
                run_id,
                read: progress.read,
                excluded: progress.excluded,
                written: progress.written,
                chunks: progress.chunks,
            })
        }
        Err(err) => {
            // the original failure is the one to surface
            let message = format!("{err:#}");
            if let Err(finish_err) =
                store.finish_run(run_id, RunStatus::Failed, progress.read, progress.written, Some(message.as_str()))
            {
                warn!(run_id, error = %finish_err, "Failed to record run failure");
            }
            Err(err.wrap_err(format!("Job run {} failed", run_id)))
        }
    }
}
