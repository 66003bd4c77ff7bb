//! Record sinks and the fixed dual fan-out
//!
//! Accepted records go to two destinations per batch: the durable store
//! first, then the delimited file. The fan-out is an explicit pair, not a
//! delegate list; the ordering and failure contract live in [`DualSink`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use custstore::{CustomerStore, NewCustomer};
use thiserror::Error;
use tracing::debug;

use crate::CSV_HEADER;

/// A sink write failure, classified by destination
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("durable store write failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("output file write failed: {0}")]
    File(#[from] std::io::Error),
}

/// A destination for batches of accepted records
pub trait Sink {
    /// Write one batch. The batch is either fully delivered or the call
    /// fails.
    fn write(&mut self, batch: &[NewCustomer]) -> Result<(), SinkError>;

    /// Called once after the source is exhausted, before the run is
    /// reported successful.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Durable-store sink. Each record is persisted as a new row; no
/// update-by-key dedup is performed.
pub struct StoreSink<'a> {
    store: &'a CustomerStore,
}

impl<'a> StoreSink<'a> {
    pub fn new(store: &'a CustomerStore) -> Self {
        Self { store }
    }
}

impl Sink for StoreSink<'_> {
    fn write(&mut self, batch: &[NewCustomer]) -> Result<(), SinkError> {
        self.store.insert_new_customers(batch)?;
        Ok(())
    }
}

/// Flat-file sink. The file is created/truncated when the sink is built
/// and holds the header line plus one delimited line per record.
#[derive(Debug)]
pub struct CsvFileSink {
    writer: BufWriter<File>,
}

impl CsvFileSink {
    /// Create or truncate the output file and write the header line
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", CSV_HEADER)?;
        writer.flush()?;
        debug!(path = %path.display(), "Created output file");
        Ok(Self { writer })
    }
}

/// The five fields in header order, joined with a single comma. Values are
/// written verbatim; embedded delimiters are not quoted or escaped.
fn delimited_line(record: &NewCustomer) -> String {
    format!(
        "{},{},{},{},{}",
        record.full_name, record.birthday, record.nation, record.phone_number, record.email
    )
}

impl Sink for CsvFileSink {
    fn write(&mut self, batch: &[NewCustomer]) -> Result<(), SinkError> {
        for record in batch {
            writeln!(self.writer, "{}", delimited_line(record))?;
        }
        // flushed per batch so the file never holds a partial chunk
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes each batch to two delegates in a fixed order: the first sink
/// receives the full batch before the second is invoked. If the first
/// fails, the second is not called for that batch; if the second fails,
/// whatever the first committed for the batch remains in place.
pub struct DualSink<A: Sink, B: Sink> {
    first: A,
    second: B,
}

impl<A: Sink, B: Sink> DualSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Sink, B: Sink> Sink for DualSink<A, B> {
    fn write(&mut self, batch: &[NewCustomer]) -> Result<(), SinkError> {
        self.first.write(batch)?;
        self.second.write(batch)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.first.finish()?;
        self.second.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn record(full_name: &str) -> NewCustomer {
        NewCustomer {
            full_name: full_name.to_string(),
            birthday: NaiveDate::from_ymd_opt(1985, 5, 5).unwrap(),
            nation: "US".to_string(),
            phone_number: "222".to_string(),
            email: "bo@x.com".to_string(),
        }
    }

    /// Test double that logs its calls to a shared journal and can be
    /// armed to fail on its nth write.
    struct RecordingSink {
        label: &'static str,
        journal: Rc<RefCell<Vec<String>>>,
        fail_on_write: Option<usize>,
        writes: usize,
    }

    impl RecordingSink {
        fn new(label: &'static str, journal: Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                label,
                journal,
                fail_on_write: None,
                writes: 0,
            }
        }

        fn failing_on(label: &'static str, journal: Rc<RefCell<Vec<String>>>, call: usize) -> Self {
            Self {
                fail_on_write: Some(call),
                ..Self::new(label, journal)
            }
        }
    }

    impl Sink for RecordingSink {
        fn write(&mut self, batch: &[NewCustomer]) -> Result<(), SinkError> {
            self.writes += 1;
            if self.fail_on_write == Some(self.writes) {
                return Err(SinkError::File(std::io::Error::other("forced failure")));
            }
            self.journal.borrow_mut().push(format!("{}:{}", self.label, batch.len()));
            Ok(())
        }
    }

    #[test]
    fn test_csv_sink_writes_header_and_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");

        let mut sink = CsvFileSink::create(&path).unwrap();
        sink.write(&[record("Bo Kim"), record("Ann Lee")]).unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "FullName,Birthday,Nation,PhoneNumber,Email\n\
             Bo Kim,1985-05-05,US,222,bo@x.com\n\
             Ann Lee,1985-05-05,US,222,bo@x.com\n"
        );
    }

    #[test]
    fn test_csv_sink_truncates_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        std::fs::write(&path, "stale content from a previous run\n").unwrap();

        let mut sink = CsvFileSink::create(&path).unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "FullName,Birthday,Nation,PhoneNumber,Email\n");
    }

    #[test]
    fn test_csv_sink_does_not_quote_embedded_delimiters() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");

        let mut sink = CsvFileSink::create(&path).unwrap();
        sink.write(&[record("Kim, Bo")]).unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let line = content.lines().nth(1).unwrap();
        assert_eq!(line, "Kim, Bo,1985-05-05,US,222,bo@x.com");
    }

    #[test]
    fn test_csv_sink_create_fails_on_bad_path() {
        let temp = TempDir::new().unwrap();
        // the tempdir itself is not a writable file target
        let err = CsvFileSink::create(temp.path()).unwrap_err();
        assert!(matches!(err, SinkError::File(_)));
    }

    #[test]
    fn test_dual_sink_writes_first_then_second() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut dual = DualSink::new(
            RecordingSink::new("store", journal.clone()),
            RecordingSink::new("file", journal.clone()),
        );

        dual.write(&[record("A"), record("B")]).unwrap();
        dual.write(&[record("C")]).unwrap();

        assert_eq!(*journal.borrow(), vec!["store:2", "file:2", "store:1", "file:1"]);
    }

    #[test]
    fn test_dual_sink_skips_second_when_first_fails() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut dual = DualSink::new(
            RecordingSink::failing_on("store", journal.clone(), 1),
            RecordingSink::new("file", journal.clone()),
        );

        assert!(dual.write(&[record("A")]).is_err());
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn test_dual_sink_keeps_first_write_when_second_fails() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let mut dual = DualSink::new(
            RecordingSink::new("store", journal.clone()),
            RecordingSink::failing_on("file", journal.clone(), 1),
        );

        assert!(dual.write(&[record("A")]).is_err());
        assert_eq!(*journal.borrow(), vec!["store:1"]);
    }

    #[test]
    fn test_store_sink_creates_rows() {
        let temp = TempDir::new().unwrap();
        let store = CustomerStore::open(temp.path().join("test.db")).unwrap();
        let mut sink = StoreSink::new(&store);

        sink.write(&[record("A"), record("B")]).unwrap();
        assert_eq!(store.new_customer_count().unwrap(), 2);
    }

    proptest! {
        #[test]
        fn prop_line_joins_fields_verbatim(
            full_name in "[a-zA-Z ]{0,16}",
            nation in "[A-Z]{2}",
            phone in "[0-9]{0,8}",
            email in "[a-z]{1,8}@[a-z]{1,8}",
        ) {
            let line = delimited_line(&NewCustomer {
                full_name: full_name.clone(),
                birthday: NaiveDate::from_ymd_opt(1985, 5, 5).unwrap(),
                nation: nation.clone(),
                phone_number: phone.clone(),
                email: email.clone(),
            });
            prop_assert_eq!(
                line,
                format!("{},1985-05-05,{},{},{}", full_name, nation, phone, email)
            );
        }
    }
}
