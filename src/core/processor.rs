use std::{
    ffi::OsString,
    fs::File,
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    BatchError,
    item::csv::{csv_format::CsvFormat, csv_reader::CsvReader},
};

use super::{
    batch::Batch,
    handler::{CsvHandler, HandlerKind, RecordHandler, SetHandler},
};

/// The log sink is flushed every time the line counter crosses this many records.
pub(crate) const FLUSH_INTERVAL: usize = 100;

/// What happens when a handler callback fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Render the failure with `handle_record_error`, log it and go on with
    /// the next record.
    LogAndContinue,
    /// Stop the run and return the failure to the caller.
    PropagateAndAbort,
}

impl ErrorPolicy {
    /// Failures are only tolerated when there is a log sink to report them to.
    pub fn for_sink(has_sink: bool) -> Self {
        if has_sink {
            ErrorPolicy::LogAndContinue
        } else {
            ErrorPolicy::PropagateAndAbort
        }
    }
}

/// Result of a single dispatch step.
pub(crate) enum Outcome {
    /// Keep going; the lines are appended to the log sink.
    Continue(Vec<String>),
    /// Stop the run with this error.
    Abort(BatchError),
}

/// Rows processed by a run and the log it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorResult<T> {
    /// Number of lines the reader advanced through, header line included.
    pub rows_processed: usize,
    pub output: T,
}

/// Drives a whole document through a handler.
///
/// A processor reads the document record by record and dispatches to its
/// handler according to the [`HandlerKind`] it was built with. Business
/// failures returned by the handler are always logged and never stop the
/// run. Handler errors (`Err` results) follow the [`ErrorPolicy`]: by default
/// they are logged and skipped when an output log is given, and abort the
/// run otherwise.
///
/// # Examples
///
/// ```
/// use csv_batch_rs::core::handler::{CsvHandler, HandlerResult, RecordHandler, RecordOutcome};
/// use csv_batch_rs::core::processor::CsvProcessor;
/// use csv_batch_rs::item::csv::csv_format::CsvFormatBuilder;
///
/// #[derive(Default)]
/// struct Counter { records: usize }
///
/// impl CsvHandler for Counter {
///     fn begin_processing(&mut self, _name: &str, _headers: Option<&[String]>) {}
///     fn end_processing(&mut self) {}
/// }
///
/// impl RecordHandler for Counter {
///     fn process_record(&mut self, _number: usize, fields: &[String]) -> HandlerResult<RecordOutcome> {
///         self.records += 1;
///         if fields.len() == 2 {
///             Ok(RecordOutcome::success())
///         } else {
///             Ok(RecordOutcome::failure("Unexpected field count"))
///         }
///     }
/// }
///
/// let format = CsvFormatBuilder::new().line_separator("\n").build().unwrap();
/// let mut counter = Counter::default();
///
/// let result = CsvProcessor::record_wise(&mut counter)
///     .process_csv("people", "a;b\nc\nd;e", &format, 0, 0)
///     .unwrap();
///
/// assert_eq!(result.rows_processed, 3);
/// assert!(result.output.starts_with("2: Unexpected field count."));
/// assert_eq!(counter.records, 3);
/// ```
pub struct CsvProcessor<'h> {
    handler: HandlerKind<'h>,
    error_policy: Option<ErrorPolicy>,
}

impl<'h> CsvProcessor<'h> {
    pub fn new(handler: HandlerKind<'h>) -> Self {
        Self {
            handler,
            error_policy: None,
        }
    }

    /// A processor that only notifies the handler of the document lifecycle.
    pub fn basic(handler: &'h mut dyn CsvHandler) -> Self {
        Self::new(HandlerKind::Basic(handler))
    }

    /// A processor dispatching one record at a time.
    pub fn record_wise(handler: &'h mut dyn RecordHandler) -> Self {
        Self::new(HandlerKind::RecordWise(handler))
    }

    /// A processor dispatching sets of records; requires a set size on each run.
    pub fn set_wise(handler: &'h mut dyn SetHandler) -> Self {
        Self::new(HandlerKind::SetWise(handler))
    }

    /// Overrides the policy otherwise derived from the presence of a log sink.
    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = Some(error_policy);
        self
    }

    /// Processes a document read from `input`.
    ///
    /// * `output`: optional log sink receiving per-record messages and a summary line.
    /// * `set_size`: size of the record sets; must be zero unless the processor is set-wise.
    /// * `start_at_record`: lines are skipped until the line counter reaches this value.
    ///
    /// Returns the number of lines the reader advanced through.
    pub fn process_stream<R: Read>(
        &mut self,
        document_name: &str,
        input: R,
        output: Option<&mut dyn Write>,
        format: &CsvFormat,
        set_size: usize,
        start_at_record: usize,
    ) -> Result<usize, BatchError> {
        self.validate(set_size)?;

        let run_id = Uuid::new_v4();
        let start = Instant::now();
        info!(
            "Start of document: {}, id: {}, handler: {}",
            document_name,
            run_id,
            self.handler.name()
        );

        let (mut reader, info) = CsvReader::open(input, format)?;
        self.handler
            .begin_processing(document_name, info.headers.as_deref());

        let mut sink = output.map(BufWriter::new);
        let policy = self
            .error_policy
            .unwrap_or_else(|| ErrorPolicy::for_sink(sink.is_some()));

        let mut batch = Batch::new(set_size);
        let result = self
            .skip_to(&mut reader, start_at_record)
            .and_then(|()| self.dispatch_all(&mut reader, &mut batch, &mut sink, policy));

        if let Err(error) = result {
            match (&mut sink, error) {
                (Some(sink), error) if !matches!(error, BatchError::Handler { .. }) => {
                    error!("Error at line {}: {}", reader.line_position(), error);
                    writeln!(sink, "{}: Error: {}", reader.line_position(), error)?;
                }
                (sink, error) => {
                    error!("Abort of document: {}, id: {}: {}", document_name, run_id, error);
                    if let Some(sink) = sink {
                        // the run is failing already; a flush error would hide the cause
                        let _ = sink.flush();
                    }
                    return Err(error);
                }
            }
        }

        self.handler.end_processing();

        let rows_processed = reader.line_position();
        let elapsed = start.elapsed().as_secs_f64();
        if let Some(sink) = sink.as_mut() {
            writeln!(
                sink,
                "Finished processing {}, did {} records in {:.3} seconds.",
                document_name, rows_processed, elapsed
            )?;
            sink.flush()?;
        }

        info!(
            "End of document: {}, id: {}, {} records in {:.3}s",
            document_name, run_id, rows_processed, elapsed
        );

        Ok(rows_processed)
    }

    /// Processes an in-memory document and captures its log.
    pub fn process_csv(
        &mut self,
        document_name: &str,
        content: &str,
        format: &CsvFormat,
        set_size: usize,
        start_at_record: usize,
    ) -> Result<ProcessorResult<String>, BatchError> {
        let mut output: Vec<u8> = Vec::new();

        let rows_processed = self.process_stream(
            document_name,
            content.as_bytes(),
            Some(&mut output as &mut dyn Write),
            format,
            set_size,
            start_at_record,
        )?;

        Ok(ProcessorResult {
            rows_processed,
            output: String::from_utf8_lossy(&output).into_owned(),
        })
    }

    /// Processes a file and logs to `<path>-output.txt`, created or truncated.
    /// The document name is the file stem.
    pub fn process_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: &CsvFormat,
        set_size: usize,
        start_at_record: usize,
    ) -> Result<usize, BatchError> {
        let path = path.as_ref();
        let input = File::open(path)?;
        let mut output = File::create(output_path(path))?;

        let document_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.process_stream(
            &document_name,
            input,
            Some(&mut output as &mut dyn Write),
            format,
            set_size,
            start_at_record,
        )
    }

    fn validate(&self, set_size: usize) -> Result<(), BatchError> {
        match (&self.handler, set_size) {
            (HandlerKind::SetWise(_), 0) => Err(BatchError::IncompatibleHandler(
                "set-wise processing requires a set size greater than zero".to_string(),
            )),
            (HandlerKind::SetWise(_), _) | (_, 0) => Ok(()),
            (handler, _) => Err(BatchError::IncompatibleHandler(format!(
                "set processing cannot be used with a {} handler",
                handler.name()
            ))),
        }
    }

    fn skip_to<R: Read>(
        &mut self,
        reader: &mut CsvReader<R>,
        start_at_record: usize,
    ) -> Result<(), BatchError> {
        while reader.line_position() < start_at_record && !reader.is_end_of_stream()? {
            reader.read_line()?;
        }
        if start_at_record > 0 {
            debug!("Skipped to line {}", reader.line_position());
        }
        Ok(())
    }

    fn dispatch_all<R: Read>(
        &mut self,
        reader: &mut CsvReader<R>,
        batch: &mut Batch,
        sink: &mut Option<BufWriter<&mut dyn Write>>,
        policy: ErrorPolicy,
    ) -> Result<(), BatchError> {
        while !reader.is_end_of_stream()? {
            match self.dispatch(reader, batch, policy)? {
                Outcome::Continue(messages) => {
                    for message in messages {
                        warn!("{}", message);
                        if let Some(sink) = sink.as_mut() {
                            writeln!(sink, "{}", message)?;
                        }
                    }
                }
                Outcome::Abort(error) => return Err(error),
            }

            if reader.line_position() % FLUSH_INTERVAL == 0 {
                if let Some(sink) = sink.as_mut() {
                    sink.flush()?;
                }
            }
        }
        Ok(())
    }

    /// Reads the next record and hands it (or the completed set) to the handler.
    fn dispatch<R: Read>(
        &mut self,
        reader: &mut CsvReader<R>,
        batch: &mut Batch,
        policy: ErrorPolicy,
    ) -> Result<Outcome, BatchError> {
        let stopwatch = Instant::now();

        let result = match &mut self.handler {
            HandlerKind::Basic(_) => {
                reader.read_line()?;
                Ok(Vec::new())
            }
            HandlerKind::RecordWise(handler) => {
                let fields = reader.read_line()?;
                let line = reader.line_position();
                handler.process_record(line, &fields).map(|outcome| {
                    if outcome.success {
                        Vec::new()
                    } else {
                        vec![format!(
                            "{}: {}. {:.3}s",
                            line,
                            outcome.message.unwrap_or_default(),
                            stopwatch.elapsed().as_secs_f64()
                        )]
                    }
                })
            }
            HandlerKind::SetWise(handler) => {
                batch.add_record(reader.read_line()?);
                let line = reader.line_position();
                if batch.is_due(line, reader.is_end_of_stream()?) {
                    let records = batch.take();
                    debug!("Dispatching set of {} records at line {}", records.len(), line);
                    handler.process_record_set(&records).map(|outcome| {
                        if outcome.success {
                            Vec::new()
                        } else {
                            let elapsed = stopwatch.elapsed().as_secs_f64();
                            outcome
                                .messages
                                .iter()
                                .map(|message| format!("{}: {}. {:.3}s", line, message, elapsed))
                                .collect()
                        }
                    })
                } else {
                    Ok(Vec::new())
                }
            }
        };

        Ok(match result {
            Ok(messages) => Outcome::Continue(messages),
            Err(source) => {
                let line = reader.line_position();
                match policy {
                    ErrorPolicy::LogAndContinue => {
                        let message = self.handler.handle_record_error(&source);
                        Outcome::Continue(vec![format!("{}: Error: {}", line, message)])
                    }
                    ErrorPolicy::PropagateAndAbort => {
                        Outcome::Abort(BatchError::Handler { line, source })
                    }
                }
            }
        })
    }
}

pub(crate) fn output_path(path: &Path) -> PathBuf {
    let mut output: OsString = path.as_os_str().to_owned();
    output.push("-output.txt");
    PathBuf::from(output)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::bail;

    use crate::{
        BatchError,
        core::handler::{CsvHandler, HandlerResult, Record, SetHandler, SetOutcome},
        item::csv::csv_format::{CsvFormat, CsvFormatBuilder},
    };

    use super::{CsvProcessor, ErrorPolicy, output_path};

    #[derive(Default)]
    struct Sets {
        sets: Vec<Vec<Record>>,
        fail: bool,
    }

    impl CsvHandler for Sets {
        fn begin_processing(&mut self, _document_name: &str, _headers: Option<&[String]>) {}
        fn end_processing(&mut self) {}
    }

    impl SetHandler for Sets {
        fn process_record_set(&mut self, records: &[Record]) -> HandlerResult<SetOutcome> {
            self.sets.push(records.to_vec());
            if self.fail {
                bail!("This set throws an exception");
            }
            Ok(SetOutcome::success())
        }
    }

    fn lf_format() -> CsvFormat {
        CsvFormatBuilder::new().line_separator("\n").build().unwrap()
    }

    #[test]
    fn error_policy_follows_sink_presence() {
        assert_eq!(ErrorPolicy::for_sink(true), ErrorPolicy::LogAndContinue);
        assert_eq!(ErrorPolicy::for_sink(false), ErrorPolicy::PropagateAndAbort);
    }

    #[test]
    fn output_path_appends_suffix() {
        assert_eq!(
            output_path(Path::new("/data/in.csv")),
            Path::new("/data/in.csv-output.txt")
        );
    }

    #[test]
    fn set_wise_requires_a_set_size() {
        let mut handler = Sets::default();

        let result = CsvProcessor::set_wise(&mut handler).process_csv("doc", "a", &lf_format(), 0, 0);

        assert!(matches!(result, Err(BatchError::IncompatibleHandler(_))));
        assert!(handler.sets.is_empty());
    }

    #[test]
    fn set_wise_flushes_remaining_records_at_end_of_stream() {
        let mut handler = Sets::default();

        let result = CsvProcessor::set_wise(&mut handler)
            .process_csv("doc", "1\n2\n3", &lf_format(), 2, 0)
            .unwrap();

        assert_eq!(result.rows_processed, 3);
        assert_eq!(handler.sets.len(), 2);
        assert_eq!(handler.sets[0].len(), 2);
        assert_eq!(handler.sets[1], vec![vec!["3"]]);
    }

    #[test]
    fn failing_set_is_cleared_and_logged_once() {
        let mut handler = Sets {
            fail: true,
            ..Sets::default()
        };

        let result = CsvProcessor::set_wise(&mut handler)
            .process_csv("doc", "1\n2\n3\n4", &lf_format(), 2, 0)
            .unwrap();

        assert_eq!(handler.sets.len(), 2);
        assert_eq!(handler.sets[1], vec![vec!["3"], vec!["4"]]);
        let errors: Vec<&str> = result
            .output
            .lines()
            .filter(|line| line.contains("Error"))
            .collect();
        assert_eq!(
            errors,
            vec![
                "2: Error: This set throws an exception",
                "4: Error: This set throws an exception"
            ]
        );
    }

    #[test]
    fn explicit_policy_aborts_even_with_a_sink() {
        let mut handler = Sets {
            fail: true,
            ..Sets::default()
        };

        let result = CsvProcessor::set_wise(&mut handler)
            .with_error_policy(ErrorPolicy::PropagateAndAbort)
            .process_csv("doc", "1\n2\n3\n4", &lf_format(), 2, 0);

        assert!(matches!(result, Err(BatchError::Handler { line: 2, .. })));
        assert_eq!(handler.sets.len(), 1);
    }
}
