use std::{io, path::Path, time::Instant};

use log::{debug, error, info, warn};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter},
};
use uuid::Uuid;

use crate::{
    BatchError,
    item::csv::{async_reader::AsyncCsvReader, csv_format::CsvFormat},
};

use super::{
    async_handler::{AsyncCsvHandler, AsyncHandlerKind, AsyncRecordHandler, AsyncSetHandler},
    batch::Batch,
    processor::{ErrorPolicy, FLUSH_INTERVAL, Outcome, ProcessorResult, output_path},
};

type Sink<'o> = Option<BufWriter<&'o mut (dyn AsyncWrite + Unpin + Send)>>;

async fn log_line(sink: &mut Sink<'_>, line: &str) -> io::Result<()> {
    if let Some(sink) = sink.as_mut() {
        sink.write_all(line.as_bytes()).await?;
        sink.write_all(b"\n").await?;
    }
    Ok(())
}

/// Asynchronous counterpart of [`CsvProcessor`](super::processor::CsvProcessor).
///
/// Dispatch, error policy, log lines and set boundaries are the same; the
/// document is read from a tokio stream and handlers are awaited.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use csv_batch_rs::core::async_handler::{AsyncCsvHandler, AsyncRecordHandler};
/// use csv_batch_rs::core::async_processor::AsyncCsvProcessor;
/// use csv_batch_rs::core::handler::{HandlerResult, RecordOutcome};
/// use csv_batch_rs::item::csv::csv_format::CsvFormatBuilder;
///
/// #[derive(Default)]
/// struct Counter { records: usize }
///
/// #[async_trait]
/// impl AsyncCsvHandler for Counter {
///     async fn begin_processing(&mut self, _name: &str, _headers: Option<&[String]>) {}
///     async fn end_processing(&mut self) {}
/// }
///
/// #[async_trait]
/// impl AsyncRecordHandler for Counter {
///     async fn process_record(&mut self, _number: usize, _fields: &[String]) -> HandlerResult<RecordOutcome> {
///         self.records += 1;
///         Ok(RecordOutcome::success())
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let format = CsvFormatBuilder::new().line_separator("\n").build().unwrap();
/// let mut counter = Counter::default();
///
/// let result = AsyncCsvProcessor::record_wise(&mut counter)
///     .process_csv("people", "a;b\nc;d", &format, 0, 0)
///     .await
///     .unwrap();
///
/// assert_eq!(result.rows_processed, 2);
/// assert_eq!(counter.records, 2);
/// # });
/// ```
pub struct AsyncCsvProcessor<'h> {
    handler: AsyncHandlerKind<'h>,
    error_policy: Option<ErrorPolicy>,
}

impl<'h> AsyncCsvProcessor<'h> {
    pub fn new(handler: AsyncHandlerKind<'h>) -> Self {
        Self {
            handler,
            error_policy: None,
        }
    }

    pub fn basic(handler: &'h mut dyn AsyncCsvHandler) -> Self {
        Self::new(AsyncHandlerKind::Basic(handler))
    }

    pub fn record_wise(handler: &'h mut dyn AsyncRecordHandler) -> Self {
        Self::new(AsyncHandlerKind::RecordWise(handler))
    }

    pub fn set_wise(handler: &'h mut dyn AsyncSetHandler) -> Self {
        Self::new(AsyncHandlerKind::SetWise(handler))
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = Some(error_policy);
        self
    }

    /// Processes a document read from `input`, returning the number of lines
    /// the reader advanced through.
    pub async fn process_stream<R: AsyncRead + Unpin>(
        &mut self,
        document_name: &str,
        input: R,
        output: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
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

        let (mut reader, info) = AsyncCsvReader::open(input, format).await?;
        self.handler
            .begin_processing(document_name, info.headers.as_deref())
            .await;

        let mut sink: Sink<'_> = output.map(BufWriter::new);
        let policy = self
            .error_policy
            .unwrap_or_else(|| ErrorPolicy::for_sink(sink.is_some()));

        let mut batch = Batch::new(set_size);
        let mut result = self.skip_to(&mut reader, start_at_record).await;
        if result.is_ok() {
            result = self
                .dispatch_all(&mut reader, &mut batch, &mut sink, policy)
                .await;
        }

        if let Err(error) = result {
            if sink.is_some() && !matches!(error, BatchError::Handler { .. }) {
                error!("Error at line {}: {}", reader.line_position(), error);
                let line = format!("{}: Error: {}", reader.line_position(), error);
                log_line(&mut sink, &line).await?;
            } else {
                error!("Abort of document: {}, id: {}: {}", document_name, run_id, error);
                if let Some(sink) = sink.as_mut() {
                    // the run is failing already; a flush error would hide the cause
                    let _ = sink.flush().await;
                }
                return Err(error);
            }
        }

        self.handler.end_processing().await;

        let rows_processed = reader.line_position();
        let elapsed = start.elapsed().as_secs_f64();
        let summary = format!(
            "Finished processing {}, did {} records in {:.3} seconds.",
            document_name, rows_processed, elapsed
        );
        log_line(&mut sink, &summary).await?;
        if let Some(sink) = sink.as_mut() {
            sink.flush().await?;
        }

        info!(
            "End of document: {}, id: {}, {} records in {:.3}s",
            document_name, run_id, rows_processed, elapsed
        );

        Ok(rows_processed)
    }

    /// Processes an in-memory document and captures its log.
    pub async fn process_csv(
        &mut self,
        document_name: &str,
        content: &str,
        format: &CsvFormat,
        set_size: usize,
        start_at_record: usize,
    ) -> Result<ProcessorResult<String>, BatchError> {
        let mut output: Vec<u8> = Vec::new();

        let rows_processed = self
            .process_stream(
                document_name,
                content.as_bytes(),
                Some(&mut output as &mut (dyn AsyncWrite + Unpin + Send)),
                format,
                set_size,
                start_at_record,
            )
            .await?;

        Ok(ProcessorResult {
            rows_processed,
            output: String::from_utf8_lossy(&output).into_owned(),
        })
    }

    /// Processes a file and logs to `<path>-output.txt`, created or truncated.
    /// The document name is the file stem.
    pub async fn process_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: &CsvFormat,
        set_size: usize,
        start_at_record: usize,
    ) -> Result<usize, BatchError> {
        let path = path.as_ref();
        let input = File::open(path).await?;
        let mut output = File::create(output_path(path)).await?;

        let document_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.process_stream(
            &document_name,
            input,
            Some(&mut output as &mut (dyn AsyncWrite + Unpin + Send)),
            format,
            set_size,
            start_at_record,
        )
        .await
    }

    fn validate(&self, set_size: usize) -> Result<(), BatchError> {
        match (&self.handler, set_size) {
            (AsyncHandlerKind::SetWise(_), 0) => Err(BatchError::IncompatibleHandler(
                "set-wise processing requires a set size greater than zero".to_string(),
            )),
            (AsyncHandlerKind::SetWise(_), _) | (_, 0) => Ok(()),
            (handler, _) => Err(BatchError::IncompatibleHandler(format!(
                "set processing cannot be used with a {} handler",
                handler.name()
            ))),
        }
    }

    async fn skip_to<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut AsyncCsvReader<R>,
        start_at_record: usize,
    ) -> Result<(), BatchError> {
        while reader.line_position() < start_at_record && !reader.is_end_of_stream().await? {
            reader.read_line().await?;
        }
        if start_at_record > 0 {
            debug!("Skipped to line {}", reader.line_position());
        }
        Ok(())
    }

    async fn dispatch_all<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut AsyncCsvReader<R>,
        batch: &mut Batch,
        sink: &mut Sink<'_>,
        policy: ErrorPolicy,
    ) -> Result<(), BatchError> {
        while !reader.is_end_of_stream().await? {
            match self.dispatch(reader, batch, policy).await? {
                Outcome::Continue(messages) => {
                    for message in messages {
                        warn!("{}", message);
                        log_line(sink, &message).await?;
                    }
                }
                Outcome::Abort(error) => return Err(error),
            }

            if reader.line_position() % FLUSH_INTERVAL == 0 {
                if let Some(sink) = sink.as_mut() {
                    sink.flush().await?;
                }
            }
        }
        Ok(())
    }

    async fn dispatch<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut AsyncCsvReader<R>,
        batch: &mut Batch,
        policy: ErrorPolicy,
    ) -> Result<Outcome, BatchError> {
        let stopwatch = Instant::now();

        let result = match &mut self.handler {
            AsyncHandlerKind::Basic(_) => {
                reader.read_line().await?;
                Ok(Vec::new())
            }
            AsyncHandlerKind::RecordWise(handler) => {
                let fields = reader.read_line().await?;
                let line = reader.line_position();
                handler.process_record(line, &fields).await.map(|outcome| {
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
            AsyncHandlerKind::SetWise(handler) => {
                batch.add_record(reader.read_line().await?);
                let line = reader.line_position();
                if batch.is_due(line, reader.is_end_of_stream().await?) {
                    let records = batch.take();
                    debug!("Dispatching set of {} records at line {}", records.len(), line);
                    handler.process_record_set(&records).await.map(|outcome| {
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
