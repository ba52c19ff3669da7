/// One parsed line: the ordered field values.
pub type Record = Vec<String>;

/// Result of a handler callback. An `Err` is a handler failure that the
/// processor either logs or propagates, depending on its [`ErrorPolicy`](super::processor::ErrorPolicy).
pub type HandlerResult<T> = Result<T, anyhow::Error>;

/// Base capability of every handler: document lifecycle and error rendering.
pub trait CsvHandler {
    /// Called once per document, before the first record, with the header
    /// row when the format declares one.
    fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>);

    /// Called once per document after the last record.
    fn end_processing(&mut self);

    /// Turns a failure raised by a record or set callback into the message
    /// written to the output log.
    fn handle_record_error(&mut self, error: &anyhow::Error) -> String {
        error.to_string()
    }
}

/// Handlers receiving one call per record.
pub trait RecordHandler: CsvHandler {
    /// `record_number` is the reader's line position after reading the
    /// record, header line included.
    fn process_record(&mut self, record_number: usize, fields: &[String])
    -> HandlerResult<RecordOutcome>;
}

/// Handlers receiving one call per fixed-size set of consecutive records.
pub trait SetHandler: CsvHandler {
    fn process_record_set(&mut self, records: &[Record]) -> HandlerResult<SetOutcome>;
}

/// Business outcome of a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl RecordOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Business outcome of a set of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub success: bool,
    pub messages: Vec<String>,
}

impl SetOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
        }
    }

    pub fn failure<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            success: false,
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// The dispatch granularity of a processor, fixed when it is built.
pub enum HandlerKind<'h> {
    /// Only lifecycle calls; records are read and counted.
    Basic(&'h mut dyn CsvHandler),
    /// One call per record.
    RecordWise(&'h mut dyn RecordHandler),
    /// One call per set of records.
    SetWise(&'h mut dyn SetHandler),
}

impl HandlerKind<'_> {
    pub(crate) fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>) {
        match self {
            HandlerKind::Basic(handler) => handler.begin_processing(document_name, headers),
            HandlerKind::RecordWise(handler) => handler.begin_processing(document_name, headers),
            HandlerKind::SetWise(handler) => handler.begin_processing(document_name, headers),
        }
    }

    pub(crate) fn end_processing(&mut self) {
        match self {
            HandlerKind::Basic(handler) => handler.end_processing(),
            HandlerKind::RecordWise(handler) => handler.end_processing(),
            HandlerKind::SetWise(handler) => handler.end_processing(),
        }
    }

    pub(crate) fn handle_record_error(&mut self, error: &anyhow::Error) -> String {
        match self {
            HandlerKind::Basic(handler) => handler.handle_record_error(error),
            HandlerKind::RecordWise(handler) => handler.handle_record_error(error),
            HandlerKind::SetWise(handler) => handler.handle_record_error(error),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            HandlerKind::Basic(_) => "basic",
            HandlerKind::RecordWise(_) => "record-wise",
            HandlerKind::SetWise(_) => "set-wise",
        }
    }
}
