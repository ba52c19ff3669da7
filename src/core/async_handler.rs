use async_trait::async_trait;

use super::handler::{HandlerResult, Record, RecordOutcome, SetOutcome};

/// Base capability of every async handler: document lifecycle and error rendering.
///
/// The async counterpart of [`CsvHandler`](super::handler::CsvHandler).
#[async_trait]
pub trait AsyncCsvHandler: Send {
    async fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>);

    async fn end_processing(&mut self);

    /// Turns a failure raised by a record or set callback into the message
    /// written to the output log.
    fn handle_record_error(&mut self, error: &anyhow::Error) -> String {
        error.to_string()
    }
}

/// Async handlers receiving one call per record.
#[async_trait]
pub trait AsyncRecordHandler: AsyncCsvHandler {
    /// `record_number` is the reader's line position after reading the
    /// record, header line included.
    async fn process_record(
        &mut self,
        record_number: usize,
        fields: &[String],
    ) -> HandlerResult<RecordOutcome>;
}

/// Async handlers receiving one call per set of consecutive records.
#[async_trait]
pub trait AsyncSetHandler: AsyncCsvHandler {
    async fn process_record_set(&mut self, records: &[Record]) -> HandlerResult<SetOutcome>;
}

/// The dispatch granularity of an async processor.
pub enum AsyncHandlerKind<'h> {
    Basic(&'h mut dyn AsyncCsvHandler),
    RecordWise(&'h mut dyn AsyncRecordHandler),
    SetWise(&'h mut dyn AsyncSetHandler),
}

impl AsyncHandlerKind<'_> {
    pub(crate) async fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>) {
        match self {
            AsyncHandlerKind::Basic(handler) => handler.begin_processing(document_name, headers).await,
            AsyncHandlerKind::RecordWise(handler) => {
                handler.begin_processing(document_name, headers).await
            }
            AsyncHandlerKind::SetWise(handler) => handler.begin_processing(document_name, headers).await,
        }
    }

    pub(crate) async fn end_processing(&mut self) {
        match self {
            AsyncHandlerKind::Basic(handler) => handler.end_processing().await,
            AsyncHandlerKind::RecordWise(handler) => handler.end_processing().await,
            AsyncHandlerKind::SetWise(handler) => handler.end_processing().await,
        }
    }

    pub(crate) fn handle_record_error(&mut self, error: &anyhow::Error) -> String {
        match self {
            AsyncHandlerKind::Basic(handler) => handler.handle_record_error(error),
            AsyncHandlerKind::RecordWise(handler) => handler.handle_record_error(error),
            AsyncHandlerKind::SetWise(handler) => handler.handle_record_error(error),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            AsyncHandlerKind::Basic(_) => "basic",
            AsyncHandlerKind::RecordWise(_) => "record-wise",
            AsyncHandlerKind::SetWise(_) => "set-wise",
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::{AsyncCsvHandler, AsyncHandlerKind};

    #[derive(Default)]
    struct Lifecycle {
        begun: Option<String>,
        ended: bool,
    }

    #[async_trait]
    impl AsyncCsvHandler for Lifecycle {
        async fn begin_processing(&mut self, document_name: &str, _headers: Option<&[String]>) {
            self.begun = Some(document_name.to_string());
        }

        async fn end_processing(&mut self) {
            self.ended = true;
        }
    }

    #[tokio::test]
    async fn handler_kind_forwards_lifecycle_calls() {
        let mut handler = Lifecycle::default();
        {
            let mut kind = AsyncHandlerKind::Basic(&mut handler);
            kind.begin_processing("doc", None).await;
            assert_eq!(kind.handle_record_error(&anyhow!("boom")), "boom");
            kind.end_processing().await;
            assert_eq!(kind.name(), "basic");
        }

        assert_eq!(handler.begun.as_deref(), Some("doc"));
        assert!(handler.ended);
    }
}
