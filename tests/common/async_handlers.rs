//! Async views of the handler doubles, delegating to their blocking callbacks.
use async_trait::async_trait;

use csv_batch_rs::core::{
    async_handler::{AsyncCsvHandler, AsyncRecordHandler, AsyncSetHandler},
    handler::{CsvHandler, HandlerResult, Record, RecordHandler, RecordOutcome, SetHandler, SetOutcome},
};

use super::{FailingRecordHandler, SetRecorder};

#[async_trait]
impl AsyncCsvHandler for FailingRecordHandler {
    async fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>) {
        CsvHandler::begin_processing(self, document_name, headers);
    }

    async fn end_processing(&mut self) {
        CsvHandler::end_processing(self);
    }

    fn handle_record_error(&mut self, error: &anyhow::Error) -> String {
        CsvHandler::handle_record_error(self, error)
    }
}

#[async_trait]
impl AsyncRecordHandler for FailingRecordHandler {
    async fn process_record(
        &mut self,
        record_number: usize,
        fields: &[String],
    ) -> HandlerResult<RecordOutcome> {
        tokio::task::yield_now().await;
        RecordHandler::process_record(self, record_number, fields)
    }
}

#[async_trait]
impl AsyncCsvHandler for SetRecorder {
    async fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>) {
        CsvHandler::begin_processing(self, document_name, headers);
    }

    async fn end_processing(&mut self) {
        CsvHandler::end_processing(self);
    }
}

#[async_trait]
impl AsyncSetHandler for SetRecorder {
    async fn process_record_set(&mut self, records: &[Record]) -> HandlerResult<SetOutcome> {
        SetHandler::process_record_set(self, records)
    }
}
