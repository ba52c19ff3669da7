use log::info;

use crate::core::handler::{
    CsvHandler, HandlerResult, Record, RecordHandler, RecordOutcome, SetHandler, SetOutcome,
};

/// Handler logging every record it receives. It never fails, which makes it
/// handy for dry runs of a document.
#[derive(Default)]
pub struct LoggerHandler {
    records: usize,
}

impl LoggerHandler {
    /// Number of records seen since the last `begin_processing`.
    pub fn records(&self) -> usize {
        self.records
    }
}

impl CsvHandler for LoggerHandler {
    fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>) {
        self.records = 0;
        info!("Document:{} headers:{:?}", document_name, headers);
    }

    fn end_processing(&mut self) {
        info!("Records:{}", self.records);
    }
}

impl RecordHandler for LoggerHandler {
    fn process_record(
        &mut self,
        record_number: usize,
        fields: &[String],
    ) -> HandlerResult<RecordOutcome> {
        self.records += 1;
        info!("Record {}:{:?}", record_number, fields);
        Ok(RecordOutcome::success())
    }
}

impl SetHandler for LoggerHandler {
    fn process_record_set(&mut self, records: &[Record]) -> HandlerResult<SetOutcome> {
        records.iter().for_each(|record| info!("Record:{:?}", record));
        self.records += records.len();
        Ok(SetOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use crate::{core::processor::CsvProcessor, item::csv::csv_format::CsvFormatBuilder};

    use super::LoggerHandler;

    #[test]
    fn logger_handler_accepts_every_record() {
        let format = CsvFormatBuilder::new()
            .line_separator("\n")
            .has_headers(true)
            .build()
            .unwrap();
        let mut handler = LoggerHandler::default();

        let result = CsvProcessor::record_wise(&mut handler)
            .process_csv("log", "a;b\n1;2\n3;4", &format, 0, 0)
            .unwrap();

        assert_eq!(handler.records(), 2);
        assert_eq!(result.rows_processed, 3);
        assert_eq!(result.output.lines().count(), 1);
    }

    #[test]
    fn logger_handler_counts_sets() {
        let format = CsvFormatBuilder::new().line_separator("\n").build().unwrap();
        let mut handler = LoggerHandler::default();

        CsvProcessor::set_wise(&mut handler)
            .process_csv("log", "1\n2\n3", &format, 2, 0)
            .unwrap();

        assert_eq!(handler.records(), 3);
    }
}
