//! Hand-written handler doubles recording what the processor hands them.
use anyhow::anyhow;

use csv_batch_rs::core::handler::{
    CsvHandler, HandlerResult, Record, RecordHandler, RecordOutcome, SetHandler, SetOutcome,
};

/// Record handler failing (business failure) or throwing (handler error) on
/// chosen record numbers.
#[derive(Default)]
pub struct FailingRecordHandler {
    pub fail_on: Vec<usize>,
    pub throw_on: Vec<usize>,
    pub document_name: Option<String>,
    pub headers: Option<Vec<String>>,
    pub seen: Vec<(usize, Vec<String>)>,
    pub began: usize,
    pub ended: usize,
}

impl FailingRecordHandler {
    pub fn failing_on(record_number: usize) -> Self {
        FailingRecordHandler {
            fail_on: vec![record_number],
            ..Default::default()
        }
    }

    pub fn throwing_on(record_number: usize) -> Self {
        FailingRecordHandler {
            throw_on: vec![record_number],
            ..Default::default()
        }
    }

    pub fn record_numbers(&self) -> Vec<usize> {
        self.seen.iter().map(|(number, _)| *number).collect()
    }
}

impl CsvHandler for FailingRecordHandler {
    fn begin_processing(&mut self, document_name: &str, headers: Option<&[String]>) {
        self.began += 1;
        self.document_name = Some(document_name.to_string());
        self.headers = headers.map(<[String]>::to_vec);
    }

    fn end_processing(&mut self) {
        self.ended += 1;
    }

    fn handle_record_error(&mut self, error: &anyhow::Error) -> String {
        format!("handled {}", error)
    }
}

impl RecordHandler for FailingRecordHandler {
    fn process_record(
        &mut self,
        record_number: usize,
        fields: &[String],
    ) -> HandlerResult<RecordOutcome> {
        self.seen.push((record_number, fields.to_vec()));
        if self.throw_on.contains(&record_number) {
            return Err(anyhow!("boom at {}", record_number));
        }
        if self.fail_on.contains(&record_number) {
            return Ok(RecordOutcome::failure(format!("rejected {}", fields.join("|"))));
        }
        Ok(RecordOutcome::success())
    }
}

/// Set handler keeping every set it receives.
#[derive(Default)]
pub struct SetRecorder {
    pub sets: Vec<Vec<Record>>,
    pub reject_sets: bool,
    pub throw: bool,
    pub ended: bool,
}

impl SetRecorder {
    pub fn set_sizes(&self) -> Vec<usize> {
        self.sets.iter().map(Vec::len).collect()
    }
}

impl CsvHandler for SetRecorder {
    fn begin_processing(&mut self, _document_name: &str, _headers: Option<&[String]>) {}

    fn end_processing(&mut self) {
        self.ended = true;
    }
}

impl SetHandler for SetRecorder {
    fn process_record_set(&mut self, records: &[Record]) -> HandlerResult<SetOutcome> {
        self.sets.push(records.to_vec());
        if self.throw {
            return Err(anyhow!("set of {} refused", records.len()));
        }
        if self.reject_sets {
            return Ok(SetOutcome::failure(
                records.iter().map(|record| format!("bad {}", record.join("|"))),
            ));
        }
        Ok(SetOutcome::success())
    }
}
