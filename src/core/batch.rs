use std::mem;

use super::handler::Record;

/// Ordered buffer of records collected for set-wise dispatch.
pub struct Batch {
    records: Vec<Record>,
    set_size: usize,
}

impl Batch {
    pub fn new(set_size: usize) -> Batch {
        Batch {
            records: Vec::new(),
            set_size,
        }
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    /// A batch is dispatched when the line counter reaches a multiple of the
    /// set size, or at end of stream while records are pending.
    pub fn is_due(&self, line_position: usize, end_of_stream: bool) -> bool {
        if self.records.is_empty() || self.set_size == 0 {
            return false;
        }
        line_position % self.set_size == 0 || end_of_stream
    }

    pub fn get_records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands the pending records over and leaves the batch empty.
    pub fn take(&mut self) -> Vec<Record> {
        mem::take(&mut self.records)
    }
}
