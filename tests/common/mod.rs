#![allow(dead_code)]

#[cfg(feature = "async")]
pub mod async_handlers;
pub mod handlers;
pub mod mocks;

pub use handlers::{FailingRecordHandler, SetRecorder};
pub use mocks::MockFile;
