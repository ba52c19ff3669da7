/// Buffer of records collected for set-wise dispatch.
pub mod batch;

/// Handler capabilities a processor dispatches records to.
pub mod handler;

/// Orchestration of a whole document through a handler.
pub mod processor;

#[cfg(feature = "async")]
/// Async handler capabilities, mirroring [`handler`].
pub mod async_handler;

#[cfg(feature = "async")]
/// Async orchestration of a document over tokio streams.
pub mod async_processor;
