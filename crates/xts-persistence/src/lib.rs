//! Append-only CSV logs for OHLC batches and stream events.
//!
//! Batch files are written whole and atomically; stream logs only ever
//! grow. Writes to the same path are serialized process-wide.

pub mod error;
pub mod naming;
pub mod reader;
pub mod recorder;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use naming::{batch_file_name, sanitize_name, stream_file_name};
pub use reader::{read_batch, read_stream_log, StreamRecord};
pub use recorder::StreamRecorder;
pub use writer::{CsvLogWriter, BATCH_HEADER, STREAM_HEADER};
