//! URL ingestion
//!
//! This module discovers work for the dispatcher:
//! - `SourceCursor`: batched reads of a source table that never revisit a row
//! - `PollLoop`: a fixed-interval timer driving one cursor
//! - `import_urls`: bulk URL lists from CSV or text files

mod cursor;
mod import;
mod poller;

pub use cursor::SourceCursor;
pub use import::{import_urls, try_import_urls, ImportError};
pub use poller::PollLoop;
