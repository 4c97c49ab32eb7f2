//! Report records and their persistence
//!
//! A [`Report`] is one requested analysis run. It is created `pending` at
//! submission and then only moved forward by the pipeline through
//! [`ReportStore::update_status`].

mod file;
mod memory;
mod model;
mod store;

pub use file::FileReportStore;
pub use memory::MemoryReportStore;
pub use model::{Report, ReportId, ReportResult, ReportStatus, ReportSummary, StatusUpdate};
pub use store::{ReportStore, StoreError};
