mod export;
mod rows;
mod summary;
pub mod views;

pub use export::write_csv;
pub use views::{ApplicationReport, CandidateFeedbackView, ReportRow, ReportSummary};

pub(crate) use rows::build_row;
