//! File I/O for the credit-risk pipeline: dataset reading, profiling, chart
//! rendering, and JSON artifact writing.

mod chart;
mod error;
mod profile;
mod reader;
mod table;
mod writer;

pub use chart::{Bar, Chart, ReportSink, SvgReportSink, SwarmRow};
pub use error::IoError;
pub use profile::{ColumnProfile, DatasetProfile, TargetCandidate, profile, value_counts};
pub use reader::{DatasetReader, SpreadsheetEngine, SpreadsheetLayout};
pub use table::{Column, ColumnData, Table, format_number, normalize_name};
pub use writer::ResultWriter;
