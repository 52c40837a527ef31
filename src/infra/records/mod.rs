//! Ownership record sources.

pub mod http;

pub use http::{HttpRecordSource, parse_record_list};
