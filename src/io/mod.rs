//! I/O handling for the two input CSV files
//!
//! - [`reader`] - file-level reading with size/row limits
//! - [`schema`] - structural validation of raw rows into typed records
//!
//! Schema concerns are kept out of the reader so the validation functions
//! stay pure and testable without touching the filesystem.

pub mod reader;
pub mod schema;

pub use reader::read_rows;
pub use schema::{
    parse_header_rows, parse_item_rows, RawHeaderRow, RawItemRow, SchemaFinding, HEADER_COLUMNS,
    ITEM_COLUMNS,
};
