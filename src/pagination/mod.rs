//! Pagination module
//!
//! Supports: Cursor, Offset, Page Number, Next URL, and single-page reads
//!
//! # Overview
//!
//! Every Read parses one page. A [`Paginator`] turns the response into the
//! opaque `next_page` token the caller passes back on the following Read;
//! an empty token means the read is done. [`ReadParser`] combines record
//! location, pagination, field projection and client-side time filtering.

mod incremental;
mod records;
mod strategies;
mod types;

pub use incremental::{jql_window, relative_minutes, TimeWindow};
pub use records::{
    parse_timestamp, project, Filtered, ReadParser, RecordLocator, RecordOrder, RecordTransformer,
    TimeFilter,
};
pub use strategies::{
    numeric_token, CursorPaginator, NextUrlPaginator, NoPaginator, OffsetPaginator,
    PageNumberPaginator, PageSource,
};
pub use types::{extract_path, extract_records, extract_string, PageContext, Paginator, StopCondition};
