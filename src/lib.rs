//! schedule_xlsx - Export schedule grids to Excel workbooks
//!
//! A schedule is a styled, section-based grid (a header and a body) read
//! through [`GridSource`]. Exporting walks each section row by row and
//! writes one worksheet:
//! - Merged areas → one merged output range, written once
//! - Numeric-looking text → Excel numbers (leading-zero text stays text)
//! - Empty text → a single space
//! - Host fonts, colors and alignment → cell formats
//! - Host column widths → scaled output column widths
//!
//! Schedules can be loaded from JSON documents ([`Schedule`]) or plain
//! CSV files ([`CsvGrid`]).

mod convert;
mod error;
mod grid;
mod merge;
mod parse;
mod sink;
mod style;
mod types;

pub use convert::{
    export, export_to_sink, export_with, ExportOptions, ExportSummary, SheetTraversal,
    DEFAULT_SUBJECT,
};
pub use error::{ExportError, Result};
pub use grid::{
    CellDocument, CsvGrid, GridSource, MergeDocument, Schedule, ScheduleDocument,
    SectionDocument, StyleDocument, TextSize, DEFAULT_SOURCE_COLUMN_WIDTH,
};
pub use merge::{MergeTracker, WrittenCells};
pub use parse::{infer_value, scale_column_width};
pub use sink::{OutputSink, RecordedCell, RecordingSink, XlsxSink};
pub use style::{
    font_size_points, translate_horizontal, translate_style, translate_vertical, BorderLine,
    BorderPolicy, CellBorders, CellFormat, NoBorders, OutputHorizontal, OutputVertical,
    DEFAULT_FONT_SIZE,
};
pub use types::{
    CellStyle, CellValue, HorizontalAlign, MergeRegion, OutputCell, OutputCursor, OutputRange,
    Rgb, SectionExtent, SectionKind, VerticalAlign, WorkbookProperties,
};
