//! Output sinks: where translated cells, merges and widths are written

use crate::error::{ExportError, Result};
use crate::style::{BorderLine, CellBorders, CellFormat, OutputHorizontal, OutputVertical};
use crate::types::{CellValue, OutputCell, OutputRange, WorkbookProperties};
use indexmap::IndexMap;
use rust_xlsxwriter::{
    Color, DocProperties, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline,
    Workbook, Worksheet,
};
use std::collections::HashMap;
use std::io::{Seek, Write};

/// Destination spreadsheet of an export.
///
/// All addresses are 1-based. Column widths may be set repeatedly for the
/// same column; the last write wins.
pub trait OutputSink {
    /// Name the worksheet receiving the export
    fn set_sheet_name(&mut self, name: &str) -> Result<()>;
    fn write_cell(&mut self, cell: OutputCell, value: &CellValue, format: &CellFormat)
        -> Result<()>;
    fn merge_range(&mut self, range: OutputRange) -> Result<()>;
    fn set_column_width(&mut self, column: u16, width: f64) -> Result<()>;
    fn set_properties(&mut self, properties: &WorkbookProperties) -> Result<()>;
    /// Persist the workbook into `writer`
    fn save<W: Write + Seek + Send>(&mut self, writer: W) -> Result<()>;
}

// ============================================================================
// rust_xlsxwriter adapter
// ============================================================================

fn zero_based(row: u32, column: u16) -> Result<(u32, u16)> {
    match (row.checked_sub(1), column.checked_sub(1)) {
        (Some(r), Some(c)) => Ok((r, c)),
        _ => Err(ExportError::OutOfRange {
            row: i64::from(row),
            column: i64::from(column),
        }),
    }
}

fn border_line(line: BorderLine) -> FormatBorder {
    match line {
        BorderLine::None => FormatBorder::None,
        BorderLine::Thin => FormatBorder::Thin,
        BorderLine::Medium => FormatBorder::Medium,
        BorderLine::Thick => FormatBorder::Thick,
        BorderLine::Dotted => FormatBorder::Dotted,
        BorderLine::Dashed => FormatBorder::Dashed,
        BorderLine::Double => FormatBorder::Double,
    }
}

fn apply_borders(mut format: Format, borders: &CellBorders) -> Format {
    if borders.is_none() {
        return format;
    }
    format = format
        .set_border_top(border_line(borders.top))
        .set_border_bottom(border_line(borders.bottom))
        .set_border_left(border_line(borders.left))
        .set_border_right(border_line(borders.right));
    format
}

/// Build a rust_xlsxwriter `Format` from a translated cell format
pub(crate) fn build_format(cell: &CellFormat) -> Format {
    let mut format = Format::new()
        .set_font_size(cell.font_size)
        .set_font_color(Color::RGB(cell.font_color.to_u32()));

    // an empty font name would produce an invalid font record
    if !cell.font_name.is_empty() {
        format = format.set_font_name(cell.font_name.as_str());
    }
    if cell.wrap_text {
        format = format.set_text_wrap();
    }
    if cell.bold {
        format = format.set_bold();
    }
    if cell.italic {
        format = format.set_italic();
    }
    if cell.underline {
        format = format.set_underline(FormatUnderline::Single);
    }

    format = format.set_align(match cell.horizontal {
        OutputHorizontal::Left => FormatAlign::Left,
        OutputHorizontal::Right => FormatAlign::Right,
        OutputHorizontal::Center => FormatAlign::Center,
        OutputHorizontal::General => FormatAlign::General,
    });
    format = format.set_align(match cell.vertical {
        OutputVertical::Top => FormatAlign::Top,
        OutputVertical::Center => FormatAlign::VerticalCenter,
        OutputVertical::Bottom => FormatAlign::Bottom,
    });

    if let Some(fill) = cell.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill.to_u32()));
    }

    apply_borders(format, &cell.borders)
}

/// Sink writing a single worksheet through rust_xlsxwriter.
///
/// A merge is held until its top-left cell is written so the whole merged
/// area carries that cell's format. Merges rust_xlsxwriter cannot express
/// (single cells, or overlapping an earlier merge) are skipped.
pub struct XlsxSink {
    worksheet: Worksheet,
    properties: Option<DocProperties>,
    pending_merges: HashMap<OutputCell, OutputRange>,
    merged: Vec<OutputRange>,
}

impl XlsxSink {
    pub fn new() -> Self {
        XlsxSink {
            worksheet: Worksheet::new(),
            properties: None,
            pending_merges: HashMap::new(),
            merged: Vec::new(),
        }
    }

    /// Merges applied to the worksheet so far
    pub fn merged_ranges(&self) -> &[OutputRange] {
        &self.merged
    }

    fn apply_merge(&mut self, range: OutputRange, format: &Format) -> Result<()> {
        if range.is_single_cell() {
            tracing::warn!(%range, "skipping single-cell merge");
            return Ok(());
        }
        if let Some(existing) = self.merged.iter().find(|m| m.overlaps(&range)) {
            tracing::warn!(%range, %existing, "skipping merge overlapping an earlier merge");
            return Ok(());
        }

        let (first_row, first_col) = zero_based(range.first_row, range.first_column)?;
        let (last_row, last_col) = zero_based(range.last_row, range.last_column)?;
        self.worksheet
            .merge_range(first_row, first_col, last_row, last_col, "", format)?;
        tracing::trace!(%range, "merged");
        self.merged.push(range);
        Ok(())
    }
}

impl Default for XlsxSink {
    fn default() -> Self {
        XlsxSink::new()
    }
}

impl OutputSink for XlsxSink {
    fn set_sheet_name(&mut self, name: &str) -> Result<()> {
        self.worksheet.set_name(name)?;
        Ok(())
    }

    fn write_cell(
        &mut self,
        cell: OutputCell,
        value: &CellValue,
        format: &CellFormat,
    ) -> Result<()> {
        let xlsx_format = build_format(format);
        if let Some(range) = self.pending_merges.remove(&cell) {
            self.apply_merge(range, &xlsx_format)?;
        }

        let (row, col) = zero_based(cell.row, cell.column)?;
        match value {
            CellValue::Number(v) => {
                self.worksheet
                    .write_number_with_format(row, col, *v, &xlsx_format)?;
            }
            CellValue::Text(v) => {
                self.worksheet
                    .write_string_with_format(row, col, v.as_str(), &xlsx_format)?;
            }
        }
        Ok(())
    }

    fn merge_range(&mut self, range: OutputRange) -> Result<()> {
        if let Some(previous) = self.pending_merges.insert(range.top_left(), range) {
            tracing::warn!(%previous, replacement = %range, "pending merge replaced");
        }
        Ok(())
    }

    fn set_column_width(&mut self, column: u16, width: f64) -> Result<()> {
        let (_, col) = zero_based(1, column)?;
        self.worksheet.set_column_width(col, width)?;
        Ok(())
    }

    fn set_properties(&mut self, properties: &WorkbookProperties) -> Result<()> {
        self.properties = Some(
            DocProperties::new()
                .set_title(properties.title.as_str())
                .set_author(properties.author.as_str())
                .set_subject(properties.subject.as_str()),
        );
        Ok(())
    }

    fn save<W: Write + Seek + Send>(&mut self, writer: W) -> Result<()> {
        // merges whose top-left cell was never written
        let mut leftovers: Vec<OutputRange> = self.pending_merges.drain().map(|(_, r)| r).collect();
        leftovers.sort_by_key(|r| (r.first_row, r.first_column));
        let default_format = Format::new();
        for range in leftovers {
            self.apply_merge(range, &default_format)?;
        }

        let mut workbook = Workbook::new();
        if let Some(ref properties) = self.properties {
            workbook.set_properties(properties);
        }
        workbook.push_worksheet(std::mem::replace(&mut self.worksheet, Worksheet::new()));
        workbook.save_to_writer(writer)?;
        Ok(())
    }
}

// ============================================================================
// In-memory recording sink
// ============================================================================

/// A cell write captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCell {
    pub value: CellValue,
    pub format: CellFormat,
}

/// Sink that records every instruction in memory, in write order.
/// Saving writes nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub sheet_name: Option<String>,
    pub cells: IndexMap<OutputCell, RecordedCell>,
    pub merges: Vec<OutputRange>,
    pub column_widths: IndexMap<u16, f64>,
    pub properties: Option<WorkbookProperties>,
    pub saved: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn cell(&self, row: u32, column: u16) -> Option<&RecordedCell> {
        self.cells.get(&OutputCell::new(row, column))
    }
}

impl OutputSink for RecordingSink {
    fn set_sheet_name(&mut self, name: &str) -> Result<()> {
        self.sheet_name = Some(name.to_string());
        Ok(())
    }

    fn write_cell(
        &mut self,
        cell: OutputCell,
        value: &CellValue,
        format: &CellFormat,
    ) -> Result<()> {
        self.cells.insert(
            cell,
            RecordedCell {
                value: value.clone(),
                format: format.clone(),
            },
        );
        Ok(())
    }

    fn merge_range(&mut self, range: OutputRange) -> Result<()> {
        self.merges.push(range);
        Ok(())
    }

    fn set_column_width(&mut self, column: u16, width: f64) -> Result<()> {
        self.column_widths.insert(column, width);
        Ok(())
    }

    fn set_properties(&mut self, properties: &WorkbookProperties) -> Result<()> {
        self.properties = Some(properties.clone());
        Ok(())
    }

    fn save<W: Write + Seek + Send>(&mut self, _writer: W) -> Result<()> {
        self.saved = true;
        Ok(())
    }
}
