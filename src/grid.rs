//! Grid sources: the schedule data an export reads from

use crate::error::{ExportError, Result};
use crate::parse::{parse_color, parse_text_size};
use crate::types::{
    CellStyle, HorizontalAlign, MergeRegion, SectionExtent, SectionKind, VerticalAlign,
};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Column width (host units) used when a source has no width for a column.
/// Scales to roughly 15 characters in the output.
pub const DEFAULT_SOURCE_COLUMN_WIDTH: f64 = 0.1;

/// Read access to a schedule grid, one section at a time.
///
/// Indices are in the host's own convention; see [`SectionExtent`].
pub trait GridSource {
    fn extent(&self, section: SectionKind) -> SectionExtent;
    fn cell_style(&self, section: SectionKind, row: i32, column: i32) -> CellStyle;
    /// Merge rectangle containing the cell, or the cell itself when unmerged
    fn merge_region(&self, section: SectionKind, row: i32, column: i32) -> MergeRegion;
    fn cell_text(&self, section: SectionKind, row: i32, column: i32) -> String;
    fn column_width(&self, section: SectionKind, column: i32) -> f64;
    /// Schedule name, empty when the source has none
    fn name(&self) -> &str {
        ""
    }
}

// ============================================================================
// JSON schedule documents
// ============================================================================

/// Text size as written in a schedule document: a number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextSize {
    Points(f64),
    Text(String),
}

/// Partial cell style; unset fields inherit from the section default
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StyleDocument {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub font_name: Option<String>,
    pub text_size: Option<TextSize>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
}

impl StyleDocument {
    /// Overlay this style on `base`
    pub fn resolve(&self, base: &CellStyle) -> std::result::Result<CellStyle, String> {
        let mut style = base.clone();
        if let Some(ref h) = self.horizontal {
            style.horizontal = HorizontalAlign::from_host(h);
        }
        if let Some(ref v) = self.vertical {
            style.vertical = VerticalAlign::from_host(v);
        }
        if let Some(ref name) = self.font_name {
            style.font_name = name.clone();
        }
        match self.text_size {
            Some(TextSize::Points(size)) => style.text_size = size,
            Some(TextSize::Text(ref size)) => style.text_size = parse_text_size(size),
            None => {}
        }
        if let Some(bold) = self.bold {
            style.bold = bold;
        }
        if let Some(italic) = self.italic {
            style.italic = italic;
        }
        if let Some(underline) = self.underline {
            style.underline = underline;
        }
        if let Some(ref color) = self.text_color {
            style.text_color = parse_color(color)?;
        }
        if let Some(ref color) = self.background_color {
            style.background_color = parse_color(color)?;
        }
        Ok(style)
    }
}

/// One populated cell of a schedule document
#[derive(Debug, Clone, Deserialize)]
pub struct CellDocument {
    pub row: i32,
    pub column: i32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub style: Option<StyleDocument>,
}

/// Merge rectangle of a schedule document, bounds inclusive
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MergeDocument {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

/// One section of a schedule document
#[derive(Debug, Clone, Deserialize)]
pub struct SectionDocument {
    #[serde(default)]
    pub first_row: i32,
    #[serde(default)]
    pub first_column: i32,
    pub row_count: i32,
    pub column_count: i32,
    /// Widths in host units, indexed from `first_column`
    #[serde(default)]
    pub column_widths: Vec<f64>,
    #[serde(default = "default_column_width")]
    pub default_column_width: f64,
    #[serde(default)]
    pub default_style: StyleDocument,
    #[serde(default)]
    pub cells: Vec<CellDocument>,
    #[serde(default)]
    pub merges: Vec<MergeDocument>,
}

fn default_column_width() -> f64 {
    DEFAULT_SOURCE_COLUMN_WIDTH
}

/// Schedule document as stored on disk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub header: Option<SectionDocument>,
    #[serde(default)]
    pub body: Option<SectionDocument>,
}

/// Section with styles resolved and cells indexed
#[derive(Debug, Clone, Default)]
struct ScheduleSection {
    extent: SectionExtent,
    column_widths: Vec<f64>,
    default_column_width: f64,
    default_style: CellStyle,
    cells: HashMap<(i32, i32), (String, CellStyle)>,
    merges: Vec<MergeRegion>,
}

impl ScheduleSection {
    fn resolve(kind: SectionKind, doc: &SectionDocument) -> Result<Self> {
        let default_style = doc
            .default_style
            .resolve(&CellStyle::default())
            .map_err(|e| ExportError::InvalidSchedule(format!("{} default style: {}", kind, e)))?;

        let mut cells = HashMap::with_capacity(doc.cells.len());
        for cell in &doc.cells {
            let style = match cell.style {
                Some(ref s) => s.resolve(&default_style).map_err(|e| {
                    ExportError::InvalidSchedule(format!(
                        "{} cell ({}, {}): {}",
                        kind, cell.row, cell.column, e
                    ))
                })?,
                None => default_style.clone(),
            };
            cells.insert((cell.row, cell.column), (cell.text.clone(), style));
        }

        let mut merges = Vec::with_capacity(doc.merges.len());
        for m in &doc.merges {
            if m.bottom < m.top || m.right < m.left {
                return Err(ExportError::InvalidSchedule(format!(
                    "{} merge ({}, {})-({}, {}) is inverted",
                    kind, m.top, m.left, m.bottom, m.right
                )));
            }
            let region = MergeRegion::new(m.top, m.left, m.bottom, m.right);
            if let Some(other) = merges
                .iter()
                .find(|other: &&MergeRegion| regions_overlap(other, &region))
            {
                return Err(ExportError::InvalidSchedule(format!(
                    "{} merge {:?} overlaps {:?}",
                    kind, region, other
                )));
            }
            merges.push(region);
        }

        Ok(ScheduleSection {
            extent: SectionExtent {
                first_row: doc.first_row,
                first_column: doc.first_column,
                row_count: doc.row_count,
                column_count: doc.column_count,
            },
            column_widths: doc.column_widths.clone(),
            default_column_width: doc.default_column_width,
            default_style,
            cells,
            merges,
        })
    }
}

fn regions_overlap(a: &MergeRegion, b: &MergeRegion) -> bool {
    a.top <= b.bottom && b.top <= a.bottom && a.left <= b.right && b.left <= a.right
}

/// A schedule loaded from a JSON document
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    name: String,
    header: ScheduleSection,
    body: ScheduleSection,
}

impl Schedule {
    pub fn from_document(doc: &ScheduleDocument) -> Result<Self> {
        let header = match doc.header {
            Some(ref section) => ScheduleSection::resolve(SectionKind::Header, section)?,
            None => ScheduleSection::default(),
        };
        let body = match doc.body {
            Some(ref section) => ScheduleSection::resolve(SectionKind::Body, section)?,
            None => ScheduleSection::default(),
        };
        Ok(Schedule {
            name: doc.name.clone(),
            header,
            body,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: ScheduleDocument = serde_json::from_str(json)?;
        Self::from_document(&doc)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let doc: ScheduleDocument = serde_json::from_reader(reader)?;
        Self::from_document(&doc)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    fn section(&self, section: SectionKind) -> &ScheduleSection {
        match section {
            SectionKind::Header => &self.header,
            SectionKind::Body => &self.body,
        }
    }
}

impl GridSource for Schedule {
    fn extent(&self, section: SectionKind) -> SectionExtent {
        self.section(section).extent
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn cell_style(&self, section: SectionKind, row: i32, column: i32) -> CellStyle {
        let s = self.section(section);
        s.cells
            .get(&(row, column))
            .map(|(_, style)| style.clone())
            .unwrap_or_else(|| s.default_style.clone())
    }

    fn merge_region(&self, section: SectionKind, row: i32, column: i32) -> MergeRegion {
        self.section(section)
            .merges
            .iter()
            .find(|m| m.contains(row, column))
            .copied()
            .unwrap_or(MergeRegion::cell(row, column))
    }

    fn cell_text(&self, section: SectionKind, row: i32, column: i32) -> String {
        self.section(section)
            .cells
            .get(&(row, column))
            .map(|(text, _)| text.clone())
            .unwrap_or_default()
    }

    fn column_width(&self, section: SectionKind, column: i32) -> f64 {
        let s = self.section(section);
        usize::try_from(column - s.extent.first_column)
            .ok()
            .and_then(|idx| s.column_widths.get(idx).copied())
            .unwrap_or(s.default_column_width)
    }
}

// ============================================================================
// Plain CSV grids
// ============================================================================

/// A headerless CSV file read as an unstyled, unmerged body section
#[derive(Debug, Clone, Default)]
pub struct CsvGrid {
    rows: Vec<Vec<String>>,
    column_count: usize,
}

impl CsvGrid {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let rows: Vec<Vec<String>> = csv_reader
            .records()
            .map(|result| result.map(|record| record.iter().map(|s| s.to_string()).collect()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let column_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);

        i32::try_from(rows.len()).map_err(|_| {
            ExportError::InvalidSchedule(format!("Row count {} exceeds i32 limit", rows.len()))
        })?;
        i32::try_from(column_count).map_err(|_| {
            ExportError::InvalidSchedule(format!("Column count {} exceeds i32 limit", column_count))
        })?;

        Ok(CsvGrid { rows, column_count })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::with_capacity(1024 * 1024, file))
    }
}

impl GridSource for CsvGrid {
    fn extent(&self, section: SectionKind) -> SectionExtent {
        match section {
            SectionKind::Header => SectionExtent::default(),
            // sizes checked against i32 when loaded
            SectionKind::Body => SectionExtent {
                first_row: 0,
                first_column: 0,
                row_count: self.rows.len() as i32,
                column_count: self.column_count as i32,
            },
        }
    }

    fn cell_style(&self, _section: SectionKind, _row: i32, _column: i32) -> CellStyle {
        CellStyle::default()
    }

    fn merge_region(&self, _section: SectionKind, row: i32, column: i32) -> MergeRegion {
        MergeRegion::cell(row, column)
    }

    fn cell_text(&self, section: SectionKind, row: i32, column: i32) -> String {
        if section == SectionKind::Header {
            return String::new();
        }
        let (Ok(r), Ok(c)) = (usize::try_from(row), usize::try_from(column)) else {
            return String::new();
        };
        self.rows
            .get(r)
            .and_then(|record| record.get(c))
            .cloned()
            .unwrap_or_default()
    }

    fn column_width(&self, _section: SectionKind, _column: i32) -> f64 {
        DEFAULT_SOURCE_COLUMN_WIDTH
    }
}
