//! Type definitions for schedule_xlsx

use std::fmt;

/// Named region of a schedule grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectionKind {
    /// Title rows above the column headings
    Header,
    /// Column headings and data rows
    #[default]
    Body,
}

impl SectionKind {
    /// Parse from string, returns None for invalid input
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "header" => Some(SectionKind::Header),
            "body" => Some(SectionKind::Body),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Header => f.write_str("header"),
            SectionKind::Body => f.write_str("body"),
        }
    }
}

/// Row/column extents of one section, in the host's own indexing.
///
/// Traversal covers `first_row..row_count` by `first_column..column_count`:
/// the upper bounds are exclusive even when the host starts counting at an
/// offset, so an offset section loses its trailing rows/columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionExtent {
    pub first_row: i32,
    pub first_column: i32,
    pub row_count: i32,
    pub column_count: i32,
}

impl SectionExtent {
    /// Number of rows visited by a traversal
    pub fn visited_rows(&self) -> usize {
        usize::try_from(self.row_count.saturating_sub(self.first_row)).unwrap_or(0)
    }

    /// Number of columns visited per row
    pub fn visited_columns(&self) -> usize {
        usize::try_from(self.column_count.saturating_sub(self.first_column)).unwrap_or(0)
    }

    /// Whether (row, column) lies inside the traversed rectangle
    pub fn contains(&self, row: i32, column: i32) -> bool {
        row >= self.first_row
            && row < self.row_count
            && column >= self.first_column
            && column < self.column_count
    }
}

/// RGB color triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Rgb { red, green, blue }
    }

    /// Build from a packed 0xRRGGBB value
    pub const fn from_u32(value: u32) -> Self {
        Rgb {
            red: ((value >> 16) & 0xFF) as u8,
            green: ((value >> 8) & 0xFF) as u8,
            blue: (value & 0xFF) as u8,
        }
    }

    /// Packed 0xRRGGBB value
    pub const fn to_u32(self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
    }
}

/// Horizontal text alignment reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    Left,
    Right,
    Center,
    #[default]
    General,
}

impl HorizontalAlign {
    /// Map a host alignment name; anything unrecognized is `General`
    pub fn from_host(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "left" => HorizontalAlign::Left,
            "right" => HorizontalAlign::Right,
            "center" | "centre" => HorizontalAlign::Center,
            _ => HorizontalAlign::General,
        }
    }
}

/// Vertical text alignment reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    /// Map a host alignment name; anything unrecognized is `Top`
    pub fn from_host(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "top" => VerticalAlign::Top,
            "middle" | "center" | "centre" => VerticalAlign::Middle,
            "bottom" => VerticalAlign::Bottom,
            _ => VerticalAlign::Top,
        }
    }
}

/// Style of a source cell as the host reports it
#[derive(Debug, Clone, PartialEq)]
pub struct CellStyle {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub font_name: String,
    /// Raw host text size; may be non-finite when the host value was unreadable
    pub text_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub text_color: Rgb,
    pub background_color: Rgb,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle {
            horizontal: HorizontalAlign::General,
            vertical: VerticalAlign::Top,
            font_name: "Arial".to_string(),
            text_size: 10.0,
            bold: false,
            italic: false,
            underline: false,
            text_color: Rgb::BLACK,
            background_color: Rgb::WHITE,
        }
    }
}

/// Merge rectangle in source coordinates, bounds inclusive.
/// An unmerged cell is the degenerate region covering just itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRegion {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl MergeRegion {
    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        MergeRegion {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Degenerate region for a single cell
    pub const fn cell(row: i32, column: i32) -> Self {
        MergeRegion::new(row, column, row, column)
    }

    pub fn is_degenerate(&self) -> bool {
        self.left == self.right && self.top == self.bottom
    }

    pub fn contains(&self, row: i32, column: i32) -> bool {
        row >= self.top && row <= self.bottom && column >= self.left && column <= self.right
    }
}

/// Typed value written to an output cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

/// 1-based output cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputCell {
    pub row: u32,
    pub column: u16,
}

impl OutputCell {
    pub const fn new(row: u32, column: u16) -> Self {
        OutputCell { row, column }
    }
}

/// 1-based output range, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRange {
    pub first_row: u32,
    pub first_column: u16,
    pub last_row: u32,
    pub last_column: u16,
}

impl OutputRange {
    pub const fn new(first_row: u32, first_column: u16, last_row: u32, last_column: u16) -> Self {
        OutputRange {
            first_row,
            first_column,
            last_row,
            last_column,
        }
    }

    pub fn top_left(&self) -> OutputCell {
        OutputCell::new(self.first_row, self.first_column)
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_column == self.last_column
    }

    pub fn overlaps(&self, other: &OutputRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_column <= other.last_column
            && other.first_column <= self.last_column
    }
}

impl fmt::Display for OutputRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}C{}:R{}C{}",
            self.first_row, self.first_column, self.last_row, self.last_column
        )
    }
}

/// Next output row to write; starts at 1 and advances once per source row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCursor {
    current_row: u32,
}

impl OutputCursor {
    pub const fn new() -> Self {
        OutputCursor { current_row: 1 }
    }

    pub fn current_row(&self) -> u32 {
        self.current_row
    }

    pub fn advance(&mut self) {
        self.current_row += 1;
    }
}

impl Default for OutputCursor {
    fn default() -> Self {
        OutputCursor::new()
    }
}

/// Workbook-level document properties
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkbookProperties {
    pub title: String,
    pub author: String,
    pub subject: String,
}
