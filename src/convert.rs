//! Section traversal and export orchestration

use crate::error::{ExportError, Result};
use crate::grid::GridSource;
use crate::merge::{output_column, MergeTracker};
use crate::parse::{infer_value, sanitize_sheet_name, scale_column_width};
use crate::sink::{OutputSink, XlsxSink};
use crate::style::{translate_style, BorderPolicy, NoBorders};
use crate::types::{
    OutputCell, OutputCursor, SectionExtent, SectionKind, WorkbookProperties,
};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Subject written to the workbook properties unless overridden
pub const DEFAULT_SUBJECT: &str = "Schedule Export";

/// Options controlling one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Worksheet name; defaults to the output file stem
    pub title: Option<String>,
    /// Workbook author; defaults to the current user
    pub author: Option<String>,
    pub subject: String,
    /// Sections to traverse, in order, sharing one output row cursor
    pub sections: Vec<SectionKind>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            title: None,
            author: None,
            subject: DEFAULT_SUBJECT.to_string(),
            sections: vec![SectionKind::Body],
        }
    }
}

/// Counts describing a finished export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    /// Output rows advanced
    pub rows: u32,
    /// Cells given a value and style
    pub cells: usize,
    /// Merge instructions issued
    pub merges: usize,
    /// Distinct output columns sized
    pub columns: usize,
}

/// Row-major traversal of schedule sections into an output sink.
///
/// The merge tracker is reset for every section; the output row cursor
/// carries over, so sections land one below the other.
pub struct SheetTraversal {
    border_policy: Box<dyn BorderPolicy>,
    tracker: MergeTracker,
    cursor: OutputCursor,
    summary: ExportSummary,
    sized_columns: BTreeSet<u16>,
}

impl SheetTraversal {
    pub fn new() -> Self {
        Self::with_border_policy(Box::new(NoBorders))
    }

    pub fn with_border_policy(border_policy: Box<dyn BorderPolicy>) -> Self {
        SheetTraversal {
            border_policy,
            tracker: MergeTracker::new(SectionKind::Body, SectionExtent::default()),
            cursor: OutputCursor::new(),
            summary: ExportSummary::default(),
            sized_columns: BTreeSet::new(),
        }
    }

    pub fn cursor(&self) -> OutputCursor {
        self.cursor
    }

    pub fn summary(&self) -> ExportSummary {
        ExportSummary {
            columns: self.sized_columns.len(),
            ..self.summary
        }
    }

    /// Merge bookkeeping of the most recent section
    pub fn tracker(&self) -> &MergeTracker {
        &self.tracker
    }

    /// Write one section of `grid` into `sink`.
    ///
    /// Rows run from `first_row` while `row < row_count`, columns from
    /// `first_column` while `column < column_count`. Cells covered by an
    /// earlier merge rectangle get no value or style, but their column
    /// width is still set.
    pub fn export_section<G, S>(&mut self, section: SectionKind, grid: &G, sink: &mut S) -> Result<()>
    where
        G: GridSource + ?Sized,
        S: OutputSink,
    {
        let extent = grid.extent(section);
        self.tracker.reset(section, extent);
        tracing::debug!(
            %section,
            first_row = extent.first_row,
            first_column = extent.first_column,
            row_count = extent.row_count,
            column_count = extent.column_count,
            "traversing section"
        );

        for row in extent.first_row..extent.row_count {
            let output_row = self.cursor.current_row();

            for column in extent.first_column..extent.column_count {
                let output_col = output_column(row, column)?;

                if !self.tracker.is_written(row, column) {
                    let region = grid.merge_region(section, row, column);
                    if let Some(target) = self.tracker.claim(region, output_row, row, column)? {
                        tracing::trace!(row, column, %target, "merge");
                        sink.merge_range(target)?;
                        self.summary.merges += 1;
                    }

                    let value = infer_value(&grid.cell_text(section, row, column));
                    let style = grid.cell_style(section, row, column);
                    let format = translate_style(&style, self.border_policy.as_ref());
                    sink.write_cell(OutputCell::new(output_row, output_col), &value, &format)?;
                    self.summary.cells += 1;
                }

                let width = scale_column_width(grid.column_width(section, column));
                sink.set_column_width(output_col, width)?;
                self.sized_columns.insert(output_col);
            }

            self.cursor.advance();
            self.summary.rows += 1;
        }

        Ok(())
    }
}

impl Default for SheetTraversal {
    fn default() -> Self {
        SheetTraversal::new()
    }
}

/// Export lifecycle, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportPhase {
    Preparing,
    Traversing(SectionKind),
    Finalizing,
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPhase::Preparing => f.write_str("preparing"),
            ExportPhase::Traversing(section) => write!(f, "traversing {}", section),
            ExportPhase::Finalizing => f.write_str("finalizing"),
        }
    }
}

/// Output file owned by one export.
///
/// Any existing file is removed and a fresh one created up front. Unless
/// the export commits, the file is removed again when the guard drops.
struct OutputFile {
    path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl OutputFile {
    fn prepare(path: &Path) -> Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed existing file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ExportError::RemoveExisting {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| ExportError::CreateOutput {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(OutputFile {
            path: path.to_path_buf(),
            file: Some(file),
            committed: false,
        })
    }

    fn save_with<S: OutputSink>(&mut self, sink: &mut S) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            ExportError::Io(std::io::Error::new(ErrorKind::Other, "output file already closed"))
        })?;
        let mut writer = BufWriter::new(file);
        sink.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        // close before any removal
        self.file.take();
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove incomplete export");
            }
        }
    }
}

/// Current user name for the workbook author
pub(crate) fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Traverse the configured sections and set workbook properties
fn write_workbook<G, S>(
    grid: &G,
    options: &ExportOptions,
    sheet_title: &str,
    properties: &WorkbookProperties,
    sink: &mut S,
    phase: &mut ExportPhase,
) -> Result<ExportSummary>
where
    G: GridSource + ?Sized,
    S: OutputSink,
{
    sink.set_sheet_name(&sanitize_sheet_name(sheet_title))?;

    let mut traversal = SheetTraversal::new();
    for &section in &options.sections {
        *phase = ExportPhase::Traversing(section);
        tracing::debug!(%phase, "export phase");
        traversal.export_section(section, grid, sink)?;
    }

    *phase = ExportPhase::Finalizing;
    tracing::debug!(%phase, "export phase");
    sink.set_properties(properties)?;
    Ok(traversal.summary())
}

/// Export into any sink without touching the filesystem.
///
/// The worksheet and the title property use `options.title`, then the
/// grid's own name, then `"Schedule"`. The sink is not saved.
pub fn export_to_sink<G, S>(grid: &G, options: &ExportOptions, sink: &mut S) -> Result<ExportSummary>
where
    G: GridSource + ?Sized,
    S: OutputSink,
{
    let title = options
        .title
        .clone()
        .or_else(|| Some(grid.name().trim()).filter(|n| !n.is_empty()).map(str::to_string))
        .unwrap_or_else(|| "Schedule".to_string());
    let properties = WorkbookProperties {
        title: title.clone(),
        author: options.author.clone().unwrap_or_else(current_user),
        subject: options.subject.clone(),
    };
    let mut phase = ExportPhase::Preparing;
    write_workbook(grid, options, &title, &properties, sink, &mut phase)
}

/// Preparing through Finalizing for a file export
fn write_file<G, S>(
    grid: &G,
    path: &Path,
    options: &ExportOptions,
    sink: &mut S,
    phase: &mut ExportPhase,
) -> Result<ExportSummary>
where
    G: GridSource + ?Sized,
    S: OutputSink,
{
    let mut output = OutputFile::prepare(path)?;

    let stem = file_stem(path);
    let sheet_title = options.title.clone().unwrap_or_else(|| stem.clone());
    let properties = WorkbookProperties {
        title: stem,
        author: options.author.clone().unwrap_or_else(current_user),
        subject: options.subject.clone(),
    };

    let summary = write_workbook(grid, options, &sheet_title, &properties, sink, phase)?;
    output.save_with(sink)?;
    output.commit();
    Ok(summary)
}

/// Export `grid` to `path` through `sink`, then save.
///
/// An existing file at `path` is replaced. If removing or creating the file
/// fails, nothing is traversed. If anything later fails, the partially
/// written file is removed.
pub fn export_with<G, S>(
    grid: &G,
    path: &Path,
    options: &ExportOptions,
    sink: &mut S,
) -> Result<ExportSummary>
where
    G: GridSource + ?Sized,
    S: OutputSink,
{
    let mut phase = ExportPhase::Preparing;
    tracing::info!(path = %path.display(), "exporting schedule");
    tracing::debug!(%phase, "export phase");

    let result = write_file(grid, path, options, sink, &mut phase);

    match result {
        Ok(summary) => {
            tracing::info!(
                path = %path.display(),
                rows = summary.rows,
                cells = summary.cells,
                merges = summary.merges,
                "export completed"
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(%phase, error = %e, "export failed");
            Err(e)
        }
    }
}

/// Export `grid` to an XLSX workbook at `path`
pub fn export<G>(grid: &G, path: &Path, options: &ExportOptions) -> Result<ExportSummary>
where
    G: GridSource + ?Sized,
{
    let mut sink = XlsxSink::new();
    export_with(grid, path, options, &mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use crate::types::{CellStyle, CellValue, MergeRegion, OutputRange};

    /// In-memory grid: every cell is unmerged unless listed in `merges`
    struct TestGrid {
        extent: SectionExtent,
        merges: Vec<MergeRegion>,
        texts: Vec<((i32, i32), &'static str)>,
    }

    impl TestGrid {
        fn new(extent: SectionExtent) -> Self {
            TestGrid {
                extent,
                merges: Vec::new(),
                texts: Vec::new(),
            }
        }
    }

    impl GridSource for TestGrid {
        fn extent(&self, _section: SectionKind) -> SectionExtent {
            self.extent
        }
        fn cell_style(&self, _section: SectionKind, _row: i32, _column: i32) -> CellStyle {
            CellStyle::default()
        }
        fn merge_region(&self, _section: SectionKind, row: i32, column: i32) -> MergeRegion {
            self.merges
                .iter()
                .find(|m| m.contains(row, column))
                .copied()
                .unwrap_or(MergeRegion::cell(row, column))
        }
        fn cell_text(&self, _section: SectionKind, row: i32, column: i32) -> String {
            self.texts
                .iter()
                .find(|(at, _)| *at == (row, column))
                .map(|(_, t)| t.to_string())
                .unwrap_or_default()
        }
        fn column_width(&self, _section: SectionKind, column: i32) -> f64 {
            0.05 * f64::from(column + 1)
        }
    }

    fn extent(first_row: i32, first_column: i32, row_count: i32, column_count: i32) -> SectionExtent {
        SectionExtent {
            first_row,
            first_column,
            row_count,
            column_count,
        }
    }

    #[test]
    fn test_unmerged_cell_count() {
        let grid = TestGrid::new(extent(0, 0, 3, 4));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();
        assert_eq!(sink.cells.len(), 12);
        assert!(sink.merges.is_empty());
        assert_eq!(traversal.summary().rows, 3);
        assert_eq!(traversal.summary().columns, 4);
    }

    #[test]
    fn test_offset_section_exclusive_bounds() {
        // rows 2..5 and columns 1..4 are visited; index 5 / 4 are not
        let grid = TestGrid::new(extent(2, 1, 5, 4));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();
        assert_eq!(sink.cells.len(), (5 - 2) * (4 - 1));
        // output rows restart at 1, output columns follow the host index
        assert!(sink.cell(1, 2).is_some());
        assert!(sink.cell(3, 4).is_some());
        assert!(sink.cell(1, 1).is_none());
        assert!(sink.cell(4, 2).is_none());
        assert_eq!(traversal.cursor().current_row(), 4);
    }

    #[test]
    fn test_empty_section_writes_nothing() {
        let grid = TestGrid::new(extent(0, 0, 0, 5));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();
        assert!(sink.cells.is_empty());
        assert_eq!(traversal.cursor().current_row(), 1);
    }

    #[test]
    fn test_body_merge_written_once() {
        let mut grid = TestGrid::new(extent(0, 0, 3, 3));
        grid.merges.push(MergeRegion::new(0, 1, 1, 2));
        grid.texts.push(((0, 1), "Frame"));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();

        assert_eq!(sink.merges, vec![OutputRange::new(1, 2, 2, 3)]);
        assert_eq!(sink.cells.len(), 9 - 3);
        assert_eq!(
            sink.cell(1, 2).map(|c| c.value.clone()),
            Some(CellValue::Text("Frame".to_string()))
        );
        assert!(sink.cell(1, 3).is_none());
        assert!(sink.cell(2, 2).is_none());
        // widths still set for columns whose cells were skipped
        assert_eq!(sink.column_widths.len(), 3);
    }

    #[test]
    fn test_every_cell_covered_exactly_once() {
        let mut grid = TestGrid::new(extent(0, 0, 4, 4));
        grid.merges.push(MergeRegion::new(0, 0, 0, 3));
        grid.merges.push(MergeRegion::new(1, 0, 3, 0));
        grid.merges.push(MergeRegion::new(2, 2, 3, 3));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();

        assert_eq!(traversal.tracker().written_count(), 16);
        // 3 merge anchors + 5 single cells
        assert_eq!(sink.cells.len(), 8);
        assert_eq!(sink.merges.len(), 3);
        for (i, a) in sink.merges.iter().enumerate() {
            for b in sink.merges.iter().skip(i + 1) {
                assert!(!a.overlaps(b), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn test_header_merge_quirk() {
        let mut grid = TestGrid::new(extent(0, 0, 2, 4));
        // row 0: title merged across the row; row 1: right == 0 on first cell
        grid.merges.push(MergeRegion::new(0, 0, 0, 3));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Header, &grid, &mut sink)
            .unwrap();

        assert_eq!(sink.merges[0], OutputRange::new(1, 1, 1, 4));
        // (1, 0) reports right == 0: no merge; later cells merge to the end
        assert!(!sink.merges.iter().any(|m| m.first_row == 2 && m.first_column == 1));
        assert!(sink.merges.contains(&OutputRange::new(2, 2, 2, 4)));
    }

    #[test]
    fn test_sections_share_cursor() {
        let grid = TestGrid::new(extent(0, 0, 2, 2));
        let mut sink = RecordingSink::new();
        let mut traversal = SheetTraversal::new();
        traversal
            .export_section(SectionKind::Header, &grid, &mut sink)
            .unwrap();
        traversal
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();
        assert_eq!(traversal.cursor().current_row(), 5);
        assert!(sink.cell(4, 2).is_some());
    }

    #[test]
    fn test_column_width_scaled() {
        let grid = TestGrid::new(extent(0, 0, 1, 2));
        let mut sink = RecordingSink::new();
        SheetTraversal::new()
            .export_section(SectionKind::Body, &grid, &mut sink)
            .unwrap();
        let expected = 0.10 * 1150.0 / 7.5;
        let got = sink.column_widths.get(&2).copied().unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_negative_column_fails() {
        let grid = TestGrid::new(extent(0, -2, 1, 1));
        let mut sink = RecordingSink::new();
        let result = SheetTraversal::new().export_section(SectionKind::Body, &grid, &mut sink);
        assert!(matches!(result, Err(ExportError::OutOfRange { .. })));
    }

    #[test]
    fn test_export_to_sink_sets_properties() {
        let grid = TestGrid::new(extent(0, 0, 1, 1));
        let mut sink = RecordingSink::new();
        let options = ExportOptions {
            title: Some("Rooms: Level 1".to_string()),
            author: Some("ana".to_string()),
            ..ExportOptions::default()
        };
        export_to_sink(&grid, &options, &mut sink).unwrap();
        assert_eq!(sink.sheet_name.as_deref(), Some("Rooms_ Level 1"));
        let props = sink.properties.unwrap();
        assert_eq!(props.author, "ana");
        assert_eq!(props.subject, DEFAULT_SUBJECT);
        assert!(!sink.saved);
    }

    #[test]
    fn test_current_user_never_empty() {
        assert!(!current_user().is_empty());
    }
}
