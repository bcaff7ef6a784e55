//! Merge-region bookkeeping for one section traversal

use crate::error::{ExportError, Result};
use crate::types::{MergeRegion, OutputRange, SectionExtent, SectionKind};
use fixedbitset::FixedBitSet;

/// Map a host column index to its 1-based output column
pub(crate) fn output_column(row: i32, column: i32) -> Result<u16> {
    let shifted = i64::from(column) + 1;
    match u16::try_from(shifted) {
        Ok(col) if col >= 1 => Ok(col),
        _ => Err(ExportError::OutOfRange {
            row: i64::from(row),
            column: i64::from(column),
        }),
    }
}

/// Cells already accounted for by a processed merge region.
///
/// Backed by a bitset sized to the section extent; cells outside the
/// extent are never visited and are not tracked.
#[derive(Debug, Clone)]
pub struct WrittenCells {
    extent: SectionExtent,
    columns: usize,
    bits: FixedBitSet,
}

impl WrittenCells {
    pub fn new(extent: SectionExtent) -> Self {
        let columns = extent.visited_columns();
        WrittenCells {
            extent,
            columns,
            bits: FixedBitSet::with_capacity(extent.visited_rows() * columns),
        }
    }

    /// Clear all marks and resize to a new extent, reusing the allocation
    pub fn reset(&mut self, extent: SectionExtent) {
        self.extent = extent;
        self.columns = extent.visited_columns();
        self.bits.clear();
        self.bits.grow(extent.visited_rows() * self.columns);
    }

    fn index(&self, row: i32, column: i32) -> Option<usize> {
        if !self.extent.contains(row, column) {
            return None;
        }
        let r = usize::try_from(row - self.extent.first_row).ok()?;
        let c = usize::try_from(column - self.extent.first_column).ok()?;
        Some(r * self.columns + c)
    }

    pub fn is_written(&self, row: i32, column: i32) -> bool {
        self.index(row, column)
            .is_some_and(|idx| self.bits.contains(idx))
    }

    pub fn mark(&mut self, row: i32, column: i32) {
        if let Some(idx) = self.index(row, column) {
            self.bits.insert(idx);
        }
    }

    /// Number of marked cells
    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks merge regions seen during one traversal of one section and
/// computes the output merge range for each.
#[derive(Debug, Clone)]
pub struct MergeTracker {
    section: SectionKind,
    extent: SectionExtent,
    written: WrittenCells,
}

impl MergeTracker {
    pub fn new(section: SectionKind, extent: SectionExtent) -> Self {
        MergeTracker {
            section,
            extent,
            written: WrittenCells::new(extent),
        }
    }

    /// Start a fresh traversal of `section`, forgetting every mark
    pub fn reset(&mut self, section: SectionKind, extent: SectionExtent) {
        self.section = section;
        self.extent = extent;
        self.written.reset(extent);
    }

    pub fn is_written(&self, row: i32, column: i32) -> bool {
        self.written.is_written(row, column)
    }

    /// Mark every cell of `region` as written.
    /// The top-left cell is always marked, even for an inverted rectangle.
    pub fn mark_written(&mut self, region: MergeRegion) {
        for row in region.top..=region.bottom.max(region.top) {
            for column in region.left..=region.right.max(region.left) {
                self.written.mark(row, column);
            }
        }
    }

    /// Output range to merge for the cell at (`row`, `column`) whose merge
    /// rectangle is `region`, written at `output_row`.
    ///
    /// Header rows merge from the cell to the last column of the section,
    /// but only when the host reports `right > 0`; a header cell reporting
    /// `right <= 0` stays unmerged. Body cells merge the rectangle's own
    /// extent, and only when the rectangle spans more than one cell.
    pub fn merge_target(
        &self,
        region: MergeRegion,
        output_row: u32,
        row: i32,
        column: i32,
    ) -> Result<Option<OutputRange>> {
        let from_col = output_column(row, column)?;
        let out_of_range = || ExportError::OutOfRange {
            row: i64::from(row),
            column: i64::from(column),
        };

        match self.section {
            SectionKind::Header => {
                if region.right <= 0 {
                    tracing::debug!(row, column, right = region.right, "header cell left unmerged");
                    return Ok(None);
                }
                let to_col = u16::try_from(self.extent.column_count).map_err(|_| out_of_range())?;
                Ok(Some(OutputRange::new(output_row, from_col, output_row, to_col)))
            }
            SectionKind::Body => {
                if region.is_degenerate() {
                    return Ok(None);
                }
                let row_span = u32::try_from(region.bottom.saturating_sub(region.top).max(0))
                    .map_err(|_| out_of_range())?;
                let col_span = u16::try_from(region.right.saturating_sub(region.left).max(0))
                    .map_err(|_| out_of_range())?;
                let to_row = output_row.checked_add(row_span).ok_or_else(out_of_range)?;
                let to_col = from_col.checked_add(col_span).ok_or_else(out_of_range)?;
                let target = OutputRange::new(output_row, from_col, to_row, to_col);
                if target.is_single_cell() {
                    return Ok(None);
                }
                Ok(Some(target))
            }
        }
    }

    /// Compute the merge target for an unwritten cell, then mark its whole
    /// rectangle so later cells inside it are skipped.
    pub fn claim(
        &mut self,
        region: MergeRegion,
        output_row: u32,
        row: i32,
        column: i32,
    ) -> Result<Option<OutputRange>> {
        let target = self.merge_target(region, output_row, row, column)?;
        self.mark_written(region);
        Ok(target)
    }

    /// Number of section cells covered so far
    pub fn written_count(&self) -> usize {
        self.written.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(rows: i32, cols: i32) -> SectionExtent {
        SectionExtent {
            first_row: 0,
            first_column: 0,
            row_count: rows,
            column_count: cols,
        }
    }

    #[test]
    fn test_written_cells_bounds() {
        let mut cells = WrittenCells::new(SectionExtent {
            first_row: 2,
            first_column: 1,
            row_count: 5,
            column_count: 4,
        });
        cells.mark(2, 1);
        cells.mark(4, 3);
        // outside the traversed rectangle
        cells.mark(5, 3);
        cells.mark(1, 1);
        assert!(cells.is_written(2, 1));
        assert!(cells.is_written(4, 3));
        assert!(!cells.is_written(5, 3));
        assert!(!cells.is_written(3, 2));
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_written_cells_reset() {
        let mut cells = WrittenCells::new(extent(2, 2));
        cells.mark(1, 1);
        cells.reset(extent(3, 3));
        assert!(cells.is_empty());
        cells.mark(2, 2);
        assert!(cells.is_written(2, 2));
    }

    #[test]
    fn test_body_merge_from_deltas() {
        let tracker = MergeTracker::new(SectionKind::Body, extent(10, 10));
        let target = tracker
            .merge_target(MergeRegion::new(3, 2, 4, 5), 7, 3, 2)
            .unwrap();
        assert_eq!(target, Some(OutputRange::new(7, 3, 8, 6)));
    }

    #[test]
    fn test_body_degenerate_region_not_merged() {
        let tracker = MergeTracker::new(SectionKind::Body, extent(4, 4));
        let target = tracker.merge_target(MergeRegion::cell(1, 1), 2, 1, 1).unwrap();
        assert_eq!(target, None);
    }

    #[test]
    fn test_header_merge_spans_to_last_column() {
        let tracker = MergeTracker::new(SectionKind::Header, extent(1, 6));
        let target = tracker
            .merge_target(MergeRegion::new(0, 0, 0, 5), 1, 0, 0)
            .unwrap();
        assert_eq!(target, Some(OutputRange::new(1, 1, 1, 6)));

        // only `right` matters, not the rectangle's width
        let target = tracker
            .merge_target(MergeRegion::new(0, 2, 0, 2), 1, 0, 2)
            .unwrap();
        assert_eq!(target, Some(OutputRange::new(1, 3, 1, 6)));
    }

    #[test]
    fn test_header_non_positive_right_not_merged() {
        let tracker = MergeTracker::new(SectionKind::Header, extent(1, 6));
        let target = tracker.merge_target(MergeRegion::cell(0, 0), 1, 0, 0).unwrap();
        assert_eq!(target, None);
    }

    #[test]
    fn test_claim_marks_rectangle() {
        let mut tracker = MergeTracker::new(SectionKind::Body, extent(4, 4));
        let target = tracker.claim(MergeRegion::new(1, 1, 2, 3), 2, 1, 1).unwrap();
        assert_eq!(target, Some(OutputRange::new(2, 2, 3, 4)));
        for row in 1..=2 {
            for col in 1..=3 {
                assert!(tracker.is_written(row, col), "({row}, {col}) not marked");
            }
        }
        assert!(!tracker.is_written(0, 0));
        assert!(!tracker.is_written(3, 3));
        assert_eq!(tracker.written_count(), 6);
    }

    #[test]
    fn test_inverted_region_marks_top_left() {
        let mut tracker = MergeTracker::new(SectionKind::Body, extent(4, 4));
        tracker.mark_written(MergeRegion::new(2, 2, 1, 1));
        assert!(tracker.is_written(2, 2));
        assert_eq!(tracker.written_count(), 1);
    }

    #[test]
    fn test_negative_column_is_out_of_range() {
        assert!(matches!(
            output_column(0, -2),
            Err(ExportError::OutOfRange { row: 0, column: -2 })
        ));
        assert_eq!(output_column(0, 0).unwrap(), 1);
        assert!(output_column(0, i32::from(u16::MAX)).is_err());
    }
}
