use schedule_xlsx::{
    export, export_with, CsvGrid, ExportError, ExportOptions, OutputSink, RecordingSink, Schedule,
    SectionKind, XlsxSink,
};
use std::fs;

const SCHEDULE: &str = r##"{
    "name": "Room Finish Schedule",
    "header": {
        "row_count": 1,
        "column_count": 3,
        "cells": [{"row": 0, "column": 0, "text": "Room Finish Schedule",
                   "style": {"bold": true, "text_size": "14", "horizontal": "center"}}],
        "merges": [{"top": 0, "left": 0, "bottom": 0, "right": 2}]
    },
    "body": {
        "row_count": 3,
        "column_count": 3,
        "column_widths": [0.08, 0.2, 0.1],
        "default_style": {"font_name": "Calibri", "vertical": "middle"},
        "cells": [
            {"row": 0, "column": 0, "text": "Number"},
            {"row": 0, "column": 1, "text": "Name"},
            {"row": 0, "column": 2, "text": "Area"},
            {"row": 1, "column": 0, "text": "101"},
            {"row": 1, "column": 1, "text": "Lobby"},
            {"row": 1, "column": 2, "text": "42.5"},
            {"row": 2, "column": 0, "text": "Grand total: 1",
             "style": {"background_color": "#F2F2F2"}}
        ],
        "merges": [{"top": 2, "left": 0, "bottom": 2, "right": 2}]
    }
}"##;

fn is_zip(path: &std::path::Path) -> bool {
    fs::read(path)
        .map(|bytes| bytes.starts_with(b"PK"))
        .unwrap_or(false)
}

#[test]
fn test_export_schedule_writes_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rooms.xlsx");
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();
    let options = ExportOptions {
        sections: vec![SectionKind::Header, SectionKind::Body],
        author: Some("tester".to_string()),
        ..ExportOptions::default()
    };

    let summary = export(&schedule, &path, &options).unwrap();

    assert!(is_zip(&path));
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.merges, 2);
    // header anchor + 6 body cells + totals anchor
    assert_eq!(summary.cells, 8);
    assert_eq!(summary.columns, 3);
}

#[test]
fn test_export_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doors.xlsx");
    fs::write(&path, b"stale contents").unwrap();

    let grid = CsvGrid::from_reader("Mark,Width\nD1,0.9\nD2,1.2\n".as_bytes()).unwrap();
    let summary = export(&grid, &path, &ExportOptions::default()).unwrap();

    assert_eq!(summary.cells, 6);
    assert!(is_zip(&path));
}

#[test]
fn test_export_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.xlsx");
    let grid = CsvGrid::from_reader("a,b\n".as_bytes()).unwrap();

    let result = export(&grid, &path, &ExportOptions::default());

    assert!(matches!(result, Err(ExportError::CreateOutput { .. })));
    assert!(!path.exists());
}

#[test]
fn test_failed_export_removes_partial_file() {
    struct FailingSink(XlsxSink);

    impl OutputSink for FailingSink {
        fn set_sheet_name(&mut self, name: &str) -> schedule_xlsx::Result<()> {
            self.0.set_sheet_name(name)
        }
        fn write_cell(
            &mut self,
            cell: schedule_xlsx::OutputCell,
            value: &schedule_xlsx::CellValue,
            format: &schedule_xlsx::CellFormat,
        ) -> schedule_xlsx::Result<()> {
            if cell.row > 1 {
                return Err(ExportError::InvalidSchedule("sink refused row".to_string()));
            }
            self.0.write_cell(cell, value, format)
        }
        fn merge_range(&mut self, range: schedule_xlsx::OutputRange) -> schedule_xlsx::Result<()> {
            self.0.merge_range(range)
        }
        fn set_column_width(&mut self, column: u16, width: f64) -> schedule_xlsx::Result<()> {
            self.0.set_column_width(column, width)
        }
        fn set_properties(
            &mut self,
            properties: &schedule_xlsx::WorkbookProperties,
        ) -> schedule_xlsx::Result<()> {
            self.0.set_properties(properties)
        }
        fn save<W: std::io::Write + std::io::Seek + Send>(
            &mut self,
            writer: W,
        ) -> schedule_xlsx::Result<()> {
            self.0.save(writer)
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.xlsx");
    fs::write(&path, b"previous export").unwrap();
    let grid = CsvGrid::from_reader("a\nb\n".as_bytes()).unwrap();
    let mut sink = FailingSink(XlsxSink::new());

    let result = export_with(&grid, &path, &ExportOptions::default(), &mut sink);

    assert!(matches!(result, Err(ExportError::InvalidSchedule(_))));
    assert!(!path.exists());
}

#[test]
fn test_export_title_becomes_sheet_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.xlsx");
    let grid = CsvGrid::from_reader("x\n".as_bytes()).unwrap();
    let options = ExportOptions {
        title: Some("Doors [Level 1]".to_string()),
        ..ExportOptions::default()
    };

    let mut sink = RecordingSink::new();
    export_with(&grid, &path, &options, &mut sink).unwrap();
    assert_eq!(sink.sheet_name.as_deref(), Some("Doors _Level 1_"));
    assert_eq!(sink.properties.as_ref().map(|p| p.title.as_str()), Some("schedule"));
    assert!(sink.saved);

    export(&grid, &path, &options).unwrap();
    assert!(is_zip(&path));
}
