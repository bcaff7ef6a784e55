//! schedule_xlsx CLI - Export a schedule to an XLSX workbook
//!
//! Usage: schedule_xlsx schedule.json output.xlsx [--sections header,body] [--title "Doors"]

use clap::Parser;
use schedule_xlsx::{
    export, export_to_sink, CsvGrid, ExportOptions, ExportSummary, GridSource, RecordingSink,
    Result, Schedule, SectionKind, DEFAULT_SUBJECT,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "schedule_xlsx")]
#[command(version)]
#[command(about = "Export a schedule grid to an XLSX workbook")]
#[command(
    long_about = "Exports a schedule (JSON document or plain CSV) to one Excel worksheet:\n\
    - Merged areas -> merged ranges, written once\n\
    - Numeric text -> Excel numbers (leading zeros stay text)\n\
    - Fonts, colors and alignment -> cell formats\n\
    - Column widths -> scaled Excel column widths"
)]
struct Args {
    /// Input schedule path (.csv for a plain grid, otherwise a JSON schedule)
    input: PathBuf,

    /// Output XLSX file path (replaced if it exists)
    output: PathBuf,

    /// Worksheet name (default: output file name)
    #[arg(short, long)]
    title: Option<String>,

    /// Workbook author (default: current user)
    #[arg(short, long)]
    author: Option<String>,

    /// Workbook subject
    #[arg(long, default_value = DEFAULT_SUBJECT)]
    subject: String,

    /// Sections to export, in order (header, body)
    #[arg(long, value_delimiter = ',', default_value = "body", value_parser = parse_section)]
    sections: Vec<SectionKind>,

    /// Traverse the schedule without writing a file
    #[arg(long)]
    dry_run: bool,

    /// Show progress information
    #[arg(short, long)]
    verbose: bool,
}

fn parse_section(s: &str) -> std::result::Result<SectionKind, String> {
    SectionKind::parse(s).ok_or_else(|| format!("unknown section '{}' (expected header or body)", s))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "schedule_xlsx=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_grid(path: &Path) -> Result<Box<dyn GridSource>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(Box::new(CsvGrid::open(path)?))
    } else {
        Ok(Box::new(Schedule::open(path)?))
    }
}

fn run(args: &Args) -> Result<ExportSummary> {
    let grid = load_grid(&args.input)?;

    let options = ExportOptions {
        title: args.title.clone(),
        author: args.author.clone(),
        subject: args.subject.clone(),
        sections: args.sections.clone(),
    };

    if args.dry_run {
        let mut sink = RecordingSink::new();
        export_to_sink(grid.as_ref(), &options, &mut sink)
    } else {
        export(grid.as_ref(), &args.output, &options)
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        eprintln!("schedule_xlsx - schedule to XLSX export");
        eprintln!("Input:  {}", args.input.display());
        eprintln!("Output: {}", args.output.display());
    }

    let start = Instant::now();

    match run(&args) {
        Ok(summary) => {
            if args.verbose {
                eprintln!(
                    "Exported {} rows, {} cells, {} merges in {:.2}s",
                    summary.rows,
                    summary.cells,
                    summary.merges,
                    start.elapsed().as_secs_f64()
                );
            }
            println!("OK {} {} {}", summary.rows, summary.cells, summary.merges);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_flag() {
        let args =
            Args::try_parse_from(["schedule_xlsx", "in.json", "out.xlsx", "--sections", "header,Body"])
                .unwrap();
        assert_eq!(args.sections, vec![SectionKind::Header, SectionKind::Body]);

        let args = Args::try_parse_from(["schedule_xlsx", "in.json", "out.xlsx"]).unwrap();
        assert_eq!(args.sections, vec![SectionKind::Body]);

        assert!(Args::try_parse_from(["schedule_xlsx", "a", "b", "--sections", "footer"]).is_err());
    }
}
