use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Parser;
use pagecodec::Result;
use pagecodec::encoding::Encoding;
use pagecodec::file::FileReader;
use pagecodec::file::container::PageFileReader;
use pagecodec::page::decoder::ColumnPageDecoder;
use pagecodec::schema::Schema;
use pagecodec_bin::{LogArgs, exit_code, parse_or_usage};

const USAGE: &str = "Arguments: <page file>";

#[derive(Debug, Parser)]
#[clap(name = "pagecount")]
#[clap(version)]
#[clap(about = "Print page counts for each column of a page file", long_about = None)]
struct Cli {
    #[clap(flatten)]
    log: LogArgs,

    /// Page file to read.
    input: PathBuf,
}

#[derive(Debug, Default)]
struct ColumnCounts {
    pages: usize,
    rows: usize,
    nulls: usize,
    bytes: usize,
    encodings: Vec<Encoding>,
}

fn main() {
    let cli: Cli = parse_or_usage(USAGE);
    cli.log.init_logging();

    match run(&cli) {
        Ok(report) => print!("{report}"),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let mut reader = Box::new(PageFileReader::open(&cli.input)?);
    let schema = reader.schema().clone();

    let result = count_pages(reader.as_mut(), &schema);
    reader.close()?;
    let (row_groups, counts) = result?;

    Ok(format_report(&schema, row_groups, &counts))
}

/// Decode every page, counting pages, rows and nulls per column.
fn count_pages(reader: &mut dyn FileReader, schema: &Schema) -> Result<(usize, Vec<ColumnCounts>)> {
    let mut counts: Vec<ColumnCounts> = schema
        .columns()
        .iter()
        .map(|_| ColumnCounts::default())
        .collect();
    let mut row_groups = 0;

    while let Some(row_group) = reader.next_row_group()? {
        for (col_idx, pages) in row_group.columns.iter().enumerate() {
            let descr = schema.column(col_idx)?;
            let col = &mut counts[col_idx];

            for page in pages {
                let slots = ColumnPageDecoder::for_page(page, descr)
                    .and_then(|dec| dec.read_all())
                    .map_err(|e| e.in_column(row_groups, &descr.name))?;

                col.pages += 1;
                col.rows += slots.len();
                col.nulls += slots.iter().filter(|s| s.is_none()).count();
                col.bytes += page.len();
                if !page.is_empty() && !col.encodings.contains(&page.encoding) {
                    col.encodings.push(page.encoding);
                }
            }
        }
        row_groups += 1;
    }

    Ok((row_groups, counts))
}

fn format_report(schema: &Schema, row_groups: usize, counts: &[ColumnCounts]) -> String {
    let mut out = String::new();
    let rows = counts.first().map(|c| c.rows).unwrap_or(0);
    let _ = writeln!(out, "Row groups: {row_groups}, rows: {rows}");
    let _ = writeln!(
        out,
        "{:<24} {:<12} {:<12} {:>8} {:>12} {:>12} {:>12}",
        "column", "type", "encodings", "pages", "rows", "nulls", "bytes"
    );

    for (descr, col) in schema.columns().iter().zip(counts) {
        let encodings = col
            .encodings
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(
            out,
            "{:<24} {:<12} {:<12} {:>8} {:>12} {:>12} {:>12}",
            descr.name,
            descr.physical_type.to_string(),
            encodings,
            col.pages,
            col.rows,
            col.nulls,
            col.bytes
        );
    }

    out
}
