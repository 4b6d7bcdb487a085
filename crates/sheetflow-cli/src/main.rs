//! sheetflow CLI - read shaped ranges from XLSX and CSV workbooks

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sheetflow::prelude::*;
use sheetflow::read_range;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetflow")]
#[command(
    author,
    version,
    about = "Read shape-typed ranges from XLSX and CSV workbooks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one range and print it as JSON
    Read {
        /// Workbook (xlsx, xlsm, csv file or directory of csv files)
        input: PathBuf,

        /// Sheet name (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Anchor cell in A1 notation
        #[arg(short, long, default_value = "A1")]
        at: String,

        /// scalar, row:N, col:N or matrix:RxC
        #[arg(long, default_value = "scalar")]
        shape: Shape,

        /// int, float, str, bool, date, datetime or any
        #[arg(short, long, default_value = "any")]
        dtype: LogicalType,

        /// Substitute defaults for cells that do not match the type
        #[arg(long)]
        lenient: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input workbook
        input: PathBuf,
    },

    /// Convert between A1 addresses and zero-based `row,col` pairs
    Addr {
        /// `B3` or `2,1`
        address: String,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Read {
            input,
            sheet,
            at,
            shape,
            dtype,
            lenient,
            pretty,
        } => {
            let range = RangeSpec::at(&at, shape, dtype)
                .with_context(|| format!("Invalid range at '{}'", at))?
                .with_strict(!lenient);
            read(&input, sheet.as_deref(), &range, pretty)
        }
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Addr { address } => {
            println!("{}", convert_address(&address)?);
            Ok(())
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings)
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read(input: &Path, sheet: Option<&str>, range: &RangeSpec, pretty: bool) -> Result<()> {
    let mut reader =
        FileReader::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    let name = match sheet {
        Some(name) => name.to_string(),
        None => reader
            .sheet_names()
            .into_iter()
            .next()
            .with_context(|| format!("'{}' has no sheets", input.display()))?,
    };
    let handle = reader
        .open_sheet(&name)
        .with_context(|| format!("Failed to open sheet '{}'", name))?;

    tracing::debug!(sheet = %name, shape = %range.shape(), dtype = %range.dtype(), "reading");
    let payload = read_range(&reader, handle, range)
        .with_context(|| format!("Failed to read {} at {}", range.shape(), range.start()))?;

    let json = if pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{}", json);
    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let reader =
        FileReader::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    for (i, name) in reader.sheet_names().iter().enumerate() {
        println!("{}: {}", i, name);
    }
    Ok(())
}

/// `B3` -> `2,1` and `2,1` -> `B3`
fn convert_address(address: &str) -> Result<String> {
    match address.split_once(',') {
        Some((row, col)) => {
            let row: i64 = row
                .trim()
                .parse()
                .with_context(|| format!("Invalid row '{}'", row.trim()))?;
            let col: i64 = col
                .trim()
                .parse()
                .with_context(|| format!("Invalid column '{}'", col.trim()))?;
            let pos = Position::checked(row, col)?;
            Ok(pos.to_a1_string())
        }
        None => {
            let pos = Position::parse(address.trim())?;
            Ok(format!("{},{}", pos.row, pos.col))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_arguments() {
        let cli = Cli::try_parse_from([
            "sheetflow", "read", "book.xlsx", "--at", "C2", "--shape", "matrix:2x3", "-d", "int",
        ])
        .unwrap();
        match cli.command {
            Commands::Read {
                at, shape, dtype, lenient, ..
            } => {
                assert_eq!(at, "C2");
                assert_eq!(shape, Shape::Matrix(2, 3));
                assert_eq!(dtype, LogicalType::Int);
                assert!(!lenient);
            }
            _ => panic!("expected read"),
        }
        assert!(Cli::try_parse_from(["sheetflow", "read", "x.csv", "--shape", "row:0"]).is_err());
    }

    #[test]
    fn test_convert_address() {
        assert_eq!(convert_address("B3").unwrap(), "2,1");
        assert_eq!(convert_address("2, 1").unwrap(), "B3");
        assert_eq!(convert_address("0,26").unwrap(), "AA1");
        assert!(convert_address("-1,0").is_err());
        assert!(convert_address("3B").is_err());
    }
}
