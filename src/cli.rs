use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_PAGES_PER_PART, PAGES_ENV, PRINTER_ENV};

#[derive(Parser)]
#[command(name = "pdfsplit")]
#[command(about = "Split PDF files into smaller chunks and optionally print them")]
#[command(version)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a PDF into parts of at most N pages
    Split(SplitArgs),

    /// Send PDF files to a printer, one job at a time
    Print {
        /// PDF files to print, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        printer: PrinterArgs,
    },

    /// List available printers, the default printer and print options
    #[command(alias = "list-printers")]
    Printers,

    /// Show whether a printer is available
    PrinterStatus {
        /// Printer name
        name: String,
    },

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Write one page range to a new PDF
    Extract {
        /// PDF file to extract from
        path: PathBuf,

        /// Inclusive page range (e.g., "9-16")
        pages: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run as MCP server over stdio
    Mcp,
}

#[derive(Args)]
pub struct SplitArgs {
    /// PDF file to split
    pub input: PathBuf,

    /// Number of pages per output file
    #[arg(
        short = 'n',
        long,
        env = PAGES_ENV,
        default_value_t = i64::from(DEFAULT_PAGES_PER_PART),
        allow_negative_numbers = true
    )]
    pub pages: i64,

    /// Output directory (default: same directory as the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Show the split plan without creating files
    #[arg(long)]
    pub preview: bool,

    /// Overwrite existing output files without asking
    #[arg(short, long)]
    pub force: bool,

    /// Succeed unless every part fails to write
    #[arg(long)]
    pub allow_partial: bool,

    /// Print the parts after splitting
    #[arg(long)]
    pub print: bool,

    #[command(flatten)]
    pub printer: PrinterArgs,
}

#[derive(Args)]
pub struct PrinterArgs {
    /// Printer name (uses the default printer if not specified)
    #[arg(short, long, env = PRINTER_ENV)]
    pub printer: Option<String>,

    /// Print options as key=value pairs (e.g., "sides=two-sided-long-edge,copies=2")
    #[arg(long)]
    pub print_options: Option<String>,
}
