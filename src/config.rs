//! Defaults shared by the CLI and the MCP server.

/// Pages per output file when `--pages` is not given.
pub const DEFAULT_PAGES_PER_PART: u32 = 8;

/// Placed between the input stem and the part number.
pub const PART_INFIX: &str = "_part_";

/// Part numbers are zero-padded to this many digits.
pub const PART_INDEX_WIDTH: usize = 3;

/// Extension of every generated file, and the only one accepted for printing.
pub const OUTPUT_EXTENSION: &str = "pdf";

/// How many conflicting files the overwrite prompt lists by name.
pub const CONFLICT_LIST_LIMIT: usize = 5;

/// Environment variable consulted for `--pages`.
pub const PAGES_ENV: &str = "PDFSPLIT_PAGES";

/// Environment variable consulted for `--printer`.
pub const PRINTER_ENV: &str = "PDFSPLIT_PRINTER";

/// Returns true if `path` carries the accepted output extension, ignoring case.
pub fn has_pdf_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION))
}
