use crate::partition::UnitRange;
use crate::pdf::{Document, PdfDocument};
use crate::storage::{FsStorage, Storage};
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, pages: &str, output: Q) -> Result<()> {
    let doc = PdfDocument::open(&input)?;
    let range = UnitRange::parse(pages)?;
    range.check_within(doc.unit_count())?;

    let payload = doc.extract_range(range)?;
    FsStorage.write(output.as_ref(), &payload)?;

    println!(
        "Extracted {} page(s) to {}",
        range.page_count(),
        output.as_ref().display()
    );

    Ok(())
}
