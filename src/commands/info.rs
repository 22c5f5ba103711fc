use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let doc = PdfDocument::open(&path)?;
    let info = doc.get_info();

    println!("File: {}", doc.path.display());
    println!("Pages: {}", info.page_count);
    println!("Size: {:.2} MB", info.file_size_mb);
    println!("Encrypted: {}", if info.encrypted { "yes" } else { "no" });

    for (key, value) in &info.metadata {
        println!("{}: {}", key, value);
    }

    Ok(())
}
