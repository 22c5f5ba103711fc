pub mod document;

pub use document::PdfDocument;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::partition::UnitRange;

/// A paged source that can be cut into independent files.
pub trait Document {
    fn unit_count(&self) -> u32;

    /// Serialize the pages of `range` as a standalone file.
    fn extract_range(&self, range: UnitRange) -> Result<Vec<u8>>;

    /// Best-effort descriptive fields; missing values read "Unknown".
    fn metadata(&self) -> BTreeMap<String, String>;

    fn is_encrypted(&self) -> bool;
}
