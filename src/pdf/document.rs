use lopdf::{Document as LopdfDocument, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::Document;
use crate::error::{Error, Result};
use crate::partition::UnitRange;

/// Info dictionary keys reported by [`Document::metadata`].
const METADATA_KEYS: [&str; 5] = ["Title", "Author", "Creator", "Subject", "Producer"];

pub struct PdfDocument {
    pub doc: LopdfDocument,
    pub path: PathBuf,
    file_size: u64,
}

impl PdfDocument {
    /// Load a PDF, refusing documents without pages.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| Error::Load {
            path: path.to_path_buf(),
            reason,
        };

        let file_size = std::fs::metadata(path)
            .map_err(|e| load_error(e.to_string()))?
            .len();
        let doc = LopdfDocument::load(path).map_err(|e| load_error(e.to_string()))?;

        let pdf = PdfDocument {
            doc,
            path: path.to_path_buf(),
            file_size,
        };
        if pdf.unit_count() == 0 {
            return Err(load_error("document has no pages".to_string()));
        }

        tracing::info!(path = %path.display(), pages = pdf.unit_count(), "loaded PDF");
        Ok(pdf)
    }

    /// Get 1-indexed page object IDs
    pub fn page_ids(&self) -> Vec<(u32, ObjectId)> {
        let mut pages: Vec<_> = self.doc.get_pages().into_iter().collect();
        pages.sort_by_key(|(num, _)| *num);
        pages
    }

    pub fn file_size_mb(&self) -> f64 {
        self.file_size as f64 / (1024.0 * 1024.0)
    }

    pub fn get_info(&self) -> PdfInfo {
        PdfInfo {
            page_count: self.unit_count(),
            encrypted: self.is_encrypted(),
            file_size_mb: self.file_size_mb(),
            metadata: self.metadata(),
        }
    }

    /// Copy the pages of `range` into a new document. Unused objects are
    /// pruned so each part only carries what its pages reference.
    pub fn extract_pages(&self, range: UnitRange) -> Result<LopdfDocument> {
        let all_pages = self.page_ids();
        let total = all_pages.len() as u32;
        range.check_within(total).map_err(|e| Error::Extract {
            range,
            reason: e.to_string(),
        })?;

        let pages_to_delete: Vec<u32> = all_pages
            .iter()
            .map(|(num, _)| *num)
            .filter(|num| *num < range.start() || *num > range.end())
            .collect();

        let mut new_doc = self.doc.clone();
        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
            drop_dangling_kids(&mut new_doc);
            new_doc.prune_objects();
        }

        let kept = new_doc.get_pages().len() as u32;
        if kept != range.page_count() {
            return Err(Error::Extract {
                range,
                reason: format!("expected {} pages, got {}", range.page_count(), kept),
            });
        }
        Ok(new_doc)
    }

    fn info_dictionary(&self) -> Option<&lopdf::Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(info_ref) => self.doc.get_dictionary(*info_ref).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl Document for PdfDocument {
    fn unit_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    fn extract_range(&self, range: UnitRange) -> Result<Vec<u8>> {
        let mut part = self.extract_pages(range)?;
        let mut bytes = Vec::new();
        part.save_to(&mut bytes).map_err(|e| Error::Extract {
            range,
            reason: e.to_string(),
        })?;
        Ok(bytes)
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        let dict = self.info_dictionary();
        METADATA_KEYS
            .iter()
            .map(|key| {
                let value = dict
                    .and_then(|d| get_string_from_dict(d, key.as_bytes()))
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string());
                (key.to_string(), value)
            })
            .collect()
    }

    fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted() || self.doc.encryption_state.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PdfInfo {
    pub page_count: u32,
    pub encrypted: bool,
    pub file_size_mb: f64,
    /// Always holds every key in `METADATA_KEYS`; missing values are "Unknown".
    pub metadata: BTreeMap<String, String>,
}

/// `delete_pages` removes page objects but leaves their references in the
/// parent `Kids` arrays, which later page-tree walks count against their limit.
fn drop_dangling_kids(doc: &mut LopdfDocument) {
    let live: HashSet<ObjectId> = doc.objects.keys().copied().collect();
    for object in doc.objects.values_mut() {
        let Ok(dict) = object.as_dict_mut() else {
            continue;
        };
        if !matches!(dict.get_type(), Ok(b"Pages")) {
            continue;
        }
        if let Ok(kids) = dict.get_mut(b"Kids").and_then(Object::as_array_mut) {
            kids.retain(|kid| kid.as_reference().map_or(true, |id| live.contains(&id)));
        }
    }
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // UTF-16BE with BOM, otherwise PDFDocEncoding treated as Latin-1
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}
