//! Drives a [`Document`] through a [`PartitionPlan`], one output file per range.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::naming::OutputIdentifier;
use crate::partition::{PartitionPlan, UnitRange};
use crate::pdf::Document;
use crate::storage::Storage;

/// When a split with some failed parts counts as failed overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any failed part fails the whole split.
    #[default]
    AnyFailed,
    /// Only fail when no part was written.
    AllFailed,
}

#[derive(Debug)]
pub struct SplitResult {
    /// 1-indexed position in the plan.
    pub index: usize,
    pub range: UnitRange,
    pub identifier: OutputIdentifier,
    /// Bytes written on success.
    pub outcome: Result<u64>,
}

impl SplitResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }
}

#[derive(Debug)]
pub struct SplitReport {
    pub results: Vec<SplitResult>,
}

impl SplitReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &SplitResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SplitResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.succeeded().map(|r| r.identifier.path()).collect()
    }

    pub fn is_failure(&self, policy: FailurePolicy) -> bool {
        let failed = self.failed().count();
        match policy {
            FailurePolicy::AnyFailed => failed > 0,
            FailurePolicy::AllFailed => failed == self.results.len(),
        }
    }
}

/// Write every range of `plan` to the matching identifier, in order.
///
/// A failed range is recorded and the next one is attempted. Once `cancel`
/// is set, ranges not yet started are recorded as [`Error::Cancelled`].
/// `on_progress` receives `(position, total, message)` before each range.
pub fn split<D, S, F>(
    document: &D,
    plan: &PartitionPlan,
    identifiers: &[OutputIdentifier],
    storage: &S,
    cancel: &AtomicBool,
    mut on_progress: F,
) -> Result<SplitReport>
where
    D: Document + ?Sized,
    S: Storage + ?Sized,
    F: FnMut(usize, usize, &str),
{
    if identifiers.len() != plan.len() {
        return Err(Error::InvariantViolation(format!(
            "{} output names for {} page ranges",
            identifiers.len(),
            plan.len()
        )));
    }

    let total = plan.len();
    let results = plan
        .iter()
        .zip(identifiers)
        .enumerate()
        .map(|(i, (&range, identifier))| {
            let index = i + 1;
            let outcome = if cancel.load(Ordering::Relaxed) {
                Err(Error::Cancelled)
            } else {
                on_progress(index, total, &format!("Creating part {} (pages {})", index, range));
                write_part(document, range, identifier, storage)
            };

            match &outcome {
                Ok(bytes) => info!(path = %identifier, pages = %range, bytes, "created part"),
                Err(e) => warn!(path = %identifier, pages = %range, error = %e, "part not written"),
            }

            SplitResult {
                index,
                range,
                identifier: identifier.clone(),
                outcome,
            }
        })
        .collect();

    Ok(SplitReport { results })
}

fn write_part<D, S>(
    document: &D,
    range: UnitRange,
    identifier: &OutputIdentifier,
    storage: &S,
) -> Result<u64>
where
    D: Document + ?Sized,
    S: Storage + ?Sized,
{
    let payload = document.extract_range(range)?;
    storage.write(&identifier.path(), &payload)?;
    Ok(payload.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NameResolver;
    use crate::partition::partition;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashMap};
    use std::path::Path;

    /// Each page serializes to one byte; listed ranges fail to extract.
    struct FakeDocument {
        pages: u32,
        broken: Vec<UnitRange>,
        extracted: RefCell<Vec<UnitRange>>,
    }

    impl FakeDocument {
        fn new(pages: u32) -> Self {
            FakeDocument {
                pages,
                broken: Vec::new(),
                extracted: RefCell::new(Vec::new()),
            }
        }
    }

    impl Document for FakeDocument {
        fn unit_count(&self) -> u32 {
            self.pages
        }

        fn extract_range(&self, range: UnitRange) -> Result<Vec<u8>> {
            self.extracted.borrow_mut().push(range);
            if self.broken.contains(&range) {
                return Err(Error::Extract {
                    range,
                    reason: "damaged page".to_string(),
                });
            }
            Ok((range.start()..=range.end()).map(|p| p as u8).collect())
        }

        fn metadata(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }

        fn is_encrypted(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        files: RefCell<HashMap<PathBuf, Vec<u8>>>,
        read_only: Vec<PathBuf>,
    }

    impl Storage for MemoryStorage {
        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path)
        }

        fn write(&self, path: &Path, payload: &[u8]) -> Result<()> {
            if self.read_only.iter().any(|p| p == path) {
                return Err(Error::Write {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), payload.to_vec());
            Ok(())
        }
    }

    fn setup(pages: u32, cap: u32) -> (PartitionPlan, Vec<OutputIdentifier>) {
        let plan = partition(pages, cap).unwrap();
        let ids = NameResolver::new("doc", "out").generate(&plan);
        (plan, ids)
    }

    #[test]
    fn test_split_writes_every_range() {
        let (plan, ids) = setup(20, 8);
        let doc = FakeDocument::new(20);
        let storage = MemoryStorage::default();

        let report = split(&doc, &plan, &ids, &storage, &AtomicBool::new(false), |_, _, _| {});
        let report = report.unwrap();

        assert_eq!(report.results.len(), 3);
        assert!(!report.is_failure(FailurePolicy::AnyFailed));
        let files = storage.files.borrow();
        assert_eq!(files[Path::new("out/doc_part_001.pdf")], (1..=8).collect::<Vec<u8>>());
        assert_eq!(files[Path::new("out/doc_part_003.pdf")], vec![17, 18, 19, 20]);
        assert_eq!(*report.results[2].outcome.as_ref().unwrap(), 4);
    }

    #[test]
    fn test_failed_extraction_does_not_stop_later_ranges() {
        let (plan, ids) = setup(20, 8);
        let mut doc = FakeDocument::new(20);
        doc.broken.push(UnitRange::new(9, 16).unwrap());
        let storage = MemoryStorage::default();

        let report = split(&doc, &plan, &ids, &storage, &AtomicBool::new(false), |_, _, _| {});
        let report = report.unwrap();

        let flags: Vec<bool> = report.results.iter().map(SplitResult::is_success).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert!(matches!(report.results[1].error(), Some(Error::Extract { .. })));
        assert!(!storage.exists(Path::new("out/doc_part_002.pdf")));
        assert!(storage.exists(Path::new("out/doc_part_003.pdf")));

        assert!(report.is_failure(FailurePolicy::AnyFailed));
        assert!(!report.is_failure(FailurePolicy::AllFailed));
        assert_eq!(report.written_paths().len(), 2);
    }

    #[test]
    fn test_write_failure_is_recorded_per_part() {
        let (plan, ids) = setup(9, 3);
        let doc = FakeDocument::new(9);
        let storage = MemoryStorage {
            read_only: vec![PathBuf::from("out/doc_part_001.pdf")],
            ..Default::default()
        };

        let report = split(&doc, &plan, &ids, &storage, &AtomicBool::new(false), |_, _, _| {});
        let report = report.unwrap();

        let message = report.results[0].error().unwrap().to_string();
        assert!(message.contains("doc_part_001.pdf"));
        assert!(report.results[1].is_success());
        assert!(report.results[2].is_success());
    }

    #[test]
    fn test_all_failed_policy() {
        let (plan, ids) = setup(4, 2);
        let mut doc = FakeDocument::new(4);
        doc.broken = plan.iter().copied().collect();
        let storage = MemoryStorage::default();

        let report = split(&doc, &plan, &ids, &storage, &AtomicBool::new(false), |_, _, _| {});
        let report = report.unwrap();
        assert!(report.is_failure(FailurePolicy::AllFailed));
    }

    #[test]
    fn test_identifier_count_mismatch_fails_fast() {
        let (plan, mut ids) = setup(20, 8);
        ids.pop();
        let doc = FakeDocument::new(20);
        let storage = MemoryStorage::default();

        let result = split(&doc, &plan, &ids, &storage, &AtomicBool::new(false), |_, _, _| {});
        let err = result.unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(doc.extracted.borrow().is_empty());
        assert!(storage.files.borrow().is_empty());
    }

    #[test]
    fn test_ranges_processed_in_order_with_progress() {
        let (plan, ids) = setup(10, 3);
        let doc = FakeDocument::new(10);
        let storage = MemoryStorage::default();
        let mut events = Vec::new();

        split(&doc, &plan, &ids, &storage, &AtomicBool::new(false), |i, total, msg| {
            events.push((i, total, msg.to_string()));
        })
        .unwrap();

        assert_eq!(*doc.extracted.borrow(), plan.iter().copied().collect::<Vec<_>>());
        assert_eq!(
            events,
            vec![
                (1, 4, "Creating part 1 (pages 1-3)".to_string()),
                (2, 4, "Creating part 2 (pages 4-6)".to_string()),
                (3, 4, "Creating part 3 (pages 7-9)".to_string()),
                (4, 4, "Creating part 4 (pages 10-10)".to_string()),
            ]
        );
    }

    #[test]
    fn test_cancel_marks_remaining_parts() {
        let (plan, ids) = setup(9, 3);
        let doc = FakeDocument::new(9);
        let storage = MemoryStorage::default();
        let cancel = AtomicBool::new(false);

        let report = split(&doc, &plan, &ids, &storage, &cancel, |i, _, _| {
            if i == 1 {
                cancel.store(true, Ordering::Relaxed);
            }
        })
        .unwrap();

        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].is_success());
        assert!(matches!(report.results[1].error(), Some(Error::Cancelled)));
        assert!(matches!(report.results[2].error(), Some(Error::Cancelled)));
        assert_eq!(doc.extracted.borrow().len(), 1);
    }
}
