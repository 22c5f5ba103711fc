//! Sending finished files to a printer.
//!
//! Platform differences live behind [`PrintService`]. [`platform_service`]
//! picks the adapters once at startup; nothing else looks at the OS.

pub mod cups;
pub mod options;
pub mod windows;

pub use options::PrintOptions;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::has_pdf_extension;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Availability of a single printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkStatus {
    pub name: String,
    pub available: bool,
    /// "idle", "disabled", "unknown" or "not found".
    pub status: String,
}

impl SinkStatus {
    pub fn unknown(name: &str) -> Self {
        SinkStatus {
            name: name.to_string(),
            available: true,
            status: "unknown".to_string(),
        }
    }
}

pub trait PrintService {
    /// Short label for the backend, shown by `printers`.
    fn name(&self) -> String;

    fn list_sinks(&self) -> Result<Vec<String>>;

    fn default_sink(&self) -> Result<Option<String>>;

    /// Queue `path` on `sink`, or on the default printer when `None`.
    /// Returns a status line for the user.
    fn submit(&self, path: &Path, sink: Option<&str>, options: &PrintOptions) -> Result<String>;

    fn sink_status(&self, sink: &str) -> Result<SinkStatus> {
        Ok(SinkStatus::unknown(sink))
    }
}

/// Tries each adapter in order; the first one that can run here answers.
///
/// Queries move on after any error. A submission only moves on when the
/// adapter is unavailable, so a rejected job is never queued twice.
pub struct FallbackPrintService {
    adapters: Vec<Box<dyn PrintService + Send + Sync>>,
}

impl FallbackPrintService {
    pub fn new(adapters: Vec<Box<dyn PrintService + Send + Sync>>) -> Self {
        FallbackPrintService { adapters }
    }

    fn first_success<T>(
        &self,
        what: &str,
        mut op: impl FnMut(&dyn PrintService) -> Result<T>,
        retry: impl Fn(&Error) -> bool,
    ) -> Result<T> {
        let mut last_error =
            Error::PrintUnavailable(format!("no print backend configured for {}", what));
        for adapter in &self.adapters {
            match op(adapter.as_ref()) {
                Ok(value) => return Ok(value),
                Err(e) if retry(&e) => {
                    debug!(
                        backend = %adapter.name(),
                        error = %e,
                        "{} failed, trying next backend",
                        what
                    );
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }
}

impl PrintService for FallbackPrintService {
    fn name(&self) -> String {
        self.adapters
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn list_sinks(&self) -> Result<Vec<String>> {
        self.first_success("listing printers", |a| a.list_sinks(), |_| true)
    }

    fn default_sink(&self) -> Result<Option<String>> {
        self.first_success("finding the default printer", |a| a.default_sink(), |_| true)
    }

    fn submit(&self, path: &Path, sink: Option<&str>, options: &PrintOptions) -> Result<String> {
        self.first_success(
            "printing",
            |a| a.submit(path, sink, options),
            |e| matches!(e, Error::PrintUnavailable(_)),
        )
    }

    fn sink_status(&self, sink: &str) -> Result<SinkStatus> {
        self.first_success("checking printer status", |a| a.sink_status(sink), |_| true)
    }
}

/// Stand-in for operating systems without a print adapter.
pub struct UnsupportedPlatform {
    pub os: &'static str,
}

impl PrintService for UnsupportedPlatform {
    fn name(&self) -> String {
        format!("unsupported ({})", self.os)
    }

    fn list_sinks(&self) -> Result<Vec<String>> {
        Err(Error::PrintUnavailable(format!("printing not supported on {}", self.os)))
    }

    fn default_sink(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn submit(&self, path: &Path, _sink: Option<&str>, _options: &PrintOptions) -> Result<String> {
        Err(Error::Print {
            path: path.to_path_buf(),
            reason: format!("printing not supported on {}", self.os),
        })
    }
}

/// The print backends for the running OS.
pub fn platform_service() -> Box<dyn PrintService + Send + Sync> {
    let os = std::env::consts::OS;
    if cfg!(windows) {
        Box::new(FallbackPrintService::new(vec![Box::new(
            windows::PowerShellService,
        )]))
    } else if cfg!(unix) {
        Box::new(FallbackPrintService::new(vec![
            Box::new(cups::CupsService::lpr()),
            Box::new(cups::CupsService::lp()),
        ]))
    } else {
        Box::new(UnsupportedPlatform { os })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOutcome {
    pub success: bool,
    pub message: String,
}

impl PrintOutcome {
    fn sent(message: String) -> Self {
        PrintOutcome {
            success: true,
            message,
        }
    }

    fn failed(error: &Error) -> Self {
        PrintOutcome {
            success: false,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintEntry {
    pub path: PathBuf,
    pub outcome: PrintOutcome,
}

/// One entry per input file, in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct PrintReport {
    pub entries: Vec<PrintEntry>,
}

impl PrintReport {
    pub fn sent_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &PrintEntry> {
        self.entries.iter().filter(|e| !e.outcome.success)
    }
}

/// Submit each file in turn, whatever happened to the previous one.
///
/// Files that are missing or not PDFs are recorded without reaching the
/// print service. After `cancel` is set, remaining files are recorded as
/// cancelled.
pub fn print_all<P, S, F>(
    service: &P,
    storage: &S,
    paths: &[PathBuf],
    sink: Option<&str>,
    options: &PrintOptions,
    cancel: &AtomicBool,
    mut on_progress: F,
) -> PrintReport
where
    P: PrintService + ?Sized,
    S: Storage + ?Sized,
    F: FnMut(usize, usize, &str),
{
    let total = paths.len();
    let entries = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let result = if cancel.load(Ordering::Relaxed) {
                Err(Error::Cancelled)
            } else {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                on_progress(i + 1, total, &format!("Printing {}", name));
                submit_one(service, storage, path, sink, options)
            };

            let outcome = match result {
                Ok(message) => {
                    info!(path = %path.display(), "{}", message);
                    PrintOutcome::sent(message)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "print failed");
                    PrintOutcome::failed(&e)
                }
            };
            PrintEntry {
                path: path.clone(),
                outcome,
            }
        })
        .collect();

    PrintReport { entries }
}

fn submit_one<P, S>(
    service: &P,
    storage: &S,
    path: &Path,
    sink: Option<&str>,
    options: &PrintOptions,
) -> Result<String>
where
    P: PrintService + ?Sized,
    S: Storage + ?Sized,
{
    if !storage.exists(path) {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    if !has_pdf_extension(path) {
        return Err(Error::UnsupportedFormat(path.to_path_buf()));
    }
    service.submit(path, sink, options)
}

pub(crate) enum CommandFailure {
    /// The program is not installed or not on PATH.
    Missing,
    /// It ran and reported an error.
    Failed(String),
}

/// Run `program` and return its stdout, treating a non-zero exit as failure.
pub(crate) fn run_command(
    program: &str,
    args: &[OsString],
) -> std::result::Result<String, CommandFailure> {
    debug!(program, ?args, "running print command");
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CommandFailure::Missing
        } else {
            CommandFailure::Failed(format!("{}: {}", program, e))
        }
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        Err(CommandFailure::Failed(if detail.is_empty() {
            format!("{} exited with {}", program, output.status)
        } else {
            format!("{}: {}", program, detail)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Records submissions; fails those listed in `rejects`.
    #[derive(Default)]
    struct FakePrinter {
        submitted: RefCell<Vec<PathBuf>>,
        rejects: Vec<PathBuf>,
    }

    impl PrintService for FakePrinter {
        fn name(&self) -> String {
            "fake".to_string()
        }

        fn list_sinks(&self) -> Result<Vec<String>> {
            Ok(vec!["Office".to_string()])
        }

        fn default_sink(&self) -> Result<Option<String>> {
            Ok(Some("Office".to_string()))
        }

        fn submit(
            &self,
            path: &Path,
            sink: Option<&str>,
            _options: &PrintOptions,
        ) -> Result<String> {
            self.submitted.borrow_mut().push(path.to_path_buf());
            if self.rejects.iter().any(|p| p == path) {
                return Err(Error::Print {
                    path: path.to_path_buf(),
                    reason: "printer offline".to_string(),
                });
            }
            Ok(format!("Sent to printer: {}", sink.unwrap_or("default")))
        }
    }

    struct Files(HashSet<PathBuf>);

    impl Storage for Files {
        fn exists(&self, path: &Path) -> bool {
            self.0.contains(path)
        }

        fn write(&self, _path: &Path, _payload: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    fn parts() -> (Vec<PathBuf>, Files) {
        let paths: Vec<PathBuf> = (1..=3)
            .map(|i| PathBuf::from(format!("out/doc_part_{:03}.pdf", i)))
            .collect();
        let files = Files(paths.iter().cloned().collect());
        (paths, files)
    }

    #[test]
    fn test_failure_does_not_stop_the_queue() {
        let (paths, files) = parts();
        let printer = FakePrinter {
            rejects: vec![paths[1].clone()],
            ..Default::default()
        };

        let report = print_all(
            &printer,
            &files,
            &paths,
            Some("Office"),
            &PrintOptions::new(),
            &AtomicBool::new(false),
            |_, _, _| {},
        );

        assert_eq!(*printer.submitted.borrow(), paths);
        let flags: Vec<bool> = report.entries.iter().map(|e| e.outcome.success).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(report.sent_count(), 2);
        assert_eq!(report.entries[0].outcome.message, "Sent to printer: Office");
        assert!(report.entries[1].outcome.message.contains("printer offline"));
    }

    #[test]
    fn test_missing_and_non_pdf_files_skip_the_printer() {
        let printer = FakePrinter::default();
        let notes = PathBuf::from("out/notes.txt");
        let gone = PathBuf::from("out/gone.pdf");
        let files = Files([notes.clone()].into());

        let report = print_all(
            &printer,
            &files,
            &[gone.clone(), notes.clone()],
            None,
            &PrintOptions::new(),
            &AtomicBool::new(false),
            |_, _, _| {},
        );

        assert!(printer.submitted.borrow().is_empty());
        assert_eq!(report.entries.len(), 2);
        assert!(report.entries[0].outcome.message.starts_with("File not found"));
        assert!(report.entries[1].outcome.message.starts_with("Only PDF files"));
    }

    #[test]
    fn test_progress_reports_each_file() {
        let (paths, files) = parts();
        let printer = FakePrinter::default();
        let mut events = Vec::new();

        print_all(
            &printer,
            &files,
            &paths,
            None,
            &PrintOptions::new(),
            &AtomicBool::new(false),
            |i, total, msg| events.push((i, total, msg.to_string())),
        );

        assert_eq!(events[0], (1, 3, "Printing doc_part_001.pdf".to_string()));
        assert_eq!(events[2], (3, 3, "Printing doc_part_003.pdf".to_string()));
    }

    #[test]
    fn test_cancel_records_remaining_files() {
        let (paths, files) = parts();
        let printer = FakePrinter::default();
        let cancel = AtomicBool::new(false);

        let report = print_all(
            &printer,
            &files,
            &paths,
            None,
            &PrintOptions::new(),
            &cancel,
            |i, _, _| {
                if i == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            },
        );

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.sent_count(), 2);
        assert_eq!(report.entries[2].outcome.message, "Cancelled before processing");
    }

    /// Adapter with a fixed answer.
    struct Scripted {
        name: &'static str,
        answer: fn(&Path) -> Result<String>,
    }

    impl Scripted {
        fn new(name: &'static str, answer: fn(&Path) -> Result<String>) -> Self {
            Scripted { name, answer }
        }
    }

    impl PrintService for Scripted {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn list_sinks(&self) -> Result<Vec<String>> {
            (self.answer)(Path::new("")).map(|s| vec![s])
        }

        fn default_sink(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn submit(
            &self,
            path: &Path,
            _sink: Option<&str>,
            _options: &PrintOptions,
        ) -> Result<String> {
            (self.answer)(path)
        }
    }

    fn unavailable(_: &Path) -> Result<String> {
        Err(Error::PrintUnavailable("lpr not installed".to_string()))
    }

    fn rejected(path: &Path) -> Result<String> {
        Err(Error::Print {
            path: path.to_path_buf(),
            reason: "queue paused".to_string(),
        })
    }

    fn accepted(_: &Path) -> Result<String> {
        Ok("second".to_string())
    }

    #[test]
    fn test_fallback_skips_unavailable_backend() {
        let service = FallbackPrintService::new(vec![
            Box::new(Scripted::new("first", unavailable)),
            Box::new(Scripted::new("second", accepted)),
        ]);
        let message = service
            .submit(Path::new("a.pdf"), None, &PrintOptions::new())
            .unwrap();
        assert_eq!(message, "second");
        assert_eq!(service.name(), "first, second");
    }

    #[test]
    fn test_fallback_does_not_resubmit_rejected_job() {
        let service = FallbackPrintService::new(vec![
            Box::new(Scripted::new("first", rejected)),
            Box::new(Scripted::new("second", accepted)),
        ]);
        let err = service
            .submit(Path::new("a.pdf"), None, &PrintOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Print { .. }));
    }

    #[test]
    fn test_fallback_queries_move_on_after_any_error() {
        let service = FallbackPrintService::new(vec![
            Box::new(Scripted::new("first", rejected)),
            Box::new(Scripted::new("second", accepted)),
        ]);
        assert_eq!(service.list_sinks().unwrap(), vec!["second".to_string()]);
    }

    #[test]
    fn test_fallback_with_nothing_available() {
        let service = FallbackPrintService::new(vec![Box::new(Scripted::new("only", unavailable))]);
        let err = service.list_sinks().unwrap_err();
        assert!(matches!(err, Error::PrintUnavailable(_)));
    }
}
