use anyhow::Result;
use console::style;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use super::{confirm, progress_bar, report_progress};
use crate::cli::PrinterArgs;
use crate::print::options::parse_print_options;
use crate::print::{platform_service, print_all, PrintReport, PrintService};
use crate::storage::FsStorage;

pub fn run(files: &[PathBuf], printer: &PrinterArgs, cancel: &AtomicBool) -> Result<()> {
    let Some(report) = print_files(files, printer, cancel)? else {
        return Ok(());
    };

    let failed = report.failed().count();
    if failed > 0 {
        anyhow::bail!("{} of {} print jobs failed", failed, report.entries.len());
    }
    Ok(())
}

/// Print `files` in order and show the per-file results.
///
/// Returns `None` when the user declined to fall back to the default printer.
pub fn print_files(
    files: &[PathBuf],
    printer: &PrinterArgs,
    cancel: &AtomicBool,
) -> Result<Option<PrintReport>> {
    let options = match &printer.print_options {
        Some(s) => parse_print_options(s)?,
        None => Default::default(),
    };

    println!("\nInitializing printer...");
    let service = platform_service();

    let ask = || confirm("Continue with default printer?");
    let sink = match choose_sink(service.as_ref(), printer.printer.as_deref(), ask)? {
        SinkChoice::Use(sink) => sink,
        SinkChoice::Cancel => {
            println!("Printing cancelled.");
            return Ok(None);
        }
    };

    println!("Printing {} files...", files.len());
    let pb = progress_bar(files.len());
    let report = print_all(
        service.as_ref(),
        &FsStorage,
        files,
        sink.as_deref(),
        &options,
        cancel,
        report_progress(&pb),
    );
    pb.finish_and_clear();

    for entry in &report.entries {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.path.display().to_string());
        if entry.outcome.success {
            println!("{} Printed: {}", style("✓").green(), name);
        } else {
            println!("{} Failed: {} - {}", style("✗").red(), name, entry.outcome.message);
        }
    }

    println!(
        "\n{} Successfully sent {}/{} files to printer",
        style("✓").green().bold(),
        report.sent_count(),
        report.entries.len()
    );

    Ok(Some(report))
}

#[derive(Debug, PartialEq, Eq)]
enum SinkChoice {
    Use(Option<String>),
    Cancel,
}

/// An unknown printer name falls back to the default printer once `confirm`
/// agrees. A name that cannot be checked is used as given.
fn choose_sink<C>(
    service: &dyn PrintService,
    requested: Option<&str>,
    confirm: C,
) -> Result<SinkChoice>
where
    C: FnOnce() -> Result<bool>,
{
    let Some(name) = requested else {
        return Ok(SinkChoice::Use(None));
    };
    match service.list_sinks() {
        Ok(available) if available.iter().any(|p| p == name) => {
            Ok(SinkChoice::Use(Some(name.to_string())))
        }
        Ok(available) => {
            println!("{} Printer '{}' not found.", style("Warning:").yellow(), name);
            if available.is_empty() {
                println!("No printers found.");
            } else {
                println!("Available printers: {}", available.join(", "));
            }
            if confirm()? {
                Ok(SinkChoice::Use(None))
            } else {
                Ok(SinkChoice::Cancel)
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not verify printer name, using it as given");
            Ok(SinkChoice::Use(Some(name.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::print::PrintOptions;
    use std::path::Path;

    /// Knows two printers, or fails every query when `offline`.
    struct Printers {
        offline: bool,
    }

    impl PrintService for Printers {
        fn name(&self) -> String {
            "fake".to_string()
        }

        fn list_sinks(&self) -> crate::error::Result<Vec<String>> {
            if self.offline {
                return Err(Error::PrinterQuery("lpstat: scheduler not running".to_string()));
            }
            Ok(vec!["Office".to_string(), "Lab".to_string()])
        }

        fn default_sink(&self) -> crate::error::Result<Option<String>> {
            Ok(Some("Office".to_string()))
        }

        fn submit(
            &self,
            _path: &Path,
            _sink: Option<&str>,
            _options: &PrintOptions,
        ) -> crate::error::Result<String> {
            Ok("sent".to_string())
        }
    }

    const ONLINE: Printers = Printers { offline: false };

    #[test]
    fn test_known_printer_is_used_without_asking() {
        let choice = choose_sink(&ONLINE, Some("Lab"), || panic!("no question expected"));
        let choice = choice.unwrap();
        assert_eq!(choice, SinkChoice::Use(Some("Lab".to_string())));
    }

    #[test]
    fn test_no_printer_means_default() {
        let choice = choose_sink(&ONLINE, None, || panic!("no question expected")).unwrap();
        assert_eq!(choice, SinkChoice::Use(None));
    }

    #[test]
    fn test_unknown_printer_declined_cancels() {
        let mut asked = false;
        let choice = choose_sink(&ONLINE, Some("Basement"), || {
            asked = true;
            Ok(false)
        })
        .unwrap();
        assert!(asked);
        assert_eq!(choice, SinkChoice::Cancel);
    }

    #[test]
    fn test_unknown_printer_accepted_uses_default() {
        let choice = choose_sink(&ONLINE, Some("Basement"), || Ok(true)).unwrap();
        assert_eq!(choice, SinkChoice::Use(None));
    }

    #[test]
    fn test_unverifiable_printer_is_used_as_given() {
        let offline = Printers { offline: true };
        let choice = choose_sink(&offline, Some("Basement"), || panic!("no question expected"));
        let choice = choice.unwrap();
        assert_eq!(choice, SinkChoice::Use(Some("Basement".to_string())));
    }

    #[test]
    fn test_unreadable_answer_is_an_error() {
        let result = choose_sink(&ONLINE, Some("Basement"), || anyhow::bail!("stdin closed"));
        assert!(result.is_err());
    }
}
