//! PowerShell adapter for Windows print spooling.

use std::ffi::OsString;
use std::path::Path;

use super::{run_command, CommandFailure, PrintOptions, PrintService};
use crate::error::{Error, Result};

const LIST_PRINTERS: &str = "Get-Printer | Select-Object -ExpandProperty Name";
const DEFAULT_PRINTER: &str =
    "Get-CimInstance -ClassName Win32_Printer -Filter 'Default=True' | Select-Object -ExpandProperty Name";

#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellService;

impl PowerShellService {
    fn run(&self, script: &str) -> std::result::Result<String, CommandFailure> {
        let args: Vec<OsString> = ["-NoProfile", "-NonInteractive", "-Command", script]
            .into_iter()
            .map(OsString::from)
            .collect();
        run_command("powershell", &args)
    }

    fn query(&self, script: &str) -> Result<String> {
        self.run(script).map_err(|failure| match failure {
            CommandFailure::Missing => {
                Error::PrintUnavailable("powershell is not available".to_string())
            }
            CommandFailure::Failed(detail) => Error::PrinterQuery(detail),
        })
    }
}

impl PrintService for PowerShellService {
    fn name(&self) -> String {
        "powershell".to_string()
    }

    fn list_sinks(&self) -> Result<Vec<String>> {
        Ok(non_empty_lines(&self.query(LIST_PRINTERS)?))
    }

    fn default_sink(&self) -> Result<Option<String>> {
        Ok(non_empty_lines(&self.query(DEFAULT_PRINTER)?).into_iter().next())
    }

    fn submit(&self, path: &Path, sink: Option<&str>, options: &PrintOptions) -> Result<String> {
        if !options.is_empty() {
            tracing::warn!(?options, "print options are ignored by the Windows shell print verb");
        }
        self.run(&print_script(path, sink)).map_err(|failure| match failure {
            CommandFailure::Missing => {
                Error::PrintUnavailable("powershell is not available".to_string())
            }
            CommandFailure::Failed(reason) => Error::Print {
                path: path.to_path_buf(),
                reason,
            },
        })?;
        Ok(format!("Sent to printer: {}", sink.unwrap_or("default")))
    }
}

/// `Start-Process` with the shell's Print verb, or PrintTo for a named printer.
pub fn print_script(path: &Path, sink: Option<&str>) -> String {
    let file = quote(&path.display().to_string());
    match sink {
        Some(sink) => format!(
            "Start-Process -FilePath {} -Verb PrintTo -ArgumentList {} -Wait",
            file,
            quote(&format!("\"{}\"", sink))
        ),
        None => format!("Start-Process -FilePath {} -Verb Print -Wait", file),
    }
}

/// Single-quoted PowerShell literal.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn non_empty_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
