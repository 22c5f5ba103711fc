//! CUPS command-line adapters for Linux and macOS.

use std::ffi::OsString;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{run_command, CommandFailure, PrintOptions, PrintService, SinkStatus};
use crate::error::{Error, Result};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PRINTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^printer\s+(\S+)").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DEFAULT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)system default destination:\s*(\S+)").expect("valid regex")
});

/// Which submission command to use. Both share `lpstat` for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitter {
    /// BSD-style `lpr -P NAME`.
    Lpr,
    /// System V-style `lp -d NAME`.
    Lp,
}

#[derive(Debug, Clone, Copy)]
pub struct CupsService {
    submitter: Submitter,
}

impl CupsService {
    pub fn lpr() -> Self {
        CupsService {
            submitter: Submitter::Lpr,
        }
    }

    pub fn lp() -> Self {
        CupsService {
            submitter: Submitter::Lp,
        }
    }

    fn program(&self) -> &'static str {
        match self.submitter {
            Submitter::Lpr => "lpr",
            Submitter::Lp => "lp",
        }
    }

    pub fn submit_args(
        &self,
        path: &Path,
        sink: Option<&str>,
        options: &PrintOptions,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(sink) = sink {
            let flag = match self.submitter {
                Submitter::Lpr => "-P",
                Submitter::Lp => "-d",
            };
            args.push(flag.into());
            args.push(sink.into());
        }
        for (key, value) in options {
            args.push("-o".into());
            args.push(format!("{}={}", key, value).into());
        }
        args.push(path.as_os_str().to_owned());
        args
    }

    fn lpstat(&self, args: &[&str]) -> Result<String> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        run_command("lpstat", &args).map_err(|failure| match failure {
            CommandFailure::Missing => {
                Error::PrintUnavailable("lpstat is not installed".to_string())
            }
            CommandFailure::Failed(detail) => Error::PrinterQuery(detail),
        })
    }
}

impl PrintService for CupsService {
    fn name(&self) -> String {
        self.program().to_string()
    }

    fn list_sinks(&self) -> Result<Vec<String>> {
        Ok(parse_printers(&self.lpstat(&["-p"])?))
    }

    fn default_sink(&self) -> Result<Option<String>> {
        Ok(parse_default(&self.lpstat(&["-d"])?))
    }

    fn submit(&self, path: &Path, sink: Option<&str>, options: &PrintOptions) -> Result<String> {
        let program = self.program();
        let args = self.submit_args(path, sink, options);
        run_command(program, &args).map_err(|failure| match failure {
            CommandFailure::Missing => {
                Error::PrintUnavailable(format!("{} is not installed", program))
            }
            CommandFailure::Failed(reason) => Error::Print {
                path: path.to_path_buf(),
                reason,
            },
        })?;
        Ok(format!("Sent to printer: {}", sink.unwrap_or("default")))
    }

    fn sink_status(&self, sink: &str) -> Result<SinkStatus> {
        match self.lpstat(&["-p", sink]) {
            Ok(stdout) => Ok(parse_status(sink, &stdout)),
            Err(Error::PrinterQuery(_)) => Ok(SinkStatus {
                name: sink.to_string(),
                available: false,
                status: "not found".to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Printer names from `lpstat -p` output.
pub fn parse_printers(stdout: &str) -> Vec<String> {
    PRINTER_LINE
        .captures_iter(stdout)
        .map(|c| c[1].to_string())
        .collect()
}

/// Default destination from `lpstat -d` output.
pub fn parse_default(stdout: &str) -> Option<String> {
    DEFAULT_LINE.captures(stdout).map(|c| c[1].to_string())
}

pub fn parse_status(name: &str, stdout: &str) -> SinkStatus {
    let lower = stdout.to_lowercase();
    let (available, status) = if lower.contains("disabled") {
        (false, "disabled")
    } else if lower.contains("idle") {
        (true, "idle")
    } else {
        (true, "unknown")
    };
    SinkStatus {
        name: name.to_string(),
        available,
        status: status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LPSTAT_P: &str = "\
printer HP_LaserJet is idle.  enabled since Mon 06 Oct 2025 09:12:01
printer Office_Color disabled since Tue 07 Oct 2025 14:00:00 -
\treason unknown
";

    #[test]
    fn test_parse_printers() {
        assert_eq!(parse_printers(LPSTAT_P), vec!["HP_LaserJet", "Office_Color"]);
        assert!(parse_printers("lpstat: No destinations added.\n").is_empty());
    }

    #[test]
    fn test_parse_default() {
        assert_eq!(
            parse_default("system default destination: HP_LaserJet\n").as_deref(),
            Some("HP_LaserJet")
        );
        assert_eq!(parse_default("no system default destination\n"), None);
    }

    #[test]
    fn test_parse_status() {
        let idle = parse_status("HP_LaserJet", "printer HP_LaserJet is idle.  enabled since ...");
        assert!(idle.available);
        assert_eq!(idle.status, "idle");

        let disabled = parse_status("Office_Color", "printer Office_Color disabled since ...");
        assert!(!disabled.available);
        assert_eq!(disabled.status, "disabled");

        assert_eq!(parse_status("X", "printer X now printing X-42.").status, "unknown");
    }

    #[test]
    fn test_lpr_args() {
        let mut options = PrintOptions::new();
        options.insert("sides".to_string(), "two-sided-long-edge".to_string());
        options.insert("copies".to_string(), "2".to_string());

        let path = Path::new("out/doc_part_001.pdf");
        let args = CupsService::lpr().submit_args(path, Some("HP"), &options);
        assert_eq!(
            args,
            vec![
                "-P",
                "HP",
                "-o",
                "copies=2",
                "-o",
                "sides=two-sided-long-edge",
                "out/doc_part_001.pdf",
            ]
            .into_iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_lp_args_without_printer() {
        let args = CupsService::lp().submit_args(Path::new("a.pdf"), None, &PrintOptions::new());
        assert_eq!(args, vec![OsString::from("a.pdf")]);

        let named =
            CupsService::lp().submit_args(Path::new("a.pdf"), Some("HP"), &PrintOptions::new());
        assert_eq!(named[0], OsString::from("-d"));
    }
}
