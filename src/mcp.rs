use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::config::DEFAULT_PAGES_PER_PART;
use crate::naming::{prepare_outputs, ConflictPolicy, NameResolver};
use crate::partition::{partition, unit_cap_from, PartitionPlan, UnitRange};
use crate::pdf::{Document, PdfDocument};
use crate::print::options::parse_print_options;
use crate::print::{platform_service, print_all};
use crate::split::split;
use crate::storage::{FsStorage, Storage};

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSplitRequest {
    #[schemars(description = "Path to the PDF file to split")]
    pub path: String,
    #[schemars(description = "Maximum pages per output file (default: 8)")]
    #[serde(default = "default_pages")]
    pub pages: i64,
    #[schemars(description = "Output directory (default: the input file's directory)")]
    #[serde(default)]
    pub output_dir: Option<String>,
    #[schemars(description = "Overwrite existing files instead of adding a numeric suffix (default: false)")]
    #[serde(default)]
    pub overwrite: bool,
}

fn default_pages() -> i64 {
    i64::from(DEFAULT_PAGES_PER_PART)
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfExtractRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Inclusive page range (e.g., '9-16' or '5')")]
    pub pages: String,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfPrintRequest {
    #[schemars(description = "PDF files to print, in order")]
    pub paths: Vec<String>,
    #[schemars(description = "Printer name (default printer if omitted)")]
    #[serde(default)]
    pub printer: Option<String>,
    #[schemars(description = "Print options as key=value pairs (e.g., 'sides=two-sided-long-edge,copies=2')")]
    #[serde(default)]
    pub options: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PdfSplitServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl PdfSplitServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for PdfSplitServer {
    fn default() -> Self {
        Self::new()
    }
}

fn respond<T: Serialize>(result: crate::error::Result<T>) -> String {
    match result {
        Ok(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("Error: {}", e))
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn plan_for(path: &str, pages: i64) -> crate::error::Result<(PdfDocument, PartitionPlan)> {
    let doc = PdfDocument::open(path)?;
    let plan = partition(doc.unit_count(), unit_cap_from(pages)?)?;
    Ok((doc, plan))
}

#[tool_router]
impl PdfSplitServer {
    #[tool(description = "Get PDF page count, file size, encryption state and metadata (title, author, creator, subject, producer)")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        respond(PdfDocument::open(&path).map(|doc| {
            let info = doc.get_info();
            PdfInfoResult {
                path,
                page_count: info.page_count,
                file_size_mb: info.file_size_mb,
                encrypted: info.encrypted,
                metadata: info.metadata,
            }
        }))
    }

    #[tool(description = "Show how a PDF would be split: page ranges and output file names. Writes nothing.")]
    fn pdf_split_plan(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        respond(plan_for(&req.path, req.pages).map(|(_, plan)| {
            let output_dir = req.output_dir.as_deref().map(Path::new);
            let resolver = NameResolver::for_input(Path::new(&req.path), output_dir);
            let names =
                resolver.resolve_conflicts(resolver.generate(&plan), |p| FsStorage.exists(p));
            plan.iter()
                .zip(names)
                .map(|(range, name)| PartResult::new(range, name.to_string()))
                .collect::<Vec<_>>()
        }))
    }

    #[tool(description = "Split a PDF into consecutive parts of at most N pages, named {name}_part_001.pdf, {name}_part_002.pdf, ...")]
    fn pdf_split(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        let (doc, plan) = match plan_for(&req.path, req.pages) {
            Ok(v) => v,
            Err(e) => return format!("Error: {}", e),
        };

        let output_dir = req.output_dir.as_deref().map(Path::new);
        let resolver = NameResolver::for_input(Path::new(&req.path), output_dir);
        if let Err(e) = std::fs::create_dir_all(resolver.output_dir()) {
            return format!(
                "Error: Failed to create directory {}: {}",
                resolver.output_dir().display(),
                e
            );
        }

        let policy = if req.overwrite {
            ConflictPolicy::Overwrite
        } else {
            ConflictPolicy::Rename
        };
        let exists = |p: &Path| FsStorage.exists(p);
        let accepted = prepare_outputs(&resolver, &plan, policy, exists, |_| {
            Ok::<_, crate::error::Error>(true)
        });
        let identifiers = match accepted {
            Ok(identifiers) => identifiers.unwrap_or_default(),
            Err(e) => return format!("Error: {}", e),
        };

        let cancel = AtomicBool::new(false);
        respond(
            split(&doc, &plan, &identifiers, &FsStorage, &cancel, |_, _, _| {}).map(|report| {
                SplitResultSummary {
                    succeeded: report.succeeded().count(),
                    failed: report.failed().count(),
                    parts: report
                        .results
                        .iter()
                        .map(|r| PartStatus {
                            part: PartResult::new(&r.range, r.identifier.to_string()),
                            error: r.error().map(ToString::to_string),
                        })
                        .collect(),
                }
            }),
        )
    }

    #[tool(description = "Extract an inclusive page range from a PDF and save it to a new file")]
    fn pdf_extract(&self, Parameters(req): Parameters<PdfExtractRequest>) -> String {
        let extract = || -> crate::error::Result<ExtractResult> {
            let doc = PdfDocument::open(&req.path)?;
            let range = UnitRange::parse(&req.pages)?;
            range.check_within(doc.unit_count())?;
            FsStorage.write(Path::new(&req.output), &doc.extract_range(range)?)?;
            Ok(ExtractResult {
                output_path: req.output.clone(),
                page_count: range.page_count(),
            })
        };
        respond(extract())
    }

    #[tool(description = "List available printers and the default printer")]
    fn list_printers(&self) -> String {
        let service = platform_service();
        respond(service.list_sinks().map(|printers| PrintersResult {
            backend: service.name(),
            printers,
            default_printer: service.default_sink().ok().flatten(),
        }))
    }

    #[tool(description = "Print PDF files in order. A failed file does not stop the rest.")]
    fn pdf_print(&self, Parameters(req): Parameters<PdfPrintRequest>) -> String {
        let options = match req.options.as_deref().map(parse_print_options).transpose() {
            Ok(options) => options.unwrap_or_default(),
            Err(e) => return format!("Error: {}", e),
        };
        let paths: Vec<PathBuf> = req.paths.iter().map(PathBuf::from).collect();
        let service = platform_service();

        let report = print_all(
            service.as_ref(),
            &FsStorage,
            &paths,
            req.printer.as_deref(),
            &options,
            &AtomicBool::new(false),
            |_, _, _| {},
        );
        let result: Vec<PrintResult> = report
            .entries
            .into_iter()
            .map(|e| PrintResult {
                path: e.path.display().to_string(),
                success: e.outcome.success,
                message: e.outcome.message,
            })
            .collect();
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PdfInfoResult {
    pub path: String,
    pub page_count: u32,
    pub file_size_mb: f64,
    pub encrypted: bool,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartResult {
    pub start_page: u32,
    pub end_page: u32,
    pub output_path: String,
}

impl PartResult {
    fn new(range: &UnitRange, output_path: String) -> Self {
        PartResult {
            start_page: range.start(),
            end_page: range.end(),
            output_path,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartStatus {
    #[serde(flatten)]
    pub part: PartResult,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SplitResultSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub parts: Vec<PartStatus>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExtractResult {
    pub output_path: String,
    pub page_count: u32,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PrintersResult {
    pub backend: String,
    pub printers: Vec<String>,
    pub default_printer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PrintResult {
    pub path: String,
    pub success: bool,
    pub message: String,
}

impl ServerHandler for PdfSplitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF splitting and printing tools. Use pdf_info to inspect a document, \
                 pdf_split_plan to preview a split, pdf_split to write the parts, pdf_extract \
                 to save a single page range, list_printers to find a printer, and pdf_print \
                 to send files to it."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server() -> Result<()> {
    let server = PdfSplitServer::new();

    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}
