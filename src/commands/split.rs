use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use super::{confirm, progress_bar, report_progress};
use crate::cli::SplitArgs;
use crate::config::{has_pdf_extension, CONFLICT_LIST_LIMIT};
use crate::naming::{prepare_outputs, ConflictPolicy, NameResolver, OutputIdentifier};
use crate::partition::{partition, unit_cap_from, PartitionPlan};
use crate::pdf::{Document, PdfDocument};
use crate::split::{split, FailurePolicy};
use crate::storage::{FsStorage, Storage};

pub fn run(args: &SplitArgs, cancel: &AtomicBool) -> Result<()> {
    let input = args.input.as_path();
    check_input(input)?;
    let unit_cap = unit_cap_from(args.pages)?;

    println!("Loading PDF file...");
    let doc = PdfDocument::open(input)?;
    let info = doc.get_info();
    println!("Successfully loaded PDF: {} pages", info.page_count);
    tracing::info!(
        pages = info.page_count,
        size_mb = info.file_size_mb,
        encrypted = info.encrypted,
        title = info.metadata.get("Title").map(String::as_str).unwrap_or("Unknown"),
        "document info"
    );
    if info.encrypted {
        tracing::warn!("PDF is encrypted, parts may not open without the password");
    }

    let plan = partition(doc.unit_count(), unit_cap)?;
    let resolver = NameResolver::for_input(input, args.output_dir.as_deref());
    let storage = FsStorage;

    if args.preview {
        let names = resolver.resolve_conflicts(resolver.generate(&plan), |p| storage.exists(p));
        print_preview(input, &plan, &names);
        return Ok(());
    }

    let policy = if args.force {
        ConflictPolicy::Overwrite
    } else {
        ConflictPolicy::Rename
    };
    let exists = |p: &Path| storage.exists(p);
    let Some(identifiers) = prepare_outputs(&resolver, &plan, policy, exists, ask_overwrite)? else {
        println!("Operation cancelled.");
        return Ok(());
    };

    let output_dir = resolver.output_dir();
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    println!("\nSplitting PDF into {} files...", plan.len());
    let pb = progress_bar(plan.len());
    let report = split(&doc, &plan, &identifiers, &storage, cancel, report_progress(&pb))?;
    pb.finish_and_clear();

    for result in &report.results {
        match result.error() {
            None => println!(
                "{} Created: {} (pages {})",
                style("✓").green(),
                result.identifier.file_name(),
                result.range
            ),
            Some(e) => println!(
                "{} Failed: {} (pages {}) - {}",
                style("✗").red(),
                result.identifier.file_name(),
                result.range,
                e
            ),
        }
    }

    let failure_policy = if args.allow_partial {
        FailurePolicy::AllFailed
    } else {
        FailurePolicy::AnyFailed
    };
    let failed = report.is_failure(failure_policy);
    let written = report.written_paths();

    let mut print_failures = 0;
    if args.print && !failed && !written.is_empty() {
        if let Some(print_report) = super::print::print_files(&written, &args.printer, cancel)? {
            print_failures = print_report.failed().count();
        }
    }

    println!("\n--- Summary ---");
    println!("Input file: {}", input.display());
    println!("Output directory: {}", output_dir.display());
    println!("Files created: {}/{}", written.len(), report.results.len());
    let not_written: Vec<_> = report.failed().collect();
    if !not_written.is_empty() {
        println!("Failed parts:");
        for result in &not_written {
            println!("  Part {:03}: pages {}", result.index, result.range);
        }
    }
    if args.print {
        if failed {
            println!("Printing skipped because the split failed");
        } else {
            println!("Print jobs failed: {}", print_failures);
        }
    }

    if failed {
        anyhow::bail!(
            "{} of {} parts could not be written",
            not_written.len(),
            report.results.len()
        );
    }
    if print_failures > 0 {
        anyhow::bail!("{} of {} print jobs failed", print_failures, written.len());
    }
    println!("\n{} Done!", style("✓").green().bold());
    Ok(())
}

fn check_input(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file '{}' does not exist", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("'{}' is not a file", input.display());
    }
    if !has_pdf_extension(input) {
        tracing::warn!(path = %input.display(), "input does not have a .pdf extension");
    }
    Ok(())
}

fn print_preview(input: &Path, plan: &PartitionPlan, names: &[OutputIdentifier]) {
    println!("\n--- Split Preview ---");
    println!("Input file: {}", input.display());
    println!("Total pages: {}", plan.total_units());
    println!("Pages per split: {}", plan.unit_cap());
    println!("Number of output files: {}", plan.len());
    if plan.last_part_len() != plan.unit_cap() {
        println!("Last file will have: {} pages", plan.last_part_len());
    }

    println!("\nPage ranges:");
    for (i, (range, name)) in plan.iter().zip(names).enumerate() {
        println!(
            "  Part {:03}: pages {} ({} pages) -> {}",
            i + 1,
            range,
            range.page_count(),
            name
        );
    }
    println!("--- End Preview ---");
}

fn ask_overwrite(conflicts: &[&OutputIdentifier]) -> Result<bool> {
    println!(
        "\n{} The following files already exist:",
        style("Warning:").yellow()
    );
    for id in conflicts.iter().take(CONFLICT_LIST_LIMIT) {
        println!("  {}", id);
    }
    if conflicts.len() > CONFLICT_LIST_LIMIT {
        println!("  ... and {} more", conflicts.len() - CONFLICT_LIST_LIMIT);
    }

    confirm("Continue and save with numbered names?")
}
