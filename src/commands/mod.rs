pub mod extract;
pub mod info;
pub mod print;
pub mod printers;
pub mod split;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};

/// Progress bar on stderr; indicatif hides it when stderr is not a terminal.
pub fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let template = "{bar:30.cyan/blue} {pos}/{len} {msg}";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style);
    }
    pb
}

/// Progress callback that advances `pb` and logs each step.
pub fn report_progress(pb: &ProgressBar) -> impl FnMut(usize, usize, &str) + '_ {
    move |current, total, message| {
        let percentage = current as f64 / total as f64 * 100.0;
        tracing::info!("[{}/{}] ({:.1}%) {}", current, total, percentage, message);
        pb.set_message(message.to_string());
        pb.set_position(current.saturating_sub(1) as u64);
    }
}

/// Ask a yes/no question on stdin. Anything but "y"/"yes" is a no,
/// including end of input.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} (y/N): ", question);
    std::io::stdout().flush().context("Failed to write prompt")?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
