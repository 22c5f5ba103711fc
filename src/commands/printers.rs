use anyhow::Result;

use crate::print::options::OPTIONS_HELP;
use crate::print::platform_service;

/// List printers, the default printer and the common print options.
pub fn run() -> Result<()> {
    let service = platform_service();

    println!("System: {}", std::env::consts::OS);
    println!("Print backend: {}", service.name());

    match service.list_sinks() {
        Ok(printers) if !printers.is_empty() => {
            println!("\nAvailable printers:");
            for (i, name) in printers.iter().enumerate() {
                println!("  {}. {}", i + 1, name);
            }
        }
        Ok(_) => println!("\nNo printers found or unable to list printers."),
        Err(e) => {
            tracing::warn!(error = %e, "listing printers failed");
            println!("\nNo printers found or unable to list printers.");
        }
    }

    match service.default_sink() {
        Ok(Some(name)) => println!("\nDefault printer: {}", name),
        Ok(None) => println!("\nDefault printer: none"),
        Err(e) => {
            tracing::warn!(error = %e, "finding the default printer failed");
            println!("\nDefault printer: unknown");
        }
    }

    println!("\nCommon print options (--print-options key=value,...):");
    for (key, values) in OPTIONS_HELP {
        println!("  {:<12} {}", key, values);
    }

    Ok(())
}

pub fn status(name: &str) -> Result<()> {
    let status = platform_service().sink_status(name)?;
    println!("Printer: {}", status.name);
    println!("Available: {}", if status.available { "yes" } else { "no" });
    println!("Status: {}", status.status);
    Ok(())
}
