use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Printer options passed through as `-o key=value`, sorted by key.
pub type PrintOptions = BTreeMap<String, String>;

/// Common CUPS options and their accepted values, shown by `printers`.
pub const OPTIONS_HELP: &[(&str, &str)] = &[
    ("sides", "one-sided, two-sided-long-edge, two-sided-short-edge"),
    ("media", "a4, letter, legal, etc."),
    ("orientation", "portrait, landscape"),
    ("quality", "draft, normal, high"),
    ("copies", "number of copies (1, 2, 3, etc.)"),
    ("page-ranges", "1-5, 1,3,5, etc."),
    (
        "finishings",
        "staple-top-left, staple-top-right, staple-bottom-left, staple-bottom-right, \
         staple-dual-left, staple-dual-top, staple-none",
    ),
];

/// Parse `"sides=two-sided-long-edge,copies=2"` into options.
///
/// A segment without `=` continues the previous value, so
/// `page-ranges=1,3,5` keeps its commas.
pub fn parse_print_options(s: &str) -> Result<PrintOptions> {
    let malformed =
        |part: &str| Error::InvalidParameter(format!("Print option '{}' is not key=value", part));

    let mut options = PrintOptions::new();
    let mut last_key: Option<String> = None;
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            let previous = last_key
                .as_ref()
                .and_then(|key| options.get_mut(key))
                .ok_or_else(|| malformed(part))?;
            previous.push(',');
            previous.push_str(part);
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() || value.contains('=') {
            return Err(malformed(part));
        }
        options.insert(key.to_string(), value.to_string());
        last_key = Some(key.to_string());
    }
    Ok(options)
}
