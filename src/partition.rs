use std::fmt;

use crate::error::{Error, Result};

/// An inclusive, 1-indexed span of pages assigned to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitRange {
    start: u32,
    end: u32,
}

impl UnitRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 {
            return Err(Error::InvalidParameter(
                "Page numbers must be >= 1".to_string(),
            ));
        }
        if start > end {
            return Err(Error::InvalidParameter(format!(
                "Invalid page range {}-{}: start is after end",
                start, end
            )));
        }
        Ok(UnitRange { start, end })
    }

    /// Parse a range like "3-7" or a single page like "5".
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidParameter("Empty page range".to_string()));
        }

        match s.split_once('-') {
            Some(("", _)) => Err(Error::InvalidParameter(format!(
                "Invalid page range: {}",
                s
            ))),
            Some((start, end)) => UnitRange::new(parse_page(start)?, parse_page(end)?),
            None => {
                let page = parse_page(s)?;
                UnitRange::new(page, page)
            }
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Check that the range fits a document of `total_units` pages.
    pub fn check_within(&self, total_units: u32) -> Result<()> {
        if self.end > total_units {
            return Err(Error::InvalidParameter(format!(
                "Invalid page range {}: document has {} pages",
                self, total_units
            )));
        }
        Ok(())
    }
}

impl fmt::Display for UnitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn parse_page(s: &str) -> Result<u32> {
    let s = s.trim();
    s.parse::<u32>()
        .map_err(|_| Error::InvalidParameter(format!("Invalid page number: {}", s)))
}

/// Ordered, gap-free cover of `[1, total_units]` by ranges of `unit_cap` pages.
///
/// Only [`partition`] builds a plan, so every plan holds at least two ranges,
/// all but the last exactly `unit_cap` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    total_units: u32,
    unit_cap: u32,
    ranges: Vec<UnitRange>,
}

impl PartitionPlan {
    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn unit_cap(&self) -> u32 {
        self.unit_cap
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnitRange> {
        self.ranges.iter()
    }

    /// Number of pages that end up in the final file.
    pub fn last_part_len(&self) -> u32 {
        self.ranges.last().map_or(0, UnitRange::page_count)
    }
}

impl<'a> IntoIterator for &'a PartitionPlan {
    type Item = &'a UnitRange;
    type IntoIter = std::slice::Iter<'a, UnitRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Split `total_units` pages into consecutive ranges of at most `unit_cap` pages.
///
/// A cap that would produce a single file is rejected: splitting must yield
/// at least two parts.
pub fn partition(total_units: u32, unit_cap: u32) -> Result<PartitionPlan> {
    if unit_cap == 0 {
        return Err(Error::InvalidParameter(
            "Pages per split must be greater than 0".to_string(),
        ));
    }
    if unit_cap >= total_units {
        return Err(Error::InvalidParameter(format!(
            "Pages per split ({}) should be less than total pages ({})",
            unit_cap, total_units
        )));
    }

    let ranges = (0..total_units)
        .step_by(unit_cap as usize)
        .map(|start| UnitRange {
            start: start + 1,
            end: start.saturating_add(unit_cap).min(total_units),
        })
        .collect();

    Ok(PartitionPlan {
        total_units,
        unit_cap,
        ranges,
    })
}

/// Convert a user-supplied page count into a cap, rejecting negatives.
pub fn unit_cap_from(value: i64) -> Result<u32> {
    if value <= 0 {
        return Err(Error::InvalidParameter(format!(
            "Pages per split must be greater than 0 (got {})",
            value
        )));
    }
    u32::try_from(value)
        .map_err(|_| Error::InvalidParameter(format!("Pages per split is too large: {}", value)))
}
