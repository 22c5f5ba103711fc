//! Output file naming.
//!
//! Names are positional (`{base}_part_{i:03}.pdf`) and only ever change by
//! gaining a `_{n}` suffix when a file of that name is already present. This
//! module never touches the filesystem itself; existence is asked through a
//! caller-supplied predicate.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{OUTPUT_EXTENSION, PART_INDEX_WIDTH, PART_INFIX};
use crate::partition::PartitionPlan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputIdentifier {
    dir: PathBuf,
    stem: String,
    extension: String,
    counter: Option<u32>,
}

impl OutputIdentifier {
    pub fn new(
        dir: impl Into<PathBuf>,
        stem: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        OutputIdentifier {
            dir: dir.into(),
            stem: stem.into(),
            extension: extension.into(),
            counter: None,
        }
    }

    /// Disambiguation counter appended to the stem, if any.
    pub fn counter(&self) -> Option<u32> {
        self.counter
    }

    fn with_counter(&self, counter: u32) -> Self {
        OutputIdentifier {
            counter: Some(counter),
            ..self.clone()
        }
    }

    pub fn file_name(&self) -> String {
        let stem = match self.counter {
            Some(n) => format!("{}_{}", self.stem, n),
            None => self.stem.clone(),
        };
        if self.extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, self.extension)
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }
}

impl fmt::Display for OutputIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Produces and disambiguates the output names for one input document.
#[derive(Debug, Clone)]
pub struct NameResolver {
    base_name: String,
    output_dir: PathBuf,
    track_batch: bool,
}

impl NameResolver {
    pub fn new(base_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        NameResolver {
            base_name: base_name.into(),
            output_dir: output_dir.into(),
            track_batch: true,
        }
    }

    /// Names derive from the input's stem; the output directory defaults to
    /// the input's own directory.
    pub fn for_input(input: &Path, output_dir: Option<&Path>) -> Self {
        let base_name = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        NameResolver::new(base_name, output_dir)
    }

    /// Only consult storage when resolving, so two identical candidates in
    /// one batch can resolve to the same name.
    #[cfg(test)]
    fn without_batch_tracking(mut self) -> Self {
        self.track_batch = false;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The i-th range (1-indexed) maps to `{base}_part_{i:03}.pdf`.
    pub fn generate(&self, plan: &PartitionPlan) -> Vec<OutputIdentifier> {
        (1..=plan.len())
            .map(|index| {
                OutputIdentifier::new(
                    &self.output_dir,
                    format!(
                        "{}{}{:0width$}",
                        self.base_name,
                        PART_INFIX,
                        index,
                        width = PART_INDEX_WIDTH
                    ),
                    OUTPUT_EXTENSION,
                )
            })
            .collect()
    }

    /// Append `_1`, `_2`, ... to every identifier that already exists, or was
    /// already handed out earlier in this batch, until a free name is found.
    /// Results are stable for a fixed storage snapshot.
    pub fn resolve_conflicts<F>(
        &self,
        identifiers: Vec<OutputIdentifier>,
        mut exists: F,
    ) -> Vec<OutputIdentifier>
    where
        F: FnMut(&Path) -> bool,
    {
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut taken = |path: &Path, claimed: &HashSet<PathBuf>| {
            exists(path) || (self.track_batch && claimed.contains(path))
        };

        identifiers
            .into_iter()
            .map(|original| {
                let mut candidate = original.clone();
                let mut counter = 1;
                while taken(&candidate.path(), &claimed) {
                    candidate = original.with_counter(counter);
                    counter += 1;
                }
                if candidate.counter().is_some() {
                    tracing::debug!(from = %original, to = %candidate, "renamed to avoid conflict");
                }
                claimed.insert(candidate.path());
                candidate
            })
            .collect()
    }
}

/// Identifiers whose generated name is already present in storage.
pub fn existing<'a, F>(
    identifiers: &'a [OutputIdentifier],
    mut exists: F,
) -> Vec<&'a OutputIdentifier>
where
    F: FnMut(&Path) -> bool,
{
    identifiers
        .iter()
        .filter(|id| exists(&id.path()))
        .collect()
}

/// What to do when generated names are already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Write over existing files under their generated names.
    Overwrite,
    /// Ask once, then give conflicting names a `_{n}` suffix.
    Rename,
}

/// Final output names for `plan`, or `None` if the user declined to go on.
///
/// Under [`ConflictPolicy::Rename`], `confirm` is called with the existing
/// files only when there is at least one.
pub fn prepare_outputs<F, C, E>(
    resolver: &NameResolver,
    plan: &PartitionPlan,
    policy: ConflictPolicy,
    mut exists: F,
    confirm: C,
) -> Result<Option<Vec<OutputIdentifier>>, E>
where
    F: FnMut(&Path) -> bool,
    C: FnOnce(&[&OutputIdentifier]) -> Result<bool, E>,
{
    let generated = resolver.generate(plan);
    if policy == ConflictPolicy::Overwrite {
        return Ok(Some(generated));
    }

    let conflicts = existing(&generated, &mut exists);
    if !conflicts.is_empty() && !confirm(&conflicts)? {
        return Ok(None);
    }
    Ok(Some(resolver.resolve_conflicts(generated, exists)))
}
