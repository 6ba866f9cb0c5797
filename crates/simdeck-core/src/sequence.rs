//! Filename sequencing.
//!
//! Simulation data lives in numbered files named `{type}-{index}.json`.
//! A simulation only records its first and last file names; the files in
//! between are implied by the numeric indices embedded in those two names.
//!
//! - [`extract_index`] pulls the first run of decimal digits out of a name.
//! - [`build_range`] validates two endpoints and yields a [`FileRange`]
//!   that enumerates the implied file names in ascending order.
//! - [`natural_cmp`] orders names with embedded digit runs compared as
//!   numbers, so `file-9` sorts before `file-10`.

use core::cmp::Ordering;
use core::iter::FusedIterator;
use core::ops::RangeInclusive;

use crate::error::SequenceError;

/// Extension used for synthesized range file names.
pub const RANGE_FILE_EXTENSION: &str = "json";

/// Parse the first run of decimal digits found anywhere in `file_name`.
///
/// Leading zeros are accepted (`run-007.json` has index 7). A name with no
/// digits, or whose first digit run does not fit in a `u64`, is malformed.
pub fn extract_index(file_name: &str) -> Result<u64, SequenceError> {
    let rest = file_name.trim_start_matches(|c: char| !c.is_ascii_digit());
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = rest.get(..len).unwrap_or_default();

    if digits.is_empty() {
        return Err(SequenceError::MalformedFilename(file_name.to_owned()));
    }

    digits
        .parse::<u64>()
        .map_err(|e| SequenceError::MalformedFilename(format!("{file_name} ({e})")))
}

/// Check that two file names carry indices in non-decreasing order.
///
/// Returns the parsed `(start, end)` indices on success.
pub fn check_order(
    start_file_name: &str,
    end_file_name: &str,
) -> Result<(u64, u64), SequenceError> {
    let start = extract_index(start_file_name)?;
    let end = extract_index(end_file_name)?;
    if start > end {
        return Err(SequenceError::InvalidRange { start, end });
    }
    Ok((start, end))
}

/// Build the inclusive file range between two endpoint file names.
///
/// The endpoints are only consulted for their numeric indices; the range
/// yields names synthesized as `{sim_type}-{index}.json`.
///
/// # Errors
///
/// [`SequenceError::MalformedFilename`] if either endpoint has no index,
/// [`SequenceError::InvalidRange`] if the start index exceeds the end index.
pub fn build_range(
    sim_type: &str,
    start_file_name: &str,
    end_file_name: &str,
) -> Result<FileRange, SequenceError> {
    let (start, end) = check_order(start_file_name, end_file_name)?;
    Ok(FileRange {
        sim_type: sim_type.to_owned(),
        start,
        end,
    })
}

/// An inclusive, validated range of numbered file names for one type.
///
/// Iteration is lazy and restartable: every call to [`FileRange::iter`]
/// starts again from the first index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRange {
    sim_type: String,
    start: u64,
    end: u64,
}

impl FileRange {
    /// First index in the range.
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last index in the range (inclusive).
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of files in the range. Saturates at `u64::MAX`.
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    /// Always `false`: a valid range holds at least one file.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The synthesized file name for `index`.
    pub fn file_name(&self, index: u64) -> String {
        format!("{}-{index}.{RANGE_FILE_EXTENSION}", self.sim_type)
    }

    /// Iterate the file names in ascending index order.
    pub fn iter(&self) -> FileNames<'_> {
        FileNames {
            range: self,
            indices: self.start..=self.end,
        }
    }
}

impl<'a> IntoIterator for &'a FileRange {
    type Item = String;
    type IntoIter = FileNames<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the file names of a [`FileRange`].
#[derive(Debug, Clone)]
pub struct FileNames<'a> {
    range: &'a FileRange,
    indices: RangeInclusive<u64>,
}

impl Iterator for FileNames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.indices.next().map(|i| self.range.file_name(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl DoubleEndedIterator for FileNames<'_> {
    fn next_back(&mut self) -> Option<String> {
        self.indices.next_back().map(|i| self.range.file_name(i))
    }
}

impl FusedIterator for FileNames<'_> {}

// ---------------------------------------------------------------------------
// Numeric-aware ordering
// ---------------------------------------------------------------------------

/// A maximal run of either ASCII digits or non-digits.
#[derive(Debug, Clone, Copy)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let digits = self.rest.chars().next()?.is_ascii_digit();
        let split = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at_checked(split)?;
        self.rest = tail;
        Some(if digits {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    }
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn cmp_chunk(a: Chunk<'_>, b: Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Digits(a), Chunk::Digits(b)) => cmp_digits(a, b),
        (Chunk::Text(a), Chunk::Text(b)) => cmp_text(a, b),
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
    }
}

/// Compare two names, treating embedded digit runs as numbers.
///
/// Text runs compare case-insensitively; digit runs compare by numeric
/// value with no upper bound. Names that are equal under those rules fall
/// back to plain byte order so the result is a total order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks { rest: a };
    let mut right = Chunks { rest: b };
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match cmp_chunk(l, r) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }
}

/// Sort names ascending under [`natural_cmp`].
pub fn sort_natural<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
