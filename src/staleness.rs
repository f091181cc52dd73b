//! Staleness decisions.
//!
//! Two phases: a cheap timestamp test (`needs_check`) decides whether an
//! interface must be re-extracted at all, and a content test (`needs_build`)
//! decides whether the freshly rendered text must actually be written.
//! Rewriting an unchanged file would bump its mtime and make every
//! dependent translation unit recompile.

use crate::config::RunFlags;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of a generated file's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_string()[..12])
    }
}

/// Timestamps feeding the check decision, all in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    /// When the interface was last verified (0 if never).
    pub check_time: u64,
    /// Generated file mtime, `None` if it does not exist.
    pub gen_time: Option<u64>,
    /// Newest mtime among the contributing sources.
    pub newest_source: u64,
}

/// Whether the interface must be re-extracted this run.
pub fn needs_check(flags: RunFlags, signals: &Signals) -> bool {
    if flags.force || flags.check {
        return true;
    }
    if signals.gen_time.is_some_and(|t| signals.check_time < t) {
        return true;
    }
    signals.check_time < signals.newest_source
}

/// Whether a checked interface must be written.
///
/// `existing` is `None` when no generated file existed before this run.
pub fn needs_build(force: bool, candidate: &ContentHash, existing: Option<&ContentHash>) -> bool {
    force || existing != Some(candidate)
}

/// Check time to persist after a successful check.
///
/// `snapshot` is the newest source mtime seen at load, `current` the newest
/// one re-read after the write (`None` if a source vanished). A source that
/// moved during the run keeps the stored time at the snapshot, so the next
/// run checks again. Otherwise the generated file's post-write mtime is
/// folded in so our own write does not look like an external edit.
pub fn fresh_check_time(snapshot: u64, current: Option<u64>, gen_time: Option<u64>) -> u64 {
    match current {
        Some(current) if current <= snapshot => snapshot.max(gen_time.unwrap_or(0)),
        _ => snapshot,
    }
}

/// Human-readable state for `igen status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    /// The generated file does not exist yet.
    Missing,
}

impl Freshness {
    pub fn probe(flags: RunFlags, signals: &Signals) -> Self {
        if signals.gen_time.is_none() {
            Freshness::Missing
        } else if needs_check(flags, signals) {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::Missing => "missing",
        })
    }
}
