//! One generated interface file and the sources it is derived from.
//!
//! An [`Artifact`] is built fresh each run from its manifest entry and the
//! previous cache. Its lifecycle is linear:
//!
//! 1. [`Artifact::load`] stats every source, makes sure the generated file
//!    exists, and decides `needs_check`.
//! 2. [`Artifact::check`] (only if needed) extracts, renders and hashes the
//!    candidate content, deciding `needs_build`.
//! 3. [`Artifact::write`] (only if needed) replaces the generated file.
//! 4. [`Artifact::stamp`] records the new check time.
//!
//! [`Artifact::cache_entry`] is what goes into the next cache, whether or not
//! any of steps 2-4 ran.

use crate::cache::{CacheEntry, CheckCache};
use crate::config::RunFlags;
use crate::driver::Pipeline;
use crate::error::{IgenError, Result};
use crate::extract::{Declaration, Filters};
use crate::manifest::ArtifactSpec;
use crate::source::{SourceRecord, mtime_secs};
use crate::staleness::{self, ContentHash, Freshness, Signals};
use std::fs;
use std::path::Path;

struct Candidate {
    declarations: Vec<Declaration>,
    data: String,
    needs_build: bool,
}

pub struct Artifact {
    spec: ArtifactSpec,
    sources: Vec<SourceRecord>,
    signals: Signals,
    force: bool,
    needs_check: bool,
    /// Hash of the generated file as found, read only when a check is due.
    existing_hash: Option<ContentHash>,
    candidate: Option<Candidate>,
    check_time: u64,
}

/// Side-effect-free staleness report for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub signals: Signals,
    pub freshness: Freshness,
}

fn newest_mtime(sources: &[SourceRecord]) -> u64 {
    sources.iter().map(SourceRecord::mtime).max().unwrap_or(0)
}

fn open_sources(spec: &ArtifactSpec) -> Result<Vec<SourceRecord>> {
    spec.sources
        .iter()
        .map(|path| SourceRecord::open(&spec.slug, path))
        .collect()
}

fn gen_mtime(path: &Path) -> Result<Option<u64>> {
    mtime_secs(path).map_err(|e| IgenError::io(path, e))
}

impl Artifact {
    /// Prepares `spec` for this run.
    ///
    /// Creates an empty generated file if none exists so that headers
    /// including it stay parseable while other interfaces are extracted.
    pub fn load(spec: ArtifactSpec, cache: &CheckCache, flags: RunFlags) -> Result<Self> {
        let sources = open_sources(&spec)?;

        let existed = gen_mtime(&spec.gen_path)?.is_some();
        if !existed {
            if let Some(parent) = spec.gen_path.parent() {
                fs::create_dir_all(parent).map_err(|e| IgenError::io(parent, e))?;
            }
            fs::write(&spec.gen_path, "").map_err(|e| IgenError::io(&spec.gen_path, e))?;
        }

        let signals = Signals {
            check_time: cache.check_time(&spec.cache_key()),
            gen_time: gen_mtime(&spec.gen_path)?,
            newest_source: newest_mtime(&sources),
        };
        let needs_check = staleness::needs_check(flags, &signals);

        let existing_hash = if needs_check && existed {
            let bytes = fs::read(&spec.gen_path).map_err(|e| IgenError::io(&spec.gen_path, e))?;
            Some(ContentHash::of(&bytes))
        } else {
            None
        };

        Ok(Self {
            check_time: signals.check_time,
            spec,
            sources,
            signals,
            force: flags.force,
            needs_check,
            existing_hash,
            candidate: None,
        })
    }

    /// Computes what [`Artifact::load`] would decide without touching disk.
    pub fn probe(spec: &ArtifactSpec, cache: &CheckCache, flags: RunFlags) -> Result<Probe> {
        let sources = open_sources(spec)?;
        let signals = Signals {
            check_time: cache.check_time(&spec.cache_key()),
            gen_time: gen_mtime(&spec.gen_path)?,
            newest_source: newest_mtime(&sources),
        };
        Ok(Probe {
            signals,
            freshness: Freshness::probe(flags, &signals),
        })
    }

    pub fn spec(&self) -> &ArtifactSpec {
        &self.spec
    }

    pub fn needs_check(&self) -> bool {
        self.needs_check
    }

    /// Extracts every source in order, renders, and decides `needs_build`.
    pub fn check(&mut self, pipeline: &Pipeline<'_>, compiler_flags: &[String]) -> Result<()> {
        let filters = Filters {
            syntax: pipeline.syntax_filter,
            declaration: pipeline.declaration_filter,
            artifact: &self.spec,
        };

        let mut declarations = Vec::new();
        for source in &self.sources {
            let found = pipeline
                .extractor
                .extract(source.path(), compiler_flags, &filters)
                .map_err(|source| IgenError::Extract {
                    slug: self.spec.slug.clone(),
                    source,
                })?;
            declarations.extend(found);
        }

        let data = pipeline
            .renderer
            .render(&declarations, &self.spec)
            .map_err(|source| IgenError::Render {
                slug: self.spec.slug.clone(),
                source,
            })?;
        let hash = ContentHash::of(data.as_bytes());
        let needs_build = staleness::needs_build(self.force, &hash, self.existing_hash.as_ref());

        self.candidate = Some(Candidate {
            declarations,
            data,
            needs_build,
        });
        Ok(())
    }

    /// False until [`Artifact::check`] has run.
    pub fn needs_build(&self) -> bool {
        self.candidate.as_ref().is_some_and(|c| c.needs_build)
    }

    pub fn declarations(&self) -> &[Declaration] {
        self.candidate
            .as_ref()
            .map(|c| c.declarations.as_slice())
            .unwrap_or(&[])
    }

    /// Writes the candidate if it differs from what is on disk.
    ///
    /// Returns whether the file was written.
    pub fn write(&self) -> Result<bool> {
        let Some(candidate) = self.candidate.as_ref().filter(|c| c.needs_build) else {
            return Ok(false);
        };
        fs::write(&self.spec.gen_path, &candidate.data)
            .map_err(|e| IgenError::io(&self.spec.gen_path, e))?;
        Ok(true)
    }

    /// Records a successful check. Call after any [`Artifact::write`].
    pub fn stamp(&mut self) -> Result<u64> {
        let gen_time = gen_mtime(&self.spec.gen_path)?;
        let current = self.current_newest_source()?;
        self.check_time =
            staleness::fresh_check_time(self.signals.newest_source, current, gen_time);
        Ok(self.check_time)
    }

    /// Newest source mtime as of now, `None` if any source is gone.
    fn current_newest_source(&self) -> Result<Option<u64>> {
        let mut newest = 0;
        for source in &self.sources {
            match mtime_secs(source.path()).map_err(|e| IgenError::io(source.path(), e))? {
                Some(mtime) => newest = newest.max(mtime),
                None => return Ok(None),
            }
        }
        Ok(Some(newest))
    }

    pub fn cache_entry(&self) -> CacheEntry {
        CacheEntry {
            check_time: self.check_time,
        }
    }
}
