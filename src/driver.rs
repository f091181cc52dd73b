//! The run loop: manifest in, generated files and a new cache out.

use crate::artifact::Artifact;
use crate::cache::CheckCache;
use crate::config::IgenConfig;
use crate::doc_link;
use crate::error::{IgenError, Result};
use crate::extract::{
    DeclarationFilter, DocumentedInFile, Extractor, NamespaceOrMarker, SourceScanner, SyntaxFilter,
};
use crate::manifest::Manifest;
use crate::render::{InterfaceRenderer, Renderer};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// The collaborators an artifact check runs through.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    pub extractor: &'a dyn Extractor,
    pub syntax_filter: &'a dyn SyntaxFilter,
    pub declaration_filter: &'a dyn DeclarationFilter,
    pub renderer: &'a dyn Renderer,
}

impl Pipeline<'static> {
    /// Source scanner, documented-in-file and namespace-or-marker filters,
    /// interface renderer.
    pub fn standard() -> Self {
        Self {
            extractor: &SourceScanner,
            syntax_filter: &DocumentedInFile,
            declaration_filter: &NamespaceOrMarker,
            renderer: &InterfaceRenderer,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// Extracted and rendered, whether or not written.
    pub checked: usize,
    pub written: usize,
    pub skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} interfaces: {} checked, {} written, {} up to date",
            self.total, self.checked, self.written, self.skipped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Skipped,
    Verified,
    Written,
}

pub struct Driver<'a> {
    config: &'a IgenConfig,
    pipeline: Pipeline<'a>,
}

impl<'a> Driver<'a> {
    pub fn new(config: &'a IgenConfig, pipeline: Pipeline<'a>) -> Self {
        Self { config, pipeline }
    }

    /// Runs every interface in the manifest and commits the new cache.
    ///
    /// Any failure aborts the run before the cache is saved, so the previous
    /// cache stays as it was.
    pub fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let config = self.config;

        let specs = Manifest::load(&config.manifest)?.resolve(config)?;
        let cache = CheckCache::load(&config.cache)?;
        let mut artifacts = specs
            .into_iter()
            .map(|spec| Artifact::load(spec, &cache, config.flags))
            .collect::<Result<Vec<_>>>()?;

        let pending = artifacts.iter().filter(|a| a.needs_check()).count();
        let pb = progress_bar(pending);

        let outcomes = if config.jobs > 1 && pending > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.jobs)
                .build()
                .map_err(|e| IgenError::WorkerPool(e.to_string()))?;
            let results: Vec<Result<Outcome>> = pool.install(|| {
                artifacts
                    .par_iter_mut()
                    .map(|artifact| self.process(artifact, &pb))
                    .collect()
            });
            results.into_iter().collect::<Result<Vec<_>>>()
        } else {
            artifacts
                .iter_mut()
                .map(|artifact| self.process(artifact, &pb))
                .collect::<Result<Vec<_>>>()
        };
        pb.finish_and_clear();
        let outcomes = outcomes?;

        let mut next = CheckCache::default();
        for artifact in &artifacts {
            next.insert(artifact.spec().cache_key(), artifact.cache_entry());
        }
        next.save(&config.cache)?;

        let mut summary = RunSummary {
            total: outcomes.len(),
            ..RunSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Verified => summary.checked += 1,
                Outcome::Written => {
                    summary.checked += 1;
                    summary.written += 1;
                }
            }
        }

        if summary.checked == 0 {
            println!("{} {}", "⚡".green(), summary);
        } else {
            println!("{} {} in {:.2?}", "✓".green(), summary, start.elapsed());
        }
        Ok(summary)
    }

    fn process(&self, artifact: &mut Artifact, pb: &ProgressBar) -> Result<Outcome> {
        if !artifact.needs_check() {
            return Ok(Outcome::Skipped);
        }

        let spec = artifact.spec();
        let slug = spec.slug.clone();
        pb.set_message(slug.clone());
        let line = format!(
            "{} check: {} -> {}",
            "•".cyan(),
            spec.source_labels.join(", "),
            spec.gen_rel.display()
        );
        report(pb, line);

        artifact.check(&self.pipeline, &self.config.compiler_flags)?;

        if self.config.flags.debug {
            let signatures: Vec<String> = artifact
                .declarations()
                .iter()
                .map(|d| format!("    {}", d.signature_fqn().dimmed()))
                .collect();
            if !signatures.is_empty() {
                report(pb, signatures.join("\n"));
            }
        }

        let written = artifact.write()?;
        if written {
            if let Some(doc_dir) = &self.config.doc_dir {
                doc_link::link_doc(&self.config.root, doc_dir, &slug, &artifact.spec().gen_rel)?;
            }
            report(pb, format!("  {} writing {}", "✓".green(), slug));
        }
        artifact.stamp()?;
        pb.inc(1);

        Ok(if written {
            Outcome::Written
        } else {
            Outcome::Verified
        })
    }
}

/// Prints above the bar. A hidden bar (no terminal) drops its own
/// `println`, so plain stdout is used instead.
fn report(pb: &ProgressBar, line: String) {
    if pb.is_hidden() {
        println!("{}", line);
    } else {
        pb.println(line);
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    if len == 0 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
