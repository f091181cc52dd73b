//! `igen status`: what a build would do, without doing it.

use anyhow::{Context, Result};
use colored::*;

use crate::artifact::Artifact;
use crate::cache::CheckCache;
use crate::config::IgenConfig;
use crate::manifest::Manifest;
use crate::staleness::Freshness;
use crate::ui::{self, Table};

pub fn run(config: &IgenConfig) -> Result<()> {
    let specs = Manifest::load(&config.manifest)
        .and_then(|m| m.resolve(config))
        .context("failed to read interface manifest")?;
    let cache = CheckCache::load(&config.cache)?;

    let mut table = Table::new(&["Interface", "Output", "Last check", "State"]);
    let mut due = 0;
    for spec in &specs {
        let probe = Artifact::probe(spec, &cache, config.flags)?;
        let state = match probe.freshness {
            Freshness::Fresh => probe.freshness.to_string().green(),
            Freshness::Stale => probe.freshness.to_string().yellow(),
            Freshness::Missing => probe.freshness.to_string().red(),
        };
        if probe.freshness != Freshness::Fresh {
            due += 1;
        }
        table.add_row(vec![
            spec.slug.clone(),
            spec.cache_key(),
            ui::age(probe.signals.check_time),
            state.to_string(),
        ]);
    }

    if table.is_empty() {
        println!("{} No interfaces in {}", "!".yellow(), config.manifest.display());
        return Ok(());
    }
    table.print();
    if due == 0 {
        println!("{} All {} interfaces up to date", "⚡".green(), specs.len());
    } else {
        println!("{} {} of {} interfaces will be checked", "•".cyan(), due, specs.len());
    }
    Ok(())
}
