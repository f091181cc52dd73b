//! `igen cache show|clear|path`

use anyhow::Result;
use colored::*;

use crate::cache::CheckCache;
use crate::config::IgenConfig;
use crate::ui::{self, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Show,
    Clear,
    Path,
}

pub fn run(config: &IgenConfig, op: CacheOp) -> Result<()> {
    match op {
        CacheOp::Show => show(config),
        CacheOp::Clear => {
            if CheckCache::remove(&config.cache)? {
                println!(
                    "{} Removed {}; the next build re-checks every interface",
                    "✓".green(),
                    config.cache.display()
                );
            } else {
                println!("{} No cache at {}", "!".yellow(), config.cache.display());
            }
            Ok(())
        }
        CacheOp::Path => {
            println!("{}", config.cache.display());
            Ok(())
        }
    }
}

fn show(config: &IgenConfig) -> Result<()> {
    let cache = CheckCache::load(&config.cache)?;
    if cache.is_empty() {
        println!("{} Cache is empty ({})", "!".yellow(), config.cache.display());
        return Ok(());
    }

    let mut table = Table::new(&["Output", "Check time", "Age"]);
    for (key, entry) in cache.iter() {
        table.add_row(vec![
            key.to_string(),
            entry.check_time.to_string(),
            ui::age(entry.check_time),
        ]);
    }
    table.print();
    println!("{} {} entries", "•".cyan(), cache.len());
    Ok(())
}
