//! `igen build`

use anyhow::{Context, Result};
use colored::*;

use crate::config::IgenConfig;
use crate::driver::{Driver, Pipeline, RunSummary};

pub fn run(config: &IgenConfig) -> Result<RunSummary> {
    if config.flags.debug {
        println!("{} flags: {}", "⚙".cyan(), config.compiler_flags.join(" "));
        if config.flags.force {
            println!("{} force: every interface will be rewritten", "!".yellow());
        } else if config.flags.check {
            println!("{} check: every interface will be re-extracted", "!".yellow());
        }
    }

    Driver::new(config, Pipeline::standard())
        .run()
        .with_context(|| format!("interface generation failed in {}", config.root.display()))
}
