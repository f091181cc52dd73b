//! `igen watch`: rebuild whenever a source or the manifest changes.

use anyhow::{Context, Result};
use colored::*;
use notify::{Config, Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::config::IgenConfig;
use crate::manifest::Manifest;

const DEBOUNCE: Duration = Duration::from_millis(100);
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How long after a rebuild events on generated files are taken as our own.
const SETTLE: Duration = Duration::from_secs(2);

pub fn watch(config: &IgenConfig) -> Result<()> {
    let source_dir = config.root.join(&config.source_root);
    let manifest_dir = config
        .manifest
        .parent()
        .unwrap_or(config.root.as_path())
        .to_path_buf();

    let (tx, rx) = channel();
    let notify_config = Config::default().with_poll_interval(POLL_INTERVAL);
    let mut watcher = notify::RecommendedWatcher::new(tx, notify_config)?;
    watcher
        .watch(&source_dir, RecursiveMode::Recursive)
        .with_context(|| format!("cannot watch {}", source_dir.display()))?;
    if !manifest_dir.starts_with(&source_dir) {
        watcher
            .watch(&manifest_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("cannot watch {}", manifest_dir.display()))?;
    }

    println!("{} Watching {} for changes...", "👀".cyan(), source_dir.display());
    let mut outputs = rebuild(config);

    while let Ok(event) = rx.recv() {
        let Ok(event) = event else { continue };
        if !is_relevant(&event, &outputs, Instant::now()) {
            continue;
        }
        std::thread::sleep(DEBOUNCE);
        while rx.try_recv().is_ok() {}

        println!("{} Change detected, regenerating...", "🔄".yellow());
        outputs = rebuild(config);
    }
    Ok(())
}

/// Paths a build writes itself.
///
/// The cache and doc links never trigger a rebuild. Generated files are only
/// ignored until `quiet_until`; an edit after that is repaired like any
/// other stale interface.
struct OwnOutputs {
    always: HashSet<PathBuf>,
    generated: HashSet<PathBuf>,
    quiet_until: Instant,
}

impl OwnOutputs {
    fn collect(config: &IgenConfig, quiet_until: Instant) -> Self {
        let mut always = HashSet::new();
        always.insert(config.cache.clone());
        let mut tmp = config.cache.as_os_str().to_owned();
        tmp.push(".tmp");
        always.insert(PathBuf::from(tmp));

        let generated: HashSet<PathBuf> = Manifest::load(&config.manifest)
            .and_then(|m| m.resolve(config))
            .map(|specs| specs.into_iter().map(|spec| spec.gen_path).collect())
            .unwrap_or_default();

        Self {
            always,
            generated,
            quiet_until,
        }
    }

    fn ignores(&self, path: &Path, now: Instant) -> bool {
        if self.always.contains(path) || path.extension().is_some_and(|ext| ext == "dox") {
            return true;
        }
        now < self.quiet_until && self.generated.contains(path)
    }
}

/// Runs one build and returns what it wrote.
fn rebuild(config: &IgenConfig) -> OwnOutputs {
    if let Err(e) = super::build::run(config) {
        println!("{} Error: {:#}", "x".red(), e);
    }
    OwnOutputs::collect(config, Instant::now() + SETTLE)
}

fn is_relevant(event: &Event, outputs: &OwnOutputs, now: Instant) -> bool {
    let changes = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    changes && event.paths.iter().any(|p| !outputs.ignores(p, now))
}
