//! Run configuration.
//!
//! Everything a run needs is resolved once into an [`IgenConfig`] and passed
//! down explicitly: project paths from `igen.toml` (all optional), run flags
//! from the command line and environment, and the sanitized compiler flags.
//!
//! ```toml
//! manifest = "toolchain/igen_users"
//! cache = "toolchain/igen_cache"
//! source_root = "src/togo"
//! doc_dir = "doc/gen_interface"
//! jobs = 4
//!
//! [flags]
//! extra = ["-std=c++14", "-Iinclude"]
//! exclude = ["-Werror"]
//! ```

use crate::compiler_flags;
use crate::error::{IgenError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "igen.toml";
pub const DEFAULT_MANIFEST: &str = "toolchain/igen_users";
pub const DEFAULT_CACHE: &str = "toolchain/igen_cache";
pub const DEFAULT_DOC_DIR: &str = "doc/gen_interface";

/// Global toggles for a run. `force` implies `check`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// Re-check and rewrite every interface.
    pub force: bool,
    /// Re-check every interface; writes stay hash-gated.
    pub check: bool,
    /// Print every extracted declaration.
    pub debug: bool,
}

impl RunFlags {
    pub fn new(force: bool, check: bool, debug: bool) -> Self {
        Self {
            force,
            check: check || force,
            debug,
        }
    }

    /// Reads `FORCE`, `CHECK` and `DEBUG` from the environment.
    pub fn from_env() -> Self {
        Self::new(env_flag("FORCE"), env_flag("CHECK"), env_flag("DEBUG"))
    }

    /// Either source enabling a flag enables it.
    pub fn union(self, other: RunFlags) -> Self {
        Self::new(
            self.force || other.force,
            self.check || other.check,
            self.debug || other.debug,
        )
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off")
}

/// On-disk shape of `igen.toml`.
#[derive(Deserialize, Debug, Default)]
pub struct ProjectFile {
    pub manifest: Option<String>,
    pub cache: Option<String>,
    pub source_root: Option<String>,
    pub doc_dir: Option<String>,
    pub link_docs: Option<bool>,
    pub jobs: Option<usize>,
    #[serde(default)]
    pub flags: FlagsConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct FlagsConfig {
    #[serde(default)]
    pub extra: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IgenConfig {
    /// Project root; every relative path below is resolved against it.
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub cache: PathBuf,
    /// Prefix for manifest paths, relative to `root`.
    pub source_root: PathBuf,
    /// Documentation link directory relative to `root`; `None` disables links.
    pub doc_dir: Option<PathBuf>,
    /// Worker threads; 1 runs sequentially.
    pub jobs: usize,
    pub flags: RunFlags,
    /// Flags forwarded to the extractor, already sanitized.
    pub compiler_flags: Vec<String>,
    project_flags: FlagsConfig,
}

impl IgenConfig {
    /// Defaults for a project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            manifest: root.join(DEFAULT_MANIFEST),
            cache: root.join(DEFAULT_CACHE),
            source_root: PathBuf::new(),
            doc_dir: Some(PathBuf::from(DEFAULT_DOC_DIR)),
            jobs: 1,
            flags: RunFlags::default(),
            compiler_flags: compiler_flags::sanitize::<&str>(&[], &[]),
            project_flags: FlagsConfig::default(),
            root,
        }
    }

    /// Loads `config_path` (or `<root>/igen.toml`) on top of the defaults.
    ///
    /// A missing default config file is fine; a missing explicit one is not.
    pub fn load(root: impl Into<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::new(root);
        let path = match config_path {
            Some(p) => config.root.join(p),
            None => config.root.join(CONFIG_FILE),
        };

        if !path.exists() {
            if config_path.is_some() {
                return Err(IgenError::Config {
                    path,
                    reason: "file does not exist".to_string(),
                });
            }
            return Ok(config);
        }

        let text = fs::read_to_string(&path).map_err(|e| IgenError::io(&path, e))?;
        let file: ProjectFile = toml::from_str(&text).map_err(|e| IgenError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        config.apply(file, &path)?;
        Ok(config)
    }

    fn apply(&mut self, file: ProjectFile, path: &Path) -> Result<()> {
        if let Some(manifest) = file.manifest {
            self.manifest = self.root.join(manifest);
        }
        if let Some(cache) = file.cache {
            self.cache = self.root.join(cache);
        }
        if let Some(source_root) = file.source_root {
            self.source_root = PathBuf::from(source_root);
        }
        if let Some(doc_dir) = file.doc_dir {
            self.doc_dir = Some(PathBuf::from(doc_dir));
        }
        if file.link_docs == Some(false) {
            self.doc_dir = None;
        }
        if let Some(jobs) = file.jobs {
            if jobs == 0 {
                return Err(IgenError::Config {
                    path: path.to_path_buf(),
                    reason: "jobs must be at least 1".to_string(),
                });
            }
            self.jobs = jobs;
        }
        self.project_flags = file.flags;
        self.compiler_flags =
            compiler_flags::sanitize(&self.project_flags.extra, &self.project_flags.exclude);
        Ok(())
    }

    pub fn with_flags(mut self, flags: RunFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Appends command-line compiler flags after the project's `flags.extra`.
    pub fn with_compiler_flags(mut self, cli_flags: &[String]) -> Self {
        let raw: Vec<&str> = self
            .project_flags
            .extra
            .iter()
            .chain(cli_flags)
            .map(String::as_str)
            .collect();
        self.compiler_flags = compiler_flags::sanitize(&raw, &self.project_flags.exclude);
        self
    }

    /// `<source_root>/<path>`, relative to the project root.
    pub fn source_rel(&self, path: &str) -> PathBuf {
        self.source_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_implies_check() {
        let flags = RunFlags::new(true, false, false);
        assert!(flags.check);
    }

    #[test]
    fn union_keeps_any_enabled_flag() {
        let cli = RunFlags::new(false, true, false);
        let env = RunFlags::new(false, false, true);
        let flags = cli.union(env);
        assert!(flags.check && flags.debug && !flags.force);
    }

    #[test]
    fn truthy_env_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("False"));
    }

    #[test]
    fn missing_default_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = IgenConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.manifest, dir.path().join(DEFAULT_MANIFEST));
        assert_eq!(config.cache, dir.path().join(DEFAULT_CACHE));
        assert_eq!(config.doc_dir, Some(PathBuf::from(DEFAULT_DOC_DIR)));
        assert_eq!(config.jobs, 1);
        assert_eq!(config.compiler_flags, vec!["-fsyntax-only", "-DIGEN_RUNNING"]);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IgenConfig::load(dir.path(), Some(Path::new("custom.toml"))).unwrap_err();
        assert!(matches!(err, IgenError::Config { .. }));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
manifest = "igen/users.json"
source_root = "src/togo"
link_docs = false
jobs = 3

[flags]
extra = ["-std=c++14", "-MMD"]
exclude = ["-Werror"]
"#,
        )
        .unwrap();

        let config = IgenConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.manifest, dir.path().join("igen/users.json"));
        assert_eq!(config.source_root, PathBuf::from("src/togo"));
        assert_eq!(config.doc_dir, None);
        assert_eq!(config.jobs, 3);
        assert_eq!(
            config.compiler_flags,
            vec!["-fsyntax-only", "-DIGEN_RUNNING", "-std=c++14"]
        );

        let config = config.with_compiler_flags(&["-Werror".to_string(), "-Iinc".to_string()]);
        assert_eq!(
            config.compiler_flags,
            vec!["-fsyntax-only", "-DIGEN_RUNNING", "-std=c++14", "-Iinc"]
        );
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "jobs = 0\n").unwrap();
        assert!(IgenConfig::load(dir.path(), None).is_err());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "manifest = [").unwrap();
        let err = IgenConfig::load(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("igen.toml"));
    }

    #[test]
    fn source_paths_join_source_root() {
        let mut config = IgenConfig::new("/project");
        config.source_root = PathBuf::from("src/togo");
        assert_eq!(config.source_rel("kvs/kvs.cpp"), PathBuf::from("src/togo/kvs/kvs.cpp"));
    }
}
