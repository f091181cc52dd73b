//! Interface manifest (`toolchain/igen_users`).
//!
//! ```json
//! { "users": [ {
//!     "slug": "kvs/kvs",
//!     "header": "kvs/kvs.hpp",
//!     "source": "kvs/kvs.cpp",
//!     "gen_path": "kvs/kvs.gen_interface",
//!     "namespace": "togo::kvs",
//!     "doc_group": "lib_core_kvs"
//! } ] }
//! ```
//!
//! Paths are relative to the configured `source_root`. A header may list
//! further sources with `// igen-source: <path>` and
//! `// igen-source-pattern: <regex>` comment lines.

use crate::config::IgenConfig;
use crate::error::{IgenError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const SOURCE_DIRECTIVE: &str = "igen-source:";
const PATTERN_DIRECTIVE: &str = "igen-source-pattern:";

#[derive(Deserialize, Debug, Clone)]
pub struct Manifest {
    pub users: Vec<UserEntry>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserEntry {
    pub slug: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub header: Option<String>,
    pub gen_path: String,
    pub namespace: String,
    #[serde(default)]
    pub doc_group: String,
}

/// A fully resolved interface, ready to become an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub slug: String,
    /// Absolute source paths, in extraction order.
    pub sources: Vec<PathBuf>,
    /// Root-relative, `/`-separated source paths for display.
    pub source_labels: Vec<String>,
    pub gen_path: PathBuf,
    /// `gen_path` relative to the project root.
    pub gen_rel: PathBuf,
    pub namespace: String,
    pub doc_group: String,
}

impl ArtifactSpec {
    pub fn cache_key(&self) -> String {
        path_key(&self.gen_rel)
    }
}

/// `/`-separated form of a relative path, stable across platforms.
pub fn path_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IgenError::ManifestMissing(path.to_path_buf()));
            }
            Err(e) => return Err(IgenError::io(path, e)),
        };
        serde_json::from_str(&text).map_err(|e| IgenError::ManifestParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Resolves every entry in manifest order.
    ///
    /// Fails on duplicate slugs, duplicate outputs, and entries without
    /// sources.
    pub fn resolve(&self, config: &IgenConfig) -> Result<Vec<ArtifactSpec>> {
        let mut slugs = HashSet::new();
        let mut outputs: HashMap<PathBuf, &str> = HashMap::new();
        let mut specs = Vec::with_capacity(self.users.len());

        for user in &self.users {
            if !slugs.insert(user.slug.as_str()) {
                return Err(IgenError::DuplicateSlug(user.slug.clone()));
            }
            let spec = user.resolve(config)?;
            if let Some(first) = outputs.insert(spec.gen_rel.clone(), &user.slug) {
                return Err(IgenError::DuplicateOutput {
                    first: first.to_string(),
                    second: user.slug.clone(),
                    path: spec.gen_rel,
                });
            }
            specs.push(spec);
        }
        Ok(specs)
    }
}

impl UserEntry {
    fn resolve(&self, config: &IgenConfig) -> Result<ArtifactSpec> {
        let mut rels: Vec<PathBuf> = self
            .source
            .iter()
            .chain(&self.sources)
            .map(|s| config.source_rel(s))
            .collect();
        if let Some(header) = &self.header {
            rels.extend(self.header_sources(config, header)?);
        }

        let mut seen = HashSet::new();
        rels.retain(|r| seen.insert(path_key(r)));
        if rels.is_empty() {
            return Err(IgenError::NoSources {
                slug: self.slug.clone(),
            });
        }

        let gen_rel = config.source_rel(&self.gen_path);
        Ok(ArtifactSpec {
            slug: self.slug.clone(),
            sources: rels.iter().map(|r| config.root.join(r)).collect(),
            source_labels: rels.iter().map(|r| path_key(r)).collect(),
            gen_path: config.root.join(&gen_rel),
            gen_rel,
            namespace: self.namespace.clone(),
            doc_group: self.doc_group.clone(),
        })
    }

    /// Sources named by directives in the header, relative to the root.
    fn header_sources(&self, config: &IgenConfig, header: &str) -> Result<Vec<PathBuf>> {
        let header_rel = config.source_rel(header);
        let header_path = config.root.join(&header_rel);
        let text = match fs::read_to_string(&header_path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IgenError::SourceMissing {
                    slug: self.slug.clone(),
                    path: header_path,
                });
            }
            Err(e) => return Err(IgenError::io(&header_path, e)),
        };
        let header_dir = header_rel.parent().unwrap_or(Path::new("")).to_path_buf();

        let mut found = Vec::new();
        for line in text.lines() {
            let Some(comment) = line.trim().strip_prefix("//") else {
                continue;
            };
            let comment = comment.trim();
            if let Some(pattern) = comment.strip_prefix(PATTERN_DIRECTIVE) {
                found.extend(self.match_pattern(config, &header_dir, pattern.trim())?);
            } else if let Some(path) = comment.strip_prefix(SOURCE_DIRECTIVE) {
                found.push(resolve_directive(config, &header_dir, path.trim()));
            }
        }
        Ok(found)
    }

    fn match_pattern(&self, config: &IgenConfig, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let re = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| IgenError::SourcePattern {
            slug: self.slug.clone(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let base = config.root.join(dir);
        let mut matches: Vec<PathBuf> = WalkDir::new(&base)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&base).ok()?;
                re.is_match(&path_key(rel)).then(|| dir.join(rel))
            })
            .collect();
        matches.sort();
        Ok(matches)
    }
}

/// Beside the header, then under `source_root`, then from the project
/// root. A path found nowhere stays under `source_root` and fails at load.
fn resolve_directive(config: &IgenConfig, header_dir: &Path, path: &str) -> PathBuf {
    let under_root = config.source_rel(path);
    [header_dir.join(path), under_root.clone(), PathBuf::from(path)]
        .into_iter()
        .find(|rel| config.root.join(rel).exists())
        .unwrap_or(under_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, IgenConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = IgenConfig::new(dir.path());
        config.source_root = PathBuf::from("src/togo");
        fs::create_dir_all(dir.path().join("src/togo/kvs")).unwrap();
        (dir, config)
    }

    fn entry(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolves_single_source_entry() {
        let (dir, config) = project();
        let manifest = entry(
            r#"{"users": [{"slug": "kvs/kvs", "source": "kvs/kvs.cpp",
                "gen_path": "kvs/kvs.gen_interface", "namespace": "togo::kvs",
                "doc_group": "lib_core_kvs"}]}"#,
        );
        let specs = manifest.resolve(&config).unwrap();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.sources, vec![dir.path().join("src/togo/kvs/kvs.cpp")]);
        assert_eq!(spec.source_labels, vec!["src/togo/kvs/kvs.cpp"]);
        assert_eq!(spec.gen_path, dir.path().join("src/togo/kvs/kvs.gen_interface"));
        assert_eq!(spec.cache_key(), "src/togo/kvs/kvs.gen_interface");
    }

    #[test]
    fn entry_without_sources_is_rejected() {
        let (_dir, config) = project();
        let manifest = entry(
            r#"{"users": [{"slug": "empty", "gen_path": "e.gen_interface", "namespace": "x"}]}"#,
        );
        assert!(matches!(
            manifest.resolve(&config),
            Err(IgenError::NoSources { ref slug }) if slug == "empty"
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let (_dir, config) = project();
        let manifest = entry(
            r#"{"users": [
                {"slug": "a", "source": "a.cpp", "gen_path": "a.gen_interface", "namespace": "x"},
                {"slug": "a", "source": "b.cpp", "gen_path": "b.gen_interface", "namespace": "x"}
            ]}"#,
        );
        assert!(matches!(manifest.resolve(&config), Err(IgenError::DuplicateSlug(_))));

        let manifest = entry(
            r#"{"users": [
                {"slug": "a", "source": "a.cpp", "gen_path": "same.gen_interface", "namespace": "x"},
                {"slug": "b", "source": "b.cpp", "gen_path": "same.gen_interface", "namespace": "x"}
            ]}"#,
        );
        assert!(matches!(
            manifest.resolve(&config),
            Err(IgenError::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn header_directives_add_sources() {
        let (dir, config) = project();
        let kvs = dir.path().join("src/togo/kvs");
        fs::write(
            kvs.join("kvs.hpp"),
            "#pragma once\n// igen-source: io.cpp\n// igen-source-pattern: impl/.*\\.cpp\n",
        )
        .unwrap();
        fs::write(kvs.join("io.cpp"), "").unwrap();
        fs::create_dir_all(kvs.join("impl")).unwrap();
        fs::write(kvs.join("impl/b.cpp"), "").unwrap();
        fs::write(kvs.join("impl/a.cpp"), "").unwrap();
        fs::write(kvs.join("impl/notes.txt"), "").unwrap();

        let manifest = entry(
            r#"{"users": [{"slug": "kvs/kvs", "header": "kvs/kvs.hpp",
                "sources": ["kvs/kvs.cpp", "kvs/io.cpp"],
                "gen_path": "kvs/kvs.gen_interface", "namespace": "togo::kvs"}]}"#,
        );
        let specs = manifest.resolve(&config).unwrap();
        assert_eq!(
            specs[0].source_labels,
            vec![
                "src/togo/kvs/kvs.cpp",
                "src/togo/kvs/io.cpp",
                "src/togo/kvs/impl/a.cpp",
                "src/togo/kvs/impl/b.cpp",
            ]
        );
    }

    #[test]
    fn source_directive_falls_back_to_source_root() {
        let (dir, config) = project();
        fs::write(
            dir.path().join("src/togo/kvs/kvs.hpp"),
            "// igen-source: shared/common.cpp\n",
        )
        .unwrap();
        let manifest = entry(
            r#"{"users": [{"slug": "kvs", "header": "kvs/kvs.hpp",
                "gen_path": "kvs.gen_interface", "namespace": "x"}]}"#,
        );
        let specs = manifest.resolve(&config).unwrap();
        assert_eq!(specs[0].source_labels, vec!["src/togo/shared/common.cpp"]);
    }

    #[test]
    fn source_directive_accepts_project_relative_path() {
        let (dir, config) = project();
        let kvs = dir.path().join("src/togo/kvs");
        fs::write(kvs.join("kvs.hpp"), "#pragma once\n// igen-source: src/togo/kvs/io.cpp\n").unwrap();
        fs::write(kvs.join("io.cpp"), "").unwrap();
        let manifest = entry(
            r#"{"users": [{"slug": "kvs/kvs", "header": "kvs/kvs.hpp",
                "sources": ["kvs/kvs.cpp"],
                "gen_path": "kvs/kvs.gen_interface", "namespace": "togo::kvs"}]}"#,
        );
        let specs = manifest.resolve(&config).unwrap();
        assert_eq!(
            specs[0].source_labels,
            vec!["src/togo/kvs/kvs.cpp", "src/togo/kvs/io.cpp"]
        );
        assert_eq!(specs[0].sources[1], kvs.join("io.cpp"));
    }

    #[test]
    fn invalid_pattern_names_slug() {
        let (dir, config) = project();
        fs::write(
            dir.path().join("src/togo/kvs/kvs.hpp"),
            "// igen-source-pattern: ([\n",
        )
        .unwrap();
        let manifest = entry(
            r#"{"users": [{"slug": "kvs", "header": "kvs/kvs.hpp", "source": "kvs/kvs.cpp",
                "gen_path": "kvs.gen_interface", "namespace": "x"}]}"#,
        );
        let err = manifest.resolve(&config).unwrap_err();
        assert!(matches!(err, IgenError::SourcePattern { ref slug, .. } if slug == "kvs"));
    }

    #[test]
    fn missing_and_malformed_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("igen_users");
        assert!(matches!(Manifest::load(&path), Err(IgenError::ManifestMissing(_))));

        fs::write(&path, r#"{"users": [{"slug": 1}]}"#).unwrap();
        assert!(matches!(
            Manifest::load(&path),
            Err(IgenError::ManifestParse { .. })
        ));
    }

    #[test]
    fn path_key_uses_forward_slashes() {
        let path: PathBuf = ["src", "togo", "kvs.gen_interface"].iter().collect();
        assert_eq!(path_key(&path), "src/togo/kvs.gen_interface");
    }
}
