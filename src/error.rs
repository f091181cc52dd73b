//! Error types for interface generation.
//!
//! Every variant is fatal for the run. Messages always name the offending
//! interface slug and/or path, since a single run may touch many interfaces.

use std::path::{Path, PathBuf};

pub type Result<T, E = IgenError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum IgenError {
    /// The manifest listing the interfaces does not exist.
    #[error("manifest not found at {}", .0.display())]
    ManifestMissing(PathBuf),

    /// The manifest exists but could not be parsed.
    #[error("failed to parse manifest {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    /// The project config (`igen.toml`) could not be parsed.
    #[error("invalid config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// An interface resolved to zero source files.
    #[error("interface '{slug}' declares no source files")]
    NoSources { slug: String },

    #[error("duplicate interface slug '{0}' in manifest")]
    DuplicateSlug(String),

    #[error("interfaces '{first}' and '{second}' both generate {}", path.display())]
    DuplicateOutput {
        first: String,
        second: String,
        path: PathBuf,
    },

    /// An `igen-source-pattern` directive is not a valid regex.
    #[error("interface '{slug}': invalid source pattern '{pattern}': {reason}")]
    SourcePattern {
        slug: String,
        pattern: String,
        reason: String,
    },

    #[error("interface '{slug}': source file not found: {}", path.display())]
    SourceMissing { slug: String, path: PathBuf },

    /// The persisted check cache is not valid JSON of the expected shape.
    #[error("check cache {} is corrupt ({reason}); delete it to force a full re-check", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("interface '{slug}': extraction failed: {source}")]
    Extract {
        slug: String,
        #[source]
        source: crate::extract::ExtractError,
    },

    #[error("interface '{slug}': render failed: {source}")]
    Render {
        slug: String,
        #[source]
        source: crate::render::RenderError,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IgenError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        IgenError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sources_names_slug() {
        let err = IgenError::NoSources {
            slug: "kvs/kvs".to_string(),
        };
        assert!(err.to_string().contains("kvs/kvs"));
    }

    #[test]
    fn io_error_names_path() {
        let err = IgenError::io(
            "src/kvs.gen_interface",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("kvs.gen_interface"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn cache_corrupt_suggests_recovery() {
        let err = IgenError::CacheCorrupt {
            path: PathBuf::from("toolchain/igen_cache"),
            reason: "expected value at line 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("igen_cache"));
        assert!(msg.contains("delete it"));
    }

    #[test]
    fn duplicate_output_names_both_interfaces() {
        let err = IgenError::DuplicateOutput {
            first: "a".to_string(),
            second: "b".to_string(),
            path: PathBuf::from("x.gen_interface"),
        };
        let msg = err.to_string();
        assert!(msg.contains("'a'"));
        assert!(msg.contains("'b'"));
    }
}
