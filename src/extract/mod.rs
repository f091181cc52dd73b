//! Declaration extraction.
//!
//! An [`Extractor`] turns one source file into the ordered list of
//! declarations an interface exports. Selection happens in two stages, both
//! supplied by the caller and both given the interface being generated:
//!
//! - a [`SyntaxFilter`] sees raw nodes before any resolution and is meant to
//!   cheaply drop nodes from other files or without documentation;
//! - a [`DeclarationFilter`] sees fully resolved declarations and makes the
//!   final inclusion decision (namespace match, markers).
//!
//! The built-in extractor is [`SourceScanner`].

mod scanner;

pub use scanner::{ANONYMOUS_NAMESPACE, SourceScanner};

use crate::manifest::ArtifactSpec;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Markers recognized on declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Export the declaration even if it lives outside the interface namespace.
    Interface,
    /// Export the declaration, but keep it out of the public documentation.
    Private,
}

impl Marker {
    pub const ALL: [Marker; 2] = [Marker::Interface, Marker::Private];

    /// Maps a source token (macro or annotation string) to a marker.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "IGEN_INTERFACE" | "igen_interface" => Some(Marker::Interface),
            "IGEN_PRIVATE" | "igen_private" => Some(Marker::Private),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Marker::Interface => "IGEN_INTERFACE",
            Marker::Private => "IGEN_PRIVATE",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Marker::Interface => 1,
            Marker::Private => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MarkerSet(u8);

impl MarkerSet {
    pub fn insert(&mut self, marker: Marker) {
        self.0 |= marker.bit();
    }

    pub fn contains(&self, marker: Marker) -> bool {
        self.0 & marker.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Marker> + '_ {
        Marker::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<Marker> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        let mut set = MarkerSet::default();
        for marker in iter {
            set.insert(marker);
        }
        set
    }
}

/// A candidate declaration as seen by the scanner, before resolution.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxNode<'a> {
    pub file: &'a Path,
    pub line: usize,
    /// Doc comment lines directly preceding the node.
    pub doc: &'a [String],
    pub markers: MarkerSet,
    /// Raw declaration text up to (not including) the body.
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter text without any `IGEN_DEFAULT(...)`.
    pub text: String,
    pub default: Option<String>,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{} = {}", self.text, default),
            None => f.write_str(&self.text),
        }
    }
}

/// A resolved function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub file: PathBuf,
    pub line: usize,
    /// Fully qualified enclosing namespace, e.g. `togo::kvs`. Empty for global.
    pub namespace: String,
    pub name: String,
    /// Everything before the name: specifiers, template header, return type.
    pub return_type: String,
    pub params: Vec<Param>,
    /// Everything after the parameter list: `const`, `noexcept`, `-> T`.
    pub suffix: String,
    pub doc: Vec<String>,
    pub markers: MarkerSet,
}

impl Declaration {
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    /// Declaration as written inside its namespace, defaults applied.
    pub fn signature(&self) -> String {
        self.format_with(&self.name)
    }

    pub fn signature_fqn(&self) -> String {
        self.format_with(&self.qualified_name())
    }

    fn format_with(&self, name: &str) -> String {
        let params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = String::new();
        if !self.return_type.is_empty() {
            out.push_str(&self.return_type);
            out.push(' ');
        }
        out.push_str(name);
        out.push('(');
        out.push_str(&params);
        out.push(')');
        if !self.suffix.is_empty() {
            out.push(' ');
            out.push_str(&self.suffix);
        }
        out
    }
}

/// First-stage filter over raw syntax nodes.
pub trait SyntaxFilter: Send + Sync {
    fn accept(&self, node: &SyntaxNode<'_>, artifact: &ArtifactSpec) -> bool;
}

/// Second-stage filter over resolved declarations.
pub trait DeclarationFilter: Send + Sync {
    fn accept(&self, declaration: &Declaration, artifact: &ArtifactSpec) -> bool;
}

/// The two filters plus the interface they are evaluated for.
#[derive(Clone, Copy)]
pub struct Filters<'a> {
    pub syntax: &'a dyn SyntaxFilter,
    pub declaration: &'a dyn DeclarationFilter,
    pub artifact: &'a ArtifactSpec,
}

pub trait Extractor: Send + Sync {
    /// Extracts the declarations of `path` that pass `filters`, in source order.
    ///
    /// Must be deterministic for a given file content and flag list.
    fn extract(
        &self,
        path: &Path,
        flags: &[String],
        filters: &Filters<'_>,
    ) -> Result<Vec<Declaration>, ExtractError>;
}

/// Keeps documented nodes that belong to one of the interface's sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentedInFile;

impl SyntaxFilter for DocumentedInFile {
    fn accept(&self, node: &SyntaxNode<'_>, artifact: &ArtifactSpec) -> bool {
        !node.doc.is_empty() && artifact.sources.iter().any(|s| s == node.file)
    }
}

/// Keeps declarations in the interface namespace or marked `IGEN_INTERFACE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceOrMarker;

impl DeclarationFilter for NamespaceOrMarker {
    fn accept(&self, declaration: &Declaration, artifact: &ArtifactSpec) -> bool {
        declaration.namespace == artifact.namespace
            || declaration.markers.contains(Marker::Interface)
    }
}
