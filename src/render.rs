//! Rendering declarations into a generated interface file.

use crate::extract::{ANONYMOUS_NAMESPACE, Declaration, Marker};
use crate::manifest::ArtifactSpec;
use std::fmt::Write as _;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Declarations with internal linkage cannot be exported.
    #[error("{name} lives in an anonymous namespace and cannot be exported")]
    AnonymousNamespace { name: String },
}

/// Turns an interface's declarations into file content.
///
/// Implementations must be pure: the same input always renders the same
/// bytes, otherwise hash-gated writes stop working.
pub trait Renderer: Send + Sync {
    fn render(&self, declarations: &[Declaration], artifact: &ArtifactSpec) -> Result<String, RenderError>;
}

/// Emits a doxygen-friendly list of forward declarations.
///
/// ```text
/// // generated from: src/togo/kvs/kvs.cpp
/// // Do not edit; regenerated by igen.
///
/// #pragma once
///
/// /** @addtogroup lib_core_kvs
/// @{ */
/// namespace togo {
/// namespace kvs {
///
/// /// Grow collection.
/// void grow(KVS& kvs, u32 const min_capacity = 0);
///
/// } // namespace kvs
/// } // namespace togo
/// /** @} */
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceRenderer;

impl Renderer for InterfaceRenderer {
    fn render(&self, declarations: &[Declaration], artifact: &ArtifactSpec) -> Result<String, RenderError> {
        if let Some(decl) = declarations
            .iter()
            .find(|d| d.namespace.split("::").any(|n| n == ANONYMOUS_NAMESPACE))
        {
            return Err(RenderError::AnonymousNamespace {
                name: decl.qualified_name(),
            });
        }

        let mut out = String::new();
        for label in &artifact.source_labels {
            let _ = writeln!(out, "// generated from: {}", label);
        }
        out.push_str("// Do not edit; regenerated by igen.\n\n#pragma once\n\n");

        let grouped = !artifact.doc_group.is_empty();
        if grouped {
            let _ = writeln!(out, "/** @addtogroup {}\n@{{ */", artifact.doc_group);
        }

        for (namespace, decls) in group_by_namespace(declarations) {
            let parts: Vec<&str> = namespace.split("::").filter(|p| !p.is_empty()).collect();
            for part in &parts {
                let _ = writeln!(out, "namespace {} {{", part);
            }
            out.push('\n');
            for decl in decls {
                write_declaration(&mut out, decl);
                out.push('\n');
            }
            for part in parts.iter().rev() {
                let _ = writeln!(out, "}} // namespace {}", part);
            }
        }

        if grouped {
            out.push_str("/** @} */\n");
        }
        Ok(out)
    }
}

fn write_declaration(out: &mut String, decl: &Declaration) {
    let private = decl.markers.contains(Marker::Private);
    if private {
        out.push_str("/** @cond INTERNAL */\n");
    }
    for line in &decl.doc {
        if line.is_empty() {
            out.push_str("///\n");
        } else {
            let _ = writeln!(out, "/// {}", line);
        }
    }
    let _ = writeln!(out, "{};", decl.signature());
    if private {
        out.push_str("/** @endcond */\n");
    }
}

/// Groups declarations by namespace, in order of first appearance.
fn group_by_namespace(declarations: &[Declaration]) -> Vec<(&str, Vec<&Declaration>)> {
    let mut groups: Vec<(&str, Vec<&Declaration>)> = Vec::new();
    for decl in declarations {
        match groups.iter_mut().find(|(ns, _)| *ns == decl.namespace) {
            Some((_, list)) => list.push(decl),
            None => groups.push((decl.namespace.as_str(), vec![decl])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{MarkerSet, Param};
    use std::path::PathBuf;

    fn spec(doc_group: &str) -> ArtifactSpec {
        ArtifactSpec {
            slug: "kvs/kvs".to_string(),
            sources: vec![PathBuf::from("/p/src/togo/kvs/kvs.cpp")],
            source_labels: vec!["src/togo/kvs/kvs.cpp".to_string()],
            gen_path: PathBuf::from("/p/src/togo/kvs/kvs.gen_interface"),
            gen_rel: PathBuf::from("src/togo/kvs/kvs.gen_interface"),
            namespace: "togo::kvs".to_string(),
            doc_group: doc_group.to_string(),
        }
    }

    fn decl(namespace: &str, name: &str, doc: &[&str], markers: MarkerSet) -> Declaration {
        Declaration {
            file: PathBuf::from("/p/src/togo/kvs/kvs.cpp"),
            line: 1,
            namespace: namespace.to_string(),
            name: name.to_string(),
            return_type: "void".to_string(),
            params: vec![Param {
                text: "KVS& kvs".to_string(),
                default: None,
            }],
            suffix: String::new(),
            doc: doc.iter().map(|s| s.to_string()).collect(),
            markers,
        }
    }

    #[test]
    fn renders_grouped_namespaces() {
        let decls = vec![
            decl("togo::kvs", "clear", &["Clear.", "", "Details."], MarkerSet::default()),
            decl("togo", "run", &["Run."], MarkerSet::default()),
            decl("togo::kvs", "grow", &["Grow."], MarkerSet::default()),
        ];
        let text = InterfaceRenderer.render(&decls, &spec("lib_core_kvs")).unwrap();
        let expected = "\
// generated from: src/togo/kvs/kvs.cpp
// Do not edit; regenerated by igen.

#pragma once

/** @addtogroup lib_core_kvs
@{ */
namespace togo {
namespace kvs {

/// Clear.
///
/// Details.
void clear(KVS& kvs);

/// Grow.
void grow(KVS& kvs);

} // namespace kvs
} // namespace togo
namespace togo {

/// Run.
void run(KVS& kvs);

} // namespace togo
/** @} */
";
        assert_eq!(text, expected);
    }

    #[test]
    fn private_declarations_are_hidden_from_docs() {
        let private: MarkerSet = [Marker::Private].into_iter().collect();
        let decls = vec![decl("togo::kvs", "internal", &["Internal."], private)];
        let text = InterfaceRenderer.render(&decls, &spec("")).unwrap();
        assert!(text.contains("/** @cond INTERNAL */\n/// Internal.\nvoid internal(KVS& kvs);\n/** @endcond */\n"));
        assert!(!text.contains("@addtogroup"));
    }

    #[test]
    fn empty_interface_still_has_banner() {
        let text = InterfaceRenderer.render(&[], &spec("g")).unwrap();
        assert!(text.starts_with("// generated from: src/togo/kvs/kvs.cpp\n"));
        assert!(text.contains("#pragma once"));
        assert!(text.ends_with("@{ */\n/** @} */\n"));
    }

    #[test]
    fn anonymous_namespace_is_rejected() {
        let decls = vec![decl("togo::(anonymous)", "helper", &["x"], MarkerSet::default())];
        let err = InterfaceRenderer.render(&decls, &spec("")).unwrap_err();
        assert!(err.to_string().contains("togo::(anonymous)::helper"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let decls = vec![decl("togo::kvs", "grow", &["Grow."], MarkerSet::default())];
        let a = InterfaceRenderer.render(&decls, &spec("g")).unwrap();
        let b = InterfaceRenderer.render(&decls, &spec("g")).unwrap();
        assert_eq!(a, b);
    }
}
