//! Documentation links.
//!
//! Each written interface gets a `<slug>.dox` symlink in the documentation
//! directory so doxygen picks the generated file up without the build
//! having to know where interfaces live.

use crate::error::{IgenError, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// `kvs/kvs` becomes `kvs_kvs.dox`.
pub fn link_name(slug: &str) -> String {
    format!("{}.dox", slug.replace('/', "_"))
}

/// (Re)creates `<root>/<doc_dir>/<link_name(slug)>` pointing at `gen_rel`.
///
/// The target is relative when both paths live under `root`. Returns the
/// link path.
pub fn link_doc(root: &Path, doc_dir: &Path, slug: &str, gen_rel: &Path) -> Result<PathBuf> {
    let dir = root.join(doc_dir);
    fs::create_dir_all(&dir).map_err(|e| IgenError::io(&dir, e))?;

    let link = dir.join(link_name(slug));
    let target = link_target(root, doc_dir, gen_rel);

    remove_existing(&link)?;
    match symlink(&target, &link) {
        Ok(()) => Ok(link),
        // Another process recreated it between remove and create.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            remove_existing(&link)?;
            symlink(&target, &link).map_err(|e| IgenError::io(&link, e))?;
            Ok(link)
        }
        Err(e) => Err(IgenError::io(&link, e)),
    }
}

fn link_target(root: &Path, doc_dir: &Path, gen_rel: &Path) -> PathBuf {
    let plain = |p: &Path| p.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain(doc_dir) || !plain(gen_rel) {
        return root.join(gen_rel);
    }
    let mut target = PathBuf::new();
    for c in doc_dir.components() {
        if matches!(c, Component::Normal(_)) {
            target.push("..");
        }
    }
    target.join(gen_rel)
}

fn remove_existing(link: &Path) -> Result<()> {
    match fs::symlink_metadata(link) {
        Ok(_) => fs::remove_file(link).map_err(|e| IgenError::io(link, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(IgenError::io(link, e)),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_name_flattens_slug() {
        assert_eq!(link_name("kvs/kvs"), "kvs_kvs.dox");
        assert_eq!(link_name("app"), "app.dox");
    }

    #[test]
    fn relative_target_climbs_out_of_doc_dir() {
        let target = link_target(
            Path::new("/p"),
            Path::new("doc/gen_interface"),
            Path::new("src/togo/kvs/kvs.gen_interface"),
        );
        assert_eq!(target, PathBuf::from("../../src/togo/kvs/kvs.gen_interface"));
    }

    #[test]
    fn escaping_paths_use_absolute_target() {
        let target = link_target(Path::new("/p"), Path::new("../docs"), Path::new("a.gen_interface"));
        assert_eq!(target, PathBuf::from("/p/a.gen_interface"));
    }

    #[cfg(unix)]
    #[test]
    fn link_resolves_to_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        let gen_rel = Path::new("src/kvs.gen_interface");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join(gen_rel), "void f();\n").unwrap();

        let link = link_doc(dir.path(), Path::new("doc/gen_interface"), "kvs/kvs", gen_rel).unwrap();
        assert_eq!(link, dir.path().join("doc/gen_interface/kvs_kvs.dox"));
        assert_eq!(fs::read_to_string(&link).unwrap(), "void f();\n");
    }

    #[cfg(unix)]
    #[test]
    fn existing_link_or_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let doc_dir = Path::new("doc");
        fs::create_dir_all(dir.path().join(doc_dir)).unwrap();
        fs::write(dir.path().join("doc/app.dox"), "stale").unwrap();
        fs::write(dir.path().join("app.gen_interface"), "new").unwrap();

        let gen_rel = Path::new("app.gen_interface");
        link_doc(dir.path(), doc_dir, "app", gen_rel).unwrap();
        let link = link_doc(dir.path(), doc_dir, "app", gen_rel).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&link).unwrap(), "new");
    }
}
