//! Compiler flags forwarded to the extractor.
//!
//! The build hands us the same flags it gives the real compiler. Some of
//! them only make sense for an actual compile (dependency-file generation)
//! and are stripped before forwarding.

/// Flags prepended to every extractor invocation.
pub const BASE_FLAGS: &[&str] = &["-fsyntax-only", "-DIGEN_RUNNING"];

/// Standalone flags that are dropped.
const DENIED: &[&str] = &["-MMD", "-MP", "-MD", "-M", "-MM"];

/// Flags that take an argument (`-MF deps.d` or `-MFdeps.d`); both are dropped.
const DENIED_WITH_ARG: &[&str] = &["-MF", "-MT", "-MQ"];

/// Builds the extractor flag list from raw compiler flags.
///
/// `exclude` adds project-specific entries to the denylist (exact match).
pub fn sanitize<S: AsRef<str>>(raw: &[S], exclude: &[String]) -> Vec<String> {
    let mut out: Vec<String> = BASE_FLAGS.iter().map(|s| s.to_string()).collect();
    let mut iter = raw.iter().map(AsRef::as_ref);

    while let Some(flag) = iter.next() {
        if DENIED.contains(&flag) || exclude.iter().any(|e| e == flag) {
            continue;
        }
        if DENIED_WITH_ARG.contains(&flag) {
            iter.next();
            continue;
        }
        if DENIED_WITH_ARG.iter().any(|d| flag.starts_with(d)) {
            continue;
        }
        if BASE_FLAGS.contains(&flag) {
            continue;
        }
        out.push(flag.to_string());
    }
    out
}

/// Preprocessor defines (`-DNAME` / `-DNAME=VALUE` / `-D NAME`) in `flags`.
pub fn defines(flags: &[String]) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let body = if flag == "-D" {
            match iter.next() {
                Some(next) => next.as_str(),
                None => break,
            }
        } else if let Some(rest) = flag.strip_prefix("-D") {
            rest
        } else {
            continue;
        };
        match body.split_once('=') {
            Some((name, value)) => out.push((name.to_string(), Some(value.to_string()))),
            None => out.push((body.to_string(), None)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_flags_come_first() {
        let flags = sanitize(&["-std=c++14"], &[]);
        assert_eq!(flags, vec!["-fsyntax-only", "-DIGEN_RUNNING", "-std=c++14"]);
    }

    #[test]
    fn dependency_flags_are_stripped() {
        let flags = sanitize(
            &["-MMD", "-MP", "-Iinclude", "-MF", "obj/kvs.d", "-MTobj/kvs.o", "-O2"],
            &[],
        );
        assert_eq!(
            flags,
            vec!["-fsyntax-only", "-DIGEN_RUNNING", "-Iinclude", "-O2"]
        );
    }

    #[test]
    fn project_exclusions_apply() {
        let flags = sanitize(&["-Werror", "-Wall"], &["-Werror".to_string()]);
        assert_eq!(flags, vec!["-fsyntax-only", "-DIGEN_RUNNING", "-Wall"]);
    }

    #[test]
    fn base_flags_are_not_duplicated() {
        let flags = sanitize(&["-fsyntax-only", "-DIGEN_RUNNING"], &[]);
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn trailing_arg_flag_does_not_panic() {
        let flags = sanitize(&["-Ifoo", "-MF"], &[]);
        assert_eq!(flags.last().unwrap(), "-Ifoo");
    }

    #[test]
    fn defines_parse_all_forms() {
        let flags: Vec<String> = ["-DIGEN_RUNNING", "-DTOGO_DEBUG=1", "-D", "X", "-Iinc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            defines(&flags),
            vec![
                ("IGEN_RUNNING".to_string(), None),
                ("TOGO_DEBUG".to_string(), Some("1".to_string())),
                ("X".to_string(), None),
            ]
        );
    }
}
