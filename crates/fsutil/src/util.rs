use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumPatternMode, FsUtilError, Result};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

/// Compiled ignore pattern set.
///
/// Patterns are tested against the full path in the order given; the first
/// hit short-circuits. An empty set never ignores anything.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    patterns: Option<TypePatternSeq>,
}

impl IgnoreMatcher {
    /// Matcher that ignores nothing.
    pub fn empty() -> Self {
        Self { patterns: None }
    }

    /// Compile `patterns` under `rule_pattern`.
    ///
    /// Fails on the first malformed pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S], rule_pattern: EnumPatternMode) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }

        let patterns = match rule_pattern {
            EnumPatternMode::Literal => TypePatternSeq::Literal(
                patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            ),
            EnumPatternMode::Glob => {
                let mut l_glob = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    l_glob.push(_compile_glob(pattern.as_ref())?);
                }
                TypePatternSeq::Glob(l_glob)
            }
            EnumPatternMode::Regex => {
                let mut l_regex = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    let pattern = pattern.as_ref();
                    let regex = Regex::new(pattern).map_err(|e| FsUtilError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    })?;
                    l_regex.push(regex);
                }
                TypePatternSeq::Regex(l_regex)
            }
        };
        Ok(Self {
            patterns: Some(patterns),
        })
    }

    /// Whether `path` hits any pattern.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(patterns) = &self.patterns else {
            return false;
        };

        match patterns {
            TypePatternSeq::Glob(v) => v.iter().any(|p| p.is_match(path)),
            TypePatternSeq::Regex(v) => {
                let c_path = path.to_string_lossy();
                v.iter().any(|p| p.is_match(&c_path))
            }
            TypePatternSeq::Literal(v) => {
                let c_path = path.to_string_lossy();
                v.iter().any(|p| *p == c_path)
            }
        }
    }
}

// `*` and `?` stay within one path component, `**` spans directories.
fn _compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| FsUtilError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })?;
    Ok(glob.compile_matcher())
}

/// Test `path` against glob `patterns` in one call.
///
/// Returns `Ok(false)` for an empty pattern list and an error for the first
/// malformed pattern.
pub fn is_ignored_path<P, S>(path: P, patterns: &[S]) -> Result<bool>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let matcher = IgnoreMatcher::new(patterns, EnumPatternMode::Glob)?;
    Ok(matcher.is_ignored(path.as_ref()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Collapse `.` and `..` without touching the filesystem.
///
/// `..` never climbs above the root of an absolute path.
pub(crate) fn clean_path(path: &Path) -> PathBuf {
    let mut path_out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                let b_can_pop = matches!(
                    path_out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if b_can_pop {
                    path_out.pop();
                } else if !path_out.has_root() {
                    path_out.push("..");
                }
            }
            other => path_out.push(other.as_os_str()),
        }
    }
    if path_out.as_os_str().is_empty() {
        path_out.push(".");
    }
    path_out
}

/// Absolute, lexically cleaned form of `path`. The path need not exist.
pub(crate) fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return clean_path(path);
    }
    let path_cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    clean_path(&path_cwd.join(path))
}

// Canonicalize the deepest existing ancestor and re-append the rest.
fn _normalize_path(path: &Path) -> PathBuf {
    let path_abs = absolutize_path(path);
    for path_ancestor in path_abs.ancestors() {
        if let Ok(resolved) = fs::canonicalize(path_ancestor) {
            return match path_abs.strip_prefix(path_ancestor) {
                Ok(path_rest) if !path_rest.as_os_str().is_empty() => resolved.join(path_rest),
                _ => resolved,
            };
        }
    }
    path_abs
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Map `path_src` from under `path_dir_src` onto `path_dir_dst`.
///
/// The root itself maps onto `path_dir_dst`.
pub(crate) fn derive_destination_path(
    path_src: &Path,
    path_dir_src: &Path,
    path_dir_dst: &Path,
) -> PathBuf {
    match path_src.strip_prefix(path_dir_src) {
        Ok(path_rel) if path_rel.as_os_str().is_empty() => path_dir_dst.to_path_buf(),
        Ok(path_rel) => path_dir_dst.join(path_rel),
        Err(_) => path_dir_dst.join(path_src.file_name().unwrap_or_default()),
    }
}

/// Resolve archive entry `name` under `path_dir_root`, refusing escapes.
///
/// Root and drive prefixes in `name` are dropped, `.` is skipped and `..`
/// pops one level. The result must be strictly inside `path_dir_root`.
pub(crate) fn resolve_entry_path(path_dir_root: &Path, name: &str) -> Result<PathBuf> {
    let path_dir_root = clean_path(path_dir_root);
    let mut path_target = path_dir_root.clone();
    for part in Path::new(name).components() {
        match part {
            Component::Normal(v) => path_target.push(v),
            Component::ParentDir => {
                path_target.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if path_target == path_dir_root || !path_target.starts_with(&path_dir_root) {
        return Err(FsUtilError::PathTraversal {
            entry: name.to_string(),
            path: path_target,
        });
    }
    Ok(path_target)
}

/// `symlink_metadata` that maps not-found to `None`.
pub(crate) fn stat_no_follow(path: &Path) -> Result<Option<fs::Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FsUtilError::io(path, e)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Metadata

/// Copy bytes from `path_file_src` to `path_file_dst`, optionally carrying
/// permissions, timestamps and extended attributes.
pub(crate) fn copy_file_contents(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_keep_metadata: bool,
) -> io::Result<()> {
    fs::copy(path_file_src, path_file_dst)?;
    if if_keep_metadata {
        apply_metadata(path_file_src, path_file_dst)?;
    }
    Ok(())
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(path = %path_file_dst.display(), ?name, error = %e, "xattr not copied");
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{
        IgnoreMatcher, clean_path, derive_destination_path, is_ignored_path, resolve_entry_path,
    };
    use crate::spec::{EnumPatternMode, FsUtilError};

    #[test]
    fn empty_pattern_set_never_ignores() {
        let patterns: [&str; 0] = [];
        assert!(!is_ignored_path("/any/path.txt", &patterns).expect("match"));
        assert!(!IgnoreMatcher::empty().is_ignored(Path::new("/x")));
    }

    #[test]
    fn glob_star_does_not_cross_separator() {
        let matcher = IgnoreMatcher::new(&["/root/*.txt"], EnumPatternMode::Glob).expect("glob");
        assert!(matcher.is_ignored(Path::new("/root/a.txt")));
        assert!(!matcher.is_ignored(Path::new("/root/sub/a.txt")));
    }

    #[test]
    fn glob_double_star_spans_directories() {
        let matcher =
            IgnoreMatcher::new(&["/root/**/file.txt"], EnumPatternMode::Glob).expect("glob");
        assert!(matcher.is_ignored(Path::new("/root/a/b/file.txt")));
        assert!(matcher.is_ignored(Path::new("/root/file.txt")));
        assert!(!matcher.is_ignored(Path::new("/root/a/b")));
    }

    #[test]
    fn glob_question_and_class() {
        assert!(is_ignored_path("/d/file1.txt", &["/d/file?.txt"]).expect("match"));
        assert!(is_ignored_path("/d/file1.txt", &["/d/file[0-9].txt"]).expect("match"));
        assert!(!is_ignored_path("/d/filea.txt", &["/d/file[0-9].txt"]).expect("match"));
    }

    #[test]
    fn any_pattern_in_set_ignores() {
        let patterns = ["/nope/*", "/d/*.md", "/also/nope"];
        assert!(is_ignored_path("/d/readme.md", &patterns).expect("match"));
        assert!(!is_ignored_path("/d/readme.txt", &patterns).expect("match"));
    }

    #[test]
    fn malformed_glob_is_rejected() {
        let err = is_ignored_path("/d/a", &["/d/*", "["]).expect_err("must fail");
        assert!(matches!(err, FsUtilError::InvalidPattern { ref pattern, .. } if pattern == "["));
    }

    #[test]
    fn regex_and_literal_modes() {
        let matcher = IgnoreMatcher::new(&[r"\.log$"], EnumPatternMode::Regex).expect("regex");
        assert!(matcher.is_ignored(Path::new("/var/app/x.log")));
        assert!(!matcher.is_ignored(Path::new("/var/app/x.txt")));

        let err = IgnoreMatcher::new(&["("], EnumPatternMode::Regex).expect_err("bad regex");
        assert!(matches!(err, FsUtilError::InvalidPattern { .. }));

        let matcher =
            IgnoreMatcher::new(&["/var/app/x.log"], EnumPatternMode::Literal).expect("literal");
        assert!(matcher.is_ignored(Path::new("/var/app/x.log")));
        assert!(!matcher.is_ignored(Path::new("/var/app/x.log.1")));
    }

    #[cfg(unix)]
    #[test]
    fn clean_path_collapses_dots() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(clean_path(Path::new("./")), PathBuf::from("."));
    }

    #[cfg(unix)]
    #[test]
    fn destination_mapping_strips_source_root_once() {
        let src = Path::new("/data/src");
        let dst = Path::new("/backup/dst");
        assert_eq!(
            derive_destination_path(Path::new("/data/src/a/src/x.txt"), src, dst),
            PathBuf::from("/backup/dst/a/src/x.txt")
        );
        assert_eq!(derive_destination_path(src, src, dst), dst.to_path_buf());
    }

    #[cfg(unix)]
    #[test]
    fn entry_resolution_blocks_escape() {
        let root = Path::new("/out/dest");
        assert_eq!(
            resolve_entry_path(root, "a/b.txt").expect("inside"),
            PathBuf::from("/out/dest/a/b.txt")
        );
        assert_eq!(
            resolve_entry_path(root, "/etc/passwd").expect("root dropped"),
            PathBuf::from("/out/dest/etc/passwd")
        );
        assert_eq!(
            resolve_entry_path(root, "a/../b.txt").expect("inner dotdot"),
            PathBuf::from("/out/dest/b.txt")
        );

        for name in ["../escape.txt", "a/../../escape.txt", "../dest2/x", "./"] {
            let err = resolve_entry_path(root, name).expect_err("must escape");
            assert!(matches!(err, FsUtilError::PathTraversal { .. }), "{name}");
        }
    }
}
