//! Directory listing with ignore-pattern filtering.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use crate::spec::{EnumTraversalMode, FsUtilError, Result, SpecListOptions, SpecPathEntry};
use crate::util::{IgnoreMatcher, absolutize_path, stat_no_follow};

/// Enumerate entries under `directory`.
///
/// `directory` is resolved to an absolute path first, so every returned
/// [`SpecPathEntry::path`] is absolute. Patterns are compiled before the
/// filesystem is touched; a malformed pattern fails the call.
///
/// - [`EnumTraversalMode::Recursive`]: the root and all descendants in
///   depth-first pre-order, siblings sorted by name. An ignored directory is
///   pruned along with its subtree. Symlinks are listed, never followed.
/// - [`EnumTraversalMode::Shallow`]: direct children sorted by name, each
///   tested on its own. Metadata follows symlinks where the target exists.
///
/// A missing directory yields an empty list.
pub fn walk_tree<P: AsRef<Path>>(
    directory: P,
    spec_list_options: &SpecListOptions,
) -> Result<Vec<SpecPathEntry>> {
    let matcher = IgnoreMatcher::new(
        &spec_list_options.patterns_ignore,
        spec_list_options.rule_pattern,
    )?;
    let path_dir = absolutize_path(directory.as_ref());

    let Some(stat_root) = stat_no_follow(&path_dir)? else {
        tracing::debug!(path = %path_dir.display(), "nothing to list");
        return Ok(Vec::new());
    };

    let l_entries = match spec_list_options.rule_traversal {
        EnumTraversalMode::Recursive => walk_recursive(&path_dir, &matcher)?,
        EnumTraversalMode::Shallow => {
            if !stat_root.is_dir() && !path_dir.is_dir() {
                return Ok(Vec::new());
            }
            walk_shallow(&path_dir, &matcher)?
        }
    };
    tracing::debug!(
        path = %path_dir.display(),
        mode = ?spec_list_options.rule_traversal,
        n_entries = l_entries.len(),
        "listed directory"
    );
    Ok(l_entries)
}

fn walk_recursive(path_dir: &Path, matcher: &IgnoreMatcher) -> Result<Vec<SpecPathEntry>> {
    let mut l_entries = Vec::new();
    let iter_walk = WalkDir::new(path_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !matcher.is_ignored(entry.path()));

    for entry_res in iter_walk {
        let entry = entry_res?;
        let stat = entry.metadata()?;
        l_entries.push(to_path_entry(entry.into_path(), &stat));
    }
    Ok(l_entries)
}

fn walk_shallow(path_dir: &Path, matcher: &IgnoreMatcher) -> Result<Vec<SpecPathEntry>> {
    let mut l_entries = Vec::new();
    let iter_walk = WalkDir::new(path_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry_res in iter_walk {
        let entry = entry_res?;
        if matcher.is_ignored(entry.path()) {
            continue;
        }
        let path_entry = entry.into_path();
        let stat = match fs::metadata(&path_entry) {
            Ok(v) => v,
            Err(_) => fs::symlink_metadata(&path_entry)
                .map_err(FsUtilError::io_at(&path_entry))?,
        };
        l_entries.push(to_path_entry(path_entry, &stat));
    }
    Ok(l_entries)
}

fn to_path_entry(path: PathBuf, stat: &fs::Metadata) -> SpecPathEntry {
    SpecPathEntry {
        path,
        if_is_dir: stat.is_dir(),
        size: stat.len(),
        time_modified: FileTime::from_last_modification_time(stat),
    }
}

/// Absolute paths of all listed entries, directories and files.
pub fn list<P: AsRef<Path>>(
    directory: P,
    spec_list_options: &SpecListOptions,
) -> Result<Vec<PathBuf>> {
    Ok(walk_tree(directory, spec_list_options)?
        .into_iter()
        .map(|e| e.path)
        .collect())
}

/// Absolute paths of listed directories only.
pub fn list_directories<P: AsRef<Path>>(
    directory: P,
    spec_list_options: &SpecListOptions,
) -> Result<Vec<PathBuf>> {
    Ok(walk_tree(directory, spec_list_options)?
        .into_iter()
        .filter(|e| e.if_is_dir)
        .map(|e| e.path)
        .collect())
}

/// Absolute paths of listed non-directories only.
pub fn list_files<P: AsRef<Path>>(
    directory: P,
    spec_list_options: &SpecListOptions,
) -> Result<Vec<PathBuf>> {
    Ok(walk_tree(directory, spec_list_options)?
        .into_iter()
        .filter(|e| !e.if_is_dir)
        .map(|e| e.path)
        .collect())
}
