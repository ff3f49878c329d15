//! Thin wrappers over stat/mkdir/open used to "guarantee" that a path does
//! or does not exist.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::spec::{FsUtilError, Result, SpecTouchOptions, SpecWriteOptions};
use crate::util::absolutize_path;

/// Absolute, cleaned form of `path`, even if it does not exist.
///
/// Relative paths are resolved against the current working directory at the
/// time of the call.
pub fn abs<P: AsRef<Path>>(path: P) -> PathBuf {
    absolutize_path(path.as_ref())
}

/// Whether `path` exists.
///
/// Not-found and a non-directory parent count as missing; other stat
/// errors (e.g. permission denied on a parent) still report `true`.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return false;
    }
    match fs::metadata(path) {
        Ok(_) => true,
        Err(e) => !matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        ),
    }
}

/// Whether `path` exists and is not a directory.
pub fn is_file<P: AsRef<Path>>(path: P) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.is_dir())
}

/// Whether `path` exists and is a directory.
pub fn is_directory<P: AsRef<Path>>(path: P) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_dir())
}

/// `mkdir -p`. Returns the absolute directory path.
pub fn mkdirp<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path_abs = abs(path);
    fs::create_dir_all(&path_abs).map_err(FsUtilError::io_at(&path_abs))?;
    Ok(path_abs)
}

/// Create `path` if it does not exist, as a file or a directory.
///
/// A name with an extension becomes a file unless `if_force_dir` is set;
/// `if_force_file` makes extension-less names files too. Missing parents
/// are created. Existing paths are left untouched.
///
/// Failing to create the file itself returns [`FsUtilError::Unrecoverable`].
pub fn touch<P: AsRef<Path>>(path: P, spec_touch_options: SpecTouchOptions) -> Result<PathBuf> {
    let path_abs = abs(path);
    if exists(&path_abs) {
        return Ok(path_abs);
    }

    let b_has_ext = path_abs.extension().is_some_and(|e| !e.is_empty());
    let b_as_file =
        !spec_touch_options.if_force_dir && (spec_touch_options.if_force_file || b_has_ext);
    if !b_as_file {
        return mkdirp(&path_abs);
    }

    if let Some(path_parent) = path_abs.parent() {
        mkdirp(path_parent)?;
    }
    fs::File::create(&path_abs).map_err(|source| FsUtilError::Unrecoverable {
        path: path_abs.clone(),
        source,
    })?;
    Ok(path_abs)
}

/// Make sure `path` is an empty directory.
///
/// If `path` is a file its parent directory is cleaned instead.
pub fn clean<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let mut path_abs = abs(path);
    if is_file(&path_abs)
        && let Some(path_parent) = path_abs.parent()
    {
        path_abs = path_parent.to_path_buf();
    }

    if exists(&path_abs) {
        fs::remove_dir_all(&path_abs).map_err(FsUtilError::io_at(&path_abs))?;
    }
    mkdirp(&path_abs)
}

/// Write `content` to `path`, creating parents and the file as needed.
///
/// `mode` only applies when the file is created.
pub fn write_text_file<P: AsRef<Path>>(
    path: P,
    content: &str,
    spec_write_options: SpecWriteOptions,
) -> Result<()> {
    let path_abs = abs(path);
    if let Some(path_parent) = path_abs.parent() {
        mkdirp(path_parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(spec_write_options.mode);
    }
    #[cfg(not(unix))]
    let _ = spec_write_options;

    let mut file = options.open(&path_abs).map_err(FsUtilError::io_at(&path_abs))?;
    file.write_all(content.as_bytes())
        .map_err(FsUtilError::io_at(&path_abs))
}

/// Read a UTF-8 text file.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path_abs = abs(path);
    fs::read_to_string(&path_abs).map_err(FsUtilError::io_at(&path_abs))
}

/// Whether the current user may open `path` for reading.
pub fn is_readable<P: AsRef<Path>>(path: P) -> bool {
    allow_file_action(path.as_ref(), OpenOptions::new().read(true))
}

/// Whether the current user may open `path` for writing.
pub fn is_writable<P: AsRef<Path>>(path: P) -> bool {
    allow_file_action(path.as_ref(), OpenOptions::new().write(true))
}

// Only permission-denied counts as "not allowed"; other open errors do not.
fn allow_file_action(path: &Path, options: &OpenOptions) -> bool {
    let path_abs = abs(path);
    if !exists(&path_abs) {
        return false;
    }
    match options.open(&path_abs) {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::PermissionDenied,
    }
}

/// Whether `path` is a symbolic link with a non-empty target.
pub fn is_symlink<P: AsRef<Path>>(path: P) -> bool {
    fs::read_link(path).is_ok_and(|target| !target.as_os_str().is_empty())
}

/// Create a symbolic link at `link` pointing to `target`.
pub fn symlink<P, Q>(target: P, link: Q) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let target = target.as_ref();
    let link = link.as_ref();

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(FsUtilError::io_at(link))
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        let path_target = match link.parent() {
            Some(path_parent) if target.is_relative() => path_parent.join(target),
            _ => target.to_path_buf(),
        };
        let res = if path_target.is_dir() {
            symlink_dir(target, link)
        } else {
            symlink_file(target, link)
        };
        res.map_err(FsUtilError::io_at(link))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(FsUtilError::io(
            link,
            io::Error::new(
                io::ErrorKind::Unsupported,
                "Symbolic links are unsupported on this platform",
            ),
        ))
    }
}

/// Last modification time of `path` (links followed).
pub fn last_modified<P: AsRef<Path>>(path: P) -> Result<FileTime> {
    let path = path.as_ref();
    let stat = fs::metadata(path).map_err(FsUtilError::io_at(path))?;
    Ok(FileTime::from_last_modification_time(&stat))
}
