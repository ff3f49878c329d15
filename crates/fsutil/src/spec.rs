//! Option models, listing entries, and the crate error type.

use std::io;
use std::path::PathBuf;

use filetime::FileTime;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Directory traversal depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTraversalMode {
    /// Visit the root and every descendant.
    #[default]
    Recursive,
    /// Enumerate immediate children only.
    Shallow,
}

/// Pattern interpretation for ignore lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes, `**`).
    #[default]
    Glob,
    /// Regular expression searched in the full path string.
    Regex,
    /// Exact full-path match.
    Literal,
}

/// Which transfer a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTransferOp {
    /// Files are renamed into the destination tree.
    Move,
    /// File bytes are duplicated into the destination tree.
    Copy,
}

/// Compression method for archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumZipCompression {
    /// Store bytes as-is.
    Stored,
    /// Deflate compression.
    #[default]
    Deflated,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OptionStructs

/// Input options for the listing functions.
#[derive(Debug, Clone, Default)]
pub struct SpecListOptions {
    /// Recursive walk or single-level listing.
    pub rule_traversal: EnumTraversalMode,
    /// Patterns matched against each absolute path; any match excludes it.
    pub patterns_ignore: Vec<String>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
}

impl SpecListOptions {
    /// Recursive listing with no ignore patterns.
    pub fn recursive() -> Self {
        Self::default()
    }

    /// Single-level listing with no ignore patterns.
    pub fn shallow() -> Self {
        Self {
            rule_traversal: EnumTraversalMode::Shallow,
            ..Self::default()
        }
    }

    /// Replace the ignore pattern list.
    pub fn with_ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns_ignore = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// Input options for `move_tree` / `copy_tree`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecTransferOptions {
    /// Record per-entry failures in the report and keep going.
    pub if_ignore_errors: bool,
    /// Copy permissions, timestamps and (Linux) xattrs along with file bytes.
    /// Only used by `copy_tree`; a rename already keeps them.
    pub if_keep_metadata: bool,
}

/// Input options for `touch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecTouchOptions {
    /// Create a file even when the name has no extension.
    pub if_force_file: bool,
    /// Create a directory even when the name has an extension.
    /// Wins over `if_force_file`.
    pub if_force_dir: bool,
}

/// Input options for `write_text_file`.
#[derive(Debug, Clone, Copy)]
pub struct SpecWriteOptions {
    /// Permission bits used when the file is created (umask still applies).
    pub mode: u32,
}

impl Default for SpecWriteOptions {
    fn default() -> Self {
        Self { mode: 0o777 }
    }
}

/// Formatting options for human-readable sizes.
#[derive(Debug, Clone, Copy)]
pub struct SpecSizeFormat {
    /// Digits printed after the decimal point.
    pub n_decimals: usize,
}

impl Default for SpecSizeFormat {
    fn default() -> Self {
        Self { n_decimals: 2 }
    }
}

/// Input options for `zip_path`.
#[derive(Debug, Clone, Default)]
pub struct SpecZipOptions {
    /// Archive to create. Defaults to `<source stem>.zip` in the working directory.
    pub path_archive: Option<PathBuf>,
    /// Compression used for every entry.
    pub rule_compression: EnumZipCompression,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Entries

/// One filesystem node produced by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPathEntry {
    /// Absolute path of the node.
    pub path: PathBuf,
    /// Whether the node is a directory.
    pub if_is_dir: bool,
    /// Size in bytes as reported by stat.
    pub size: u64,
    /// Last modification time.
    pub time_modified: FileTime,
}

/// One swallowed transfer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTransferError {
    /// Source or destination path that failed.
    pub path: PathBuf,
    /// Error text.
    pub exception: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum FsUtilError {
    /// Malformed ignore pattern.
    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A path required to exist does not.
    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// Underlying storage failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive entry would land outside the extraction root.
    #[error("Illegal file path in archive entry `{entry}`: {}", path.display())]
    PathTraversal { entry: String, path: PathBuf },

    /// Failure the caller is expected to treat as fatal.
    #[error("Unrecoverable failure creating {}: {source}", path.display())]
    Unrecoverable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source and destination trees contain each other.
    #[error(
        "Source and destination overlap: {} <-> {}",
        path_src.display(),
        path_dst.display()
    )]
    SourceDestinationOverlap { path_src: PathBuf, path_dst: PathBuf },

    /// Zip codec failure.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl FsUtilError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `map_err` adapter for [`FsUtilError::io`].
    pub(crate) fn io_at(path: &std::path::Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::io(path, source)
    }

    /// Whether this is a not-found condition, either explicit or from the OS.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<walkdir::Error> for FsUtilError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        let source = match err.into_io_error() {
            Some(e) => e,
            None => io::Error::other("filesystem loop detected"),
        };
        Self::Io { path, source }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FsUtilError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
