//! `fsutil` v1:
//! Filesystem convenience layer over `std::fs`.
//!
//! Modules:
//! - `spec`     : enums/options/entries/errors
//! - `path`     : single-path queries and small mutations
//! - `exec`     : executable detection per platform
//! - `list`     : tree walking with ignore patterns
//! - `size`     : byte counting and size formatting
//! - `transfer` : move/copy of whole trees
//! - `report`   : run-time transfer report model
//! - `archive`  : zip and guarded unzip
//! - `util`     : pattern matching and shared path helpers

pub mod archive;
pub mod exec;
pub mod list;
pub mod path;
pub mod report;
pub mod size;
pub mod spec;
pub mod transfer;
mod util;

pub use archive::{unzip, zip_path};
pub use exec::{ExecutableProbe, ModeBitsProbe, PortableExecutableProbe, is_executable};
pub use list::{list, list_directories, list_files, walk_tree};
pub use path::{
    abs, clean, exists, is_directory, is_file, is_readable, is_symlink, is_writable,
    last_modified, mkdirp, read_text_file, symlink, touch, write_text_file,
};
pub use report::{ReportTransfer, ReportTransferBuilder};
pub use size::{GB, KB, MB, PB, TB, byte_size, format_size, size};
pub use spec::{
    EnumPatternMode, EnumTransferOp, EnumTraversalMode, EnumZipCompression, FsUtilError, Result,
    SpecListOptions, SpecPathEntry, SpecSizeFormat, SpecTouchOptions, SpecTransferError,
    SpecTransferOptions, SpecWriteOptions, SpecZipOptions,
};
pub use transfer::{copy_tree, move_tree};
pub use util::{IgnoreMatcher, is_ignored_path};
