//! Zip a tree into one archive and extract it back, refusing entries that
//! would land outside the extraction root.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::spec::{EnumZipCompression, FsUtilError, Result, SpecZipOptions};
use crate::util::{absolutize_path, resolve_entry_path, stat_no_follow};

const MODE_DIR_DEFAULT: u32 = 0o755;
const MODE_FILE_DEFAULT: u32 = 0o644;

////////////////////////////////////////////////////////////////////////////////
// #region Zip

/// `<source stem>.zip` under `path_dir_base`.
///
/// Only the last extension is stripped and a dotfile keeps its whole name,
/// so `.bashrc` gives `.bashrc.zip` rather than a bare `.zip`.
pub(crate) fn derive_default_archive_path(path_src: &Path, path_dir_base: &Path) -> PathBuf {
    let mut name_archive = path_src
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "archive".into());
    name_archive.push(".zip");
    path_dir_base.join(name_archive)
}

// Relative path with `/` separators, as stored in the archive.
fn derive_entry_name(path_entry: &Path, path_src: &Path) -> Option<String> {
    let path_rel = path_entry.strip_prefix(path_src).ok()?;
    if path_rel.as_os_str().is_empty() {
        return path_entry
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }
    let l_parts: Vec<_> = path_rel
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect();
    Some(l_parts.join("/"))
}

/// Compress `source` (file or directory) into a zip archive.
///
/// Only regular files are stored, each under its path relative to
/// `source`; directories come back implicitly from the file paths and
/// symlinks are skipped. Entries follow walk order (sorted by name within a
/// directory). A symlinked `source` is not followed and yields an empty
/// archive. The archive defaults to `<source stem>.zip` in the current
/// working directory and is itself never added.
///
/// Any failure aborts; a partially written archive is left on disk.
/// Returns the absolute archive path.
pub fn zip_path<P: AsRef<Path>>(source: P, spec_zip_options: &SpecZipOptions) -> Result<PathBuf> {
    let path_src = absolutize_path(source.as_ref());
    if stat_no_follow(&path_src)?.is_none() {
        return Err(FsUtilError::NotFound(path_src));
    }

    let path_archive = match &spec_zip_options.path_archive {
        Some(v) => absolutize_path(v),
        None => {
            let path_cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            absolutize_path(&derive_default_archive_path(&path_src, &path_cwd))
        }
    };

    let method_compression = match spec_zip_options.rule_compression {
        EnumZipCompression::Stored => CompressionMethod::Stored,
        EnumZipCompression::Deflated => CompressionMethod::Deflated,
    };

    let file_archive = File::create(&path_archive).map_err(FsUtilError::io_at(&path_archive))?;
    let mut writer = ZipWriter::new(file_archive);
    let mut n_entries = 0usize;

    let iter_walk = WalkDir::new(&path_src)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name();
    for entry_res in iter_walk {
        let entry = entry_res?;
        if !entry.file_type().is_file() || entry.path() == path_archive {
            continue;
        }
        let Some(name_entry) = derive_entry_name(entry.path(), &path_src) else {
            continue;
        };

        let mut options = SimpleFileOptions::default().compression_method(method_compression);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let stat = entry.metadata()?;
            options = options.unix_permissions(stat.permissions().mode());
        }

        writer.start_file(name_entry, options)?;
        let mut file_src = File::open(entry.path()).map_err(FsUtilError::io_at(entry.path()))?;
        io::copy(&mut file_src, &mut writer).map_err(FsUtilError::io_at(entry.path()))?;
        n_entries += 1;
    }
    writer.finish()?;

    tracing::debug!(
        src = %path_src.display(),
        archive = %path_archive.display(),
        n_entries,
        "archive written"
    );
    Ok(path_archive)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Unzip

fn create_dir_with_mode(path_dir: &Path, mode: u32) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path_dir).map_err(FsUtilError::io_at(path_dir))
}

fn open_truncated_with_mode(path_file: &Path, mode: u32) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path_file).map_err(FsUtilError::io_at(path_file))
}

/// Extract archive `source` into directory `destination`.
///
/// `destination` and any parents are created. Each entry is resolved
/// against `destination`; an entry that would land outside it fails the
/// whole call with [`FsUtilError::PathTraversal`] before anything is
/// written for it. Directory entries and files are created with the
/// permission bits recorded in the archive, and existing files are
/// truncated.
///
/// The first failure aborts; entries already extracted stay. Returns the
/// number of extracted entries.
pub fn unzip<P, Q>(source: P, destination: Q) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_archive = absolutize_path(source.as_ref());
    if stat_no_follow(&path_archive)?.is_none() {
        return Err(FsUtilError::NotFound(path_archive));
    }
    let path_dir_dst = absolutize_path(destination.as_ref());

    let file_archive = File::open(&path_archive).map_err(FsUtilError::io_at(&path_archive))?;
    let mut archive = ZipArchive::new(file_archive)?;
    create_dir_with_mode(&path_dir_dst, MODE_DIR_DEFAULT)?;

    for idx in 0..archive.len() {
        let mut zip_file = archive.by_index(idx)?;
        let name_entry = zip_file.name().to_string();
        let path_target = resolve_entry_path(&path_dir_dst, &name_entry).inspect_err(|_| {
            tracing::warn!(
                entry = %name_entry,
                dst = %path_dir_dst.display(),
                "archive entry escapes destination"
            );
        })?;
        let mode = zip_file.unix_mode().map(|m| m & 0o7777);

        if zip_file.is_dir() {
            create_dir_with_mode(&path_target, mode.unwrap_or(MODE_DIR_DEFAULT))?;
            continue;
        }

        if let Some(path_parent) = path_target.parent() {
            create_dir_with_mode(path_parent, MODE_DIR_DEFAULT)?;
        }
        let mut file_dst = open_truncated_with_mode(&path_target, mode.unwrap_or(MODE_FILE_DEFAULT))?;
        io::copy(&mut zip_file, &mut file_dst).map_err(FsUtilError::io_at(&path_target))?;
    }

    tracing::debug!(
        archive = %path_archive.display(),
        dst = %path_dir_dst.display(),
        n_entries = archive.len(),
        "archive extracted"
    );
    Ok(archive.len())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
