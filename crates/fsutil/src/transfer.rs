//! Move / copy a source tree into a destination root.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::report::{ReportTransfer, ReportTransferBuilder};
use crate::spec::{EnumTransferOp, FsUtilError, Result, SpecTransferOptions};
use crate::util::{
    absolutize_path, copy_file_contents, derive_destination_path, is_overlap, stat_no_follow,
};

#[derive(Debug)]
struct SpecTransferContext {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    rule_op: EnumTransferOp,
    spec_transfer_options: SpecTransferOptions,
    builder_report: ReportTransferBuilder,
}

/// Move everything under `source` into `destination`.
///
/// Directories are recreated, regular files are renamed, symlinks are
/// skipped. A symlinked `source` is skipped as a whole rather than
/// followed. The emptied source directories stay behind.
///
/// See [`copy_tree`] for failure handling.
pub fn move_tree<P, Q>(
    source: P,
    destination: Q,
    spec_transfer_options: SpecTransferOptions,
) -> Result<ReportTransfer>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    transfer_tree(
        source.as_ref(),
        destination.as_ref(),
        EnumTransferOp::Move,
        spec_transfer_options,
    )
}

/// Copy everything under `source` into `destination`.
///
/// Each source entry maps to `destination` + its path relative to `source`;
/// a file source maps onto `destination` itself. Directories are created on
/// demand, regular files have their bytes duplicated, and symlinks and other
/// special files are skipped.
///
/// By default the first failure aborts the walk and is returned. With
/// [`SpecTransferOptions::if_ignore_errors`] failures are recorded in the
/// report and the walk continues. Work done before a failure is never
/// rolled back.
///
/// Returns [`FsUtilError::NotFound`] for a missing source and
/// [`FsUtilError::SourceDestinationOverlap`] when one tree contains the other.
pub fn copy_tree<P, Q>(
    source: P,
    destination: Q,
    spec_transfer_options: SpecTransferOptions,
) -> Result<ReportTransfer>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    transfer_tree(
        source.as_ref(),
        destination.as_ref(),
        EnumTransferOp::Copy,
        spec_transfer_options,
    )
}

fn transfer_tree(
    source: &Path,
    destination: &Path,
    rule_op: EnumTransferOp,
    spec_transfer_options: SpecTransferOptions,
) -> Result<ReportTransfer> {
    let path_dir_src = absolutize_path(source);
    let path_dir_dst = absolutize_path(destination);

    let Some(stat_src) = stat_no_follow(&path_dir_src)? else {
        return Err(FsUtilError::NotFound(path_dir_src));
    };
    if stat_src.is_dir() && is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(FsUtilError::SourceDestinationOverlap {
            path_src: path_dir_src,
            path_dst: path_dir_dst,
        });
    }

    tracing::debug!(
        op = ?rule_op,
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        if_ignore_errors = spec_transfer_options.if_ignore_errors,
        "transfer started"
    );

    let mut spec_transfer_ctx = SpecTransferContext {
        path_dir_src,
        path_dir_dst,
        rule_op,
        spec_transfer_options,
        builder_report: ReportTransferBuilder::new(rule_op),
    };

    let iter_walk = WalkDir::new(&spec_transfer_ctx.path_dir_src)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name();
    for entry_res in iter_walk {
        let res_entry = entry_res
            .map_err(FsUtilError::from)
            .and_then(|entry| handle_entry(&entry, &mut spec_transfer_ctx));
        if let Err(e) = res_entry {
            handle_failure(e, &mut spec_transfer_ctx)?;
        }
    }

    let report = spec_transfer_ctx.builder_report.build();
    tracing::debug!(summary = %report, "transfer finished");
    Ok(report)
}

fn handle_failure(err: FsUtilError, spec_transfer_ctx: &mut SpecTransferContext) -> Result<()> {
    if !spec_transfer_ctx.spec_transfer_options.if_ignore_errors {
        return Err(err);
    }
    let path_failed = match &err {
        FsUtilError::Io { path, .. } => path.clone(),
        _ => spec_transfer_ctx.path_dir_src.clone(),
    };
    tracing::warn!(path = %path_failed.display(), error = %err, "ignoring transfer failure");
    spec_transfer_ctx
        .builder_report
        .add_error(path_failed, err.to_string());
    Ok(())
}

fn handle_entry(entry: &DirEntry, spec_transfer_ctx: &mut SpecTransferContext) -> Result<()> {
    spec_transfer_ctx.builder_report.add_scanned();

    let path_entry = entry.path();
    let path_target = derive_destination_path(
        path_entry,
        &spec_transfer_ctx.path_dir_src,
        &spec_transfer_ctx.path_dir_dst,
    );
    let cfg_file_type = entry.file_type();

    if cfg_file_type.is_dir() {
        fs::create_dir_all(&path_target).map_err(FsUtilError::io_at(&path_target))?;
        spec_transfer_ctx.builder_report.add_dir_created();
        return Ok(());
    }

    if cfg_file_type.is_symlink() {
        tracing::debug!(path = %path_entry.display(), "symlink skipped");
        spec_transfer_ctx.builder_report.add_skipped();
        return Ok(());
    }

    if spec_transfer_ctx.rule_op == EnumTransferOp::Copy && !cfg_file_type.is_file() {
        spec_transfer_ctx
            .builder_report
            .add_warning(format!("Special file skipped: {}", path_entry.display()));
        spec_transfer_ctx.builder_report.add_skipped();
        return Ok(());
    }

    if let Some(path_parent) = path_target.parent() {
        fs::create_dir_all(path_parent).map_err(FsUtilError::io_at(path_parent))?;
    }

    match spec_transfer_ctx.rule_op {
        EnumTransferOp::Move => {
            fs::rename(path_entry, &path_target).map_err(FsUtilError::io_at(path_entry))?;
        }
        EnumTransferOp::Copy => {
            copy_file_contents(
                path_entry,
                &path_target,
                spec_transfer_ctx.spec_transfer_options.if_keep_metadata,
            )
            .map_err(FsUtilError::io_at(&path_target))?;
        }
    }
    spec_transfer_ctx.builder_report.add_transferred();
    Ok(())
}
