//! Byte counting and human-readable size strings.

use std::path::Path;

use walkdir::WalkDir;

use crate::spec::{Result, SpecSizeFormat};
use crate::util::absolutize_path;

/// Bytes in a kilobyte.
pub const KB: u64 = 1024;
/// Bytes in a megabyte.
pub const MB: u64 = 1024 * KB;
/// Bytes in a gigabyte.
pub const GB: u64 = 1024 * MB;
/// Bytes in a terabyte.
pub const TB: u64 = 1024 * GB;
/// Bytes in a petabyte.
pub const PB: u64 = 1024 * TB;

const L_UNITS: [(u64, &str); 5] = [(PB, "PB"), (TB, "TB"), (GB, "GB"), (MB, "MB"), (KB, "KB")];

/// Total bytes of every non-directory entry under `path`.
///
/// Symlinks, `path` itself included, count with their own size and are
/// not followed.
pub fn byte_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path_abs = absolutize_path(path.as_ref());
    let mut n_bytes = 0u64;
    let iter_walk = WalkDir::new(&path_abs)
        .follow_links(false)
        .follow_root_links(false);
    for entry_res in iter_walk {
        let entry = entry_res?;
        if entry.file_type().is_dir() {
            continue;
        }
        n_bytes += entry.metadata()?.len();
    }
    Ok(n_bytes)
}

/// Format `n_bytes` with the largest fitting unit, e.g. `3.14MB`.
///
/// The value is rounded to two decimals before printing with
/// `n_decimals` places. Values below one kilobyte print as `<n>B`.
pub fn format_size(n_bytes: u64, spec_size_format: SpecSizeFormat) -> String {
    for (n_unit, c_unit) in L_UNITS {
        if n_bytes >= n_unit {
            let value = ((n_bytes as f64 * 100.0) / n_unit as f64).round() / 100.0;
            return format!("{value:.prec$}{c_unit}", prec = spec_size_format.n_decimals);
        }
    }
    format!("{n_bytes}B")
}

/// [`byte_size`] of `path` run through [`format_size`].
pub fn size<P: AsRef<Path>>(path: P, spec_size_format: SpecSizeFormat) -> Result<String> {
    Ok(format_size(byte_size(path)?, spec_size_format))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn format_size_units() {
        let fmt = SpecSizeFormat::default();
        assert_eq!(format_size(0, fmt), "0B");
        assert_eq!(format_size(1023, fmt), "1023B");
        assert_eq!(format_size(1024, fmt), "1.00KB");
        assert_eq!(format_size(1536, fmt), "1.50KB");
        assert_eq!(format_size(3 * MB + 150 * KB, fmt), "3.15MB");
        assert_eq!(format_size(2 * GB, fmt), "2.00GB");
        assert_eq!(format_size(5 * TB, fmt), "5.00TB");
        assert_eq!(format_size(PB, fmt), "1.00PB");
    }

    #[test]
    fn format_size_custom_decimals() {
        assert_eq!(format_size(1536, SpecSizeFormat { n_decimals: 0 }), "2KB");
        assert_eq!(format_size(1536, SpecSizeFormat { n_decimals: 3 }), "1.500KB");
    }

    #[test]
    fn byte_size_sums_files() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b")).expect("mkdir");
        fs::write(root.join("a/x.bin"), vec![0u8; 1000]).expect("write");
        fs::write(root.join("a/b/y.bin"), vec![0u8; 536]).expect("write");

        assert_eq!(byte_size(root).expect("size"), 1536);
        assert_eq!(byte_size(root.join("a/x.bin")).expect("size"), 1000);
        assert_eq!(size(root, SpecSizeFormat::default()).expect("size"), "1.50KB");
        assert!(byte_size(tmp.path().join("empty_missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn byte_size_counts_symlinked_root_as_link() {
        let tmp = TempDir::new().expect("tempdir");
        let real = tmp.path().join("real");
        fs::create_dir_all(&real).expect("mkdir");
        fs::write(real.join("big.bin"), vec![0u8; 4096]).expect("write");
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).expect("symlink");

        let n_link = fs::symlink_metadata(&link).expect("lstat").len();
        assert_eq!(byte_size(&link).expect("size"), n_link);
        assert_eq!(byte_size(&real).expect("size"), 4096);
    }
}
