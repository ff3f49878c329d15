//! Transfer report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{EnumTransferOp, SpecTransferError};

/// Aggregate counters and diagnostics for one `move_tree` / `copy_tree` run.
#[derive(Debug, Clone)]
pub struct ReportTransfer {
    /// Operation the counters belong to.
    pub rule_op: EnumTransferOp,
    /// Total visited source entries (the root included).
    pub cnt_scanned: u64,
    /// Destination directories ensured.
    pub cnt_dirs_created: u64,
    /// Files renamed or copied.
    pub cnt_transferred: u64,
    /// Symlinks and special files left alone.
    pub cnt_skipped: u64,
    /// Non-fatal notes collected during the walk.
    pub warnings: Vec<String>,
    /// Failures swallowed under ignore-errors mode.
    pub errors: Vec<SpecTransferError>,
}

impl ReportTransfer {
    /// Number of swallowed errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_transferred".to_string(), self.cnt_transferred);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} dirs={} transferred={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_dirs_created,
            self.cnt_transferred,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.rule_op {
            EnumTransferOp::Move => "[MOVE]",
            EnumTransferOp::Copy => "[COPY]",
        };
        write!(f, "{}", self.format(prefix))
    }
}

/// Mutable accumulator for transfer statistics.
#[derive(Debug, Clone)]
pub struct ReportTransferBuilder {
    rule_op: EnumTransferOp,
    cnt_scanned: u64,
    cnt_dirs_created: u64,
    cnt_transferred: u64,
    cnt_skipped: u64,
    warnings: Vec<String>,
    errors: Vec<SpecTransferError>,
}

impl ReportTransferBuilder {
    /// Empty builder for `rule_op`.
    pub fn new(rule_op: EnumTransferOp) -> Self {
        Self {
            rule_op,
            cnt_scanned: 0,
            cnt_dirs_created: 0,
            cnt_transferred: 0,
            cnt_skipped: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Count one visited source entry.
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    /// Count one ensured destination directory.
    pub fn add_dir_created(&mut self) {
        self.cnt_dirs_created += 1;
    }

    /// Count one renamed or copied file.
    pub fn add_transferred(&mut self) {
        self.cnt_transferred += 1;
    }

    /// Count one skipped symlink or special file.
    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Add one non-fatal warning.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.errors.push(SpecTransferError { path, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportTransfer {
        ReportTransfer {
            rule_op: self.rule_op,
            cnt_scanned: self.cnt_scanned,
            cnt_dirs_created: self.cnt_dirs_created,
            cnt_transferred: self.cnt_transferred,
            cnt_skipped: self.cnt_skipped,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::ReportTransferBuilder;
    use crate::spec::EnumTransferOp;

    #[test]
    fn report_to_dict_and_format() {
        let mut builder = ReportTransferBuilder::new(EnumTransferOp::Copy);
        for _ in 0..6 {
            builder.add_scanned();
        }
        builder.add_dir_created();
        builder.add_dir_created();
        builder.add_transferred();
        builder.add_transferred();
        builder.add_skipped();
        builder.add_error(PathBuf::from("/dst/x"), "boom".to_string());
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 6);
        assert_eq!(dict_counts["cnt_dirs_created"], 2);
        assert_eq!(dict_counts["cnt_transferred"], 2);
        assert_eq!(dict_counts["cnt_skipped"], 1);
        assert_eq!(dict_counts["cnt_errors"], 1);
        assert_eq!(dict_counts["cnt_warnings"], 0);

        assert_eq!(
            report.to_string(),
            "[COPY] scanned=6 dirs=2 transferred=2 skipped=1 errors=1 warnings=0"
        );
        assert_eq!(report.errors[0].exception, "boom");
    }

    #[test]
    fn move_report_prefix() {
        let report = ReportTransferBuilder::new(EnumTransferOp::Move).build();
        assert!(report.to_string().starts_with("[MOVE] scanned=0"));
    }
}
