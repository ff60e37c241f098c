//! Capped per-file parse diagnostics

use std::collections::HashMap;

use bpscan_asset::{ExportError, PackageIndex};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::index::FileId;

/// One decode failure, as reported to a problems surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub file: FileId,
    /// Export that failed; `None` when the whole file failed
    pub export: Option<PackageIndex>,
    pub object_name: Option<String>,
    pub message: String,
}

impl ParseDiagnostic {
    pub fn file_failure(file: &FileId, error: &crate::Error) -> Self {
        Self {
            file: file.clone(),
            export: None,
            object_name: None,
            message: error.to_string(),
        }
    }

    pub fn export_failure(file: &FileId, error: &ExportError) -> Self {
        Self {
            file: file.clone(),
            export: Some(error.index),
            object_name: Some(error.object_name.clone()),
            message: error.error.to_string(),
        }
    }
}

/// Diagnostics keyed by file, bounded globally and per file
#[derive(Debug, Clone)]
pub struct Diagnostics {
    per_file: HashMap<FileId, Vec<ParseDiagnostic>>,
    total: usize,
    max_total: usize,
    max_per_file: usize,
    dropped: usize,
}

impl Diagnostics {
    pub fn new(max_total: usize, max_per_file: usize) -> Self {
        Self {
            per_file: HashMap::new(),
            total: 0,
            max_total,
            max_per_file,
            dropped: 0,
        }
    }

    /// Replace everything recorded for `file`
    ///
    /// Entries beyond either ceiling are counted as dropped, not stored.
    pub fn replace(&mut self, file: &FileId, diagnostics: Vec<ParseDiagnostic>) {
        self.clear_file(file);
        if diagnostics.is_empty() {
            return;
        }

        let room = self
            .max_per_file
            .min(self.max_total.saturating_sub(self.total));
        let offered = diagnostics.len();
        let kept: Vec<_> = diagnostics.into_iter().take(room).collect();
        if kept.len() < offered {
            self.dropped += offered - kept.len();
            warn!(
                file = %file,
                kept = kept.len(),
                dropped = offered - kept.len(),
                "diagnostic cap reached"
            );
        }
        if kept.is_empty() {
            return;
        }
        self.total += kept.len();
        self.per_file.insert(file.clone(), kept);
    }

    pub fn clear_file(&mut self, file: &FileId) {
        if let Some(old) = self.per_file.remove(file) {
            self.total -= old.len();
        }
    }

    pub fn clear(&mut self) {
        self.per_file.clear();
        self.total = 0;
        self.dropped = 0;
    }

    pub fn for_file(&self, file: &FileId) -> &[ParseDiagnostic] {
        self.per_file.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_errors(&self, file: &FileId) -> bool {
        self.per_file.contains_key(file)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.per_file.values().flatten()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Diagnostics discarded because a ceiling was reached
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diags(file: &FileId, n: usize) -> Vec<ParseDiagnostic> {
        (0..n)
            .map(|i| ParseDiagnostic {
                file: file.clone(),
                export: Some(PackageIndex::from_export(i)),
                object_name: None,
                message: format!("bad export {}", i),
            })
            .collect()
    }

    #[test]
    fn test_per_file_cap() {
        let file = FileId::new("A.uasset");
        let mut d = Diagnostics::new(100, 5);
        d.replace(&file, diags(&file, 8));
        assert_eq!(d.for_file(&file).len(), 5);
        assert_eq!(d.total(), 5);
        assert_eq!(d.dropped(), 3);
    }

    #[test]
    fn test_global_cap() {
        let mut d = Diagnostics::new(6, 5);
        let a = FileId::new("A.uasset");
        let b = FileId::new("B.uasset");
        d.replace(&a, diags(&a, 5));
        d.replace(&b, diags(&b, 5));
        assert_eq!(d.total(), 6);
        assert_eq!(d.for_file(&b).len(), 1);
    }

    #[test]
    fn test_replace_is_not_append() {
        let file = FileId::new("A.uasset");
        let mut d = Diagnostics::new(100, 5);
        d.replace(&file, diags(&file, 3));
        d.replace(&file, diags(&file, 2));
        assert_eq!(d.for_file(&file).len(), 2);
        assert_eq!(d.total(), 2);

        d.replace(&file, Vec::new());
        assert!(!d.has_errors(&file));
        assert_eq!(d.total(), 0);
    }
}
