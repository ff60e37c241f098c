//! Index builds: decode files and apply their facts
//!
//! Decoding runs without any index lock. Only the final swap of one file's
//! facts takes the write lock, so a cancelled or failed build never leaves a
//! file half applied.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bpscan_asset::extract_facts;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::diagnostics::ParseDiagnostic;
use crate::index::{FileId, GlobalIndex};
use crate::{Error, Result};

/// Package file extensions picked up when scanning a content directory
pub const PACKAGE_EXTENSIONS: &[&str] = &["uasset", "umap"];

/// Where package bytes come from
pub trait AssetSource: Sync {
    fn read(&self, file: &FileId) -> io::Result<Vec<u8>>;
}

/// Packages on disk under one content root
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every package file under the root, as ids relative to it
    pub fn discover(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        PACKAGE_EXTENSIONS
                            .iter()
                            .any(|known| ext.eq_ignore_ascii_case(known))
                    })
            })
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(FileId::from_path)
            })
            .collect();
        files.sort();
        files
    }
}

impl AssetSource for FsSource {
    fn read(&self, file: &FileId) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(file.as_str()))
    }
}

/// Packages held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<FileId, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: FileId, bytes: Vec<u8>) {
        self.files.insert(file, bytes);
    }

    pub fn files(&self) -> Vec<FileId> {
        let mut files: Vec<_> = self.files.keys().cloned().collect();
        files.sort();
        files
    }
}

impl AssetSource for MemorySource {
    fn read(&self, file: &FileId) -> io::Result<Vec<u8>> {
        self.files
            .get(file)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file.to_string()))
    }
}

/// Result of building one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { changed: bool },
    Failed,
}

/// Tally of a multi-file build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub built: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl BuildReport {
    fn record(&mut self, outcome: BuildOutcome) {
        match outcome {
            BuildOutcome::Built { changed: true } => self.built += 1,
            BuildOutcome::Built { changed: false } => self.unchanged += 1,
            BuildOutcome::Failed => self.failed += 1,
        }
    }
}

/// Feeds decoded facts into a [`GlobalIndex`]
pub struct IndexBuilder<'a, S: AssetSource> {
    index: &'a GlobalIndex,
    source: &'a S,
}

impl<'a, S: AssetSource> IndexBuilder<'a, S> {
    pub fn new(index: &'a GlobalIndex, source: &'a S) -> Self {
        Self { index, source }
    }

    /// Decode one file and apply the result
    ///
    /// A file that fails to decode contributes no facts and gets a diagnostic.
    pub fn build_file(&self, file: &FileId) -> BuildOutcome {
        self.index.begin_rebuild(file);
        let decoded = self
            .source
            .read(file)
            .map_err(Error::from)
            .and_then(|bytes| extract_facts(bytes).map_err(Error::from));

        match decoded {
            Ok(extraction) => {
                let diagnostics = extraction
                    .export_errors
                    .iter()
                    .map(|e| ParseDiagnostic::export_failure(file, e))
                    .collect();
                let changed = self.index.replace(file, extraction.facts, diagnostics);
                debug!(%file, changed, "file indexed");
                BuildOutcome::Built { changed }
            }
            Err(error) => {
                warn!(%file, %error, "file failed to decode");
                self.index
                    .record_failure(file, vec![ParseDiagnostic::file_failure(file, &error)]);
                BuildOutcome::Failed
            }
        }
    }

    /// Build many files, checking `cancel` between files
    ///
    /// Files finished before cancellation stay applied; the rest keep their
    /// previous state.
    pub fn build_files(&self, files: &[FileId], cancel: &CancellationToken) -> Result<BuildReport> {
        let build = |file: &FileId| {
            if cancel.is_cancelled() {
                None
            } else {
                Some(self.build_file(file))
            }
        };

        let outcomes: Vec<Option<BuildOutcome>> = if self.index.config().parallel {
            files.par_iter().map(build).collect()
        } else {
            files.iter().map(build).collect()
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut report = BuildReport::default();
        for outcome in outcomes.into_iter().flatten() {
            report.record(outcome);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::index::{FileState, IndexStatus};
    use bpscan_asset::testing::{ExportSpec, PackageBuilder};

    fn package(class_name: &str, parent: &str) -> Vec<u8> {
        let mut b = PackageBuilder::new();
        let engine = b.import_package("/Script/Engine");
        let parent = b.import_class(engine, parent);
        let bp_class = b.import_class(engine, "BlueprintGeneratedClass");
        let payload = b.class_payload(&[], &[]);
        b.export(
            ExportSpec::new(class_name)
                .class(bp_class)
                .super_class(parent)
                .payload(payload),
        );
        b.build()
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert(FileId::new("Hero.uasset"), package("Hero_C", "Pawn"));
        source.insert(FileId::new("Boss.uasset"), package("Boss_C", "Hero_C"));
        source.insert(FileId::new("Broken.uasset"), vec![0xde, 0xad, 0xbe, 0xef]);
        source
    }

    #[test]
    fn test_build_files() {
        let source = source();
        let index = GlobalIndex::new(IndexConfig::default());
        let builder = IndexBuilder::new(&index, &source);

        let report = builder
            .build_files(&source.files(), &CancellationToken::new())
            .unwrap();
        assert_eq!(
            report,
            BuildReport {
                built: 2,
                unchanged: 0,
                failed: 1
            }
        );
        assert_eq!(index.status(), IndexStatus::Complete);
        assert_eq!(index.transitive_inheritors("Pawn").len(), 2);

        let broken = FileId::new("Broken.uasset");
        assert_eq!(index.file_state(&broken), FileState::Failed);
        assert!(index.diagnostics(&broken)[0].message.contains("Invalid package tag"));
        assert!(index.facts(&broken).is_none());

        let again = builder
            .build_files(&source.files(), &CancellationToken::new())
            .unwrap();
        assert_eq!(again.unchanged, 2);
    }

    #[test]
    fn test_sequential_build_matches_parallel() {
        let source = source();
        let parallel = GlobalIndex::new(IndexConfig::default());
        let sequential = GlobalIndex::new(IndexConfig {
            parallel: false,
            ..IndexConfig::default()
        });
        for index in [&parallel, &sequential] {
            IndexBuilder::new(index, &source)
                .build_files(&source.files(), &CancellationToken::new())
                .unwrap();
        }
        for file in source.files() {
            assert_eq!(parallel.facts(&file), sequential.facts(&file));
        }
    }

    #[test]
    fn test_cancelled_build() {
        let source = source();
        let index = GlobalIndex::new(IndexConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = IndexBuilder::new(&index, &source).build_files(&source.files(), &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(index.built_files().is_empty());
    }

    #[test]
    fn test_fs_source_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("Game").join("Heroes");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("Hero.uasset"), package("Hero_C", "Pawn")).unwrap();
        fs::write(content.join("notes.txt"), "ignored").unwrap();

        let source = FsSource::new(dir.path());
        let files = source.discover();
        assert_eq!(files, vec![FileId::new("Game/Heroes/Hero.uasset")]);

        let index = GlobalIndex::new(IndexConfig::default());
        let outcome = IndexBuilder::new(&index, &source).build_file(&files[0]);
        assert_eq!(outcome, BuildOutcome::Built { changed: true });
    }
}
