//! Global index over per-file facts
//!
//! Two structures are derived from every built file's [`AssetFacts`]:
//!
//! - an inheritance multimap from a base class or interface name to the
//!   blueprint classes deriving from it
//! - an inverted word index from a word hash to the files whose name tables
//!   contain it
//!
//! Contributions are keyed by the facts that produced them, so dropping a
//! file removes exactly what merging it added. Both maps, the per-file state
//! and the diagnostics live behind one lock; a merge or drop is applied
//! entirely under the write lock and is never observed half done.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use bpscan_asset::{name_word_hashes, AssetFacts, PackageIndex};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::diagnostics::{Diagnostics, ParseDiagnostic};
use crate::{Error, Result};

const SNAPSHOT_VERSION: u32 = 1;

/// Identity of one asset file, usually its path relative to the content root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Back-reference from a base name to one deriving blueprint class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedClassDescriptor {
    pub index: PackageIndex,
    pub name: String,
    pub containing_file: FileId,
}

/// Lifecycle of one file in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    Unbuilt,
    Built,
    /// Last build failed; the file contributes nothing until it changes
    Failed,
    Dirty,
    Rebuilding,
    Dropped,
}

impl FileState {
    fn is_settled(self) -> bool {
        matches!(self, Self::Built | Self::Failed | Self::Dropped)
    }
}

/// Whether every known file reflects its current contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Complete,
    /// Files not yet (re)built
    Pending(usize),
}

#[derive(Debug, Clone)]
struct FileEntry {
    state: FileState,
    facts: Option<Arc<AssetFacts>>,
}

#[derive(Debug)]
struct IndexState {
    inheritors: HashMap<String, Vec<DerivedClassDescriptor>>,
    words: HashMap<u32, HashMap<FileId, u32>>,
    files: HashMap<FileId, FileEntry>,
    diagnostics: Diagnostics,
}

fn base_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Base names a class is filed under: its super class and every interface
fn base_names(class: &bpscan_asset::BlueprintClassObject) -> impl Iterator<Item = &str> {
    class
        .super_class_name
        .as_deref()
        .into_iter()
        .chain(class.interfaces.iter().map(String::as_str))
        .filter(|name| !name.is_empty())
}

impl IndexState {
    fn add(&mut self, file: &FileId, facts: &AssetFacts) {
        for class in &facts.blueprint_classes {
            let descriptor = DerivedClassDescriptor {
                index: class.index,
                name: class.object_name.clone(),
                containing_file: file.clone(),
            };
            for base in base_names(class) {
                self.inheritors
                    .entry(base_key(base))
                    .or_default()
                    .push(descriptor.clone());
            }
        }
        for &hash in &facts.word_hashes {
            *self
                .words
                .entry(hash)
                .or_default()
                .entry(file.clone())
                .or_insert(0) += 1;
        }
    }

    fn remove(&mut self, file: &FileId, facts: &AssetFacts) {
        for class in &facts.blueprint_classes {
            let descriptor = DerivedClassDescriptor {
                index: class.index,
                name: class.object_name.clone(),
                containing_file: file.clone(),
            };
            for base in base_names(class) {
                let key = base_key(base);
                if let Some(list) = self.inheritors.get_mut(&key) {
                    if let Some(pos) = list.iter().position(|d| *d == descriptor) {
                        list.remove(pos);
                    }
                    if list.is_empty() {
                        self.inheritors.remove(&key);
                    }
                }
            }
        }
        for hash in &facts.word_hashes {
            if let Some(files) = self.words.get_mut(hash) {
                if let Some(count) = files.get_mut(file) {
                    *count -= 1;
                    if *count == 0 {
                        files.remove(file);
                    }
                }
                if files.is_empty() {
                    self.words.remove(hash);
                }
            }
        }
    }

    /// Take back whatever `file` currently contributes
    fn retract(&mut self, file: &FileId) -> Option<Arc<AssetFacts>> {
        let old = self.files.get_mut(file).and_then(|e| e.facts.take());
        if let Some(old) = &old {
            self.remove(file, old);
        }
        old
    }

    fn set_state(&mut self, file: &FileId, state: FileState) {
        self.files
            .entry(file.clone())
            .and_modify(|e| e.state = state)
            .or_insert(FileEntry { state, facts: None });
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    files: BTreeMap<FileId, AssetFacts>,
}

/// Session-wide index; share it by reference or `Arc`
#[derive(Debug)]
pub struct GlobalIndex {
    state: RwLock<IndexState>,
    config: IndexConfig,
}

impl GlobalIndex {
    pub fn new(config: IndexConfig) -> Self {
        let diagnostics =
            Diagnostics::new(config.max_diagnostics_total, config.max_diagnostics_per_file);
        Self {
            state: RwLock::new(IndexState {
                inheritors: HashMap::new(),
                words: HashMap::new(),
                files: HashMap::new(),
                diagnostics,
            }),
            config,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Make `facts` the file's contribution, replacing any earlier one
    ///
    /// Returns whether the facts differ from what was indexed before.
    pub fn merge(&self, file: &FileId, facts: AssetFacts) -> bool {
        self.replace(file, facts, Vec::new())
    }

    /// Swap a file's facts and diagnostics in one step
    pub fn replace(
        &self,
        file: &FileId,
        facts: AssetFacts,
        diagnostics: Vec<ParseDiagnostic>,
    ) -> bool {
        let mut state = self.state.write();
        let old = state.retract(file);
        let changed = old.as_deref() != Some(&facts);
        state.add(file, &facts);
        state.files.insert(
            file.clone(),
            FileEntry {
                state: FileState::Built,
                facts: Some(Arc::new(facts)),
            },
        );
        state.diagnostics.replace(file, diagnostics);
        if !changed {
            debug!(%file, "rebuild produced identical facts");
        }
        changed
    }

    /// Remove everything `file` contributed
    pub fn drop_file(&self, file: &FileId) -> Option<Arc<AssetFacts>> {
        let mut state = self.state.write();
        let old = state.retract(file);
        state.set_state(file, FileState::Dropped);
        state.diagnostics.clear_file(file);
        old
    }

    /// Record a failed build: no facts, only diagnostics
    pub fn record_failure(&self, file: &FileId, diagnostics: Vec<ParseDiagnostic>) {
        let mut state = self.state.write();
        state.retract(file);
        state.set_state(file, FileState::Failed);
        state.diagnostics.replace(file, diagnostics);
    }

    /// Register a file whose contents changed (or that was never built)
    pub fn mark_dirty(&self, file: &FileId) {
        self.state.write().set_state(file, FileState::Dirty);
    }

    pub fn begin_rebuild(&self, file: &FileId) {
        self.state.write().set_state(file, FileState::Rebuilding);
    }

    /// Forget all facts and diagnostics; every known file becomes dirty
    pub fn invalidate_all(&self) {
        let mut state = self.state.write();
        state.inheritors.clear();
        state.words.clear();
        state.diagnostics.clear();
        for entry in state.files.values_mut() {
            entry.facts = None;
            if entry.state != FileState::Dropped {
                entry.state = FileState::Dirty;
            }
        }
        info!(files = state.files.len(), "index invalidated");
    }

    pub fn status(&self) -> IndexStatus {
        let pending = self
            .state
            .read()
            .files
            .values()
            .filter(|e| !e.state.is_settled())
            .count();
        if pending == 0 {
            IndexStatus::Complete
        } else {
            IndexStatus::Pending(pending)
        }
    }

    pub fn file_state(&self, file: &FileId) -> FileState {
        self.state
            .read()
            .files
            .get(file)
            .map_or(FileState::Unbuilt, |e| e.state)
    }

    pub fn facts(&self, file: &FileId) -> Option<Arc<AssetFacts>> {
        self.state.read().files.get(file).and_then(|e| e.facts.clone())
    }

    /// Files currently contributing facts, sorted
    pub fn built_files(&self) -> Vec<FileId> {
        let state = self.state.read();
        let mut files: Vec<_> = state
            .files
            .iter()
            .filter(|(_, e)| e.facts.is_some())
            .map(|(f, _)| f.clone())
            .collect();
        files.sort();
        files
    }

    /// False only when the file is indexed and provably lacks `word`
    pub fn can_contain_word(&self, file: &FileId, word: &str) -> bool {
        let state = self.state.read();
        match state.files.get(file) {
            Some(entry) if entry.state == FileState::Built => {
                let (full, base) = name_word_hashes(word);
                std::iter::once(full).chain(base).any(|hash| {
                    state
                        .words
                        .get(&hash)
                        .is_some_and(|files| files.contains_key(file))
                })
            }
            Some(entry) if entry.state == FileState::Failed => false,
            _ => true,
        }
    }

    pub fn files_containing_word(&self, word: &str) -> Vec<FileId> {
        let state = self.state.read();
        let (full, base) = name_word_hashes(word);
        let mut files: Vec<_> = std::iter::once(full)
            .chain(base)
            .filter_map(|hash| state.words.get(&hash))
            .flat_map(|files| files.keys().cloned())
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// Blueprint classes directly deriving from (or implementing) `base`
    pub fn direct_inheritors(&self, base: &str) -> Vec<DerivedClassDescriptor> {
        self.state
            .read()
            .inheritors
            .get(&base_key(base))
            .cloned()
            .unwrap_or_default()
    }

    /// Every blueprint class transitively deriving from `base`
    ///
    /// Terminates on cyclic hierarchies.
    pub fn transitive_inheritors(&self, base: &str) -> Vec<DerivedClassDescriptor> {
        let state = self.state.read();
        let mut visited: HashSet<String> = HashSet::from([base_key(base)]);
        let mut queue = VecDeque::from([base_key(base)]);
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        while let Some(key) = queue.pop_front() {
            let Some(derived) = state.inheritors.get(&key) else {
                continue;
            };
            for descriptor in derived {
                if seen.insert(descriptor.clone()) {
                    result.push(descriptor.clone());
                }
                let next = base_key(&descriptor.name);
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        result
    }

    pub fn diagnostics(&self, file: &FileId) -> Vec<ParseDiagnostic> {
        self.state.read().diagnostics.for_file(file).to_vec()
    }

    pub fn all_diagnostics(&self) -> Vec<ParseDiagnostic> {
        self.state.read().diagnostics.iter().cloned().collect()
    }

    /// Write every built file's facts as a JSON snapshot
    pub fn flush(&self, path: &Path) -> Result<()> {
        let snapshot = {
            let state = self.state.read();
            Snapshot {
                version: SNAPSHOT_VERSION,
                files: state
                    .files
                    .iter()
                    .filter_map(|(file, e)| e.facts.as_ref().map(|f| (file.clone(), (**f).clone())))
                    .collect(),
            }
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(&snapshot)?)?;
        info!(path = %path.display(), files = snapshot.files.len(), "index flushed");
        Ok(())
    }

    /// Rebuild an index from a snapshot written by [`GlobalIndex::flush`]
    pub fn load(path: &Path, config: IndexConfig) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(&fs::read(path)?)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::SnapshotVersion(snapshot.version));
        }
        let index = Self::new(config);
        let count = snapshot.files.len();
        for (file, facts) in snapshot.files {
            index.merge(&file, facts);
        }
        info!(path = %path.display(), files = count, "index loaded");
        Ok(index)
    }

    /// Load the configured snapshot if there is one, else start empty
    pub fn open(config: IndexConfig) -> Result<Self> {
        match config.snapshot_path.clone() {
            Some(path) if path.exists() => Self::load(&path, config),
            _ => Ok(Self::new(config)),
        }
    }

    /// Flush to the configured snapshot path; false when none is set
    pub fn persist(&self) -> Result<bool> {
        match &self.config.snapshot_path {
            Some(path) => {
                self.flush(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[cfg(test)]
    fn fingerprint(&self) -> (Vec<(String, Vec<DerivedClassDescriptor>)>, Vec<(u32, Vec<(FileId, u32)>)>) {
        let state = self.state.read();
        let mut inheritors: Vec<_> = state
            .inheritors
            .iter()
            .map(|(k, v)| {
                let mut v = v.clone();
                v.sort_by(|a, b| (&a.containing_file, a.index).cmp(&(&b.containing_file, b.index)));
                (k.clone(), v)
            })
            .collect();
        inheritors.sort_by(|a, b| a.0.cmp(&b.0));
        let mut words: Vec<_> = state
            .words
            .iter()
            .map(|(h, files)| {
                let mut files: Vec<_> = files.iter().map(|(f, c)| (f.clone(), *c)).collect();
                files.sort();
                (*h, files)
            })
            .collect();
        words.sort();
        (inheritors, words)
    }
}
