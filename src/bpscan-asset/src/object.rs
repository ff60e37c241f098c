//! Object references and the import/export table entries they point at

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed reference into a package's object tables
///
/// Negative values index the import table, positive values the export table,
/// zero is the null reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PackageIndex(i32);

/// Decoded form of a [`PackageIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Null,
    Import(usize),
    Export(usize),
}

impl PackageIndex {
    pub const NULL: Self = Self(0);

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn from_import(index: usize) -> Self {
        Self(-(index as i32) - 1)
    }

    pub fn from_export(index: usize) -> Self {
        Self(index as i32 + 1)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn is_import(self) -> bool {
        self.0 < 0
    }

    pub fn is_export(self) -> bool {
        self.0 > 0
    }

    pub fn kind(self) -> IndexKind {
        match self.0 {
            0 => IndexKind::Null,
            i if i < 0 => IndexKind::Import((-(i as i64) - 1) as usize),
            i => IndexKind::Export((i - 1) as usize),
        }
    }

    pub fn import_slot(self) -> Option<usize> {
        match self.kind() {
            IndexKind::Import(i) => Some(i),
            _ => None,
        }
    }

    pub fn export_slot(self) -> Option<usize> {
        match self.kind() {
            IndexKind::Export(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            IndexKind::Null => write!(f, "None"),
            IndexKind::Import(i) => write!(f, "Import:{}", i),
            IndexKind::Export(i) => write!(f, "Export:{}", i),
        }
    }
}

/// Import table entry: an object that lives in another package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectImport {
    pub class_package: String,
    pub class_name: String,
    pub outer_index: PackageIndex,
    pub object_name: String,
    pub package_name: Option<String>,
    pub optional: bool,
}

/// Export table entry: an object serialized in this package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectExport {
    pub class_index: PackageIndex,
    pub super_index: PackageIndex,
    pub template_index: PackageIndex,
    pub outer_index: PackageIndex,
    pub object_name: String,
    pub object_flags: u32,
    pub serial_size: i64,
    pub serial_offset: i64,
    pub forced_export: bool,
    pub not_for_client: bool,
    pub not_for_server: bool,
    pub is_inherited_instance: bool,
    pub package_flags: u32,
    pub not_always_loaded_for_editor_game: bool,
    pub is_asset: bool,
    pub generate_public_hash: bool,
    pub first_export_dependency: i32,
    pub serialization_before_serialization_dependencies: i32,
    pub create_before_serialization_dependencies: i32,
    pub serialization_before_create_dependencies: i32,
    pub create_before_create_dependencies: i32,
    pub script_serialization_start_offset: i64,
    pub script_serialization_end_offset: i64,
    /// Entries from the package's depends map for this export
    pub dependencies: Vec<PackageIndex>,
}

/// Either table entry, viewed through what they have in common
#[derive(Debug, Clone, Copy)]
pub enum ObjectResource<'a> {
    Import(&'a ObjectImport),
    Export(&'a ObjectExport),
}

impl<'a> ObjectResource<'a> {
    pub fn object_name(&self) -> &'a str {
        match self {
            Self::Import(i) => &i.object_name,
            Self::Export(e) => &e.object_name,
        }
    }

    pub fn outer_index(&self) -> PackageIndex {
        match self {
            Self::Import(i) => i.outer_index,
            Self::Export(e) => e.outer_index,
        }
    }

    /// Class reference; imports name their class directly instead
    pub fn class_index(&self) -> Option<PackageIndex> {
        match self {
            Self::Import(_) => None,
            Self::Export(e) => Some(e.class_index),
        }
    }

    pub fn as_export(&self) -> Option<&'a ObjectExport> {
        match self {
            Self::Export(e) => Some(e),
            Self::Import(_) => None,
        }
    }
}
