//! Blueprint package decoding
//!
//! Reads legacy-format engine package files without the engine:
//!
//! - [`reader`]: endian-aware primitive reads over a byte buffer
//! - [`summary`] and [`versions`]: the package header and every version gate
//!   the layout depends on
//! - [`linker`]: name, import and export tables plus index resolution
//! - [`property`]: the tagged property decoder
//! - [`extract`]: reduces a package to [`AssetFacts`] for indexing
//!
//! # Format Overview
//!
//! - Bytes 0-3: package tag `0x9E2A83C1` (byte-swapped for big-endian files)
//! - Legacy file version, object versions, custom version container
//! - Table offsets: names, imports, exports, depends map
//! - Export payloads, each starting with a tagged property list

pub mod extract;
pub mod facts;
pub mod hash;
pub mod linker;
pub mod names;
pub mod object;
pub mod property;
pub mod reader;
pub mod summary;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod versions;

pub use extract::{extract, extract_facts, ExportError, Extraction};
pub use facts::{AssetFacts, BlueprintClassObject, K2GraphNodeObject, K2NodeKind, OtherAssetObject};
pub use hash::{name_word_hashes, split_name_number, word_hash, word_hashes};
pub use linker::Linker;
pub use object::{IndexKind, ObjectExport, ObjectImport, ObjectResource, PackageIndex};
pub use property::{Property, PropertyBag, PropertyKind, PropertyValue};
pub use reader::{Endian, Guid, Reader};
pub use versions::{PackageVersions, VersionGate};

/// Errors from package decoding
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Truncated data at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid package tag: 0x{0:08x}")]
    InvalidPackageTag(u32),

    #[error("Unsupported file version: legacy {legacy}, ue4 {ue4}, ue5 {ue5:?}")]
    UnsupportedFileVersion {
        legacy: i32,
        ue4: i32,
        ue5: Option<i32>,
    },

    #[error("Package uses unversioned properties")]
    UnversionedProperties,

    #[error("Invalid count {count} at offset {offset}")]
    InvalidCount { offset: usize, count: i32 },

    #[error("Invalid string length at offset {offset}")]
    InvalidString { offset: usize },

    #[error("Name index {index} out of range ({count} names)")]
    InvalidNameIndex { index: i32, count: usize },

    #[error("Unsupported property type: {0}")]
    UnsupportedPropertyType(String),

    #[error("Property {name} declared {declared} bytes but consumed {consumed}")]
    PropertySizeMismatch {
        name: String,
        declared: i64,
        consumed: usize,
    },

    #[error("Export {index} out of bounds: offset {offset}, size {size}, file length {file_len}")]
    InvalidExportBounds {
        index: i32,
        offset: i64,
        size: i64,
        file_len: usize,
    },

    #[error("Property nesting deeper than {depth}")]
    NestingTooDeep { depth: usize },
}

impl Error {
    /// Whether the rest of the file can no longer be trusted
    ///
    /// Everything else invalidates only the export being decoded.
    pub fn is_file_fatal(&self) -> bool {
        matches!(
            self,
            Self::TruncatedData { .. }
                | Self::InvalidPackageTag(_)
                | Self::UnsupportedFileVersion { .. }
                | Self::UnversionedProperties
                | Self::InvalidExportBounds { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
