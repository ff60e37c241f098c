//! Blueprint usage index and search
//!
//! Builds on [`bpscan_asset`] facts:
//!
//! - [`index::GlobalIndex`]: inheritance multimap plus inverted word index,
//!   merged and dropped per file, persisted as a JSON snapshot
//! - [`builder::IndexBuilder`]: decodes files in parallel and applies each
//!   file's facts atomically
//! - [`resolve::Resolver`]: expands a source symbol into search targets
//!   through redirects and inheritance
//! - [`search::UsageSearcher`]: word pre-filter, then per-file confirmation
//!   against decoded facts and property trees

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod index;
pub mod redirects;
pub mod resolve;
pub mod search;

pub use builder::{AssetSource, BuildOutcome, BuildReport, FsSource, IndexBuilder, MemorySource};
pub use config::IndexConfig;
pub use diagnostics::{Diagnostics, ParseDiagnostic};
pub use index::{DerivedClassDescriptor, FileId, FileState, GlobalIndex, IndexStatus};
pub use redirects::CoreRedirects;
pub use resolve::{
    ModuleResolver, RedirectProvider, Resolver, SearchTarget, SourceSymbol, SymbolCache,
    SymbolKind,
};
pub use search::{DecodeCache, DecodedAsset, SearchOutcome, UsageKind, UsageRecord, UsageSearcher};

/// Errors from indexing and search
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Asset decode error: {0}")]
    Asset(#[from] bpscan_asset::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    SnapshotVersion(u32),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");

        let err = Error::from(bpscan_asset::Error::UnsupportedPropertyType("X".into()));
        assert!(err.to_string().contains("Unsupported property type: X"));

        let err = Error::SnapshotVersion(9);
        assert!(err.to_string().contains('9'));
    }
}
