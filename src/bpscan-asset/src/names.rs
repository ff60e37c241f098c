//! Package name table

use crate::reader::{NameRef, Reader};
use crate::versions::{PackageVersions, VersionGate};
use crate::{Error, Result};

/// Sentinel name that terminates tagged property lists
pub const NONE: &str = "None";

/// Flat string pool every serialized name points into
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read `count` entries; each carries two 16-bit hashes on newer packages
    pub fn read(reader: &mut Reader<'_>, count: usize, versions: &PackageVersions) -> Result<Self> {
        let with_hashes = versions.supports(VersionGate::NameHashes);
        let mut names = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let name = reader.read_fstring()?;
            if with_hashes {
                let _non_case_preserving = reader.read_u16()?;
                let _case_preserving = reader.read_u16()?;
            }
            names.push(name);
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Base entry of a name reference, ignoring the instance number
    pub fn base(&self, name: NameRef) -> Result<&str> {
        usize::try_from(name.index)
            .ok()
            .and_then(|i| self.get(i))
            .ok_or(Error::InvalidNameIndex {
                index: name.index,
                count: self.names.len(),
            })
    }

    /// Display form of a name reference
    pub fn resolve(&self, name: NameRef) -> Result<String> {
        let base = self.base(name)?;
        if name.number > 0 {
            Ok(format!("{}_{}", base, name.number - 1))
        } else {
            Ok(base.to_string())
        }
    }

    /// Read a name reference and resolve it in one step
    pub fn read_name(&self, reader: &mut Reader<'_>) -> Result<String> {
        let name = reader.read_name_ref()?;
        self.resolve(name)
    }
}
