//! Package linker: header tables plus index -> object resolution
//!
//! The linker owns the file bytes and every decoded table. Objects form a
//! parent-pointer tree through `outer_index`; nothing holds references into
//! other objects, so resolution is a pure function of the index and the
//! tables. Object paths and export property bags are computed on first use
//! and memoized for the lifetime of the linker.

use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::names::NameTable;
use crate::object::{IndexKind, ObjectExport, ObjectImport, ObjectResource, PackageIndex};
use crate::property::{decode_properties, DecodeContext, PropertyBag};
use crate::reader::Reader;
use crate::summary::PackageSummary;
use crate::versions::{PackageVersions, VersionGate};
use crate::{Error, Result};

/// Upper bound on outer-chain walks, on top of the table size
const MAX_OUTER_DEPTH: usize = 256;

/// Decoded view of one package file
#[derive(Debug)]
pub struct Linker {
    data: Arc<[u8]>,
    summary: PackageSummary,
    names: NameTable,
    imports: Vec<ObjectImport>,
    exports: Vec<ObjectExport>,
    paths: Vec<OnceLock<String>>,
    properties: Vec<OnceLock<Result<Arc<PropertyBag>>>>,
}

impl Linker {
    /// Decode summary, name table, import/export tables and the depends map
    ///
    /// Every error here is file-fatal.
    pub fn parse(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data: Arc<[u8]> = data.into();
        let summary = PackageSummary::read(&data)?;
        let endian = summary.endian;

        let mut r = Reader::at(&data, summary.name_offset, endian)?;
        let names = NameTable::read(&mut r, summary.name_count, &summary.versions)?;

        let mut imports = Vec::with_capacity(summary.import_count.min(data.len()));
        if summary.import_count > 0 {
            let mut r = Reader::at(&data, summary.import_offset, endian)?;
            for _ in 0..summary.import_count {
                imports.push(read_import(&mut r, &names, &summary)?);
            }
        }

        let mut exports = Vec::with_capacity(summary.export_count.min(data.len()));
        if summary.export_count > 0 {
            let mut r = Reader::at(&data, summary.export_offset, endian)?;
            for _ in 0..summary.export_count {
                exports.push(read_export(&mut r, &names, &summary.versions)?);
            }
        }

        if summary.depends_offset > 0 && !exports.is_empty() {
            let mut r = Reader::at(&data, summary.depends_offset, endian)?;
            for export in &mut exports {
                export.dependencies = r.read_array(|r| r.read_package_index())?;
            }
        }

        for (slot, export) in exports.iter().enumerate() {
            check_export_bounds(slot, export, data.len())?;
        }

        let paths = (0..imports.len() + exports.len())
            .map(|_| OnceLock::new())
            .collect();
        let properties = (0..exports.len()).map(|_| OnceLock::new()).collect();

        Ok(Self {
            data,
            summary,
            names,
            imports,
            exports,
            paths,
            properties,
        })
    }

    pub fn summary(&self) -> &PackageSummary {
        &self.summary
    }

    pub fn versions(&self) -> &PackageVersions {
        &self.summary.versions
    }

    pub fn supports(&self, gate: VersionGate) -> bool {
        self.summary.versions.supports(gate)
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn imports(&self) -> &[ObjectImport] {
        &self.imports
    }

    pub fn exports(&self) -> &[ObjectExport] {
        &self.exports
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn decode_context(&self) -> DecodeContext<'_> {
        DecodeContext::new(&self.names, &self.summary.versions)
    }

    /// Resolve an index; dangling indices resolve to `None`
    pub fn resolve(&self, index: PackageIndex) -> Option<ObjectResource<'_>> {
        let resolved = match index.kind() {
            IndexKind::Null => return None,
            IndexKind::Import(i) => self.imports.get(i).map(ObjectResource::Import),
            IndexKind::Export(i) => self.exports.get(i).map(ObjectResource::Export),
        };
        if resolved.is_none() {
            trace!(%index, imports = self.imports.len(), exports = self.exports.len(), "unresolved package index");
        }
        resolved
    }

    pub fn export(&self, index: PackageIndex) -> Option<&ObjectExport> {
        index.export_slot().and_then(|i| self.exports.get(i))
    }

    pub fn object_name(&self, index: PackageIndex) -> Option<&str> {
        self.resolve(index).map(|r| r.object_name())
    }

    /// Object name, or an empty string when the index does not resolve
    pub fn object_string_name(&self, index: PackageIndex) -> String {
        self.object_name(index).unwrap_or_default().to_string()
    }

    /// Class name of the referenced object
    ///
    /// Imports carry their class name inline, exports point at a class object.
    pub fn class_name(&self, index: PackageIndex) -> Option<&str> {
        match self.resolve(index)? {
            ObjectResource::Import(import) => Some(&import.class_name),
            ObjectResource::Export(export) => self.object_name(export.class_index),
        }
    }

    /// Dotted outer-chain path, outermost first
    pub fn object_path(&self, index: PackageIndex) -> Option<&str> {
        let slot = match index.kind() {
            IndexKind::Null => return None,
            IndexKind::Import(i) if i < self.imports.len() => i,
            IndexKind::Export(i) if i < self.exports.len() => self.imports.len() + i,
            _ => return None,
        };
        let path = self.paths[slot].get_or_init(|| self.build_path(index));
        Some(path.as_str())
    }

    fn build_path(&self, index: PackageIndex) -> String {
        let limit = MAX_OUTER_DEPTH.min(self.imports.len() + self.exports.len());
        let mut parts = Vec::new();
        let mut current = index;
        for _ in 0..=limit {
            let Some(resource) = self.resolve(current) else {
                break;
            };
            parts.push(resource.object_name());
            current = resource.outer_index();
        }
        parts.reverse();
        parts.join(".")
    }

    /// Follow `hops` outer links from `index`
    pub fn outer(&self, index: PackageIndex, hops: usize) -> Option<PackageIndex> {
        let mut current = index;
        for _ in 0..hops {
            current = self.resolve(current)?.outer_index();
            if current.is_null() {
                return None;
            }
        }
        Some(current)
    }

    /// Serialized bytes of one export
    pub fn export_data(&self, index: PackageIndex) -> Option<&[u8]> {
        let export = self.export(index)?;
        let start = usize::try_from(export.serial_offset).ok()?;
        let len = usize::try_from(export.serial_size).ok()?;
        self.data.get(start..start.checked_add(len)?)
    }

    /// Reader over one export's serialized bytes
    pub fn export_reader(&self, index: PackageIndex) -> Option<Reader<'_>> {
        self.export_data(index)
            .map(|data| Reader::new(data, self.summary.endian))
    }

    /// Tagged properties at the start of an export, decoded once
    pub fn export_properties(&self, index: PackageIndex) -> Result<Arc<PropertyBag>> {
        let Some(slot) = index.export_slot().filter(|&s| s < self.exports.len()) else {
            return Err(Error::InvalidExportBounds {
                index: index.raw(),
                offset: 0,
                size: 0,
                file_len: self.data.len(),
            });
        };
        self.properties[slot]
            .get_or_init(|| {
                let Some(mut r) = self.export_reader(index) else {
                    let export = &self.exports[slot];
                    return Err(Error::InvalidExportBounds {
                        index: index.raw(),
                        offset: export.serial_offset,
                        size: export.serial_size,
                        file_len: self.data.len(),
                    });
                };
                decode_properties(&mut r, &self.decode_context()).map(Arc::new)
            })
            .clone()
    }
}

fn check_export_bounds(slot: usize, export: &ObjectExport, file_len: usize) -> Result<()> {
    let fits = export.serial_offset >= 0
        && export.serial_size >= 0
        && export
            .serial_offset
            .checked_add(export.serial_size)
            .is_some_and(|end| end <= file_len as i64);
    if fits {
        Ok(())
    } else {
        Err(Error::InvalidExportBounds {
            index: PackageIndex::from_export(slot).raw(),
            offset: export.serial_offset,
            size: export.serial_size,
            file_len,
        })
    }
}

fn read_import(
    r: &mut Reader<'_>,
    names: &NameTable,
    summary: &PackageSummary,
) -> Result<ObjectImport> {
    let versions = &summary.versions;
    let class_package = names.read_name(r)?;
    let class_name = names.read_name(r)?;
    let outer_index = r.read_package_index()?;
    let object_name = names.read_name(r)?;
    let package_name = if versions.supports(VersionGate::ImportPackageName)
        && !summary.is_filter_editor_only()
    {
        Some(names.read_name(r)?)
    } else {
        None
    };
    let optional = versions.supports(VersionGate::OptionalImports) && r.read_bool32()?;

    Ok(ObjectImport {
        class_package,
        class_name,
        outer_index,
        object_name,
        package_name,
        optional,
    })
}

fn read_serial_number(r: &mut Reader<'_>, wide: bool) -> Result<i64> {
    if wide {
        r.read_i64()
    } else {
        r.read_i32().map(i64::from)
    }
}

fn read_export(
    r: &mut Reader<'_>,
    names: &NameTable,
    versions: &PackageVersions,
) -> Result<ObjectExport> {
    let mut export = ObjectExport {
        class_index: r.read_package_index()?,
        super_index: r.read_package_index()?,
        ..ObjectExport::default()
    };
    if versions.supports(VersionGate::TemplateIndex) {
        export.template_index = r.read_package_index()?;
    }
    export.outer_index = r.read_package_index()?;
    export.object_name = names.read_name(r)?;
    export.object_flags = r.read_u32()?;

    let wide = versions.supports(VersionGate::SerialSizes64);
    export.serial_size = read_serial_number(r, wide)?;
    export.serial_offset = read_serial_number(r, wide)?;

    export.forced_export = r.read_bool32()?;
    export.not_for_client = r.read_bool32()?;
    export.not_for_server = r.read_bool32()?;
    if !versions.supports(VersionGate::ExportPackageGuidRemoved) {
        let _package_guid = r.read_guid()?;
    }
    if versions.supports(VersionGate::InheritedInstanceFlag) {
        export.is_inherited_instance = r.read_bool32()?;
    }
    export.package_flags = r.read_u32()?;
    if versions.supports(VersionGate::LoadForEditorGame) {
        export.not_always_loaded_for_editor_game = r.read_bool32()?;
    }
    if versions.supports(VersionGate::CookedAssetFlag) {
        export.is_asset = r.read_bool32()?;
    }
    if versions.supports(VersionGate::PublicHashFlag) {
        export.generate_public_hash = r.read_bool32()?;
    }
    if versions.supports(VersionGate::PreloadDependencies) {
        export.first_export_dependency = r.read_i32()?;
        export.serialization_before_serialization_dependencies = r.read_i32()?;
        export.create_before_serialization_dependencies = r.read_i32()?;
        export.serialization_before_create_dependencies = r.read_i32()?;
        export.create_before_create_dependencies = r.read_i32()?;
    }
    if versions.supports(VersionGate::ScriptSerializationOffsets) {
        export.script_serialization_start_offset = r.read_i64()?;
        export.script_serialization_end_offset = r.read_i64()?;
    }
    Ok(export)
}
