//! Package writer for tests
//!
//! Builds small but complete package files in any supported layout so the
//! decoder, extractor, index and searcher can be tested without shipping
//! binary fixtures. Every layout decision consults the same version gates as
//! the decoder.

use std::collections::HashMap;

use crate::names::{NameTable, NONE};
use crate::object::PackageIndex;
use crate::reader::{Endian, Guid, NameRef};
use crate::versions::{
    ue4, ue5, CustomVersion, CustomVersionKey, CustomVersions, PackageVersions, VersionGate,
    PACKAGE_FILE_TAG, PKG_FILTER_EDITOR_ONLY,
};

/// Endian-aware byte sink
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    endian: Endian,
}

macro_rules! put {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, v: $ty) {
            match self.endian {
                Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
                Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
            }
        }
    };
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    put!(u16, u16);
    put!(i32, i32);
    put!(u32, u32);
    put!(i64, i64);
    put!(f32, f32);
    put!(f64, f64);

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn bool32(&mut self, v: bool) {
        self.u32(u32::from(v));
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn guid(&mut self, guid: Guid) {
        for part in guid.0 {
            self.u32(part);
        }
    }

    pub fn name(&mut self, name: NameRef) {
        self.i32(name.index);
        self.i32(name.number);
    }

    pub fn index(&mut self, index: PackageIndex) {
        self.i32(index.raw());
    }

    /// Null-terminated string; non-ASCII text is written as UTF-16
    pub fn fstring(&mut self, s: &str) {
        if s.is_empty() {
            self.i32(0);
        } else if s.is_ascii() {
            self.i32(s.len() as i32 + 1);
            self.bytes(s.as_bytes());
            self.u8(0);
        } else {
            let units: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
            self.i32(-(units.len() as i32));
            for unit in units {
                self.u16(unit);
            }
        }
    }

    pub fn patch_i32(&mut self, pos: usize, v: i32) {
        let bytes = match self.endian {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        };
        self.buf[pos..pos + 4].copy_from_slice(&bytes);
    }

    pub fn patch_i64(&mut self, pos: usize, v: i64) {
        let bytes = match self.endian {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        };
        self.buf[pos..pos + 8].copy_from_slice(&bytes);
    }
}

#[derive(Debug, Clone)]
struct ImportSpec {
    class_package: NameRef,
    class_name: NameRef,
    outer: PackageIndex,
    object_name: NameRef,
}

/// One export to be written
#[derive(Debug, Clone)]
pub struct ExportSpec {
    name: String,
    class: PackageIndex,
    super_class: PackageIndex,
    outer: PackageIndex,
    flags: u32,
    payload: Option<Vec<u8>>,
    dependencies: Vec<PackageIndex>,
}

impl ExportSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            class: PackageIndex::NULL,
            super_class: PackageIndex::NULL,
            outer: PackageIndex::NULL,
            flags: 0,
            payload: None,
            dependencies: Vec::new(),
        }
    }

    pub fn class(mut self, class: PackageIndex) -> Self {
        self.class = class;
        self
    }

    pub fn super_class(mut self, super_class: PackageIndex) -> Self {
        self.super_class = super_class;
        self
    }

    pub fn outer(mut self, outer: PackageIndex) -> Self {
        self.outer = outer;
        self
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Serialized bytes; defaults to an empty tagged property list
    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn dependencies(mut self, dependencies: Vec<PackageIndex>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Assembles a package file
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    endian: Endian,
    legacy: i32,
    ue4: i32,
    ue5: Option<i32>,
    licensee: i32,
    custom: Vec<CustomVersion>,
    package_flags: u32,
    names: Vec<String>,
    lookup: HashMap<String, i32>,
    imports: Vec<ImportSpec>,
    exports: Vec<(NameRef, ExportSpec)>,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageBuilder {
    /// Little-endian UE5 package with no custom versions
    pub fn new() -> Self {
        let mut builder = Self {
            endian: Endian::Little,
            legacy: -8,
            ue4: ue4::LATEST,
            ue5: Some(ue5::DATA_RESOURCES),
            licensee: 0,
            custom: Vec::new(),
            package_flags: 0,
            names: Vec::new(),
            lookup: HashMap::new(),
            imports: Vec::new(),
            exports: Vec::new(),
        };
        builder.intern(NONE);
        builder
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Legacy versions above -8 carry no UE5 version
    pub fn with_legacy(mut self, legacy: i32) -> Self {
        self.legacy = legacy;
        if legacy > -8 {
            self.ue5 = None;
        }
        self
    }

    pub fn with_ue4(mut self, ue4: i32) -> Self {
        self.ue4 = ue4;
        self
    }

    pub fn with_ue5(self, ue5: i32) -> Self {
        self.with_ue5_opt(Some(ue5))
    }

    pub fn with_ue5_opt(mut self, ue5: Option<i32>) -> Self {
        self.ue5 = ue5;
        self.legacy = if ue5.is_some() { -8 } else { -7 };
        self
    }

    pub fn with_licensee(mut self, licensee: i32) -> Self {
        self.licensee = licensee;
        self
    }

    pub fn with_custom_version(mut self, key: CustomVersionKey, version: i32) -> Self {
        self.custom.retain(|c| c.key != key.guid);
        self.custom.push(CustomVersion {
            key: key.guid,
            version,
        });
        self
    }

    pub fn with_package_flags(mut self, flags: u32) -> Self {
        self.package_flags = flags;
        self
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn versions(&self) -> PackageVersions {
        PackageVersions {
            legacy_file_version: self.legacy,
            ue4: self.ue4,
            ue5: self.ue5,
            licensee: self.licensee,
            custom: CustomVersions::new(self.custom.clone()),
        }
    }

    pub fn supports(&self, gate: VersionGate) -> bool {
        self.versions().supports(gate)
    }

    pub fn name_table(&self) -> NameTable {
        NameTable::new(self.names.clone())
    }

    pub fn intern(&mut self, name: &str) -> NameRef {
        let next = self.names.len() as i32;
        let index = *self.lookup.entry(name.to_string()).or_insert(next);
        if index == next {
            self.names.push(name.to_string());
        }
        NameRef { index, number: 0 }
    }

    pub fn import(
        &mut self,
        class_package: &str,
        class_name: &str,
        outer: PackageIndex,
        object_name: &str,
    ) -> PackageIndex {
        let spec = ImportSpec {
            class_package: self.intern(class_package),
            class_name: self.intern(class_name),
            outer,
            object_name: self.intern(object_name),
        };
        self.imports.push(spec);
        PackageIndex::from_import(self.imports.len() - 1)
    }

    pub fn import_package(&mut self, name: &str) -> PackageIndex {
        self.import("/Script/CoreUObject", "Package", PackageIndex::NULL, name)
    }

    pub fn import_class(&mut self, package: PackageIndex, name: &str) -> PackageIndex {
        self.import("/Script/CoreUObject", "Class", package, name)
    }

    pub fn export(&mut self, spec: ExportSpec) -> PackageIndex {
        let name = self.intern(&spec.name);
        self.exports.push((name, spec));
        PackageIndex::from_export(self.exports.len() - 1)
    }

    /// Serialized class data: field list, class defaults, interfaces
    pub fn class_payload(&self, children: &[PackageIndex], interfaces: &[PackageIndex]) -> Vec<u8> {
        let mut w = ByteWriter::new(self.endian);
        if self.supports(VersionGate::FieldListIsArray) {
            w.i32(children.len() as i32);
            for child in children {
                w.index(*child);
            }
        } else {
            w.index(children.first().copied().unwrap_or_default());
            w.i32(0);
        }
        if self.supports(VersionGate::ClassDefaultsSerialized) {
            w.name(NameRef { index: 0, number: 0 });
        }
        let wrapped = self.supports(VersionGate::InterfacesAsStruct);
        w.i32(interfaces.len() as i32);
        for interface in interfaces {
            w.index(*interface);
            if wrapped {
                w.i32(0);
                w.i32(1);
            }
        }
        w.into_inner()
    }

    /// Serialize the whole package
    pub fn build(&self) -> Vec<u8> {
        let versions = self.versions();
        let gate = |g: VersionGate| versions.supports(g);
        let none = NameRef { index: 0, number: 0 };
        let mut w = ByteWriter::new(self.endian);

        w.u32(PACKAGE_FILE_TAG);
        w.i32(self.legacy);
        if self.legacy != -4 {
            w.i32(864);
        }
        w.i32(self.ue4);
        if self.legacy <= -8 {
            w.i32(self.ue5.unwrap_or(ue5::INITIAL_VERSION));
        }
        w.i32(self.licensee);
        if self.legacy <= -2 {
            w.i32(self.custom.len() as i32);
            for c in &self.custom {
                w.guid(c.key);
                w.i32(c.version);
                if (-5..=-3).contains(&self.legacy) {
                    w.fstring("Custom");
                }
            }
        }

        let header_size_at = w.position();
        w.i32(0);
        w.fstring(NONE);
        w.u32(self.package_flags);

        w.i32(self.names.len() as i32);
        let name_offset_at = w.position();
        w.i32(0);
        if gate(VersionGate::SoftObjectPathList) {
            w.i32(0);
            w.i32(0);
        }
        let editor_only = self.package_flags & PKG_FILTER_EDITOR_ONLY != 0;
        if !editor_only && gate(VersionGate::LocalizationId) {
            w.fstring("");
        }
        if gate(VersionGate::GatherableText) {
            w.i32(0);
            w.i32(0);
        }
        w.i32(self.exports.len() as i32);
        let export_offset_at = w.position();
        w.i32(0);
        w.i32(self.imports.len() as i32);
        let import_offset_at = w.position();
        w.i32(0);
        let depends_offset_at = w.position();
        w.i32(0);

        let pos = w.position() as i32;
        w.patch_i32(name_offset_at, pos);
        for name in &self.names {
            w.fstring(name);
            if gate(VersionGate::NameHashes) {
                w.u16(0);
                w.u16(0);
            }
        }

        let pos = w.position() as i32;
        w.patch_i32(import_offset_at, pos);
        for import in &self.imports {
            w.name(import.class_package);
            w.name(import.class_name);
            w.index(import.outer);
            w.name(import.object_name);
            if gate(VersionGate::ImportPackageName) && !editor_only {
                w.name(none);
            }
            if gate(VersionGate::OptionalImports) {
                w.bool32(false);
            }
        }

        let wide = gate(VersionGate::SerialSizes64);
        let mut serial_slots = Vec::with_capacity(self.exports.len());
        let pos = w.position() as i32;
        w.patch_i32(export_offset_at, pos);
        for (name, spec) in &self.exports {
            w.index(spec.class);
            w.index(spec.super_class);
            if gate(VersionGate::TemplateIndex) {
                w.index(PackageIndex::NULL);
            }
            w.index(spec.outer);
            w.name(*name);
            w.u32(spec.flags);
            serial_slots.push(w.position());
            if wide {
                w.i64(0);
                w.i64(0);
            } else {
                w.i32(0);
                w.i32(0);
            }
            w.bool32(false);
            w.bool32(false);
            w.bool32(false);
            if !gate(VersionGate::ExportPackageGuidRemoved) {
                w.guid(Guid::default());
            }
            if gate(VersionGate::InheritedInstanceFlag) {
                w.bool32(false);
            }
            w.u32(0);
            if gate(VersionGate::LoadForEditorGame) {
                w.bool32(false);
            }
            if gate(VersionGate::CookedAssetFlag) {
                w.bool32(false);
            }
            if gate(VersionGate::PublicHashFlag) {
                w.bool32(false);
            }
            if gate(VersionGate::PreloadDependencies) {
                for _ in 0..5 {
                    w.i32(0);
                }
            }
            if gate(VersionGate::ScriptSerializationOffsets) {
                w.i64(0);
                w.i64(0);
            }
        }

        let pos = w.position() as i32;
        w.patch_i32(depends_offset_at, pos);
        for (_, spec) in &self.exports {
            w.i32(spec.dependencies.len() as i32);
            for dep in &spec.dependencies {
                w.index(*dep);
            }
        }

        let pos = w.position() as i32;
        w.patch_i32(header_size_at, pos);

        let mut empty = ByteWriter::new(self.endian);
        empty.name(none);
        let empty = empty.into_inner();

        for ((_, spec), slot) in self.exports.iter().zip(serial_slots) {
            let payload = spec.payload.as_deref().unwrap_or(&empty);
            let offset = w.position() as i64;
            let size = payload.len() as i64;
            if wide {
                w.patch_i64(slot, size);
                w.patch_i64(slot + 8, offset);
            } else {
                w.patch_i32(slot, size as i32);
                w.patch_i32(slot + 4, offset as i32);
            }
            w.bytes(payload);
        }

        w.into_inner()
    }
}

/// Writes a tagged property list whose names land in the builder's table
#[derive(Debug)]
pub struct PropertyWriter<'b> {
    builder: &'b mut PackageBuilder,
    out: ByteWriter,
}

impl<'b> PropertyWriter<'b> {
    pub fn new(builder: &'b mut PackageBuilder) -> Self {
        let out = ByteWriter::new(builder.endian);
        Self { builder, out }
    }

    fn scratch(&self) -> ByteWriter {
        ByteWriter::new(self.builder.endian)
    }

    fn nested(&mut self) -> PropertyWriter<'_> {
        PropertyWriter::new(&mut *self.builder)
    }

    fn supports(&self, gate: VersionGate) -> bool {
        self.builder.supports(gate)
    }

    fn header(&mut self, name: &str, type_name: &str, size: usize) {
        let name = self.builder.intern(name);
        let type_name = self.builder.intern(type_name);
        self.out.name(name);
        self.out.name(type_name);
        self.out.i32(size as i32);
        self.out.i32(0);
    }

    fn extra_name(&mut self, name: &str) {
        let name = self.builder.intern(name);
        self.out.name(name);
    }

    fn tail(&mut self) {
        if self.supports(VersionGate::PropertyGuidInTag) {
            self.out.u8(0);
        }
        if self.supports(VersionGate::PropertyTagExtension) {
            self.out.u8(0);
        }
    }

    fn struct_tag(&mut self, name: &str, struct_name: &str, size: usize) {
        self.header(name, "StructProperty", size);
        self.extra_name(struct_name);
        if self.supports(VersionGate::StructGuidInTag) {
            self.out.guid(Guid::default());
        }
        self.tail();
    }

    /// Tag with no type extras followed by `payload`
    pub fn raw(&mut self, name: &str, type_name: &str, payload: &[u8]) {
        self.header(name, type_name, payload.len());
        self.tail();
        self.out.bytes(payload);
    }

    pub fn int(&mut self, name: &str, v: i32) {
        let mut p = self.scratch();
        p.i32(v);
        self.raw(name, "IntProperty", &p.into_inner());
    }

    pub fn float(&mut self, name: &str, v: f32) {
        let mut p = self.scratch();
        p.f32(v);
        self.raw(name, "FloatProperty", &p.into_inner());
    }

    pub fn bool(&mut self, name: &str, v: bool) {
        self.header(name, "BoolProperty", 0);
        self.out.u8(u8::from(v));
        self.tail();
    }

    pub fn string(&mut self, name: &str, v: &str) {
        let mut p = self.scratch();
        p.fstring(v);
        self.raw(name, "StrProperty", &p.into_inner());
    }

    pub fn name(&mut self, name: &str, v: &str) {
        let value = self.builder.intern(v);
        let mut p = self.scratch();
        p.name(value);
        self.raw(name, "NameProperty", &p.into_inner());
    }

    pub fn object(&mut self, name: &str, v: PackageIndex) {
        let mut p = self.scratch();
        p.index(v);
        self.raw(name, "ObjectProperty", &p.into_inner());
    }

    pub fn delegate(&mut self, name: &str, object: PackageIndex, function: &str) {
        let function = self.builder.intern(function);
        let mut p = self.scratch();
        p.index(object);
        p.name(function);
        self.raw(name, "DelegateProperty", &p.into_inner());
    }

    /// Text with a Base history
    pub fn text(&mut self, name: &str, namespace: &str, key: &str, source: &str) {
        let mut p = self.scratch();
        p.u32(0);
        p.i8(0);
        p.fstring(namespace);
        p.fstring(key);
        p.fstring(source);
        self.raw(name, "TextProperty", &p.into_inner());
    }

    pub fn guid(&mut self, name: &str, v: Guid) {
        let mut p = self.scratch();
        p.guid(v);
        let payload = p.into_inner();
        self.struct_tag(name, "Guid", payload.len());
        self.out.bytes(&payload);
    }

    /// Struct serialized as a nested tagged list
    pub fn structure(
        &mut self,
        name: &str,
        struct_name: &str,
        fields: impl FnOnce(&mut PropertyWriter<'_>),
    ) {
        let payload = {
            let mut nested = self.nested();
            fields(&mut nested);
            nested.finish()
        };
        self.struct_tag(name, struct_name, payload.len());
        self.out.bytes(&payload);
    }

    pub fn member_reference(
        &mut self,
        key: &str,
        member_name: &str,
        parent: Option<PackageIndex>,
        self_context: bool,
    ) {
        self.member_reference_full(key, member_name, parent, self_context, None);
    }

    pub fn member_reference_full(
        &mut self,
        key: &str,
        member_name: &str,
        parent: Option<PackageIndex>,
        self_context: bool,
        guid: Option<Guid>,
    ) {
        self.structure(key, "MemberReference", |w| {
            if let Some(parent) = parent {
                w.object("MemberParent", parent);
            }
            w.name("MemberName", member_name);
            if let Some(guid) = guid {
                w.guid("MemberGuid", guid);
            }
            w.bool("bSelfContext", self_context);
        });
    }

    pub fn name_array(&mut self, name: &str, values: &[&str]) {
        let mut p = self.scratch();
        p.i32(values.len() as i32);
        for v in values {
            let v = self.builder.intern(v);
            p.name(v);
        }
        self.raw_array(name, "NameProperty", &p.into_inner());
    }

    /// Array tag naming `inner_type` followed by `payload`
    pub fn raw_array(&mut self, name: &str, inner_type: &str, payload: &[u8]) {
        self.header(name, "ArrayProperty", payload.len());
        if self.supports(VersionGate::ArrayInnerTags) {
            self.extra_name(inner_type);
        }
        self.tail();
        self.out.bytes(payload);
    }

    /// Array of `count` tagged structs, each filled by `element`
    pub fn struct_array(
        &mut self,
        name: &str,
        struct_name: &str,
        count: usize,
        mut element: impl FnMut(&mut PropertyWriter<'_>, usize),
    ) {
        let mut elements = Vec::new();
        for i in 0..count {
            let mut nested = self.nested();
            element(&mut nested, i);
            elements.extend(nested.finish());
        }

        let inner_tags = self.supports(VersionGate::ArrayInnerTags);
        let payload = {
            let mut nested = self.nested();
            nested.out.i32(count as i32);
            if inner_tags {
                nested.struct_tag(name, struct_name, elements.len());
            }
            nested.out.bytes(&elements);
            nested.out.into_inner()
        };

        self.header(name, "ArrayProperty", payload.len());
        if inner_tags {
            self.extra_name("StructProperty");
        }
        self.tail();
        self.out.bytes(&payload);
    }

    /// Name property whose value carries an instance number
    pub fn numbered_name(&mut self, name: &str, base: &str, number: i32) {
        let value = NameRef {
            number,
            ..self.builder.intern(base)
        };
        let mut p = self.scratch();
        p.name(value);
        self.raw(name, "NameProperty", &p.into_inner());
    }

    /// Byte property backed by an enum, stored as the enumerator name
    pub fn enum_byte(&mut self, name: &str, enum_name: &str, value: &str) {
        let value = self.builder.intern(value);
        let mut p = self.scratch();
        p.name(value);
        let payload = p.into_inner();
        self.header(name, "ByteProperty", payload.len());
        self.extra_name(enum_name);
        self.tail();
        self.out.bytes(&payload);
    }

    pub fn byte(&mut self, name: &str, v: u8) {
        self.header(name, "ByteProperty", 1);
        self.extra_name(NONE);
        self.tail();
        self.out.u8(v);
    }

    pub fn enumeration(&mut self, name: &str, enum_name: &str, value: &str) {
        let value = self.builder.intern(value);
        let mut p = self.scratch();
        p.name(value);
        let payload = p.into_inner();
        self.header(name, "EnumProperty", payload.len());
        self.extra_name(enum_name);
        self.tail();
        self.out.bytes(&payload);
    }

    fn soft_path_payload(&mut self, package: &str, asset: Option<&str>, sub_path: &str) -> Vec<u8> {
        let mut p = self.scratch();
        if self.supports(VersionGate::SoftObjectPathPackageName) {
            let package = self.builder.intern(package);
            let asset = self.builder.intern(asset.unwrap_or(NONE));
            p.name(package);
            p.name(asset);
        } else {
            let path = match asset {
                Some(asset) => format!("{}.{}", package, asset),
                None => package.to_string(),
            };
            let path = self.builder.intern(&path);
            p.name(path);
        }
        p.fstring(sub_path);
        p.into_inner()
    }

    pub fn soft_object(&mut self, name: &str, package: &str, asset: Option<&str>, sub_path: &str) {
        let payload = self.soft_path_payload(package, asset, sub_path);
        self.raw(name, "SoftObjectProperty", &payload);
    }

    /// `SoftClassPath` struct, serialized natively
    pub fn soft_class_path(&mut self, name: &str, package: &str, asset: Option<&str>) {
        let payload = self.soft_path_payload(package, asset, "");
        self.struct_tag(name, "SoftClassPath", payload.len());
        self.out.bytes(&payload);
    }

    pub fn field_path(&mut self, name: &str, path: &[&str], owner: PackageIndex) {
        let mut p = self.scratch();
        p.i32(path.len() as i32);
        for segment in path {
            let segment = self.builder.intern(segment);
            p.name(segment);
        }
        p.index(owner);
        self.raw(name, "FieldPathProperty", &p.into_inner());
    }

    pub fn multicast_delegate(&mut self, name: &str, bindings: &[(PackageIndex, &str)]) {
        let mut p = self.scratch();
        p.i32(bindings.len() as i32);
        for (object, function) in bindings {
            let function = self.builder.intern(function);
            p.index(*object);
            p.name(function);
        }
        self.raw(name, "MulticastInlineDelegateProperty", &p.into_inner());
    }

    /// Vector in doubles or floats, whichever the package version stores
    pub fn vector(&mut self, name: &str, x: f64, y: f64, z: f64) {
        let mut p = self.scratch();
        for v in [x, y, z] {
            if self.supports(VersionGate::LargeWorldCoordinates) {
                p.f64(v);
            } else {
                p.f32(v as f32);
            }
        }
        let payload = p.into_inner();
        self.struct_tag(name, "Vector", payload.len());
        self.out.bytes(&payload);
    }

    pub fn int_set(&mut self, name: &str, removed: &[i32], values: &[i32]) {
        let mut p = self.scratch();
        for list in [removed, values] {
            p.i32(list.len() as i32);
            for v in list {
                p.i32(*v);
            }
        }
        let payload = p.into_inner();
        self.header(name, "SetProperty", payload.len());
        if self.supports(VersionGate::SetMapInnerTypes) {
            self.extra_name("IntProperty");
        }
        self.tail();
        self.out.bytes(&payload);
    }

    pub fn optional_int(&mut self, name: &str, value: Option<i32>) {
        let mut p = self.scratch();
        p.u8(u8::from(value.is_some()));
        if let Some(v) = value {
            p.i32(v);
        }
        let payload = p.into_inner();
        self.header(name, "OptionalProperty", payload.len());
        self.extra_name("IntProperty");
        self.tail();
        self.out.bytes(&payload);
    }

    pub fn name_to_int_map(&mut self, name: &str, pairs: &[(&str, i32)]) {
        self.name_to_int_map_with_removed(name, &[], pairs);
    }

    pub fn name_to_int_map_with_removed(
        &mut self,
        name: &str,
        removed: &[&str],
        pairs: &[(&str, i32)],
    ) {
        let mut p = self.scratch();
        p.i32(removed.len() as i32);
        for k in removed {
            let k = self.builder.intern(k);
            p.name(k);
        }
        p.i32(pairs.len() as i32);
        for (k, v) in pairs {
            let k = self.builder.intern(k);
            p.name(k);
            p.i32(*v);
        }
        let payload = p.into_inner();
        self.header(name, "MapProperty", payload.len());
        if self.supports(VersionGate::SetMapInnerTypes) {
            self.extra_name("NameProperty");
            self.extra_name("IntProperty");
        }
        self.tail();
        self.out.bytes(&payload);
    }

    /// Terminate the list and return its bytes
    pub fn finish(mut self) -> Vec<u8> {
        let none = self.builder.intern(NONE);
        self.out.name(none);
        self.out.into_inner()
    }
}
