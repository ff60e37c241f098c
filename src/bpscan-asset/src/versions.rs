//! Package versioning: object versions, custom versions, and the gate table
//!
//! Nearly every structural decision in a package file depends on a version
//! number. Each decision the decoder makes is named by a [`VersionGate`] and
//! mapped to exactly one requirement in [`VersionGate::requirement`], so the
//! layout assumptions live in one place and the compiler rejects a gate that
//! has no threshold.

use crate::reader::{Guid, Reader};
use crate::Result;

/// Package summary tag in native byte order
pub const PACKAGE_FILE_TAG: u32 = 0x9E2A_83C1;

/// Summary tag as seen when the file was written with the opposite byte order
pub const PACKAGE_FILE_TAG_SWAPPED: u32 = 0xC183_2A9E;

/// Oldest legacy file version the decoder understands
pub const LEGACY_FILE_VERSION_OLDEST: i32 = -1;

/// Newest legacy file version the decoder understands
pub const LEGACY_FILE_VERSION_NEWEST: i32 = -8;

/// Package flag: editor-only data was stripped at save time
pub const PKG_FILTER_EDITOR_ONLY: u32 = 0x8000_0000;

/// Package flag: properties are serialized without tags (needs external schema)
pub const PKG_UNVERSIONED_PROPERTIES: u32 = 0x0000_2000;

/// UE4 object versions consulted by the decoder
pub mod ue4 {
    pub const LOAD_FOR_EDITOR_GAME: i32 = 365;
    pub const STRUCT_GUID_IN_PROPERTY_TAG: i32 = 441;
    pub const SERIALIZE_TEXT_IN_PACKAGES: i32 = 459;
    pub const COOKED_ASSETS_IN_EDITOR_SUPPORT: i32 = 485;
    pub const ARRAY_PROPERTY_INNER_TAGS: i32 = 500;
    pub const PROPERTY_GUID_IN_PROPERTY_TAG: i32 = 503;
    pub const NAME_HASHES_SERIALIZED: i32 = 504;
    pub const PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS: i32 = 507;
    pub const TEMPLATE_INDEX_IN_COOKED_EXPORTS: i32 = 508;
    pub const PROPERTY_TAG_SET_MAP_SUPPORT: i32 = 509;
    pub const SERIAL_SIZES_64BIT: i32 = 511;
    pub const ADDED_PACKAGE_SUMMARY_LOCALIZATION_ID: i32 = 516;
    pub const NON_OUTER_PACKAGE_IMPORT: i32 = 520;
    pub const LATEST: i32 = 522;
}

/// UE5 object versions consulted by the decoder
pub mod ue5 {
    pub const INITIAL_VERSION: i32 = 1000;
    pub const OPTIONAL_RESOURCES: i32 = 1003;
    pub const LARGE_WORLD_COORDINATES: i32 = 1004;
    pub const REMOVE_OBJECT_EXPORT_PACKAGE_GUID: i32 = 1005;
    pub const TRACK_OBJECT_EXPORT_IS_INHERITED: i32 = 1006;
    pub const FSOFTOBJECTPATH_REMOVE_ASSET_PATH_FNAMES: i32 = 1007;
    pub const ADD_SOFTOBJECTPATH_LIST: i32 = 1008;
    pub const DATA_RESOURCES: i32 = 1009;
    pub const SCRIPT_SERIALIZATION_OFFSET: i32 = 1010;
    pub const PROPERTY_TAG_EXTENSION_AND_OVERRIDABLE_SERIALIZATION: i32 = 1011;
    /// Newest layout this decoder reads; later versions change the tag format
    pub const LATEST_SUPPORTED: i32 = PROPERTY_TAG_EXTENSION_AND_OVERRIDABLE_SERIALIZATION;
}

/// A registered custom version stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomVersionKey {
    pub name: &'static str,
    pub guid: Guid,
}

pub mod custom {
    use super::CustomVersionKey;
    use crate::reader::Guid;

    pub const CORE: CustomVersionKey = CustomVersionKey {
        name: "FCoreObjectVersion",
        guid: Guid::new(0x375E_C13C, 0x06E4_48FB, 0xB500_84F0, 0x262A_717E),
    };

    pub const FRAMEWORK: CustomVersionKey = CustomVersionKey {
        name: "FFrameworkObjectVersion",
        guid: Guid::new(0xCFFC_743F, 0x43B0_4480, 0x9391_14DF, 0x171D_2073),
    };

    pub const UE5_RELEASE_STREAM: CustomVersionKey = CustomVersionKey {
        name: "FUE5ReleaseStreamObjectVersion",
        guid: Guid::new(0xD89B_5E42, 0x24BD_4D46, 0x8412_ACA8, 0xDF64_1779),
    };

    pub const BLUEPRINTS: CustomVersionKey = CustomVersionKey {
        name: "FBlueprintsObjectVersion",
        guid: Guid::new(0xB0D8_32E4, 0x1F89_4F0D, 0xACCF_7EB7, 0x36FD_4AA2),
    };

    pub const KNOWN: &[CustomVersionKey] = &[CORE, FRAMEWORK, UE5_RELEASE_STREAM, BLUEPRINTS];
}

/// Where a gate's threshold is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Ue4(i32),
    Ue5(i32),
    Custom(CustomVersionKey, i32),
}

/// Every version-dependent layout decision the decoder makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionGate {
    // summary
    LocalizationId,
    GatherableText,
    SoftObjectPathList,
    // name and import tables
    NameHashes,
    ImportPackageName,
    OptionalImports,
    // export table
    TemplateIndex,
    SerialSizes64,
    ExportPackageGuidRemoved,
    InheritedInstanceFlag,
    LoadForEditorGame,
    CookedAssetFlag,
    PublicHashFlag,
    PreloadDependencies,
    ScriptSerializationOffsets,
    // property tags and payloads
    StructGuidInTag,
    ArrayInnerTags,
    SetMapInnerTypes,
    PropertyGuidInTag,
    PropertyTagExtension,
    LargeWorldCoordinates,
    SoftObjectPathPackageName,
    // class data
    FieldListIsArray,
    ClassDefaultsSerialized,
    InterfacesAsStruct,
    EventOverrideNodes,
}

impl VersionGate {
    pub const ALL: [VersionGate; 26] = [
        Self::LocalizationId,
        Self::GatherableText,
        Self::SoftObjectPathList,
        Self::NameHashes,
        Self::ImportPackageName,
        Self::OptionalImports,
        Self::TemplateIndex,
        Self::SerialSizes64,
        Self::ExportPackageGuidRemoved,
        Self::InheritedInstanceFlag,
        Self::LoadForEditorGame,
        Self::CookedAssetFlag,
        Self::PublicHashFlag,
        Self::PreloadDependencies,
        Self::ScriptSerializationOffsets,
        Self::StructGuidInTag,
        Self::ArrayInnerTags,
        Self::SetMapInnerTypes,
        Self::PropertyGuidInTag,
        Self::PropertyTagExtension,
        Self::LargeWorldCoordinates,
        Self::SoftObjectPathPackageName,
        Self::FieldListIsArray,
        Self::ClassDefaultsSerialized,
        Self::InterfacesAsStruct,
        Self::EventOverrideNodes,
    ];

    /// Threshold at or above which the gated layout applies
    pub const fn requirement(self) -> VersionSource {
        use VersionSource::{Custom, Ue4, Ue5};
        match self {
            Self::LocalizationId => Ue4(ue4::ADDED_PACKAGE_SUMMARY_LOCALIZATION_ID),
            Self::GatherableText => Ue4(ue4::SERIALIZE_TEXT_IN_PACKAGES),
            Self::SoftObjectPathList => Ue5(ue5::ADD_SOFTOBJECTPATH_LIST),
            Self::NameHashes => Ue4(ue4::NAME_HASHES_SERIALIZED),
            Self::ImportPackageName => Ue4(ue4::NON_OUTER_PACKAGE_IMPORT),
            Self::OptionalImports => Ue5(ue5::OPTIONAL_RESOURCES),
            Self::TemplateIndex => Ue4(ue4::TEMPLATE_INDEX_IN_COOKED_EXPORTS),
            Self::SerialSizes64 => Ue4(ue4::SERIAL_SIZES_64BIT),
            Self::ExportPackageGuidRemoved => Ue5(ue5::REMOVE_OBJECT_EXPORT_PACKAGE_GUID),
            Self::InheritedInstanceFlag => Ue5(ue5::TRACK_OBJECT_EXPORT_IS_INHERITED),
            Self::LoadForEditorGame => Ue4(ue4::LOAD_FOR_EDITOR_GAME),
            Self::CookedAssetFlag => Ue4(ue4::COOKED_ASSETS_IN_EDITOR_SUPPORT),
            Self::PublicHashFlag => Ue5(ue5::OPTIONAL_RESOURCES),
            Self::PreloadDependencies => Ue4(ue4::PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS),
            Self::ScriptSerializationOffsets => Ue5(ue5::SCRIPT_SERIALIZATION_OFFSET),
            Self::StructGuidInTag => Ue4(ue4::STRUCT_GUID_IN_PROPERTY_TAG),
            Self::ArrayInnerTags => Ue4(ue4::ARRAY_PROPERTY_INNER_TAGS),
            Self::SetMapInnerTypes => Ue4(ue4::PROPERTY_TAG_SET_MAP_SUPPORT),
            Self::PropertyGuidInTag => Ue4(ue4::PROPERTY_GUID_IN_PROPERTY_TAG),
            Self::PropertyTagExtension => {
                Ue5(ue5::PROPERTY_TAG_EXTENSION_AND_OVERRIDABLE_SERIALIZATION)
            }
            Self::LargeWorldCoordinates => Ue5(ue5::LARGE_WORLD_COORDINATES),
            Self::SoftObjectPathPackageName => Ue5(ue5::FSOFTOBJECTPATH_REMOVE_ASSET_PATH_FNAMES),
            // Children stop being a linked UField list once FProperties land
            Self::FieldListIsArray => Custom(custom::CORE, 4),
            Self::ClassDefaultsSerialized => Custom(custom::FRAMEWORK, 28),
            Self::InterfacesAsStruct => Custom(custom::UE5_RELEASE_STREAM, 10),
            Self::EventOverrideNodes => Ue5(ue5::INITIAL_VERSION),
        }
    }
}

/// One entry of the custom version container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomVersion {
    pub key: Guid,
    pub version: i32,
}

/// Custom version container: GUID -> revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomVersions {
    entries: Vec<CustomVersion>,
}

impl CustomVersions {
    pub fn new(entries: Vec<CustomVersion>) -> Self {
        Self { entries }
    }

    /// Decode the container in the layout the legacy file version selects
    pub fn read(reader: &mut Reader<'_>, legacy_file_version: i32) -> Result<Self> {
        let entries = match legacy_file_version {
            -1 => Vec::new(),
            // enum-tagged format
            -2 => reader.read_array(|r| {
                let tag = r.read_u32()?;
                let version = r.read_i32()?;
                Ok(CustomVersion {
                    key: Guid::new(0, 0, 0, tag),
                    version,
                })
            })?,
            // guid format with friendly names
            -5..=-3 => reader.read_array(|r| {
                let key = r.read_guid()?;
                let version = r.read_i32()?;
                let _friendly_name = r.read_fstring()?;
                Ok(CustomVersion { key, version })
            })?,
            _ => reader.read_array(|r| {
                let key = r.read_guid()?;
                let version = r.read_i32()?;
                Ok(CustomVersion { key, version })
            })?,
        };
        Ok(Self { entries })
    }

    pub fn get(&self, key: &Guid) -> Option<i32> {
        self.entries
            .iter()
            .find(|e| e.key == *key)
            .map(|e| e.version)
    }

    pub fn entries(&self) -> &[CustomVersion] {
        &self.entries
    }
}

/// Version numbers that drive layout decisions for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    pub legacy_file_version: i32,
    pub ue4: i32,
    pub ue5: Option<i32>,
    pub licensee: i32,
    pub custom: CustomVersions,
}

impl PackageVersions {
    /// A missing custom version counts as older than every threshold
    pub fn supports(&self, gate: VersionGate) -> bool {
        match gate.requirement() {
            VersionSource::Ue4(threshold) => self.ue4 >= threshold,
            VersionSource::Ue5(threshold) => self.ue5.is_some_and(|v| v >= threshold),
            VersionSource::Custom(key, threshold) => {
                self.custom.get(&key.guid).is_some_and(|v| v >= threshold)
            }
        }
    }

    pub fn custom_version(&self, key: CustomVersionKey) -> Option<i32> {
        self.custom.get(&key.guid)
    }
}
