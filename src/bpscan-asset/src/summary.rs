//! Package file summary (the fixed header at offset 0)

use crate::reader::{Endian, Reader};
use crate::versions::{
    ue5, CustomVersions, PackageVersions, VersionGate, LEGACY_FILE_VERSION_NEWEST,
    LEGACY_FILE_VERSION_OLDEST, PACKAGE_FILE_TAG, PACKAGE_FILE_TAG_SWAPPED,
    PKG_FILTER_EDITOR_ONLY, PKG_UNVERSIONED_PROPERTIES,
};
use crate::{Error, Result};

/// Decoded package summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub endian: Endian,
    pub versions: PackageVersions,
    pub total_header_size: i32,
    pub folder_name: String,
    pub package_flags: u32,
    pub name_count: usize,
    pub name_offset: usize,
    pub soft_object_paths_count: usize,
    pub soft_object_paths_offset: usize,
    pub localization_id: Option<String>,
    pub gatherable_text_data_count: usize,
    pub gatherable_text_data_offset: usize,
    pub export_count: usize,
    pub export_offset: usize,
    pub import_count: usize,
    pub import_offset: usize,
    pub depends_offset: usize,
}

fn read_offset(reader: &mut Reader<'_>) -> Result<usize> {
    let offset = reader.position();
    let value = reader.read_i32()?;
    usize::try_from(value).map_err(|_| Error::InvalidCount {
        offset,
        count: value,
    })
}

impl PackageSummary {
    /// Decode the summary, detecting byte order from the tag
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data, Endian::Little);

        let endian = match r.read_u32()? {
            PACKAGE_FILE_TAG => Endian::Little,
            PACKAGE_FILE_TAG_SWAPPED => Endian::Big,
            other => return Err(Error::InvalidPackageTag(other)),
        };
        r.set_endian(endian);

        let legacy_file_version = r.read_i32()?;
        if !(LEGACY_FILE_VERSION_NEWEST..=LEGACY_FILE_VERSION_OLDEST).contains(&legacy_file_version)
        {
            return Err(Error::UnsupportedFileVersion {
                legacy: legacy_file_version,
                ue4: 0,
                ue5: None,
            });
        }

        if legacy_file_version != -4 {
            let _legacy_ue3_version = r.read_i32()?;
        }

        let ue4 = r.read_i32()?;
        let ue5 = if legacy_file_version <= -8 {
            Some(r.read_i32()?)
        } else {
            None
        };
        let licensee = r.read_i32()?;

        if ue4 <= 0 || ue5.is_some_and(|v| v > ue5::LATEST_SUPPORTED) {
            return Err(Error::UnsupportedFileVersion {
                legacy: legacy_file_version,
                ue4,
                ue5,
            });
        }

        let custom = CustomVersions::read(&mut r, legacy_file_version)?;
        let versions = PackageVersions {
            legacy_file_version,
            ue4,
            ue5,
            licensee,
            custom,
        };

        let total_header_size = r.read_i32()?;
        let folder_name = r.read_fstring()?;
        let package_flags = r.read_u32()?;

        if package_flags & PKG_UNVERSIONED_PROPERTIES != 0 {
            return Err(Error::UnversionedProperties);
        }

        let name_count = read_offset(&mut r)?;
        let name_offset = read_offset(&mut r)?;

        let (soft_object_paths_count, soft_object_paths_offset) =
            if versions.supports(VersionGate::SoftObjectPathList) {
                (read_offset(&mut r)?, read_offset(&mut r)?)
            } else {
                (0, 0)
            };

        let localization_id = if package_flags & PKG_FILTER_EDITOR_ONLY == 0
            && versions.supports(VersionGate::LocalizationId)
        {
            Some(r.read_fstring()?)
        } else {
            None
        };

        let (gatherable_text_data_count, gatherable_text_data_offset) =
            if versions.supports(VersionGate::GatherableText) {
                (read_offset(&mut r)?, read_offset(&mut r)?)
            } else {
                (0, 0)
            };

        let export_count = read_offset(&mut r)?;
        let export_offset = read_offset(&mut r)?;
        let import_count = read_offset(&mut r)?;
        let import_offset = read_offset(&mut r)?;
        let depends_offset = read_offset(&mut r)?;

        Ok(Self {
            endian,
            versions,
            total_header_size,
            folder_name,
            package_flags,
            name_count,
            name_offset,
            soft_object_paths_count,
            soft_object_paths_offset,
            localization_id,
            gatherable_text_data_count,
            gatherable_text_data_offset,
            export_count,
            export_offset,
            import_count,
            import_offset,
            depends_offset,
        })
    }

    pub fn is_filter_editor_only(&self) -> bool {
        self.package_flags & PKG_FILTER_EDITOR_ONLY != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_tag() {
        let data = 0x1234_5678u32.to_le_bytes();
        assert!(matches!(
            PackageSummary::read(&data),
            Err(Error::InvalidPackageTag(0x1234_5678))
        ));
    }

    #[test]
    fn test_unsupported_legacy_version() {
        let mut data = PACKAGE_FILE_TAG.to_le_bytes().to_vec();
        data.extend_from_slice(&(-9i32).to_le_bytes());
        assert!(matches!(
            PackageSummary::read(&data),
            Err(Error::UnsupportedFileVersion { legacy: -9, .. })
        ));
    }

    #[test]
    fn test_unversioned_properties_are_rejected() {
        let data = crate::testing::PackageBuilder::new()
            .with_package_flags(PKG_UNVERSIONED_PROPERTIES)
            .build();
        assert_eq!(PackageSummary::read(&data), Err(Error::UnversionedProperties));
    }

    #[test]
    fn test_truncated_summary() {
        let mut data = PACKAGE_FILE_TAG.to_le_bytes().to_vec();
        data.extend_from_slice(&(-8i32).to_le_bytes());
        assert!(matches!(
            PackageSummary::read(&data),
            Err(Error::TruncatedData { .. })
        ));
    }
}
