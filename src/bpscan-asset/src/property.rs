//! Tagged property decoding
//!
//! A tagged property list is a sequence of `FPropertyTag` headers, each
//! followed by exactly `size` payload bytes, terminated by a tag named
//! `None`. Type names dispatch through a static table to a [`PropertyKind`];
//! an unknown type name is a hard failure because the payload that follows
//! cannot be skipped safely without trusting the size hint.

use phf::phf_map;

use crate::names::{NameTable, NONE};
use crate::object::PackageIndex;
use crate::reader::{Guid, Reader};
use crate::versions::{PackageVersions, VersionGate};
use crate::{Error, Result};

/// Nested struct/container depth at which decoding gives up
pub const MAX_NESTING_DEPTH: usize = 64;

/// Extension flag announcing overridable-serialization data in a tag
const TAG_EXTENSION_OVERRIDABLE_INFO: u8 = 0x02;

/// Every property type tag the decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Byte,
    Int8,
    Int16,
    Int,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Str,
    Utf8Str,
    AnsiStr,
    VerseString,
    Name,
    Text,
    Enum,
    Object,
    Class,
    WeakObject,
    LazyObject,
    SoftObject,
    SoftClass,
    AssetObject,
    AssetClass,
    Interface,
    Struct,
    Array,
    Set,
    Map,
    Optional,
    Delegate,
    MulticastDelegate,
    MulticastInlineDelegate,
    MulticastSparseDelegate,
    FieldPath,
}

static PROPERTY_KINDS: phf::Map<&'static str, PropertyKind> = phf_map! {
    "BoolProperty" => PropertyKind::Bool,
    "ByteProperty" => PropertyKind::Byte,
    "Int8Property" => PropertyKind::Int8,
    "Int16Property" => PropertyKind::Int16,
    "IntProperty" => PropertyKind::Int,
    "Int64Property" => PropertyKind::Int64,
    "UInt16Property" => PropertyKind::UInt16,
    "UInt32Property" => PropertyKind::UInt32,
    "UInt64Property" => PropertyKind::UInt64,
    "FloatProperty" => PropertyKind::Float,
    "DoubleProperty" => PropertyKind::Double,
    "StrProperty" => PropertyKind::Str,
    "Utf8StrProperty" => PropertyKind::Utf8Str,
    "AnsiStrProperty" => PropertyKind::AnsiStr,
    "VerseStringProperty" => PropertyKind::VerseString,
    "NameProperty" => PropertyKind::Name,
    "TextProperty" => PropertyKind::Text,
    "EnumProperty" => PropertyKind::Enum,
    "ObjectProperty" => PropertyKind::Object,
    "ClassProperty" => PropertyKind::Class,
    "WeakObjectProperty" => PropertyKind::WeakObject,
    "LazyObjectProperty" => PropertyKind::LazyObject,
    "SoftObjectProperty" => PropertyKind::SoftObject,
    "SoftClassProperty" => PropertyKind::SoftClass,
    "AssetObjectProperty" => PropertyKind::AssetObject,
    "AssetClassProperty" => PropertyKind::AssetClass,
    "InterfaceProperty" => PropertyKind::Interface,
    "StructProperty" => PropertyKind::Struct,
    "ArrayProperty" => PropertyKind::Array,
    "SetProperty" => PropertyKind::Set,
    "MapProperty" => PropertyKind::Map,
    "OptionalProperty" => PropertyKind::Optional,
    "DelegateProperty" => PropertyKind::Delegate,
    "MulticastDelegateProperty" => PropertyKind::MulticastDelegate,
    "MulticastInlineDelegateProperty" => PropertyKind::MulticastInlineDelegate,
    "MulticastSparseDelegateProperty" => PropertyKind::MulticastSparseDelegate,
    "FieldPathProperty" => PropertyKind::FieldPath,
};

impl PropertyKind {
    pub fn from_tag(tag: &str) -> Result<Self> {
        PROPERTY_KINDS
            .get(tag)
            .copied()
            .ok_or_else(|| Error::UnsupportedPropertyType(tag.to_string()))
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Array | Self::Set | Self::Map | Self::Optional)
    }
}

/// Structs the engine serializes natively instead of as tagged properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeKind {
    Guid,
    Vector,
    Vector2D,
    Vector4,
    Rotator,
    Quat,
    LinearColor,
    Color,
    IntPoint,
    IntVector,
    DateTime,
    Timespan,
    SoftObjectPath,
}

static NATIVE_STRUCTS: phf::Map<&'static str, NativeKind> = phf_map! {
    "Guid" => NativeKind::Guid,
    "Vector" => NativeKind::Vector,
    "Vector2D" => NativeKind::Vector2D,
    "Vector4" => NativeKind::Vector4,
    "Rotator" => NativeKind::Rotator,
    "Quat" => NativeKind::Quat,
    "LinearColor" => NativeKind::LinearColor,
    "Color" => NativeKind::Color,
    "IntPoint" => NativeKind::IntPoint,
    "IntVector" => NativeKind::IntVector,
    "DateTime" => NativeKind::DateTime,
    "Timespan" => NativeKind::Timespan,
    "SoftObjectPath" => NativeKind::SoftObjectPath,
    "SoftClassPath" => NativeKind::SoftObjectPath,
};

/// Header preceding every tagged property payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTag {
    pub name: String,
    pub type_name: String,
    pub kind: PropertyKind,
    /// Declared payload size; the decoder checks it, it never skips by it
    pub size: i64,
    pub array_index: i32,
    pub struct_name: Option<String>,
    pub struct_guid: Option<Guid>,
    pub bool_value: bool,
    pub enum_name: Option<String>,
    pub inner_type: Option<String>,
    pub value_type: Option<String>,
    pub property_guid: Option<Guid>,
    pub extension_flags: u8,
    pub overridable_operation: Option<u8>,
}

/// Soft reference to an object by path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoftObjectPath {
    pub asset_path: String,
    pub sub_path: String,
}

/// Bound delegate: target object plus function name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDelegate {
    pub object: PackageIndex,
    pub function_name: String,
}

/// Path to a field, outermost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub path: Vec<String>,
    pub owner: PackageIndex,
}

/// Localized text value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextValue {
    pub flags: u32,
    pub history: TextHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextHistory {
    None {
        culture_invariant: Option<String>,
    },
    Base {
        namespace: String,
        key: String,
        source: String,
    },
    StringTableEntry {
        table_id: String,
        key: String,
    },
    /// History type the decoder does not interpret
    Opaque(i8),
}

/// Natively serialized struct payloads
#[derive(Debug, Clone, PartialEq)]
pub enum NativeStruct {
    Guid(Guid),
    Vector { x: f64, y: f64, z: f64 },
    Vector2D { x: f64, y: f64 },
    Vector4 { x: f64, y: f64, z: f64, w: f64 },
    Rotator { pitch: f64, yaw: f64, roll: f64 },
    Quat { x: f64, y: f64, z: f64, w: f64 },
    LinearColor { r: f32, g: f32, b: f32, a: f32 },
    Color { b: u8, g: u8, r: u8, a: u8 },
    IntPoint { x: i32, y: i32 },
    IntVector { x: i32, y: i32, z: i32 },
    DateTime(i64),
    Timespan(i64),
    SoftObjectPath(SoftObjectPath),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructValue {
    Tagged(PropertyBag),
    Native(NativeStruct),
}

/// Decoded property payload
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Byte(u8),
    Int8(i8),
    Int16(i16),
    Int(i32),
    Int64(i64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Str(String),
    Name(String),
    Text(TextValue),
    Enum {
        enum_name: Option<String>,
        value: String,
    },
    Object(PackageIndex),
    LazyObject(Guid),
    SoftObject(SoftObjectPath),
    Interface(PackageIndex),
    Delegate(ScriptDelegate),
    MulticastDelegate(Vec<ScriptDelegate>),
    FieldPath(FieldPath),
    Struct(StructValue),
    Array(Vec<PropertyValue>),
    Set(Vec<PropertyValue>),
    Map(Vec<(PropertyValue, PropertyValue)>),
    Optional(Option<Box<PropertyValue>>),
}

impl PropertyValue {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Enum { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<PackageIndex> {
        match self {
            Self::Object(i) | Self::Interface(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&PropertyBag> {
        match self {
            Self::Struct(StructValue::Tagged(bag)) => Some(bag),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Guid> {
        match self {
            Self::Struct(StructValue::Native(NativeStruct::Guid(g))) => Some(*g),
            _ => None,
        }
    }
}

/// One decoded tagged property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub array_index: i32,
    pub guid: Option<Guid>,
    pub value: PropertyValue,
}

/// Ordered name -> value map produced by a tagged property list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    properties: Vec<Property>,
}

impl PropertyBag {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// First property with this name (names compare case-insensitively)
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_struct(&self, name: &str) -> Option<&PropertyBag> {
        self.get(name).and_then(PropertyValue::as_struct)
    }

    pub fn get_name(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_name)
    }
}

/// What the decoder needs from the owning package
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub names: &'a NameTable,
    pub versions: &'a PackageVersions,
}

impl<'a> DecodeContext<'a> {
    pub fn new(names: &'a NameTable, versions: &'a PackageVersions) -> Self {
        Self { names, versions }
    }

    fn supports(&self, gate: VersionGate) -> bool {
        self.versions.supports(gate)
    }

    fn read_name(&self, r: &mut Reader<'_>) -> Result<String> {
        self.names.read_name(r)
    }

    fn read_optional_name(&self, r: &mut Reader<'_>) -> Result<Option<String>> {
        let name = self.read_name(r)?;
        Ok((name != NONE).then_some(name))
    }
}

/// Read a property tag; `None` at the list terminator
pub fn read_tag(r: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<Option<PropertyTag>> {
    let name = ctx.read_name(r)?;
    if name == NONE {
        return Ok(None);
    }

    let type_name = ctx.read_name(r)?;
    let kind = PropertyKind::from_tag(&type_name)?;
    let size = r.read_i32()? as i64;
    let array_index = r.read_i32()?;

    let mut tag = PropertyTag {
        name,
        type_name,
        kind,
        size,
        array_index,
        struct_name: None,
        struct_guid: None,
        bool_value: false,
        enum_name: None,
        inner_type: None,
        value_type: None,
        property_guid: None,
        extension_flags: 0,
        overridable_operation: None,
    };

    match kind {
        PropertyKind::Struct => {
            tag.struct_name = Some(ctx.read_name(r)?);
            if ctx.supports(VersionGate::StructGuidInTag) {
                tag.struct_guid = Some(r.read_guid()?);
            }
        }
        PropertyKind::Bool => tag.bool_value = r.read_bool()?,
        PropertyKind::Byte | PropertyKind::Enum => tag.enum_name = ctx.read_optional_name(r)?,
        PropertyKind::Array => {
            if ctx.supports(VersionGate::ArrayInnerTags) {
                tag.inner_type = Some(ctx.read_name(r)?);
            }
        }
        PropertyKind::Optional => tag.inner_type = Some(ctx.read_name(r)?),
        PropertyKind::Set => {
            if ctx.supports(VersionGate::SetMapInnerTypes) {
                tag.inner_type = Some(ctx.read_name(r)?);
            }
        }
        PropertyKind::Map => {
            if ctx.supports(VersionGate::SetMapInnerTypes) {
                tag.inner_type = Some(ctx.read_name(r)?);
                tag.value_type = Some(ctx.read_name(r)?);
            }
        }
        _ => {}
    }

    if ctx.supports(VersionGate::PropertyGuidInTag) && r.read_bool()? {
        tag.property_guid = Some(r.read_guid()?);
    }

    if ctx.supports(VersionGate::PropertyTagExtension) {
        tag.extension_flags = r.read_u8()?;
        if tag.extension_flags & TAG_EXTENSION_OVERRIDABLE_INFO != 0 {
            tag.overridable_operation = Some(r.read_u8()?);
            let _experimental_overridable_logic = r.read_bool32()?;
        }
    }

    Ok(Some(tag))
}

/// Decode one tagged property; `None` at the list terminator
///
/// The payload must consume exactly the size the tag declares.
pub fn decode_property(r: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<Option<Property>> {
    decode_property_at(r, ctx, 0)
}

/// Decode a full tagged property list up to and including its terminator
pub fn decode_properties(r: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<PropertyBag> {
    decode_properties_at(r, ctx, 0)
}

fn decode_properties_at(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    depth: usize,
) -> Result<PropertyBag> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep { depth });
    }
    let mut properties = Vec::new();
    while let Some(property) = decode_property_at(r, ctx, depth)? {
        properties.push(property);
    }
    Ok(PropertyBag { properties })
}

fn decode_property_at(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    depth: usize,
) -> Result<Option<Property>> {
    let Some(tag) = read_tag(r, ctx)? else {
        return Ok(None);
    };

    let start = r.position();
    let size = usize::try_from(tag.size).map_err(|_| Error::InvalidCount {
        offset: start,
        count: tag.size as i32,
    })?;
    if size > r.remaining() {
        return Err(Error::TruncatedData {
            offset: start,
            needed: size,
            available: r.remaining(),
        });
    }
    let end = start + size;

    let value = decode_tagged_value(r, ctx, &tag, end, depth)?;

    let consumed = r.position() - start;
    if consumed != size {
        return Err(Error::PropertySizeMismatch {
            name: tag.name,
            declared: tag.size,
            consumed,
        });
    }

    Ok(Some(Property {
        name: tag.name,
        array_index: tag.array_index,
        guid: tag.property_guid,
        value,
    }))
}

fn inner_kind(tag: &PropertyTag, type_name: Option<&String>) -> Result<PropertyKind> {
    let Some(type_name) = type_name else {
        return Err(Error::UnsupportedPropertyType(format!(
            "{} without inner type",
            tag.type_name
        )));
    };
    let kind = PropertyKind::from_tag(type_name)?;
    if kind.is_container() {
        return Err(Error::UnsupportedPropertyType(format!(
            "{} of {}",
            tag.type_name, type_name
        )));
    }
    Ok(kind)
}

fn decode_tagged_value(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    tag: &PropertyTag,
    end: usize,
    depth: usize,
) -> Result<PropertyValue> {
    match tag.kind {
        PropertyKind::Bool => Ok(PropertyValue::Bool(tag.bool_value)),
        // enum-backed byte properties store the enumerator name
        PropertyKind::Byte if tag.size != 1 => Ok(PropertyValue::Enum {
            enum_name: tag.enum_name.clone(),
            value: ctx.read_name(r)?,
        }),
        PropertyKind::Enum => Ok(PropertyValue::Enum {
            enum_name: tag.enum_name.clone(),
            value: ctx.read_name(r)?,
        }),
        PropertyKind::Struct => {
            let struct_name = tag.struct_name.as_deref().unwrap_or_default();
            decode_struct(r, ctx, struct_name, depth + 1)
        }
        PropertyKind::Array => {
            let inner = inner_kind(tag, tag.inner_type.as_ref())?;
            decode_array(r, ctx, inner, depth + 1).map(PropertyValue::Array)
        }
        PropertyKind::Set => {
            let inner = inner_kind(tag, tag.inner_type.as_ref())?;
            let _removed = decode_elements(r, ctx, inner, None, depth + 1)?;
            decode_elements(r, ctx, inner, None, depth + 1).map(PropertyValue::Set)
        }
        PropertyKind::Map => {
            let key = inner_kind(tag, tag.inner_type.as_ref())?;
            let value = inner_kind(tag, tag.value_type.as_ref())?;
            decode_map(r, ctx, key, value, depth + 1)
        }
        PropertyKind::Optional => {
            let inner = inner_kind(tag, tag.inner_type.as_ref())?;
            if r.read_bool()? {
                let value = decode_element(r, ctx, inner, None, depth + 1)?;
                Ok(PropertyValue::Optional(Some(Box::new(value))))
            } else {
                Ok(PropertyValue::Optional(None))
            }
        }
        PropertyKind::Text => {
            let text = read_text(r, ctx)?;
            if matches!(text.history, TextHistory::Opaque(_)) {
                // the declared size bounds the uninterpreted history
                r.seek(end)?;
            }
            Ok(PropertyValue::Text(text))
        }
        kind => decode_element(r, ctx, kind, None, depth),
    }
}

/// Decode a value that has no tag of its own (container element)
fn decode_element(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    kind: PropertyKind,
    struct_name: Option<&str>,
    depth: usize,
) -> Result<PropertyValue> {
    let value = match kind {
        PropertyKind::Bool => PropertyValue::Bool(r.read_bool()?),
        PropertyKind::Byte => PropertyValue::Byte(r.read_u8()?),
        PropertyKind::Int8 => PropertyValue::Int8(r.read_i8()?),
        PropertyKind::Int16 => PropertyValue::Int16(r.read_i16()?),
        PropertyKind::Int => PropertyValue::Int(r.read_i32()?),
        PropertyKind::Int64 => PropertyValue::Int64(r.read_i64()?),
        PropertyKind::UInt16 => PropertyValue::UInt16(r.read_u16()?),
        PropertyKind::UInt32 => PropertyValue::UInt32(r.read_u32()?),
        PropertyKind::UInt64 => PropertyValue::UInt64(r.read_u64()?),
        PropertyKind::Float => PropertyValue::Float(r.read_f32()?),
        PropertyKind::Double => PropertyValue::Double(r.read_f64()?),
        PropertyKind::Str
        | PropertyKind::Utf8Str
        | PropertyKind::AnsiStr
        | PropertyKind::VerseString => PropertyValue::Str(r.read_fstring()?),
        PropertyKind::Name => PropertyValue::Name(ctx.read_name(r)?),
        PropertyKind::Text => {
            let text = read_text(r, ctx)?;
            if let TextHistory::Opaque(history) = text.history {
                return Err(Error::UnsupportedPropertyType(format!(
                    "TextProperty history {}",
                    history
                )));
            }
            PropertyValue::Text(text)
        }
        PropertyKind::Enum => PropertyValue::Enum {
            enum_name: None,
            value: ctx.read_name(r)?,
        },
        PropertyKind::Object | PropertyKind::Class | PropertyKind::WeakObject => {
            PropertyValue::Object(r.read_package_index()?)
        }
        PropertyKind::LazyObject => PropertyValue::LazyObject(r.read_guid()?),
        PropertyKind::SoftObject
        | PropertyKind::SoftClass
        | PropertyKind::AssetObject
        | PropertyKind::AssetClass => PropertyValue::SoftObject(read_soft_object_path(r, ctx)?),
        PropertyKind::Interface => PropertyValue::Interface(r.read_package_index()?),
        PropertyKind::Delegate => PropertyValue::Delegate(read_delegate(r, ctx)?),
        PropertyKind::MulticastDelegate
        | PropertyKind::MulticastInlineDelegate
        | PropertyKind::MulticastSparseDelegate => {
            PropertyValue::MulticastDelegate(r.read_array(|r| read_delegate(r, ctx))?)
        }
        PropertyKind::FieldPath => {
            let path = r.read_array(|r| ctx.read_name(r))?;
            let owner = r.read_package_index()?;
            PropertyValue::FieldPath(FieldPath { path, owner })
        }
        PropertyKind::Struct => decode_struct(r, ctx, struct_name.unwrap_or_default(), depth + 1)?,
        PropertyKind::Array | PropertyKind::Set | PropertyKind::Map | PropertyKind::Optional => {
            return Err(Error::UnsupportedPropertyType(format!(
                "nested container {:?}",
                kind
            )))
        }
    };
    Ok(value)
}

fn decode_elements(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    kind: PropertyKind,
    struct_name: Option<&str>,
    depth: usize,
) -> Result<Vec<PropertyValue>> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep { depth });
    }
    r.read_array(|r| decode_element(r, ctx, kind, struct_name, depth))
}

fn decode_array(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    inner: PropertyKind,
    depth: usize,
) -> Result<Vec<PropertyValue>> {
    if inner != PropertyKind::Struct || !ctx.supports(VersionGate::ArrayInnerTags) {
        return decode_elements(r, ctx, inner, None, depth);
    }

    // struct arrays carry one inner tag naming the element struct
    let count = r.read_count()?;
    let inner_tag = read_tag(r, ctx)?.ok_or_else(|| {
        Error::UnsupportedPropertyType("ArrayProperty with empty inner tag".to_string())
    })?;
    let struct_name = inner_tag.struct_name.unwrap_or_default();

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(decode_struct(r, ctx, &struct_name, depth + 1)?);
    }
    Ok(values)
}

fn decode_map(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    key: PropertyKind,
    value: PropertyKind,
    depth: usize,
) -> Result<PropertyValue> {
    let _removed = decode_elements(r, ctx, key, None, depth)?;
    let count = r.read_count()?;
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let k = decode_element(r, ctx, key, None, depth)?;
        let v = decode_element(r, ctx, value, None, depth)?;
        pairs.push((k, v));
    }
    Ok(PropertyValue::Map(pairs))
}

fn decode_struct(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    struct_name: &str,
    depth: usize,
) -> Result<PropertyValue> {
    let value = match NATIVE_STRUCTS.get(struct_name) {
        Some(&kind) => StructValue::Native(read_native_struct(r, ctx, kind)?),
        None => StructValue::Tagged(decode_properties_at(r, ctx, depth)?),
    };
    Ok(PropertyValue::Struct(value))
}

fn read_native_struct(
    r: &mut Reader<'_>,
    ctx: &DecodeContext<'_>,
    kind: NativeKind,
) -> Result<NativeStruct> {
    let lwc = ctx.supports(VersionGate::LargeWorldCoordinates);
    let real = |r: &mut Reader<'_>| -> Result<f64> {
        if lwc {
            r.read_f64()
        } else {
            r.read_f32().map(f64::from)
        }
    };

    Ok(match kind {
        NativeKind::Guid => NativeStruct::Guid(r.read_guid()?),
        NativeKind::Vector => NativeStruct::Vector {
            x: real(r)?,
            y: real(r)?,
            z: real(r)?,
        },
        NativeKind::Vector2D => NativeStruct::Vector2D {
            x: real(r)?,
            y: real(r)?,
        },
        NativeKind::Vector4 => NativeStruct::Vector4 {
            x: real(r)?,
            y: real(r)?,
            z: real(r)?,
            w: real(r)?,
        },
        NativeKind::Rotator => NativeStruct::Rotator {
            pitch: real(r)?,
            yaw: real(r)?,
            roll: real(r)?,
        },
        NativeKind::Quat => NativeStruct::Quat {
            x: real(r)?,
            y: real(r)?,
            z: real(r)?,
            w: real(r)?,
        },
        NativeKind::LinearColor => NativeStruct::LinearColor {
            r: r.read_f32()?,
            g: r.read_f32()?,
            b: r.read_f32()?,
            a: r.read_f32()?,
        },
        NativeKind::Color => NativeStruct::Color {
            b: r.read_u8()?,
            g: r.read_u8()?,
            r: r.read_u8()?,
            a: r.read_u8()?,
        },
        NativeKind::IntPoint => NativeStruct::IntPoint {
            x: r.read_i32()?,
            y: r.read_i32()?,
        },
        NativeKind::IntVector => NativeStruct::IntVector {
            x: r.read_i32()?,
            y: r.read_i32()?,
            z: r.read_i32()?,
        },
        NativeKind::DateTime => NativeStruct::DateTime(r.read_i64()?),
        NativeKind::Timespan => NativeStruct::Timespan(r.read_i64()?),
        NativeKind::SoftObjectPath => NativeStruct::SoftObjectPath(read_soft_object_path(r, ctx)?),
    })
}

fn read_soft_object_path(r: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<SoftObjectPath> {
    let asset_path = if ctx.supports(VersionGate::SoftObjectPathPackageName) {
        let package = ctx.read_name(r)?;
        let asset = ctx.read_name(r)?;
        if asset == NONE {
            package
        } else {
            format!("{}.{}", package, asset)
        }
    } else {
        ctx.read_name(r)?
    };
    let sub_path = r.read_fstring()?;
    Ok(SoftObjectPath {
        asset_path,
        sub_path,
    })
}

fn read_delegate(r: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<ScriptDelegate> {
    Ok(ScriptDelegate {
        object: r.read_package_index()?,
        function_name: ctx.read_name(r)?,
    })
}

fn read_text(r: &mut Reader<'_>, ctx: &DecodeContext<'_>) -> Result<TextValue> {
    let flags = r.read_u32()?;
    let history = match r.read_i8()? {
        -1 => {
            let culture_invariant = if r.read_bool32()? {
                Some(r.read_fstring()?)
            } else {
                None
            };
            TextHistory::None { culture_invariant }
        }
        0 => TextHistory::Base {
            namespace: r.read_fstring()?,
            key: r.read_fstring()?,
            source: r.read_fstring()?,
        },
        11 => TextHistory::StringTableEntry {
            table_id: ctx.read_name(r)?,
            key: r.read_fstring()?,
        },
        other => TextHistory::Opaque(other),
    };
    Ok(TextValue { flags, history })
}
