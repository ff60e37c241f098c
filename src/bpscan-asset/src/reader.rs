//! Endian-aware primitive reads over an in-memory package buffer
//!
//! Every read is bounds-checked and fails with [`Error::TruncatedData`]
//! instead of panicking, so a malformed file can never take down the caller.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::object::PackageIndex;
use crate::{Error, Result};

/// Byte order of a package file, decided by the summary tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Engine GUID: four 32-bit components in serialization order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Guid(pub [u32; 4]);

impl Guid {
    pub const fn new(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self([a, b, c, d])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}{:08X}{:08X}{:08X}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Serialized name: index into the name table plus instance number
///
/// A non-zero `number` renders as `Name_{number - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameRef {
    pub index: i32,
    pub number: i32,
}

/// Cursor over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    /// Reader positioned at `pos`
    pub fn at(data: &'a [u8], pos: usize, endian: Endian) -> Result<Self> {
        let mut reader = Self::new(data, endian);
        reader.seek(pos)?;
        Ok(reader)
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::TruncatedData {
                offset: self.pos,
                needed: pos.saturating_sub(self.pos),
                available: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedData {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Single-byte bool, as used inside property payloads
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Archive bool: serialized as a 32-bit integer
    pub fn read_bool32(&mut self) -> Result<bool> {
        Ok(self.read_u32()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_i16(b),
            Endian::Big => BigEndian::read_i16(b),
        })
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u16(b),
            Endian::Big => BigEndian::read_u16(b),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_i32(b),
            Endian::Big => BigEndian::read_i32(b),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        })
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_i64(b),
            Endian::Big => BigEndian::read_i64(b),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u64(b),
            Endian::Big => BigEndian::read_u64(b),
        })
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f32(b),
            Endian::Big => BigEndian::read_f32(b),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let b = self.take(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f64(b),
            Endian::Big => BigEndian::read_f64(b),
        })
    }

    pub fn read_guid(&mut self) -> Result<Guid> {
        Ok(Guid([
            self.read_u32()?,
            self.read_u32()?,
            self.read_u32()?,
            self.read_u32()?,
        ]))
    }

    pub fn read_name_ref(&mut self) -> Result<NameRef> {
        Ok(NameRef {
            index: self.read_i32()?,
            number: self.read_i32()?,
        })
    }

    pub fn read_package_index(&mut self) -> Result<PackageIndex> {
        Ok(PackageIndex::new(self.read_i32()?))
    }

    /// Length-prefixed string; a negative length means UTF-16 code units
    pub fn read_fstring(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_i32()?;

        if len == 0 {
            return Ok(String::new());
        }
        if len == i32::MIN {
            return Err(Error::InvalidString { offset: start });
        }

        let s = if len < 0 {
            let units = len.unsigned_abs() as usize;
            let bytes = self.take(units * 2)?;
            let utf16: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| match self.endian {
                    Endian::Little => LittleEndian::read_u16(c),
                    Endian::Big => BigEndian::read_u16(c),
                })
                .collect();
            String::from_utf16_lossy(&utf16)
        } else {
            let bytes = self.take(len as usize)?;
            String::from_utf8_lossy(bytes).into_owned()
        };

        Ok(s.trim_end_matches('\0').to_string())
    }

    /// Element count for an array; negative or impossible counts are rejected
    /// before anything is allocated
    pub fn read_count(&mut self) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            return Err(Error::InvalidCount { offset, count });
        }
        let count = count as usize;
        if count > self.remaining() {
            return Err(Error::TruncatedData {
                offset: self.pos,
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Read a 32-bit count followed by that many elements
    pub fn read_array<T, F>(&mut self, mut element: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(element(self)?);
        }
        Ok(items)
    }
}
