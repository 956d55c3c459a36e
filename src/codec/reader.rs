use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use super::types::{Quat, Transform, Vec3, Weather, WeatherType};

/// Longest string accepted from a peer
pub const MAX_STRING_LEN: usize = 64 * 1024;
/// Largest array accepted from a peer
pub const MAX_ARRAY_LEN: usize = 65536;

/// Binary reader for protocol payloads (little-endian)
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_f32_le(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    /// Read a 7-bit encoded length (LEB128, at most 5 bytes)
    pub fn read_var_len(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::InvalidPacket("malformed 7-bit length".into()))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_var_len()? as usize;
        if len > MAX_STRING_LEN {
            return Err(Error::StringTooLong { len, max: MAX_STRING_LEN });
        }
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::InvalidPacket("invalid UTF-8 string".into()))
    }

    /// Read an i32 array length and validate it
    pub fn read_array_len(&mut self) -> Result<usize> {
        let len = self.read_i32_le()?;
        if len < 0 || len as usize > MAX_ARRAY_LEN {
            return Err(Error::ArrayTooLong { len: len as i64, max: MAX_ARRAY_LEN });
        }
        Ok(len as usize)
    }

    /// Read a length-prefixed array, one element at a time
    pub fn read_array<T>(&mut self, mut read_one: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let len = self.read_array_len()?;
        // Cap the preallocation: the length is peer-controlled.
        let mut out = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            out.push(read_one(self)?);
        }
        Ok(out)
    }

    pub fn read_f32_array(&mut self) -> Result<Vec<f32>> {
        self.read_array(Self::read_f32_le)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3 {
            x: self.read_f32_le()?,
            y: self.read_f32_le()?,
            z: self.read_f32_le()?,
        })
    }

    pub fn read_quat(&mut self) -> Result<Quat> {
        Ok(Quat {
            x: self.read_f32_le()?,
            y: self.read_f32_le()?,
            z: self.read_f32_le()?,
            w: self.read_f32_le()?,
        })
    }

    pub fn read_transform(&mut self) -> Result<Transform> {
        Ok(Transform {
            position: self.read_vec3()?,
            rotation: self.read_quat()?,
        })
    }

    pub fn read_weather(&mut self) -> Result<Weather> {
        let kind = self.read_i32_le()?;
        let kind = WeatherType::from_i32(kind)
            .ok_or_else(|| Error::InvalidPacket(format!("invalid weather type: {kind}")))?;
        Ok(Weather {
            kind,
            position_x: self.read_f32_le()?,
            position_z: self.read_f32_le()?,
            offset: self.read_f32_le()?,
            rotation: self.read_f32_le()?,
        })
    }

    /// Read remaining bytes
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}
