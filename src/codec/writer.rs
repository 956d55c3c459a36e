use bytes::{BufMut, Bytes, BytesMut};

use super::types::{Quat, Transform, Vec3, Weather};

/// Binary writer for protocol payloads (little-endian)
pub struct BinaryWriter {
    data: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: BytesMut::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.put_u8(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.data.put_u16_le(v);
    }

    pub fn write_i32_le(&mut self, v: i32) {
        self.data.put_i32_le(v);
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.data.put_u32_le(v);
    }

    pub fn write_u64_le(&mut self, v: u64) {
        self.data.put_u64_le(v);
    }

    pub fn write_f32_le(&mut self, v: f32) {
        self.data.put_f32_le(v);
    }

    /// Write a 7-bit encoded length (LEB128)
    pub fn write_var_len(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.write_u8((v as u8) | 0x80);
            v >>= 7;
        }
        self.write_u8(v as u8);
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_string(&mut self, s: &str) {
        self.write_var_len(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    /// Write an i32-length-prefixed array
    pub fn write_array<T>(&mut self, items: &[T], mut write_one: impl FnMut(&mut Self, &T)) {
        self.write_i32_le(items.len() as i32);
        for item in items {
            write_one(self, item);
        }
    }

    pub fn write_f32_array(&mut self, items: &[f32]) {
        self.write_array(items, |w, v| w.write_f32_le(*v));
    }

    pub fn write_vec3(&mut self, v: Vec3) {
        self.write_f32_le(v.x);
        self.write_f32_le(v.y);
        self.write_f32_le(v.z);
    }

    pub fn write_quat(&mut self, q: Quat) {
        self.write_f32_le(q.x);
        self.write_f32_le(q.y);
        self.write_f32_le(q.z);
        self.write_f32_le(q.w);
    }

    pub fn write_transform(&mut self, t: Transform) {
        self.write_vec3(t.position);
        self.write_quat(t.rotation);
    }

    pub fn write_weather(&mut self, w: Weather) {
        self.write_i32_le(w.kind as i32);
        self.write_f32_le(w.position_x);
        self.write_f32_le(w.position_z);
        self.write_f32_le(w.offset);
        self.write_f32_le(w.rotation);
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BinaryWriter> for Vec<u8> {
    fn from(writer: BinaryWriter) -> Self {
        writer.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::reader::BinaryReader;

    #[test]
    fn test_roundtrip_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0x42);
        writer.write_u16_le(0x1234);
        writer.write_u32_le(0xDEADBEEF);
        writer.write_u64_le(u64::MAX - 1);

        let data = writer.into_vec();
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u16_le().unwrap(), 0x1234);
        assert_eq!(reader.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64_le().unwrap(), u64::MAX - 1);
    }

    #[test]
    fn test_var_len_boundaries() {
        for &v in &[0u32, 1, 127, 128, 300, 16383, 16384, u32::MAX] {
            let mut writer = BinaryWriter::new();
            writer.write_var_len(v);
            let data = writer.into_vec();
            assert_eq!(BinaryReader::new(&data).read_var_len().unwrap(), v);
        }
    }

    #[test]
    fn test_var_len_encoding() {
        let mut writer = BinaryWriter::new();
        writer.write_var_len(300);
        assert_eq!(writer.as_slice(), &[0xAC, 0x02]);
    }

    #[test]
    fn test_string_layout() {
        let mut writer = BinaryWriter::new();
        writer.write_string("MAILBOX");
        assert_eq!(writer.as_slice()[0], 7);
        assert_eq!(&writer.as_slice()[1..], b"MAILBOX");
    }

    #[test]
    fn test_transform_is_seven_floats() {
        let mut writer = BinaryWriter::new();
        writer.write_transform(Transform::at(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(writer.len(), 28);

        let data = writer.into_vec();
        let t = BinaryReader::new(&data).read_transform().unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.rotation, Quat::IDENTITY);
    }
}
