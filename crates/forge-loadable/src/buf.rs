//! Binary cursors for the network codec.
//!
//! All multi-byte scalars are big-endian. Counts and indices are written as
//! var-ints: 7 bits per byte, low group first, high bit set on every byte
//! except the last. A var-int never exceeds five bytes.

use crate::error::LoadError;

/// Longest string accepted by [`ByteReader::read_string`], in bytes.
pub const MAX_STRING_LEN: usize = 32_767;

const MAX_VAR_INT_BYTES: usize = 5;

// ---------------------------------------------------------------------------
// ByteWriter
// ---------------------------------------------------------------------------

/// Append-only byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Write a signed 32-bit var-int. Negative values always take five bytes.
    pub fn write_var_int(&mut self, value: i32) {
        let mut remaining = value as u32;
        loop {
            if remaining & !0x7F == 0 {
                self.write_u8(remaining as u8);
                return;
            }
            self.write_u8((remaining & 0x7F) as u8 | 0x80);
            remaining >>= 7;
        }
    }

    /// Write a length or index. Fails if it does not fit a var-int.
    pub fn write_len(&mut self, len: usize) -> Result<(), LoadError> {
        let value = i32::try_from(len)
            .map_err(|_| LoadError::custom("", format!("length {len} exceeds var-int range")))?;
        self.write_var_int(value);
        Ok(())
    }

    pub fn write_short(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a UTF-8 string with a var-int byte length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<(), LoadError> {
        if value.len() > MAX_STRING_LEN {
            return Err(LoadError::custom(
                "",
                format!("string of {} bytes exceeds {MAX_STRING_LEN}", value.len()),
            ));
        }
        self.write_len(value.len())?;
        self.bytes.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ---------------------------------------------------------------------------
// ByteReader
// ---------------------------------------------------------------------------

/// Read cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], LoadError> {
        if self.remaining() < count {
            return Err(LoadError::decode(format!(
                "needed {count} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, LoadError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LoadError::decode(format!("invalid boolean byte {other}"))),
        }
    }

    pub fn read_var_int(&mut self) -> Result<i32, LoadError> {
        let mut result: u32 = 0;
        for i in 0..MAX_VAR_INT_BYTES {
            let byte = self.read_u8()?;
            result |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
        }
        Err(LoadError::decode("var-int longer than 5 bytes"))
    }

    /// Read a non-negative var-int length or index.
    pub fn read_len(&mut self) -> Result<usize, LoadError> {
        let value = self.read_var_int()?;
        usize::try_from(value).map_err(|_| LoadError::decode(format!("negative length {value}")))
    }

    pub fn read_short(&mut self) -> Result<i16, LoadError> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, LoadError> {
        Ok(f32::from_be_bytes(self.take_array()?))
    }

    pub fn read_string(&mut self) -> Result<String, LoadError> {
        let len = self.read_len()?;
        if len > MAX_STRING_LEN {
            return Err(LoadError::decode(format!(
                "string of {len} bytes exceeds {MAX_STRING_LEN}"
            )));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| LoadError::decode(format!("invalid UTF-8 string: {e}")))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_int_small_values_take_one_byte() {
        let mut w = ByteWriter::new();
        w.write_var_int(0);
        w.write_var_int(127);
        assert_eq!(w.as_bytes(), &[0x00, 0x7F]);
    }

    #[test]
    fn var_int_multi_byte_layout() {
        let mut w = ByteWriter::new();
        w.write_var_int(300);
        assert_eq!(w.as_bytes(), &[0xAC, 0x02]);
    }

    #[test]
    fn var_int_negative_takes_five_bytes() {
        let mut w = ByteWriter::new();
        w.write_var_int(-1);
        assert_eq!(w.len(), 5);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_var_int().unwrap(), -1);
        assert!(r.is_exhausted());
    }

    #[test]
    fn var_int_too_long_is_rejected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut r = ByteReader::new(&bytes);
        assert!(r.read_var_int().is_err());
    }

    #[test]
    fn scalars_are_big_endian() {
        let mut w = ByteWriter::new();
        w.write_short(-1);
        w.write_f32(1.0);
        assert_eq!(w.as_bytes(), &[0xFF, 0xFF, 0x3F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn mixed_sequence_reads_back() {
        let mut w = ByteWriter::new();
        w.write_bool(true);
        w.write_short(1234);
        w.write_f32(2.5);
        w.write_string("attack_damage").unwrap();
        w.write_var_int(70_000);
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_short().unwrap(), 1234);
        assert_eq!(r.read_f32().unwrap(), 2.5);
        assert_eq!(r.read_string().unwrap(), "attack_damage");
        assert_eq!(r.read_var_int().unwrap(), 70_000);
        assert!(r.is_exhausted());
    }

    #[test]
    fn truncated_input_reports_offset() {
        let bytes = [0x00, 0x01];
        let mut r = ByteReader::new(&bytes);
        let err = r.read_f32().unwrap_err();
        assert!(err.to_string().contains("needed 4 bytes at offset 0"));
    }

    #[test]
    fn invalid_bool_byte() {
        let bytes = [2];
        assert!(ByteReader::new(&bytes).read_bool().is_err());
    }

    #[test]
    fn negative_length_rejected() {
        let mut w = ByteWriter::new();
        w.write_var_int(-5);
        let bytes = w.into_bytes();
        assert!(ByteReader::new(&bytes).read_len().is_err());
    }
}
