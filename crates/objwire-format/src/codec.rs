//! Primitive codec: little-endian scalars and length-prefixed strings.

use std::io::{self, Read, Write};

use objwire_core::types::PrimitiveType;
use objwire_core::value::{DateTime, Decimal, Primitive};

use crate::error::FormatError;

/// Longest legal 7-bit encoded length prefix.
const MAX_PREFIX_BYTES: usize = 5;

/// Byte sink that tracks how much it has written.
#[derive(Debug)]
pub struct WireWriter<W> {
    inner: W,
    offset: u64,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        self.inner.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), FormatError> {
        self.write_bytes(&[v])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), FormatError> {
        self.write_u8(v as u8)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<(), FormatError> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Write an unsigned length in 7-bit groups, low group first, with the
    /// high bit of each byte flagging a continuation.
    pub fn write_7bit_len(&mut self, len: u32) -> Result<(), FormatError> {
        let mut rest = len;
        while rest >= 0x80 {
            self.write_u8((rest as u8) | 0x80)?;
            rest >>= 7;
        }
        self.write_u8(rest as u8)
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), FormatError> {
        let len = u32::try_from(s.len())
            .ok()
            .filter(|&len| len <= i32::MAX as u32)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "string longer than i32::MAX")
            })?;
        self.write_7bit_len(len)?;
        self.write_bytes(s.as_bytes())
    }

    pub fn write_char(&mut self, c: char) -> Result<(), FormatError> {
        let mut buf = [0u8; 4];
        self.write_bytes(c.encode_utf8(&mut buf).as_bytes())
    }

    pub fn write_decimal(&mut self, d: &Decimal) -> Result<(), FormatError> {
        self.write_string(d.as_str())
    }

    /// Write a primitive's raw value without a type code.
    pub fn write_primitive(&mut self, value: &Primitive) -> Result<(), FormatError> {
        match value {
            Primitive::Boolean(v) => self.write_bool(*v),
            Primitive::Byte(v) => self.write_u8(*v),
            Primitive::Char(v) => self.write_char(*v),
            Primitive::Decimal(v) => self.write_decimal(v),
            Primitive::Double(v) => self.write_f64(*v),
            Primitive::Int16(v) => self.write_i16(*v),
            Primitive::Int32(v) => self.write_i32(*v),
            Primitive::Int64(v) => self.write_i64(*v),
            Primitive::SByte(v) => self.write_i8(*v),
            Primitive::Single(v) => self.write_f32(*v),
            Primitive::TimeSpan(v) => self.write_i64(*v),
            Primitive::DateTime(v) => self.write_i64(v.to_bits()),
            Primitive::UInt16(v) => self.write_u16(*v),
            Primitive::UInt32(v) => self.write_u32(*v),
            Primitive::UInt64(v) => self.write_u64(*v),
        }
    }
}

/// Byte source that tracks its position for error reporting.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), FormatError> {
        let start = self.offset;
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(FormatError::UnexpectedEof { offset: start })
            }
            Err(e) => Err(FormatError::Io(e)),
        }
    }

    /// Read exactly `len` bytes without trusting `len` for preallocation.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, FormatError> {
        let start = self.offset;
        let mut buf = Vec::new();
        let got = (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(FormatError::Io)?;
        self.offset += got as u64;
        if got < len {
            return Err(FormatError::UnexpectedEof { offset: start });
        }
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, FormatError> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, FormatError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, FormatError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, FormatError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, FormatError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, FormatError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, FormatError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a non-negative count stored as an `i32`.
    pub fn read_count(&mut self, what: &'static str) -> Result<usize, FormatError> {
        let offset = self.offset;
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| FormatError::InvalidLength {
            what,
            value: value.into(),
            offset,
        })
    }

    pub fn read_7bit_len(&mut self) -> Result<usize, FormatError> {
        let offset = self.offset;
        let mut value: u64 = 0;
        for i in 0..MAX_PREFIX_BYTES {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                if value > i32::MAX as u64 {
                    break;
                }
                return Ok(value as usize);
            }
        }
        Err(FormatError::InvalidLength {
            what: "string length",
            value: value as i64,
            offset,
        })
    }

    pub fn read_string(&mut self) -> Result<String, FormatError> {
        let len = self.read_7bit_len()?;
        let offset = self.offset;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| FormatError::InvalidString { offset })
    }

    pub fn read_char(&mut self) -> Result<char, FormatError> {
        let offset = self.offset;
        let first = self.read_u8()?;
        let width = match first {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(FormatError::InvalidChar { offset }),
        };
        let mut buf = [first, 0, 0, 0];
        self.read_exact(&mut buf[1..width])?;
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(FormatError::InvalidChar { offset })
    }

    pub fn read_decimal(&mut self) -> Result<Decimal, FormatError> {
        let offset = self.offset;
        let text = self.read_string()?;
        text.parse()
            .map_err(|_| FormatError::InvalidDecimal { text, offset })
    }

    /// Read a one-byte primitive type code.
    ///
    /// The reserved null and string codes are not value types and are
    /// rejected along with unknown codes.
    pub fn read_primitive_type(&mut self) -> Result<PrimitiveType, FormatError> {
        let offset = self.offset;
        let code = self.read_u8()?;
        PrimitiveType::from_code(code).ok_or(FormatError::UnknownPrimitiveCode { code, offset })
    }

    /// Read a raw primitive value of a known type.
    pub fn read_primitive(&mut self, ty: PrimitiveType) -> Result<Primitive, FormatError> {
        Ok(match ty {
            PrimitiveType::Boolean => Primitive::Boolean(self.read_bool()?),
            PrimitiveType::Byte => Primitive::Byte(self.read_u8()?),
            PrimitiveType::Char => Primitive::Char(self.read_char()?),
            PrimitiveType::Decimal => Primitive::Decimal(self.read_decimal()?),
            PrimitiveType::Double => Primitive::Double(self.read_f64()?),
            PrimitiveType::Int16 => Primitive::Int16(self.read_i16()?),
            PrimitiveType::Int32 => Primitive::Int32(self.read_i32()?),
            PrimitiveType::Int64 => Primitive::Int64(self.read_i64()?),
            PrimitiveType::SByte => Primitive::SByte(self.read_i8()?),
            PrimitiveType::Single => Primitive::Single(self.read_f32()?),
            PrimitiveType::TimeSpan => Primitive::TimeSpan(self.read_i64()?),
            PrimitiveType::DateTime => Primitive::DateTime(DateTime::from_bits(self.read_i64()?)),
            PrimitiveType::UInt16 => Primitive::UInt16(self.read_u16()?),
            PrimitiveType::UInt32 => Primitive::UInt32(self.read_u32()?),
            PrimitiveType::UInt64 => Primitive::UInt64(self.read_u64()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objwire_core::value::DateTimeKind;

    fn written(f: impl FnOnce(&mut WireWriter<Vec<u8>>) -> Result<(), FormatError>) -> Vec<u8> {
        let mut w = WireWriter::new(Vec::new());
        f(&mut w).unwrap();
        assert_eq!(w.offset() as usize, w.inner.len());
        w.into_inner()
    }

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(written(|w| w.write_i32(1)), vec![1, 0, 0, 0]);
        assert_eq!(written(|w| w.write_i16(-2)), vec![0xFE, 0xFF]);
        assert_eq!(written(|w| w.write_f64(1.0)), 1.0f64.to_le_bytes().to_vec());
    }

    #[test]
    fn seven_bit_lengths() {
        assert_eq!(written(|w| w.write_7bit_len(0)), vec![0]);
        assert_eq!(written(|w| w.write_7bit_len(127)), vec![0x7F]);
        assert_eq!(written(|w| w.write_7bit_len(128)), vec![0x80, 0x01]);
        assert_eq!(written(|w| w.write_7bit_len(300)), vec![0xAC, 0x02]);

        let mut r = WireReader::new(&[0xAC, 0x02][..]);
        assert_eq!(r.read_7bit_len().unwrap(), 300);
    }

    #[test]
    fn overlong_length_prefix_rejected() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let mut r = WireReader::new(&bytes[..]);
        assert!(matches!(
            r.read_7bit_len(),
            Err(FormatError::InvalidLength { .. })
        ));

        // Five groups decoding above i32::MAX.
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        let mut r = WireReader::new(&bytes[..]);
        assert!(matches!(
            r.read_7bit_len(),
            Err(FormatError::InvalidLength { .. })
        ));
    }

    #[test]
    fn strings_and_chars() {
        let bytes = written(|w| {
            w.write_string("héllo")?;
            w.write_char('€')?;
            w.write_char('a')
        });
        assert_eq!(bytes[0], 6);
        let mut r = WireReader::new(bytes.as_slice());
        assert_eq!(r.read_string().unwrap(), "héllo");
        assert_eq!(r.read_char().unwrap(), '€');
        assert_eq!(r.read_char().unwrap(), 'a');
        assert_eq!(r.offset() as usize, bytes.len());
    }

    #[test]
    fn bad_utf8_rejected() {
        let mut r = WireReader::new(&[2, 0xC3, 0x28][..]);
        assert!(matches!(
            r.read_string(),
            Err(FormatError::InvalidString { offset: 1 })
        ));
        let mut r = WireReader::new(&[0xFF][..]);
        assert!(matches!(r.read_char(), Err(FormatError::InvalidChar { .. })));
    }

    #[test]
    fn truncation_reports_offset() {
        let mut r = WireReader::new(&[1, 2, 3, 4, 5][..]);
        r.read_i32().unwrap();
        assert!(matches!(
            r.read_i32(),
            Err(FormatError::UnexpectedEof { offset: 4 })
        ));

        let mut r = WireReader::new(&[10, b'a', b'b'][..]);
        assert!(matches!(
            r.read_string(),
            Err(FormatError::UnexpectedEof { offset: 1 })
        ));
    }

    #[test]
    fn every_primitive_round_trips() {
        let values = vec![
            Primitive::Boolean(true),
            Primitive::Byte(200),
            Primitive::Char('ß'),
            Primitive::Decimal("-12.500".parse().unwrap()),
            Primitive::Double(-3.25),
            Primitive::Int16(-300),
            Primitive::Int32(i32::MIN),
            Primitive::Int64(i64::MAX),
            Primitive::SByte(-5),
            Primitive::Single(1.5),
            Primitive::TimeSpan(36_000_000_000),
            Primitive::DateTime(DateTime::new(630_822_816_000_000_000, DateTimeKind::Utc)),
            Primitive::UInt16(65_000),
            Primitive::UInt32(4_000_000_000),
            Primitive::UInt64(u64::MAX),
        ];
        let bytes = written(|w| values.iter().try_for_each(|v| w.write_primitive(v)));
        let mut r = WireReader::new(bytes.as_slice());
        for v in &values {
            assert_eq!(&r.read_primitive(v.kind()).unwrap(), v);
        }
    }

    #[test]
    fn reserved_primitive_codes_rejected() {
        for code in [0u8, 4, 17, 18, 99] {
            let bytes = [code];
            let mut r = WireReader::new(&bytes[..]);
            assert!(matches!(
                r.read_primitive_type(),
                Err(FormatError::UnknownPrimitiveCode { .. })
            ));
        }
    }

    #[test]
    fn negative_count_rejected() {
        let bytes = (-1i32).to_le_bytes();
        let mut r = WireReader::new(&bytes[..]);
        assert!(matches!(
            r.read_count("member count"),
            Err(FormatError::InvalidLength { value: -1, .. })
        ));
    }

    #[test]
    fn malformed_decimal_rejected() {
        let bytes = written(|w| w.write_string("1e5"));
        let mut r = WireReader::new(bytes.as_slice());
        assert!(matches!(
            r.read_decimal(),
            Err(FormatError::InvalidDecimal { .. })
        ));
    }
}
